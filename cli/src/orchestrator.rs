// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Sequences acquisition, merge, query and output for one invocation.

use std::fs;
use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::marker::PhantomData;

use crate::error::Error;
use crate::error::ErrorKind;
use crate::kind::Adapter;
use crate::kind::DATA_FILE;
use crate::kind::HELP;
use crate::kind::OUTPUT_FILE;
use crate::kind::PRINT;
use crate::kind::SKETCH_FILES;
use crate::options::OptionSet;

/// The three channels of a run.
pub struct Streams<'a> {
    pub input: &'a mut dyn BufRead,
    pub output: &'a mut dyn Write,
    pub error: &'a mut dyn Write,
}

/// Sketches of one kind in creation order. Merging appends; nothing is removed.
#[derive(Debug)]
pub struct SketchList<S> {
    sketches: Vec<S>,
}

impl<S> Default for SketchList<S> {
    fn default() -> Self {
        Self {
            sketches: Vec::new(),
        }
    }
}

impl<S> SketchList<S> {
    pub fn push(&mut self, sketch: S) {
        self.sketches.push(sketch);
    }

    pub fn len(&self) -> usize {
        self.sketches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sketches.is_empty()
    }

    /// The current sketch.
    pub fn last(&self) -> Option<&S> {
        self.sketches.last()
    }

    pub fn as_slice(&self) -> &[S] {
        &self.sketches
    }
}

/// What a run did, for callers that should not scrape the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// List length once all inputs were acquired.
    pub acquired: usize,
    /// List length after the optional merge.
    pub after_merge: usize,
    /// Usage text was printed instead of a result.
    pub help_shown: bool,
}

/// Runs one sub-command of kind `A` against resolved options.
#[derive(Debug)]
pub struct Orchestrator<'o, A> {
    opts: &'o OptionSet,
    _kind: PhantomData<A>,
}

impl<'o, A: Adapter> Orchestrator<'o, A> {
    pub fn new(opts: &'o OptionSet) -> Self {
        Self {
            opts,
            _kind: PhantomData,
        }
    }

    /// Executes the run.
    ///
    /// Load, update and save failures are reported on the error channel and the run goes on.
    /// Invalid input values, invalid sizing options and sketch library errors abort it.
    pub fn run(&self, streams: &mut Streams<'_>) -> Result<RunReport, Error> {
        if self.opts.has(HELP) {
            write_out(streams.output, &A::describe_options())?;
            return Ok(RunReport {
                acquired: 0,
                after_merge: 0,
                help_shown: true,
            });
        }

        let mut list = SketchList::default();
        self.acquire(&mut list, streams)?;
        let acquired = list.len();
        tracing::debug!(kind = A::USAGE_NAME, acquired, "inputs acquired");

        if list.len() > 1 {
            let merged = A::merge(list.as_slice(), self.opts)?;
            list.push(merged);
            tracing::debug!(kind = A::USAGE_NAME, inputs = acquired, "sketches merged");
        }
        let after_merge = list.len();

        let Some(current) = list.last() else {
            write_out(streams.output, &A::describe_options())?;
            return Ok(RunReport {
                acquired,
                after_merge,
                help_shown: true,
            });
        };
        self.output(current, streams)?;
        Ok(RunReport {
            acquired,
            after_merge,
            help_shown: false,
        })
    }

    fn acquire(
        &self,
        list: &mut SketchList<A::Sketch>,
        streams: &mut Streams<'_>,
    ) -> Result<(), Error> {
        let files = self.opts.values(SKETCH_FILES);
        match self.opts.value(DATA_FILE) {
            Some(path) => {
                if let Some(sketch) = self.update_from_file(path, streams.error)? {
                    list.push(sketch);
                }
            }
            None if files.is_empty() => {
                tracing::debug!("reading data from standard input");
                if let Some(sketch) = self.update_from(&mut *streams.input, streams.error)? {
                    list.push(sketch);
                }
            }
            None => {}
        }
        self.load_sketches(files, list, streams.error)
    }

    fn update_from_file(
        &self,
        path: &str,
        error: &mut dyn Write,
    ) -> Result<Option<A::Sketch>, Error> {
        tracing::debug!(path, "reading data file");
        match File::open(path) {
            Ok(file) => self.update_from(&mut BufReader::new(file), error),
            Err(err) => {
                writeln!(error, "updateCurrentSketch Error: {path}: {err}").map_err(write_failed)?;
                Ok(None)
            }
        }
    }

    // A read failure discards the partially built sketch. Bytes that are not UTF-8 are replaced
    // rather than failing the read.
    fn update_from(
        &self,
        reader: &mut dyn BufRead,
        error: &mut dyn Write,
    ) -> Result<Option<A::Sketch>, Error> {
        let mut sketch = A::build(self.opts)?;
        let mut count = 0u64;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    writeln!(error, "updateCurrentSketch Error: {err}").map_err(write_failed)?;
                    return Ok(None);
                }
            }
            let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw);
            if line.trim().is_empty() {
                continue;
            }
            if let Err(err) = A::update_one(&mut sketch, &line, self.opts) {
                if err.kind() == ErrorKind::ValueParse {
                    writeln!(error, "Read Error: Item: {line}").map_err(write_failed)?;
                }
                return Err(err);
            }
            count += 1;
        }
        tracing::debug!(lines = count, "sketch updated");
        Ok(Some(sketch))
    }

    fn load_sketches(
        &self,
        files: &[String],
        list: &mut SketchList<A::Sketch>,
        error: &mut dyn Write,
    ) -> Result<(), Error> {
        for path in files {
            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    writeln!(error, "loadInputSketches Error: {path}: {err}")
                        .map_err(write_failed)?;
                    continue;
                }
            };
            match A::deserialize(&bytes) {
                Ok(sketch) => {
                    tracing::debug!(path = path.as_str(), bytes = bytes.len(), "sketch loaded");
                    list.push(sketch);
                }
                Err(err) => {
                    writeln!(error, "loadInputSketches Error: {path}: {}", err.message())
                        .map_err(write_failed)?;
                }
            }
        }
        Ok(())
    }

    fn output(&self, current: &A::Sketch, streams: &mut Streams<'_>) -> Result<(), Error> {
        let result = match A::query(current, self.opts) {
            Ok(result) => result,
            Err(err) => {
                if err.kind() == ErrorKind::ValueParse {
                    writeln!(streams.error, "Read Error: Item: {}", err.message())
                        .map_err(write_failed)?;
                }
                return Err(err);
            }
        };
        write_out(streams.output, &result.to_string())?;

        if self.opts.has(PRINT) {
            writeln!(streams.output, "\n{current}").map_err(write_failed)?;
        }

        if let Some(path) = self.opts.value(OUTPUT_FILE) {
            let bytes = A::serialize(current);
            match fs::write(path, &bytes) {
                Ok(()) => tracing::debug!(path, bytes = bytes.len(), "sketch saved"),
                Err(err) => writeln!(streams.error, "saveCurrentSketch Error: {path}: {err}")
                    .map_err(write_failed)?,
            }
        }
        Ok(())
    }
}

fn write_out(output: &mut dyn Write, text: &str) -> Result<(), Error> {
    output.write_all(text.as_bytes()).map_err(write_failed)
}

pub(crate) fn write_failed(err: io::Error) -> Error {
    Error::io("cannot write to output stream", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sketch_list_appends() {
        let mut list = SketchList::default();
        assert!(list.is_empty());
        assert_eq!(list.last(), None);
        list.push(1);
        list.push(2);
        assert_eq!(list.len(), 2);
        assert_eq!(list.last(), Some(&2));
        assert_eq!(list.as_slice(), &[1, 2]);
    }
}
