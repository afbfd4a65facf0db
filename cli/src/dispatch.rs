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

//! Routes the first command line token to a sketch kind, help or the manual.

use std::io::Write;

use crate::error::Error;
use crate::help;
use crate::kind::Adapter;
use crate::kind::Cardinality;
use crate::kind::FrequentItems;
use crate::kind::Quantiles;
use crate::kind::SetSketch;
use crate::kind::SketchKind;
use crate::kind::UniformSample;
use crate::kind::WeightedSample;
use crate::options::OptionSet;
use crate::orchestrator::Orchestrator;
use crate::orchestrator::RunReport;
use crate::orchestrator::Streams;
use crate::orchestrator::write_failed;

/// How a command line was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Help,
    Manual,
    /// The token named no sketch kind; help was shown.
    Unrecognized(String),
    /// The sub-command flags were rejected; nothing ran.
    OptionError(String),
    Ran(RunReport),
}

/// Handles `args`, the command line without the program name.
pub fn run(args: &[String], streams: &mut Streams<'_>) -> Result<Outcome, Error> {
    let Some((token, rest)) = args.split_first() else {
        write_help(streams.output, help::top_level_help())?;
        return Ok(Outcome::Help);
    };

    match token.to_ascii_lowercase().as_str() {
        "help" | "-help" | "--help" => {
            write_help(streams.output, help::top_level_help())?;
            return Ok(Outcome::Help);
        }
        "man" => {
            write_help(streams.output, help::manual())?;
            return Ok(Outcome::Manual);
        }
        _ => {}
    }

    let Some(kind) = SketchKind::from_token(token) else {
        let err = Error::unrecognized_command(token);
        tracing::debug!(%err, "no such sketch kind");
        writeln!(streams.error, "Unrecognized Sketch Type: {token}").map_err(write_failed)?;
        write_help(streams.output, help::top_level_help())?;
        return Ok(Outcome::Unrecognized(token.clone()));
    };

    tracing::debug!(kind = kind.token(), "dispatching");
    match kind {
        SketchKind::Cardinality => run_kind::<Cardinality>(rest, streams),
        SketchKind::Quantiles => run_kind::<Quantiles>(rest, streams),
        SketchKind::FrequentItems => run_kind::<FrequentItems>(rest, streams),
        SketchKind::UniformSample => run_kind::<UniformSample>(rest, streams),
        SketchKind::WeightedSample => run_kind::<WeightedSample>(rest, streams),
        SketchKind::SetSketch => run_kind::<SetSketch>(rest, streams),
    }
}

fn run_kind<A: Adapter>(args: &[String], streams: &mut Streams<'_>) -> Result<Outcome, Error> {
    let opts = match OptionSet::parse(&mut A::command(), args) {
        Ok(opts) => opts,
        Err(err) => {
            writeln!(streams.error, "runCommandLineUtil Error: {}", err.message())
                .map_err(write_failed)?;
            return Ok(Outcome::OptionError(err.message().to_string()));
        }
    };
    let report = Orchestrator::<A>::new(&opts).run(streams)?;
    Ok(Outcome::Ran(report))
}

fn write_help(output: &mut dyn Write, text: String) -> Result<(), Error> {
    output.write_all(text.as_bytes()).map_err(write_failed)
}
