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

//! One adapter per sketch kind, binding the sketch library to the command line.

mod cardinality;
mod frequent_items;
mod quantiles;
mod set_sketch;
mod uniform_sample;
mod weighted_sample;

use std::fmt;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::str::FromStr;

use clap::Arg;
use clap::ArgAction;
use clap::ColorChoice;
use clap::Command;

pub use self::cardinality::Cardinality;
pub use self::frequent_items::FrequentItems;
pub use self::quantiles::Quantiles;
pub use self::set_sketch::AnyThetaSketch;
pub use self::set_sketch::SetSketch;
pub use self::uniform_sample::UniformSample;
pub use self::weighted_sample::WeightedSample;
use crate::error::Error;
use crate::options::OptionSet;
use crate::query::QueryResult;

pub(crate) const DATA_FILE: &str = "data-from-file";
pub(crate) const SKETCH_FILES: &str = "sketch-input-files";
pub(crate) const OUTPUT_FILE: &str = "sketch-output-file";
pub(crate) const PRINT: &str = "print";
pub(crate) const HELP: &str = "help";

/// Capabilities the run orchestrator needs from a sketch kind.
pub trait Adapter {
    type Sketch: fmt::Display;

    /// Name used in usage text, e.g. `ds hll`.
    const USAGE_NAME: &'static str;

    /// Kind-specific arguments, added after the common ones.
    fn args() -> Vec<Arg>;

    /// Creates an empty sketch honoring the sizing options.
    fn build(opts: &OptionSet) -> Result<Self::Sketch, Error>;

    /// Applies one non-blank input line.
    fn update_one(sketch: &mut Self::Sketch, line: &str, opts: &OptionSet) -> Result<(), Error>;

    /// Combines every sketch of `list` into a new one; `list` is left untouched.
    fn merge(list: &[Self::Sketch], opts: &OptionSet) -> Result<Self::Sketch, Error>;

    fn query(sketch: &Self::Sketch, opts: &OptionSet) -> Result<QueryResult, Error>;

    fn serialize(sketch: &Self::Sketch) -> Vec<u8>;

    fn deserialize(bytes: &[u8]) -> Result<Self::Sketch, Error>;

    /// Parser for this kind: the common flags followed by [`Adapter::args`].
    fn command() -> Command {
        Command::new(Self::USAGE_NAME)
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .allow_negative_numbers(true)
            .color(ColorChoice::Never)
            .args(common_args())
            .args(Self::args())
    }

    /// Usage text for this kind.
    fn describe_options() -> String {
        Self::command().render_help().to_string()
    }
}

fn common_args() -> [Arg; 5] {
    [
        Arg::new(DATA_FILE)
            .short('d')
            .long(DATA_FILE)
            .value_name("FILE")
            .num_args(1)
            .help("read data from FILE"),
        Arg::new(SKETCH_FILES)
            .short('s')
            .long(SKETCH_FILES)
            .value_name("FILES")
            .num_args(1..)
            .help("read sketches from FILES"),
        Arg::new(OUTPUT_FILE)
            .short('o')
            .long(OUTPUT_FILE)
            .value_name("FILE")
            .num_args(1)
            .help("save sketch to FILE"),
        Arg::new(PRINT)
            .short('p')
            .long(PRINT)
            .action(ArgAction::SetTrue)
            .help("print sketch summary"),
        Arg::new(HELP)
            .long(HELP)
            .action(ArgAction::SetTrue)
            .help("usage/help"),
    ]
}

/// The closed set of sketch kinds reachable from the first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SketchKind {
    Cardinality,
    Quantiles,
    FrequentItems,
    UniformSample,
    WeightedSample,
    SetSketch,
}

impl SketchKind {
    pub const ALL: [SketchKind; 6] = [
        SketchKind::FrequentItems,
        SketchKind::Cardinality,
        SketchKind::Quantiles,
        SketchKind::UniformSample,
        SketchKind::SetSketch,
        SketchKind::WeightedSample,
    ];

    /// Matches a sub-command token, ignoring case.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "hll" | "cardinality" => Some(SketchKind::Cardinality),
            "quant" | "quantiles" => Some(SketchKind::Quantiles),
            "freq" | "frequent-items" => Some(SketchKind::FrequentItems),
            "rsamp" | "uniform-sample" => Some(SketchKind::UniformSample),
            "vsamp" | "weighted-sample" => Some(SketchKind::WeightedSample),
            "theta" | "set-sketch" => Some(SketchKind::SetSketch),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            SketchKind::Cardinality => "hll",
            SketchKind::Quantiles => "quant",
            SketchKind::FrequentItems => "freq",
            SketchKind::UniformSample => "rsamp",
            SketchKind::WeightedSample => "vsamp",
            SketchKind::SetSketch => "theta",
        }
    }

    pub fn describe_options(self) -> String {
        match self {
            SketchKind::Cardinality => Cardinality::describe_options(),
            SketchKind::Quantiles => Quantiles::describe_options(),
            SketchKind::FrequentItems => FrequentItems::describe_options(),
            SketchKind::UniformSample => UniformSample::describe_options(),
            SketchKind::WeightedSample => WeightedSample::describe_options(),
            SketchKind::SetSketch => SetSketch::describe_options(),
        }
    }
}

/// Splits a weighted input line into `(weight, item)`.
///
/// Separators are runs of tab, comma and space; only the first run splits, so items may contain
/// separators. A line with a single token is an item without a weight.
pub(crate) fn split_weighted(line: &str) -> (Option<&str>, &str) {
    let is_sep = |c: char| matches!(c, '\t' | ',' | ' ');
    match line.find(is_sep) {
        None => (None, line),
        Some(pos) => {
            let rest = line[pos..].trim_start_matches(is_sep);
            if rest.is_empty() {
                (None, &line[..pos])
            } else {
                (Some(&line[..pos]), rest)
            }
        }
    }
}

/// Parses one number from input data or query values.
pub(crate) fn parse_number<T>(text: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.trim()
        .parse::<T>()
        .map_err(|err| Error::value_parse(text, err))
}

/// Values given inline for `values_id` followed by the non-blank lines of the file `file_id`.
pub(crate) fn query_values(
    opts: &OptionSet,
    values_id: &str,
    file_id: &str,
) -> Result<Vec<String>, Error> {
    let mut values = opts.values(values_id).to_vec();
    if let Some(path) = opts.value(file_id) {
        let file =
            File::open(path).map_err(|err| Error::io(format!("cannot open {path}"), err))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|err| Error::io(format!("cannot read {path}"), err))?;
            if !line.trim().is_empty() {
                values.push(line);
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_weighted() {
        assert_eq!(split_weighted("item"), (None, "item"));
        assert_eq!(split_weighted("5\titem"), (Some("5"), "item"));
        assert_eq!(split_weighted("5 , \titem with space"), (Some("5"), "item with space"));
        assert_eq!(split_weighted("5,a,b"), (Some("5"), "a,b"));
        assert_eq!(split_weighted("5\t"), (None, "5"));
    }

    #[test]
    fn test_kind_tokens() {
        assert_eq!(SketchKind::from_token("HLL"), Some(SketchKind::Cardinality));
        assert_eq!(SketchKind::from_token("set-sketch"), Some(SketchKind::SetSketch));
        assert_eq!(SketchKind::from_token("bogus"), None);
        for kind in SketchKind::ALL {
            assert_eq!(SketchKind::from_token(kind.token()), Some(kind));
            assert!(kind.describe_options().contains("--data-from-file"));
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number::<i64>(" 42 ").unwrap(), 42);
        let err = parse_number::<f64>("abc").unwrap_err();
        assert_eq!(err.message(), "abc");
    }
}
