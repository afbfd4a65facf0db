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

use clap::Arg;
use clap::ArgAction;
use ds_sketches::codec::StringSerde;
use ds_sketches::frequencies::ErrorType;
use ds_sketches::frequencies::FrequentItemsSketch;
use ds_sketches::frequencies::Row;

use super::Adapter;
use super::parse_number;
use super::query_values;
use super::split_weighted;
use crate::error::Error;
use crate::options::OptionSet;
use crate::query::QueryResult;

const K: &str = "k";
const WEIGHTS: &str = "weights";
const ERROR: &str = "error";
const STREAM_WEIGHT: &str = "stream-weight";
const TOPK_IDS: &str = "topk-ids";
const TOPK: &str = "topk";
const NO_FALSE_NEGATIVES: &str = "no-false-negatives";
const ID2FREQ: &str = "id2freq";
const ID2FREQ_FILE: &str = "id2freq-file";

const DEFAULT_K: usize = 1024;
const MIN_K: usize = 8;
const MAX_K: usize = 1 << 30;

/// `ds freq`: heavy hitters over string items with integer weights.
#[derive(Debug)]
pub struct FrequentItems;

impl Adapter for FrequentItems {
    type Sketch = FrequentItemsSketch<String>;

    const USAGE_NAME: &'static str = "ds freq";

    fn args() -> Vec<Arg> {
        vec![
            Arg::new(K)
                .short('k')
                .value_name("K")
                .num_args(1)
                .help("maximum map size, a power of 2 (default 1024)"),
            Arg::new(WEIGHTS)
                .short('w')
                .long(WEIGHTS)
                .action(ArgAction::SetTrue)
                .help(
                    "each line is an integer weight and an item separated by a tab, comma or \
                     spaces; a single token is an item with weight 1",
                ),
            Arg::new(ERROR)
                .short('e')
                .long(ERROR)
                .action(ArgAction::SetTrue)
                .help("print the maximum error"),
            Arg::new(STREAM_WEIGHT)
                .short('n')
                .long(STREAM_WEIGHT)
                .action(ArgAction::SetTrue)
                .help("print the total stream weight"),
            Arg::new(TOPK_IDS)
                .short('t')
                .long(TOPK_IDS)
                .action(ArgAction::SetTrue)
                .help("print the frequent item ids"),
            Arg::new(TOPK)
                .short('T')
                .long(TOPK)
                .action(ArgAction::SetTrue)
                .help("print the frequent items with their frequencies"),
            Arg::new(NO_FALSE_NEGATIVES)
                .short('y')
                .long(NO_FALSE_NEGATIVES)
                .action(ArgAction::SetTrue)
                .help("report with no false negatives instead of no false positives"),
            Arg::new(ID2FREQ)
                .short('f')
                .long(ID2FREQ)
                .value_name("IDS")
                .num_args(1..)
                .help("print the frequency of each id"),
            Arg::new(ID2FREQ_FILE)
                .short('F')
                .long(ID2FREQ_FILE)
                .value_name("FILE")
                .num_args(1)
                .help("print the frequency of each id listed in FILE"),
        ]
    }

    fn build(opts: &OptionSet) -> Result<Self::Sketch, Error> {
        Ok(FrequentItemsSketch::new(k(opts)?.unwrap_or(DEFAULT_K)))
    }

    fn update_one(sketch: &mut Self::Sketch, line: &str, opts: &OptionSet) -> Result<(), Error> {
        let (weight, item) = if opts.has(WEIGHTS) {
            split_weighted(line)
        } else {
            (None, line)
        };
        let count = match weight {
            None => 1,
            Some(text) => parse_number::<i64>(text)
                .map_err(|_| Error::value_parse(line, "weight is not an integer"))?,
        };
        sketch
            .update_with_count(item.to_string(), count)
            .map_err(|err| Error::value_parse(line, err.message()))
    }

    fn merge(list: &[Self::Sketch], opts: &OptionSet) -> Result<Self::Sketch, Error> {
        let last = list
            .last()
            .map_or(DEFAULT_K, |sketch| 1usize << sketch.lg_max_map_size());
        let mut merged = FrequentItemsSketch::new(k(opts)?.unwrap_or(last));
        for sketch in list {
            merged.merge(sketch).map_err(Error::invalid_sketch)?;
        }
        Ok(merged)
    }

    fn query(sketch: &Self::Sketch, opts: &OptionSet) -> Result<QueryResult, Error> {
        let error_type = if opts.has(NO_FALSE_NEGATIVES) {
            ErrorType::NoFalseNegatives
        } else {
            ErrorType::NoFalsePositives
        };
        let freq = |row: &Row<String>| match error_type {
            ErrorType::NoFalsePositives => row.lower_bound(),
            ErrorType::NoFalseNegatives => row.upper_bound(),
        };
        let rows = sketch.frequent_items(error_type);
        let mut result = QueryResult::new();

        if opts.has(ERROR) {
            result.push(format!("Maximum error: {}", sketch.maximum_error()));
        }
        if opts.has(STREAM_WEIGHT) {
            result.push(format!("Stream weight: {}", sketch.total_weight()));
        }

        let mut answered = false;
        if opts.has(TOPK_IDS) {
            answered = true;
            for row in &rows {
                result.push(row.item().clone());
            }
        }
        if opts.has(TOPK) {
            answered = true;
            for row in &rows {
                result.push(format!("{}\t{}", row.item(), freq(row)));
            }
        }
        let ids = query_values(opts, ID2FREQ, ID2FREQ_FILE)?;
        if !ids.is_empty() {
            answered = true;
            for id in &ids {
                let found = rows.iter().find(|row| row.item() == id).map_or(0, freq);
                result.push(format!("{id}\t{found}"));
            }
        }
        if !answered {
            for row in &rows {
                result.push(format!("{}\t{}", row.item(), freq(row)));
            }
        }
        Ok(result)
    }

    fn serialize(sketch: &Self::Sketch) -> Vec<u8> {
        sketch.serialize_with(&StringSerde)
    }

    fn deserialize(bytes: &[u8]) -> Result<Self::Sketch, Error> {
        FrequentItemsSketch::deserialize_with(bytes, &StringSerde).map_err(Error::invalid_sketch)
    }
}

fn k(opts: &OptionSet) -> Result<Option<usize>, Error> {
    let Some(k) = opts.parse_value::<usize>(K)? else {
        return Ok(None);
    };
    if !k.is_power_of_two() || !(MIN_K..=MAX_K).contains(&k) {
        return Err(Error::config_invalid(
            K,
            format!("k must be a power of 2 in [{MIN_K}, {MAX_K}], got {k}"),
        ));
    }
    Ok(Some(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(args: &[&str]) -> OptionSet {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        OptionSet::parse(&mut FrequentItems::command(), &args).unwrap()
    }

    #[test]
    fn test_weighted_lines() {
        let weighted = opts(&["-w"]);
        let mut sketch = FrequentItems::build(&weighted).unwrap();
        FrequentItems::update_one(&mut sketch, "5\tapple", &weighted).unwrap();
        FrequentItems::update_one(&mut sketch, "3,apple", &weighted).unwrap();
        FrequentItems::update_one(&mut sketch, "pear", &weighted).unwrap();
        assert_eq!(sketch.total_weight(), 9);
        assert_eq!(sketch.estimate(&"apple".to_string()), 8);

        let err = FrequentItems::update_one(&mut sketch, "x1 pear", &weighted).unwrap_err();
        assert_eq!(err.message(), "x1 pear");
        assert!(FrequentItems::update_one(&mut sketch, "-2 pear", &weighted).is_err());
    }

    #[test]
    fn test_query_sections() {
        let plain = opts(&[]);
        let mut sketch = FrequentItems::build(&plain).unwrap();
        for item in ["a", "b", "a", "c", "a", "b"] {
            FrequentItems::update_one(&mut sketch, item, &plain).unwrap();
        }
        let result = FrequentItems::query(&sketch, &plain).unwrap();
        assert_eq!(result.lines()[0], "a\t3");

        let result = FrequentItems::query(&sketch, &opts(&["-e", "-n", "-f", "b", "zz"])).unwrap();
        assert_eq!(
            result.lines(),
            &[
                "Maximum error: 0".to_string(),
                "Stream weight: 6".to_string(),
                "b\t2".to_string(),
                "zz\t0".to_string(),
            ]
        );
    }

    #[test]
    fn test_k_validation() {
        assert!(FrequentItems::build(&opts(&["-k", "100"])).is_err());
        assert!(FrequentItems::build(&opts(&["-k", "4"])).is_err());
        assert_eq!(FrequentItems::build(&opts(&["-k", "256"])).unwrap().lg_max_map_size(), 8);
    }
}
