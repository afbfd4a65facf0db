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
use ds_sketches::sampling;
use ds_sketches::sampling::VarOptItemsSketch;
use ds_sketches::sampling::VarOptItemsUnion;

use super::Adapter;
use super::parse_number;
use super::split_weighted;
use super::uniform_sample::sample_k;
use crate::error::Error;
use crate::options::OptionSet;
use crate::query::QueryResult;

const K: &str = "k";
const WEIGHTS: &str = "weights";
const STREAM_COUNT: &str = "stream-count";
const SUBSET_SUM: &str = "subset-sum";

/// `ds vsamp`: VarOpt weighted sample of string items.
#[derive(Debug)]
pub struct WeightedSample;

impl Adapter for WeightedSample {
    type Sketch = VarOptItemsSketch<String>;

    const USAGE_NAME: &'static str = "ds vsamp";

    fn args() -> Vec<Arg> {
        vec![
            Arg::new(K)
                .short('k')
                .value_name("K")
                .num_args(1)
                .help("maximum number of samples, at least 2 (default 32)"),
            Arg::new(WEIGHTS)
                .short('w')
                .long(WEIGHTS)
                .action(ArgAction::SetTrue)
                .help(
                    "each line is a floating point weight and an item separated by a tab, comma \
                     or spaces; a single token is an item with weight 1.0",
                ),
            Arg::new(STREAM_COUNT)
                .short('n')
                .long(STREAM_COUNT)
                .action(ArgAction::SetTrue)
                .help("print the number of items presented to the sketch"),
            Arg::new(SUBSET_SUM)
                .short('r')
                .long(SUBSET_SUM)
                .value_name("PREFIX")
                .num_args(0..=1)
                .help("estimate the total weight of items starting with PREFIX, or of all items"),
        ]
    }

    fn build(opts: &OptionSet) -> Result<Self::Sketch, Error> {
        Ok(VarOptItemsSketch::new(sample_k(opts, K)?.unwrap_or(sampling::DEFAULT_K)))
    }

    fn update_one(sketch: &mut Self::Sketch, line: &str, opts: &OptionSet) -> Result<(), Error> {
        let (weight, item) = if opts.has(WEIGHTS) {
            split_weighted(line)
        } else {
            (None, line)
        };
        let weight = match weight {
            None => 1.0,
            Some(text) => parse_number::<f64>(text)
                .map_err(|_| Error::value_parse(line, "weight is not a number"))?,
        };
        sketch
            .update(item.to_string(), weight)
            .map_err(|err| Error::value_parse(line, err.message()))
    }

    fn merge(list: &[Self::Sketch], opts: &OptionSet) -> Result<Self::Sketch, Error> {
        let last = list
            .last()
            .map_or(sampling::DEFAULT_K, VarOptItemsSketch::k);
        let mut union = VarOptItemsUnion::new(sample_k(opts, K)?.unwrap_or(last));
        for sketch in list {
            union.update(sketch);
        }
        Ok(union.result())
    }

    fn query(sketch: &Self::Sketch, opts: &OptionSet) -> Result<QueryResult, Error> {
        let mut result = QueryResult::new();
        if opts.has(STREAM_COUNT) {
            result.push(format!("Stream count: {}", sketch.n()));
        }
        if opts.has(SUBSET_SUM) {
            let prefix = opts.value(SUBSET_SUM).unwrap_or_default();
            let summary = sketch.estimate_subset_sum(|item| item.starts_with(prefix));
            result.push(format!("Subset sum estimate: {}", summary.estimate));
            result.push(format!("Lower bound: {}", summary.lower_bound));
            result.push(format!("Upper bound: {}", summary.upper_bound));
            result.push(format!("Total sketch weight: {}", summary.total_sketch_weight));
        }
        for (item, weight) in sketch.samples() {
            result.push(format!("{item}\t{weight}"));
        }
        Ok(result)
    }

    fn serialize(sketch: &Self::Sketch) -> Vec<u8> {
        sketch.serialize_with(&StringSerde)
    }

    fn deserialize(bytes: &[u8]) -> Result<Self::Sketch, Error> {
        VarOptItemsSketch::deserialize_with(bytes, &StringSerde).map_err(Error::invalid_sketch)
    }
}
