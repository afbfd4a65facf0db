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
use ds_sketches::codec::I64Serde;
use ds_sketches::sampling;
use ds_sketches::sampling::ReservoirItemsSketch;
use ds_sketches::sampling::ReservoirItemsUnion;

use super::Adapter;
use super::OUTPUT_FILE;
use super::parse_number;
use crate::error::Error;
use crate::options::OptionSet;
use crate::query::QueryResult;

const K: &str = "k";

/// `ds rsamp`: uniform reservoir sample of integer lines.
#[derive(Debug)]
pub struct UniformSample;

impl Adapter for UniformSample {
    type Sketch = ReservoirItemsSketch<i64>;

    const USAGE_NAME: &'static str = "ds rsamp";

    fn args() -> Vec<Arg> {
        vec![
            Arg::new(K)
                .short('k')
                .value_name("K")
                .num_args(1)
                .help("maximum number of samples, at least 2 (default 32)"),
        ]
    }

    fn build(opts: &OptionSet) -> Result<Self::Sketch, Error> {
        Ok(ReservoirItemsSketch::new(sample_k(opts, K)?.unwrap_or(sampling::DEFAULT_K)))
    }

    fn update_one(sketch: &mut Self::Sketch, line: &str, _opts: &OptionSet) -> Result<(), Error> {
        sketch.update(parse_number(line)?);
        Ok(())
    }

    fn merge(list: &[Self::Sketch], opts: &OptionSet) -> Result<Self::Sketch, Error> {
        let last = list
            .last()
            .map_or(sampling::DEFAULT_K, ReservoirItemsSketch::k);
        let mut union = ReservoirItemsUnion::new(sample_k(opts, K)?.unwrap_or(last));
        for sketch in list {
            union.update(sketch);
        }
        Ok(union.result())
    }

    // Samples are listed only when the sketch is also saved.
    fn query(sketch: &Self::Sketch, opts: &OptionSet) -> Result<QueryResult, Error> {
        let mut result = QueryResult::new();
        if opts.has(OUTPUT_FILE) {
            result.push("");
            result.push("Uniform Samples");
            for sample in sketch.samples() {
                result.push(sample.to_string());
            }
        }
        Ok(result)
    }

    fn serialize(sketch: &Self::Sketch) -> Vec<u8> {
        sketch.serialize_with(&I64Serde)
    }

    fn deserialize(bytes: &[u8]) -> Result<Self::Sketch, Error> {
        ReservoirItemsSketch::deserialize_with(bytes, &I64Serde).map_err(Error::invalid_sketch)
    }
}

/// Sample size option shared by both samplers.
pub(super) fn sample_k(opts: &OptionSet, id: &'static str) -> Result<Option<u32>, Error> {
    let Some(k) = opts.parse_value::<u32>(id)? else {
        return Ok(None);
    };
    if k < sampling::MIN_K {
        return Err(Error::config_invalid(
            id,
            format!("k must be at least {}, got {k}", sampling::MIN_K),
        ));
    }
    Ok(Some(k))
}
