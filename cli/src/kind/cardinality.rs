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
use ds_sketches::common::NumStdDev;
use ds_sketches::hll;
use ds_sketches::hll::HllSketch;
use ds_sketches::hll::HllUnion;

use super::Adapter;
use crate::error::Error;
use crate::options::OptionSet;
use crate::query::QueryResult;

const LG_K: &str = "lgk";

/// `ds hll`: HyperLogLog distinct counting over whole lines.
#[derive(Debug)]
pub struct Cardinality;

impl Adapter for Cardinality {
    type Sketch = HllSketch;

    const USAGE_NAME: &'static str = "ds hll";

    fn args() -> Vec<Arg> {
        vec![
            Arg::new(LG_K)
                .long(LG_K)
                .value_name("LGK")
                .num_args(1)
                .help("parameter lgK = log2(k), 4..=21 (default 12)"),
        ]
    }

    fn build(opts: &OptionSet) -> Result<HllSketch, Error> {
        Ok(HllSketch::new(lg_k(opts)?.unwrap_or(hll::DEFAULT_LG_K)))
    }

    fn update_one(sketch: &mut HllSketch, line: &str, _opts: &OptionSet) -> Result<(), Error> {
        sketch.update(line);
        Ok(())
    }

    fn merge(list: &[HllSketch], opts: &OptionSet) -> Result<HllSketch, Error> {
        let last = list.last().map_or(hll::DEFAULT_LG_K, HllSketch::lg_config_k);
        let mut union = HllUnion::new(lg_k(opts)?.unwrap_or(last));
        for sketch in list {
            union.update(sketch);
        }
        Ok(union.result())
    }

    fn query(sketch: &HllSketch, _opts: &OptionSet) -> Result<QueryResult, Error> {
        let mut result = QueryResult::new();
        result.push(format!(
            "{:.6} {:.6} {:.6}",
            sketch.lower_bound(NumStdDev::Two),
            sketch.estimate(),
            sketch.upper_bound(NumStdDev::Two)
        ));
        Ok(result)
    }

    fn serialize(sketch: &HllSketch) -> Vec<u8> {
        sketch.serialize()
    }

    fn deserialize(bytes: &[u8]) -> Result<HllSketch, Error> {
        HllSketch::deserialize(bytes).map_err(Error::invalid_sketch)
    }
}

fn lg_k(opts: &OptionSet) -> Result<Option<u8>, Error> {
    let Some(lg_k) = opts.parse_value::<u8>(LG_K)? else {
        return Ok(None);
    };
    if !(hll::MIN_LG_K..=hll::MAX_LG_K).contains(&lg_k) {
        return Err(Error::config_invalid(
            LG_K,
            format!(
                "lgk must be in [{}, {}], got {lg_k}",
                hll::MIN_LG_K,
                hll::MAX_LG_K
            ),
        ));
    }
    Ok(Some(lg_k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(args: &[&str]) -> OptionSet {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        OptionSet::parse(&mut Cardinality::command(), &args).unwrap()
    }

    #[test]
    fn test_build_honors_lgk() {
        assert_eq!(Cardinality::build(&opts(&[])).unwrap().lg_config_k(), 12);
        assert_eq!(Cardinality::build(&opts(&["-lgk", "8"])).unwrap().lg_config_k(), 8);
        assert!(Cardinality::build(&opts(&["-lgk", "30"])).is_err());
    }

    #[test]
    fn test_merge_uses_last_capacity() {
        let none = opts(&[]);
        let mut a = Cardinality::build(&opts(&["-lgk", "10"])).unwrap();
        let mut b = Cardinality::build(&opts(&["-lgk", "11"])).unwrap();
        for i in 0..100 {
            Cardinality::update_one(&mut a, &i.to_string(), &none).unwrap();
            Cardinality::update_one(&mut b, &(i + 50).to_string(), &none).unwrap();
        }
        let merged = Cardinality::merge(&[a, b], &none).unwrap();
        assert!((merged.estimate() - 150.0).abs() < 5.0);
    }

    #[test]
    fn test_query_empty() {
        let sketch = Cardinality::build(&opts(&[])).unwrap();
        let result = Cardinality::query(&sketch, &opts(&[])).unwrap();
        assert_eq!(result.lines(), &["0.000000 0.000000 0.000000".to_string()]);
    }
}
