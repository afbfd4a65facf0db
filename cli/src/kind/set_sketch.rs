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

use std::fmt;

use clap::Arg;
use clap::ArgAction;
use ds_sketches::common::NumStdDev;
use ds_sketches::theta;
use ds_sketches::theta::CompactThetaSketch;
use ds_sketches::theta::ThetaANotB;
use ds_sketches::theta::ThetaIntersection;
use ds_sketches::theta::ThetaSketch;
use ds_sketches::theta::ThetaSketchView;
use ds_sketches::theta::ThetaUnion;

use super::Adapter;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::options::OptionSet;
use crate::query::QueryResult;

const K: &str = "k";
const INTERSECTION: &str = "intersection";
const SET_MINUS: &str = "set-minus";
const BOUNDS: &str = "bounds";

/// A theta sketch as held in the sketch list.
///
/// Sketches built from data stay updatable; loaded and merged sketches are compact.
#[derive(Debug, Clone)]
pub enum AnyThetaSketch {
    Update(ThetaSketch),
    Compact(CompactThetaSketch),
}

impl AnyThetaSketch {
    pub fn estimate(&self) -> f64 {
        match self {
            AnyThetaSketch::Update(sketch) => sketch.estimate(),
            AnyThetaSketch::Compact(sketch) => sketch.estimate(),
        }
    }

    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        match self {
            AnyThetaSketch::Update(sketch) => sketch.lower_bound(num_std_dev),
            AnyThetaSketch::Compact(sketch) => sketch.lower_bound(num_std_dev),
        }
    }

    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        match self {
            AnyThetaSketch::Update(sketch) => sketch.upper_bound(num_std_dev),
            AnyThetaSketch::Compact(sketch) => sketch.upper_bound(num_std_dev),
        }
    }

    /// Nominal size of an updatable sketch; compact sketches do not record one.
    pub fn lg_k(&self) -> Option<u8> {
        match self {
            AnyThetaSketch::Update(sketch) => Some(sketch.lg_k()),
            AnyThetaSketch::Compact(_) => None,
        }
    }

    pub fn compact(&self) -> CompactThetaSketch {
        match self {
            AnyThetaSketch::Update(sketch) => sketch.compact(),
            AnyThetaSketch::Compact(sketch) => sketch.clone(),
        }
    }
}

impl fmt::Display for AnyThetaSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyThetaSketch::Update(sketch) => fmt::Display::fmt(sketch, f),
            AnyThetaSketch::Compact(sketch) => fmt::Display::fmt(sketch, f),
        }
    }
}

/// `ds theta`: theta sketches with union, intersection and set difference.
#[derive(Debug)]
pub struct SetSketch;

impl Adapter for SetSketch {
    type Sketch = AnyThetaSketch;

    const USAGE_NAME: &'static str = "ds theta";

    fn args() -> Vec<Arg> {
        vec![
            Arg::new(K)
                .short('k')
                .value_name("K")
                .num_args(1)
                .help("nominal entries, rounded up to a power of 2 (default 4096)"),
            Arg::new(INTERSECTION)
                .short('i')
                .long(INTERSECTION)
                .action(ArgAction::SetTrue)
                .conflicts_with(SET_MINUS)
                .help("merge the sketches by intersection"),
            Arg::new(SET_MINUS)
                .short('m')
                .long(SET_MINUS)
                .action(ArgAction::SetTrue)
                .help("merge as the first sketch minus the union of the others"),
            Arg::new(BOUNDS)
                .short('b')
                .long(BOUNDS)
                .action(ArgAction::SetTrue)
                .help("print lower bound, estimate and upper bound"),
        ]
    }

    fn build(opts: &OptionSet) -> Result<AnyThetaSketch, Error> {
        let lg_k = lg_k(opts)?.unwrap_or(theta::DEFAULT_LG_K);
        Ok(AnyThetaSketch::Update(
            ThetaSketch::builder().lg_k(lg_k).build(),
        ))
    }

    fn update_one(sketch: &mut AnyThetaSketch, line: &str, _opts: &OptionSet) -> Result<(), Error> {
        match sketch {
            AnyThetaSketch::Update(sketch) => {
                sketch.update(line);
                Ok(())
            }
            AnyThetaSketch::Compact(_) => Err(Error::new(
                ErrorKind::InvalidSketch,
                "a compact theta sketch cannot be updated",
            )),
        }
    }

    fn merge(list: &[AnyThetaSketch], opts: &OptionSet) -> Result<AnyThetaSketch, Error> {
        let compacts: Vec<CompactThetaSketch> = list.iter().map(AnyThetaSketch::compact).collect();

        if opts.has(INTERSECTION) {
            tracing::debug!(inputs = compacts.len(), "theta merge by intersection");
            let mut intersection = ThetaIntersection::default();
            for sketch in &compacts {
                intersection.update(sketch).map_err(Error::invalid_sketch)?;
            }
            let result = intersection.result().map_err(Error::invalid_sketch)?;
            return Ok(AnyThetaSketch::Compact(result));
        }

        let last = list
            .last()
            .and_then(AnyThetaSketch::lg_k)
            .unwrap_or(theta::DEFAULT_LG_K);
        let lg_k = lg_k(opts)?.unwrap_or(last);

        if opts.has(SET_MINUS) {
            tracing::debug!(inputs = compacts.len(), "theta merge by set difference");
            let Some((a, rest)) = compacts.split_first() else {
                return Err(Error::new(ErrorKind::InvalidSketch, "nothing to subtract from"));
            };
            let b = union_of(rest, lg_k)?;
            let result = ThetaANotB::compute(a, &b).map_err(Error::invalid_sketch)?;
            return Ok(AnyThetaSketch::Compact(result));
        }

        tracing::debug!(inputs = compacts.len(), lg_k, "theta merge by union");
        Ok(AnyThetaSketch::Compact(union_of(&compacts, lg_k)?))
    }

    fn query(sketch: &AnyThetaSketch, opts: &OptionSet) -> Result<QueryResult, Error> {
        let mut result = QueryResult::new();
        if opts.has(BOUNDS) {
            result.push(format!(
                "{:.0}   {:.0}   {:.0}",
                sketch.lower_bound(NumStdDev::Two),
                sketch.estimate(),
                sketch.upper_bound(NumStdDev::Two)
            ));
        } else {
            result.push(format!("{:.0}", sketch.estimate()));
        }
        Ok(result)
    }

    fn serialize(sketch: &AnyThetaSketch) -> Vec<u8> {
        match sketch {
            AnyThetaSketch::Update(sketch) => sketch.compact().serialize(),
            AnyThetaSketch::Compact(sketch) => sketch.serialize(),
        }
    }

    fn deserialize(bytes: &[u8]) -> Result<AnyThetaSketch, Error> {
        CompactThetaSketch::deserialize(bytes)
            .map(AnyThetaSketch::Compact)
            .map_err(Error::invalid_sketch)
    }
}

fn union_of(sketches: &[CompactThetaSketch], lg_k: u8) -> Result<CompactThetaSketch, Error> {
    let mut union = ThetaUnion::new(lg_k);
    for sketch in sketches {
        union.update(sketch).map_err(Error::invalid_sketch)?;
    }
    Ok(union.result())
}

fn lg_k(opts: &OptionSet) -> Result<Option<u8>, Error> {
    let Some(k) = opts.parse_value::<u64>(K)? else {
        return Ok(None);
    };
    let min = 1u64 << theta::MIN_LG_K;
    let max = 1u64 << theta::MAX_LG_K;
    if !(min..=max).contains(&k) {
        return Err(Error::config_invalid(
            K,
            format!("k must be in [{min}, {max}], got {k}"),
        ));
    }
    Ok(Some(k.next_power_of_two().trailing_zeros() as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(args: &[&str]) -> OptionSet {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        OptionSet::parse(&mut SetSketch::command(), &args).unwrap()
    }

    fn sketch_of(range: std::ops::RangeInclusive<u64>) -> AnyThetaSketch {
        let plain = opts(&[]);
        let mut sketch = SetSketch::build(&plain).unwrap();
        for i in range {
            SetSketch::update_one(&mut sketch, &i.to_string(), &plain).unwrap();
        }
        sketch
    }

    #[test]
    fn test_k_rounds_up() {
        assert_eq!(lg_k(&opts(&["-k", "4096"])).unwrap(), Some(12));
        assert_eq!(lg_k(&opts(&["-k", "5000"])).unwrap(), Some(13));
        assert_eq!(lg_k(&opts(&["-k", "32"])).unwrap(), Some(5));
        assert!(lg_k(&opts(&["-k", "31"])).is_err());
        assert!(lg_k(&opts(&["-k", "0"])).is_err());
    }

    #[test]
    fn test_three_merge_modes() {
        let list = [sketch_of(1..=1000), sketch_of(501..=1500)];
        let union = SetSketch::merge(&list, &opts(&[])).unwrap();
        assert_eq!(union.estimate(), 1500.0);
        let intersection = SetSketch::merge(&list, &opts(&["-i"])).unwrap();
        assert_eq!(intersection.estimate(), 500.0);
        let minus = SetSketch::merge(&list, &opts(&["-m"])).unwrap();
        assert_eq!(minus.estimate(), 500.0);
    }

    #[test]
    fn test_intersection_and_set_minus_conflict() {
        let args: Vec<String> = ["-i", "-m"].iter().map(|s| s.to_string()).collect();
        assert!(OptionSet::parse(&mut SetSketch::command(), &args).is_err());
    }

    #[test]
    fn test_query_formats() {
        let sketch = sketch_of(1..=100);
        let result = SetSketch::query(&sketch, &opts(&[])).unwrap();
        assert_eq!(result.lines(), &["100".to_string()]);
        let result = SetSketch::query(&sketch, &opts(&["-b"])).unwrap();
        assert_eq!(result.lines(), &["100   100   100".to_string()]);
    }

    #[test]
    fn test_round_trip_is_compact() {
        let sketch = sketch_of(1..=10);
        let bytes = SetSketch::serialize(&sketch);
        let restored = SetSketch::deserialize(&bytes).unwrap();
        assert!(matches!(restored, AnyThetaSketch::Compact(_)));
        assert_eq!(SetSketch::serialize(&restored), bytes);
    }
}
