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
use ds_sketches::kll;
use ds_sketches::kll::KllSketch;

use super::Adapter;
use super::parse_number;
use super::query_values;
use crate::error::Error;
use crate::options::OptionSet;
use crate::query::QueryResult;

const K: &str = "k";
const LINEAR_HISTOGRAM: &str = "linear-histogram";
const LOG_HISTOGRAM: &str = "lh";
const BINS: &str = "bins";
const VALUES: &str = "values";
const VALUES_FILE: &str = "values-file";
const RANKS: &str = "ranks";
const RANKS_FILE: &str = "ranks-file";

const DEFAULT_BINS: usize = 10;

/// `ds quant`: KLL quantiles over numeric lines.
#[derive(Debug)]
pub struct Quantiles;

impl Adapter for Quantiles {
    type Sketch = KllSketch;

    const USAGE_NAME: &'static str = "ds quant";

    fn args() -> Vec<Arg> {
        vec![
            Arg::new(K)
                .short('k')
                .value_name("K")
                .num_args(1)
                .help("parameter k, 8..=65535 (default 200)"),
            Arg::new(LINEAR_HISTOGRAM)
                .short('h')
                .long(LINEAR_HISTOGRAM)
                .action(ArgAction::SetTrue)
                .help("histogram with equally spaced bins between min and max"),
            Arg::new(LOG_HISTOGRAM)
                .long(LOG_HISTOGRAM)
                .alias("log-histogram")
                .value_name("OFFSET")
                .num_args(1)
                .help("histogram with bins equally spaced on log10(value + OFFSET)"),
            Arg::new(BINS)
                .short('b')
                .long(BINS)
                .value_name("N")
                .num_args(1)
                .help("number of histogram bins (default 10)"),
            Arg::new(VALUES)
                .short('v')
                .long(VALUES)
                .value_name("VALUES")
                .num_args(1..)
                .help("print the rank of each value"),
            Arg::new(VALUES_FILE)
                .short('V')
                .long(VALUES_FILE)
                .value_name("FILE")
                .num_args(1)
                .help("print the rank of each value listed in FILE"),
            Arg::new(RANKS)
                .short('r')
                .long(RANKS)
                .value_name("RANKS")
                .num_args(1..)
                .help("print the value at each rank in [0, 1]"),
            Arg::new(RANKS_FILE)
                .short('R')
                .long(RANKS_FILE)
                .value_name("FILE")
                .num_args(1)
                .help("print the value at each rank listed in FILE"),
        ]
    }

    fn build(opts: &OptionSet) -> Result<KllSketch, Error> {
        Ok(KllSketch::new(k(opts)?.unwrap_or(kll::DEFAULT_K)))
    }

    fn update_one(sketch: &mut KllSketch, line: &str, _opts: &OptionSet) -> Result<(), Error> {
        let value: f64 = parse_number(line)?;
        if value.is_nan() {
            return Err(Error::value_parse(line, "NaN is not a valid quantile item"));
        }
        sketch.update(value);
        Ok(())
    }

    fn merge(list: &[KllSketch], opts: &OptionSet) -> Result<KllSketch, Error> {
        let last = list.last().map_or(kll::DEFAULT_K, KllSketch::k);
        let mut merged = KllSketch::new(k(opts)?.unwrap_or(last));
        for sketch in list {
            merged.merge(sketch);
        }
        Ok(merged)
    }

    fn query(sketch: &KllSketch, opts: &OptionSet) -> Result<QueryResult, Error> {
        let mut result = QueryResult::new();
        let (Some(min), Some(max)) = (sketch.min_item(), sketch.max_item()) else {
            return Ok(result);
        };
        let mut answered = false;

        if opts.has(LINEAR_HISTOGRAM) {
            answered = true;
            let bins = bins(opts)?;
            let splits = interior_splits(min, max, bins, |x| x, |x| x);
            result.push("Linear Histogram:");
            histogram(sketch, &splits, max, &mut result)?;
        }

        if let Some(offset) = opts.value(LOG_HISTOGRAM) {
            answered = true;
            let offset: f64 = parse_number(offset)?;
            if !offset.is_finite() || min + offset <= 0.0 {
                return Err(Error::config_invalid(
                    LOG_HISTOGRAM,
                    format!("offset {offset} leaves the minimum {min} non-positive"),
                ));
            }
            let bins = bins(opts)?;
            let splits = interior_splits(
                min,
                max,
                bins,
                |x| (x + offset).log10(),
                |y| 10f64.powf(y) - offset,
            );
            result.push("Log Histogram:");
            histogram(sketch, &splits, max, &mut result)?;
        }

        let values = query_values(opts, VALUES, VALUES_FILE)?;
        if !values.is_empty() {
            answered = true;
            for text in &values {
                let value: f64 = parse_number(text)?;
                let rank = sketch.rank(value, true).unwrap_or(0.0);
                result.push(format!("{value}\t{rank}"));
            }
        }

        let ranks = query_values(opts, RANKS, RANKS_FILE)?;
        if !ranks.is_empty() {
            answered = true;
            for text in &ranks {
                let rank: f64 = parse_number(text)?;
                if !(0.0..=1.0).contains(&rank) {
                    return Err(Error::config_invalid(
                        RANKS,
                        format!("rank must be in [0, 1], got {rank}"),
                    ));
                }
                let value = sketch.quantile(rank, true).map_err(Error::invalid_sketch)?;
                result.push(format!("{rank}\t{value}"));
            }
        }

        if !answered {
            for i in 0..=10 {
                let rank = i as f64 / 10.0;
                let value = sketch.quantile(rank, true).map_err(Error::invalid_sketch)?;
                result.push(format!("{rank}\t{value}"));
            }
        }
        Ok(result)
    }

    fn serialize(sketch: &KllSketch) -> Vec<u8> {
        sketch.serialize()
    }

    fn deserialize(bytes: &[u8]) -> Result<KllSketch, Error> {
        KllSketch::deserialize(bytes).map_err(Error::invalid_sketch)
    }
}

fn k(opts: &OptionSet) -> Result<Option<u16>, Error> {
    let Some(k) = opts.parse_value::<u32>(K)? else {
        return Ok(None);
    };
    if k < kll::MIN_K as u32 || k > kll::MAX_K as u32 {
        return Err(Error::config_invalid(
            K,
            format!("k must be in [{}, {}], got {k}", kll::MIN_K, kll::MAX_K),
        ));
    }
    Ok(Some(k as u16))
}

fn bins(opts: &OptionSet) -> Result<usize, Error> {
    match opts.parse_value::<usize>(BINS)? {
        None => Ok(DEFAULT_BINS),
        Some(0) => Err(Error::config_invalid(BINS, "bins must be at least 1")),
        Some(bins) => Ok(bins),
    }
}

/// Split points strictly between `min` and `max`, equally spaced after mapping through `to`.
fn interior_splits(
    min: f64,
    max: f64,
    bins: usize,
    to: impl Fn(f64) -> f64,
    from: impl Fn(f64) -> f64,
) -> Vec<f64> {
    let (lo, hi) = (to(min), to(max));
    let mut splits: Vec<f64> = (1..bins)
        .map(|i| from(lo + (hi - lo) * i as f64 / bins as f64))
        .filter(|&s| s > min && s < max)
        .collect();
    splits.dedup();
    splits
}

fn histogram(
    sketch: &KllSketch,
    splits: &[f64],
    max: f64,
    result: &mut QueryResult,
) -> Result<(), Error> {
    let masses = sketch.pmf(splits, true).map_err(Error::invalid_sketch)?;
    let n = sketch.n() as f64;
    for (edge, mass) in splits.iter().copied().chain([max]).zip(masses) {
        result.push(format!("{edge}\t{}", (mass * n).round() as u64));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(args: &[&str]) -> OptionSet {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        OptionSet::parse(&mut Quantiles::command(), &args).unwrap()
    }

    fn sketch_of(n: usize) -> KllSketch {
        let mut sketch = Quantiles::build(&opts(&[])).unwrap();
        for i in 1..=n {
            Quantiles::update_one(&mut sketch, &i.to_string(), &opts(&[])).unwrap();
        }
        sketch
    }

    #[test]
    fn test_default_deciles() {
        let result = Quantiles::query(&sketch_of(100), &opts(&[])).unwrap();
        assert_eq!(result.lines().len(), 11);
        assert_eq!(result.lines()[0], "0\t1");
        assert_eq!(result.lines()[10], "1\t100");
        assert!(result.lines()[5].starts_with("0.5\t"));
    }

    #[test]
    fn test_linear_histogram_counts_everything() {
        let result = Quantiles::query(&sketch_of(100), &opts(&["-h", "-b", "4"])).unwrap();
        assert_eq!(result.lines()[0], "Linear Histogram:");
        assert_eq!(result.lines().len(), 5);
        let total: u64 = result.lines()[1..]
            .iter()
            .map(|line| line.split('\t').nth(1).unwrap().parse::<u64>().unwrap())
            .sum();
        assert_eq!(total, 100);
        assert!(result.lines()[4].starts_with("100\t"));
    }

    #[test]
    fn test_values_and_ranks() {
        let sketch = sketch_of(100);
        let result = Quantiles::query(&sketch, &opts(&["-v", "50", "-r", "0", "1"])).unwrap();
        assert_eq!(
            result.lines(),
            &["50\t0.5".to_string(), "0\t1".to_string(), "1\t100".to_string()]
        );
        assert!(Quantiles::query(&sketch, &opts(&["-r", "1.5"])).is_err());
        let err = Quantiles::query(&sketch, &opts(&["-v", "x"])).unwrap_err();
        assert_eq!(err.message(), "x");
    }

    #[test]
    fn test_log_histogram_needs_positive_values() {
        let sketch = sketch_of(100);
        let result = Quantiles::query(&sketch, &opts(&["--lh", "0"])).unwrap();
        assert_eq!(result.lines()[0], "Log Histogram:");
        assert!(Quantiles::query(&sketch, &opts(&["--lh", "-5"])).is_err());
    }

    #[test]
    fn test_empty_and_bad_lines() {
        let mut sketch = Quantiles::build(&opts(&[])).unwrap();
        assert!(Quantiles::query(&sketch, &opts(&[])).unwrap().is_empty());
        assert!(Quantiles::update_one(&mut sketch, "abc", &opts(&[])).is_err());
        assert!(Quantiles::build(&opts(&["-k", "4"])).is_err());
    }
}
