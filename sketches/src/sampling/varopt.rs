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
use std::mem;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::EMPTY_FLAG_MASK;
use super::MIN_K;
use crate::codec::Family;
use crate::codec::ItemsSerde;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;

const SERIAL_VERSION: u8 = 2;
const PREAMBLE_LONGS_EMPTY: u8 = 1;
const PREAMBLE_LONGS_NONEMPTY: u8 = 3;

// z-score used by the subset sum bounds
const SUBSET_SUM_STD_DEVS: f64 = 2.0;

/// Estimate of the total weight of the stream items matching a predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubsetSummary {
    pub lower_bound: f64,
    pub estimate: f64,
    pub upper_bound: f64,
    pub total_sketch_weight: f64,
}

/// Variance-optimal sample of `k` weighted items.
///
/// The sample is split in two regions. Heavy items carry their own weight. Light items all
/// carry the adjusted weight `tau = total_light / num_light`. While fewer than `k` items have
/// been seen every item is heavy and the sample is exact.
#[derive(Debug, Clone)]
pub struct VarOptItemsSketch<T> {
    k: u32,
    n: u64,
    heavy: Vec<(T, f64)>,
    light: Vec<T>,
    total_light: f64,
    rng: SmallRng,
}

impl<T: PartialEq> PartialEq for VarOptItemsSketch<T> {
    fn eq(&self, other: &Self) -> bool {
        self.k == other.k
            && self.n == other.n
            && self.heavy == other.heavy
            && self.light == other.light
            && self.total_light == other.total_light
    }
}

enum Slot {
    Heavy(usize),
    Light(usize),
    Incoming,
}

impl<T: Clone> VarOptItemsSketch<T> {
    /// # Panics
    ///
    /// Panics if `k < 2`.
    pub fn new(k: u32) -> Self {
        assert!(k >= MIN_K, "k must be at least {MIN_K}, got {k}");
        Self::make(k, 0, Vec::new(), Vec::new(), 0.0)
    }

    /// Creates a sketch whose sampling decisions come from a fixed seed.
    pub fn with_seed(k: u32, seed: u64) -> Self {
        let mut sketch = Self::new(k);
        sketch.rng = SmallRng::seed_from_u64(seed);
        sketch
    }

    fn make(k: u32, n: u64, heavy: Vec<(T, f64)>, light: Vec<T>, total_light: f64) -> Self {
        Self {
            k,
            n,
            heavy,
            light,
            total_light,
            rng: SmallRng::from_os_rng(),
        }
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    /// Number of items presented to the sketch.
    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn num_samples(&self) -> usize {
        self.heavy.len() + self.light.len()
    }

    /// Adjusted weight shared by the light items, or 0 while the sample is exact.
    pub fn tau(&self) -> f64 {
        if self.light.is_empty() {
            0.0
        } else {
            self.total_light / self.light.len() as f64
        }
    }

    /// Samples with their adjusted weights, heavy items first.
    pub fn samples(&self) -> impl Iterator<Item = (&T, f64)> + '_ {
        let tau = self.tau();
        self.heavy
            .iter()
            .map(|(item, weight)| (item, *weight))
            .chain(self.light.iter().map(move |item| (item, tau)))
    }

    /// Adds `item` with the given weight.
    ///
    /// A weight of zero is ignored. Negative, infinite and NaN weights are rejected.
    pub fn update(&mut self, item: T, weight: f64) -> Result<(), Error> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::invalid_argument(format!(
                "item weight must be finite and non-negative, got {weight}"
            )));
        }
        if weight == 0.0 {
            return Ok(());
        }
        self.n += 1;
        self.insert(item, weight);
        Ok(())
    }

    pub(super) fn add_to_n(&mut self, n: u64) {
        self.n += n;
    }

    /// Places a weighted item in the sample without counting it in `n`.
    pub(super) fn insert(&mut self, item: T, weight: f64) {
        if self.num_samples() < self.k as usize {
            self.heavy.push((item, weight));
            return;
        }

        let tau = self.tau();
        let mut slots = Vec::with_capacity(self.num_samples() + 1);
        slots.extend(self.heavy.iter().enumerate().map(|(i, (_, w))| (*w, Slot::Heavy(i))));
        slots.extend((0..self.light.len()).map(|i| (tau, Slot::Light(i))));
        slots.push((weight, Slot::Incoming));
        slots.sort_by(|a, b| a.0.total_cmp(&b.0));

        // the m lightest slots share the new threshold sum / (m - 1)
        let mut m = 2;
        let mut sum = slots[0].0 + slots[1].0;
        while m < slots.len() && sum / (m - 1) as f64 > slots[m].0 {
            sum += slots[m].0;
            m += 1;
        }
        let new_tau = sum / (m - 1) as f64;

        // exactly one of the m light candidates leaves, with probability 1 - w / new_tau
        let u: f64 = self.rng.random();
        let mut acc = 0.0;
        let mut dropped = m - 1;
        for (i, (w, _)) in slots[..m].iter().enumerate() {
            acc += 1.0 - w / new_tau;
            if u < acc {
                dropped = i;
                break;
            }
        }

        let mut old_heavy: Vec<Option<(T, f64)>> =
            mem::take(&mut self.heavy).into_iter().map(Some).collect();
        let mut old_light: Vec<Option<T>> =
            mem::take(&mut self.light).into_iter().map(Some).collect();
        let mut incoming = Some(item);

        let mut heavy = Vec::with_capacity(self.k as usize);
        let mut light = Vec::with_capacity(m - 1);
        for (i, (w, slot)) in slots.into_iter().enumerate() {
            let taken = match slot {
                Slot::Heavy(idx) => old_heavy[idx].take().map(|(item, _)| item),
                Slot::Light(idx) => old_light[idx].take(),
                Slot::Incoming => incoming.take(),
            };
            let Some(item) = taken else { continue };
            if i == dropped {
                continue;
            }
            if i < m {
                light.push(item);
            } else {
                heavy.push((item, w));
            }
        }
        self.heavy = heavy;
        self.light = light;
        self.total_light = sum;
    }

    /// Estimates the total weight of the stream items for which `predicate` holds.
    pub fn estimate_subset_sum<P>(&self, predicate: P) -> SubsetSummary
    where
        P: Fn(&T) -> bool,
    {
        let heavy_total: f64 = self.heavy.iter().map(|(_, w)| w).sum();
        let heavy_match: f64 = self
            .heavy
            .iter()
            .filter(|(item, _)| predicate(item))
            .map(|(_, w)| w)
            .sum();
        let total_sketch_weight = heavy_total + self.total_light;
        if self.light.is_empty() {
            return SubsetSummary {
                lower_bound: heavy_match,
                estimate: heavy_match,
                upper_bound: heavy_match,
                total_sketch_weight,
            };
        }

        let r = self.light.len() as f64;
        let hits = self.light.iter().filter(|item| predicate(item)).count() as f64;
        let p = hits / r;
        let (lb_frac, ub_frac) = wilson_interval(p, r, SUBSET_SUM_STD_DEVS);
        SubsetSummary {
            lower_bound: heavy_match + self.total_light * lb_frac,
            estimate: heavy_match + self.total_light * p,
            upper_bound: heavy_match + self.total_light * ub_frac,
            total_sketch_weight,
        }
    }

    pub fn serialize_with<S: ItemsSerde<T>>(&self, serde: &S) -> Vec<u8> {
        let is_empty = self.is_empty();
        let mut bytes = SketchBytes::with_capacity(32 + 8 * self.heavy.len());
        bytes.write_u8(if is_empty {
            PREAMBLE_LONGS_EMPTY
        } else {
            PREAMBLE_LONGS_NONEMPTY
        });
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::VAROPT.id);
        bytes.write_u8(if is_empty { EMPTY_FLAG_MASK } else { 0 });
        bytes.write_u32_le(self.k);
        if is_empty {
            return bytes.into_bytes();
        }
        bytes.write_u64_le(self.n);
        bytes.write_u32_le(self.heavy.len() as u32);
        bytes.write_u32_le(self.light.len() as u32);
        bytes.write_f64_le(self.total_light);
        for (_, w) in &self.heavy {
            bytes.write_f64_le(*w);
        }
        let mut out = bytes.into_bytes();
        let items: Vec<T> = self
            .heavy
            .iter()
            .map(|(item, _)| item.clone())
            .chain(self.light.iter().cloned())
            .collect();
        serde.serialize_items(&items, &mut out);
        out
    }

    pub fn deserialize_with<S: ItemsSerde<T>>(bytes: &[u8], serde: &S) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);
        let pre_longs = cursor.read_u8().map_err(make_error("preamble_longs"))?;
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let k = cursor.read_u32_le().map_err(make_error("k"))?;

        Family::VAROPT.validate_id(family_id)?;
        Family::VAROPT.validate_pre_longs(pre_longs)?;
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        if k < MIN_K {
            return Err(Error::deserial(format!("k must be at least {MIN_K}, got {k}")));
        }
        if flags & EMPTY_FLAG_MASK != 0 {
            return Ok(Self::make(k, 0, Vec::new(), Vec::new(), 0.0));
        }
        if pre_longs != PREAMBLE_LONGS_NONEMPTY {
            return Err(Error::deserial(format!(
                "non-empty sketch must have {PREAMBLE_LONGS_NONEMPTY} preamble longs, got {pre_longs}"
            )));
        }

        let n = cursor.read_u64_le().map_err(make_error("n"))?;
        let num_heavy = cursor.read_u32_le().map_err(make_error("num_heavy"))? as usize;
        let num_light = cursor.read_u32_le().map_err(make_error("num_light"))? as usize;
        let total_light = cursor.read_f64_le().map_err(make_error("total_light"))?;

        let num_samples = num_heavy + num_light;
        if num_samples > k as usize || (num_samples as u64) > n {
            return Err(Error::deserial(format!(
                "inconsistent sample counts: heavy {num_heavy}, light {num_light}, k {k}, n {n}"
            )));
        }
        if num_light > 0 && num_samples != k as usize {
            return Err(Error::deserial("light region present in a sample that is not full"));
        }
        let light_weight_ok = if num_light == 0 {
            total_light == 0.0
        } else {
            total_light.is_finite() && total_light > 0.0
        };
        if !light_weight_ok {
            return Err(Error::deserial(format!("invalid total light weight {total_light}")));
        }

        let mut weights = Vec::with_capacity(num_heavy);
        for _ in 0..num_heavy {
            let w = cursor.read_f64_le().map_err(make_error("heavy_weights"))?;
            if !w.is_finite() || w <= 0.0 {
                return Err(Error::deserial(format!("invalid item weight {w}")));
            }
            weights.push(w);
        }

        let (mut items, _) = serde.deserialize_items(cursor.remaining(), num_samples)?;
        let light = items.split_off(num_heavy);
        let heavy = items.into_iter().zip(weights).collect();
        Ok(Self::make(k, n, heavy, light, total_light))
    }
}

/// Two-sided interval for a binomial proportion `p` observed over `n` trials.
fn wilson_interval(p: f64, n: f64, z: f64) -> (f64, f64) {
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let half = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
    ((center - half).max(0.0), (center + half).min(1.0))
}

impl<T: Clone> fmt::Display for VarOptItemsSketch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### VarOpt sketch summary:")?;
        writeln!(f, "   k            : {}", self.k)?;
        writeln!(f, "   n            : {}", self.n)?;
        writeln!(f, "   Current size : {}", self.num_samples())?;
        writeln!(f, "   Heavy items  : {}", self.heavy.len())?;
        writeln!(f, "   Light items  : {}", self.light.len())?;
        writeln!(f, "   Tau          : {}", self.tau())?;
        write!(f, "### End sketch summary")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StringSerde;

    fn total_weight<T: Clone>(sketch: &VarOptItemsSketch<T>) -> f64 {
        sketch.samples().map(|(_, w)| w).sum()
    }

    #[test]
    fn test_exact_mode_keeps_weights() {
        let mut sketch = VarOptItemsSketch::<String>::with_seed(4, 3);
        sketch.update("a".to_string(), 1.5).unwrap();
        sketch.update("b".to_string(), 2.0).unwrap();
        sketch.update("c".to_string(), 0.0).unwrap();
        assert_eq!(sketch.n(), 2);
        assert_eq!(sketch.tau(), 0.0);
        let samples: Vec<_> = sketch.samples().map(|(s, w)| (s.clone(), w)).collect();
        assert_eq!(samples, vec![("a".to_string(), 1.5), ("b".to_string(), 2.0)]);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let mut sketch = VarOptItemsSketch::<String>::new(4);
        assert!(sketch.update("x".to_string(), -1.0).is_err());
        assert!(sketch.update("x".to_string(), f64::NAN).is_err());
        assert!(sketch.update("x".to_string(), f64::INFINITY).is_err());
        assert!(sketch.is_empty());
    }

    #[test]
    fn test_total_weight_is_preserved() {
        let mut sketch = VarOptItemsSketch::<i64>::with_seed(16, 11);
        let mut expected = 0.0;
        for i in 1..=1000i64 {
            let w = (i % 7 + 1) as f64;
            expected += w;
            sketch.update(i, w).unwrap();
        }
        assert_eq!(sketch.num_samples(), 16);
        assert!((total_weight(&sketch) - expected).abs() < 1e-6 * expected);
        let summary = sketch.estimate_subset_sum(|_| true);
        assert!((summary.estimate - expected).abs() < 1e-6 * expected);
        assert!((summary.total_sketch_weight - expected).abs() < 1e-6 * expected);
    }

    #[test]
    fn test_heavy_items_are_kept() {
        let mut sketch = VarOptItemsSketch::<i64>::with_seed(8, 5);
        for i in 0..500 {
            sketch.update(i, 1.0).unwrap();
        }
        sketch.update(-1, 1e6).unwrap();
        let heavy = sketch.samples().find(|(item, _)| **item == -1);
        assert_eq!(heavy.map(|(_, w)| w), Some(1e6));
        for (item, w) in sketch.samples() {
            if *item != -1 {
                assert!((w - sketch.tau()).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_subset_sum_is_unbiased() {
        let mut total = 0.0;
        let trials = 200;
        for seed in 0..trials {
            let mut sketch = VarOptItemsSketch::<i64>::with_seed(20, seed);
            for i in 0..1000 {
                sketch.update(i, 1.0).unwrap();
            }
            let summary = sketch.estimate_subset_sum(|item| item % 2 == 0);
            assert!(summary.lower_bound <= summary.estimate);
            assert!(summary.estimate <= summary.upper_bound);
            total += summary.estimate;
        }
        let mean = total / trials as f64;
        assert!((mean - 500.0).abs() < 50.0, "mean {mean}");
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut sketch = VarOptItemsSketch::<String>::with_seed(10, 9);
        for i in 0..200 {
            sketch.update(format!("item{i}"), (i % 13 + 1) as f64).unwrap();
        }
        let bytes = sketch.serialize_with(&StringSerde);
        let restored = VarOptItemsSketch::<String>::deserialize_with(&bytes, &StringSerde).unwrap();
        assert_eq!(restored, sketch);
        assert_eq!(restored.serialize_with(&StringSerde), bytes);

        let empty = VarOptItemsSketch::<String>::new(10).serialize_with(&StringSerde);
        assert_eq!(empty.len(), 8);
        let restored = VarOptItemsSketch::<String>::deserialize_with(&empty, &StringSerde).unwrap();
        assert!(restored.is_empty());
        assert_eq!(restored.k(), 10);
    }

    #[test]
    fn test_deserialize_rejects_wrong_family() {
        let mut bytes = VarOptItemsSketch::<String>::new(4).serialize_with(&StringSerde);
        bytes[2] = Family::RESERVOIR.id;
        assert!(VarOptItemsSketch::<String>::deserialize_with(&bytes, &StringSerde).is_err());
    }
}
