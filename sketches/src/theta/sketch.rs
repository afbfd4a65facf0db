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
use std::hash::Hash;

use super::CompactThetaSketch;
use super::ThetaSketchView;
use super::hash_table::DEFAULT_LG_K;
use super::hash_table::MAX_LG_K;
use super::hash_table::MIN_LG_K;
use super::hash_table::ThetaHashTable;
use crate::common::NumStdDev;
use crate::common::ResizeFactor;
use crate::hash::DEFAULT_UPDATE_SEED;

/// Mutable theta sketch for building from input data
#[derive(Debug, Clone)]
pub struct ThetaSketch {
    table: ThetaHashTable,
}

impl ThetaSketch {
    /// Create a new builder for ThetaSketch
    ///
    /// # Examples
    ///
    /// ```
    /// # use ds_sketches::theta::ThetaSketch;
    /// let sketch = ThetaSketch::builder().lg_k(12).build();
    /// assert_eq!(sketch.lg_k(), 12);
    /// ```
    pub fn builder() -> ThetaSketchBuilder {
        ThetaSketchBuilder::default()
    }

    /// Update the sketch with a hashable value.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ds_sketches::theta::{ThetaSketch, ThetaSketchView};
    /// let mut sketch = ThetaSketch::builder().build();
    /// sketch.update("apple");
    /// assert_eq!(sketch.estimate(), 1.0);
    /// ```
    pub fn update<T: Hash + ?Sized>(&mut self, value: &T) {
        let hash = self.table.hash(value);
        self.table.try_insert_hash(hash);
    }

    pub fn lg_k(&self) -> u8 {
        self.table.lg_nom_size()
    }

    /// Drops retained hashes beyond the nominal size k.
    pub fn trim(&mut self) {
        self.table.trim();
    }

    /// Sorted, immutable copy holding at most k hashes.
    pub fn compact(&self) -> CompactThetaSketch {
        let mut table = self.table.clone();
        table.trim();
        let theta = table.theta();
        let mut entries: Vec<u64> = table.iter().filter(|&h| h < theta).collect();
        entries.sort_unstable();
        CompactThetaSketch::from_parts(entries, theta, table.seed_hash(), table.is_empty())
    }
}

impl ThetaSketchView for ThetaSketch {
    fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn theta64(&self) -> u64 {
        self.table.theta()
    }

    fn num_retained(&self) -> usize {
        self.table.num_retained()
    }

    fn seed_hash(&self) -> u16 {
        self.table.seed_hash()
    }

    fn is_ordered(&self) -> bool {
        false
    }

    fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.table.iter()
    }
}

impl fmt::Display for ThetaSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### Update Theta sketch summary:")?;
        writeln!(f, "   lg nominal size    : {}", self.lg_k())?;
        writeln!(f, "   seed hash          : 0x{:04X}", self.seed_hash())?;
        write_common_summary(f, self)
    }
}

pub(super) fn write_common_summary<S: ThetaSketchView>(
    f: &mut fmt::Formatter<'_>,
    sketch: &S,
) -> fmt::Result {
    writeln!(f, "   empty?             : {}", sketch.is_empty())?;
    writeln!(f, "   ordered?           : {}", sketch.is_ordered())?;
    writeln!(f, "   estimation mode?   : {}", sketch.is_estimation_mode())?;
    writeln!(f, "   theta (fraction)   : {}", sketch.theta())?;
    writeln!(f, "   theta (raw 64-bit) : {}", sketch.theta64())?;
    writeln!(f, "   estimate           : {}", sketch.estimate())?;
    writeln!(f, "   lower bound 95% conf : {}", sketch.lower_bound(NumStdDev::Two))?;
    writeln!(f, "   upper bound 95% conf : {}", sketch.upper_bound(NumStdDev::Two))?;
    writeln!(f, "   num retained keys  : {}", sketch.num_retained())?;
    write!(f, "### End sketch summary")
}

#[derive(Debug)]
pub struct ThetaSketchBuilder {
    lg_k: u8,
    resize_factor: ResizeFactor,
    seed: u64,
}

impl Default for ThetaSketchBuilder {
    fn default() -> Self {
        Self {
            lg_k: DEFAULT_LG_K,
            resize_factor: ResizeFactor::X8,
            seed: DEFAULT_UPDATE_SEED,
        }
    }
}

impl ThetaSketchBuilder {
    /// Sets log2 of the nominal number of entries.
    ///
    /// # Panics
    ///
    /// Panics if `lg_k` is not in `[5, 26]`.
    pub fn lg_k(mut self, lg_k: u8) -> Self {
        assert!(
            (MIN_LG_K..=MAX_LG_K).contains(&lg_k),
            "lg_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_k}"
        );
        self.lg_k = lg_k;
        self
    }

    pub fn resize_factor(mut self, factor: ResizeFactor) -> Self {
        self.resize_factor = factor;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> ThetaSketch {
        ThetaSketch {
            table: ThetaHashTable::new(self.lg_k, self.resize_factor, self.seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_mode() {
        let mut sketch = ThetaSketch::builder().lg_k(10).build();
        assert!(sketch.is_empty());
        assert_eq!(sketch.estimate(), 0.0);
        for i in 0..500u64 {
            sketch.update(&i);
            sketch.update(&i);
        }
        assert!(!sketch.is_empty());
        assert!(!sketch.is_estimation_mode());
        assert_eq!(sketch.estimate(), 500.0);
        assert_eq!(sketch.lower_bound(NumStdDev::Two), 500.0);
        assert_eq!(sketch.upper_bound(NumStdDev::Two), 500.0);
    }

    #[test]
    fn test_estimation_mode() {
        let mut sketch = ThetaSketch::builder().lg_k(10).build();
        for i in 0..50_000u64 {
            sketch.update(&i);
        }
        assert!(sketch.is_estimation_mode());
        let est = sketch.estimate();
        assert!((est - 50_000.0).abs() < 50_000.0 * 0.1, "{est}");
        assert!(sketch.lower_bound(NumStdDev::Two) <= est);
        assert!(sketch.upper_bound(NumStdDev::Two) >= est);

        let compact = sketch.compact();
        assert!(compact.num_retained() <= 1024);
        assert!(compact.is_ordered());
        let c_est = compact.estimate();
        assert!((c_est - 50_000.0).abs() < 50_000.0 * 0.1, "{c_est}");
    }

    #[test]
    #[should_panic(expected = "lg_k must be in")]
    fn test_builder_rejects_small_lg_k() {
        ThetaSketch::builder().lg_k(4);
    }
}
