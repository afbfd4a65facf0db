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

use super::CompactThetaSketch;
use super::ThetaSketchView;
use super::check_seed_hash;
use super::hash_table::DEFAULT_LG_K;
use super::hash_table::MAX_LG_K;
use super::hash_table::MAX_THETA;
use super::hash_table::MIN_LG_K;
use super::hash_table::ThetaHashTable;
use crate::common::ResizeFactor;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;

/// Union of theta sketches.
///
/// The result keeps at most `2^lg_k` hashes; theta is the smallest of the inputs' thetas and the
/// union table's own theta.
#[derive(Debug, Clone)]
pub struct ThetaUnion {
    table: ThetaHashTable,
    union_theta: u64,
    is_empty: bool,
}

impl Default for ThetaUnion {
    fn default() -> Self {
        Self::new(DEFAULT_LG_K)
    }
}

impl ThetaUnion {
    /// # Panics
    ///
    /// Panics if `lg_k` is not in `[5, 26]`.
    pub fn new(lg_k: u8) -> Self {
        Self::with_seed(lg_k, DEFAULT_UPDATE_SEED)
    }

    pub fn with_seed(lg_k: u8, seed: u64) -> Self {
        assert!(
            (MIN_LG_K..=MAX_LG_K).contains(&lg_k),
            "lg_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_k}"
        );
        Self {
            table: ThetaHashTable::new(lg_k, ResizeFactor::X8, seed),
            union_theta: MAX_THETA,
            is_empty: true,
        }
    }

    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        if sketch.is_empty() {
            return Ok(());
        }
        check_seed_hash(self.table.seed_hash(), sketch.seed_hash())?;
        self.is_empty = false;
        self.union_theta = self.union_theta.min(sketch.theta64());
        for hash in sketch.iter() {
            if hash < self.union_theta && hash < self.table.theta() {
                self.table.try_insert_hash(hash);
            } else if sketch.is_ordered() {
                break;
            }
        }
        Ok(())
    }

    /// Sorted result holding at most k hashes.
    pub fn result(&self) -> CompactThetaSketch {
        let k = 1usize << self.table.lg_nom_size();
        let mut theta = self.union_theta.min(self.table.theta());
        let mut entries: Vec<u64> = self.table.iter().filter(|&h| h < theta).collect();
        entries.sort_unstable();
        if entries.len() > k {
            theta = entries[k];
            entries.truncate(k);
        }
        CompactThetaSketch::from_parts(entries, theta, self.table.seed_hash(), self.is_empty)
    }
}
