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
use super::hash_table::MAX_THETA;
use super::hash_table::ThetaHashTable;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;

/// Intersection of theta sketches.
///
/// The first update copies the incoming hashes; each later update keeps only the hashes found in
/// both. Theta is the minimum over all inputs.
#[derive(Debug, Clone)]
pub struct ThetaIntersection {
    is_valid: bool,
    table: ThetaHashTable,
}

impl Default for ThetaIntersection {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_SEED)
    }
}

impl ThetaIntersection {
    pub fn new(seed: u64) -> Self {
        Self {
            is_valid: false,
            table: ThetaHashTable::with_capacity_for(0, MAX_THETA, seed, false),
        }
    }

    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        if self.is_valid && self.table.is_empty() {
            return Ok(());
        }
        if !sketch.is_empty() {
            check_seed_hash(self.table.seed_hash(), sketch.seed_hash())?;
        }

        let is_empty = self.table.is_empty() || sketch.is_empty();
        let theta = if is_empty {
            MAX_THETA
        } else {
            self.table.theta().min(sketch.theta64())
        };
        let seed = self.table.hash_seed();

        if self.is_valid && self.table.num_retained() == 0 {
            self.table.set_theta(theta);
            self.table.set_empty(is_empty);
            return Ok(());
        }

        if !self.is_valid {
            self.is_valid = true;
            let mut table =
                ThetaHashTable::with_capacity_for(sketch.num_retained(), theta, seed, is_empty);
            for hash in sketch.iter().filter(|&h| h < theta) {
                table.try_insert_hash(hash);
            }
            table.set_empty(is_empty);
            self.table = table;
            return Ok(());
        }

        let mut matched = Vec::with_capacity(self.table.num_retained().min(sketch.num_retained()));
        for hash in sketch.iter() {
            if hash < theta {
                if self.table.contains_hash(hash) {
                    matched.push(hash);
                }
            } else if sketch.is_ordered() {
                break;
            }
        }
        let mut table = ThetaHashTable::with_capacity_for(matched.len(), theta, seed, is_empty);
        for hash in matched {
            if !table.try_insert_hash(hash) {
                return Err(Error::invalid_argument(
                    "duplicate key, possibly corrupted input sketch",
                ));
            }
        }
        table.set_empty(is_empty);
        self.table = table;
        Ok(())
    }

    pub fn has_result(&self) -> bool {
        self.is_valid
    }

    /// Sorted result. Fails if no sketch has been presented yet.
    pub fn result(&self) -> Result<CompactThetaSketch, Error> {
        if !self.is_valid {
            return Err(Error::invalid_argument(
                "intersection has no result before the first update",
            ));
        }
        let mut entries: Vec<u64> = self.table.iter().collect();
        entries.sort_unstable();
        Ok(CompactThetaSketch::from_parts(
            entries,
            self.table.theta(),
            self.table.seed_hash(),
            self.table.is_empty(),
        ))
    }
}
