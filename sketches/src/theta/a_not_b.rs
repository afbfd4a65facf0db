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

/// Set difference `A \ B` of two theta sketches.
#[derive(Debug, Clone, Copy)]
pub struct ThetaANotB;

impl ThetaANotB {
    /// Hashes of `a` below `min(theta_a, theta_b)` that do not appear in `b`.
    pub fn compute<A, B>(a: &A, b: &B) -> Result<CompactThetaSketch, Error>
    where
        A: ThetaSketchView,
        B: ThetaSketchView,
    {
        if a.is_empty() {
            return Ok(CompactThetaSketch::from_parts(
                Vec::new(),
                MAX_THETA,
                a.seed_hash(),
                true,
            ));
        }
        if !b.is_empty() {
            check_seed_hash(a.seed_hash(), b.seed_hash())?;
        }

        let theta = a.theta64().min(b.theta64());
        let mut b_hashes =
            ThetaHashTable::with_capacity_for(b.num_retained(), theta, DEFAULT_UPDATE_SEED, false);
        for hash in b.iter() {
            if hash < theta {
                b_hashes.try_insert_hash(hash);
            } else if b.is_ordered() {
                break;
            }
        }

        let mut entries: Vec<u64> = a
            .iter()
            .filter(|&h| h < theta && !b_hashes.contains_hash(h))
            .collect();
        entries.sort_unstable();
        Ok(CompactThetaSketch::from_parts(
            entries,
            theta,
            a.seed_hash(),
            false,
        ))
    }
}
