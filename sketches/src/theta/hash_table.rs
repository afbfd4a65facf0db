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

use crate::common::ResizeFactor;
use crate::hash::compute_seed_hash;
use crate::hash::hash128;

/// Maximum theta value, the signed 64-bit max.
pub const MAX_THETA: u64 = i64::MAX as u64;

/// Minimum log2 of K
pub const MIN_LG_K: u8 = 5;

/// Maximum log2 of K
pub const MAX_LG_K: u8 = 26;

/// Default log2 of K
pub const DEFAULT_LG_K: u8 = 12;

/// Resize threshold (0.5 = 50% load factor)
const RESIZE_THRESHOLD: f64 = 0.5;

/// Rebuild threshold (15/16 = 93.75% load factor)
pub(crate) const REBUILD_THRESHOLD: f64 = 15.0 / 16.0;

const STRIDE_HASH_BITS: u8 = 7;
const STRIDE_MASK: u64 = (1 << STRIDE_HASH_BITS) - 1;

/// Open-addressing table of retained hashes.
///
/// The table grows by `resize_factor` until it reaches `2^(lg_nom_size + 1)` slots. From then on,
/// whenever it passes the rebuild threshold it keeps only the `2^lg_nom_size` smallest hashes and
/// lowers theta to the next smallest one.
#[derive(Debug, Clone)]
pub(crate) struct ThetaHashTable {
    lg_cur_size: u8,
    lg_nom_size: u8,
    lg_max_size: u8,
    resize_factor: ResizeFactor,
    hash_seed: u64,

    // Emptiness of the source set; can be false with nothing retained when theta screened
    // every update.
    is_empty: bool,

    theta: u64,

    entries: Vec<u64>,

    num_retained: usize,
}

impl ThetaHashTable {
    pub fn new(lg_nom_size: u8, resize_factor: ResizeFactor, hash_seed: u64) -> Self {
        let lg_cur_size =
            starting_sub_multiple(lg_nom_size + 1, MIN_LG_K, resize_factor.lg_value());
        Self::from_raw_parts(
            lg_cur_size,
            lg_nom_size,
            resize_factor,
            MAX_THETA,
            hash_seed,
            true,
        )
    }

    /// Creates a table with explicit state.
    ///
    /// # Panics
    ///
    /// Panics if `lg_cur_size > lg_nom_size + 1`.
    pub fn from_raw_parts(
        lg_cur_size: u8,
        lg_nom_size: u8,
        resize_factor: ResizeFactor,
        theta: u64,
        hash_seed: u64,
        is_empty: bool,
    ) -> Self {
        let lg_max_size = lg_nom_size + 1;
        assert!(
            lg_cur_size <= lg_max_size,
            "lg_cur_size must be <= lg_nom_size + 1, got lg_cur_size={lg_cur_size}, lg_nom_size={lg_nom_size}"
        );
        Self {
            lg_cur_size,
            lg_nom_size,
            lg_max_size,
            resize_factor,
            hash_seed,
            is_empty,
            theta,
            entries: vec![0u64; 1 << lg_cur_size],
            num_retained: 0,
        }
    }

    /// Table sized to hold `count` hashes without resizing or rebuilding.
    pub fn with_capacity_for(count: usize, theta: u64, hash_seed: u64, is_empty: bool) -> Self {
        let lg_size = lg_size_from_count(count, REBUILD_THRESHOLD);
        Self::from_raw_parts(
            lg_size,
            lg_size - 1,
            ResizeFactor::X1,
            theta,
            hash_seed,
            is_empty,
        )
    }

    /// Hashes a value with the table seed.
    pub fn hash<T: std::hash::Hash + ?Sized>(&self, value: &T) -> u64 {
        let (h1, _) = hash128(value, self.hash_seed);
        h1 >> 1
    }

    /// Index of `key` or of the empty slot where it belongs.
    fn find_in_entries(entries: &[u64], key: u64, lg_size: u8) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }
        let mask = entries.len() - 1;
        let stride = Self::get_stride(key, lg_size);
        let mut index = (key as usize) & mask;
        let loop_index = index;
        loop {
            let entry = entries[index];
            if entry == 0 || entry == key {
                return Some(index);
            }
            index = (index + stride) & mask;
            if index == loop_index {
                return None;
            }
        }
    }

    /// Inserts a pre-hashed value. Returns true if the value was new and below theta.
    pub fn try_insert_hash(&mut self, hash: u64) -> bool {
        self.is_empty = false;
        if hash == 0 || hash >= self.theta {
            return false;
        }
        // The load thresholds keep at least one slot free.
        let Some(index) = Self::find_in_entries(&self.entries, hash, self.lg_cur_size) else {
            return false;
        };
        if self.entries[index] == hash {
            return false;
        }
        self.entries[index] = hash;
        self.num_retained += 1;

        if self.num_retained > self.capacity() {
            if self.lg_cur_size <= self.lg_nom_size {
                self.resize();
            } else {
                self.rebuild();
            }
        }
        true
    }

    pub fn contains_hash(&self, hash: u64) -> bool {
        Self::find_in_entries(&self.entries, hash, self.lg_cur_size)
            .is_some_and(|index| self.entries[index] == hash)
    }

    fn capacity(&self) -> usize {
        let fraction = if self.lg_cur_size <= self.lg_nom_size {
            RESIZE_THRESHOLD
        } else {
            REBUILD_THRESHOLD
        };
        (fraction * self.entries.len() as f64) as usize
    }

    fn resize(&mut self) {
        let new_lg_size = (self.lg_cur_size + self.resize_factor.lg_value().max(1))
            .min(self.lg_max_size);
        let mut new_entries = vec![0u64; 1 << new_lg_size];
        for &entry in self.entries.iter().filter(|&&e| e != 0) {
            if let Some(idx) = Self::find_in_entries(&new_entries, entry, new_lg_size) {
                new_entries[idx] = entry;
            }
        }
        self.entries = new_entries;
        self.lg_cur_size = new_lg_size;
    }

    /// Keeps the `k` smallest hashes and sets theta to the k-th smallest.
    fn rebuild(&mut self) {
        self.entries.retain(|&e| e != 0);
        let k = 1usize << self.lg_nom_size;
        let (lesser, kth, _) = self.entries.select_nth_unstable(k);
        self.theta = *kth;

        let mut new_entries = vec![0u64; 1 << self.lg_cur_size];
        let mut num_inserted = 0;
        for &entry in lesser.iter() {
            if let Some(idx) = Self::find_in_entries(&new_entries, entry, self.lg_cur_size) {
                new_entries[idx] = entry;
                num_inserted += 1;
            }
        }
        tracing::trace!(theta = self.theta, retained = num_inserted, "rebuilt theta table");
        self.num_retained = num_inserted;
        self.entries = new_entries;
    }

    /// Trims the table to the nominal size k.
    pub fn trim(&mut self) {
        if self.num_retained > (1 << self.lg_nom_size) {
            self.rebuild();
        }
    }

    pub fn num_retained(&self) -> usize {
        self.num_retained
    }

    pub fn theta(&self) -> u64 {
        self.theta
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn set_theta(&mut self, theta: u64) {
        self.theta = theta;
    }

    pub fn set_empty(&mut self, is_empty: bool) {
        self.is_empty = is_empty;
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().copied().filter(|&e| e != 0)
    }

    pub fn lg_nom_size(&self) -> u8 {
        self.lg_nom_size
    }

    pub fn hash_seed(&self) -> u64 {
        self.hash_seed
    }

    /// Hash of the seed that was used to hash the input.
    pub fn seed_hash(&self) -> u16 {
        compute_seed_hash(self.hash_seed)
    }

    fn get_stride(key: u64, lg_size: u8) -> usize {
        (2 * ((key >> lg_size) & STRIDE_MASK) + 1) as usize
    }
}

/// Smallest lg table size that holds `count` entries under `load_factor`.
fn lg_size_from_count(count: usize, load_factor: f64) -> u8 {
    let needed = ((count as f64 / load_factor).ceil() as usize + 1).max(1 << MIN_LG_K);
    needed.next_power_of_two().trailing_zeros() as u8
}

/// Initial lg size so that `lg_target = lg_init + n * lg_resize_factor` with `lg_init >= lg_min`.
fn starting_sub_multiple(lg_target: u8, lg_min: u8, lg_resize_factor: u8) -> u8 {
    if lg_target <= lg_min {
        lg_min
    } else if lg_resize_factor == 0 {
        lg_target
    } else {
        ((lg_target - lg_min) % lg_resize_factor) + lg_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::DEFAULT_UPDATE_SEED;

    fn insert_values(table: &mut ThetaHashTable, range: std::ops::Range<u64>) -> usize {
        let mut inserted = 0;
        for i in range {
            let hash = table.hash(&format!("value_{i}"));
            if table.try_insert_hash(hash) {
                inserted += 1;
            }
        }
        inserted
    }

    #[test]
    fn test_new_hash_table() {
        let table = ThetaHashTable::new(8, ResizeFactor::X8, DEFAULT_UPDATE_SEED);
        assert_eq!(table.lg_cur_size, starting_sub_multiple(9, MIN_LG_K, 3));
        assert_eq!(table.theta(), MAX_THETA);
        assert_eq!(table.num_retained(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_dedup_and_screen() {
        let mut table = ThetaHashTable::new(5, ResizeFactor::X8, DEFAULT_UPDATE_SEED);
        let hash = table.hash("test_value");
        assert!(table.try_insert_hash(hash));
        assert!(!table.try_insert_hash(hash));
        assert!(table.contains_hash(hash));
        assert_eq!(table.num_retained(), 1);

        table.theta = 1;
        assert!(!table.try_insert_hash(table.hash("screened")));
        assert_eq!(table.num_retained(), 1);
    }

    #[test]
    fn test_resize() {
        let mut table = ThetaHashTable::new(8, ResizeFactor::X2, DEFAULT_UPDATE_SEED);
        assert_eq!(table.entries.len(), 32);
        let inserted = insert_values(&mut table, 0..20);
        assert_eq!(table.num_retained(), inserted);
        assert_eq!(table.entries.len(), 64);
    }

    #[test]
    fn test_rebuild_lowers_theta() {
        let mut table = ThetaHashTable::new(5, ResizeFactor::X8, DEFAULT_UPDATE_SEED);
        assert_eq!(table.entries.len(), 64);
        insert_values(&mut table, 0..100);
        let theta = table.theta();
        assert!(theta < MAX_THETA);
        insert_values(&mut table, 100..200);
        assert!(table.theta() < theta);
        assert!(table.iter().all(|h| h < table.theta()));

        table.trim();
        assert!(table.num_retained() <= 32);
    }

    #[test]
    fn test_with_capacity_for_holds_count() {
        let mut table = ThetaHashTable::with_capacity_for(100, MAX_THETA, DEFAULT_UPDATE_SEED, false);
        let inserted = insert_values(&mut table, 0..100);
        assert_eq!(inserted, 100);
        assert_eq!(table.theta(), MAX_THETA);
    }
}
