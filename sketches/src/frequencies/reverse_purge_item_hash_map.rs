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

//! Open-addressing map from item to count with median purging.
//!
//! Collisions are resolved by linear probing. Every occupied slot records how far it drifted
//! from its home slot, which lets deletion shift later entries back without rehashing.

use std::hash::Hash;
use std::hash::Hasher;

use crate::hash::MurmurHash3X64128;

const LOAD_FACTOR: f64 = 0.75;
const DRIFT_LIMIT: usize = 1024;
const MAX_SAMPLE_SIZE: usize = 1024;
const GOLDEN_RATIO_FRACTION: f64 = 0.618_033_988_749_894_9;

#[derive(Debug, Clone)]
struct Slot<T> {
    item: T,
    count: i64,
    // One more than the distance from the home slot.
    drift: u16,
}

#[derive(Debug, Clone)]
pub(super) struct ReversePurgeItemHashMap<T> {
    lg_length: u8,
    load_threshold: usize,
    slots: Vec<Option<Slot<T>>>,
    num_active: usize,
}

impl<T: Eq + Hash> ReversePurgeItemHashMap<T> {
    pub fn new(map_size: usize) -> Self {
        debug_assert!(map_size.is_power_of_two(), "map_size must be power of 2");
        Self {
            lg_length: map_size.trailing_zeros() as u8,
            load_threshold: (map_size as f64 * LOAD_FACTOR) as usize,
            slots: (0..map_size).map(|_| None).collect(),
            num_active: 0,
        }
    }

    /// Count stored for `item`, or 0.
    pub fn get(&self, item: &T) -> i64 {
        match self.find(item) {
            Ok(index) => self.slots[index].as_ref().map_or(0, |slot| slot.count),
            Err(_) => 0,
        }
    }

    pub fn adjust_or_put_value(&mut self, item: T, amount: i64) {
        match self.find(&item) {
            Ok(index) => {
                if let Some(slot) = self.slots[index].as_mut() {
                    slot.count += amount;
                }
            }
            Err((index, drift)) => {
                self.slots[index] = Some(Slot {
                    item,
                    count: amount,
                    drift,
                });
                self.num_active += 1;
            }
        }
    }

    /// Subtracts the median of a sample of counts from every count and drops the non-positive
    /// ones. Returns the median.
    pub fn purge(&mut self, sample_size: usize) -> i64 {
        let limit = sample_size.min(MAX_SAMPLE_SIZE);
        let mut samples: Vec<i64> = self
            .slots
            .iter()
            .flatten()
            .map(|slot| slot.count)
            .take(limit)
            .collect();
        if samples.is_empty() {
            return 0;
        }
        let mid = samples.len() / 2;
        let (_, &mut median, _) = samples.select_nth_unstable(mid);

        for slot in self.slots.iter_mut().flatten() {
            slot.count -= median;
        }
        self.drop_non_positive();
        tracing::trace!(median, remaining = self.num_active, "purged frequent items map");
        median
    }

    pub fn resize(&mut self, new_size: usize) {
        debug_assert!(new_size.is_power_of_two(), "new_size must be power of 2");
        let old = std::mem::take(&mut self.slots);
        *self = Self::new(new_size);
        for slot in old.into_iter().flatten() {
            self.adjust_or_put_value(slot.item, slot.count);
        }
    }

    pub fn length(&self) -> usize {
        self.slots.len()
    }

    pub fn lg_length(&self) -> u8 {
        self.lg_length
    }

    pub fn capacity(&self) -> usize {
        self.load_threshold
    }

    pub fn num_active(&self) -> usize {
        self.num_active
    }

    pub fn iter(&self) -> ReversePurgeItemIter<'_, T> {
        let size = self.slots.len();
        ReversePurgeItemIter {
            slots: &self.slots,
            remaining: self.num_active,
            index: 0,
            stride: ((size as f64 * GOLDEN_RATIO_FRACTION) as usize) | 1,
        }
    }

    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    /// `Ok(index)` of the slot holding `item`, or `Err((index, drift))` of the empty slot where
    /// it would go.
    fn find(&self, item: &T) -> Result<usize, (usize, u16)> {
        let mask = self.mask();
        let mut index = (hash_item(item) as usize) & mask;
        let mut drift = 1usize;
        while let Some(slot) = &self.slots[index] {
            if slot.item == *item {
                return Ok(index);
            }
            index = (index + 1) & mask;
            drift += 1;
            debug_assert!(drift < DRIFT_LIMIT, "drift limit exceeded");
        }
        Err((index, drift as u16))
    }

    fn drop_non_positive(&mut self) {
        // Scan backwards from an empty slot so that no cluster wraps around mid-scan.
        let len = self.slots.len();
        let mut start = len - 1;
        while self.slots[start].is_some() {
            start -= 1;
        }
        for index in (0..start).rev().chain((start..len).rev()) {
            if self.slots[index].as_ref().is_some_and(|slot| slot.count <= 0) {
                self.delete(index);
                self.num_active -= 1;
            }
        }
    }

    fn delete(&mut self, mut hole: usize) {
        self.slots[hole] = None;
        let mask = self.mask();
        let mut distance = 1usize;
        let mut index = (hole + 1) & mask;
        while let Some(slot) = &self.slots[index] {
            if slot.drift as usize > distance {
                let mut moved = self.slots[index].take();
                if let Some(slot) = moved.as_mut() {
                    slot.drift -= distance as u16;
                }
                self.slots[hole] = moved;
                hole = index;
                distance = 0;
            }
            index = (index + 1) & mask;
            distance += 1;
            debug_assert!(distance < DRIFT_LIMIT, "drift limit exceeded");
        }
    }
}

/// Visits occupied slots with a golden-ratio stride.
pub(super) struct ReversePurgeItemIter<'a, T> {
    slots: &'a [Option<Slot<T>>],
    remaining: usize,
    index: usize,
    stride: usize,
}

impl<'a, T> Iterator for ReversePurgeItemIter<'a, T> {
    type Item = (&'a T, i64);

    fn next(&mut self) -> Option<Self::Item> {
        let mask = self.slots.len() - 1;
        while self.remaining > 0 {
            let index = self.index;
            self.index = (self.index + self.stride) & mask;
            if let Some(slot) = &self.slots[index] {
                self.remaining -= 1;
                return Some((&slot.item, slot.count));
            }
        }
        None
    }
}

fn hash_item<T: Hash + ?Sized>(item: &T) -> u64 {
    let mut hasher = MurmurHash3X64128::default();
    item.hash(&mut hasher);
    hasher.finish()
}
