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

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::DEFAULT_K;
use super::DEFAULT_M;
use super::MAX_K;
use super::MIN_K;
use super::helper::compute_total_capacity;
use super::helper::level_capacity;
use super::helper::sum_the_sample_weights;
use super::serialization::DATA_START;
use super::serialization::DATA_START_SINGLE_ITEM;
use super::serialization::EMPTY_SIZE_BYTES;
use super::serialization::FLAG_EMPTY;
use super::serialization::FLAG_LEVEL_ZERO_SORTED;
use super::serialization::FLAG_SINGLE_ITEM;
use super::serialization::PREAMBLE_INTS_FULL;
use super::serialization::PREAMBLE_INTS_SHORT;
use super::serialization::SERIAL_VERSION_1;
use super::serialization::SERIAL_VERSION_2;
use super::sorted_view::SortedView;
use crate::codec::Family;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;

/// KLL sketch for estimating quantiles and ranks of `f64` values.
///
/// See the [kll module level documentation](crate::kll) for more.
#[derive(Debug, Clone)]
pub struct KllSketch {
    k: u16,
    m: u8,
    min_k: u16,
    n: u64,
    is_level_zero_sorted: bool,
    levels: Vec<Vec<f64>>,
    min_item: Option<f64>,
    max_item: Option<f64>,
    rng: SmallRng,
}

impl Default for KllSketch {
    fn default() -> Self {
        Self::new(DEFAULT_K)
    }
}

impl PartialEq for KllSketch {
    fn eq(&self, other: &Self) -> bool {
        self.k == other.k
            && self.m == other.m
            && self.min_k == other.min_k
            && self.n == other.n
            && self.is_level_zero_sorted == other.is_level_zero_sorted
            && self.levels == other.levels
            && self.min_item == other.min_item
            && self.max_item == other.max_item
    }
}

impl KllSketch {
    /// Creates a new sketch with the given value of k.
    ///
    /// # Panics
    ///
    /// Panics if k is not in [MIN_K, MAX_K].
    ///
    /// # Examples
    ///
    /// ```
    /// # use ds_sketches::kll::KllSketch;
    /// let sketch = KllSketch::new(200);
    /// assert_eq!(sketch.k(), 200);
    /// ```
    pub fn new(k: u16) -> Self {
        assert!(
            (MIN_K..=MAX_K).contains(&k),
            "k must be in [{MIN_K}, {MAX_K}], got {k}"
        );
        Self::make(k, k, 0, vec![Vec::new()], None, None, false)
    }

    /// Creates a sketch whose compaction coin flips come from a fixed seed.
    ///
    /// Two sketches built with the same seed and fed the same stream retain the same items.
    pub fn with_seed(k: u16, seed: u64) -> Self {
        let mut sketch = Self::new(k);
        sketch.rng = SmallRng::seed_from_u64(seed);
        sketch
    }

    /// Returns parameter k used to configure this sketch.
    pub fn k(&self) -> u16 {
        self.k
    }

    /// Returns the minimum k of any sketch merged into this one.
    pub fn min_k(&self) -> u16 {
        self.min_k
    }

    /// Returns total weight of the stream.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Returns true if the sketch has not seen any data.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns the number of retained items.
    pub fn num_retained(&self) -> usize {
        self.levels.iter().map(|level| level.len()).sum()
    }

    /// Returns the number of compaction levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Returns true if the sketch is in estimation mode.
    pub fn is_estimation_mode(&self) -> bool {
        self.levels.len() > 1
    }

    /// Returns the minimum item seen by the sketch.
    pub fn min_item(&self) -> Option<f64> {
        self.min_item
    }

    /// Returns the maximum item seen by the sketch.
    pub fn max_item(&self) -> Option<f64> {
        self.max_item
    }

    /// Updates the sketch with a new item. NaN values are ignored.
    pub fn update(&mut self, item: f64) {
        if item.is_nan() {
            return;
        }
        self.update_min_max(item);
        self.internal_update(item);
    }

    /// Merges another sketch into this one.
    pub fn merge(&mut self, other: &KllSketch) {
        if other.is_empty() {
            return;
        }

        self.update_min_max_from_other(other);

        let final_n = self.n + other.n;
        for &item in &other.levels[0] {
            self.internal_update(item);
        }

        if other.levels.len() >= 2 {
            self.merge_higher_levels(other);
        }

        self.n = final_n;
        if other.is_estimation_mode() {
            self.min_k = self.min_k.min(other.min_k);
        }

        debug_assert_eq!(self.total_weight(), self.n, "total weight does not match n");
    }

    /// Returns the normalized rank of the given item, or `None` if the sketch is empty.
    pub fn rank(&self, item: f64, inclusive: bool) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(SortedView::new(&self.levels).rank(item, inclusive))
    }

    /// Returns the quantile for the given normalized rank.
    ///
    /// # Errors
    ///
    /// Fails if the sketch is empty or rank is not in [0.0, 1.0].
    pub fn quantile(&self, rank: f64, inclusive: bool) -> Result<f64, Error> {
        self.check_not_empty()?;
        if !(0.0..=1.0).contains(&rank) {
            return Err(Error::invalid_argument(format!(
                "rank must be in [0.0, 1.0], got {rank}"
            )));
        }
        Ok(SortedView::new(&self.levels).quantile(rank, inclusive))
    }

    /// Returns the quantiles for each of the given normalized ranks.
    pub fn quantiles(&self, ranks: &[f64], inclusive: bool) -> Result<Vec<f64>, Error> {
        self.check_not_empty()?;
        let view = SortedView::new(&self.levels);
        ranks
            .iter()
            .map(|&rank| {
                if (0.0..=1.0).contains(&rank) {
                    Ok(view.quantile(rank, inclusive))
                } else {
                    Err(Error::invalid_argument(format!(
                        "rank must be in [0.0, 1.0], got {rank}"
                    )))
                }
            })
            .collect()
    }

    /// Returns the approximate CDF for the given split points.
    ///
    /// The result has one more entry than `split_points`; the last is always 1.0.
    pub fn cdf(&self, split_points: &[f64], inclusive: bool) -> Result<Vec<f64>, Error> {
        self.check_not_empty()?;
        SortedView::new(&self.levels).cdf(split_points, inclusive)
    }

    /// Returns the approximate PMF for the given split points.
    pub fn pmf(&self, split_points: &[f64], inclusive: bool) -> Result<Vec<f64>, Error> {
        self.check_not_empty()?;
        SortedView::new(&self.levels).pmf(split_points, inclusive)
    }

    /// Returns normalized rank error for the configured k.
    pub fn normalized_rank_error(&self, pmf: bool) -> f64 {
        normalized_rank_error(self.min_k, pmf)
    }

    /// Serializes the sketch to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.serialized_size());

        let is_empty = self.is_empty();
        let is_single_item = self.n == 1;

        let preamble_ints = if is_empty || is_single_item {
            PREAMBLE_INTS_SHORT
        } else {
            PREAMBLE_INTS_FULL
        };
        let serial_version = if is_single_item {
            SERIAL_VERSION_2
        } else {
            SERIAL_VERSION_1
        };

        let mut flags = 0;
        if is_empty {
            flags |= FLAG_EMPTY;
        }
        if self.is_level_zero_sorted {
            flags |= FLAG_LEVEL_ZERO_SORTED;
        }
        if is_single_item {
            flags |= FLAG_SINGLE_ITEM;
        }

        bytes.write_u8(preamble_ints);
        bytes.write_u8(serial_version);
        bytes.write_u8(Family::KLL.id);
        bytes.write_u8(flags);
        bytes.write_u16_le(self.k);
        bytes.write_u8(self.m);
        bytes.write_u8(0);

        if is_empty {
            return bytes.into_bytes();
        }

        if !is_single_item {
            bytes.write_u64_le(self.n);
            bytes.write_u16_le(self.min_k);
            bytes.write_u8(self.levels.len() as u8);
            bytes.write_u8(0);

            let level_offsets = self.level_offsets();
            for offset in level_offsets.iter().take(self.levels.len()) {
                bytes.write_u32_le(*offset);
            }

            bytes.write_f64_le(self.min_item.unwrap_or(f64::NAN));
            bytes.write_f64_le(self.max_item.unwrap_or(f64::NAN));
        }

        for level in &self.levels {
            for item in level {
                bytes.write_f64_le(*item);
            }
        }

        bytes.into_bytes()
    }

    /// Deserializes a sketch from bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<KllSketch, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);

        let preamble_ints = cursor.read_u8().map_err(make_error("preamble_ints"))?;
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let k = cursor.read_u16_le().map_err(make_error("k"))?;
        let m = cursor.read_u8().map_err(make_error("m"))?;
        let _unused = cursor.read_u8().map_err(make_error("unused"))?;

        Family::KLL.validate_id(family_id)?;
        if m != DEFAULT_M {
            return Err(Error::deserial(format!(
                "invalid m: expected {DEFAULT_M}, got {m}"
            )));
        }
        if serial_version != SERIAL_VERSION_1 && serial_version != SERIAL_VERSION_2 {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION_1,
                serial_version,
            ));
        }

        let is_empty = (flags & FLAG_EMPTY) != 0;
        let is_single_item = (flags & FLAG_SINGLE_ITEM) != 0;
        let is_level_zero_sorted = (flags & FLAG_LEVEL_ZERO_SORTED) != 0;
        let expected_preamble = if is_empty || is_single_item {
            PREAMBLE_INTS_SHORT
        } else {
            PREAMBLE_INTS_FULL
        };
        if preamble_ints != expected_preamble {
            return Err(Error::deserial(format!(
                "invalid preamble ints: expected {expected_preamble}, got {preamble_ints}"
            )));
        }
        if k < MIN_K {
            return Err(Error::deserial(format!("k out of range: {k}")));
        }

        if is_empty {
            return Ok(Self::make(
                k,
                k,
                0,
                vec![Vec::new()],
                None,
                None,
                is_level_zero_sorted,
            ));
        }

        if is_single_item {
            let item = cursor.read_f64_le().map_err(make_error("single_item"))?;
            return Ok(Self::make(
                k,
                k,
                1,
                vec![vec![item]],
                Some(item),
                Some(item),
                is_level_zero_sorted,
            ));
        }

        let n = cursor.read_u64_le().map_err(make_error("n"))?;
        let min_k = cursor.read_u16_le().map_err(make_error("min_k"))?;
        let num_levels = cursor.read_u8().map_err(make_error("num_levels"))? as usize;
        let _unused = cursor.read_u8().map_err(make_error("unused2"))?;

        if num_levels == 0 {
            return Err(Error::deserial("num_levels must be > 0"));
        }
        if min_k < MIN_K || min_k > k {
            return Err(Error::deserial(format!(
                "min_k must be in [{MIN_K}, {k}], got {min_k}"
            )));
        }

        let capacity = compute_total_capacity(k, DEFAULT_M, num_levels);
        let mut level_offsets = Vec::with_capacity(num_levels + 1);
        for _ in 0..num_levels {
            level_offsets.push(cursor.read_u32_le().map_err(make_error("levels"))?);
        }
        level_offsets.push(capacity);

        if level_offsets[0] > capacity {
            return Err(Error::deserial("levels[0] exceeds capacity"));
        }
        if level_offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::deserial("levels array must be non-decreasing"));
        }

        let min_item = cursor.read_f64_le().map_err(make_error("min_item"))?;
        let max_item = cursor.read_f64_le().map_err(make_error("max_item"))?;

        let mut levels = Vec::with_capacity(num_levels);
        for level in 0..num_levels {
            let size = (level_offsets[level + 1] - level_offsets[level]) as usize;
            let mut items = Vec::with_capacity(size);
            for _ in 0..size {
                items.push(cursor.read_f64_le().map_err(make_error("items"))?);
            }
            levels.push(items);
        }

        let sketch = Self::make(
            k,
            min_k,
            n,
            levels,
            Some(min_item),
            Some(max_item),
            is_level_zero_sorted,
        );
        if sketch.total_weight() != n {
            return Err(Error::deserial(format!(
                "level weights sum to {}, expected n = {n}",
                sketch.total_weight()
            )));
        }
        Ok(sketch)
    }

    fn make(
        k: u16,
        min_k: u16,
        n: u64,
        levels: Vec<Vec<f64>>,
        min_item: Option<f64>,
        max_item: Option<f64>,
        is_level_zero_sorted: bool,
    ) -> Self {
        Self {
            k,
            m: DEFAULT_M,
            min_k,
            n,
            is_level_zero_sorted,
            levels,
            min_item,
            max_item,
            rng: SmallRng::from_os_rng(),
        }
    }

    fn check_not_empty(&self) -> Result<(), Error> {
        if self.is_empty() {
            Err(Error::invalid_argument("operation is undefined for an empty sketch"))
        } else {
            Ok(())
        }
    }

    fn capacity(&self) -> usize {
        compute_total_capacity(self.k, self.m, self.levels.len()) as usize
    }

    fn level_offsets(&self) -> Vec<u32> {
        let capacity = self.capacity() as u32;
        let retained = self.num_retained() as u32;
        debug_assert!(capacity >= retained, "capacity must be >= retained");

        let mut offsets = Vec::with_capacity(self.levels.len() + 1);
        let mut offset = capacity.saturating_sub(retained);
        offsets.push(offset);
        for level in &self.levels {
            offset += level.len() as u32;
            offsets.push(offset);
        }
        offsets
    }

    fn serialized_size(&self) -> usize {
        if self.is_empty() {
            return EMPTY_SIZE_BYTES;
        }
        if self.n == 1 {
            return DATA_START_SINGLE_ITEM + 8;
        }
        DATA_START + self.levels.len() * 4 + 2 * 8 + self.num_retained() * 8
    }

    fn update_min_max(&mut self, item: f64) {
        self.min_item = Some(self.min_item.map_or(item, |min| min.min(item)));
        self.max_item = Some(self.max_item.map_or(item, |max| max.max(item)));
    }

    fn update_min_max_from_other(&mut self, other: &KllSketch) {
        if let Some(other_min) = other.min_item {
            self.update_min_max(other_min);
        }
        if let Some(other_max) = other.max_item {
            self.update_min_max(other_max);
        }
    }

    fn internal_update(&mut self, item: f64) {
        if self.num_retained() >= self.capacity() {
            self.compress_while_updating();
        }
        self.n += 1;
        self.is_level_zero_sorted = false;
        self.levels[0].push(item);
    }

    fn compress_while_updating(&mut self) {
        let level = self.find_level_to_compact();
        if level + 1 == self.levels.len() {
            self.levels.push(Vec::new());
        }

        let mut current = std::mem::take(&mut self.levels[level]);
        let above = std::mem::take(&mut self.levels[level + 1]);

        let leftover = if current.len() % 2 == 1 {
            current.pop()
        } else {
            None
        };

        if level == 0 && !self.is_level_zero_sorted {
            current.sort_by(f64::total_cmp);
        }

        let promoted = downsample(current, self.rng.random::<bool>(), above.is_empty());
        self.levels[level + 1] = merge_sorted_vec(promoted, above);
        self.levels[level] = leftover.into_iter().collect();
    }

    fn find_level_to_compact(&self) -> usize {
        let num_levels = self.levels.len();
        (0..num_levels)
            .find(|&level| {
                self.levels[level].len() as u32 >= level_capacity(self.k, num_levels, level, self.m)
            })
            // the retained count exceeds total capacity, so some level is full
            .unwrap_or(num_levels - 1)
    }

    fn merge_higher_levels(&mut self, other: &KllSketch) {
        let provisional_levels = self.levels.len().max(other.levels.len());
        let mut self_levels = std::mem::take(&mut self.levels);
        let mut work_levels = vec![Vec::new(); provisional_levels];
        work_levels[0] = std::mem::take(&mut self_levels[0]);

        for level in 1..provisional_levels {
            let left = self_levels
                .get_mut(level)
                .map(std::mem::take)
                .unwrap_or_default();
            let right = other.levels.get(level).cloned().unwrap_or_default();
            work_levels[level] = merge_sorted_vec(left, right);
        }

        self.levels = general_compress(
            work_levels,
            self.k,
            self.m,
            self.is_level_zero_sorted,
            &mut self.rng,
        );
    }

    fn total_weight(&self) -> u64 {
        let sizes: Vec<usize> = self.levels.iter().map(|level| level.len()).collect();
        sum_the_sample_weights(&sizes)
    }
}

impl fmt::Display for KllSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### KLL sketch summary:")?;
        writeln!(f, "   K              : {}", self.k)?;
        writeln!(f, "   min K          : {}", self.min_k)?;
        writeln!(f, "   M              : {}", self.m)?;
        writeln!(f, "   N              : {}", self.n)?;
        writeln!(f, "   Epsilon        : {:.3}%", self.normalized_rank_error(false) * 100.0)?;
        writeln!(f, "   Epsilon PMF    : {:.3}%", self.normalized_rank_error(true) * 100.0)?;
        writeln!(f, "   Empty          : {}", self.is_empty())?;
        writeln!(f, "   Estimation mode: {}", self.is_estimation_mode())?;
        writeln!(f, "   Levels         : {}", self.levels.len())?;
        writeln!(f, "   Sorted         : {}", self.is_level_zero_sorted)?;
        writeln!(f, "   Capacity items : {}", self.capacity())?;
        writeln!(f, "   Retained items : {}", self.num_retained())?;
        if let (Some(min), Some(max)) = (self.min_item, self.max_item) {
            writeln!(f, "   Min item       : {min}")?;
            writeln!(f, "   Max item       : {max}")?;
        }
        write!(f, "### End sketch summary")
    }
}

fn normalized_rank_error(k: u16, pmf: bool) -> f64 {
    let k = k as f64;
    if pmf {
        2.446 / k.powf(0.9433)
    } else {
        2.296 / k.powf(0.9723)
    }
}

/// Keeps every other item of an even-length sorted run, starting at an offset picked by `coin`.
fn downsample(items: Vec<f64>, coin: bool, use_up: bool) -> Vec<f64> {
    let len = items.len();
    debug_assert!(len % 2 == 0, "length must be even");
    let offset = coin as usize;
    let parity = if use_up && len > 0 {
        (len - 1 - offset) % 2
    } else {
        offset
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| (idx % 2 == parity).then_some(item))
        .collect()
}

fn merge_sorted_vec(left: Vec<f64>, right: Vec<f64>) -> Vec<f64> {
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left_iter = left.into_iter().peekable();
    let mut right_iter = right.into_iter().peekable();

    while let (Some(&l), Some(&r)) = (left_iter.peek(), right_iter.peek()) {
        if l < r {
            merged.push(l);
            left_iter.next();
        } else {
            merged.push(r);
            right_iter.next();
        }
    }
    merged.extend(left_iter);
    merged.extend(right_iter);
    merged
}

fn general_compress(
    mut levels_in: Vec<Vec<f64>>,
    k: u16,
    m: u8,
    is_level_zero_sorted: bool,
    rng: &mut SmallRng,
) -> Vec<Vec<f64>> {
    let mut current_num_levels = levels_in.len();
    let mut current_item_count: usize = levels_in.iter().map(|level| level.len()).sum();
    let mut target_item_count = compute_total_capacity(k, m, current_num_levels) as usize;
    let mut levels_out = Vec::with_capacity(current_num_levels + 1);

    let mut current_level = 0usize;
    while current_level < current_num_levels {
        if current_level + 1 >= levels_in.len() {
            levels_in.push(Vec::new());
        }

        let raw_pop = levels_in[current_level].len();
        let cap = level_capacity(k, current_num_levels, current_level, m) as usize;

        if current_item_count < target_item_count || raw_pop < cap {
            levels_out.push(std::mem::take(&mut levels_in[current_level]));
        } else {
            let mut current = std::mem::take(&mut levels_in[current_level]);
            let above = std::mem::take(&mut levels_in[current_level + 1]);

            let leftover = if current.len() % 2 == 1 {
                current.pop()
            } else {
                None
            };

            if current_level == 0 && !is_level_zero_sorted {
                current.sort_by(f64::total_cmp);
            }

            let promoted = downsample(current, rng.random::<bool>(), above.is_empty());
            let promoted_len = promoted.len();
            levels_in[current_level + 1] = merge_sorted_vec(promoted, above);
            levels_out.push(leftover.into_iter().collect());

            current_item_count = current_item_count.saturating_sub(promoted_len);

            if current_level == current_num_levels - 1 {
                current_num_levels += 1;
                target_item_count += level_capacity(k, current_num_levels, 0, m) as usize;
                if levels_in.len() < current_num_levels + 1 {
                    levels_in.resize_with(current_num_levels + 1, Vec::new);
                }
            }
        }
        current_level += 1;
    }

    levels_out.truncate(current_num_levels);
    levels_out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsample_keeps_half() {
        let kept = downsample(vec![1.0, 2.0, 3.0, 4.0], false, false);
        assert_eq!(kept, vec![1.0, 3.0]);
        let kept = downsample(vec![1.0, 2.0, 3.0, 4.0], true, false);
        assert_eq!(kept, vec![2.0, 4.0]);
    }

    #[test]
    fn test_merge_sorted_vec() {
        assert_eq!(
            merge_sorted_vec(vec![1.0, 4.0, 6.0], vec![2.0, 3.0, 7.0]),
            vec![1.0, 2.0, 3.0, 4.0, 6.0, 7.0]
        );
        assert_eq!(merge_sorted_vec(vec![], vec![1.0]), vec![1.0]);
    }

    #[test]
    fn test_weight_is_preserved_through_compaction() {
        let mut sketch = KllSketch::with_seed(8, 42);
        for i in 0..10_000 {
            sketch.update(i as f64);
        }
        assert_eq!(sketch.total_weight(), sketch.n());
        assert!(sketch.is_estimation_mode());
        assert!(sketch.num_retained() < sketch.capacity() + 1);
    }

    #[test]
    fn test_single_item_serialization() {
        let mut sketch = KllSketch::new(200);
        sketch.update(7.5);
        let bytes = sketch.serialize();
        assert_eq!(bytes.len(), DATA_START_SINGLE_ITEM + 8);
        let restored = KllSketch::deserialize(&bytes).unwrap();
        assert_eq!(restored, sketch);
        assert_eq!(restored.serialize(), bytes);
    }
}
