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

use super::reverse_purge_item_hash_map::ReversePurgeItemHashMap;
use super::serialization::*;
use crate::codec::Family;
use crate::codec::ItemsSerde;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;

const LG_MIN_MAP_SIZE: u8 = 3;
const SAMPLE_SIZE: usize = 1024;
const EPSILON_FACTOR: f64 = 3.5;
const LOAD_FACTOR_NUMERATOR: usize = 3;
const LOAD_FACTOR_DENOMINATOR: usize = 4;

/// Which side of the error the reported rows may be wrong on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Every item whose true count exceeds the threshold is reported; some reported items may not.
    NoFalseNegatives,
    /// Every reported item's true count exceeds the threshold; some such items may be missing.
    NoFalsePositives,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<T> {
    item: T,
    estimate: i64,
    upper_bound: i64,
    lower_bound: i64,
}

impl<T> Row<T> {
    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn estimate(&self) -> i64 {
        self.estimate
    }

    pub fn upper_bound(&self) -> i64 {
        self.upper_bound
    }

    pub fn lower_bound(&self) -> i64 {
        self.lower_bound
    }
}

#[derive(Debug, Clone)]
pub struct FrequentItemsSketch<T> {
    lg_max_map_size: u8,
    cur_map_cap: usize,
    offset: i64,
    stream_weight: i64,
    sample_size: usize,
    hash_map: ReversePurgeItemHashMap<T>,
}

impl<T: Eq + Hash> FrequentItemsSketch<T> {
    /// Creates a sketch whose map grows to at most `max_map_size` slots.
    ///
    /// # Panics
    ///
    /// Panics if `max_map_size` is not a power of two.
    pub fn new(max_map_size: usize) -> Self {
        assert!(
            max_map_size.is_power_of_two(),
            "max_map_size must be power of 2, got {max_map_size}"
        );
        Self::with_lg_map_sizes(max_map_size.trailing_zeros() as u8, LG_MIN_MAP_SIZE)
    }

    pub fn is_empty(&self) -> bool {
        self.hash_map.num_active() == 0
    }

    pub fn num_active_items(&self) -> usize {
        self.hash_map.num_active()
    }

    /// Sum of all weights presented to the sketch.
    pub fn total_weight(&self) -> i64 {
        self.stream_weight
    }

    pub fn estimate(&self, item: &T) -> i64 {
        let value = self.hash_map.get(item);
        if value > 0 { value + self.offset } else { 0 }
    }

    pub fn lower_bound(&self, item: &T) -> i64 {
        self.hash_map.get(item)
    }

    pub fn upper_bound(&self, item: &T) -> i64 {
        self.hash_map.get(item) + self.offset
    }

    /// Upper bound on the error of any count, the sum of all purge medians so far.
    pub fn maximum_error(&self) -> i64 {
        self.offset
    }

    pub fn epsilon(&self) -> f64 {
        EPSILON_FACTOR / (1u64 << self.lg_max_map_size) as f64
    }

    pub fn maximum_map_capacity(&self) -> usize {
        (1usize << self.lg_max_map_size) * LOAD_FACTOR_NUMERATOR / LOAD_FACTOR_DENOMINATOR
    }

    pub fn lg_max_map_size(&self) -> u8 {
        self.lg_max_map_size
    }

    pub fn lg_cur_map_size(&self) -> u8 {
        self.hash_map.lg_length()
    }

    pub fn update(&mut self, item: T) {
        self.insert_count(item, 1);
    }

    /// Adds `count` occurrences of `item`. Zero is a no-op; negative counts are rejected.
    pub fn update_with_count(&mut self, item: T, count: i64) -> Result<(), Error> {
        if count < 0 {
            return Err(Error::invalid_argument(format!(
                "count may not be negative, got {count}"
            )));
        }
        if count > 0 {
            if self.stream_weight.checked_add(count).is_none() {
                return Err(Error::invalid_argument(format!(
                    "stream weight overflows adding {count} to {}",
                    self.stream_weight
                )));
            }
            self.insert_count(item, count);
        }
        Ok(())
    }

    fn insert_count(&mut self, item: T, count: i64) {
        self.stream_weight += count;
        self.hash_map.adjust_or_put_value(item, count);
        self.maybe_resize_or_purge();
    }

    /// Folds `other` into `self`; offsets and stream weights add up.
    ///
    /// # Errors
    ///
    /// Fails without changing `self` if the combined stream weight does not fit in an `i64`.
    pub fn merge(&mut self, other: &Self) -> Result<(), Error>
    where
        T: Clone,
    {
        if other.is_empty() {
            return Ok(());
        }
        // Every count and offset is bounded by its stream weight.
        let merged_total = self
            .stream_weight
            .checked_add(other.stream_weight)
            .ok_or_else(|| Error::invalid_argument("merged stream weight overflows"))?;
        for (item, count) in other.hash_map.iter() {
            self.insert_count(item.clone(), count);
        }
        self.offset += other.offset;
        self.stream_weight = merged_total;
        Ok(())
    }

    /// Rows above the maximum error, sorted by descending estimate.
    pub fn frequent_items(&self, error_type: ErrorType) -> Vec<Row<T>>
    where
        T: Clone,
    {
        self.frequent_items_with_threshold(error_type, self.offset)
    }

    /// Rows above `max(threshold, maximum_error)`, sorted by descending estimate.
    pub fn frequent_items_with_threshold(&self, error_type: ErrorType, threshold: i64) -> Vec<Row<T>>
    where
        T: Clone,
    {
        let threshold = threshold.max(self.offset);
        let mut rows: Vec<Row<T>> = self
            .hash_map
            .iter()
            .filter_map(|(item, count)| {
                let lower = count;
                let upper = count + self.offset;
                let include = match error_type {
                    ErrorType::NoFalseNegatives => upper > threshold,
                    ErrorType::NoFalsePositives => lower > threshold,
                };
                include.then(|| Row {
                    item: item.clone(),
                    estimate: upper,
                    upper_bound: upper,
                    lower_bound: lower,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.estimate.cmp(&a.estimate));
        rows
    }

    /// Serializes the sketch with items in ascending order, so equal contents give equal bytes.
    pub fn serialize_with<S: ItemsSerde<T>>(&self, serde: &S) -> Vec<u8>
    where
        T: Clone + Ord,
    {
        let mut bytes = SketchBytes::with_capacity(PREAMBLE_LONGS_NONEMPTY as usize * 8);
        let is_empty = self.is_empty();
        bytes.write_u8(if is_empty {
            PREAMBLE_LONGS_EMPTY
        } else {
            PREAMBLE_LONGS_NONEMPTY
        });
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::FREQUENCY.id);
        bytes.write_u8(self.lg_max_map_size);
        bytes.write_u8(self.hash_map.lg_length());
        bytes.write_u8(if is_empty { EMPTY_FLAG_MASK } else { 0 });
        bytes.write_u16_le(0);
        if is_empty {
            return bytes.into_bytes();
        }

        let mut entries: Vec<(&T, i64)> = self.hash_map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        bytes.write_u32_le(entries.len() as u32);
        bytes.write_u32_le(0);
        bytes.write_i64_le(self.stream_weight);
        bytes.write_i64_le(self.offset);
        for (_, count) in &entries {
            bytes.write_i64_le(*count);
        }
        let items: Vec<T> = entries.into_iter().map(|(item, _)| item.clone()).collect();
        let mut out = bytes.into_bytes();
        serde.serialize_items(&items, &mut out);
        out
    }

    pub fn deserialize_with<S: ItemsSerde<T>>(bytes: &[u8], serde: &S) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);
        let pre_longs = cursor.read_u8().map_err(make_error("preamble_longs"))? & 0x3f;
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let lg_max = cursor.read_u8().map_err(make_error("lg_max_map_size"))?;
        let lg_cur = cursor.read_u8().map_err(make_error("lg_cur_map_size"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let _unused = cursor.read_u16_le().map_err(make_error("unused"))?;

        Family::FREQUENCY.validate_id(family_id)?;
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        if !(LG_MIN_MAP_SIZE..=30).contains(&lg_max) || lg_cur < LG_MIN_MAP_SIZE {
            return Err(Error::deserial(format!(
                "map sizes out of range: lg_max={lg_max}, lg_cur={lg_cur}"
            )));
        }
        if lg_cur > lg_max {
            return Err(Error::deserial("lg_cur_map_size exceeds lg_max_map_size"));
        }

        let is_empty = flags & EMPTY_FLAG_MASK != 0;
        if is_empty {
            if pre_longs != PREAMBLE_LONGS_EMPTY {
                return Err(Error::deserial("empty sketch with invalid preamble size"));
            }
            return Ok(Self::with_lg_map_sizes(lg_max, lg_cur));
        }
        if pre_longs != PREAMBLE_LONGS_NONEMPTY {
            return Err(Error::deserial("non-empty sketch with invalid preamble size"));
        }

        let active_items = cursor.read_u32_le().map_err(make_error("active_items"))? as usize;
        let _unused = cursor.read_u32_le().map_err(make_error("unused"))?;
        let stream_weight = cursor.read_i64_le().map_err(make_error("stream_weight"))?;
        let offset = cursor.read_i64_le().map_err(make_error("offset"))?;

        let max_active = (1usize << lg_cur) * LOAD_FACTOR_NUMERATOR / LOAD_FACTOR_DENOMINATOR;
        if active_items > max_active {
            return Err(Error::deserial(format!(
                "{active_items} active items do not fit a map of size 2^{lg_cur}"
            )));
        }
        let mut values = Vec::with_capacity(active_items);
        for _ in 0..active_items {
            let value = cursor.read_i64_le().map_err(make_error("values"))?;
            if value <= 0 {
                return Err(Error::deserial(format!("non-positive count: {value}")));
            }
            values.push(value);
        }
        let (items, _consumed) = serde.deserialize_items(cursor.remaining(), active_items)?;
        if items.len() != active_items {
            return Err(Error::deserial("item count mismatch during deserialization"));
        }

        let mut sketch = Self::with_lg_map_sizes(lg_max, lg_cur);
        for (item, value) in items.into_iter().zip(values) {
            sketch.insert_count(item, value);
        }
        sketch.stream_weight = stream_weight;
        sketch.offset = offset;
        Ok(sketch)
    }

    fn maybe_resize_or_purge(&mut self) {
        if self.hash_map.num_active() > self.cur_map_cap {
            if self.hash_map.lg_length() < self.lg_max_map_size {
                self.hash_map.resize(self.hash_map.length() * 2);
                self.cur_map_cap = self.hash_map.capacity();
            } else {
                let delta = self.hash_map.purge(self.sample_size);
                self.offset += delta;
                debug_assert!(self.hash_map.num_active() <= self.maximum_map_capacity());
            }
        }
    }

    fn with_lg_map_sizes(lg_max_map_size: u8, lg_cur_map_size: u8) -> Self {
        let lg_max = lg_max_map_size.max(LG_MIN_MAP_SIZE);
        let lg_cur = lg_cur_map_size.max(LG_MIN_MAP_SIZE).min(lg_max);
        let map = ReversePurgeItemHashMap::new(1usize << lg_cur);
        let cur_map_cap = map.capacity();
        let max_map_cap = (1usize << lg_max) * LOAD_FACTOR_NUMERATOR / LOAD_FACTOR_DENOMINATOR;
        Self {
            lg_max_map_size: lg_max,
            cur_map_cap,
            offset: 0,
            stream_weight: 0,
            sample_size: SAMPLE_SIZE.min(max_map_cap),
            hash_map: map,
        }
    }
}

impl<T: Eq + Hash + Clone + fmt::Display> fmt::Display for FrequentItemsSketch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### Frequent items sketch summary:")?;
        writeln!(f, "   lg max map size    : {}", self.lg_max_map_size)?;
        writeln!(f, "   lg cur map size    : {}", self.lg_cur_map_size())?;
        writeln!(f, "   num active items   : {}", self.num_active_items())?;
        writeln!(f, "   total weight       : {}", self.stream_weight)?;
        writeln!(f, "   max error offset   : {}", self.offset)?;
        writeln!(f, "   epsilon            : {}", self.epsilon())?;
        let rows = self.frequent_items(ErrorType::NoFalseNegatives);
        writeln!(f, "   rows (NFN)         : {}", rows.len())?;
        for row in rows.iter().take(10) {
            writeln!(
                f,
                "      {} est={} lb={} ub={}",
                row.item, row.estimate, row.lower_bound, row.upper_bound
            )?;
        }
        write!(f, "### End sketch summary")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StringSerde;
    use crate::error::ErrorKind;

    #[test]
    fn test_exact_counts_below_capacity() {
        let mut sketch = FrequentItemsSketch::<String>::new(64);
        for i in 0..10 {
            sketch.update_with_count(format!("item{i}"), i + 1).unwrap();
        }
        assert_eq!(sketch.maximum_error(), 0);
        assert_eq!(sketch.total_weight(), 55);
        assert_eq!(sketch.estimate(&"item9".to_string()), 10);
        assert_eq!(sketch.estimate(&"missing".to_string()), 0);

        let rows = sketch.frequent_items(ErrorType::NoFalsePositives);
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].item(), "item9");
        assert_eq!(rows[0].lower_bound(), 10);
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut sketch = FrequentItemsSketch::<String>::new(8);
        assert!(sketch.update_with_count("a".to_string(), -1).is_err());
        sketch.update_with_count("a".to_string(), 0).unwrap();
        assert!(sketch.is_empty());
    }

    #[test]
    fn test_heavy_hitter_survives_purges() {
        let mut sketch = FrequentItemsSketch::<String>::new(16);
        for i in 0..5000 {
            sketch.update(format!("noise{i}"));
            if i % 2 == 0 {
                sketch.update("heavy".to_string());
            }
        }
        assert!(sketch.maximum_error() > 0);
        assert!(sketch.num_active_items() <= sketch.maximum_map_capacity());
        let heavy = "heavy".to_string();
        assert!(sketch.lower_bound(&heavy) <= 2500);
        assert!(sketch.upper_bound(&heavy) >= 2500);
        let rows = sketch.frequent_items(ErrorType::NoFalseNegatives);
        assert_eq!(rows[0].item(), &heavy);
    }

    #[test]
    fn test_merge_adds_weights() {
        let mut a = FrequentItemsSketch::<String>::new(64);
        let mut b = FrequentItemsSketch::<String>::new(64);
        a.update_with_count("x".to_string(), 5).unwrap();
        b.update_with_count("x".to_string(), 7).unwrap();
        b.update("y".to_string());
        a.merge(&b).unwrap();
        assert_eq!(a.estimate(&"x".to_string()), 12);
        assert_eq!(a.total_weight(), 13);
    }

    #[test]
    fn test_weight_overflow_is_rejected() {
        let mut a = FrequentItemsSketch::<String>::new(64);
        a.update_with_count("a".to_string(), i64::MAX).unwrap();
        let err = a.update_with_count("b".to_string(), i64::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(a.total_weight(), i64::MAX);
        assert_eq!(a.estimate(&"b".to_string()), 0);

        let mut b = FrequentItemsSketch::<String>::new(64);
        b.update("c".to_string());
        assert!(a.merge(&b).is_err());
        assert_eq!(a.total_weight(), i64::MAX);
        assert_eq!(a.estimate(&"c".to_string()), 0);
    }

    #[test]
    fn test_serialize_is_byte_stable() {
        let mut sketch = FrequentItemsSketch::<String>::new(32);
        for i in 0..200 {
            sketch.update(format!("v{}", i % 37));
        }
        let bytes = sketch.serialize_with(&StringSerde);
        let restored = FrequentItemsSketch::<String>::deserialize_with(&bytes, &StringSerde).unwrap();
        assert_eq!(restored.total_weight(), sketch.total_weight());
        assert_eq!(restored.maximum_error(), sketch.maximum_error());
        assert_eq!(restored.serialize_with(&StringSerde), bytes);

        let empty = FrequentItemsSketch::<String>::new(32).serialize_with(&StringSerde);
        assert_eq!(empty.len(), 8);
        assert!(
            FrequentItemsSketch::<String>::deserialize_with(&empty, &StringSerde)
                .unwrap()
                .is_empty()
        );
    }
}
