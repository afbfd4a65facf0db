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
use rand::seq::SliceRandom;

use super::EMPTY_FLAG_MASK;
use super::MIN_K;
use crate::codec::Family;
use crate::codec::ItemsSerde;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;

const SERIAL_VERSION: u8 = 2;
const PREAMBLE_LONGS_EMPTY: u8 = 1;
const PREAMBLE_LONGS_NONEMPTY: u8 = 2;

/// Uniform random sample of at most `k` items from a stream.
#[derive(Debug, Clone)]
pub struct ReservoirItemsSketch<T> {
    k: u32,
    n: u64,
    items: Vec<T>,
    rng: SmallRng,
}

impl<T: PartialEq> PartialEq for ReservoirItemsSketch<T> {
    fn eq(&self, other: &Self) -> bool {
        self.k == other.k && self.n == other.n && self.items == other.items
    }
}

impl<T: Clone> ReservoirItemsSketch<T> {
    /// # Panics
    ///
    /// Panics if `k < 2`.
    pub fn new(k: u32) -> Self {
        assert!(k >= MIN_K, "k must be at least {MIN_K}, got {k}");
        Self::make(k, 0, Vec::new())
    }

    /// Creates a sketch whose replacement decisions come from a fixed seed.
    pub fn with_seed(k: u32, seed: u64) -> Self {
        let mut sketch = Self::new(k);
        sketch.rng = SmallRng::seed_from_u64(seed);
        sketch
    }

    fn make(k: u32, n: u64, items: Vec<T>) -> Self {
        Self {
            k,
            n,
            items,
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

    pub fn num_samples(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// `true` once more than `k` items were seen and the sample is no longer the whole stream.
    pub fn is_estimation_mode(&self) -> bool {
        self.n > self.k as u64
    }

    pub fn samples(&self) -> &[T] {
        &self.items
    }

    /// Number of stream items each sample stands for.
    pub fn implicit_sample_weight(&self) -> f64 {
        if self.items.is_empty() {
            0.0
        } else {
            self.n as f64 / self.items.len() as f64
        }
    }

    pub fn update(&mut self, item: T) {
        self.n += 1;
        if self.items.len() < self.k as usize {
            self.items.push(item);
        } else {
            let slot = self.rng.random_range(0..self.n);
            if slot < self.k as u64 {
                self.items[slot as usize] = item;
            }
        }
    }

    /// Presents `item` as standing for `weight` stream items, without counting it in `n`.
    ///
    /// Only meaningful once the reservoir is full.
    pub(super) fn weighted_insert(&mut self, item: T, weight: f64, total_weight: f64) {
        let k = self.k as f64;
        let p = weight * k / total_weight;
        if self.rng.random::<f64>() < p {
            let slot = self.rng.random_range(0..self.items.len());
            self.items[slot] = item;
        }
    }

    pub(super) fn add_to_n(&mut self, n: u64) {
        self.n += n;
    }

    /// Copy holding at most `k` uniformly chosen samples, with the same `n`.
    pub(super) fn downsampled(&self, k: u32) -> Self {
        if k >= self.k {
            return self.clone();
        }
        let mut items = self.items.clone();
        let mut rng = self.rng.clone();
        items.shuffle(&mut rng);
        items.truncate(k as usize);
        let mut out = Self::make(k, self.n, items);
        out.rng = rng;
        out
    }

    pub fn serialize_with<S: ItemsSerde<T>>(&self, serde: &S) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(16);
        let is_empty = self.is_empty();
        bytes.write_u8(if is_empty {
            PREAMBLE_LONGS_EMPTY
        } else {
            PREAMBLE_LONGS_NONEMPTY
        });
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::RESERVOIR.id);
        bytes.write_u8(if is_empty { EMPTY_FLAG_MASK } else { 0 });
        bytes.write_u32_le(self.k);
        if is_empty {
            return bytes.into_bytes();
        }
        bytes.write_u64_le(self.n);
        let mut out = bytes.into_bytes();
        serde.serialize_items(&self.items, &mut out);
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

        Family::RESERVOIR.validate_id(family_id)?;
        Family::RESERVOIR.validate_pre_longs(pre_longs)?;
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
            return Ok(Self::make(k, 0, Vec::new()));
        }
        let n = cursor.read_u64_le().map_err(make_error("n"))?;
        if n == 0 {
            return Err(Error::deserial("non-empty sketch with n = 0"));
        }
        let num_items = n.min(k as u64) as usize;
        let (items, _) = serde.deserialize_items(cursor.remaining(), num_items)?;
        Ok(Self::make(k, n, items))
    }
}

impl<T: Clone + fmt::Display> fmt::Display for ReservoirItemsSketch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### Reservoir sketch summary:")?;
        writeln!(f, "   k            : {}", self.k)?;
        writeln!(f, "   n            : {}", self.n)?;
        writeln!(f, "   Current size : {}", self.items.len())?;
        writeln!(f, "   Item weight  : {}", self.implicit_sample_weight())?;
        write!(f, "### End sketch summary")
    }
}
