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

//! Seeded 128-bit MurmurHash3 used by every hashing sketch.

use std::hash::Hash;
use std::hash::Hasher;

/// Seed used when a sketch does not specify one.
pub const DEFAULT_UPDATE_SEED: u64 = 9001;

/// Streaming MurmurHash3 x64 128-bit hasher.
pub(crate) struct MurmurHash3X64128 {
    inner: mur3::Hasher128,
}

impl MurmurHash3X64128 {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: mur3::Hasher128::with_seed(seed as u32),
        }
    }

    pub fn finish128(&self) -> (u64, u64) {
        self.inner.finish128()
    }
}

impl Default for MurmurHash3X64128 {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Hasher for MurmurHash3X64128 {
    fn finish(&self) -> u64 {
        self.finish128().0
    }

    fn write(&mut self, bytes: &[u8]) {
        self.inner.write(bytes);
    }
}

/// Hashes `value` with `seed` and returns both 64-bit halves.
pub(crate) fn hash128<T: Hash + ?Sized>(value: &T, seed: u64) -> (u64, u64) {
    let mut hasher = MurmurHash3X64128::with_seed(seed);
    value.hash(&mut hasher);
    hasher.finish128()
}

/// 16-bit digest of a seed, stored in serialized sketches to catch seed mismatches.
pub fn compute_seed_hash(seed: u64) -> u16 {
    let (h1, _) = mur3::murmurhash3_x64_128(&seed.to_le_bytes(), 0);
    (h1 & 0xFFFF) as u16
}
