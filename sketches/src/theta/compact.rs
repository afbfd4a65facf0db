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

//! Compact theta sketch: theta, the retained hashes in ascending order, and the seed hash.

use std::fmt;

use super::ThetaSketchView;
use super::hash_table::MAX_THETA;
use super::serialization::*;
use super::sketch::write_common_summary;
use crate::codec::Family;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactThetaSketch {
    theta: u64,
    entries: Vec<u64>,
    seed_hash: u16,
    is_empty: bool,
}

impl CompactThetaSketch {
    /// `entries` must be sorted and below `theta`. An empty sketch always has theta 1.0.
    pub(crate) fn from_parts(entries: Vec<u64>, theta: u64, seed_hash: u16, is_empty: bool) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0] < w[1]));
        if is_empty {
            return Self {
                theta: MAX_THETA,
                entries: Vec::new(),
                seed_hash,
                is_empty,
            };
        }
        Self {
            theta,
            entries,
            seed_hash,
            is_empty,
        }
    }

    /// Serializes the sketch to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let num_entries = self.entries.len();
        let preamble_longs = if self.is_empty {
            PREAMBLE_LONGS_EMPTY
        } else if self.is_estimation_mode() {
            PREAMBLE_LONGS_ESTIMATION
        } else {
            PREAMBLE_LONGS_EXACT
        };

        let total_size = (preamble_longs as usize) * 8 + num_entries * HASH_SIZE_BYTES;
        let mut bytes = SketchBytes::with_capacity(total_size);

        let mut flags = FLAG_READ_ONLY | FLAG_COMPACT | FLAG_ORDERED;
        if self.is_empty {
            flags |= FLAG_EMPTY;
        }
        bytes.write_u8(preamble_longs);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::COMPACT.id);
        bytes.write_u8(0);
        bytes.write_u8(0);
        bytes.write_u8(flags);
        bytes.write_u16_le(self.seed_hash);

        if preamble_longs >= PREAMBLE_LONGS_EXACT {
            bytes.write_u32_le(num_entries as u32);
            bytes.write_u32_le(DEFAULT_P_FLOAT_BITS);
        }
        if preamble_longs >= PREAMBLE_LONGS_ESTIMATION {
            bytes.write_u64_le(self.theta);
        }
        for hash in &self.entries {
            bytes.write_u64_le(*hash);
        }
        bytes.into_bytes()
    }

    /// Deserializes a sketch built with the default seed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    pub fn deserialize_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);
        let preamble_longs = cursor.read_u8().map_err(make_error("preamble_longs"))?;
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let _lg_k = cursor.read_u8().map_err(make_error("lg_k"))?;
        let _lg_resize = cursor.read_u8().map_err(make_error("lg_resize"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let seed_hash = cursor.read_u16_le().map_err(make_error("seed_hash"))?;

        Family::COMPACT.validate_id(family_id)?;
        Family::COMPACT.validate_pre_longs(preamble_longs)?;
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        let expected_seed_hash = compute_seed_hash(seed);
        if seed_hash != expected_seed_hash {
            return Err(Error::deserial(format!(
                "seed hash mismatch: expected 0x{expected_seed_hash:04X}, got 0x{seed_hash:04X}"
            )));
        }
        if flags & FLAG_COMPACT == 0 {
            return Err(Error::deserial("only compact sketches are supported"));
        }

        let is_empty = flags & FLAG_EMPTY != 0;
        if is_empty {
            if preamble_longs != PREAMBLE_LONGS_EMPTY {
                return Err(Error::deserial("empty sketch with a non-empty preamble"));
            }
            return Ok(Self::from_parts(Vec::new(), MAX_THETA, seed_hash, true));
        }
        if preamble_longs == PREAMBLE_LONGS_EMPTY {
            return Err(Error::deserial("non-empty sketch with an empty preamble"));
        }

        let num_entries = cursor.read_u32_le().map_err(make_error("num_entries"))? as usize;
        let _p = cursor.read_u32_le().map_err(make_error("p"))?;
        let theta = if preamble_longs == PREAMBLE_LONGS_ESTIMATION {
            cursor.read_u64_le().map_err(make_error("theta"))?
        } else {
            MAX_THETA
        };
        if theta == 0 || theta > MAX_THETA {
            return Err(Error::deserial(format!("theta out of range: {theta}")));
        }

        if cursor.remaining().len() < num_entries * HASH_SIZE_BYTES {
            return Err(Error::insufficient_data("entries"));
        }
        let mut entries = Vec::with_capacity(num_entries);
        for _ in 0..num_entries {
            entries.push(cursor.read_u64_le().map_err(make_error("entries"))?);
        }
        if entries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::deserial("hashes are not strictly ascending"));
        }
        if entries.iter().any(|&h| h == 0 || h >= theta) {
            return Err(Error::deserial("hash outside (0, theta)"));
        }
        Ok(Self::from_parts(entries, theta, seed_hash, false))
    }
}

impl ThetaSketchView for CompactThetaSketch {
    fn is_empty(&self) -> bool {
        self.is_empty
    }

    fn theta64(&self) -> u64 {
        self.theta
    }

    fn num_retained(&self) -> usize {
        self.entries.len()
    }

    fn seed_hash(&self) -> u16 {
        self.seed_hash
    }

    fn is_ordered(&self) -> bool {
        true
    }

    fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().copied()
    }
}

impl fmt::Display for CompactThetaSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### Compact Theta sketch summary:")?;
        writeln!(f, "   seed hash          : 0x{:04X}", self.seed_hash)?;
        write_common_summary(f, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theta::ThetaSketch;

    #[test]
    fn test_serialize_empty() {
        let compact = ThetaSketch::builder().build().compact();
        let bytes = compact.serialize();
        assert_eq!(bytes.len(), 8);
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
        assert!(restored.is_empty());
        assert_eq!(restored, compact);
    }

    #[test]
    fn test_serialize_exact_and_estimating() {
        for n in [10u64, 10_000] {
            let mut sketch = ThetaSketch::builder().lg_k(9).build();
            for i in 0..n {
                sketch.update(&i);
            }
            let compact = sketch.compact();
            let bytes = compact.serialize();
            let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
            assert_eq!(restored, compact);
            assert_eq!(restored.serialize(), bytes);
        }
    }

    #[test]
    fn test_rejects_wrong_seed_and_family() {
        let mut sketch = ThetaSketch::builder().build();
        sketch.update("a");
        let bytes = sketch.compact().serialize();
        assert!(CompactThetaSketch::deserialize_with_seed(&bytes, 123).is_err());

        let mut bad = bytes.clone();
        bad[2] = 7;
        let err = CompactThetaSketch::deserialize(&bad).unwrap_err();
        assert!(err.message().contains("invalid family"), "{err}");

        assert!(CompactThetaSketch::deserialize(&bytes[..12]).is_err());
    }
}
