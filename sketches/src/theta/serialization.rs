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

//! Binary layout of a serialized compact theta sketch.
//!
//! | Byte | Field | Description |
//! |------|-------|-------------|
//! | 0 | preamble_longs | 1 (empty), 2 (exact) or 3 (estimating) |
//! | 1 | serial_version | 3 |
//! | 2 | family_id | 3 |
//! | 3 | lg_k | unused, 0 |
//! | 4 | lg_resize | unused, 0 |
//! | 5 | flags | see below |
//! | 6-7 | seed_hash | 16-bit hash of the update seed |
//!
//! If preamble_longs >= 2, bytes 8-11 hold the retained count and bytes 12-15 the sampling
//! probability as an f32 (always 1.0). If preamble_longs == 3, bytes 16-23 hold theta. The
//! retained hashes follow in ascending order.
//!
//! Flags: bit 1 read-only, bit 2 empty, bit 3 compact, bit 4 ordered.

pub(crate) const SERIAL_VERSION: u8 = 3;

pub(crate) const FLAG_READ_ONLY: u8 = 1 << 1;
pub(crate) const FLAG_EMPTY: u8 = 1 << 2;
pub(crate) const FLAG_COMPACT: u8 = 1 << 3;
pub(crate) const FLAG_ORDERED: u8 = 1 << 4;

pub(crate) const PREAMBLE_LONGS_EMPTY: u8 = 1;
pub(crate) const PREAMBLE_LONGS_EXACT: u8 = 2;
pub(crate) const PREAMBLE_LONGS_ESTIMATION: u8 = 3;

pub(crate) const HASH_SIZE_BYTES: usize = 8;
pub(crate) const DEFAULT_P_FLOAT_BITS: u32 = 0x3F80_0000;
