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

//! Binary layout of a serialized [`HllSketch`](super::HllSketch).
//!
//! All multi-byte fields are little-endian.
//!
//! ```text
//! byte 0      preamble ints (2 for coupon mode, 10 for register mode)
//! byte 1      serial version
//! byte 2      family id (7)
//! byte 3      lg_config_k
//! byte 4      unused
//! byte 5      flags
//! byte 6      unused
//! byte 7      mode: current mode in bits 0-1, target type in bits 2-3
//!
//! coupon mode
//! bytes 8-11  coupon count
//! bytes 12-   coupons, ascending u32
//!
//! register mode
//! bytes 8-15  hip accumulator (f64)
//! bytes 16-23 kxq0 (f64)
//! bytes 24-31 kxq1 (f64)
//! bytes 32-35 number of zero registers
//! bytes 36-39 unused
//! bytes 40-   2^lg_config_k one-byte registers
//! ```

pub(super) const SERIAL_VERSION: u8 = 1;

pub(super) const LIST_PREINTS: u8 = 2;
pub(super) const HLL_PREINTS: u8 = 10;

pub(super) const EMPTY_FLAG_MASK: u8 = 1 << 2;
pub(super) const COMPACT_FLAG_MASK: u8 = 1 << 3;
pub(super) const OUT_OF_ORDER_FLAG_MASK: u8 = 1 << 4;

pub(super) const CUR_MODE_LIST: u8 = 0;
pub(super) const CUR_MODE_HLL: u8 = 2;
pub(super) const TGT_HLL8: u8 = 2;

pub(super) const LIST_DATA_START: usize = 12;
pub(super) const HLL_DATA_START: usize = 40;

#[inline]
pub(super) fn mode_byte(cur_mode: u8) -> u8 {
    cur_mode | (TGT_HLL8 << 2)
}

#[inline]
pub(super) fn extract_cur_mode(mode_byte: u8) -> u8 {
    mode_byte & 0x3
}
