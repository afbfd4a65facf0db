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

//! HyperLogLog sketch for approximate distinct counting.
//!
//! A fresh sketch keeps exact coupons in a small sorted list. Once the list grows past a
//! threshold derived from `lg_config_k`, every coupon is replayed into an array of `2^lg_k`
//! one-byte registers and the sketch stays in that mode from then on.
//!
//! # Coupons
//!
//! A coupon is a 32-bit value encoding both a slot number (26 bits) and a value (6 bits).
//! The slot identifies which register to update, and the value is the number of leading zeros
//! in the high half of the hash plus one.
//!
//! # Example
//!
//! ```
//! use ds_sketches::hll::HllSketch;
//!
//! let mut sketch = HllSketch::new(12);
//! for i in 0..1000 {
//!     sketch.update(&i);
//! }
//! let estimate = sketch.estimate();
//! assert!((estimate - 1000.0).abs() < 50.0);
//! ```

use std::hash::Hash;

use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::hash128;

mod array8;
mod coupon_list;
mod estimator;
mod serialization;
mod sketch;
mod union;

pub use self::sketch::HllSketch;
pub use self::union::HllUnion;

/// Smallest supported `lg_config_k`.
pub const MIN_LG_K: u8 = 4;
/// Largest supported `lg_config_k`.
pub const MAX_LG_K: u8 = 21;
/// `lg_config_k` used when none is given.
pub const DEFAULT_LG_K: u8 = 12;

const KEY_BITS_26: u32 = 26;
const KEY_MASK_26: u32 = (1 << KEY_BITS_26) - 1;

const COUPON_RSE_FACTOR: f64 = 0.409; // at transition point not the asymptote
const COUPON_RSE: f64 = COUPON_RSE_FACTOR / (1 << 13) as f64;

#[inline]
fn get_slot(coupon: u32) -> u32 {
    coupon & KEY_MASK_26
}

#[inline]
fn get_value(coupon: u32) -> u8 {
    (coupon >> KEY_BITS_26) as u8
}

#[inline]
fn pack_coupon(slot: u32, value: u8) -> u32 {
    ((value as u32) << KEY_BITS_26) | (slot & KEY_MASK_26)
}

fn coupon<H: Hash + ?Sized>(v: &H) -> u32 {
    let (lo, hi) = hash128(v, DEFAULT_UPDATE_SEED);
    let value = hi.leading_zeros().min(62) + 1;
    pack_coupon(lo as u32, value as u8)
}

fn check_lg_k(lg_config_k: u8) -> bool {
    (MIN_LG_K..=MAX_LG_K).contains(&lg_config_k)
}
