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

use super::COUPON_RSE;
use super::MAX_LG_K;
use super::MIN_LG_K;
use super::array8::Array8;
use super::check_lg_k;
use super::coupon;
use super::coupon_list::CouponList;
use super::coupon_list::promotion_threshold;
use super::estimator::HipEstimator;
use super::serialization::*;
use crate::codec::Family;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::common::NumStdDev;
use crate::error::Error;

const HIP_RSE_FACTOR: f64 = 0.8325546;
const NON_HIP_RSE_FACTOR: f64 = 1.03896;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Mode {
    Coupons(CouponList),
    Registers(Array8),
}

/// HyperLogLog sketch with 8-bit registers.
#[derive(Debug, Clone, PartialEq)]
pub struct HllSketch {
    lg_config_k: u8,
    mode: Mode,
}

impl HllSketch {
    /// Creates an empty sketch with `2^lg_config_k` registers.
    ///
    /// # Panics
    ///
    /// Panics if `lg_config_k` is not in `[4, 21]`.
    pub fn new(lg_config_k: u8) -> Self {
        assert!(
            check_lg_k(lg_config_k),
            "lg_config_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_config_k}"
        );
        Self {
            lg_config_k,
            mode: Mode::Coupons(CouponList::default()),
        }
    }

    pub(super) fn from_mode(lg_config_k: u8, mode: Mode) -> Self {
        Self { lg_config_k, mode }
    }

    pub fn lg_config_k(&self) -> u8 {
        self.lg_config_k
    }

    pub fn is_empty(&self) -> bool {
        match &self.mode {
            Mode::Coupons(list) => list.is_empty(),
            Mode::Registers(_) => false,
        }
    }

    /// `true` once the sketch has switched from exact coupons to registers.
    pub fn is_estimation_mode(&self) -> bool {
        matches!(self.mode, Mode::Registers(_))
    }

    /// `true` if the HIP accumulator is no longer valid, e.g. after a union.
    pub fn is_out_of_order(&self) -> bool {
        match &self.mode {
            Mode::Coupons(_) => false,
            Mode::Registers(arr) => arr.estimator().is_out_of_order(),
        }
    }

    pub(super) fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Presents `value` to the sketch.
    pub fn update<T: Hash + ?Sized>(&mut self, value: &T) {
        self.update_coupon(coupon(value));
    }

    pub(super) fn update_coupon(&mut self, coupon: u32) {
        match &mut self.mode {
            Mode::Coupons(list) => {
                if list.insert(coupon) && list.len() > promotion_threshold(self.lg_config_k) {
                    self.promote();
                }
            }
            Mode::Registers(arr) => arr.update(coupon),
        }
    }

    fn promote(&mut self) {
        if let Mode::Coupons(list) = &self.mode {
            tracing::trace!(
                lg_config_k = self.lg_config_k,
                coupons = list.len(),
                "promoting HLL sketch to registers"
            );
            let mut arr = Array8::new(self.lg_config_k);
            for c in list.iter() {
                arr.update(c);
            }
            self.mode = Mode::Registers(arr);
        }
    }

    /// Converts to register mode with `lg_config_k` registers, folding if it shrinks.
    pub(super) fn to_registers(&self, lg_config_k: u8) -> Array8 {
        match &self.mode {
            Mode::Coupons(list) => {
                let mut arr = Array8::new(lg_config_k);
                for c in list.iter() {
                    arr.update(c);
                }
                arr
            }
            Mode::Registers(arr) if arr.lg_config_k() == lg_config_k => arr.clone(),
            Mode::Registers(arr) => arr.downsample(lg_config_k),
        }
    }

    pub fn estimate(&self) -> f64 {
        match &self.mode {
            Mode::Coupons(list) => list.estimate(),
            Mode::Registers(arr) => arr.estimate(),
        }
    }

    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        let nsd = num_std_dev.as_f64();
        match &self.mode {
            Mode::Coupons(list) => {
                let est = list.estimate();
                (est / (1.0 + nsd * COUPON_RSE)).max(list.len() as f64)
            }
            Mode::Registers(arr) => {
                let est = arr.estimate();
                let non_zeros = ((1u32 << self.lg_config_k) - arr.num_zeros()) as f64;
                (est / (1.0 + nsd * self.relative_error())).max(non_zeros)
            }
        }
    }

    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        let nsd = num_std_dev.as_f64();
        match &self.mode {
            Mode::Coupons(list) => {
                let est = list.estimate();
                (est / (1.0 - nsd * COUPON_RSE)).max(list.len() as f64)
            }
            Mode::Registers(arr) => {
                let est = arr.estimate();
                let rse = self.relative_error();
                if nsd * rse >= 1.0 {
                    f64::INFINITY
                } else {
                    est / (1.0 - nsd * rse)
                }
            }
        }
    }

    fn relative_error(&self) -> f64 {
        let factor = if self.is_out_of_order() {
            NON_HIP_RSE_FACTOR
        } else {
            HIP_RSE_FACTOR
        };
        factor / ((1u32 << self.lg_config_k) as f64).sqrt()
    }

    /// Serializes the sketch to bytes.
    ///
    /// Coupons are written in ascending order so equal sketches produce equal bytes.
    pub fn serialize(&self) -> Vec<u8> {
        match &self.mode {
            Mode::Coupons(list) => {
                let mut bytes = SketchBytes::with_capacity(LIST_DATA_START + 4 * list.len());
                let mut flags = COMPACT_FLAG_MASK;
                if list.is_empty() {
                    flags |= EMPTY_FLAG_MASK;
                }
                self.write_preamble(&mut bytes, LIST_PREINTS, flags, CUR_MODE_LIST);
                bytes.write_u32_le(list.len() as u32);
                for c in list.iter() {
                    bytes.write_u32_le(c);
                }
                bytes.into_bytes()
            }
            Mode::Registers(arr) => {
                let registers = arr.registers();
                let mut bytes = SketchBytes::with_capacity(HLL_DATA_START + registers.len());
                let mut flags = COMPACT_FLAG_MASK;
                let estimator = arr.estimator();
                if estimator.is_out_of_order() {
                    flags |= OUT_OF_ORDER_FLAG_MASK;
                }
                self.write_preamble(&mut bytes, HLL_PREINTS, flags, CUR_MODE_HLL);
                bytes.write_f64_le(estimator.hip_accum());
                bytes.write_f64_le(estimator.kxq0());
                bytes.write_f64_le(estimator.kxq1());
                bytes.write_u32_le(arr.num_zeros());
                bytes.write_u32_le(0);
                bytes.write(registers);
                bytes.into_bytes()
            }
        }
    }

    fn write_preamble(&self, bytes: &mut SketchBytes, preamble_ints: u8, flags: u8, cur_mode: u8) {
        bytes.write_u8(preamble_ints);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::HLL.id);
        bytes.write_u8(self.lg_config_k);
        bytes.write_u8(0);
        bytes.write_u8(flags);
        bytes.write_u8(0);
        bytes.write_u8(mode_byte(cur_mode));
    }

    /// Deserializes a sketch from bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<HllSketch, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);
        let preamble_ints = cursor.read_u8().map_err(make_error("preamble_ints"))?;
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let lg_config_k = cursor.read_u8().map_err(make_error("lg_config_k"))?;
        let _unused = cursor.read_u8().map_err(make_error("unused"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let _unused = cursor.read_u8().map_err(make_error("unused"))?;
        let mode = cursor.read_u8().map_err(make_error("mode"))?;

        Family::HLL.validate_id(family_id)?;
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        if !check_lg_k(lg_config_k) {
            return Err(Error::deserial(format!(
                "lg_config_k out of range: {lg_config_k}"
            )));
        }

        match extract_cur_mode(mode) {
            CUR_MODE_LIST => {
                if preamble_ints != LIST_PREINTS {
                    return Err(Error::deserial(format!(
                        "invalid preamble ints: expected {LIST_PREINTS}, got {preamble_ints}"
                    )));
                }
                let count = cursor.read_u32_le().map_err(make_error("coupon_count"))?;
                let is_empty = flags & EMPTY_FLAG_MASK != 0;
                if is_empty != (count == 0) {
                    return Err(Error::deserial("empty flag disagrees with coupon count"));
                }
                let mut list = CouponList::default();
                for _ in 0..count {
                    let c = cursor.read_u32_le().map_err(make_error("coupons"))?;
                    if !list.insert(c) {
                        return Err(Error::deserial("duplicate coupon"));
                    }
                }
                let mut sketch = HllSketch::from_mode(lg_config_k, Mode::Coupons(list));
                if count as usize > promotion_threshold(lg_config_k) {
                    sketch.promote();
                }
                Ok(sketch)
            }
            CUR_MODE_HLL => {
                if preamble_ints != HLL_PREINTS {
                    return Err(Error::deserial(format!(
                        "invalid preamble ints: expected {HLL_PREINTS}, got {preamble_ints}"
                    )));
                }
                let hip_accum = cursor.read_f64_le().map_err(make_error("hip_accum"))?;
                let kxq0 = cursor.read_f64_le().map_err(make_error("kxq0"))?;
                let kxq1 = cursor.read_f64_le().map_err(make_error("kxq1"))?;
                let num_zeros = cursor.read_u32_le().map_err(make_error("num_zeros"))?;
                let _unused = cursor.read_u32_le().map_err(make_error("unused"))?;

                let k = 1usize << lg_config_k;
                let mut registers = vec![0u8; k];
                cursor
                    .read_exact(&mut registers)
                    .map_err(make_error("registers"))?;
                if let Some(&bad) = registers.iter().find(|&&v| v > 63) {
                    return Err(Error::deserial(format!("register value out of range: {bad}")));
                }

                let out_of_order = flags & OUT_OF_ORDER_FLAG_MASK != 0;
                let estimator = HipEstimator::from_parts(hip_accum, kxq0, kxq1, out_of_order);
                let arr = Array8::from_registers(lg_config_k, registers, estimator)
                    .ok_or_else(|| Error::deserial("register count mismatch"))?;
                if arr.num_zeros() != num_zeros {
                    return Err(Error::deserial(format!(
                        "zero register count mismatch: header says {num_zeros}, found {}",
                        arr.num_zeros()
                    )));
                }
                Ok(HllSketch::from_mode(lg_config_k, Mode::Registers(arr)))
            }
            other => Err(Error::deserial(format!("unknown HLL mode: {other}"))),
        }
    }
}

impl fmt::Display for HllSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### HLL sketch summary:")?;
        writeln!(f, "   lg_config_k        : {}", self.lg_config_k)?;
        match &self.mode {
            Mode::Coupons(list) => {
                writeln!(f, "   mode               : COUPONS")?;
                writeln!(f, "   coupons            : {}", list.len())?;
            }
            Mode::Registers(arr) => {
                writeln!(f, "   mode               : HLL8")?;
                writeln!(f, "   zero registers     : {}", arr.num_zeros())?;
            }
        }
        writeln!(f, "   out of order       : {}", self.is_out_of_order())?;
        writeln!(f, "   estimate           : {}", self.estimate())?;
        writeln!(f, "   lower bound (2 sd) : {}", self.lower_bound(NumStdDev::Two))?;
        writeln!(f, "   upper bound (2 sd) : {}", self.upper_bound(NumStdDev::Two))?;
        write!(f, "### End sketch summary")
    }
}
