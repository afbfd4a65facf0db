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

//! HIP (Historical Inverse Probability) estimator with a composite fallback.
//!
//! While a sketch only ever sees updates in arrival order the HIP accumulator is the estimate.
//! Once registers are combined out of order (union, downsampling) the accumulator no longer
//! means anything, and the estimate falls back to the raw HLL formula blended with linear
//! counting over the empty registers.

#[derive(Debug, Clone, PartialEq)]
pub(super) struct HipEstimator {
    hip_accum: f64,
    /// Sum of 1/2^v over registers with v < 32.
    kxq0: f64,
    /// Sum of 1/2^v over registers with v >= 32.
    kxq1: f64,
    out_of_order: bool,
}

impl HipEstimator {
    pub fn new(lg_config_k: u8) -> Self {
        Self {
            hip_accum: 0.0,
            kxq0: (1u32 << lg_config_k) as f64,
            kxq1: 0.0,
            out_of_order: false,
        }
    }

    pub fn from_parts(hip_accum: f64, kxq0: f64, kxq1: f64, out_of_order: bool) -> Self {
        Self {
            hip_accum,
            kxq0,
            kxq1,
            out_of_order,
        }
    }

    /// Must run before the register itself changes.
    pub fn update(&mut self, lg_config_k: u8, old_value: u8, new_value: u8) {
        let k = (1u32 << lg_config_k) as f64;
        if !self.out_of_order {
            self.hip_accum += k / (self.kxq0 + self.kxq1);
        }
        self.update_kxq(old_value, new_value);
    }

    fn update_kxq(&mut self, old_value: u8, new_value: u8) {
        if old_value < 32 {
            self.kxq0 -= inv_pow2(old_value);
        } else {
            self.kxq1 -= inv_pow2(old_value);
        }
        if new_value < 32 {
            self.kxq0 += inv_pow2(new_value);
        } else {
            self.kxq1 += inv_pow2(new_value);
        }
    }

    /// Recomputes the KxQ sums from scratch after a bulk register rewrite.
    pub fn rebuild_kxq(&mut self, registers: &[u8]) {
        self.kxq0 = 0.0;
        self.kxq1 = 0.0;
        for &v in registers {
            if v < 32 {
                self.kxq0 += inv_pow2(v);
            } else {
                self.kxq1 += inv_pow2(v);
            }
        }
    }

    pub fn estimate(&self, lg_config_k: u8, num_zeros: u32) -> f64 {
        if self.out_of_order {
            self.composite_estimate(lg_config_k, num_zeros)
        } else {
            self.hip_accum
        }
    }

    fn raw_estimate(&self, lg_config_k: u8) -> f64 {
        let k = (1u32 << lg_config_k) as f64;
        let correction_factor = match lg_config_k {
            4 => 0.673,
            5 => 0.697,
            6 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / k),
        };
        (correction_factor * k * k) / (self.kxq0 + self.kxq1)
    }

    fn composite_estimate(&self, lg_config_k: u8, num_zeros: u32) -> f64 {
        let k = (1u32 << lg_config_k) as f64;
        let raw = self.raw_estimate(lg_config_k);
        if raw <= 2.5 * k && num_zeros > 0 {
            k * (k / num_zeros as f64).ln()
        } else {
            raw
        }
    }

    pub fn hip_accum(&self) -> f64 {
        self.hip_accum
    }

    pub fn kxq0(&self) -> f64 {
        self.kxq0
    }

    pub fn kxq1(&self) -> f64 {
        self.kxq1
    }

    pub fn is_out_of_order(&self) -> bool {
        self.out_of_order
    }

    pub fn set_out_of_order(&mut self, ooo: bool) {
        self.out_of_order = ooo;
        if ooo {
            self.hip_accum = 0.0;
        }
    }
}

#[inline]
fn inv_pow2(value: u8) -> f64 {
    f64::exp2(-(value as f64))
}
