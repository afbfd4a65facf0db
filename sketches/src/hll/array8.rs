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

//! Dense mode: one byte per register.

use super::estimator::HipEstimator;
use super::get_slot;
use super::get_value;

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Array8 {
    lg_config_k: u8,
    bytes: Box<[u8]>,
    num_zeros: u32,
    estimator: HipEstimator,
}

impl Array8 {
    pub fn new(lg_config_k: u8) -> Self {
        let k = 1u32 << lg_config_k;
        Self {
            lg_config_k,
            bytes: vec![0u8; k as usize].into_boxed_slice(),
            num_zeros: k,
            estimator: HipEstimator::new(lg_config_k),
        }
    }

    /// Rebuilds an array from stored registers. `None` if the length does not match `lg_config_k`.
    pub fn from_registers(
        lg_config_k: u8,
        registers: Vec<u8>,
        estimator: HipEstimator,
    ) -> Option<Self> {
        if registers.len() != 1usize << lg_config_k {
            return None;
        }
        let num_zeros = registers.iter().filter(|&&v| v == 0).count() as u32;
        Some(Self {
            lg_config_k,
            bytes: registers.into_boxed_slice(),
            num_zeros,
            estimator,
        })
    }

    #[inline]
    pub fn get(&self, slot: u32) -> u8 {
        self.bytes[slot as usize]
    }

    pub fn update(&mut self, coupon: u32) {
        let mask = (1u32 << self.lg_config_k) - 1;
        let slot = get_slot(coupon) & mask;
        let new_value = get_value(coupon);
        let old_value = self.get(slot);
        if new_value > old_value {
            self.estimator.update(self.lg_config_k, old_value, new_value);
            self.bytes[slot as usize] = new_value;
            if old_value == 0 {
                self.num_zeros -= 1;
            }
        }
    }

    /// Folds `other` into `self`, taking the larger value per register.
    ///
    /// `other` may be larger; its slots fold onto `slot & mask`. The result is out of order.
    pub fn merge_registers(&mut self, other: &Array8) {
        debug_assert!(other.lg_config_k >= self.lg_config_k);
        let mask = (1usize << self.lg_config_k) - 1;
        for (slot, &v) in other.bytes.iter().enumerate() {
            let dst = &mut self.bytes[slot & mask];
            if v > *dst {
                *dst = v;
            }
        }
        self.after_bulk_rewrite();
    }

    /// Copy of this array folded down to `lg_config_k` registers.
    pub fn downsample(&self, lg_config_k: u8) -> Array8 {
        let mut out = Array8::new(lg_config_k);
        out.merge_registers(self);
        out
    }

    fn after_bulk_rewrite(&mut self) {
        self.num_zeros = self.bytes.iter().filter(|&&v| v == 0).count() as u32;
        self.estimator.rebuild_kxq(&self.bytes);
        self.estimator.set_out_of_order(true);
    }

    pub fn estimate(&self) -> f64 {
        self.estimator.estimate(self.lg_config_k, self.num_zeros)
    }

    pub fn lg_config_k(&self) -> u8 {
        self.lg_config_k
    }

    pub fn num_zeros(&self) -> u32 {
        self.num_zeros
    }

    pub fn registers(&self) -> &[u8] {
        &self.bytes
    }

    pub fn estimator(&self) -> &HipEstimator {
        &self.estimator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hll::pack_coupon;

    #[test]
    fn test_update_keeps_max_and_counts_zeros() {
        let mut arr = Array8::new(4);
        assert_eq!(arr.num_zeros(), 16);

        arr.update(pack_coupon(3, 5));
        arr.update(pack_coupon(3, 2));
        assert_eq!(arr.get(3), 5);
        assert_eq!(arr.num_zeros(), 15);

        // slot 19 maps onto slot 3 with 16 registers
        arr.update(pack_coupon(19, 9));
        assert_eq!(arr.get(3), 9);
        assert_eq!(arr.num_zeros(), 15);
        assert!(!arr.estimator().is_out_of_order());
    }

    #[test]
    fn test_downsample_folds_slots() {
        let mut big = Array8::new(5);
        big.update(pack_coupon(1, 4));
        big.update(pack_coupon(17, 7));
        big.update(pack_coupon(2, 1));

        let small = big.downsample(4);
        assert_eq!(small.lg_config_k(), 4);
        assert_eq!(small.get(1), 7);
        assert_eq!(small.get(2), 1);
        assert_eq!(small.num_zeros(), 14);
        assert!(small.estimator().is_out_of_order());
    }

    #[test]
    fn test_from_registers_checks_length() {
        let est = HipEstimator::new(4);
        assert!(Array8::from_registers(4, vec![0; 15], est.clone()).is_none());
        let arr = Array8::from_registers(4, vec![1; 16], est).unwrap();
        assert_eq!(arr.num_zeros(), 0);
    }
}
