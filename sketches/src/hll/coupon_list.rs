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

//! Sparse mode: an exact, ordered set of coupons.

use std::collections::BTreeSet;

use super::KEY_BITS_26;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct CouponList {
    coupons: BTreeSet<u32>,
}

impl CouponList {
    /// Returns `true` if the coupon was not present.
    pub fn insert(&mut self, coupon: u32) -> bool {
        self.coupons.insert(coupon)
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }

    /// Coupons in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.coupons.iter().copied()
    }

    /// Distinct count corrected for collisions in the 26-bit address space.
    pub fn estimate(&self) -> f64 {
        if self.coupons.is_empty() {
            return 0.0;
        }
        let n = self.coupons.len() as f64;
        let space = (1u64 << KEY_BITS_26) as f64;
        (-space * (1.0 - n / space).ln()).max(n)
    }
}

/// Number of coupons a sparse sketch holds before switching to registers.
pub(super) fn promotion_threshold(lg_config_k: u8) -> usize {
    ((3usize << lg_config_k) / 32).max(8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedups_and_orders() {
        let mut list = CouponList::default();
        assert!(list.insert(30));
        assert!(list.insert(10));
        assert!(!list.insert(30));
        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![10, 30]);
    }

    #[test]
    fn test_estimate_is_close_to_count() {
        let mut list = CouponList::default();
        for c in 0..1000 {
            list.insert(c);
        }
        let est = list.estimate();
        assert!(est >= 1000.0 && est < 1000.01, "{est}");
    }

    #[test]
    fn test_promotion_threshold() {
        assert_eq!(promotion_threshold(4), 8);
        assert_eq!(promotion_threshold(12), 384);
    }
}
