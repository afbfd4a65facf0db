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

//! Union of HLL sketches.
//!
//! The union keeps a "gadget" sketch that accumulates every input. Inputs still holding exact
//! coupons are replayed into the gadget; inputs with registers are folded in register by
//! register, shrinking the gadget to the smaller `lg_config_k` when the two differ.
//!
//! # Example
//!
//! ```
//! use ds_sketches::hll::{HllSketch, HllUnion};
//!
//! let mut union = HllUnion::new(12);
//!
//! let mut sketch1 = HllSketch::new(12);
//! sketch1.update("foo");
//! sketch1.update("bar");
//!
//! let mut sketch2 = HllSketch::new(12);
//! sketch2.update("bar");
//! sketch2.update("baz");
//!
//! union.update(&sketch1);
//! union.update(&sketch2);
//! assert!((union.result().estimate() - 3.0).abs() < 0.01);
//! ```

use super::MAX_LG_K;
use super::MIN_LG_K;
use super::check_lg_k;
use super::sketch::HllSketch;
use super::sketch::Mode;

#[derive(Debug, Clone)]
pub struct HllUnion {
    lg_max_k: u8,
    gadget: HllSketch,
}

impl HllUnion {
    /// Creates an empty union whose result has at most `2^lg_max_k` registers.
    ///
    /// # Panics
    ///
    /// Panics if `lg_max_k` is not in `[4, 21]`.
    pub fn new(lg_max_k: u8) -> Self {
        assert!(
            check_lg_k(lg_max_k),
            "lg_max_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_max_k}"
        );
        Self {
            lg_max_k,
            gadget: HllSketch::new(lg_max_k),
        }
    }

    pub fn update(&mut self, sketch: &HllSketch) {
        if sketch.is_empty() {
            return;
        }
        match sketch.mode() {
            Mode::Coupons(list) => {
                for c in list.iter() {
                    self.gadget.update_coupon(c);
                }
            }
            Mode::Registers(src) => {
                let lg_k = self.gadget.lg_config_k().min(src.lg_config_k());
                let mut dst = self.gadget.to_registers(lg_k);
                dst.merge_registers(src);
                self.gadget = HllSketch::from_mode(lg_k, Mode::Registers(dst));
            }
        }
    }

    /// Returns a copy of the accumulated sketch.
    pub fn result(&self) -> HllSketch {
        self.gadget.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.gadget.is_empty()
    }

    pub fn lg_max_k(&self) -> u8 {
        self.lg_max_k
    }

    pub fn lg_config_k(&self) -> u8 {
        self.gadget.lg_config_k()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_takes_smallest_lg_k() {
        let mut a = HllSketch::new(12);
        let mut b = HllSketch::new(10);
        for i in 0..20_000u64 {
            a.update(&i);
            b.update(&(i + 10_000));
        }
        let mut union = HllUnion::new(12);
        union.update(&a);
        assert_eq!(union.lg_config_k(), 12);
        union.update(&b);
        assert_eq!(union.lg_config_k(), 10);

        let result = union.result();
        assert!(result.is_out_of_order());
        let est = result.estimate();
        assert!((est - 30_000.0).abs() < 30_000.0 * 0.1, "{est}");
    }

    #[test]
    fn test_union_of_sparse_sketches_is_exact() {
        let mut a = HllSketch::new(12);
        let mut b = HllSketch::new(12);
        for i in 0..50u64 {
            a.update(&i);
            b.update(&(i + 25));
        }
        let mut union = HllUnion::new(12);
        union.update(&a);
        union.update(&b);
        union.update(&HllSketch::new(8));
        let result = union.result();
        assert!(!result.is_estimation_mode());
        assert!((result.estimate() - 75.0).abs() < 0.01);
    }
}
