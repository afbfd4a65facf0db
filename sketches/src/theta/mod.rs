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

//! Theta sketches for distinct counting with set operations.
//!
//! [`ThetaSketch`] is the updatable form built from a stream. [`CompactThetaSketch`] is the
//! immutable, sorted form produced by [`ThetaSketch::compact`], by the set operations and by
//! deserialization. Both implement [`ThetaSketchView`], which is what the set operations consume.
//!
//! ```
//! use ds_sketches::theta::{ThetaANotB, ThetaSketch, ThetaSketchView};
//!
//! let mut a = ThetaSketch::builder().lg_k(12).build();
//! let mut b = ThetaSketch::builder().lg_k(12).build();
//! for i in 0..100u64 {
//!     a.update(&i);
//! }
//! for i in 50..100u64 {
//!     b.update(&i);
//! }
//! let diff = ThetaANotB::compute(&a, &b).unwrap();
//! assert_eq!(diff.estimate(), 50.0);
//! ```

mod a_not_b;
mod compact;
mod hash_table;
mod intersection;
mod serialization;
mod sketch;
mod union;

pub use self::a_not_b::ThetaANotB;
pub use self::compact::CompactThetaSketch;
pub use self::hash_table::DEFAULT_LG_K;
pub use self::hash_table::MAX_LG_K;
pub use self::hash_table::MAX_THETA;
pub use self::hash_table::MIN_LG_K;
pub use self::intersection::ThetaIntersection;
pub use self::sketch::ThetaSketch;
pub use self::sketch::ThetaSketchBuilder;
pub use self::union::ThetaUnion;

use crate::common::NumStdDev;
use crate::common::binomial_bounds;
use crate::error::Error;

/// Read access shared by updatable and compact theta sketches.
pub trait ThetaSketchView {
    fn is_empty(&self) -> bool;

    /// Theta as a 64-bit threshold in `(0, MAX_THETA]`.
    fn theta64(&self) -> u64;

    fn num_retained(&self) -> usize;

    fn seed_hash(&self) -> u16;

    /// `true` if [`iter`](Self::iter) yields hashes in ascending order.
    fn is_ordered(&self) -> bool;

    fn iter(&self) -> impl Iterator<Item = u64> + '_;

    /// Theta as a fraction in `(0, 1]`.
    fn theta(&self) -> f64 {
        self.theta64() as f64 / MAX_THETA as f64
    }

    fn is_estimation_mode(&self) -> bool {
        self.theta64() < MAX_THETA
    }

    fn estimate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.num_retained() as f64 / self.theta()
    }

    fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        binomial_bounds::lower_bound(self.num_retained() as u64, self.theta(), num_std_dev)
            .unwrap_or_else(|_| self.num_retained() as f64)
    }

    fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        binomial_bounds::upper_bound(
            self.num_retained() as u64,
            self.theta(),
            num_std_dev,
            false,
        )
        .unwrap_or_else(|_| self.estimate())
    }
}

fn check_seed_hash(expected: u16, actual: u16) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "incompatible seed hash: expected 0x{expected:04X}, got 0x{actual:04X}"
        )))
    }
}
