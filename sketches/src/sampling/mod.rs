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

//! Fixed-size random samples of a stream.
//!
//! - [`ReservoirItemsSketch`] keeps a uniform sample of `k` items (Algorithm R). Every retained
//!   item stands for `n / k` stream items.
//! - [`VarOptItemsSketch`] keeps a variance-optimal sample of `k` weighted items. Items heavier
//!   than the threshold `tau` are kept with their exact weight; the rest share the weight `tau`.
//!   Subset sums estimated from the sample are unbiased.
//!
//! Both have a union that tolerates inputs of different sizes, capped at a maximum `k`.
//!
//! ```
//! use ds_sketches::sampling::ReservoirItemsSketch;
//!
//! let mut sketch = ReservoirItemsSketch::<i64>::new(10);
//! for i in 0..1000 {
//!     sketch.update(i);
//! }
//! assert_eq!(sketch.num_samples(), 10);
//! assert_eq!(sketch.n(), 1000);
//! ```

mod reservoir;
mod reservoir_union;
mod varopt;
mod varopt_union;

pub use self::reservoir::ReservoirItemsSketch;
pub use self::reservoir_union::ReservoirItemsUnion;
pub use self::varopt::SubsetSummary;
pub use self::varopt::VarOptItemsSketch;
pub use self::varopt_union::VarOptItemsUnion;

/// Smallest sample size accepted by either sampler.
pub const MIN_K: u32 = 2;

/// Sample size used when none is given.
pub const DEFAULT_K: u32 = 32;

pub(crate) const EMPTY_FLAG_MASK: u8 = 1 << 2;
