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

//! KLL quantiles sketch over `f64` values.
//!
//! KLL keeps a hierarchy of compactors: level `h` holds items of weight `2^h`, and a full level is
//! sorted, halved by a random coin flip and promoted to the level above. Retained items stay
//! within a small multiple of `k` while rank error shrinks roughly as `1/k`.
//!
//! # Usage
//!
//! ```rust
//! # use ds_sketches::kll::KllSketch;
//! let mut sketch = KllSketch::new(200);
//! for i in 1..=1000 {
//!     sketch.update(i as f64);
//! }
//! let median = sketch.quantile(0.5, true).unwrap();
//! assert!((450.0..=550.0).contains(&median));
//! ```

mod helper;
mod serialization;
mod sketch;
mod sorted_view;

pub use self::sketch::KllSketch;

/// Default value of parameter k.
pub const DEFAULT_K: u16 = 200;
/// Default value of parameter m.
pub const DEFAULT_M: u8 = 8;
/// Minimum value of parameter k.
pub const MIN_K: u16 = DEFAULT_M as u16;
/// Maximum value of parameter k.
pub const MAX_K: u16 = u16::MAX;
