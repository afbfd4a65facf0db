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

//! Frequent items sketches for finding heavy hitters in weighted streams.
//!
//! The sketch keeps at most `0.75 * max_map_size` counters. When the map is full the median
//! counter value is subtracted from every counter and the non-positive ones are dropped; the
//! running sum of those medians is the maximum error of any reported count.
//!
//! # Usage
//!
//! ```rust
//! # use ds_sketches::frequencies::ErrorType;
//! # use ds_sketches::frequencies::FrequentItemsSketch;
//! let mut sketch = FrequentItemsSketch::<String>::new(64);
//! sketch.update_with_count("a".to_string(), 3).unwrap();
//! sketch.update("b".to_string());
//! let rows = sketch.frequent_items(ErrorType::NoFalseNegatives);
//! assert_eq!(rows[0].item(), "a");
//! ```
//!
//! # Serialization
//!
//! ```rust
//! # use ds_sketches::codec::StringSerde;
//! # use ds_sketches::frequencies::FrequentItemsSketch;
//! let mut sketch = FrequentItemsSketch::<String>::new(64);
//! sketch.update_with_count("x".to_string(), 2).unwrap();
//!
//! let bytes = sketch.serialize_with(&StringSerde);
//! let decoded = FrequentItemsSketch::<String>::deserialize_with(&bytes, &StringSerde).unwrap();
//! assert_eq!(decoded.estimate(&"x".to_string()), 2);
//! ```

mod reverse_purge_item_hash_map;
mod serialization;
mod sketch;

pub use self::sketch::ErrorType;
pub use self::sketch::FrequentItemsSketch;
pub use self::sketch::Row;
