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

//! Binary layout of a serialized [`FrequentItemsSketch`](super::FrequentItemsSketch).
//!
//! ```text
//! byte 0      preamble longs (1 empty, 4 otherwise)
//! byte 1      serial version
//! byte 2      family id (10)
//! byte 3      lg max map size
//! byte 4      lg current map size
//! byte 5      flags
//! bytes 6-7   unused
//! bytes 8-11  number of active items
//! bytes 12-15 unused
//! bytes 16-23 stream weight (i64)
//! bytes 24-31 offset (i64)
//! bytes 32-   counts (i64 each), then the items, both in ascending item order
//! ```

pub(super) const SERIAL_VERSION: u8 = 1;

pub(super) const PREAMBLE_LONGS_EMPTY: u8 = 1;
pub(super) const PREAMBLE_LONGS_NONEMPTY: u8 = 4;

pub(super) const EMPTY_FLAG_MASK: u8 = 5;
