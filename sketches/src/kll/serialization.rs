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

//! Binary layout of a serialized KLL sketch.
//!
//! ```text
//! byte 0      preamble ints (2 for empty or single item, 5 otherwise)
//! byte 1      serial version (1, or 2 for a single item)
//! byte 2      family id
//! byte 3      flags
//! bytes 4-5   k
//! byte 6      m
//! byte 7      unused
//! -- full sketches only --
//! bytes 8-15  n
//! bytes 16-17 min k
//! byte 18     number of levels
//! byte 19     unused
//! then one u32 offset per level, min item, max item
//! -- all non-empty sketches --
//! retained items, level 0 first
//! ```

pub const SERIAL_VERSION_1: u8 = 1;
pub const SERIAL_VERSION_2: u8 = 2;

pub const PREAMBLE_INTS_SHORT: u8 = 2;
pub const PREAMBLE_INTS_FULL: u8 = 5;

pub const FLAG_EMPTY: u8 = 1 << 0;
pub const FLAG_LEVEL_ZERO_SORTED: u8 = 1 << 1;
pub const FLAG_SINGLE_ITEM: u8 = 1 << 2;

pub const EMPTY_SIZE_BYTES: usize = 8;
pub const DATA_START_SINGLE_ITEM: usize = 8;
pub const DATA_START: usize = 20;
