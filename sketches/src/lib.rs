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

//! Streaming sketches used by the `ds` command line.
//!
//! Every sketch family owns a versioned little-endian byte format. Deserialization validates
//! the bytes and reports problems through [`error::Error`] rather than panicking.
//!
//! - [`hll`]: HyperLogLog cardinality estimation.
//! - [`theta`]: theta sketches with union, intersection and set difference.
//! - [`kll`]: KLL quantiles over `f64`.
//! - [`frequencies`]: heavy hitters with error guarantees.
//! - [`sampling`]: uniform reservoir and VarOpt weighted sampling.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod codec;
pub mod common;
pub mod error;
pub mod frequencies;
pub mod hash;
pub mod hll;
pub mod kll;
pub mod sampling;
pub mod theta;
