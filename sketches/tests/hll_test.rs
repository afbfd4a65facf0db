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

use ds_sketches::common::NumStdDev;
use ds_sketches::hll::HllSketch;
use ds_sketches::hll::HllUnion;
use googletest::assert_that;
use googletest::prelude::ge;
use googletest::prelude::le;
use googletest::prelude::near;

#[test]
fn test_estimate_within_bounds_across_modes() {
    for n in [0usize, 10, 500, 50_000] {
        let mut sketch = HllSketch::new(12);
        for i in 0..n {
            sketch.update(&format!("item-{i}"));
        }
        let estimate = sketch.estimate();
        assert_that!(estimate, near(n as f64, n as f64 * 0.05 + 1.0));
        assert_that!(estimate, ge(sketch.lower_bound(NumStdDev::Two)));
        assert_that!(estimate, le(sketch.upper_bound(NumStdDev::Two)));
    }
}

#[test]
fn test_serialized_bytes_are_stable() {
    let mut sketch = HllSketch::new(10);
    for i in 0..20_000u64 {
        sketch.update(&i);
    }
    let bytes = sketch.serialize();
    let restored = HllSketch::deserialize(&bytes).unwrap();
    assert_eq!(restored.serialize(), bytes);
    assert_eq!(restored.estimate(), sketch.estimate());
}

#[test]
fn test_union_of_overlapping_streams() {
    let mut a = HllSketch::new(12);
    let mut b = HllSketch::new(10);
    for i in 0..30_000u64 {
        a.update(&i);
        b.update(&(i + 15_000));
    }
    let mut union = HllUnion::new(12);
    union.update(&a);
    union.update(&b);
    let result = union.result();
    assert_eq!(result.lg_config_k(), 10);
    assert_that!(result.estimate(), near(45_000.0, 45_000.0 * 0.1));
}

#[test]
fn test_rejects_garbage() {
    assert!(HllSketch::deserialize(&[]).is_err());
    assert!(HllSketch::deserialize(&[2, 1, 9, 12, 0, 0, 0, 0]).is_err());
}
