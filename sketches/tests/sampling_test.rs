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

use ds_sketches::codec::I64Serde;
use ds_sketches::codec::StringSerde;
use ds_sketches::sampling::ReservoirItemsSketch;
use ds_sketches::sampling::ReservoirItemsUnion;
use ds_sketches::sampling::VarOptItemsSketch;
use ds_sketches::sampling::VarOptItemsUnion;

#[test]
fn test_reservoir_union_after_round_trip() {
    let mut a = ReservoirItemsSketch::<i64>::with_seed(32, 1);
    let mut b = ReservoirItemsSketch::<i64>::with_seed(32, 2);
    for i in 0..1000 {
        a.update(i);
        b.update(i + 1000);
    }
    let a = ReservoirItemsSketch::<i64>::deserialize_with(&a.serialize_with(&I64Serde), &I64Serde)
        .unwrap();
    let mut union = ReservoirItemsUnion::new(32);
    union.update(&a);
    union.update(&b);
    let result = union.result();
    assert_eq!(result.n(), 2000);
    assert_eq!(result.num_samples(), 32);

    let bytes = result.serialize_with(&I64Serde);
    let restored = ReservoirItemsSketch::<i64>::deserialize_with(&bytes, &I64Serde).unwrap();
    assert_eq!(restored.serialize_with(&I64Serde), bytes);
}

#[test]
fn test_varopt_subset_sum_by_prefix() {
    let mut sketch = VarOptItemsSketch::<String>::with_seed(64, 3);
    for i in 0..5000 {
        let (name, weight) = if i % 4 == 0 {
            (format!("big-{i}"), 10.0)
        } else {
            (format!("small-{i}"), 1.0)
        };
        sketch.update(name, weight).unwrap();
    }
    // 1250 * 10 of "big" against 3750 * 1 of "small"
    let summary = sketch.estimate_subset_sum(|item| item.starts_with("big"));
    assert!((summary.total_sketch_weight - 16_250.0).abs() < 1e-6);
    assert!(summary.lower_bound <= summary.estimate && summary.estimate <= summary.upper_bound);
    assert!(summary.estimate > 6_000.0 && summary.estimate < 16_250.0);
}

#[test]
fn test_varopt_union_round_trip() {
    let mut a = VarOptItemsSketch::<String>::with_seed(16, 1);
    let mut b = VarOptItemsSketch::<String>::with_seed(16, 2);
    for i in 0..200 {
        a.update(format!("a{i}"), 1.0).unwrap();
        b.update(format!("b{i}"), 3.0).unwrap();
    }
    let mut union = VarOptItemsUnion::new(16);
    union.update(&a);
    union.update(&b);
    let result = union.result();
    assert_eq!(result.n(), 400);
    let bytes = result.serialize_with(&StringSerde);
    let restored = VarOptItemsSketch::<String>::deserialize_with(&bytes, &StringSerde).unwrap();
    assert_eq!(restored, result);
    let total: f64 = restored.samples().map(|(_, w)| w).sum();
    assert!((total - 800.0).abs() < 1e-6);
}
