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

use ds_sketches::codec::StringSerde;
use ds_sketches::frequencies::ErrorType;
use ds_sketches::frequencies::FrequentItemsSketch;

#[test]
fn test_heavy_hitter_survives_noise() {
    let mut sketch = FrequentItemsSketch::<String>::new(64);
    for i in 0..10_000 {
        sketch.update(format!("noise-{i}"));
        if i % 2 == 0 {
            sketch.update("hot".to_string());
        }
    }
    let rows = sketch.frequent_items(ErrorType::NoFalsePositives);
    assert_eq!(rows[0].item(), "hot");
    assert!(rows[0].lower_bound() <= 5_000);
    assert!(rows[0].upper_bound() >= 5_000);
    assert_eq!(sketch.total_weight(), 15_000);
}

#[test]
fn test_weighted_item_counted_exactly() {
    let mut sketch = FrequentItemsSketch::<String>::new(1024);
    for i in 1..=19_975i64 {
        sketch.update_with_count(i.to_string(), 1).unwrap();
    }
    for i in 19_976..=20_000i64 {
        sketch.update_with_count(i.to_string(), i).unwrap();
    }
    let rows = sketch.frequent_items(ErrorType::NoFalsePositives);
    let row = rows.iter().find(|row| row.item() == "20000").unwrap();
    assert_eq!(row.lower_bound(), 20_000);
    assert!(sketch.update_with_count("x".to_string(), -1).is_err());
}

#[test]
fn test_merge_and_round_trip() {
    let mut a = FrequentItemsSketch::<String>::new(32);
    let mut b = FrequentItemsSketch::<String>::new(32);
    for i in 0..100 {
        a.update(format!("a{}", i % 10));
        b.update(format!("b{}", i % 5));
    }
    a.merge(&b).unwrap();
    assert_eq!(a.total_weight(), 200);
    assert_eq!(a.estimate(&"b0".to_string()), 20);

    let bytes = a.serialize_with(&StringSerde);
    let restored = FrequentItemsSketch::<String>::deserialize_with(&bytes, &StringSerde).unwrap();
    assert_eq!(restored.serialize_with(&StringSerde), bytes);
    assert_eq!(restored.estimate(&"a3".to_string()), 10);
}
