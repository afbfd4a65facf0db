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

use super::MIN_K;
use super::ReservoirItemsSketch;

/// Combines reservoir sketches of possibly different sizes into one uniform sample of at most
/// `max_k` items.
#[derive(Debug, Clone)]
pub struct ReservoirItemsUnion<T> {
    max_k: u32,
    gadget: Option<ReservoirItemsSketch<T>>,
}

impl<T: Clone> ReservoirItemsUnion<T> {
    /// # Panics
    ///
    /// Panics if `max_k < 2`.
    pub fn new(max_k: u32) -> Self {
        assert!(max_k >= MIN_K, "max_k must be at least {MIN_K}, got {max_k}");
        Self {
            max_k,
            gadget: None,
        }
    }

    pub fn max_k(&self) -> u32 {
        self.max_k
    }

    pub fn update(&mut self, sketch: &ReservoirItemsSketch<T>) {
        if sketch.is_empty() {
            return;
        }
        let sketch = sketch.downsampled(self.max_k);

        let Some(gadget) = self.gadget.take() else {
            self.gadget = Some(if sketch.is_estimation_mode() {
                sketch
            } else {
                let mut gadget = ReservoirItemsSketch::new(self.max_k);
                for item in sketch.samples() {
                    gadget.update(item.clone());
                }
                gadget
            });
            return;
        };

        let merged = match (gadget.is_estimation_mode(), sketch.is_estimation_mode()) {
            (_, false) => feed_items(gadget, &sketch),
            (false, true) => feed_items(sketch, &gadget),
            (true, true) => {
                if gadget.implicit_sample_weight() >= sketch.implicit_sample_weight() {
                    merge_weighted(gadget, &sketch)
                } else {
                    merge_weighted(sketch, &gadget)
                }
            }
        };
        self.gadget = Some(merged);
    }

    /// Returns the union as a sketch; an empty sketch of size `max_k` when nothing was added.
    pub fn result(&self) -> ReservoirItemsSketch<T> {
        match &self.gadget {
            Some(gadget) => gadget.clone(),
            None => ReservoirItemsSketch::new(self.max_k),
        }
    }
}

fn feed_items<T: Clone>(
    mut target: ReservoirItemsSketch<T>,
    exact: &ReservoirItemsSketch<T>,
) -> ReservoirItemsSketch<T> {
    for item in exact.samples() {
        target.update(item.clone());
    }
    target
}

// Each source sample stands for `n / num_samples` items and replaces a random slot of the
// target with probability proportional to that weight.
fn merge_weighted<T: Clone>(
    mut target: ReservoirItemsSketch<T>,
    source: &ReservoirItemsSketch<T>,
) -> ReservoirItemsSketch<T> {
    let weight = source.implicit_sample_weight();
    let mut running_total = target.n() as f64;
    for item in source.samples() {
        running_total += weight;
        target.weighted_insert(item.clone(), weight, running_total);
    }
    target.add_to_n(source.n());
    tracing::trace!(n = target.n(), "merged reservoir samples by weight");
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(k: u32, range: std::ops::Range<i64>, seed: u64) -> ReservoirItemsSketch<i64> {
        let mut sketch = ReservoirItemsSketch::with_seed(k, seed);
        for i in range {
            sketch.update(i);
        }
        sketch
    }

    #[test]
    fn test_exact_inputs_stay_exact() {
        let mut union = ReservoirItemsUnion::new(10);
        union.update(&filled(10, 0..3, 1));
        union.update(&filled(10, 3..6, 2));
        let result = union.result();
        assert_eq!(result.n(), 6);
        let mut samples = result.samples().to_vec();
        samples.sort();
        assert_eq!(samples, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_estimation_inputs() {
        let mut union = ReservoirItemsUnion::new(16);
        union.update(&filled(16, 0..1000, 1));
        union.update(&filled(16, 1000..3000, 2));
        union.update(&filled(8, 3000..3004, 3));
        let result = union.result();
        assert_eq!(result.n(), 3004);
        assert_eq!(result.num_samples(), 16);
        assert!(result.samples().iter().all(|x| (0..3004).contains(x)));
    }

    #[test]
    fn test_larger_sketches_are_downsampled() {
        let mut union = ReservoirItemsUnion::new(4);
        union.update(&filled(32, 0..100, 1));
        let result = union.result();
        assert_eq!(result.k(), 4);
        assert_eq!(result.num_samples(), 4);
        assert_eq!(result.n(), 100);
    }

    #[test]
    fn test_empty_union() {
        let mut union = ReservoirItemsUnion::<i64>::new(4);
        union.update(&ReservoirItemsSketch::new(4));
        assert!(union.result().is_empty());
        assert_eq!(union.result().k(), 4);
    }
}
