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
use super::VarOptItemsSketch;

/// Combines VarOpt sketches into one sample of at most `max_k` items.
///
/// Every input sample is replayed with its adjusted weight, so subset sum estimates from the
/// result stay unbiased.
#[derive(Debug, Clone)]
pub struct VarOptItemsUnion<T> {
    gadget: VarOptItemsSketch<T>,
}

impl<T: Clone> VarOptItemsUnion<T> {
    /// # Panics
    ///
    /// Panics if `max_k < 2`.
    pub fn new(max_k: u32) -> Self {
        assert!(max_k >= MIN_K, "max_k must be at least {MIN_K}, got {max_k}");
        Self {
            gadget: VarOptItemsSketch::new(max_k),
        }
    }

    pub fn max_k(&self) -> u32 {
        self.gadget.k()
    }

    pub fn update(&mut self, sketch: &VarOptItemsSketch<T>) {
        for (item, weight) in sketch.samples() {
            self.gadget.insert(item.clone(), weight);
        }
        self.gadget.add_to_n(sketch.n());
    }

    pub fn result(&self) -> VarOptItemsSketch<T> {
        self.gadget.clone()
    }
}
