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

use crate::error::Error;

/// Retained items sorted by value with cumulative weights.
#[derive(Debug, Clone)]
pub(crate) struct SortedView {
    entries: Vec<Entry>,
    total_weight: u64,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    item: f64,
    // cumulative once the view is built
    weight: u64,
}

impl SortedView {
    pub fn new(levels: &[Vec<f64>]) -> Self {
        let mut entries: Vec<Entry> = levels
            .iter()
            .enumerate()
            .flat_map(|(level, items)| {
                items.iter().map(move |&item| Entry {
                    item,
                    weight: 1u64 << level,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.item.total_cmp(&b.item));

        let mut total_weight = 0u64;
        for entry in &mut entries {
            total_weight += entry.weight;
            entry.weight = total_weight;
        }
        Self {
            entries,
            total_weight,
        }
    }

    pub fn rank(&self, item: f64, inclusive: bool) -> f64 {
        let idx = if inclusive {
            self.entries.partition_point(|e| e.item <= item)
        } else {
            self.entries.partition_point(|e| e.item < item)
        };
        if idx == 0 {
            return 0.0;
        }
        self.entries[idx - 1].weight as f64 / self.total_weight as f64
    }

    pub fn quantile(&self, rank: f64, inclusive: bool) -> f64 {
        let scaled = rank * self.total_weight as f64;
        let idx = if inclusive {
            let weight = scaled.ceil() as u64;
            self.entries.partition_point(|e| e.weight < weight)
        } else {
            let weight = scaled as u64;
            self.entries.partition_point(|e| e.weight <= weight)
        };
        let idx = idx.min(self.entries.len() - 1);
        self.entries[idx].item
    }

    pub fn cdf(&self, split_points: &[f64], inclusive: bool) -> Result<Vec<f64>, Error> {
        check_split_points(split_points)?;
        let mut ranks: Vec<f64> = split_points
            .iter()
            .map(|&item| self.rank(item, inclusive))
            .collect();
        ranks.push(1.0);
        Ok(ranks)
    }

    pub fn pmf(&self, split_points: &[f64], inclusive: bool) -> Result<Vec<f64>, Error> {
        let mut buckets = self.cdf(split_points, inclusive)?;
        for i in (1..buckets.len()).rev() {
            buckets[i] -= buckets[i - 1];
        }
        Ok(buckets)
    }
}

fn check_split_points(split_points: &[f64]) -> Result<(), Error> {
    if split_points.iter().any(|v| v.is_nan()) {
        return Err(Error::invalid_argument(
            "split points must not contain NaN values",
        ));
    }
    if split_points.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::invalid_argument(
            "split points must be unique and monotonically increasing",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_ranks() {
        // level 0 items weigh 1, level 1 items weigh 2
        let view = SortedView::new(&[vec![1.0, 3.0], vec![2.0]]);
        assert_eq!(view.total_weight, 4);
        assert_eq!(view.rank(0.5, true), 0.0);
        assert_eq!(view.rank(1.0, true), 0.25);
        assert_eq!(view.rank(1.0, false), 0.0);
        assert_eq!(view.rank(2.0, true), 0.75);
        assert_eq!(view.rank(10.0, true), 1.0);
    }

    #[test]
    fn test_quantile_endpoints() {
        let view = SortedView::new(&[vec![5.0, 1.0, 3.0]]);
        assert_eq!(view.quantile(0.0, true), 1.0);
        assert_eq!(view.quantile(0.5, true), 3.0);
        assert_eq!(view.quantile(1.0, true), 5.0);
        assert_eq!(view.quantile(1.0, false), 5.0);
    }

    #[test]
    fn test_pmf_sums_to_one() {
        let view = SortedView::new(&[vec![1.0, 2.0, 3.0, 4.0]]);
        let pmf = view.pmf(&[2.5], true).unwrap();
        assert_eq!(pmf, vec![0.5, 0.5]);
        assert!(view.pmf(&[3.0, 1.0], true).is_err());
        assert!(view.cdf(&[f64::NAN], true).is_err());
    }
}
