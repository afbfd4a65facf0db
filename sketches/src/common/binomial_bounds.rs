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

//! Confidence bounds on the size of a set from a Bernoulli sample of it.
//!
//! A theta sketch that retains `n` hashes below `theta` saw each distinct item with probability
//! `theta`. The bounds below are the continuity-corrected normal approximation of the binomial,
//! solved for the population size.

use crate::common::NumStdDev;
use crate::error::Error;

/// Lower bound on the population size given `num_samples` retained at rate `theta`.
pub fn lower_bound(num_samples: u64, theta: f64, num_std_dev: NumStdDev) -> Result<f64, Error> {
    check_theta(theta)?;
    if theta == 1.0 || num_samples == 0 {
        return Ok(num_samples as f64);
    }
    let n = num_samples as f64;
    let n_hat = (n - 0.5) / theta;
    let b = num_std_dev.as_f64() * ((1.0 - theta) / theta).sqrt();
    let d = 0.5 * b * (b * b + 4.0 * n_hat).sqrt();
    let center = n_hat + 0.5 * b * b;
    Ok((center - d).max(n))
}

/// Upper bound on the population size given `num_samples` retained at rate `theta`.
///
/// `no_data_seen` short-circuits to zero for a sketch that was never updated.
pub fn upper_bound(
    num_samples: u64,
    theta: f64,
    num_std_dev: NumStdDev,
    no_data_seen: bool,
) -> Result<f64, Error> {
    check_theta(theta)?;
    if no_data_seen {
        return Ok(0.0);
    }
    if theta == 1.0 {
        return Ok(num_samples as f64);
    }
    let n = num_samples as f64;
    let n_hat = (n + 0.5) / theta;
    let b = num_std_dev.as_f64() * ((1.0 - theta) / theta).sqrt();
    let d = 0.5 * b * (b * b + 4.0 * n_hat).sqrt();
    let center = n_hat + 0.5 * b * b;
    Ok((center + d).max(n / theta))
}

fn check_theta(theta: f64) -> Result<(), Error> {
    if theta > 0.0 && theta <= 1.0 {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "theta must be in (0, 1], got {theta}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_mode_bounds_are_the_count() {
        assert_eq!(lower_bound(100, 1.0, NumStdDev::Two).unwrap(), 100.0);
        assert_eq!(upper_bound(100, 1.0, NumStdDev::Two, false).unwrap(), 100.0);
        assert_eq!(upper_bound(0, 1.0, NumStdDev::Two, true).unwrap(), 0.0);
    }

    #[test]
    fn test_bounds_bracket_estimate() {
        let theta = 0.25;
        let estimate = 4096.0 / theta;
        for nsd in [NumStdDev::One, NumStdDev::Two, NumStdDev::Three] {
            let lb = lower_bound(4096, theta, nsd).unwrap();
            let ub = upper_bound(4096, theta, nsd, false).unwrap();
            assert!(lb < estimate && estimate < ub, "{lb} {estimate} {ub}");
        }
        let lb1 = lower_bound(4096, theta, NumStdDev::One).unwrap();
        let lb3 = lower_bound(4096, theta, NumStdDev::Three).unwrap();
        assert!(lb3 < lb1);
    }

    #[test]
    fn test_invalid_theta() {
        assert!(lower_bound(1, 0.0, NumStdDev::One).is_err());
        assert!(upper_bound(1, 1.5, NumStdDev::One, false).is_err());
    }
}
