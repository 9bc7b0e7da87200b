// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared input generators for the benchmarks.

pub fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

/// Uniform noise in `[-0.5, 0.5)`.
pub fn uniform_noise(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| (lcg_next(&mut state) >> 11) as f64 / (1u64 << 53) as f64 - 0.5)
        .collect()
}

/// AR(1) path driven by [`uniform_noise`].
pub fn ar1(n: usize, phi: f64, seed: u64) -> Vec<f64> {
    let mut prev = 0.0;
    uniform_noise(n, seed)
        .into_iter()
        .map(|e| {
            prev = phi * prev + e;
            prev
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ar1, uniform_noise};

    #[test]
    fn generators_are_deterministic_and_bounded() {
        let a = uniform_noise(64, 9);
        assert_eq!(a, uniform_noise(64, 9));
        assert!(a.iter().all(|v| (-0.5..0.5).contains(v)));
        assert_eq!(ar1(10, 0.0, 9), uniform_noise(10, 9));
    }
}
