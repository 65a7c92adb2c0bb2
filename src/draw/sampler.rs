//! Uniform random sampling without replacement
//!
//! The single source of non-determinism in the draw engine, kept behind a
//! generic `Rng` so tests can inject a seeded `StdRng`.

use rand::seq::SliceRandom;
use rand::Rng;

/// Pick `k` distinct elements uniformly at random, or all of them when
/// fewer than `k` exist. Every k-subset is equally likely; result order is
/// not significant.
pub fn sample<T, R: Rng + ?Sized>(rng: &mut R, mut candidates: Vec<T>, k: usize) -> Vec<T> {
    if candidates.len() <= k {
        return candidates;
    }
    // partial_shuffle places the k sampled elements at the tail.
    let n = candidates.len();
    candidates.partial_shuffle(rng, k);
    candidates.split_off(n - k)
}
