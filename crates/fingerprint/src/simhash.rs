//! Text content codes: token shingles folded into a SimHash.
//!
//! Each shingle is hashed once per 64-bit lane (xxh3 with a lane-specific
//! seed) and every bit takes the majority vote over all shingles, so
//! Hamming distance between codes tracks shingle overlap.

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::config::Bits;

const LANE_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Lowercased alphanumeric tokens in document order.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Contiguous `k`-token shingles joined by a single space.
///
/// A document shorter than `k` yields one shingle over all of its tokens.
pub fn shingles<S: AsRef<str>>(tokens: &[S], k: usize) -> Vec<String> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let k = k.clamp(1, tokens.len());
    tokens
        .windows(k)
        .map(|window| {
            window
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// SimHash over `features`, returned as 64-bit lanes (most significant first).
pub fn simhash<S: AsRef<str>>(features: &[S], bits: Bits) -> Vec<u64> {
    (0..bits.lanes())
        .map(|lane| {
            let seed = LANE_SEED.wrapping_mul(lane as u64 + 1);
            let mut votes = [0i64; 64];
            for feature in features {
                let h = xxh3_64_with_seed(feature.as_ref().as_bytes(), seed);
                for (bit, vote) in votes.iter_mut().enumerate() {
                    if (h >> bit) & 1 == 1 {
                        *vote += 1;
                    } else {
                        *vote -= 1;
                    }
                }
            }
            votes
                .iter()
                .enumerate()
                .filter(|(_, vote)| **vote > 0)
                .fold(0u64, |acc, (bit, _)| acc | (1u64 << bit))
        })
        .collect()
}
