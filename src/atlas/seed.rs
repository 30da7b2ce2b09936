//! Per-area seed derivation
//!
//! SHA-256 over `"{global}{area}"`, first four digest bytes read as a little-endian i32.
//! Stable across runs and platforms.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use sha2::{Digest, Sha256};

/// Derive the seed for one area from the global seed and the area's name
pub fn area_seed(global_seed: i64, area_name: &str) -> i32 {
    let digest = Sha256::digest(format!("{global_seed}{area_name}").as_bytes());
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&digest[..4]);
    i32::from_le_bytes(bytes)
}

/// RNG stream for a derived seed
pub fn rng_for(seed: i32) -> Pcg32 {
    Pcg32::seed_from_u64(seed as u32 as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_stable() {
        assert_eq!(area_seed(42, "Marsh"), area_seed(42, "Marsh"));
    }

    #[test]
    fn test_seed_depends_on_both_inputs() {
        assert_ne!(area_seed(42, "Marsh"), area_seed(42, "Dunes"));
        assert_ne!(area_seed(42, "Marsh"), area_seed(43, "Marsh"));
    }

    #[test]
    fn test_seed_concatenates_string_forms() {
        // "1" + "23" and "12" + "3" hash the same bytes
        assert_eq!(area_seed(1, "23"), area_seed(12, "3"));
    }

    #[test]
    fn test_known_digest_prefix() {
        // sha256("42Marsh") = 917f1ef2...
        assert_eq!(area_seed(42, "Marsh"), i32::from_le_bytes([0x91, 0x7f, 0x1e, 0xf2]));
        // sha256("42") = 73475cb4...
        assert_eq!(area_seed(42, ""), i32::from_le_bytes([0x73, 0x47, 0x5c, 0xb4]));
    }
}
