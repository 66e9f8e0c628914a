/// Fast 2-value hash with xorshift
#[inline(always)]
fn hash2(a: u64, b: u64) -> u64 {
    let mut seed = a.wrapping_mul(2654435761).wrapping_add(b.wrapping_mul(2246822519));
    seed ^= seed << 13;
    seed ^= seed >> 7;
    seed ^= seed << 17;
    seed
}

/// Stable hash of a string, byte by byte through `hash2`
pub fn hash_str(s: &str) -> u64 {
    s.bytes().fold(0x517c_c1b7, |acc, b| hash2(acc, b as u64))
}

/// Deterministic value in [0, 1) using splitmix64 - handles small seeds properly
#[inline(always)]
pub fn unit_from(seed: u64) -> f64 {
    let mut x = seed.wrapping_mul(0x9e3779b97f4a7c15);
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    (x >> 11) as f64 / 9007199254740992.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_spreads() {
        assert_eq!(hash_str("ohio-state"), hash_str("ohio-state"));
        assert_ne!(hash_str("ohio-state"), hash_str("ohio-statf"));
    }

    #[test]
    fn test_unit_range() {
        for seed in [0, 1, 2, u64::MAX, hash_str("texas")] {
            let v = unit_from(seed);
            assert!((0.0..1.0).contains(&v));
        }
    }
}
