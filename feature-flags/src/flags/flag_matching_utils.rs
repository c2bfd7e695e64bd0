use std::str::FromStr;

use sha1::{Digest, Sha1};

pub const BUCKET_COUNT: u64 = 100;

/// How an identity is mapped onto one of the 100 rollout buckets.
///
/// Both variants are pure functions of the identity string: no floats, no locale,
/// no per-process seed. A user lands in the same bucket on every machine and in every session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BucketingHash {
    /// First 60 bits of SHA-1(identity), modulo 100.
    #[default]
    Sha1,
    /// Sum of the identity's Unicode scalar values, modulo 100. Kept for parity with
    /// bucket assignments made by older clients; clusters badly for short or similar ids.
    CharSum,
}

impl BucketingHash {
    /// Returns the identity's bucket in `0..100`.
    pub fn bucket(&self, identity: &str) -> u8 {
        let hash_val = match self {
            BucketingHash::Sha1 => sha1_hash(identity),
            BucketingHash::CharSum => char_sum_hash(identity),
        };
        // always < 100
        (hash_val % BUCKET_COUNT) as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BucketingHash::Sha1 => "sha1",
            BucketingHash::CharSum => "char_sum",
        }
    }
}

impl FromStr for BucketingHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sha1" | "" => Ok(BucketingHash::Sha1),
            "char_sum" | "charsum" | "legacy" => Ok(BucketingHash::CharSum),
            other => Err(format!("Unknown bucketing hash: {}", other)),
        }
    }
}

impl std::fmt::Display for BucketingHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn sha1_hash(identity: &str) -> u64 {
    let digest = Sha1::digest(identity.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    // Same 15 hex characters (60 bits) the percentage hash has always used
    u64::from_be_bytes(prefix) >> 4
}

fn char_sum_hash(identity: &str) -> u64 {
    identity
        .chars()
        .fold(0u64, |acc, c| acc.wrapping_add(u64::from(u32::from(c))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", 52)]
    #[case("a", 31)]
    #[case("u1", 26)]
    #[case("u2", 23)]
    #[case("admin-1", 56)]
    #[case("user-7", 18)]
    #[case("user-42", 77)]
    #[case("zzz-low-hash-user", 38)]
    fn test_sha1_buckets_are_pinned(#[case] identity: &str, #[case] expected: u8) {
        assert_eq!(BucketingHash::Sha1.bucket(identity), expected);
    }

    #[rstest]
    #[case("", 0)]
    #[case("a", 97)]
    #[case("u1", 66)]
    #[case("admin-1", 15)]
    #[case("zzz-low-hash-user", 6)]
    fn test_char_sum_buckets_are_pinned(#[case] identity: &str, #[case] expected: u8) {
        assert_eq!(BucketingHash::CharSum.bucket(identity), expected);
    }

    #[test]
    fn test_char_sum_collides_on_anagrams_but_sha1_does_not() {
        assert_eq!(
            BucketingHash::CharSum.bucket("ab"),
            BucketingHash::CharSum.bucket("ba")
        );
        assert_ne!(
            BucketingHash::Sha1.bucket("ab"),
            BucketingHash::Sha1.bucket("ba")
        );
    }

    #[test]
    fn test_char_sum_uses_code_points_not_bytes() {
        // U+00E9 is two bytes in UTF-8 but a single code point of value 233
        assert_eq!(BucketingHash::CharSum.bucket("\u{e9}"), 33);
    }

    #[test]
    fn test_buckets_stay_in_range() {
        for hash in [BucketingHash::Sha1, BucketingHash::CharSum] {
            for i in 0..1000 {
                assert!(hash.bucket(&format!("user-{i}")) < 100);
            }
        }
    }

    #[test]
    fn test_sha1_spreads_users_roughly_evenly() {
        let mut counts = [0u32; 100];
        for i in 0..10_000 {
            counts[BucketingHash::Sha1.bucket(&format!("user-{i}")) as usize] += 1;
        }
        let below_half = counts[..50].iter().sum::<u32>();
        assert!(
            (4_500..=5_500).contains(&below_half),
            "expected about half the users below bucket 50, got {below_half}"
        );
    }

    #[rstest]
    #[case("sha1", BucketingHash::Sha1)]
    #[case("SHA1", BucketingHash::Sha1)]
    #[case("", BucketingHash::Sha1)]
    #[case("char_sum", BucketingHash::CharSum)]
    #[case("legacy", BucketingHash::CharSum)]
    fn test_parse_bucketing_hash(#[case] raw: &str, #[case] expected: BucketingHash) {
        assert_eq!(BucketingHash::from_str(raw).unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_unknown_hash() {
        assert!(BucketingHash::from_str("md5").is_err());
    }
}
