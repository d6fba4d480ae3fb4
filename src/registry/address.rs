//! Identifier normalization
//!
//! Every stored record is keyed by exactly one canonical spelling of its
//! identifier. Chain addresses normalize to their EIP-55 checksummed form
//! (derived from the lowercase spelling, so differently-cased inputs
//! collapse to the same key); anything else normalizes to lowercase.

use sha3::{Digest, Keccak256};

/// Canonicalize an identifier to its storage spelling.
///
/// Pure and idempotent: `normalize_identifier(normalize_identifier(x))`
/// equals `normalize_identifier(x)` for any input.
pub fn normalize_identifier(identifier: &str) -> String {
    if is_address(identifier) {
        checksum_address(identifier)
    } else {
        identifier.to_lowercase()
    }
}

/// Whether a string is syntactically a chain address: a case-insensitive
/// `0x` prefix followed by exactly 40 hex digits.
pub fn is_address(identifier: &str) -> bool {
    match identifier
        .strip_prefix("0x")
        .or_else(|| identifier.strip_prefix("0X"))
    {
        Some(body) => body.len() == 40 && body.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// EIP-55 checksummed spelling: a hex letter is uppercased exactly when the
/// matching nibble of the Keccak-256 digest of the lowercase hex body is 8
/// or higher.
fn checksum_address(address: &str) -> String {
    let body = address[2..].to_ascii_lowercase();

    let digest = Keccak256::digest(body.as_bytes());

    let mut out = String::with_capacity(body.len() + 2);
    out.push_str("0x");
    for (i, c) in body.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            digest[i / 2] >> 4
        } else {
            digest[i / 2] & 0x0f
        };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference vectors from EIP-55.
    const CHECKSUMMED: &[&str] = &[
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        "0x52908400098527886E0F7030069857D2E4169EE7",
        "0x8617E340B3D01FA5F11F306F4090FD50E238070D",
        "0xde709f2102306220921060314715629080e2fb77",
        "0x27b1fdb04752bbc536007a920d24acb045561c26",
    ];

    #[test]
    fn test_checksums_reference_vectors() {
        for address in CHECKSUMMED {
            assert_eq!(normalize_identifier(&address.to_lowercase()), *address);
            assert_eq!(normalize_identifier(&address.to_uppercase()), *address);
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for address in CHECKSUMMED {
            let once = normalize_identifier(address);
            assert_eq!(normalize_identifier(&once), once);
        }
        let key = normalize_identifier("ScamSniffer");
        assert_eq!(normalize_identifier(&key), key);
    }

    #[test]
    fn test_case_variants_collapse() {
        let lower = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359";
        let upper = "0XFB6916095CA1DF60BB79CE92CE3EA74C37C5D359";
        assert_eq!(normalize_identifier(lower), normalize_identifier(upper));
    }

    #[test]
    fn test_non_address_lowercases() {
        assert_eq!(normalize_identifier("ScamSniffer"), "scamsniffer");
        assert_eq!(normalize_identifier("MoonPay"), "moonpay");
        assert_eq!(normalize_identifier("already-lower"), "already-lower");
    }

    #[test]
    fn test_is_address() {
        assert!(is_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(is_address("0X5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED"));
        assert!(!is_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(!is_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAe"));
        assert!(!is_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed00"));
        assert!(!is_address("0xzzzeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(!is_address("scamsniffer"));
    }
}
