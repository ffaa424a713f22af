use std::fmt;

use sha1::{Digest, Sha1};

use crate::{HASH_LEN, PREFIX_LEN, PREFIX_BYTES};

/// Lowercase hex lookup table. Prefixes are lowercase on the wire.
pub const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// SHA1 digest of a password.
///
/// `Debug` only shows the prefix, so a hash that ends up in a log line leaks
/// no more than the lookup itself does.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash([u8; HASH_LEN]);

impl PasswordHash {
    pub fn of(password: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(password.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Digest bytes not covered by the prefix.
    pub fn suffix(&self) -> &[u8] {
        &self.0[PREFIX_BYTES..]
    }

    /// First [`PREFIX_LEN`] hex characters of the digest.
    pub fn prefix(&self) -> Prefix {
        let hash = &self.0;
        let mut prefix_hex = [0u8; PREFIX_LEN];

        prefix_hex[0] = HEX_CHARS[(hash[0] >> 4) as usize];
        prefix_hex[1] = HEX_CHARS[(hash[0] & 0x0f) as usize];
        prefix_hex[2] = HEX_CHARS[(hash[1] >> 4) as usize];
        prefix_hex[3] = HEX_CHARS[(hash[1] & 0x0f) as usize];
        prefix_hex[4] = HEX_CHARS[(hash[2] >> 4) as usize];

        Prefix(prefix_hex)
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordHash({}..)", self.prefix())
    }
}

/// Lookup key derived from a [`PasswordHash`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix([u8; PREFIX_LEN]);

impl Prefix {
    pub fn as_str(&self) -> &str {
        // SAFETY: built only from HEX_CHARS, which is ASCII.
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prefix({})", self.as_str())
    }
}

/// Lowercase hex encoding.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX_CHARS[(b >> 4) as usize] as char);
        out.push(HEX_CHARS[(b & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    // password123 -> SHA1: CBFDAC6008F9CAB4083784CBD1874F76618D2A97
    const PASSWORD123: [u8; HASH_LEN] = hex!("CBFDAC6008F9CAB4083784CBD1874F76618D2A97");

    #[test]
    fn test_sha1_digest() {
        assert_eq!(PasswordHash::of("password123").as_bytes(), &PASSWORD123);
    }

    #[test]
    fn test_prefix_is_lowercase_hex() {
        let hash = PasswordHash::of("password123");
        assert_eq!(hash.prefix().as_str(), "cbfda");
        assert_eq!(hash.prefix().to_string(), "cbfda");
    }

    #[test]
    fn test_prefix_of_extremes() {
        assert_eq!(PasswordHash::from_bytes([0x00; HASH_LEN]).prefix().as_str(), "00000");
        assert_eq!(PasswordHash::from_bytes([0xFF; HASH_LEN]).prefix().as_str(), "fffff");
    }

    #[test]
    fn test_prefix_matches_hex_encoding() {
        let hash = PasswordHash::of("correct horse battery staple");
        assert_eq!(hash.prefix().as_str(), &to_hex(hash.as_bytes())[..PREFIX_LEN]);
    }

    #[test]
    fn test_suffix_drops_prefix_bytes() {
        let hash = PasswordHash::from_bytes(PASSWORD123);
        assert_eq!(hash.suffix().len(), 17);
        assert_eq!(hash.suffix(), &PASSWORD123[3..]);
    }

    #[test]
    fn test_debug_hides_digest() {
        let rendered = format!("{:?}", PasswordHash::of("password123"));
        assert_eq!(rendered, "PasswordHash(cbfda..)");
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x00, 0x0f, 0xab, 0xff]), "000fabff");
        assert_eq!(to_hex(&[]), "");
    }
}
