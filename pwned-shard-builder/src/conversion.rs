use pwned_protocol::{HASH_LEN, PasswordHash};

/// Length of a SHA1 digest in hex.
pub const HASH_HEX_LEN: usize = HASH_LEN * 2;

/// Converts a hex ASCII character to its nibble value (0-15).
#[inline]
pub fn hex_to_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Decodes a 40-character hex digest, either case.
pub fn decode_hash(hex: &[u8]) -> Option<PasswordHash> {
    if hex.len() != HASH_HEX_LEN {
        return None;
    }

    let mut out = [0u8; HASH_LEN];
    for (byte, pair) in out.iter_mut().zip(hex.chunks_exact(2)) {
        *byte = (hex_to_nibble(pair[0])? << 4) | hex_to_nibble(pair[1])?;
    }

    Some(PasswordHash::from_bytes(out))
}

/// Parses one corpus line of the form `HEXHASH:count`.
///
/// The count is not stored, but must be present. A trailing `\r` is ignored.
pub fn parse_line(line: &str) -> Option<PasswordHash> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (hash, count) = line.split_once(':')?;
    if count.is_empty() || count.contains(':') {
        return None;
    }

    decode_hash(hash.as_bytes())
}
