use bytes::Bytes;

/// Size of one stored record: a full SHA1 digest.
pub const RECORD_SIZE: usize = 20;

/// Extension of shard files on disk.
pub const SHARD_EXTENSION: &str = ".bin";

/// Shard bytes that do not split into whole records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("shard length {len} is not a multiple of {RECORD_SIZE}")]
pub struct CorruptShard {
    pub len: usize,
}

/// Splits shard bytes into records, in file order.
///
/// Records are cheap slices into `buf`; nothing is copied. Record contents
/// are not checked against the shard's prefix.
pub fn decode_records(buf: Bytes) -> Result<Vec<Bytes>, CorruptShard> {
    if buf.len() % RECORD_SIZE != 0 {
        return Err(CorruptShard { len: buf.len() });
    }

    let record_count = buf.len() / RECORD_SIZE;
    let records = (0..record_count)
        .map(|i| buf.slice(i * RECORD_SIZE..(i + 1) * RECORD_SIZE))
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fill: u8) -> [u8; RECORD_SIZE] {
        [fill; RECORD_SIZE]
    }

    #[test]
    fn test_decode_in_file_order() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&record(0xFF));
        buf.extend_from_slice(&record(0x00));
        buf.extend_from_slice(&record(0x7A));

        let records = decode_records(Bytes::from(buf)).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].as_ref(), &record(0xFF));
        assert_eq!(records[1].as_ref(), &record(0x00));
        assert_eq!(records[2].as_ref(), &record(0x7A));
    }

    #[test]
    fn test_empty_shard() {
        assert!(decode_records(Bytes::new()).unwrap().is_empty());
    }

    #[test]
    fn test_partial_record_is_corrupt() {
        let buf = Bytes::from(vec![0u8; RECORD_SIZE * 2 + 7]);
        assert_eq!(decode_records(buf), Err(CorruptShard { len: 47 }));
    }

    #[test]
    fn test_short_shard_is_corrupt() {
        let buf = Bytes::from_static(b"abcdef");
        assert_eq!(decode_records(buf), Err(CorruptShard { len: 6 }));
    }
}
