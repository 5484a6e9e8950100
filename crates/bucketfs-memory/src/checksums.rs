//! ETag computation.

use md5::{Digest, Md5};

/// Hex-encoded MD5 digest of `data`.
pub(crate) fn compute_md5(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Quoted ETag of a single-part object.
pub(crate) fn compute_etag(data: &[u8]) -> String {
    format!("\"{}\"", compute_md5(data))
}

/// Composite ETag of a multipart object: MD5 of the concatenated part
/// digests, suffixed with the part count.
pub(crate) fn compute_multipart_etag(part_md5_hexes: &[String]) -> String {
    let mut combined = Vec::with_capacity(part_md5_hexes.len() * 16);
    for hex_str in part_md5_hexes {
        if let Ok(bytes) = hex::decode(hex_str) {
            combined.extend_from_slice(&bytes);
        }
    }
    format!(
        "\"{}-{}\"",
        hex::encode(Md5::digest(&combined)),
        part_md5_hexes.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_compute_empty_etag() {
        assert_eq!(compute_etag(b""), "\"d41d8cd98f00b204e9800998ecf8427e\"");
    }

    #[test]
    fn test_should_suffix_multipart_etag_with_part_count() {
        let parts = vec![compute_md5(b"hello"), compute_md5(b"world")];
        let etag = compute_multipart_etag(&parts);
        assert!(etag.starts_with('"'));
        assert!(etag.ends_with("-2\""));
        assert_eq!(etag.len(), 32 + 2 + 2);
    }
}
