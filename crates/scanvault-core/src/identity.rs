//! Content identity
//!
//! Two independent digests are taken over the same bytes:
//!
//! - the **fingerprint** (SHA-256, lowercase hex) is the deduplication key;
//! - the **identifier** (MD5, URL-safe base64 without padding) is the opaque
//!   storage key used by the blob store and in client-facing URLs.
//!
//! Neither stands in for the other. Callers hashing a seekable upload must
//! rewind between the two computations so both cover the same byte range.

use std::io;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use md5::Md5;
use sha2::digest::Output;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// A digest together with the number of bytes it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hashed {
    pub value: String,
    pub len: u64,
}

async fn digest_stream<D, R>(mut reader: R) -> io::Result<(Output<D>, u64)>
where
    D: Digest,
    R: AsyncRead + Unpin,
{
    let mut hasher = D::new();
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut len = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        len += n as u64;
    }
    Ok((hasher.finalize(), len))
}

/// Compute the dedup fingerprint of everything `reader` yields.
///
/// Bound the reader (e.g. with [`AsyncReadExt::take`]) to hash a declared size.
pub async fn fingerprint<R: AsyncRead + Unpin>(reader: R) -> io::Result<Hashed> {
    let (digest, len) = digest_stream::<Sha256, _>(reader).await?;
    Ok(Hashed {
        value: hex::encode(digest),
        len,
    })
}

/// Compute the storage identifier of everything `reader` yields.
pub async fn identifier<R: AsyncRead + Unpin>(reader: R) -> io::Result<Hashed> {
    let (digest, len) = digest_stream::<Md5, _>(reader).await?;
    Ok(Hashed {
        value: URL_SAFE_NO_PAD.encode(digest),
        len,
    })
}

pub fn fingerprint_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn identifier_bytes(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Md5::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_known_vector() {
        assert_eq!(
            fingerprint_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_identifier_known_vector() {
        // md5("abc") = 900150983cd24fb0d6963f7d28e17f72
        assert_eq!(identifier_bytes(b"abc"), "kAFQmDzST7DWlj99KOF_cg");
    }

    #[test]
    fn test_identifier_is_url_safe_and_shorter() {
        let data = b"\xfb\xff\xfe some binary payload";
        let id = identifier_bytes(data);
        let fp = fingerprint_bytes(data);
        assert_eq!(id.len(), 22);
        assert_eq!(fp.len(), 64);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(id, fp);
    }

    #[test]
    fn test_single_byte_change_changes_both() {
        let a = b"hello world".to_vec();
        let mut b = a.clone();
        b[0] ^= 0x01;
        assert_ne!(fingerprint_bytes(&a), fingerprint_bytes(&b));
        assert_ne!(identifier_bytes(&a), identifier_bytes(&b));
    }

    #[tokio::test]
    async fn test_stream_matches_bytes() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        let fp = fingerprint(data.as_slice()).await.unwrap();
        let id = identifier(data.as_slice()).await.unwrap();

        assert_eq!(fp.value, fingerprint_bytes(&data));
        assert_eq!(id.value, identifier_bytes(&data));
        assert_eq!(fp.len, data.len() as u64);
        assert_eq!(id.len, data.len() as u64);
    }

    #[tokio::test]
    async fn test_stream_is_deterministic_and_bounded() {
        let data = b"0123456789trailing garbage".to_vec();

        let first = fingerprint(data.as_slice().take(10)).await.unwrap();
        let second = fingerprint(data.as_slice().take(10)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len, 10);
        assert_eq!(first.value, fingerprint_bytes(b"0123456789"));
    }
}
