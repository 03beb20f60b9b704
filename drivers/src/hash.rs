/*++

Licensed under the Apache-2.0 license.

File Name:

    hash.rs

Abstract:

    File contains the hash engine capability and the digest container used
    by the padding schemes.

--*/

use keyfort_error::{KeyfortError, KeyfortResult};
use zeroize::Zeroize;

/// Largest digest produced by any supported algorithm.
pub const MAX_DIGEST_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha256 | Self::Sha3_256 => 32,
            Self::Sha384 | Self::Sha3_384 => 48,
            Self::Sha512 | Self::Sha3_512 => 64,
        }
    }
}

/// Digest with its length.
#[derive(Clone, PartialEq, Eq, Zeroize)]
pub struct Digest {
    bytes: [u8; MAX_DIGEST_LEN],
    len: usize,
}

impl Digest {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for Digest {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Streaming hash capability.
///
/// A computation is `start`, any number of `update` calls, then `finish`.
/// Calling `update` or `finish` without a pending `start` fails with
/// `DRIVER_HASH_INVALID_STATE`.
pub trait HashEngine {
    fn start(&mut self, algo: HashAlgorithm) -> KeyfortResult<()>;

    fn update(&mut self, data: &[u8]) -> KeyfortResult<()>;

    /// Complete the computation. `out` must be exactly the digest length.
    fn finish(&mut self, out: &mut [u8]) -> KeyfortResult<()>;

    /// One shot digest of `data` into `out`.
    fn digest(&mut self, algo: HashAlgorithm, data: &[u8], out: &mut [u8]) -> KeyfortResult<()> {
        if out.len() != algo.digest_len() {
            return Err(KeyfortError::DRIVER_HASH_INVALID_DIGEST_LEN);
        }
        self.start(algo)?;
        self.update(data)?;
        self.finish(out)
    }

    /// One shot digest of the concatenation of `parts`.
    fn hash_parts(&mut self, algo: HashAlgorithm, parts: &[&[u8]]) -> KeyfortResult<Digest> {
        let len = algo.digest_len();
        let mut digest = Digest {
            bytes: [0u8; MAX_DIGEST_LEN],
            len,
        };
        self.start(algo)?;
        for part in parts {
            self.update(part)?;
        }
        self.finish(&mut digest.bytes[..len])?;
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::SoftHash;
    use hex_literal::hex;

    #[test]
    fn test_digest_len() {
        assert_eq!(HashAlgorithm::Sha256.digest_len(), 32);
        assert_eq!(HashAlgorithm::Sha3_384.digest_len(), 48);
        assert_eq!(HashAlgorithm::Sha512.digest_len(), 64);
    }

    #[test]
    fn test_sha256_abc() {
        let mut engine = SoftHash::default();
        let mut out = [0u8; 32];
        engine
            .digest(HashAlgorithm::Sha256, b"abc", &mut out)
            .unwrap();
        assert_eq!(
            out,
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_hash_parts_matches_digest() {
        let mut engine = SoftHash::default();
        let digest = engine
            .hash_parts(HashAlgorithm::Sha384, &[&b"ab"[..], &b""[..], &b"c"[..]])
            .unwrap();
        let mut out = [0u8; 48];
        engine
            .digest(HashAlgorithm::Sha384, b"abc", &mut out)
            .unwrap();
        assert_eq!(digest.as_bytes(), &out[..]);
        assert_eq!(digest.len(), 48);
    }

    #[test]
    fn test_digest_len_mismatch() {
        let mut engine = SoftHash::default();
        let mut out = [0u8; 32];
        assert_eq!(
            engine.digest(HashAlgorithm::Sha512, b"abc", &mut out),
            Err(KeyfortError::DRIVER_HASH_INVALID_DIGEST_LEN)
        );
    }

    #[test]
    fn test_update_without_start() {
        let mut engine = SoftHash::default();
        assert_eq!(
            engine.update(b"abc"),
            Err(KeyfortError::DRIVER_HASH_INVALID_STATE)
        );
    }
}
