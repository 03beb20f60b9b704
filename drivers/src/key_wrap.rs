/*++

Licensed under the Apache-2.0 license.

File Name:

    key_wrap.rs

Abstract:

    File contains the key wrap flow that protects an AES key under an RSA
    public key: a fresh ephemeral AES key is RSA-OAEP encrypted and the
    target key is AES-ECB encrypted under it.

--*/

use crate::block_cipher::{AesKeySize, BlockCipherEngine};
use crate::cprintln;
use crate::hash::{HashAlgorithm, HashEngine};
use crate::key_store::{KeyMetaData, KEY_SLOT_SECRET_LEN};
use crate::key_unwrap::WRAPPED_KEY_METADATA_LEN;
use crate::oaep::OaepCodec;
use crate::printer::HexWord;
use crate::random::RandomSource;
use crate::rsa::{ModExpEngine, RsaPublicKey};
use keyfort_error::{KeyfortError, KeyfortResult};
use zerocopy::AsBytes;
use zeroize::{Zeroize, Zeroizing};

/// Key wrap engine.
pub struct KeyWrap<'a, E: HashEngine, M: ModExpEngine, C: BlockCipherEngine> {
    hash: &'a mut E,
    modexp: &'a mut M,
    cipher: &'a mut C,
    algo: HashAlgorithm,
}

impl<'a, E: HashEngine, M: ModExpEngine, C: BlockCipherEngine> KeyWrap<'a, E, M, C> {
    pub fn new(hash: &'a mut E, modexp: &'a mut M, cipher: &'a mut C, algo: HashAlgorithm) -> Self {
        Self {
            hash,
            modexp,
            cipher,
            algo,
        }
    }

    /// Length of the record produced for a `key_len` byte key under a
    /// `modulus_len` byte wrapping key.
    pub const fn record_len(modulus_len: usize, key_len: usize) -> usize {
        modulus_len + key_len + WRAPPED_KEY_METADATA_LEN
    }

    /// Wrap `key` into `record`.
    ///
    /// The ephemeral AES key has the same size as `key` and is drawn from
    /// `rng`. It never leaves this call in the clear.
    ///
    /// # Arguments
    ///
    /// * `rng` - Source of the ephemeral key and the OAEP seed
    /// * `pub_key` - RSA key of the receiver
    /// * `key` - 16 or 32 byte AES key to protect
    /// * `metadata` - Metadata stored alongside the key
    /// * `label` - Optional OAEP label
    /// * `record` - Output wrapped key record
    ///
    /// # Returns
    ///
    /// * `usize` - Record length
    pub fn wrap<R: RandomSource>(
        &mut self,
        rng: &mut R,
        pub_key: &RsaPublicKey,
        key: &[u8],
        metadata: &KeyMetaData,
        label: Option<&[u8]>,
        record: &mut [u8],
    ) -> KeyfortResult<usize> {
        let result = self.wrap_internal(rng, pub_key, key, metadata, label, record);
        match result {
            Ok(_) => cprintln!("[key-wrap] Wrapped {} byte key", key.len() as u32),
            Err(err) => {
                record.zeroize();
                cprintln!("[key-wrap] Failed 0x{}", HexWord(u32::from(err)));
            }
        }
        result
    }

    fn wrap_internal<R: RandomSource>(
        &mut self,
        rng: &mut R,
        pub_key: &RsaPublicKey,
        key: &[u8],
        metadata: &KeyMetaData,
        label: Option<&[u8]>,
        record: &mut [u8],
    ) -> KeyfortResult<usize> {
        let key_len = AesKeySize::from_len(key.len())
            .map_err(|_| KeyfortError::DRIVER_KEY_WRAP_UNSUPPORTED_KEY_SIZE)?
            .key_len();
        if metadata.key_size as usize != key_len {
            return Err(KeyfortError::DRIVER_KEY_WRAP_SIZE_MISMATCH);
        }
        let modulus_len = pub_key.modulus_len();
        let record_len = Self::record_len(modulus_len, key_len);
        if record.len() < record_len {
            return Err(KeyfortError::DRIVER_KEY_WRAP_INVALID_OUTPUT_LEN);
        }

        let (wrapped_key, rest) = record[..record_len].split_at_mut(modulus_len);
        let (payload, meta) = rest.split_at_mut(key_len);

        let mut ephemeral = Zeroizing::new([0u8; KEY_SLOT_SECRET_LEN]);
        let ephemeral = &mut ephemeral[..key_len];
        rng.fill_bytes(ephemeral)?;

        OaepCodec::new(&mut *self.hash, &mut *self.modexp, self.algo).encrypt(
            rng,
            pub_key,
            ephemeral,
            label,
            wrapped_key,
        )?;
        self.cipher.ecb_encrypt(ephemeral, key, payload)?;
        meta.copy_from_slice(metadata.as_bytes());
        Ok(record_len)
    }
}
