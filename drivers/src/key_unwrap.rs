/*++

Licensed under the Apache-2.0 license.

File Name:

    key_unwrap.rs

Abstract:

    File contains the key unwrap flow that recovers an RSA-OAEP wrapped
    ephemeral AES key, decrypts the key payload with it and stores the
    result in the key store.

--*/

use crate::block_cipher::BlockCipherEngine;
use crate::cprintln;
use crate::hash::{HashAlgorithm, HashEngine};
use crate::key_store::{KeyMetaData, KeyStore};
use crate::oaep::OaepCodec;
use crate::printer::HexWord;
use crate::rsa::{ModExpEngine, RsaPrivateKey, RSA_MAX_MODULUS_LEN};
use keyfort_cfi_lib::{cfi_assert, check_twice_eq};
use keyfort_error::{KeyfortError, KeyfortResult};
use zerocopy::FromBytes;
use zeroize::{Zeroize, Zeroizing};

/// Serialized metadata trailing every wrapped key record.
pub const WRAPPED_KEY_METADATA_LEN: usize = core::mem::size_of::<KeyMetaData>();

/// Parsed view of a wrapped key record.
///
/// ```text
/// [ RSA-OAEP ciphertext (modulus length) | AES-ECB payload | metadata (16) ]
/// ```
#[derive(Debug)]
pub struct WrappedKeyRecord<'a> {
    pub wrapped_key: &'a [u8],
    pub payload: &'a [u8],
    pub metadata: KeyMetaData,
}

impl<'a> WrappedKeyRecord<'a> {
    /// Split `record` for a wrapping key with a `modulus_len` byte modulus.
    pub fn from_bytes(record: &'a [u8], modulus_len: usize) -> KeyfortResult<Self> {
        if record.len() < WRAPPED_KEY_METADATA_LEN {
            return Err(KeyfortError::DRIVER_KEY_UNWRAP_INVALID_SIZE);
        }
        let (wrapped, meta) = record.split_at(record.len() - WRAPPED_KEY_METADATA_LEN);
        if wrapped.len() <= modulus_len {
            return Err(KeyfortError::DRIVER_KEY_UNWRAP_INVALID_SIZE);
        }
        let metadata =
            KeyMetaData::read_from(meta).ok_or(KeyfortError::DRIVER_KEY_UNWRAP_INVALID_SIZE)?;

        let (wrapped_key, payload) = wrapped.split_at(modulus_len);
        match payload.len() {
            16 | 32 => Ok(Self {
                wrapped_key,
                payload,
                metadata,
            }),
            _ => Err(KeyfortError::DRIVER_KEY_UNWRAP_UNSUPPORTED_KEY_SIZE),
        }
    }
}

/// Key unwrap engine.
pub struct KeyUnwrap<'a, E: HashEngine, M: ModExpEngine, C: BlockCipherEngine> {
    hash: &'a mut E,
    modexp: &'a mut M,
    cipher: &'a mut C,
    algo: HashAlgorithm,
}

impl<'a, E: HashEngine, M: ModExpEngine, C: BlockCipherEngine> KeyUnwrap<'a, E, M, C> {
    /// Create a key unwrap engine.
    ///
    /// # Arguments
    ///
    /// * `hash` - Hash engine for OAEP
    /// * `modexp` - Modular exponentiation engine for OAEP
    /// * `cipher` - AES engine for the payload
    /// * `algo` - OAEP hash algorithm
    pub fn new(hash: &'a mut E, modexp: &'a mut M, cipher: &'a mut C, algo: HashAlgorithm) -> Self {
        Self {
            hash,
            modexp,
            cipher,
            algo,
        }
    }

    /// Unwrap `record` into a free slot of `store`.
    ///
    /// # Arguments
    ///
    /// * `store` - Destination key store
    /// * `record` - Wrapped key record
    /// * `key` - RSA key that wrapped the ephemeral key
    /// * `label` - Optional OAEP label
    ///
    /// # Returns
    ///
    /// * `usize` - Index of the slot now holding the key
    pub fn unwrap(
        &mut self,
        store: &mut KeyStore,
        record: &[u8],
        key: &RsaPrivateKey,
        label: Option<&[u8]>,
    ) -> KeyfortResult<usize> {
        let result = self.unwrap_internal(store, record, key, label);
        match result {
            Ok(idx) => cprintln!("[key-unwrap] Slot {} loaded", idx as u32),
            Err(err) => cprintln!("[key-unwrap] Failed 0x{}", HexWord(u32::from(err))),
        }
        result
    }

    fn unwrap_internal(
        &mut self,
        store: &mut KeyStore,
        record: &[u8],
        key: &RsaPrivateKey,
        label: Option<&[u8]>,
    ) -> KeyfortResult<usize> {
        let record = WrappedKeyRecord::from_bytes(record, key.modulus_len())?;
        let idx = store.find_free_slot()?;
        check_twice_eq(KeyfortError::DRIVER_KEY_UNWRAP_SIZE_MISMATCH, || {
            record.metadata.key_size as usize == record.payload.len()
        })?;

        // Sized for any message the modulus can carry so that an ephemeral key
        // of the wrong length reaches the length check below.
        let mut ephemeral = Zeroizing::new([0u8; RSA_MAX_MODULUS_LEN]);
        let len = OaepCodec::new(&mut *self.hash, &mut *self.modexp, self.algo).decrypt(
            key,
            record.wrapped_key,
            label,
            &mut ephemeral[..],
        )?;
        check_twice_eq(KeyfortError::DRIVER_KEY_UNWRAP_SIZE_MISMATCH, || {
            len == record.payload.len()
        })?;

        let slot = store.free_slot_mut(idx)?;
        if let Err(err) =
            self.cipher
                .ecb_decrypt(&ephemeral[..len], record.payload, &mut slot.secret[..len])
        {
            slot.zeroize();
            return Err(err);
        }
        slot.metadata = record.metadata;
        store.mark_occupied(idx)?;
        cfi_assert!(store.is_occupied(idx));
        Ok(idx)
    }
}
