/*++

Licensed under the Apache-2.0 license.

File Name:

    pss.rs

Abstract:

    File contains the RSASSA-PSS signature generation and verification
    operations.

--*/

use crate::hash::{HashAlgorithm, HashEngine, MAX_DIGEST_LEN};
use crate::mgf::Mgf1;
use crate::random::RandomSource;
use crate::rsa::{ModExpEngine, RsaPrivateKey, RsaPublicKey, RSA_MAX_MODULUS_LEN};
use keyfort_cfi_lib::check_twice_eq;
use keyfort_error::{KeyfortError, KeyfortResult};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

const PSS_TRAILER: u8 = 0xBC;
const PSS_PREFIX_ZEROS: [u8; 8] = [0u8; 8];

/// RSASSA-PSS codec.
///
/// Moduli are full length, so the encoded message is as long as the
/// modulus and only its top bit is cleared.
pub struct PssCodec<'a, E: HashEngine, M: ModExpEngine> {
    hash: &'a mut E,
    modexp: &'a mut M,
    algo: HashAlgorithm,
}

impl<'a, E: HashEngine, M: ModExpEngine> PssCodec<'a, E, M> {
    pub fn new(hash: &'a mut E, modexp: &'a mut M, algo: HashAlgorithm) -> Self {
        Self { hash, modexp, algo }
    }

    fn check_params(&self, em_len: usize, msg_hash: &[u8], salt_len: usize) -> KeyfortResult<()> {
        let hash_len = self.algo.digest_len();
        if msg_hash.len() != hash_len {
            return Err(KeyfortError::DRIVER_PSS_INVALID_PARAM);
        }
        if salt_len > hash_len {
            return Err(KeyfortError::DRIVER_PSS_INVALID_SALT_LEN);
        }
        if em_len < hash_len + salt_len + 2 {
            return Err(KeyfortError::DRIVER_PSS_INVALID_LEN);
        }
        Ok(())
    }

    /// Sign the message digest `msg_hash`.
    ///
    /// # Arguments
    ///
    /// * `rng` - Salt source
    /// * `key` - Signing key
    /// * `msg_hash` - Message digest, one digest length long
    /// * `salt_len` - Salt length, at most one digest length
    /// * `signature` - Signature output, at least the modulus length
    ///
    /// # Returns
    ///
    /// * `usize` - Signature length
    pub fn sign<R: RandomSource>(
        &mut self,
        rng: &mut R,
        key: &RsaPrivateKey,
        msg_hash: &[u8],
        salt_len: usize,
        signature: &mut [u8],
    ) -> KeyfortResult<usize> {
        let k = key.modulus_len();
        self.check_params(k, msg_hash, salt_len)?;
        if signature.len() < k {
            return Err(KeyfortError::DRIVER_PSS_INVALID_LEN);
        }

        let hash_len = self.algo.digest_len();
        let mut salt = Zeroizing::new([0u8; MAX_DIGEST_LEN]);
        rng.fill_bytes(&mut salt[..salt_len])?;

        let h = self
            .hash
            .hash_parts(self.algo, &[&PSS_PREFIX_ZEROS[..], msg_hash, &salt[..salt_len]])?;

        let mut em = Zeroizing::new([0u8; RSA_MAX_MODULUS_LEN]);
        let em = &mut em[..k];
        let db_len = k - hash_len - 1;
        let (db, rest) = em.split_at_mut(db_len);
        db[db_len - salt_len - 1] = 0x01;
        db[db_len - salt_len..].copy_from_slice(&salt[..salt_len]);
        Mgf1::new(self.algo).xor_mask(&mut *self.hash, h.as_bytes(), db)?;
        db[0] &= 0x7F;
        rest[..hash_len].copy_from_slice(h.as_bytes());
        rest[hash_len] = PSS_TRAILER;

        self.modexp.private_exp(key, em, &mut signature[..k])?;
        Ok(k)
    }

    /// Verify `signature` over the message digest `msg_hash`.
    ///
    /// # Arguments
    ///
    /// * `key` - Verification key
    /// * `msg_hash` - Message digest, one digest length long
    /// * `salt_len` - Salt length used when signing
    /// * `signature` - Signature, exactly the modulus length
    pub fn verify(
        &mut self,
        key: &RsaPublicKey,
        msg_hash: &[u8],
        salt_len: usize,
        signature: &[u8],
    ) -> KeyfortResult<()> {
        let k = key.modulus_len();
        self.check_params(k, msg_hash, salt_len)?;
        if signature.len() != k {
            return Err(KeyfortError::DRIVER_PSS_INVALID_LEN);
        }

        let hash_len = self.algo.digest_len();
        let mut em = Zeroizing::new([0u8; RSA_MAX_MODULUS_LEN]);
        let em = &mut em[..k];
        self.modexp.public_exp(key, signature, em)?;

        if em[k - 1] != PSS_TRAILER || em[0] & 0x80 != 0 {
            return Err(KeyfortError::DRIVER_PSS_VERIFICATION_FAILURE);
        }

        let db_len = k - hash_len - 1;
        let (db, rest) = em.split_at_mut(db_len);
        let h = &rest[..hash_len];
        Mgf1::new(self.algo).xor_mask(&mut *self.hash, h, db)?;
        db[0] &= 0x7F;

        let sep = db_len - salt_len - 1;
        if db[..sep].iter().any(|&b| b != 0) || db[sep] != 0x01 {
            return Err(KeyfortError::DRIVER_PSS_VERIFICATION_FAILURE);
        }

        let salt = &db[sep + 1..];
        let h_prime = self
            .hash
            .hash_parts(self.algo, &[&PSS_PREFIX_ZEROS[..], msg_hash, salt])?;

        check_twice_eq(KeyfortError::DRIVER_PSS_VERIFICATION_FAILURE, || {
            bool::from(h_prime.as_bytes().ct_eq(h))
        })
    }
}
