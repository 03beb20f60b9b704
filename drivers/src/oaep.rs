/*++

Licensed under the Apache-2.0 license.

File Name:

    oaep.rs

Abstract:

    File contains the RSAES-OAEP encoding and decoding operations.

--*/

use crate::hash::{HashAlgorithm, HashEngine};
use crate::mgf::Mgf1;
use crate::random::RandomSource;
use crate::rsa::{ModExpEngine, RsaPrivateKey, RsaPublicKey, RSA_MAX_MODULUS_LEN};
use keyfort_cfi_lib::{cfi_launder, check_twice};
use keyfort_error::{KeyfortError, KeyfortResult};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use zeroize::{Zeroize, Zeroizing};

/// Reason a decode was rejected. Only reported through
/// [`OaepCodec::last_decode_fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OaepDecodeFault {
    /// Leading byte of the encoded message is not zero
    ByteMismatch,

    /// Label hash does not match
    DataCmp,

    /// Padding string is malformed or the separator is missing
    DbMismatch,

    /// Recovered message does not fit the output buffer
    InvalidMsgLen,
}

/// RSAES-OAEP codec.
pub struct OaepCodec<'a, E: HashEngine, M: ModExpEngine> {
    hash: &'a mut E,
    modexp: &'a mut M,
    algo: HashAlgorithm,
    last_fault: Option<OaepDecodeFault>,
}

impl<'a, E: HashEngine, M: ModExpEngine> OaepCodec<'a, E, M> {
    pub fn new(hash: &'a mut E, modexp: &'a mut M, algo: HashAlgorithm) -> Self {
        Self {
            hash,
            modexp,
            algo,
            last_fault: None,
        }
    }

    pub fn algo(&self) -> HashAlgorithm {
        self.algo
    }

    /// Fault class of the most recent rejected decode.
    pub fn last_decode_fault(&self) -> Option<OaepDecodeFault> {
        self.last_fault
    }

    /// Largest message that fits an encoded message of `em_len` bytes.
    pub fn max_msg_len(&self, em_len: usize) -> usize {
        em_len.saturating_sub(2 * self.algo.digest_len() + 2)
    }

    fn check_em_len(&self, em_len: usize) -> KeyfortResult<()> {
        if em_len < 2 * self.algo.digest_len() + 2 || em_len > RSA_MAX_MODULUS_LEN {
            return Err(KeyfortError::DRIVER_OAEP_INVALID_PARAM);
        }
        Ok(())
    }

    /// Encode `msg` into `em`. The encoded length is `em.len()`.
    ///
    /// # Arguments
    ///
    /// * `rng` - Source of the OAEP seed
    /// * `msg` - Message
    /// * `label` - Optional label
    /// * `em` - Encoded message output
    pub fn encode<R: RandomSource>(
        &mut self,
        rng: &mut R,
        msg: &[u8],
        label: Option<&[u8]>,
        em: &mut [u8],
    ) -> KeyfortResult<()> {
        self.check_em_len(em.len())?;
        if msg.len() > self.max_msg_len(em.len()) {
            return Err(KeyfortError::DRIVER_OAEP_INVALID_MSG_LEN);
        }

        let result = self.encode_internal(rng, msg, label, em);
        if result.is_err() {
            em.zeroize();
        }
        result
    }

    fn encode_internal<R: RandomSource>(
        &mut self,
        rng: &mut R,
        msg: &[u8],
        label: Option<&[u8]>,
        em: &mut [u8],
    ) -> KeyfortResult<()> {
        let hash_len = self.algo.digest_len();
        let l_hash = self.hash.hash_parts(self.algo, &[label.unwrap_or(&[])])?;

        em.fill(0);
        let (_, rest) = em.split_at_mut(1);
        let (seed, db) = rest.split_at_mut(hash_len);

        let db_len = db.len();
        db[..hash_len].copy_from_slice(l_hash.as_bytes());
        db[db_len - msg.len() - 1] = 0x01;
        db[db_len - msg.len()..].copy_from_slice(msg);

        rng.fill_bytes(seed)?;

        let mgf = Mgf1::new(self.algo);
        mgf.xor_mask(&mut *self.hash, seed, db)?;
        mgf.xor_mask(&mut *self.hash, db, seed)?;
        Ok(())
    }

    /// Decode `em` and copy the recovered message into `msg`.
    ///
    /// Every malformed input is reported as `DRIVER_OAEP_DECODE_FAILURE`.
    /// `msg` is zeroized on every error.
    ///
    /// # Returns
    ///
    /// * `usize` - Recovered message length
    pub fn decode(
        &mut self,
        em: &[u8],
        label: Option<&[u8]>,
        msg: &mut [u8],
    ) -> KeyfortResult<usize> {
        self.check_em_len(em.len())?;
        self.last_fault = None;

        let result = match self.decode_internal(em, label, msg) {
            Ok(Ok(len)) => Ok(len),
            Ok(Err(fault)) => {
                self.last_fault = Some(fault);
                Err(KeyfortError::DRIVER_OAEP_DECODE_FAILURE)
            }
            Err(err) => Err(err),
        };
        if result.is_err() {
            msg.zeroize();
        }
        result
    }

    fn decode_internal(
        &mut self,
        em: &[u8],
        label: Option<&[u8]>,
        msg: &mut [u8],
    ) -> KeyfortResult<Result<usize, OaepDecodeFault>> {
        let hash_len = self.algo.digest_len();
        let l_hash = self.hash.hash_parts(self.algo, &[label.unwrap_or(&[])])?;

        let mut buf = Zeroizing::new([0u8; RSA_MAX_MODULUS_LEN]);
        let buf = &mut buf[..em.len()];
        buf.copy_from_slice(em);

        let (lead, rest) = buf.split_at_mut(1);
        let (seed, db) = rest.split_at_mut(hash_len);

        let mgf = Mgf1::new(self.algo);
        mgf.xor_mask(&mut *self.hash, db, seed)?;
        mgf.xor_mask(&mut *self.hash, seed, db)?;

        let lead_ok = lead[0].ct_eq(&0);
        let l_hash_ok = check_twice(|| Ok(bool::from(l_hash.as_bytes().ct_eq(&db[..hash_len]))))?;

        // Scan the whole padding string without early exit.
        let mut found = Choice::from(0);
        let mut bad = Choice::from(0);
        let mut sep_idx = 0u32;
        for (idx, byte) in db[hash_len..].iter().enumerate() {
            let is_zero = byte.ct_eq(&0);
            let is_one = byte.ct_eq(&1);
            sep_idx.conditional_assign(&(idx as u32), !found & is_one);
            bad |= !found & !is_zero & !is_one;
            found |= is_one;
        }
        bad |= !found;

        if !bool::from(cfi_launder(lead_ok)) {
            return Ok(Err(OaepDecodeFault::ByteMismatch));
        }
        if !cfi_launder(l_hash_ok) {
            return Ok(Err(OaepDecodeFault::DataCmp));
        }
        if bool::from(cfi_launder(bad)) {
            return Ok(Err(OaepDecodeFault::DbMismatch));
        }

        let msg_start = hash_len + sep_idx as usize + 1;
        let msg_len = db.len() - msg_start;
        if msg_len > msg.len() {
            return Ok(Err(OaepDecodeFault::InvalidMsgLen));
        }
        msg[..msg_len].copy_from_slice(&db[msg_start..]);
        Ok(Ok(msg_len))
    }

    /// Encrypt `msg` under `key`.
    ///
    /// # Returns
    ///
    /// * `usize` - Ciphertext length, equal to the modulus length
    pub fn encrypt<R: RandomSource>(
        &mut self,
        rng: &mut R,
        key: &RsaPublicKey,
        msg: &[u8],
        label: Option<&[u8]>,
        ciphertext: &mut [u8],
    ) -> KeyfortResult<usize> {
        let k = key.modulus_len();
        if ciphertext.len() < k {
            return Err(KeyfortError::DRIVER_OAEP_INVALID_PARAM);
        }

        let mut em = Zeroizing::new([0u8; RSA_MAX_MODULUS_LEN]);
        self.encode(rng, msg, label, &mut em[..k])?;
        self.modexp.public_exp(key, &em[..k], &mut ciphertext[..k])?;
        Ok(k)
    }

    /// Decrypt `ciphertext` with `key` into `msg`. `msg` is zeroized on
    /// every error.
    ///
    /// # Returns
    ///
    /// * `usize` - Recovered message length
    pub fn decrypt(
        &mut self,
        key: &RsaPrivateKey,
        ciphertext: &[u8],
        label: Option<&[u8]>,
        msg: &mut [u8],
    ) -> KeyfortResult<usize> {
        let k = key.modulus_len();
        if ciphertext.len() != k {
            return Err(KeyfortError::DRIVER_OAEP_INVALID_PARAM);
        }

        let mut em = Zeroizing::new([0u8; RSA_MAX_MODULUS_LEN]);
        let result = match self.modexp.private_exp(key, ciphertext, &mut em[..k]) {
            Ok(()) => self.decode(&em[..k], label, msg),
            Err(err) => Err(err),
        };
        if result.is_err() {
            msg.zeroize();
        }
        result
    }
}
