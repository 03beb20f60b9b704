/*++

Licensed under the Apache-2.0 license.

File Name:

    test_util.rs

Abstract:

    File contains the scripted hardware fakes and software engines shared by
    the driver unit tests.

--*/

use crate::block_cipher::{BlockCipherEngine, AES_BLOCK_LEN};
use crate::hash::{HashAlgorithm, HashEngine};
use crate::random::RandomSource;
use crate::rsa::{ModExpEngine, RsaPrivateKey, RsaPublicKey};
use crate::trng_hw::{
    HardwareEntropySource, SettleDelay, TrngConf0, TrngConf1, TrngCtrl, TrngStatus,
    TRNG_BURST_SIZE_IN_WORDS, TRNG_PERS_STRING_LEN_IN_WORDS,
};
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256, Block};
use keyfort_error::{KeyfortError, KeyfortResult};
use sha2::Digest;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn mix(state: u64, value: u64) -> u64 {
    (state ^ value).wrapping_mul(FNV_PRIME).rotate_left(17)
}

/// Scripted TRNG core.
///
/// Output words are a deterministic function of the seed bits and the
/// personalization string loaded by the last reseed, so two fakes driven
/// through the same DRNG sequence produce the same stream.
#[derive(Default)]
pub struct FakeTrngHw {
    pub ctrl: TrngCtrl,
    pub conf0: TrngConf0,
    pub conf1: TrngConf1,
    pub pers: [u32; TRNG_PERS_STRING_LEN_IN_WORDS],
    pub seed_bits: Vec<u32>,
    pub ctrl_writes: Vec<TrngCtrl>,
    pub delays: Vec<SettleDelay>,
    pub outputs: Vec<u32>,
    pub core_reset: bool,
    pub oscillators: bool,
    pub reseeds: usize,
    pub noise_reseeds: usize,
    pub generates: usize,

    /// Raise CERTF on the status register.
    pub certf: bool,

    /// Raise DTF on the status register.
    pub dtf: bool,

    /// Never report reseed completion.
    pub hang_reseed: bool,

    /// Never fill the output queue.
    pub hang_generate: bool,

    state: u64,
}

impl FakeTrngHw {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct the seed bytes shifted in since the last reseed.
    pub fn seed_bytes(&self) -> Vec<u8> {
        self.seed_bits
            .chunks(8)
            .map(|bits| bits.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
            .collect()
    }

    pub fn delay_count(&self, delay: SettleDelay) -> usize {
        self.delays.iter().filter(|&&d| d == delay).count()
    }

    fn start_reseed(&mut self, ctrl: TrngCtrl) {
        self.reseeds += 1;
        self.seed_bits.clear();
        self.state = FNV_OFFSET;
        if !ctrl.contains(TrngCtrl::TSTMODE) {
            self.noise_reseeds += 1;
            self.state = mix(self.state, self.noise_reseeds as u64);
        }
        if !ctrl.contains(TrngCtrl::PERSODISABLE) {
            for word in self.pers {
                self.state = mix(self.state, u64::from(word));
            }
        }
    }

    fn next_word(&mut self) -> u32 {
        let mut x = self.state | 1;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }
}

impl HardwareEntropySource for FakeTrngHw {
    fn read_ctrl(&mut self) -> TrngCtrl {
        self.ctrl
    }

    fn write_ctrl(&mut self, ctrl: TrngCtrl) {
        let started =
            ctrl.contains(TrngCtrl::PRNGSTART) && !self.ctrl.contains(TrngCtrl::PRNGSTART);
        if started {
            if ctrl.contains(TrngCtrl::PRNGMODE) {
                self.generates += 1;
            } else {
                self.start_reseed(ctrl);
            }
        }
        self.ctrl = ctrl;
        self.ctrl_writes.push(ctrl);
    }

    fn read_status(&mut self) -> TrngStatus {
        let mut status = TrngStatus(0);
        let started = self.ctrl.contains(TrngCtrl::PRNGSTART);
        let generating = self.ctrl.contains(TrngCtrl::PRNGMODE)
            || self.ctrl.contains(TrngCtrl::EUMODE);
        status.set_done(started && !generating && !self.hang_reseed);
        if started && generating && !self.hang_generate {
            status.set_qcnt(TRNG_BURST_SIZE_IN_WORDS as u8);
        }
        status.set_certf(self.certf);
        status.set_dtf(self.dtf);
        status
    }

    fn read_conf0(&mut self) -> TrngConf0 {
        self.conf0
    }

    fn write_conf0(&mut self, conf: TrngConf0) {
        self.conf0 = conf;
    }

    fn read_conf1(&mut self) -> TrngConf1 {
        self.conf1
    }

    fn write_conf1(&mut self, conf: TrngConf1) {
        self.conf1 = conf;
    }

    fn write_test_bit(&mut self, bit: u32) {
        self.seed_bits.push(bit);
        self.state = mix(self.state, u64::from(bit));
    }

    fn write_pers_string(&mut self, index: usize, word: u32) {
        self.pers[index] = word;
    }

    fn read_core_output(&mut self) -> u32 {
        let word = self.next_word();
        self.outputs.push(word);
        word
    }

    fn set_core_reset(&mut self, asserted: bool) {
        self.core_reset = asserted;
    }

    fn set_oscillators(&mut self, enabled: bool) {
        self.oscillators = enabled;
    }

    fn delay(&mut self, delay: SettleDelay) {
        self.delays.push(delay);
    }
}

enum HashContext {
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
    Sha3_256(sha3::Sha3_256),
    Sha3_384(sha3::Sha3_384),
    Sha3_512(sha3::Sha3_512),
}

/// Software hash engine.
#[derive(Default)]
pub struct SoftHash {
    /// Fail every computation with `DRIVER_HASH_FAILURE`.
    pub fail: bool,

    ctx: Option<(HashAlgorithm, HashContext)>,
}

impl HashEngine for SoftHash {
    fn start(&mut self, algo: HashAlgorithm) -> KeyfortResult<()> {
        if self.fail {
            return Err(KeyfortError::DRIVER_HASH_FAILURE);
        }
        let ctx = match algo {
            HashAlgorithm::Sha256 => HashContext::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Sha384 => HashContext::Sha384(sha2::Sha384::new()),
            HashAlgorithm::Sha512 => HashContext::Sha512(sha2::Sha512::new()),
            HashAlgorithm::Sha3_256 => HashContext::Sha3_256(sha3::Sha3_256::new()),
            HashAlgorithm::Sha3_384 => HashContext::Sha3_384(sha3::Sha3_384::new()),
            HashAlgorithm::Sha3_512 => HashContext::Sha3_512(sha3::Sha3_512::new()),
        };
        self.ctx = Some((algo, ctx));
        Ok(())
    }

    fn update(&mut self, data: &[u8]) -> KeyfortResult<()> {
        match &mut self.ctx {
            Some((_, HashContext::Sha256(h))) => h.update(data),
            Some((_, HashContext::Sha384(h))) => h.update(data),
            Some((_, HashContext::Sha512(h))) => h.update(data),
            Some((_, HashContext::Sha3_256(h))) => h.update(data),
            Some((_, HashContext::Sha3_384(h))) => h.update(data),
            Some((_, HashContext::Sha3_512(h))) => h.update(data),
            None => return Err(KeyfortError::DRIVER_HASH_INVALID_STATE),
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut [u8]) -> KeyfortResult<()> {
        let (algo, ctx) = self
            .ctx
            .take()
            .ok_or(KeyfortError::DRIVER_HASH_INVALID_STATE)?;
        if out.len() != algo.digest_len() {
            return Err(KeyfortError::DRIVER_HASH_INVALID_DIGEST_LEN);
        }
        match ctx {
            HashContext::Sha256(h) => out.copy_from_slice(&h.finalize()),
            HashContext::Sha384(h) => out.copy_from_slice(&h.finalize()),
            HashContext::Sha512(h) => out.copy_from_slice(&h.finalize()),
            HashContext::Sha3_256(h) => out.copy_from_slice(&h.finalize()),
            HashContext::Sha3_384(h) => out.copy_from_slice(&h.finalize()),
            HashContext::Sha3_512(h) => out.copy_from_slice(&h.finalize()),
        }
        Ok(())
    }
}

enum AesKey {
    Aes128(Aes128),
    Aes256(Aes256),
}

/// Software AES engine.
#[derive(Default)]
pub struct SoftAes {
    key: Option<AesKey>,
}

impl SoftAes {
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }
}

impl SoftAes {
    fn load_key(&mut self, key: &[u8]) -> KeyfortResult<()> {
        let key = match key.len() {
            16 => Aes128::new_from_slice(key).map(AesKey::Aes128),
            32 => Aes256::new_from_slice(key).map(AesKey::Aes256),
            _ => return Err(KeyfortError::DRIVER_AES_INVALID_KEY_SIZE),
        };
        self.key = Some(key.map_err(|_| KeyfortError::DRIVER_AES_INVALID_KEY_SIZE)?);
        Ok(())
    }
}

impl BlockCipherEngine for SoftAes {
    fn set_encrypt_key(&mut self, key: &[u8]) -> KeyfortResult<()> {
        self.load_key(key)
    }

    fn encrypt_block(&mut self, block: &mut [u8; AES_BLOCK_LEN]) -> KeyfortResult<()> {
        let block = Block::from_mut_slice(&mut block[..]);
        match &self.key {
            Some(AesKey::Aes128(cipher)) => cipher.encrypt_block(block),
            Some(AesKey::Aes256(cipher)) => cipher.encrypt_block(block),
            None => return Err(KeyfortError::DRIVER_AES_FAILURE),
        }
        Ok(())
    }

    fn set_decrypt_key(&mut self, key: &[u8]) -> KeyfortResult<()> {
        self.load_key(key)
    }

    fn decrypt_block(&mut self, block: &mut [u8; AES_BLOCK_LEN]) -> KeyfortResult<()> {
        let block = Block::from_mut_slice(&mut block[..]);
        match &self.key {
            Some(AesKey::Aes128(cipher)) => cipher.decrypt_block(block),
            Some(AesKey::Aes256(cipher)) => cipher.decrypt_block(block),
            None => return Err(KeyfortError::DRIVER_AES_FAILURE),
        }
        Ok(())
    }

    fn clear_key(&mut self) {
        self.key = None;
    }
}

/// AES-ECB encrypt `plaintext` under a 16 or 32 byte `key`.
pub fn aes_ecb_encrypt(key: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let mut out = plaintext.to_vec();
    for chunk in out.chunks_exact_mut(AES_BLOCK_LEN) {
        let block = Block::from_mut_slice(chunk);
        match key.len() {
            16 => Aes128::new_from_slice(key).unwrap().encrypt_block(block),
            32 => Aes256::new_from_slice(key).unwrap().encrypt_block(block),
            len => panic!("unsupported AES key length {len}"),
        }
    }
    out
}

/// Modular exponentiation engine whose exponentiations are the identity.
///
/// `mod_reduce` performs an exact reduction.
#[derive(Default)]
pub struct IdentityModExp {
    /// Fail every operation with `DRIVER_RSA_MODEXP_FAILURE`.
    pub fail: bool,
}

impl IdentityModExp {
    fn copy(&self, input: &[u8], out: &mut [u8]) -> KeyfortResult<()> {
        if self.fail {
            return Err(KeyfortError::DRIVER_RSA_MODEXP_FAILURE);
        }
        if input.len() != out.len() {
            return Err(KeyfortError::DRIVER_RSA_INVALID_PARAM);
        }
        out.copy_from_slice(input);
        Ok(())
    }
}

impl ModExpEngine for IdentityModExp {
    fn public_exp(
        &mut self,
        _key: &RsaPublicKey,
        input: &[u8],
        out: &mut [u8],
    ) -> KeyfortResult<()> {
        self.copy(input, out)
    }

    fn private_exp(
        &mut self,
        _key: &RsaPrivateKey,
        input: &[u8],
        out: &mut [u8],
    ) -> KeyfortResult<()> {
        self.copy(input, out)
    }

    fn mod_reduce(&mut self, input: &[u8], modulus: &[u8], out: &mut [u8]) -> KeyfortResult<()> {
        if self.fail {
            return Err(KeyfortError::DRIVER_RSA_MODEXP_FAILURE);
        }
        if out.len() != modulus.len() || modulus.iter().all(|&b| b == 0) {
            return Err(KeyfortError::DRIVER_RSA_INVALID_PARAM);
        }

        // Binary long division with one spare byte for the shifted remainder.
        let mut m = vec![0u8];
        m.extend_from_slice(modulus);
        let mut r = vec![0u8; m.len()];
        for byte in input {
            for shift in (0..8).rev() {
                let mut carry = (byte >> shift) & 1;
                for b in r.iter_mut().rev() {
                    let next = *b >> 7;
                    *b = (*b << 1) | carry;
                    carry = next;
                }
                if r >= m {
                    let mut borrow = 0i16;
                    for (a, b) in r.iter_mut().zip(m.iter()).rev() {
                        let diff = i16::from(*a) - i16::from(*b) - borrow;
                        borrow = i16::from(diff < 0);
                        *a = diff.rem_euclid(256) as u8;
                    }
                }
            }
        }
        out.copy_from_slice(&r[1..]);
        Ok(())
    }
}

/// Deterministic byte counter.
#[derive(Default)]
pub struct SeqRandom {
    next: u8,
}

impl RandomSource for SeqRandom {
    fn fill_bytes(&mut self, out: &mut [u8]) -> KeyfortResult<()> {
        for b in out {
            *b = self.next;
            self.next = self.next.wrapping_add(0x3d);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_reduce() {
        let mut modexp = IdentityModExp::default();
        let mut out = [0u8; 2];
        // 0x012345 = 74565 = 7 * 10000 + 4565
        modexp
            .mod_reduce(&[0x01, 0x23, 0x45], &10000u16.to_be_bytes(), &mut out)
            .unwrap();
        assert_eq!(u16::from_be_bytes(out), 4565);

        modexp
            .mod_reduce(&[0xff, 0xff], &[0xff, 0xff], &mut out)
            .unwrap();
        assert_eq!(out, [0, 0]);

        modexp
            .mod_reduce(&[0x00, 0x00, 0x12], &[0xff, 0xf1], &mut out)
            .unwrap();
        assert_eq!(out, [0x00, 0x12]);
    }

    #[test]
    fn test_aes_ecb_round_trip() {
        let key = [0x2bu8; 32];
        let pt = [0x6au8; 32];
        let ct = aes_ecb_encrypt(&key, &pt);
        let mut out = [0u8; 32];
        SoftAes::default().ecb_decrypt(&key, &ct, &mut out).unwrap();
        assert_eq!(out, pt);
    }
}
