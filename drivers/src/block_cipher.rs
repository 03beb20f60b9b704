/*++

Licensed under the Apache-2.0 license.

File Name:

    block_cipher.rs

Abstract:

    File contains the AES block cipher capability used to wrap and unwrap
    key payloads.

--*/

use keyfort_error::{KeyfortError, KeyfortResult};
use zeroize::Zeroize;

pub const AES_BLOCK_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesKeySize {
    Aes128,
    Aes256,
}

impl AesKeySize {
    pub fn from_len(len: usize) -> KeyfortResult<Self> {
        match len {
            16 => Ok(Self::Aes128),
            32 => Ok(Self::Aes256),
            _ => Err(KeyfortError::DRIVER_AES_INVALID_KEY_SIZE),
        }
    }

    /// Key length in bytes.
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes256 => 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// AES engine capability.
pub trait BlockCipherEngine {
    /// Load `key` and expand the encryption key schedule.
    fn set_encrypt_key(&mut self, key: &[u8]) -> KeyfortResult<()>;

    /// Encrypt one block in place with the loaded key.
    fn encrypt_block(&mut self, block: &mut [u8; AES_BLOCK_LEN]) -> KeyfortResult<()>;

    /// Load `key` and expand the decryption key schedule.
    fn set_decrypt_key(&mut self, key: &[u8]) -> KeyfortResult<()>;

    /// Decrypt one block in place with the loaded key.
    fn decrypt_block(&mut self, block: &mut [u8; AES_BLOCK_LEN]) -> KeyfortResult<()>;

    /// Drop the loaded key schedule.
    fn clear_key(&mut self);

    /// AES-ECB encrypt `input` into `out` under `key`.
    ///
    /// # Arguments
    ///
    /// * `key` - 16 or 32 byte key
    /// * `input` - Plaintext, a non-empty multiple of the block size
    /// * `out` - Ciphertext output, at least as long as `input`
    fn ecb_encrypt(&mut self, key: &[u8], input: &[u8], out: &mut [u8]) -> KeyfortResult<()> {
        ecb(self, Direction::Encrypt, key, input, out)
    }

    /// AES-ECB decrypt `input` into `out` under `key`.
    ///
    /// # Arguments
    ///
    /// * `key` - 16 or 32 byte key
    /// * `input` - Ciphertext, a non-empty multiple of the block size
    /// * `out` - Plaintext output, at least as long as `input`
    fn ecb_decrypt(&mut self, key: &[u8], input: &[u8], out: &mut [u8]) -> KeyfortResult<()> {
        ecb(self, Direction::Decrypt, key, input, out)
    }
}

fn ecb<C: BlockCipherEngine + ?Sized>(
    cipher: &mut C,
    dir: Direction,
    key: &[u8],
    input: &[u8],
    out: &mut [u8],
) -> KeyfortResult<()> {
    AesKeySize::from_len(key.len())?;
    if input.is_empty() || input.len() % AES_BLOCK_LEN != 0 || out.len() < input.len() {
        return Err(KeyfortError::DRIVER_AES_INVALID_DATA_LEN);
    }

    let mut result = match dir {
        Direction::Encrypt => cipher.set_encrypt_key(key),
        Direction::Decrypt => cipher.set_decrypt_key(key),
    };
    let mut block = [0u8; AES_BLOCK_LEN];
    if result.is_ok() {
        for (src, dst) in input
            .chunks_exact(AES_BLOCK_LEN)
            .zip(out.chunks_exact_mut(AES_BLOCK_LEN))
        {
            block.copy_from_slice(src);
            result = match dir {
                Direction::Encrypt => cipher.encrypt_block(&mut block),
                Direction::Decrypt => cipher.decrypt_block(&mut block),
            };
            if result.is_err() {
                break;
            }
            dst.copy_from_slice(&block);
        }
    }
    block.zeroize();
    cipher.clear_key();

    if result.is_err() {
        out.zeroize();
    }
    result
}
