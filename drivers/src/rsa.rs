/*++

Licensed under the Apache-2.0 license.

File Name:

    rsa.rs

Abstract:

    File contains the RSA key material types and the modular exponentiation
    capability.

--*/

use keyfort_error::{KeyfortError, KeyfortResult};

/// Largest supported modulus in bytes.
pub const RSA_MAX_MODULUS_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaKeySize {
    Rsa2048,
    Rsa3072,
    Rsa4096,
}

impl RsaKeySize {
    /// Modulus length in bytes.
    pub const fn modulus_len(self) -> usize {
        match self {
            Self::Rsa2048 => 256,
            Self::Rsa3072 => 384,
            Self::Rsa4096 => 512,
        }
    }

    pub fn from_len(len: usize) -> KeyfortResult<Self> {
        match len {
            256 => Ok(Self::Rsa2048),
            384 => Ok(Self::Rsa3072),
            512 => Ok(Self::Rsa4096),
            _ => Err(KeyfortError::DRIVER_RSA_INVALID_KEY_SIZE),
        }
    }
}

/// RSA public key. All integers are big-endian.
#[derive(Debug, Clone, Copy)]
pub struct RsaPublicKey<'a> {
    modulus: &'a [u8],
    modulus_ext: Option<&'a [u8]>,
    exponent: u32,
}

impl<'a> RsaPublicKey<'a> {
    /// Create a public key.
    ///
    /// # Arguments
    ///
    /// * `modulus` - Modulus of 256, 384 or 512 bytes
    /// * `modulus_ext` - Optional precomputed modulus extension, same length as the modulus
    /// * `exponent` - Public exponent
    pub fn new(
        modulus: &'a [u8],
        modulus_ext: Option<&'a [u8]>,
        exponent: u32,
    ) -> KeyfortResult<Self> {
        check_modulus(modulus, modulus_ext)?;
        if exponent == 0 {
            return Err(KeyfortError::DRIVER_RSA_INVALID_PARAM);
        }
        Ok(Self {
            modulus,
            modulus_ext,
            exponent,
        })
    }

    pub fn modulus(&self) -> &'a [u8] {
        self.modulus
    }

    pub fn modulus_ext(&self) -> Option<&'a [u8]> {
        self.modulus_ext
    }

    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    pub fn modulus_len(&self) -> usize {
        self.modulus.len()
    }
}

/// RSA private key. All integers are big-endian.
#[derive(Clone, Copy)]
pub struct RsaPrivateKey<'a> {
    modulus: &'a [u8],
    modulus_ext: Option<&'a [u8]>,
    exponent: &'a [u8],
}

impl<'a> RsaPrivateKey<'a> {
    /// Create a private key.
    ///
    /// # Arguments
    ///
    /// * `modulus` - Modulus of 256, 384 or 512 bytes
    /// * `modulus_ext` - Optional precomputed modulus extension, same length as the modulus
    /// * `exponent` - Private exponent, same length as the modulus
    pub fn new(
        modulus: &'a [u8],
        modulus_ext: Option<&'a [u8]>,
        exponent: &'a [u8],
    ) -> KeyfortResult<Self> {
        check_modulus(modulus, modulus_ext)?;
        if exponent.len() != modulus.len() {
            return Err(KeyfortError::DRIVER_RSA_INVALID_PARAM);
        }
        Ok(Self {
            modulus,
            modulus_ext,
            exponent,
        })
    }

    pub fn modulus(&self) -> &'a [u8] {
        self.modulus
    }

    pub fn modulus_ext(&self) -> Option<&'a [u8]> {
        self.modulus_ext
    }

    pub fn exponent(&self) -> &'a [u8] {
        self.exponent
    }

    pub fn modulus_len(&self) -> usize {
        self.modulus.len()
    }
}

fn check_modulus(modulus: &[u8], modulus_ext: Option<&[u8]>) -> KeyfortResult<()> {
    RsaKeySize::from_len(modulus.len())?;
    if modulus.first().copied().unwrap_or(0) == 0 {
        return Err(KeyfortError::DRIVER_RSA_INVALID_PARAM);
    }
    if let Some(ext) = modulus_ext {
        if ext.len() != modulus.len() {
            return Err(KeyfortError::DRIVER_RSA_INVALID_PARAM);
        }
    }
    Ok(())
}

/// Modular exponentiation capability.
///
/// Inputs and outputs are big-endian and exactly the modulus length.
pub trait ModExpEngine {
    /// `out = input ^ e mod n`
    fn public_exp(&mut self, key: &RsaPublicKey, input: &[u8], out: &mut [u8])
        -> KeyfortResult<()>;

    /// `out = input ^ d mod n`
    fn private_exp(
        &mut self,
        key: &RsaPrivateKey,
        input: &[u8],
        out: &mut [u8],
    ) -> KeyfortResult<()>;

    /// `out = input mod modulus`. `out` is the modulus length.
    fn mod_reduce(&mut self, input: &[u8], modulus: &[u8], out: &mut [u8]) -> KeyfortResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_size() {
        assert_eq!(RsaKeySize::from_len(384), Ok(RsaKeySize::Rsa3072));
        assert_eq!(RsaKeySize::Rsa4096.modulus_len(), RSA_MAX_MODULUS_LEN);
        assert_eq!(
            RsaKeySize::from_len(128),
            Err(KeyfortError::DRIVER_RSA_INVALID_KEY_SIZE)
        );
    }

    #[test]
    fn test_public_key_checks() {
        let modulus = [0xc3u8; 256];
        let key = RsaPublicKey::new(&modulus, None, 65537).unwrap();
        assert_eq!(key.modulus_len(), 256);
        assert_eq!(key.exponent(), 65537);

        assert_eq!(
            RsaPublicKey::new(&modulus[..255], None, 65537).map(|k| k.modulus_len()),
            Err(KeyfortError::DRIVER_RSA_INVALID_KEY_SIZE)
        );
        assert_eq!(
            RsaPublicKey::new(&modulus, Some(&modulus[..128]), 3).map(|k| k.modulus_len()),
            Err(KeyfortError::DRIVER_RSA_INVALID_PARAM)
        );

        let mut leading_zero = modulus;
        leading_zero[0] = 0;
        assert_eq!(
            RsaPublicKey::new(&leading_zero, None, 3).map(|k| k.modulus_len()),
            Err(KeyfortError::DRIVER_RSA_INVALID_PARAM)
        );
    }

    #[test]
    fn test_private_key_checks() {
        let modulus = [0xc3u8; 384];
        let exponent = [0x11u8; 384];
        let key = RsaPrivateKey::new(&modulus, None, &exponent).unwrap();
        assert_eq!(key.modulus_len(), 384);
        assert_eq!(
            RsaPrivateKey::new(&modulus, None, &exponent[..383]).map(|k| k.modulus_len()),
            Err(KeyfortError::DRIVER_RSA_INVALID_PARAM)
        );
    }
}
