/*++

Licensed under the Apache-2.0 license.

File Name:

    ecc_ephemeral.rs

Abstract:

    File contains the ECC ephemeral private scalar generator.

--*/

use crate::random::RandomSource;
use crate::rsa::ModExpEngine;
use crate::trng::{
    seed_len, Trng, TrngConfig, TrngMode, TRNG_BLOCK_LEN, TRNG_DF_MAX_LEN, TRNG_DF_MIN_LEN,
};
use crate::trng_hw::{HardwareEntropySource, TRNG_PERS_STRING_LEN};
use crate::{cprintln, printer::HexWord};
use keyfort_error::{KeyfortError, KeyfortResult};
use zeroize::{Zeroize, Zeroizing};

/// Largest curve order in bytes.
pub const ECC_MAX_ORDER_LEN: usize = 48;

/// Random bytes drawn beyond the order length to flatten the modular bias.
pub const ECC_EXTRA_RANDOM_BYTES: usize = 8;

const P256_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xBC, 0xE6, 0xFA, 0xAD, 0xA7, 0x17, 0x9E, 0x84, 0xF3, 0xB9, 0xCA, 0xC2, 0xFC, 0x63, 0x25, 0x51,
];

const P384_ORDER: [u8; 48] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xC7, 0x63, 0x4D, 0x81, 0xF4, 0x37, 0x2D, 0xDF,
    0x58, 0x1A, 0x0D, 0xB2, 0x48, 0xB0, 0xA7, 0x7A, 0xEC, 0xEC, 0x19, 0x6A, 0xCC, 0xC5, 0x29, 0x73,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EccCurve {
    P256,
    P384,
}

impl EccCurve {
    /// Big-endian group order.
    pub fn order(self) -> &'static [u8] {
        match self {
            Self::P256 => &P256_ORDER,
            Self::P384 => &P384_ORDER,
        }
    }

    /// Order length in bytes.
    pub const fn order_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
        }
    }
}

/// ECC ephemeral key generator.
#[derive(Default, Debug)]
pub struct EccEphemeralKey {}

impl EccEphemeralKey {
    /// Generate a private scalar reduced modulo the order of `curve`.
    ///
    /// With a seed the TRNG is instantiated in DRNG mode, otherwise in HRNG
    /// mode. Either way the TRNG is left in HRNG mode on return.
    ///
    /// # Arguments
    ///
    /// * `trng` - TRNG to draw from
    /// * `modexp` - Engine performing the reduction
    /// * `curve` - Target curve
    /// * `seed` - Optional DRNG seed, a whole number of 16 byte blocks
    /// * `pers` - Optional personalization string
    /// * `scalar` - Output scalar, exactly the order length
    pub fn generate<H: HardwareEntropySource, M: ModExpEngine>(
        &self,
        trng: &mut Trng<H>,
        modexp: &mut M,
        curve: EccCurve,
        seed: Option<&[u8]>,
        pers: Option<&[u8; TRNG_PERS_STRING_LEN]>,
        scalar: &mut [u8],
    ) -> KeyfortResult<()> {
        let result = self.generate_internal(trng, modexp, curve, seed, pers, scalar);
        let rearm = trng.init_and_configure(TrngMode::Hrng);
        let result = result.and(rearm);
        if let Err(err) = result {
            scalar.zeroize();
            cprintln!("[ecc] Ephemeral key failed 0x{}", HexWord(u32::from(err)));
        }
        result
    }

    fn generate_internal<H: HardwareEntropySource, M: ModExpEngine>(
        &self,
        trng: &mut Trng<H>,
        modexp: &mut M,
        curve: EccCurve,
        seed: Option<&[u8]>,
        pers: Option<&[u8; TRNG_PERS_STRING_LEN]>,
        scalar: &mut [u8],
    ) -> KeyfortResult<()> {
        let order_len = curve.order_len();
        if scalar.len() != order_len {
            return Err(KeyfortError::DRIVER_ECC_INVALID_PARAM);
        }

        let config = match seed {
            Some(seed) => TrngConfig {
                df_len: df_len_for_seed(seed.len())?,
                ..TrngConfig::with_mode(TrngMode::Drng)
            },
            None => TrngConfig::with_mode(TrngMode::Hrng),
        };
        trng.uninstantiate()?;
        trng.instantiate(seed, pers, &config)?;

        // Leading zero byte keeps the input positive for the reduction engine.
        let mut buf = Zeroizing::new([0u8; 1 + ECC_MAX_ORDER_LEN + ECC_EXTRA_RANDOM_BYTES]);
        let buf = &mut buf[..1 + order_len + ECC_EXTRA_RANDOM_BYTES];
        trng.fill_bytes(&mut buf[1..])?;

        modexp
            .mod_reduce(buf, curve.order(), scalar)
            .map_err(|_| KeyfortError::DRIVER_ECC_EPHEMERAL_KEY_GEN_FAILURE)
    }
}

fn df_len_for_seed(len: usize) -> KeyfortResult<u8> {
    if len % TRNG_BLOCK_LEN != 0
        || len < seed_len(TRNG_DF_MIN_LEN)
        || len > seed_len(TRNG_DF_MAX_LEN)
    {
        return Err(KeyfortError::DRIVER_ECC_INVALID_PARAM);
    }
    Ok((len / TRNG_BLOCK_LEN - 1) as u8)
}
