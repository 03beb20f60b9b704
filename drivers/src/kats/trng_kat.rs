/*++

Licensed under the Apache-2.0 license.

File Name:

    trng_kat.rs

Abstract:

    File contains the Known Answer Test (KAT) for the TRNG DRBG.

--*/

use crate::trng::{seed_len, Trng, TrngConfig, TrngErrorState, TrngMode};
use crate::trng_hw::{HardwareEntropySource, TRNG_PERS_STRING_LEN};
use crate::{cprintln, printer::HexWord};
use keyfort_cfi_lib::{cfi_assert_eq, check_twice_eq};
use keyfort_error::{KeyfortError, KeyfortResult};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Bytes produced by the KAT generate.
pub const TRNG_KAT_OUTPUT_LEN: usize = 32;

/// DRNG known answer vector.
pub struct TrngKatVector<'a> {
    /// Derivation function length the seed was sized for
    pub df_len: u8,

    pub seed: &'a [u8],

    pub pers: [u8; TRNG_PERS_STRING_LEN],

    pub expected: [u8; TRNG_KAT_OUTPUT_LEN],
}

#[derive(Default, Debug)]
pub struct TrngKat {}

impl TrngKat {
    /// This function executes the Known Answer Test (aka KAT) for the TRNG.
    ///
    /// The instance is cycled through a DRNG instantiation with the vector
    /// seed and personalization string and left uninstantiated. A passing
    /// test marks the instance healthy. Any failure marks it catastrophic.
    ///
    /// # Arguments
    ///
    /// * `trng` - TRNG engine
    /// * `vector` - Known answer vector
    ///
    /// # Returns
    ///
    /// * `KeyfortResult` - Result denoting the KAT outcome.
    pub fn execute<H: HardwareEntropySource>(
        &self,
        trng: &mut Trng<H>,
        vector: &TrngKatVector,
    ) -> KeyfortResult<()> {
        if vector.seed.len() != seed_len(vector.df_len) {
            Err(KeyfortError::DRIVER_TRNG_KAT_INVALID_VECTOR)?;
        }

        let result = self.generate_and_compare(trng, vector);
        let result = result.and(trng.uninstantiate());

        match result {
            Ok(()) => {
                trng.set_error_state(TrngErrorState::Healthy);
                cfi_assert_eq(trng.error_state(), TrngErrorState::Healthy);
                Ok(())
            }
            Err(err) => {
                trng.set_error_state(TrngErrorState::Catastrophic);
                cprintln!("[kat] TRNG KAT failed 0x{}", HexWord(u32::from(err)));
                Err(err)
            }
        }
    }

    fn generate_and_compare<H: HardwareEntropySource>(
        &self,
        trng: &mut Trng<H>,
        vector: &TrngKatVector,
    ) -> KeyfortResult<()> {
        let config = TrngConfig {
            df_len: vector.df_len,
            ..TrngConfig::with_mode(TrngMode::Drng)
        };

        trng.uninstantiate()?;
        trng.instantiate_for_kat(vector.seed, &vector.pers, &config)?;

        let mut output = Zeroizing::new([0u8; TRNG_KAT_OUTPUT_LEN]);
        trng.generate(&mut output[..])?;

        check_twice_eq(KeyfortError::DRIVER_TRNG_KAT_FAILURE, || {
            bool::from(output[..].ct_eq(&vector.expected[..]))
        })
    }
}

/// Run the TRNG known answer test against `vector`.
pub fn execute_trng_kat<H: HardwareEntropySource>(
    trng: &mut Trng<H>,
    vector: &TrngKatVector,
) -> KeyfortResult<()> {
    TrngKat::default().execute(trng, vector)
}
