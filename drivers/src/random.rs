/*++

Licensed under the Apache-2.0 license.

File Name:

    random.rs

Abstract:

    File contains the random byte source capability consumed by the padding
    schemes and key generators.

--*/

use crate::trng::{Trng, TRNG_SEC_STRENGTH_IN_BYTES};
use crate::trng_hw::HardwareEntropySource;
use keyfort_error::KeyfortResult;
use zeroize::Zeroize;

/// Source of random bytes of arbitrary length.
pub trait RandomSource {
    /// Fill `out` with random bytes.
    fn fill_bytes(&mut self, out: &mut [u8]) -> KeyfortResult<()>;
}

impl<H: HardwareEntropySource> RandomSource for Trng<H> {
    fn fill_bytes(&mut self, out: &mut [u8]) -> KeyfortResult<()> {
        let mut block = [0u8; TRNG_SEC_STRENGTH_IN_BYTES];
        let mut result = Ok(());
        for chunk in out.chunks_mut(TRNG_SEC_STRENGTH_IN_BYTES) {
            let len = (chunk.len() + 3) & !3;
            result = self.generate(&mut block[..len]);
            if result.is_err() {
                break;
            }
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
        block.zeroize();
        if result.is_err() {
            out.zeroize();
        }
        result
    }
}
