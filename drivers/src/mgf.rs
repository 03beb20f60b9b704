/*++

Licensed under the Apache-2.0 license.

File Name:

    mgf.rs

Abstract:

    File contains the MGF1 mask generation function.

--*/

use crate::hash::{HashAlgorithm, HashEngine, MAX_DIGEST_LEN};
use keyfort_error::{KeyfortError, KeyfortResult};
use zeroize::Zeroizing;

/// MGF1 mask generation function over a fixed hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mgf1 {
    algo: HashAlgorithm,
}

impl Mgf1 {
    pub fn new(algo: HashAlgorithm) -> Self {
        Self { algo }
    }

    pub fn algo(&self) -> HashAlgorithm {
        self.algo
    }

    /// Write `out.len()` bytes of mask derived from `seed` into `out`.
    ///
    /// # Arguments
    ///
    /// * `engine` - Hash engine
    /// * `seed` - Mask seed
    /// * `out` - Mask output
    pub fn mask<E: HashEngine>(
        &self,
        engine: &mut E,
        seed: &[u8],
        out: &mut [u8],
    ) -> KeyfortResult<()> {
        self.for_each_block(engine, seed, out, |dst, block| dst.copy_from_slice(block))
    }

    /// XOR the mask derived from `seed` into `data`.
    ///
    /// # Arguments
    ///
    /// * `engine` - Hash engine
    /// * `seed` - Mask seed
    /// * `data` - Data to mask in place
    pub fn xor_mask<E: HashEngine>(
        &self,
        engine: &mut E,
        seed: &[u8],
        data: &mut [u8],
    ) -> KeyfortResult<()> {
        self.for_each_block(engine, seed, data, |dst, block| {
            for (d, m) in dst.iter_mut().zip(block) {
                *d ^= m;
            }
        })
    }

    fn for_each_block<E, F>(
        &self,
        engine: &mut E,
        seed: &[u8],
        data: &mut [u8],
        mut apply: F,
    ) -> KeyfortResult<()>
    where
        E: HashEngine,
        F: FnMut(&mut [u8], &[u8]),
    {
        if seed.is_empty() || data.is_empty() {
            return Err(KeyfortError::DRIVER_MGF_INVALID_PARAM);
        }

        let hash_len = self.algo.digest_len();
        let mut block = Zeroizing::new([0u8; MAX_DIGEST_LEN]);
        for (counter, dst) in data.chunks_mut(hash_len).enumerate() {
            let counter = u32::try_from(counter).map_err(|_| KeyfortError::DRIVER_MGF_INVALID_PARAM)?;
            engine.start(self.algo)?;
            engine.update(seed)?;
            engine.update(&counter.to_be_bytes())?;
            engine.finish(&mut block[..hash_len])?;
            apply(dst, &block[..dst.len()]);
        }
        Ok(())
    }
}
