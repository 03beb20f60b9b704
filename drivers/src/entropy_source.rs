/*++

Licensed under the Apache-2.0 license.

File Name:

    entropy_source.rs

Abstract:

    File contains the adapter that turns TRNG register accesses into the
    reset, configuration, seeding and burst collection steps used by the
    TRNG engine.

--*/

use crate::trng_hw::{
    HardwareEntropySource, SettleDelay, TrngCtrl, TrngStatus, TRNG_BURST_SIZE_IN_WORDS,
    TRNG_PERS_STRING_LEN, TRNG_PERS_STRING_LEN_IN_WORDS,
};
use crate::{cprintln, wait};
use keyfort_error::{KeyfortError, KeyfortResult};

/// Poll budget while waiting for an output burst.
const GENERATE_MAX_POLLS: u32 = 250_000;

/// Poll budget while waiting for a reseed to complete.
const RESEED_MAX_POLLS: u32 = 2 * GENERATE_MAX_POLLS;

/// Seed bytes written per derivation function group.
const DF_BYTES_PER_GROUP: usize = 8;

/// Thin adapter over a [`HardwareEntropySource`].
pub struct EntropySource<H: HardwareEntropySource> {
    hw: H,
}

impl<H: HardwareEntropySource> EntropySource<H> {
    pub fn new(hw: H) -> Self {
        Self { hw }
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn into_inner(self) -> H {
        self.hw
    }

    /// Pulse the core reset and soft reset the PRNG unit.
    pub fn reset_core(&mut self) {
        self.hw.set_core_reset(true);
        self.hw.delay(SettleDelay::Reset);
        self.hw.set_core_reset(false);

        self.rmw_ctrl(TrngCtrl::PRNGSRST, TrngCtrl::PRNGSRST);
        self.hw.delay(SettleDelay::Reset);
        self.rmw_ctrl(TrngCtrl::PRNGSRST, TrngCtrl::empty());
    }

    /// Hold the core in reset and stop the noise source.
    pub fn shutdown(&mut self) {
        self.hw.set_core_reset(true);
        self.hw.set_oscillators(false);
    }

    /// Read-modify-write of the control register bits selected by `mask`.
    pub fn rmw_ctrl(&mut self, mask: TrngCtrl, value: TrngCtrl) {
        let ctrl = self.hw.read_ctrl();
        self.hw.write_ctrl((ctrl - mask) | (value & mask));
    }

    pub fn set_oscillators(&mut self, enabled: bool) {
        self.hw.set_oscillators(enabled);
    }

    pub fn set_df_len(&mut self, df_len: u8) {
        let mut conf1 = self.hw.read_conf1();
        conf1.set_dlen(df_len);
        self.hw.write_conf1(conf1);
    }

    /// Program both on-line health tests and the digitization interval.
    pub fn set_health_tests(&mut self, adapt_prop_cutoff: u16, rep_count_cutoff: u16, dit: u8) {
        let mut conf1 = self.hw.read_conf1();
        conf1.set_adapt_prop_test_cutoff(adapt_prop_cutoff);
        self.hw.write_conf1(conf1);

        let mut conf0 = self.hw.read_conf0();
        conf0.set_rep_count_test_cutoff(rep_count_cutoff);
        conf0.set_dit(dit);
        self.hw.write_conf0(conf0);
    }

    /// Load the personalization string. Word `i` is stored big-endian in
    /// `PER_STRNG_<11 - i>`.
    pub fn write_pers_string(&mut self, pers: &[u8; TRNG_PERS_STRING_LEN]) {
        for (idx, chunk) in pers.chunks_exact(4).enumerate() {
            let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.hw
                .write_pers_string(TRNG_PERS_STRING_LEN_IN_WORDS - 1 - idx, word);
        }
    }

    /// Shift `seed` into the derivation function one bit at a time, most
    /// significant bit first.
    pub fn write_seed(&mut self, seed: &[u8]) -> KeyfortResult<()> {
        for (idx, &byte) in seed.iter().enumerate() {
            let mut readback = 0u8;
            for shift in (0..8).rev() {
                let bit = (byte >> shift) & 1;
                self.hw.write_test_bit(u32::from(bit));
                readback = (readback << 1) | bit;
            }
            if readback != byte {
                return Err(KeyfortError::DRIVER_TRNG_SEED_WRITE_MISMATCH);
            }
            self.hw.delay(SettleDelay::DfByte);
            if idx % DF_BYTES_PER_GROUP == 0 {
                self.hw.delay(SettleDelay::DfWord);
            }
        }
        Ok(())
    }

    /// Wait for the reseed operation to signal completion.
    pub fn wait_for_reseed(&mut self) -> KeyfortResult<TrngStatus> {
        let hw = &mut self.hw;
        let result = wait::until_or_timeout(RESEED_MAX_POLLS, KeyfortError::DRIVER_TRNG_TIMEOUT, || {
            hw.read_status().done()
        });
        if let Err(err) = result {
            cprintln!("[trng] Reseed timeout");
            return Err(err);
        }
        Ok(self.hw.read_status())
    }

    /// Wait for a full output burst to be queued.
    pub fn wait_for_burst(&mut self) -> KeyfortResult<TrngStatus> {
        let hw = &mut self.hw;
        let result = wait::until_or_timeout(GENERATE_MAX_POLLS, KeyfortError::DRIVER_TRNG_TIMEOUT, || {
            usize::from(hw.read_status().qcnt()) == TRNG_BURST_SIZE_IN_WORDS
        });
        if let Err(err) = result {
            cprintln!("[trng] Generate timeout");
            return Err(err);
        }
        Ok(self.hw.read_status())
    }

    pub fn read_burst(&mut self) -> [u32; TRNG_BURST_SIZE_IN_WORDS] {
        core::array::from_fn(|_| self.hw.read_core_output())
    }
}
