/*++

Licensed under the Apache-2.0 license.

File Name:

    trng_mmio.rs

Abstract:

    File contains the memory mapped register implementation of the TRNG
    hardware capability.

--*/

use crate::trng_hw::{
    HardwareEntropySource, SettleDelay, TrngConf0, TrngConf1, TrngCtrl, TrngStatus,
    TRNG_PERS_STRING_LEN_IN_WORDS,
};
use keyfort_error::{KeyfortError, KeyfortResult};

/// Register offsets of a TRNG core, relative to its base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrngRegisterMap {
    pub status: usize,
    pub ctrl: usize,
    pub conf0: usize,
    pub conf1: usize,
    pub test: usize,

    /// Offset of `PER_STRNG_0`. The remaining eleven registers follow at
    /// 4 byte strides.
    pub pers_string: usize,

    pub core_output: usize,
    pub reset: usize,
    pub osc_en: usize,
}

impl TrngRegisterMap {
    fn offsets(&self) -> [usize; 9] {
        [
            self.status,
            self.ctrl,
            self.conf0,
            self.conf1,
            self.test,
            self.pers_string,
            self.core_output,
            self.reset,
            self.osc_en,
        ]
    }

    /// Every register must be 32-bit aligned.
    pub fn validate(&self) -> KeyfortResult<()> {
        if self.offsets().iter().any(|offset| offset % 4 != 0) {
            return Err(KeyfortError::DRIVER_TRNG_INVALID_PARAM);
        }
        Ok(())
    }
}

impl Default for TrngRegisterMap {
    fn default() -> Self {
        Self {
            status: 0x04,
            ctrl: 0x08,
            conf0: 0x0C,
            conf1: 0x10,
            test: 0x14,
            pers_string: 0x40,
            core_output: 0xC0,
            reset: 0xD0,
            osc_en: 0xD4,
        }
    }
}

/// Spin counts used to honor the core settle times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrngSettleSpins {
    pub reset: u32,
    pub df_byte: u32,
    pub df_word: u32,
}

impl Default for TrngSettleSpins {
    fn default() -> Self {
        Self {
            reset: 1_000,
            df_byte: 2,
            df_word: 700,
        }
    }
}

const RESET_ASSERT: u32 = 1;
const OSC_ENABLE: u32 = 1;

/// TRNG core accessed through volatile loads and stores.
pub struct MmioEntropySource {
    base: usize,
    map: TrngRegisterMap,
    spins: TrngSettleSpins,
}

impl MmioEntropySource {
    /// Create an accessor for the TRNG core at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a TRNG register block laid out as
    /// `map` describes, and the caller must not create a second accessor
    /// for the same block.
    pub unsafe fn new(
        base: usize,
        map: TrngRegisterMap,
        spins: TrngSettleSpins,
    ) -> KeyfortResult<Self> {
        if base % 4 != 0 {
            return Err(KeyfortError::DRIVER_TRNG_INVALID_PARAM);
        }
        map.validate()?;
        Ok(Self { base, map, spins })
    }

    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `new` requires `base + offset` to be a valid register.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write(&mut self, offset: usize, value: u32) {
        // SAFETY: `new` requires `base + offset` to be a valid register.
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

impl HardwareEntropySource for MmioEntropySource {
    fn read_ctrl(&mut self) -> TrngCtrl {
        TrngCtrl::from_bits_truncate(self.read(self.map.ctrl))
    }

    fn write_ctrl(&mut self, ctrl: TrngCtrl) {
        self.write(self.map.ctrl, ctrl.bits());
    }

    fn read_status(&mut self) -> TrngStatus {
        TrngStatus(self.read(self.map.status))
    }

    fn read_conf0(&mut self) -> TrngConf0 {
        TrngConf0(self.read(self.map.conf0))
    }

    fn write_conf0(&mut self, conf: TrngConf0) {
        self.write(self.map.conf0, conf.0);
    }

    fn read_conf1(&mut self) -> TrngConf1 {
        TrngConf1(self.read(self.map.conf1))
    }

    fn write_conf1(&mut self, conf: TrngConf1) {
        self.write(self.map.conf1, conf.0);
    }

    fn write_test_bit(&mut self, bit: u32) {
        self.write(self.map.test, bit & 1);
    }

    fn write_pers_string(&mut self, index: usize, word: u32) {
        if index < TRNG_PERS_STRING_LEN_IN_WORDS {
            self.write(self.map.pers_string + index * 4, word);
        }
    }

    fn read_core_output(&mut self) -> u32 {
        self.read(self.map.core_output)
    }

    fn set_core_reset(&mut self, asserted: bool) {
        self.write(self.map.reset, if asserted { RESET_ASSERT } else { 0 });
    }

    fn set_oscillators(&mut self, enabled: bool) {
        self.write(self.map.osc_en, if enabled { OSC_ENABLE } else { 0 });
    }

    fn delay(&mut self, delay: SettleDelay) {
        let spins = match delay {
            SettleDelay::Reset => self.spins.reset,
            SettleDelay::DfByte => self.spins.df_byte,
            SettleDelay::DfWord => self.spins.df_word,
        };
        for _ in 0..spins {
            core::hint::spin_loop();
        }
    }
}
