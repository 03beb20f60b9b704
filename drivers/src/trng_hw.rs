/*++

Licensed under the Apache-2.0 license.

File Name:

    trng_hw.rs

Abstract:

    File contains the register level capability the TRNG engine drives.

--*/

use bitfield::bitfield;
use bitflags::bitflags;

/// Number of 32-bit personalization string registers.
pub const TRNG_PERS_STRING_LEN_IN_WORDS: usize = 12;

/// Personalization string length in bytes.
pub const TRNG_PERS_STRING_LEN: usize = TRNG_PERS_STRING_LEN_IN_WORDS * 4;

/// Words delivered by the core per output burst.
pub const TRNG_BURST_SIZE_IN_WORDS: usize = 4;

/// Reset value for the DIT field of CONF0.
pub const TRNG_DIT_DEFAULT: u8 = 0x0C;

bitflags! {
    /// TRNG control register
    #[derive(Default)]
    pub struct TrngCtrl: u32 {
        /// PRNG soft reset
        const PRNGSRST = 1 << 0;
        /// True random seed source enable
        const TRSSEN = 1 << 2;
        /// PRNG seed source select
        const PRNGXS = 1 << 3;
        /// Start the PRNG operation selected by PRNGMODE
        const PRNGSTART = 1 << 5;
        /// Seed the derivation function from the TEST register
        const TSTMODE = 1 << 6;
        /// Generate when set, reseed when clear
        const PRNGMODE = 1 << 7;
        /// Entropy unit mode, raw noise straight to the output
        const EUMODE = 1 << 8;
        /// Stop after a single generate
        const SINGLEGENMODE = 1 << 9;
        /// Ignore the personalization string
        const PERSODISABLE = 1 << 10;
    }
}

bitfield! {
    /// TRNG status register
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct TrngStatus(u32);

    /// Reseed operation complete
    pub done, set_done: 0;

    /// Catastrophic data transition fault
    pub dtf, set_dtf: 1;

    /// Catastrophic entropy reseed test fault
    pub certf, set_certf: 3;

    /// Number of output words queued
    pub u8, qcnt, set_qcnt: 11, 9;
}

bitfield! {
    /// TRNG configuration register 0
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct TrngConf0(u32);

    /// Digitization interval
    pub u8, dit, set_dit: 4, 0;

    /// Repetition count health test cutoff
    pub u16, rep_count_test_cutoff, set_rep_count_test_cutoff: 16, 8;
}

bitfield! {
    /// TRNG configuration register 1
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct TrngConf1(u32);

    /// Derivation function length in 128-bit blocks
    pub u8, dlen, set_dlen: 7, 0;

    /// Adaptive proportion health test cutoff
    pub u16, adapt_prop_test_cutoff, set_adapt_prop_test_cutoff: 17, 8;
}

/// Settle delays required by the core between register accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleDelay {
    /// After asserting a core or PRNG reset
    Reset,

    /// After every seed byte written to the derivation function
    DfByte,

    /// Longer wait at the start of each 8 byte group of seed material
    DfWord,
}

/// Register level access to a TRNG core.
///
/// Implementations own the register block. The TRNG engine is the only
/// caller and serializes all access.
pub trait HardwareEntropySource {
    fn read_ctrl(&mut self) -> TrngCtrl;

    fn write_ctrl(&mut self, ctrl: TrngCtrl);

    fn read_status(&mut self) -> TrngStatus;

    fn read_conf0(&mut self) -> TrngConf0;

    fn write_conf0(&mut self, conf: TrngConf0);

    fn read_conf1(&mut self) -> TrngConf1;

    fn write_conf1(&mut self, conf: TrngConf1);

    /// Write a single seed bit to the TEST register.
    fn write_test_bit(&mut self, bit: u32);

    /// Write personalization register `PER_STRNG_<index>`.
    fn write_pers_string(&mut self, index: usize, word: u32);

    /// Pop one word from the core output queue.
    fn read_core_output(&mut self) -> u32;

    /// Drive the core reset line.
    fn set_core_reset(&mut self, asserted: bool);

    /// Enable or disable the ring oscillators feeding the noise source.
    fn set_oscillators(&mut self, enabled: bool);

    /// Block for the named settle time.
    fn delay(&mut self, delay: SettleDelay);
}
