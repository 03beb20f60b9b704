/*++

Licensed under the Apache-2.0 license.

File Name:

    trng.rs

Abstract:

    File contains the TRNG engine: the DRBG lifecycle, seed life accounting
    and health test gating on top of an entropy source.

--*/

use crate::entropy_source::EntropySource;
use crate::printer::HexWord;
use crate::trng_hw::{
    HardwareEntropySource, TrngCtrl, TRNG_BURST_SIZE_IN_WORDS, TRNG_DIT_DEFAULT,
    TRNG_PERS_STRING_LEN,
};
use crate::cprintln;
use keyfort_cfi_lib::{cfi_launder, check_twice_eq};
use keyfort_error::{KeyfortError, KeyfortResult};
use zeroize::Zeroize;

/// Derivation function block size in bytes.
pub const TRNG_BLOCK_LEN: usize = 16;

pub const TRNG_DF_MIN_LEN: u8 = 2;
pub const TRNG_DF_MAX_LEN: u8 = 31;

pub const TRNG_MIN_SEED_LIFE: u32 = 1;
pub const TRNG_MAX_SEED_LIFE: u32 = 0x8_0000;

pub const TRNG_ADAPT_PROP_TEST_CUTOFF_MAX: u16 = 0x3FF;
pub const TRNG_REP_COUNT_TEST_CUTOFF_MAX: u16 = 0x1FF;

/// Largest number of bytes returned by a single generate.
pub const TRNG_SEC_STRENGTH_IN_BYTES: usize = 32;

/// Seed length for the largest derivation function length.
pub const TRNG_MAX_SEED_LEN: usize = seed_len(TRNG_DF_MAX_LEN);

const TRNG_SEC_STRENGTH_IN_BURSTS: usize = 2;

const TRNG_DEFAULT_DF_LEN: u8 = 7;
const TRNG_DEFAULT_ADAPT_PROP_TEST_CUTOFF: u16 = 645;
const TRNG_DEFAULT_REP_COUNT_TEST_CUTOFF: u16 = 66;
const TRNG_DEFAULT_SEED_LIFE: u32 = 256;

/// Seed length in bytes required for derivation function length `df_len`.
pub const fn seed_len(df_len: u8) -> usize {
    (df_len as usize + 1) * TRNG_BLOCK_LEN
}

/// Source of the DRBG seed material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrngMode {
    /// Deterministic. Seeds are supplied by the caller.
    Drng,

    /// Physical. Raw conditioned noise is returned without a DRBG.
    Ptrng,

    /// Hybrid. The DRBG is seeded from the noise source.
    Hrng,
}

/// Health of the TRNG instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrngErrorState {
    Healthy,
    StartupTest,
    Error,
    Catastrophic,
}

impl TrngErrorState {
    fn is_usable(self) -> bool {
        matches!(self, Self::Healthy | Self::StartupTest)
    }
}

/// DRBG lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrngState {
    Uninitialized,
    Instantiated,
    Reseeded,
    Generating,
}

/// TRNG instantiation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrngConfig {
    pub mode: TrngMode,

    /// Derivation function length in 128-bit blocks
    pub df_len: u8,

    pub adapt_prop_test_cutoff: u16,

    pub rep_count_test_cutoff: u16,

    /// Number of generates permitted between reseeds
    pub seed_life: u32,
}

impl TrngConfig {
    /// Default configuration for `mode`.
    pub const fn with_mode(mode: TrngMode) -> Self {
        Self {
            mode,
            df_len: TRNG_DEFAULT_DF_LEN,
            adapt_prop_test_cutoff: TRNG_DEFAULT_ADAPT_PROP_TEST_CUTOFF,
            rep_count_test_cutoff: TRNG_DEFAULT_REP_COUNT_TEST_CUTOFF,
            seed_life: TRNG_DEFAULT_SEED_LIFE,
        }
    }

    /// Seed length in bytes this configuration expects.
    pub const fn seed_len(&self) -> usize {
        seed_len(self.df_len)
    }

    /// Validate every range constrained field.
    pub fn validate(&self) -> KeyfortResult<()> {
        check_df_len(self.df_len)?;
        self.check_seed_life()?;
        self.check_cutoffs()
    }

    fn check_seed_life(&self) -> KeyfortResult<()> {
        if !(TRNG_MIN_SEED_LIFE..=TRNG_MAX_SEED_LIFE).contains(&self.seed_life) {
            return Err(KeyfortError::DRIVER_TRNG_INVALID_SEED_LIFE);
        }
        Ok(())
    }

    fn check_cutoffs(&self) -> KeyfortResult<()> {
        if self.adapt_prop_test_cutoff == 0
            || self.adapt_prop_test_cutoff > TRNG_ADAPT_PROP_TEST_CUTOFF_MAX
        {
            return Err(KeyfortError::DRIVER_TRNG_INVALID_ADAPT_PROP_TEST_CUTOFF);
        }
        if self.rep_count_test_cutoff == 0
            || self.rep_count_test_cutoff > TRNG_REP_COUNT_TEST_CUTOFF_MAX
        {
            return Err(KeyfortError::DRIVER_TRNG_INVALID_REP_COUNT_TEST_CUTOFF);
        }
        Ok(())
    }
}

impl Default for TrngConfig {
    fn default() -> Self {
        Self::with_mode(TrngMode::Hrng)
    }
}

fn df_len_in_range(df_len: u8) -> bool {
    (TRNG_DF_MIN_LEN..=TRNG_DF_MAX_LEN).contains(&df_len)
}

fn check_df_len(df_len: u8) -> KeyfortResult<()> {
    if !df_len_in_range(df_len) {
        return Err(KeyfortError::DRIVER_TRNG_INVALID_DF_LENGTH);
    }
    Ok(())
}

/// Only DRNG takes caller seed material.
fn seed_presence_ok(mode: TrngMode, seed: Option<&[u8]>) -> bool {
    seed.is_some() == (mode == TrngMode::Drng)
}

fn generate_len_ok(len: usize) -> bool {
    len != 0 && len <= TRNG_SEC_STRENGTH_IN_BYTES && len % 4 == 0
}

fn state_permits_generate(mode: TrngMode, state: TrngState) -> bool {
    match mode {
        TrngMode::Ptrng => matches!(state, TrngState::Instantiated | TrngState::Generating),
        TrngMode::Drng | TrngMode::Hrng => {
            matches!(state, TrngState::Reseeded | TrngState::Generating)
        }
    }
}

/// TRNG engine
pub struct Trng<H: HardwareEntropySource> {
    source: EntropySource<H>,
    config: TrngConfig,
    elapsed_seed_life: u32,
    error_state: TrngErrorState,
    state: TrngState,
    pred_resistance: bool,

    /// Countdown to the gate evaluation to invert, 0 when disarmed.
    #[cfg(test)]
    glitch: core::cell::Cell<u32>,
}

impl<H: HardwareEntropySource> Trng<H> {
    pub fn new(hw: H) -> Self {
        Self {
            source: EntropySource::new(hw),
            config: TrngConfig::default(),
            elapsed_seed_life: 0,
            error_state: TrngErrorState::StartupTest,
            state: TrngState::Uninitialized,
            pred_resistance: false,
            #[cfg(test)]
            glitch: core::cell::Cell::new(0),
        }
    }

    pub fn config(&self) -> &TrngConfig {
        &self.config
    }

    pub fn state(&self) -> TrngState {
        self.state
    }

    pub fn error_state(&self) -> TrngErrorState {
        self.error_state
    }

    pub fn elapsed_seed_life(&self) -> u32 {
        self.elapsed_seed_life
    }

    /// Prediction resistance flag of the last generate.
    pub fn pred_resistance(&self) -> bool {
        self.pred_resistance
    }

    pub fn hw(&self) -> &H {
        self.source.hw()
    }

    pub fn hw_mut(&mut self) -> &mut H {
        self.source.hw_mut()
    }

    pub fn into_inner(self) -> H {
        self.source.into_inner()
    }

    /// Instantiate the DRBG.
    ///
    /// # Arguments
    ///
    /// * `seed` - Seed material. Required in DRNG mode, rejected in HRNG and
    ///   PTRNG modes
    /// * `pers` - Optional personalization string
    /// * `config` - Instantiation parameters
    pub fn instantiate(
        &mut self,
        seed: Option<&[u8]>,
        pers: Option<&[u8; TRNG_PERS_STRING_LEN]>,
        config: &TrngConfig,
    ) -> KeyfortResult<()> {
        let result = self.instantiate_internal(seed, pers, config, false);
        self.fail_on_error("instantiate", result)
    }

    /// Instantiate path used by the known answer test. This is the only way
    /// out of the catastrophic state.
    pub(crate) fn instantiate_for_kat(
        &mut self,
        seed: &[u8],
        pers: &[u8; TRNG_PERS_STRING_LEN],
        config: &TrngConfig,
    ) -> KeyfortResult<()> {
        let result = self.instantiate_internal(Some(seed), Some(pers), config, true);
        self.fail_on_error("kat instantiate", result)
    }

    pub(crate) fn set_error_state(&mut self, error_state: TrngErrorState) {
        self.error_state = error_state;
    }

    /// Evaluate the lifecycle gate `pred` twice. A disagreement between the
    /// evaluations is reported as `CFI_CHECK_TWICE_MISMATCH`.
    fn gate<F: FnMut() -> bool>(&self, err: KeyfortError, mut pred: F) -> KeyfortResult<()> {
        check_twice_eq(err, || {
            let holds = pred();
            #[cfg(test)]
            let holds = holds ^ self.take_glitch();
            holds
        })
    }

    /// Invert the `nth` gate evaluation from now on.
    #[cfg(test)]
    pub(crate) fn glitch_evaluation(&self, nth: u32) {
        self.glitch.set(nth);
    }

    #[cfg(test)]
    fn take_glitch(&self) -> bool {
        let remaining = self.glitch.get();
        if remaining == 0 {
            return false;
        }
        self.glitch.set(remaining - 1);
        remaining == 1
    }

    fn instantiate_internal(
        &mut self,
        seed: Option<&[u8]>,
        pers: Option<&[u8; TRNG_PERS_STRING_LEN]>,
        config: &TrngConfig,
        kat: bool,
    ) -> KeyfortResult<()> {
        self.gate(KeyfortError::DRIVER_TRNG_INVALID_SEED_VALUE, || {
            seed_presence_ok(config.mode, seed)
        })?;
        self.gate(KeyfortError::DRIVER_TRNG_INVALID_STATE, || {
            self.state == TrngState::Uninitialized
        })?;
        self.gate(KeyfortError::DRIVER_TRNG_UNHEALTHY_STATE, || {
            kat || self.error_state != TrngErrorState::Catastrophic
        })?;
        self.gate(KeyfortError::DRIVER_TRNG_INVALID_DF_LENGTH, || {
            df_len_in_range(config.df_len)
        })?;
        if let Some(seed) = seed {
            self.gate(KeyfortError::DRIVER_TRNG_INVALID_SEED_LENGTH, || {
                seed.len() == config.seed_len()
            })?;
        }
        config.check_seed_life()?;
        config.check_cutoffs()?;

        self.config = *config;
        self.elapsed_seed_life = 0;
        self.pred_resistance = false;
        self.source.reset_core();

        if config.mode != TrngMode::Drng {
            self.source.set_health_tests(
                config.adapt_prop_test_cutoff,
                config.rep_count_test_cutoff,
                TRNG_DIT_DEFAULT,
            );
        }

        self.state = TrngState::Instantiated;
        if cfi_launder(config.mode) != TrngMode::Ptrng {
            self.reseed_internal(seed, config.df_len, pers)?;
        }

        self.error_state = if kat {
            TrngErrorState::StartupTest
        } else {
            TrngErrorState::Healthy
        };
        Ok(())
    }

    /// Reseed the DRBG.
    ///
    /// # Arguments
    ///
    /// * `seed` - Seed material. Required in DRNG mode, rejected in HRNG and
    ///   PTRNG modes
    /// * `df_len` - Derivation function length for this reseed
    pub fn reseed(&mut self, seed: Option<&[u8]>, df_len: u8) -> KeyfortResult<()> {
        let result = self.reseed_checked(seed, df_len);
        let result = self.fail_closed(result);
        Self::log_failure("reseed", result)
    }

    fn reseed_checked(&mut self, seed: Option<&[u8]>, df_len: u8) -> KeyfortResult<()> {
        let mode = self.config.mode;
        self.gate(KeyfortError::DRIVER_TRNG_INVALID_SEED_VALUE, || {
            seed_presence_ok(mode, seed)
        })?;
        if let Some(seed) = seed {
            self.gate(KeyfortError::DRIVER_TRNG_INVALID_SEED_LENGTH, || {
                seed.len() == seed_len(df_len)
            })?;
        }
        self.gate(KeyfortError::DRIVER_TRNG_INVALID_DF_LENGTH, || {
            df_len_in_range(df_len)
        })?;
        self.gate(KeyfortError::DRIVER_TRNG_INVALID_MODE, || mode != TrngMode::Ptrng)?;
        self.gate(KeyfortError::DRIVER_TRNG_INVALID_STATE, || {
            self.state != TrngState::Uninitialized
        })?;
        self.gate(KeyfortError::DRIVER_TRNG_UNHEALTHY_STATE, || {
            self.error_state.is_usable()
        })?;

        let result = self.reseed_internal(seed, df_len, None);
        self.mark_error(result)
    }

    fn reseed_internal(
        &mut self,
        seed: Option<&[u8]>,
        df_len: u8,
        pers: Option<&[u8; TRNG_PERS_STRING_LEN]>,
    ) -> KeyfortResult<()> {
        self.source.set_df_len(df_len);

        let perso = match pers {
            Some(pers) => {
                self.source.write_pers_string(pers);
                TrngCtrl::empty()
            }
            None => TrngCtrl::PERSODISABLE,
        };
        self.source
            .rmw_ctrl(TrngCtrl::PERSODISABLE | TrngCtrl::PRNGSTART, perso);

        match seed {
            Some(seed) => {
                self.source.rmw_ctrl(
                    TrngCtrl::PRNGMODE | TrngCtrl::TSTMODE | TrngCtrl::TRSSEN,
                    TrngCtrl::TSTMODE | TrngCtrl::TRSSEN,
                );
                self.source.rmw_ctrl(TrngCtrl::PRNGSTART, TrngCtrl::PRNGSTART);
                self.source.write_seed(seed)?;
            }
            None => {
                self.source.set_oscillators(true);
                self.source.rmw_ctrl(
                    TrngCtrl::PRNGMODE
                        | TrngCtrl::TSTMODE
                        | TrngCtrl::TRSSEN
                        | TrngCtrl::PRNGXS
                        | TrngCtrl::EUMODE,
                    TrngCtrl::TRSSEN,
                );
                self.source.rmw_ctrl(TrngCtrl::PRNGSTART, TrngCtrl::PRNGSTART);
            }
        }

        let status = self.source.wait_for_reseed()?;
        if status.certf() {
            self.error_state = TrngErrorState::Catastrophic;
            cprintln!("[trng] Catastrophic reseed fault");
            return Err(KeyfortError::DRIVER_TRNG_CATASTROPHIC_CTF);
        }

        self.source
            .rmw_ctrl(TrngCtrl::PRNGSTART | TrngCtrl::TRSSEN, TrngCtrl::empty());
        self.elapsed_seed_life = 0;
        self.state = TrngState::Reseeded;
        Ok(())
    }

    /// Fill `out` with random bytes.
    ///
    /// # Arguments
    ///
    /// * `out` - Output buffer. Length must be a multiple of 4 up to 32 bytes
    pub fn generate(&mut self, out: &mut [u8]) -> KeyfortResult<()> {
        let result = self.generate_internal(out, false);
        let result = self.fail_closed(result);
        Self::log_failure("generate", result)
    }

    /// Fill `out` with random bytes drawn from a freshly seeded state.
    ///
    /// In HRNG mode this reseeds from the noise source first. In DRNG mode
    /// the caller must have reseeded since the last generate.
    pub fn generate_with_prediction_resistance(&mut self, out: &mut [u8]) -> KeyfortResult<()> {
        let result = self.generate_internal(out, true);
        let result = self.fail_closed(result);
        Self::log_failure("generate", result)
    }

    fn generate_internal(&mut self, out: &mut [u8], pred_resistance: bool) -> KeyfortResult<()> {
        let mode = self.config.mode;
        let len = out.len();
        self.gate(KeyfortError::DRIVER_TRNG_INVALID_STATE, || {
            state_permits_generate(mode, self.state)
        })?;
        self.gate(KeyfortError::DRIVER_TRNG_INVALID_BUF_SIZE, || {
            generate_len_ok(len)
        })?;
        self.gate(KeyfortError::DRIVER_TRNG_INVALID_PRED_RES, || {
            !(mode == TrngMode::Ptrng && pred_resistance)
        })?;
        self.gate(KeyfortError::DRIVER_TRNG_UNHEALTHY_STATE, || {
            self.error_state.is_usable()
        })?;

        let seed_expired = self.elapsed_seed_life >= self.config.seed_life;
        match mode {
            TrngMode::Hrng => {
                if seed_expired || pred_resistance {
                    cprintln!("[trng] Implicit reseed");
                    self.reseed(None, self.config.df_len)?;
                }
            }
            TrngMode::Drng => {
                if seed_expired || (pred_resistance && self.elapsed_seed_life > 0) {
                    return Err(KeyfortError::DRIVER_TRNG_RESEED_REQUIRED);
                }
            }
            TrngMode::Ptrng => {
                self.source.set_oscillators(true);
                self.source.rmw_ctrl(
                    TrngCtrl::TRSSEN | TrngCtrl::EUMODE | TrngCtrl::PRNGXS | TrngCtrl::TSTMODE,
                    TrngCtrl::TRSSEN | TrngCtrl::EUMODE,
                );
            }
        }
        self.pred_resistance = pred_resistance;

        let result = self.collect(out);
        if result.is_err() {
            out.zeroize();
        }
        self.mark_error(result)?;

        self.elapsed_seed_life = self.elapsed_seed_life.saturating_add(1);
        self.state = TrngState::Generating;
        Ok(())
    }

    fn collect(&mut self, out: &mut [u8]) -> KeyfortResult<()> {
        let single = if self.pred_resistance {
            TrngCtrl::SINGLEGENMODE
        } else {
            TrngCtrl::empty()
        };
        self.source.rmw_ctrl(
            TrngCtrl::PRNGMODE | TrngCtrl::SINGLEGENMODE | TrngCtrl::PRNGSTART,
            TrngCtrl::PRNGMODE | single,
        );
        self.source.rmw_ctrl(TrngCtrl::PRNGSTART, TrngCtrl::PRNGSTART);

        let mut offset = 0;
        for _ in 0..TRNG_SEC_STRENGTH_IN_BURSTS {
            let status = self.source.wait_for_burst()?;
            if status.dtf() {
                self.error_state = TrngErrorState::Catastrophic;
                cprintln!("[trng] Catastrophic data transition fault");
                return Err(KeyfortError::DRIVER_TRNG_CATASTROPHIC_DTF);
            }
            let burst = self.source.read_burst();
            for word in burst {
                if let Some(dst) = out.get_mut(offset..offset + 4) {
                    dst.copy_from_slice(&word.to_be_bytes());
                }
                offset += 4;
            }
        }
        debug_assert_eq!(offset, TRNG_SEC_STRENGTH_IN_BURSTS * TRNG_BURST_SIZE_IN_WORDS * 4);
        Ok(())
    }

    /// Stop the core and return to the uninitialized state.
    ///
    /// The error state survives so a catastrophic fault cannot be cleared by
    /// cycling the instance.
    pub fn uninstantiate(&mut self) -> KeyfortResult<()> {
        self.source.shutdown();
        self.config = TrngConfig::default();
        self.elapsed_seed_life = 0;
        self.pred_resistance = false;
        self.state = TrngState::Uninitialized;
        Ok(())
    }

    /// Bring the TRNG up in `mode` with the default configuration.
    pub fn init_and_configure(&mut self, mode: TrngMode) -> KeyfortResult<()> {
        if self.state != TrngState::Uninitialized {
            self.uninstantiate()?;
        }
        let config = TrngConfig::with_mode(mode);
        if let Err(err) = self.instantiate(None, None, &config) {
            self.uninstantiate()?;
            return Err(err);
        }
        Ok(())
    }

    fn mark_error<T>(&mut self, result: KeyfortResult<T>) -> KeyfortResult<T> {
        if result.is_err() && self.error_state != TrngErrorState::Catastrophic {
            self.error_state = TrngErrorState::Error;
        }
        result
    }

    /// A gate that disagreed with itself leaves the instance in error.
    fn fail_closed<T>(&mut self, result: KeyfortResult<T>) -> KeyfortResult<T> {
        if matches!(result, Err(err) if err == KeyfortError::CFI_CHECK_TWICE_MISMATCH) {
            return self.mark_error(result);
        }
        result
    }

    fn fail_on_error<T>(&mut self, op: &str, result: KeyfortResult<T>) -> KeyfortResult<T> {
        let result = self.mark_error(result);
        Self::log_failure(op, result)
    }

    fn log_failure<T>(op: &str, result: KeyfortResult<T>) -> KeyfortResult<T> {
        if let Err(err) = &result {
            cprintln!("[trng] {} failed 0x{}", op, HexWord(u32::from(*err)));
        }
        result
    }
}
