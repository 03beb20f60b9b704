/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the library for error handling

--*/
#![cfg_attr(not(any(feature = "std", test)), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Keyfort Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KeyfortError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: KeyfortError = KeyfortError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl KeyfortError {
    /// Create a keyfort error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get a KeyfortError from a u32 is to
    /// use `KeyfortError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("KeyfortError cannot be 0"),
        }
    }

    /// Component identifier held in the upper 16 bits of the code.
    pub fn component(&self) -> u16 {
        (self.0.get() >> 16) as u16
    }

    define_error_constants![
        (KEYFORT_INTERNAL, 0x0001_0001, "Internal error"),
        (
            DRIVER_TRNG_INVALID_PARAM,
            0x0002_0001,
            "Driver Error: TRNG register layout or base address is misaligned"
        ),
        (
            DRIVER_TRNG_INVALID_STATE,
            0x0002_0002,
            "Driver Error: TRNG lifecycle state does not permit the operation"
        ),
        (
            DRIVER_TRNG_INVALID_MODE,
            0x0002_0003,
            "Driver Error: TRNG mode does not permit the operation"
        ),
        (
            DRIVER_TRNG_INVALID_SEED_VALUE,
            0x0002_0004,
            "Driver Error: TRNG seed supplied where none is allowed, or missing where required"
        ),
        (
            DRIVER_TRNG_INVALID_SEED_LENGTH,
            0x0002_0005,
            "Driver Error: TRNG seed length does not match the derivation function length"
        ),
        (
            DRIVER_TRNG_INVALID_SEED_LIFE,
            0x0002_0006,
            "Driver Error: TRNG seed life out of range"
        ),
        (
            DRIVER_TRNG_INVALID_DF_LENGTH,
            0x0002_0007,
            "Driver Error: TRNG derivation function length out of range"
        ),
        (
            DRIVER_TRNG_INVALID_ADAPT_PROP_TEST_CUTOFF,
            0x0002_0008,
            "Driver Error: TRNG adaptive proportion test cutoff out of range"
        ),
        (
            DRIVER_TRNG_INVALID_REP_COUNT_TEST_CUTOFF,
            0x0002_0009,
            "Driver Error: TRNG repetition count test cutoff out of range"
        ),
        (
            DRIVER_TRNG_INVALID_BUF_SIZE,
            0x0002_000A,
            "Driver Error: TRNG requested output size is invalid"
        ),
        (
            DRIVER_TRNG_INVALID_PRED_RES,
            0x0002_000B,
            "Driver Error: TRNG prediction resistance not supported in this mode"
        ),
        (
            DRIVER_TRNG_UNHEALTHY_STATE,
            0x0002_000C,
            "Driver Error: TRNG is in an unhealthy state"
        ),
        (
            DRIVER_TRNG_CATASTROPHIC_CTF,
            0x0002_000D,
            "Driver Error: TRNG catastrophic reseed fault"
        ),
        (
            DRIVER_TRNG_CATASTROPHIC_DTF,
            0x0002_000E,
            "Driver Error: TRNG catastrophic data transition fault"
        ),
        (
            DRIVER_TRNG_TIMEOUT,
            0x0002_000F,
            "Driver Error: TRNG did not respond in time"
        ),
        (
            DRIVER_TRNG_RESEED_REQUIRED,
            0x0002_0010,
            "Driver Error: TRNG must be reseeded by the caller"
        ),
        (
            DRIVER_TRNG_SEED_WRITE_MISMATCH,
            0x0002_0011,
            "Driver Error: TRNG seed bits written to the derivation function did not match"
        ),
        (
            DRIVER_TRNG_KAT_FAILURE,
            0x0002_0012,
            "Driver Error: TRNG known answer test failed"
        ),
        (
            DRIVER_TRNG_KAT_INVALID_VECTOR,
            0x0002_0013,
            "Driver Error: TRNG known answer test vector is malformed"
        ),
        (
            DRIVER_HASH_FAILURE,
            0x0003_0001,
            "Driver Error: Hash engine failure"
        ),
        (
            DRIVER_HASH_INVALID_STATE,
            0x0003_0002,
            "Driver Error: Hash engine used without an active operation"
        ),
        (
            DRIVER_HASH_INVALID_DIGEST_LEN,
            0x0003_0003,
            "Driver Error: Hash digest buffer size does not match the algorithm"
        ),
        (
            DRIVER_MGF_INVALID_PARAM,
            0x0003_0004,
            "Driver Error: MGF1 seed or output is empty"
        ),
        (
            DRIVER_RSA_INVALID_PARAM,
            0x0004_0001,
            "Driver Error: RSA invalid parameter"
        ),
        (
            DRIVER_RSA_INVALID_KEY_SIZE,
            0x0004_0002,
            "Driver Error: RSA modulus size is not supported"
        ),
        (
            DRIVER_RSA_MODEXP_FAILURE,
            0x0004_0003,
            "Driver Error: RSA modular exponentiation failed"
        ),
        (
            DRIVER_OAEP_INVALID_PARAM,
            0x0004_0004,
            "Driver Error: OAEP invalid parameter"
        ),
        (
            DRIVER_OAEP_INVALID_MSG_LEN,
            0x0004_0005,
            "Driver Error: OAEP message too long for the modulus"
        ),
        (
            DRIVER_OAEP_DECODE_FAILURE,
            0x0004_0006,
            "Driver Error: OAEP decode failed"
        ),
        (
            DRIVER_PSS_INVALID_PARAM,
            0x0004_0007,
            "Driver Error: PSS invalid parameter"
        ),
        (
            DRIVER_PSS_INVALID_SALT_LEN,
            0x0004_0008,
            "Driver Error: PSS salt longer than the digest"
        ),
        (
            DRIVER_PSS_INVALID_LEN,
            0x0004_0009,
            "Driver Error: PSS encoded message length is invalid"
        ),
        (
            DRIVER_PSS_VERIFICATION_FAILURE,
            0x0004_000A,
            "Driver Error: PSS signature verification failed"
        ),
        (
            DRIVER_AES_INVALID_KEY_SIZE,
            0x0005_0001,
            "Driver Error: AES key size is not supported"
        ),
        (
            DRIVER_AES_INVALID_DATA_LEN,
            0x0005_0002,
            "Driver Error: AES data length is not a multiple of the block size"
        ),
        (
            DRIVER_AES_FAILURE,
            0x0005_0003,
            "Driver Error: AES engine failure"
        ),
        (
            DRIVER_KEY_STORE_FULL,
            0x0006_0001,
            "Driver Error: Key store has no free slot"
        ),
        (
            DRIVER_KEY_STORE_INVALID_CAPACITY,
            0x0006_0002,
            "Driver Error: Key store capacity out of range"
        ),
        (
            DRIVER_KEY_STORE_INVALID_SLOT,
            0x0006_0003,
            "Driver Error: Key store slot index out of range"
        ),
        (
            DRIVER_KEY_STORE_SLOT_OCCUPIED,
            0x0006_0004,
            "Driver Error: Key store slot already occupied"
        ),
        (
            DRIVER_KEY_STORE_SLOT_EMPTY,
            0x0006_0005,
            "Driver Error: Key store slot holds no key"
        ),
        (
            DRIVER_KEY_UNWRAP_INVALID_SIZE,
            0x0006_0006,
            "Driver Error: Wrapped key record too short"
        ),
        (
            DRIVER_KEY_UNWRAP_UNSUPPORTED_KEY_SIZE,
            0x0006_0007,
            "Driver Error: Wrapped key payload is not a supported key size"
        ),
        (
            DRIVER_KEY_UNWRAP_SIZE_MISMATCH,
            0x0006_0008,
            "Driver Error: Ephemeral key size does not match the wrapped payload"
        ),
        (
            DRIVER_KEY_WRAP_UNSUPPORTED_KEY_SIZE,
            0x0006_0009,
            "Driver Error: Key to wrap is not a supported key size"
        ),
        (
            DRIVER_KEY_WRAP_INVALID_OUTPUT_LEN,
            0x0006_000A,
            "Driver Error: Wrapped key record buffer too small"
        ),
        (
            DRIVER_KEY_WRAP_SIZE_MISMATCH,
            0x0006_000B,
            "Driver Error: Key metadata size does not match the key to wrap"
        ),
        (
            DRIVER_ECC_INVALID_PARAM,
            0x0007_0001,
            "Driver Error: ECC invalid parameter"
        ),
        (
            DRIVER_ECC_EPHEMERAL_KEY_GEN_FAILURE,
            0x0007_0002,
            "Driver Error: ECC ephemeral key reduction failed"
        ),
        (
            CFI_PANIC_ASSERT_EQ_FAILURE,
            0x0008_0001,
            "CFI Panic: Assert equal failure"
        ),
        (
            CFI_PANIC_ASSERT_NE_FAILURE,
            0x0008_0002,
            "CFI Panic: Assert not equal failure"
        ),
        (
            CFI_PANIC_ASSERT_GT_FAILURE,
            0x0008_0003,
            "CFI Panic: Assert greater than failure"
        ),
        (
            CFI_PANIC_ASSERT_LT_FAILURE,
            0x0008_0004,
            "CFI Panic: Assert less than failure"
        ),
        (
            CFI_PANIC_ASSERT_GE_FAILURE,
            0x0008_0005,
            "CFI Panic: Assert greater than or equal failure"
        ),
        (
            CFI_PANIC_ASSERT_LE_FAILURE,
            0x0008_0006,
            "CFI Panic: Assert less than or equal failure"
        ),
        (
            CFI_PANIC_UNKNOWN,
            0x0008_0007,
            "CFI Panic: Unknown error"
        ),
        (
            CFI_CHECK_TWICE_MISMATCH,
            0x0008_0008,
            "CFI Error: Redundant computations disagree"
        ),
    ];
}

impl From<core::num::NonZeroU32> for crate::KeyfortError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::KeyfortError(val)
    }
}

impl From<KeyfortError> for core::num::NonZeroU32 {
    fn from(val: KeyfortError) -> Self {
        val.0
    }
}

impl From<KeyfortError> for u32 {
    fn from(val: KeyfortError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for KeyfortError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(KeyfortError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type KeyfortResult<T> = Result<T, KeyfortError>;
