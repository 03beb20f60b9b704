/*++

Licensed under the Apache-2.0 license.

File Name:

    cfi.rs

Abstract:

    File contains value laundering and the hardened comparison asserts.

--*/

use keyfort_error::KeyfortError;

/// Reason reported to the platform fault handler.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CfiPanicInfo {
    AssertEqFail,
    AssertNeFail,
    AssertGtFail,
    AssertLtFail,
    AssertGeFail,
    AssertLeFail,
    UnknownError,
}

impl From<CfiPanicInfo> for KeyfortError {
    fn from(info: CfiPanicInfo) -> KeyfortError {
        match info {
            CfiPanicInfo::AssertEqFail => KeyfortError::CFI_PANIC_ASSERT_EQ_FAILURE,
            CfiPanicInfo::AssertNeFail => KeyfortError::CFI_PANIC_ASSERT_NE_FAILURE,
            CfiPanicInfo::AssertGtFail => KeyfortError::CFI_PANIC_ASSERT_GT_FAILURE,
            CfiPanicInfo::AssertLtFail => KeyfortError::CFI_PANIC_ASSERT_LT_FAILURE,
            CfiPanicInfo::AssertGeFail => KeyfortError::CFI_PANIC_ASSERT_GE_FAILURE,
            CfiPanicInfo::AssertLeFail => KeyfortError::CFI_PANIC_ASSERT_LE_FAILURE,
            CfiPanicInfo::UnknownError => KeyfortError::CFI_PANIC_UNKNOWN,
        }
    }
}

/// Hide `val` from the optimizer so redundant checks on it survive.
///
/// Without the `cfi` feature this is the identity.
#[inline(always)]
pub fn cfi_launder<T>(val: T) -> T {
    if cfg!(feature = "cfi") {
        core::hint::black_box(val)
    } else {
        val
    }
}

/// Report a detected glitch and stop.
///
/// Firmware builds with `cfi` call the platform supplied
/// `keyfort_cfi_fault(code)`. Every other build panics.
#[inline(never)]
pub fn cfi_panic(info: CfiPanicInfo) -> ! {
    let info = cfi_launder(info);

    #[cfg(all(feature = "cfi", not(feature = "cfi-test")))]
    {
        extern "C" {
            fn keyfort_cfi_fault(code: u32) -> !;
        }
        unsafe { keyfort_cfi_fault(KeyfortError::from(info).into()) }
    }

    #[cfg(any(not(feature = "cfi"), feature = "cfi-test"))]
    {
        panic!("CFI fault {:?}", info);
    }
}

macro_rules! cfi_assert_fn {
    ($name:ident, $op:tt, $bound:path, $info:ident) => {
        /// Hardened comparison, evaluated a second time on laundered operands
        /// when `cfi` is enabled.
        #[inline(always)]
        pub fn $name<T: $bound + Copy>(lhs: T, rhs: T) {
            if cfg!(feature = "cfi") {
                if !(lhs $op rhs) || !(cfi_launder(lhs) $op cfi_launder(rhs)) {
                    cfi_panic(CfiPanicInfo::$info);
                }
            }
        }
    };
}

cfi_assert_fn!(cfi_assert_eq, ==, PartialEq, AssertEqFail);
cfi_assert_fn!(cfi_assert_ne, !=, PartialEq, AssertNeFail);
cfi_assert_fn!(cfi_assert_gt, >, Ord, AssertGtFail);
cfi_assert_fn!(cfi_assert_lt, <, Ord, AssertLtFail);
cfi_assert_fn!(cfi_assert_ge, >=, Ord, AssertGeFail);
cfi_assert_fn!(cfi_assert_le, <=, Ord, AssertLeFail);

/// Assert that a boolean condition holds.
#[macro_export]
macro_rules! cfi_assert {
    ($cond:expr) => {
        $crate::cfi_assert_eq($cond, true)
    };
}
