/*++

Licensed under the Apache-2.0 license.

File Name:

    check_twice.rs

Abstract:

    File contains the redundant evaluation combinator used for security
    relevant decisions.

--*/

use crate::cfi_launder;
use keyfort_error::{KeyfortError, KeyfortResult};

/// Evaluate `f` twice and return the result only if both evaluations agree.
///
/// Each result is laundered before the comparison so the two evaluations
/// cannot be merged into one. A disagreement between the two evaluations
/// fails closed with `CFI_CHECK_TWICE_MISMATCH`. An error from either
/// evaluation is returned as is.
///
/// # Arguments
///
/// * `f` - Computation to evaluate
///
/// # Returns
///
/// * `T` - Agreed result
pub fn check_twice<T, F>(mut f: F) -> KeyfortResult<T>
where
    T: PartialEq,
    F: FnMut() -> KeyfortResult<T>,
{
    let first = cfi_launder(f()?);
    let second = cfi_launder(f()?);

    if cfi_launder(first == second) && cfi_launder(second == first) {
        Ok(first)
    } else {
        Err(KeyfortError::CFI_CHECK_TWICE_MISMATCH)
    }
}

/// Evaluate the predicate `f` twice and succeed only if both evaluations
/// return `true`.
///
/// A predicate that returns `false` twice yields `err`. Disagreement between
/// the two evaluations yields `CFI_CHECK_TWICE_MISMATCH`.
///
/// # Arguments
///
/// * `err` - Error returned when the predicate holds on neither evaluation
/// * `f` - Predicate to evaluate
pub fn check_twice_eq<F>(err: KeyfortError, mut f: F) -> KeyfortResult<()>
where
    F: FnMut() -> bool,
{
    let agreed = check_twice(|| Ok(f()))?;
    if cfi_launder(agreed) {
        Ok(())
    } else {
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreeing_results() {
        assert_eq!(check_twice(|| Ok(0x5a5a_u32)), Ok(0x5a5a));
    }

    #[test]
    fn test_single_flip_fails_closed() {
        let mut calls = 0u32;
        let result = check_twice(|| {
            calls += 1;
            // Glitch only the second evaluation.
            Ok(if calls == 2 { 0x8000_0001_u32 } else { 0x0000_0001 })
        });
        assert_eq!(result, Err(KeyfortError::CFI_CHECK_TWICE_MISMATCH));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_error_short_circuits() {
        let mut calls = 0u32;
        let result: KeyfortResult<u32> = check_twice(|| {
            calls += 1;
            Err(KeyfortError::KEYFORT_INTERNAL)
        });
        assert_eq!(result, Err(KeyfortError::KEYFORT_INTERNAL));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_predicate() {
        assert_eq!(check_twice_eq(KeyfortError::KEYFORT_INTERNAL, || true), Ok(()));
        assert_eq!(
            check_twice_eq(KeyfortError::KEYFORT_INTERNAL, || false),
            Err(KeyfortError::KEYFORT_INTERNAL)
        );

        let mut calls = 0u32;
        assert_eq!(
            check_twice_eq(KeyfortError::KEYFORT_INTERNAL, || {
                calls += 1;
                calls == 1
            }),
            Err(KeyfortError::CFI_CHECK_TWICE_MISMATCH)
        );
    }
}
