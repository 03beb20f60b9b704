/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains common functions and macros to implement wait routines.

--*/

use keyfort_error::{KeyfortError, KeyfortResult};

/// Spin until `predicate` holds or `max_polls` evaluations have failed.
///
/// # Arguments
///
/// * `max_polls` - Poll budget
/// * `err` - Error returned once the budget is exhausted
/// * `predicate` - Condition to wait for
pub fn until_or_timeout<F>(max_polls: u32, err: KeyfortError, mut predicate: F) -> KeyfortResult<()>
where
    F: FnMut() -> bool,
{
    let mut polls = 0;
    while !predicate() {
        polls += 1;
        if polls >= max_polls {
            return Err(err);
        }
    }
    Ok(())
}
