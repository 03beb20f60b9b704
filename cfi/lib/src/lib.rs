/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

--*/

#![no_std]
extern crate core;

mod cfi;
mod check_twice;

pub use cfi::*;
pub use check_twice::{check_twice, check_twice_eq};
