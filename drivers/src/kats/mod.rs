// Licensed under the Apache-2.0 license

mod trng_kat;

pub use trng_kat::{execute_trng_kat, TrngKat, TrngKatVector, TRNG_KAT_OUTPUT_LEN};
