/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Keyfort entropy and key protection library.

--*/

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod printer;

mod block_cipher;
mod ecc_ephemeral;
mod entropy_source;
mod hash;
pub mod kats;
mod key_store;
mod key_unwrap;
mod key_wrap;
mod mgf;
mod oaep;
mod pss;
mod random;
mod rsa;
mod trng;
mod trng_hw;
mod trng_mmio;
mod wait;

#[cfg(test)]
mod test_util;

pub use block_cipher::{AesKeySize, BlockCipherEngine, AES_BLOCK_LEN};
pub use ecc_ephemeral::{EccCurve, EccEphemeralKey, ECC_EXTRA_RANDOM_BYTES, ECC_MAX_ORDER_LEN};
pub use hash::{Digest, HashAlgorithm, HashEngine, MAX_DIGEST_LEN};
pub use key_store::{
    KeyMetaData, KeySlot, KeyStore, KeyStoreHeader, KeyUsage, KEY_SLOT_LEN, KEY_SLOT_SECRET_LEN,
    KEY_STORE_HEADER_LEN, KEY_STORE_MAX_SLOTS, KEY_STORE_TAG, KEY_STORE_VERSION,
};
pub use key_unwrap::{KeyUnwrap, WrappedKeyRecord, WRAPPED_KEY_METADATA_LEN};
pub use key_wrap::KeyWrap;
pub use keyfort_error::{KeyfortError, KeyfortResult};
pub use mgf::Mgf1;
pub use oaep::{OaepCodec, OaepDecodeFault};
pub use pss::PssCodec;
pub use random::RandomSource;
pub use rsa::{ModExpEngine, RsaKeySize, RsaPrivateKey, RsaPublicKey, RSA_MAX_MODULUS_LEN};
pub use trng::{
    seed_len, Trng, TrngConfig, TrngErrorState, TrngMode, TrngState, TRNG_BLOCK_LEN,
    TRNG_DF_MAX_LEN, TRNG_DF_MIN_LEN, TRNG_MAX_SEED_LEN, TRNG_MAX_SEED_LIFE, TRNG_MIN_SEED_LIFE,
    TRNG_SEC_STRENGTH_IN_BYTES,
};
pub use trng_hw::{
    HardwareEntropySource, SettleDelay, TrngConf0, TrngConf1, TrngCtrl, TrngStatus,
    TRNG_BURST_SIZE_IN_WORDS, TRNG_PERS_STRING_LEN,
};
pub use trng_mmio::{MmioEntropySource, TrngRegisterMap, TrngSettleSpins};
