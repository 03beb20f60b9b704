/*++

Licensed under the Apache-2.0 license.

File Name:

    key_store.rs

Abstract:

    File contains the fixed capacity key store and its serialized layout.

--*/

use crate::cprintln;
use bitfield::bitfield;
use keyfort_error::{KeyfortError, KeyfortResult};
use zerocopy::{AsBytes, FromBytes};
use zeroize::Zeroize;

/// Largest number of slots a key store can hold.
pub const KEY_STORE_MAX_SLOTS: usize = 32;

/// Key store header tag, "KSTR".
pub const KEY_STORE_TAG: u32 = 0x5254_534B;

pub const KEY_STORE_VERSION: u32 = 1;

/// Secret bytes held by each slot.
pub const KEY_SLOT_SECRET_LEN: usize = 32;

pub const KEY_STORE_HEADER_LEN: usize = core::mem::size_of::<KeyStoreHeader>();

pub const KEY_SLOT_LEN: usize = core::mem::size_of::<KeySlot>();

bitfield! {
    /// Key Usage
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct KeyUsage(u32);

    /// Flag indicating if the key can be used to encrypt
    pub encrypt, set_encrypt: 0;

    /// Flag indicating if the key can be used to decrypt
    pub decrypt, set_decrypt: 1;

    /// Flag indicating if the key can be used to sign
    pub sign, set_sign: 2;

    /// Flag indicating if the key can be used to verify
    pub verify, set_verify: 3;

    /// Flag indicating if the key can wrap other keys
    pub wrap_key, set_wrap_key: 4;

    /// Flag indicating if the key can unwrap other keys
    pub unwrap_key, set_unwrap_key: 5;

    /// Flag indicating if the key can be used for key derivation
    pub derive, set_derive: 6;
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyStoreHeader {
    pub tag: u32,
    pub version: u32,
    pub capacity: u32,

    /// Bit `i` is set when slot `i` is occupied
    pub bitmap: u32,
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Clone, Copy, Debug, Default, PartialEq, Eq, Zeroize)]
pub struct KeyMetaData {
    pub usage: u32,

    /// Key length in bytes
    pub key_size: u32,

    pub owner_id: u32,

    pub reserved: u32,
}

impl KeyMetaData {
    pub fn key_usage(&self) -> KeyUsage {
        KeyUsage(self.usage)
    }
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Zeroize)]
pub struct KeySlot {
    pub secret: [u8; KEY_SLOT_SECRET_LEN],
    pub metadata: KeyMetaData,
}

impl KeySlot {
    /// Secret bytes in use, as recorded by the metadata.
    pub fn key(&self) -> &[u8] {
        let len = (self.metadata.key_size as usize).min(KEY_SLOT_SECRET_LEN);
        &self.secret[..len]
    }
}

#[repr(C)]
#[derive(AsBytes, FromBytes)]
struct KeyStoreImage {
    header: KeyStoreHeader,
    slots: [KeySlot; KEY_STORE_MAX_SLOTS],
}

/// Fixed capacity key store.
///
/// Slots are handed out by [`KeyStore::find_free_slot`] and become
/// permanently occupied once [`KeyStore::mark_occupied`] is called.
pub struct KeyStore {
    image: KeyStoreImage,
    cursor: u32,
}

impl KeyStore {
    /// Create an empty key store.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of usable slots, 1 to 32
    pub fn new(capacity: usize) -> KeyfortResult<Self> {
        if capacity == 0 || capacity > KEY_STORE_MAX_SLOTS {
            return Err(KeyfortError::DRIVER_KEY_STORE_INVALID_CAPACITY);
        }
        let mut image = KeyStoreImage::new_zeroed();
        image.header = KeyStoreHeader {
            tag: KEY_STORE_TAG,
            version: KEY_STORE_VERSION,
            capacity: capacity as u32,
            bitmap: 0,
        };
        Ok(Self { image, cursor: 0 })
    }

    pub fn header(&self) -> &KeyStoreHeader {
        &self.image.header
    }

    pub fn capacity(&self) -> usize {
        self.image.header.capacity as usize
    }

    pub fn bitmap(&self) -> u32 {
        self.image.header.bitmap
    }

    pub fn is_occupied(&self, idx: usize) -> bool {
        idx < self.capacity() && self.bitmap() & (1 << idx) != 0
    }

    pub fn occupied_count(&self) -> u32 {
        self.bitmap().count_ones()
    }

    /// Find a free slot, scanning from the rotating cursor.
    ///
    /// The slot is not reserved. The cursor moves past the returned slot.
    pub fn find_free_slot(&mut self) -> KeyfortResult<usize> {
        let capacity = self.image.header.capacity;
        for step in 0..capacity {
            let idx = (self.cursor + step) % capacity;
            if self.bitmap() & (1 << idx) == 0 {
                self.cursor = (idx + 1) % capacity;
                return Ok(idx as usize);
            }
        }
        self.cursor = (self.cursor + 1) % capacity;
        cprintln!("[keystore] Full");
        Err(KeyfortError::DRIVER_KEY_STORE_FULL)
    }

    /// Mark slot `idx` occupied.
    pub fn mark_occupied(&mut self, idx: usize) -> KeyfortResult<()> {
        if idx >= self.capacity() {
            return Err(KeyfortError::DRIVER_KEY_STORE_INVALID_SLOT);
        }
        if self.is_occupied(idx) {
            return Err(KeyfortError::DRIVER_KEY_STORE_SLOT_OCCUPIED);
        }
        self.image.header.bitmap |= 1 << idx;
        cprintln!("[keystore] Slot {} allocated", idx as u32);
        Ok(())
    }

    /// Read access to occupied slot `idx`.
    pub fn slot(&self, idx: usize) -> KeyfortResult<&KeySlot> {
        if idx >= self.capacity() {
            return Err(KeyfortError::DRIVER_KEY_STORE_INVALID_SLOT);
        }
        if !self.is_occupied(idx) {
            return Err(KeyfortError::DRIVER_KEY_STORE_SLOT_EMPTY);
        }
        Ok(&self.image.slots[idx])
    }

    /// Write access to free slot `idx`, used while it is being filled.
    pub(crate) fn free_slot_mut(&mut self, idx: usize) -> KeyfortResult<&mut KeySlot> {
        if idx >= self.capacity() {
            return Err(KeyfortError::DRIVER_KEY_STORE_INVALID_SLOT);
        }
        if self.is_occupied(idx) {
            return Err(KeyfortError::DRIVER_KEY_STORE_SLOT_OCCUPIED);
        }
        Ok(&mut self.image.slots[idx])
    }

    /// Serialized image: the header followed by `capacity` slots.
    pub fn as_bytes(&self) -> &[u8] {
        let len = KEY_STORE_HEADER_LEN + self.capacity() * KEY_SLOT_LEN;
        &self.image.as_bytes()[..len]
    }
}

impl Drop for KeyStore {
    fn drop(&mut self) {
        self.image.slots.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(KEY_STORE_HEADER_LEN, 16);
        assert_eq!(core::mem::size_of::<KeyMetaData>(), 16);
        assert_eq!(KEY_SLOT_LEN, 48);
    }

    #[test]
    fn test_new() {
        let store = KeyStore::new(4).unwrap();
        let bytes = store.as_bytes();
        assert_eq!(bytes.len(), 16 + 4 * 48);
        assert_eq!(bytes[..4], KEY_STORE_TAG.to_le_bytes());
        assert_eq!(&bytes[..4], b"KSTR");
        assert_eq!(bytes[4..8], KEY_STORE_VERSION.to_le_bytes());
        assert_eq!(bytes[8..12], 4u32.to_le_bytes());
        assert_eq!(bytes[12..16], [0u8; 4]);

        assert!(KeyStore::new(0).is_err());
        assert_eq!(
            KeyStore::new(33).map(|s| s.capacity()),
            Err(KeyfortError::DRIVER_KEY_STORE_INVALID_CAPACITY)
        );
        assert_eq!(KeyStore::new(32).map(|s| s.capacity()), Ok(32));
    }

    #[test]
    fn test_find_free_slot_rotates() {
        let mut store = KeyStore::new(3).unwrap();
        assert_eq!(store.find_free_slot(), Ok(0));
        assert_eq!(store.find_free_slot(), Ok(1));
        assert_eq!(store.find_free_slot(), Ok(2));
        assert_eq!(store.find_free_slot(), Ok(0));

        store.mark_occupied(1).unwrap();
        assert_eq!(store.find_free_slot(), Ok(2));
        assert_eq!(store.find_free_slot(), Ok(0));
        assert_eq!(store.find_free_slot(), Ok(2));
    }

    #[test]
    fn test_full_store() {
        let mut store = KeyStore::new(32).unwrap();
        for _ in 0..32 {
            let idx = store.find_free_slot().unwrap();
            store.mark_occupied(idx).unwrap();
        }
        assert_eq!(store.bitmap(), u32::MAX);
        assert_eq!(store.occupied_count(), 32);
        assert_eq!(
            store.find_free_slot(),
            Err(KeyfortError::DRIVER_KEY_STORE_FULL)
        );
    }

    #[test]
    fn test_mark_occupied_checks() {
        let mut store = KeyStore::new(8).unwrap();
        assert_eq!(
            store.mark_occupied(8),
            Err(KeyfortError::DRIVER_KEY_STORE_INVALID_SLOT)
        );
        store.mark_occupied(5).unwrap();
        assert_eq!(
            store.mark_occupied(5),
            Err(KeyfortError::DRIVER_KEY_STORE_SLOT_OCCUPIED)
        );
        assert_eq!(store.bitmap(), 1 << 5);
        assert_eq!(store.as_bytes()[12..16], (1u32 << 5).to_le_bytes());
    }

    #[test]
    fn test_occupied_slot_never_reissued() {
        let mut store = KeyStore::new(4).unwrap();
        store.mark_occupied(0).unwrap();
        store.mark_occupied(2).unwrap();
        for _ in 0..10 {
            let idx = store.find_free_slot().unwrap();
            assert!(idx == 1 || idx == 3);
        }
    }

    #[test]
    fn test_slot_access() {
        let mut store = KeyStore::new(2).unwrap();
        assert_eq!(
            store.slot(0).map(|s| s.metadata),
            Err(KeyfortError::DRIVER_KEY_STORE_SLOT_EMPTY)
        );
        {
            let slot = store.free_slot_mut(1).unwrap();
            slot.secret[..16].copy_from_slice(&[0x11; 16]);
            slot.metadata.key_size = 16;
            slot.metadata.owner_id = 7;
        }
        store.mark_occupied(1).unwrap();
        let slot = store.slot(1).unwrap();
        assert_eq!(slot.key(), &[0x11; 16]);
        assert_eq!(slot.metadata.owner_id, 7);
        assert!(store.free_slot_mut(1).is_err());
        assert_eq!(
            store.slot(2).map(|s| s.metadata),
            Err(KeyfortError::DRIVER_KEY_STORE_INVALID_SLOT)
        );

        let bytes = store.as_bytes();
        let slot1 = &bytes[16 + 48..16 + 96];
        assert_eq!(slot1[..16], [0x11; 16]);
        assert_eq!(slot1[32 + 4..32 + 8], 16u32.to_le_bytes());
    }

    #[test]
    fn test_key_usage() {
        let mut usage = KeyUsage(0);
        usage.set_decrypt(true);
        usage.set_unwrap_key(true);
        let meta = KeyMetaData {
            usage: usage.0,
            ..Default::default()
        };
        assert!(meta.key_usage().decrypt());
        assert!(meta.key_usage().unwrap_key());
        assert!(!meta.key_usage().sign());
    }
}
