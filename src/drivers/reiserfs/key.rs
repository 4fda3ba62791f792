//! Key model and ordering (§4.5.3). Grounded in `struct key` and
//! `fsw_reiserfs_compare_key` in `fsw_reiserfs.c`.
//!
//! ReiserFS shipped two incompatible on-disk key layouts: v1 keeps a
//! separate 32-bit offset and a 32-bit "uniqueness" tag that doubles as
//! the item type; v2 packs a 60-bit offset and a 4-bit type into one
//! 64-bit field. A key's own bytes say which layout it's in: if the top
//! nibble names one of the three non-stat-data item types, it's a v2
//! key; otherwise it's read as v1. Ordering only ever compares object
//! identity and offset, never type, matching the original.

use core::cmp::Ordering;

use modular_bitfield::bitfield;
use modular_bitfield::prelude::{B4, B60};

pub const KEY_SIZE: usize = 16;

pub const TYPE_INDIRECT: u8 = 1;
pub const TYPE_DIRECT: u8 = 2;
pub const TYPE_DIRENTRY: u8 = 3;

pub const V1_SD_UNIQUENESS: u32 = 0;
pub const V1_INDIRECT_UNIQUENESS: u32 = 0xffff_fffe;
pub const V1_DIRECT_UNIQUENESS: u32 = 0xffff_ffff;
pub const V1_DIRENTRY_UNIQUENESS: u32 = 500;

/// The packed tail of a v2 key: a 60-bit byte offset followed by a
/// 4-bit item-type tag, least-significant field first.
#[bitfield]
#[derive(Clone, Copy)]
struct V2KeyTail {
    offset: B60,
    item_type: B4,
}

/// The ordering-relevant part of a key: object identity plus a byte
/// offset within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub dir_id: u32,
    pub objectid: u32,
    pub offset: u64,
}

impl Key {
    pub fn new(dir_id: u32, objectid: u32, offset: u64) -> Self {
        Key {
            dir_id,
            objectid,
            offset,
        }
    }

    pub fn cmp_key(&self, other: &Key) -> Ordering {
        self.dir_id
            .cmp(&other.dir_id)
            .then(self.objectid.cmp(&other.objectid))
            .then(self.offset.cmp(&other.offset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    StatData,
    Indirect,
    Direct,
    DirEntry,
    Unknown,
}

/// Parses 16 raw on-disk key bytes into a comparable [`Key`] plus the
/// item type the key's own encoding reveals.
pub fn parse_key(bytes: &[u8]) -> (Key, ItemType) {
    let dir_id = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let objectid = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    let raw = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
    let tail = V2KeyTail::from_bytes(raw.to_le_bytes());
    let type_nibble = tail.item_type();

    match type_nibble {
        TYPE_INDIRECT | TYPE_DIRECT | TYPE_DIRENTRY => {
            let offset = tail.offset();
            let item_type = match type_nibble {
                TYPE_INDIRECT => ItemType::Indirect,
                TYPE_DIRECT => ItemType::Direct,
                _ => ItemType::DirEntry,
            };
            (Key::new(dir_id, objectid, offset), item_type)
        }
        _ => {
            let offset = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as u64;
            let uniqueness = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
            let item_type = match uniqueness {
                V1_SD_UNIQUENESS => ItemType::StatData,
                V1_INDIRECT_UNIQUENESS => ItemType::Indirect,
                V1_DIRECT_UNIQUENESS => ItemType::Direct,
                V1_DIRENTRY_UNIQUENESS => ItemType::DirEntry,
                _ => ItemType::Unknown,
            };
            (Key::new(dir_id, objectid, offset), item_type)
        }
    }
}
