//! B+-tree descent (§4.5.4). Grounded in `fsw_reiserfs_search_key` in
//! `fsw_reiserfs.c`.

use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::error::{FsError, FsResult};
use crate::host::HostAdapter;

use super::key::{parse_key, ItemType, Key, KEY_SIZE};

pub const DISK_LEAF_NODE_LEVEL: u16 = 1;
const BLKH_SIZE: usize = 24;
const IH_SIZE: usize = 24;
const DC_SIZE: usize = 8;

/// One matched leaf item. `data` is copied out of the host's block
/// buffer rather than borrowed from it: the buffer's lifetime ends at
/// the next `read_block` call, which the caller (a directory scan
/// walking multiple items, or an indirect-item block-pointer lookup)
/// will usually need to make before it's done with this result.
pub struct FoundItem {
    pub key: Key,
    pub item_type: ItemType,
    /// The union field at item-head byte offset 16..18 — entry count
    /// for directory items, free space for everything else. Only
    /// directory-item callers care about it.
    pub ih_free_space_or_entry_count: u16,
    pub data: Vec<u8>,
}

fn require_blkh(block: &[u8]) -> FsResult<()> {
    if block.len() < BLKH_SIZE {
        Err(FsError::VolumeCorrupted)
    } else {
        Ok(())
    }
}

/// Searches the tree rooted at `root_block` for the item that would
/// contain `search_key` were it present: an exact key match, or failing
/// that the item with the greatest key not exceeding it (the item an
/// indirect/direct offset lookup would need to find the page holding
/// that offset). Returns `Ok(None)` if no such item exists at all, and
/// rejects a found item whose object identity doesn't match
/// `search_key`'s (wrong file entirely, not just wrong offset).
pub fn search_key(
    host: &mut dyn HostAdapter,
    root_block: u32,
    search_key: Key,
) -> FsResult<Option<FoundItem>> {
    let mut block_no = root_block as u64;

    loop {
        let block = host.read_block(block_no)?;
        require_blkh(block)?;
        let level = u16::from_le_bytes(block[0..2].try_into().unwrap());
        let nr_item = u16::from_le_bytes(block[2..4].try_into().unwrap()) as usize;
        let keys_start = BLKH_SIZE;

        if level == DISK_LEAF_NODE_LEVEL {
            if keys_start + nr_item * IH_SIZE > block.len() {
                return Err(FsError::VolumeCorrupted);
            }

            let mut found_index = None;
            for i in 0..nr_item {
                let ih = &block[keys_start + i * IH_SIZE..keys_start + (i + 1) * IH_SIZE];
                let (key, _) = parse_key(&ih[0..KEY_SIZE]);
                match key.cmp_key(&search_key) {
                    Ordering::Equal => {
                        found_index = Some(i);
                        break;
                    }
                    Ordering::Less => found_index = Some(i),
                    Ordering::Greater => break,
                }
            }

            let Some(index) = found_index else {
                return Ok(None);
            };

            let ih = &block[keys_start + index * IH_SIZE..keys_start + (index + 1) * IH_SIZE];
            let (key, item_type) = parse_key(&ih[0..KEY_SIZE]);
            if key.dir_id != search_key.dir_id || key.objectid != search_key.objectid {
                return Ok(None);
            }

            let ih_free_space_or_entry_count = u16::from_le_bytes(ih[16..18].try_into().unwrap());
            let item_len = u16::from_le_bytes(ih[18..20].try_into().unwrap()) as usize;
            let item_location = u16::from_le_bytes(ih[20..22].try_into().unwrap()) as usize;
            if item_location.checked_add(item_len).map(|end| end > block.len()) != Some(false) {
                return Err(FsError::VolumeCorrupted);
            }

            return Ok(Some(FoundItem {
                key,
                item_type,
                ih_free_space_or_entry_count,
                data: block[item_location..item_location + item_len].to_vec(),
            }));
        }

        if keys_start + nr_item * KEY_SIZE + (nr_item + 1) * DC_SIZE > block.len() {
            return Err(FsError::VolumeCorrupted);
        }
        let children_start = keys_start + nr_item * KEY_SIZE;

        let mut child_index = nr_item;
        for i in 0..nr_item {
            let raw = &block[keys_start + i * KEY_SIZE..keys_start + (i + 1) * KEY_SIZE];
            let (key, _) = parse_key(raw);
            if key.cmp_key(&search_key) == Ordering::Greater {
                child_index = i;
                break;
            }
        }

        let dc = &block[children_start + child_index * DC_SIZE..children_start + (child_index + 1) * DC_SIZE];
        let next_block = u32::from_le_bytes(dc[0..4].try_into().unwrap());
        if next_block == 0 {
            return Err(FsError::VolumeCorrupted);
        }
        block_no = next_block as u64;
    }
}
