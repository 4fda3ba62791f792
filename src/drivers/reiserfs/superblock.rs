//! On-disk superblock layout and probing (§4.5.1). Grounded in
//! `struct reiserfs_super_block` as consumed by
//! `fsw_reiserfs_volume_mount` in `fsw_reiserfs.c`.
//!
//! Unlike ext2, the superblock isn't at a fixed block number: it can
//! sit at byte offset 65536 (the common case) or, on filesystems built
//! with a smaller default blocksize, at byte offset 8192. Both are
//! tried in turn. The magic string also varies across the format's
//! three on-disk generations; any one of them is accepted.

use bytemuck::{Pod, Zeroable};

use crate::error::{FsError, FsResult};
use crate::host::HostAdapter;

pub const REISERFS_DISK_OFFSET_IN_BYTES: u64 = 65536;
pub const REISERFS_OLD_DISK_OFFSET_IN_BYTES: u64 = 8192;

const MAGIC_V1: &[u8] = b"ReIsErFs";
const MAGIC_V2: &[u8] = b"ReIsEr2Fs";
const MAGIC_V3: &[u8] = b"ReIsEr3Fs";

/// The leading portion of the on-disk superblock this driver consults.
/// The trailing journal-parameter block is represented as opaque
/// padding since this driver never replays the journal (§4.5 Non-goals).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ReiserfsSuperBlock {
    pub s_block_count: u32,
    pub s_free_blocks: u32,
    pub s_root_block: u32,
    s_journal_params: [u8; 32],
    pub s_blocksize: u16,
    pub s_oid_maxsize: u16,
    pub s_oid_cursize: u16,
    pub s_state: u16,
    pub s_magic: [u8; 10],
    pub s_fs_state: u16,
    pub s_hash_function_code: u32,
    pub s_tree_height: u16,
    pub s_bmap_nr: u16,
    pub s_version: u16,
    pub s_reserved_for_journal: u16,
    pub s_inode_generation: u32,
    pub s_flags: u32,
    pub s_uuid: [u8; 16],
    pub s_label: [u8; 16],
}

impl ReiserfsSuperBlock {
    /// `Some(true)` if the magic is recognized and (for the journal-
    /// relocated v3 magic) the version field names a format this driver
    /// understands; `Some(false)` if the magic is v3 but the version
    /// field doesn't; `None` if the magic isn't recognized at all
    /// (§4.5.1: "ReIsEr3Fs" requires `s_version` of 1 or 2).
    fn magic_check(&self) -> Option<bool> {
        if self.s_magic.starts_with(MAGIC_V3) {
            Some(self.s_version == 1 || self.s_version == 2)
        } else if self.s_magic.starts_with(MAGIC_V2) || self.s_magic.starts_with(MAGIC_V1) {
            Some(true)
        } else {
            None
        }
    }
}

/// Reads the superblock candidate at byte offset `at`, translated into
/// the block number of whatever blocksize `host` is currently probing
/// with. Returns `None` (not an error) if the read block doesn't carry
/// a recognized magic — the caller tries the next candidate offset.
fn try_read_at(
    host: &mut dyn HostAdapter,
    at: u64,
    probe_blocksize: u32,
) -> FsResult<Option<ReiserfsSuperBlock>> {
    let block_no = at / probe_blocksize as u64;
    let in_block_offset = (at % probe_blocksize as u64) as usize;
    let block = host.read_block(block_no)?;
    let end = in_block_offset + core::mem::size_of::<ReiserfsSuperBlock>();
    if end > block.len() {
        return Ok(None);
    }
    let sb: ReiserfsSuperBlock = *bytemuck::from_bytes(&block[in_block_offset..end]);
    match sb.magic_check() {
        Some(true) => Ok(Some(sb)),
        Some(false) => {
            log::debug!("reiserfs: journal-relocated magic with unsupported s_version {}", sb.s_version);
            Err(FsError::Unsupported)
        }
        None => Ok(None),
    }
}

/// Probes both standard superblock locations at a fixed 1024-byte
/// blocksize (a divisor of every blocksize this format supports, so
/// the byte offsets land on whole blocks either way), returning the
/// first recognized superblock.
pub fn probe(host: &mut dyn HostAdapter) -> FsResult<ReiserfsSuperBlock> {
    const PROBE_BLOCKSIZE: u32 = 1024;
    host.change_blocksize(512, 512, PROBE_BLOCKSIZE, PROBE_BLOCKSIZE);

    let sb = match try_read_at(host, REISERFS_DISK_OFFSET_IN_BYTES, PROBE_BLOCKSIZE)? {
        Some(sb) => sb,
        None => match try_read_at(host, REISERFS_OLD_DISK_OFFSET_IN_BYTES, PROBE_BLOCKSIZE)? {
            Some(sb) => sb,
            None => return Err(FsError::Unsupported),
        },
    };

    // An unfinished tree rebuild leaves no valid root block at all.
    if sb.s_root_block == u32::MAX {
        log::debug!("reiserfs: s_root_block is -1, unfinished rebuild");
        return Err(FsError::VolumeCorrupted);
    }

    Ok(sb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec;
    use alloc::vec::Vec;

    struct BlockHost {
        blocks: BTreeMap<u64, Vec<u8>>,
    }

    impl HostAdapter for BlockHost {
        fn read_block(&mut self, phys_bno: u64) -> FsResult<&[u8]> {
            self.blocks
                .get(&phys_bno)
                .map(|b| b.as_slice())
                .ok_or(FsError::NotFound)
        }

        fn change_blocksize(&mut self, _old_phys: u32, _old_log: u32, _new_phys: u32, _new_log: u32) {}
    }

    /// Builds a 1024-byte probe block holding a superblock at byte
    /// offset 65536 (block 64 at the 1024-byte probe size). Serializes
    /// an actual `ReiserfsSuperBlock` value rather than hand-computing
    /// byte offsets, so compiler-inserted padding can't skew the fields.
    fn host_with_superblock(magic: &[u8], version: u16, root_block: u32) -> BlockHost {
        let mut sb = ReiserfsSuperBlock::zeroed();
        sb.s_root_block = root_block;
        sb.s_magic[..magic.len()].copy_from_slice(magic);
        sb.s_version = version;
        sb.s_blocksize = 4096;

        let sb_bytes = bytemuck::bytes_of(&sb);
        assert!(sb_bytes.len() <= 1024);
        let mut block = vec![0u8; 1024];
        block[..sb_bytes.len()].copy_from_slice(sb_bytes);
        let mut blocks = BTreeMap::new();
        blocks.insert(REISERFS_DISK_OFFSET_IN_BYTES / 1024, block);
        BlockHost { blocks }
    }

    #[test]
    fn v2_magic_is_accepted_regardless_of_version_field() {
        let mut host = host_with_superblock(MAGIC_V2, 0, 17);
        let sb = probe(&mut host).unwrap();
        assert_eq!(sb.s_root_block, 17);
    }

    #[test]
    fn v3_magic_requires_version_one_or_two() {
        let mut host = host_with_superblock(MAGIC_V3, 1, 17);
        assert!(probe(&mut host).is_ok());

        let mut host = host_with_superblock(MAGIC_V3, 7, 17);
        let err = probe(&mut host).unwrap_err();
        assert!(matches!(err, FsError::Unsupported));
    }

    #[test]
    fn root_block_of_minus_one_is_volume_corrupted() {
        let mut host = host_with_superblock(MAGIC_V2, 0, u32::MAX);
        let err = probe(&mut host).unwrap_err();
        assert!(matches!(err, FsError::VolumeCorrupted));
    }
}
