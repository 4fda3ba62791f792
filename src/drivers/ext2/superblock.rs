//! On-disk superblock layout (§4.4.1). Grounded in `struct ext2_super_block`
//! as consumed by `fsw_ext2_volume_mount` in `fsw_ext2.c`.

use bytemuck::{Pod, Zeroable};

pub const EXT2_SUPER_MAGIC: u16 = 0xEF53;
pub const EXT2_SUPERBLOCK_BLOCKNO: u64 = 1;
pub const EXT2_SUPERBLOCK_BLOCKSIZE: u32 = 1024;

pub const EXT2_GOOD_OLD_REV: u32 = 0;
pub const EXT2_DYNAMIC_REV: u32 = 1;
pub const EXT2_GOOD_OLD_INODE_SIZE: u32 = 128;

pub const EXT2_ROOT_INO: u64 = 2;

pub const EXT2_FEATURE_INCOMPAT_COMPRESSION: u32 = 0x0001;
pub const EXT2_FEATURE_INCOMPAT_FILETYPE: u32 = 0x0002;
pub const EXT3_FEATURE_INCOMPAT_RECOVER: u32 = 0x0004;
pub const EXT2_FEATURE_INCOMPAT_JOURNAL_DEV: u32 = 0x0008;
pub const EXT2_FEATURE_INCOMPAT_META_BG: u32 = 0x0010;

/// The only incompat features this driver understands the on-disk layout
/// implications of (§4.4.1): a DYNAMIC-revision superblock advertising
/// any bit outside this mask is rejected rather than risk misreading
/// inode/extent data, regardless of whether that bit names a feature
/// this driver happens to recognize by name.
pub const EXT2_ALLOWED_INCOMPAT: u32 = EXT2_FEATURE_INCOMPAT_FILETYPE | EXT3_FEATURE_INCOMPAT_RECOVER;

/// The leading portion of the on-disk superblock this driver actually
/// consults. Plain integer fields, no per-field newtype wrapping or
/// explicit byteswap: the host architecture is little-endian, matching
/// the on-disk format directly.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Ext2SuperBlock {
    pub s_inodes_count: u32,
    pub s_blocks_count: u32,
    pub s_r_blocks_count: u32,
    pub s_free_blocks_count: u32,
    pub s_free_inodes_count: u32,
    pub s_first_data_block: u32,
    pub s_log_block_size: u32,
    pub s_log_frag_size: u32,
    pub s_blocks_per_group: u32,
    pub s_frags_per_group: u32,
    pub s_inodes_per_group: u32,
    pub s_mtime: u32,
    pub s_wtime: u32,
    pub s_mnt_count: u16,
    pub s_max_mnt_count: u16,
    pub s_magic: u16,
    pub s_state: u16,
    pub s_errors: u16,
    pub s_minor_rev_level: u16,
    pub s_lastcheck: u32,
    pub s_checkinterval: u32,
    pub s_creator_os: u32,
    pub s_rev_level: u32,
    pub s_def_resuid: u16,
    pub s_def_resgid: u16,
    pub s_first_ino: u32,
    pub s_inode_size: u16,
    pub s_block_group_nr: u16,
    pub s_feature_compat: u32,
    pub s_feature_incompat: u32,
    pub s_feature_ro_compat: u32,
    pub s_uuid: [u8; 16],
    pub s_volume_name: [u8; 16],
}

impl Ext2SuperBlock {
    pub fn block_size(&self) -> u32 {
        1024 << self.s_log_block_size
    }

    pub fn inode_size(&self) -> u32 {
        if self.s_rev_level == EXT2_GOOD_OLD_REV {
            EXT2_GOOD_OLD_INODE_SIZE
        } else {
            self.s_inode_size as u32
        }
    }

    pub fn groups_count(&self) -> u32 {
        self.s_blocks_count.div_ceil(self.s_blocks_per_group.max(1))
    }

    /// Only GOOD_OLD and DYNAMIC revisions have a known layout; anything
    /// else might mean fields past what this driver reads are laid out
    /// differently than expected (§4.4.1).
    pub fn has_known_revision(&self) -> bool {
        self.s_rev_level == EXT2_GOOD_OLD_REV || self.s_rev_level == EXT2_DYNAMIC_REV
    }
}

/// One block group's descriptor (§4.4.2).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Ext2GroupDesc {
    pub bg_block_bitmap: u32,
    pub bg_inode_bitmap: u32,
    pub bg_inode_table: u32,
    pub bg_free_blocks_count: u16,
    pub bg_free_inodes_count: u16,
    pub bg_used_dirs_count: u16,
    pub bg_pad: u16,
    pub bg_reserved: [u32; 3],
}
