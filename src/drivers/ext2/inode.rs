//! On-disk inode layout and the `DnodeData` payload for this driver
//! (§4.4.2). Grounded in `struct ext2_inode` and `fsw_ext2_dnode_fill`/
//! `fsw_ext2_dnode_stat` in `fsw_ext2.c`.

use bytemuck::{Pod, Zeroable};

use crate::driver::DnodeKind;

pub const EXT2_NDIR_BLOCKS: usize = 12;
pub const EXT2_IND_BLOCK: usize = EXT2_NDIR_BLOCKS;
pub const EXT2_DIND_BLOCK: usize = EXT2_NDIR_BLOCKS + 1;
pub const EXT2_TIND_BLOCK: usize = EXT2_NDIR_BLOCKS + 2;
pub const EXT2_N_BLOCKS: usize = EXT2_NDIR_BLOCKS + 3;

const S_IFMT: u16 = 0xF000;
const S_IFREG: u16 = 0x8000;
const S_IFDIR: u16 = 0x4000;
const S_IFLNK: u16 = 0xA000;

/// The first 128 bytes of an on-disk inode record, the portion present
/// regardless of `s_inode_size`. Larger inodes carry extended-attribute
/// data past this point that this driver never reads.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Ext2Inode {
    pub i_mode: u16,
    pub i_uid: u16,
    pub i_size: u32,
    pub i_atime: u32,
    pub i_ctime: u32,
    pub i_mtime: u32,
    pub i_dtime: u32,
    pub i_gid: u16,
    pub i_links_count: u16,
    pub i_blocks: u32,
    pub i_flags: u32,
    pub i_osd1: u32,
    pub i_block: [u32; EXT2_N_BLOCKS],
    pub i_generation: u32,
    pub i_file_acl: u32,
    pub i_dir_acl: u32,
    pub i_faddr: u32,
    pub i_osd2: [u8; 12],
}

impl Ext2Inode {
    pub fn kind(&self) -> DnodeKind {
        match self.i_mode & S_IFMT {
            S_IFREG => DnodeKind::File,
            S_IFDIR => DnodeKind::Dir,
            S_IFLNK => DnodeKind::Symlink,
            _ => DnodeKind::Special,
        }
    }

    /// `i_size` is the 32-bit low half of the file size; this driver
    /// does not interpret `i_dir_acl` as a size-high field for regular
    /// files, matching the original (§4.4.2 Non-goals: no >4GiB files).
    pub fn size(&self) -> u64 {
        self.i_size as u64
    }
}

/// Per-dnode state: the raw inode once `dnode_fill` has read it.
#[derive(Default)]
pub struct Ext2DnodeData {
    pub raw: Option<Ext2Inode>,
}
