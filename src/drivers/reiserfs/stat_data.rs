//! Stat-data item parsing (§4.5.2). Grounded in `struct stat_data`/
//! `struct stat_data_v1` and `fsw_reiserfs_dnode_fill` in
//! `fsw_reiserfs.c`.
//!
//! ReiserFS carries no per-item version tag; which of the two stat-data
//! layouts an item uses is decided purely by its length (the v1 format
//! predates the v2 format and the two are never the same size).

use crate::core::stat::{DnodeStat, PosixTimes};
use crate::driver::DnodeKind;
use crate::error::{FsError, FsResult};

pub const STAT_DATA_V1_LEN: usize = 32;
pub const STAT_DATA_V2_LEN: usize = 44;

const S_IFMT: u16 = 0xF000;
const S_IFREG: u16 = 0x8000;
const S_IFDIR: u16 = 0x4000;
const S_IFLNK: u16 = 0xA000;

/// The fields this driver actually needs out of either stat-data
/// layout, already normalized.
#[derive(Debug, Clone, Copy)]
pub struct StatData {
    pub mode: u16,
    pub size: u64,
    pub nlink: u32,
    pub blocks: u32,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
}

impl StatData {
    pub fn kind(&self) -> DnodeKind {
        match self.mode & S_IFMT {
            S_IFREG => DnodeKind::File,
            S_IFDIR => DnodeKind::Dir,
            S_IFLNK => DnodeKind::Symlink,
            _ => DnodeKind::Special,
        }
    }

    pub fn to_dnode_stat(self) -> DnodeStat {
        DnodeStat {
            used_bytes: self.blocks as u64 * 512,
            times: PosixTimes {
                atime: self.atime as u64,
                mtime: self.mtime as u64,
                ctime: self.ctime as u64,
            },
            posix_mode: self.mode as u32,
        }
    }
}

/// Parses a stat-data item's raw bytes, picking v1 or v2 layout by
/// length alone.
pub fn parse(bytes: &[u8]) -> FsResult<StatData> {
    match bytes.len() {
        STAT_DATA_V1_LEN => Ok(parse_v1(bytes)),
        STAT_DATA_V2_LEN => Ok(parse_v2(bytes)),
        _ => Err(FsError::VolumeCorrupted),
    }
}

fn parse_v1(b: &[u8]) -> StatData {
    let u16_at = |o: usize| u16::from_le_bytes([b[o], b[o + 1]]);
    let u32_at = |o: usize| u32::from_le_bytes([b[o], b[o + 1], b[o + 2], b[o + 3]]);
    StatData {
        mode: u16_at(0),
        nlink: u16_at(2) as u32,
        size: u32_at(8) as u64,
        atime: u32_at(12),
        mtime: u32_at(16),
        ctime: u32_at(20),
        blocks: u32_at(24),
    }
}

fn parse_v2(b: &[u8]) -> StatData {
    let u16_at = |o: usize| u16::from_le_bytes([b[o], b[o + 1]]);
    let u32_at = |o: usize| u32::from_le_bytes([b[o], b[o + 1], b[o + 2], b[o + 3]]);
    let u64_at = |o: usize| {
        u64::from_le_bytes([
            b[o],
            b[o + 1],
            b[o + 2],
            b[o + 3],
            b[o + 4],
            b[o + 5],
            b[o + 6],
            b[o + 7],
        ])
    };
    StatData {
        mode: u16_at(0),
        nlink: u32_at(4),
        size: u64_at(8),
        atime: u32_at(24),
        mtime: u32_at(28),
        ctime: u32_at(32),
        blocks: u32_at(36),
    }
}
