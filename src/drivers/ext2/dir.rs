//! Linear directory-entry scan (§4.4.2). Grounded in
//! `fsw_ext2_read_dentry`/`fsw_ext2_dir_lookup`/`fsw_ext2_dir_read` in
//! `fsw_ext2.c`.

use alloc::vec;
use bytemuck::{Pod, Zeroable};
use pod_enum::pod_enum;

use crate::core::extent::Extent;
use crate::core::shandle::splice_read;
use crate::driver::{DirEntry, DnodeId, DnodeKind};
use crate::error::{FsError, FsResult};
use crate::host::HostAdapter;
use crate::string::EncodedString;

use super::inode::Ext2DnodeData;
use super::Ext2Driver;

/// The `file_type` byte `EXT2_FEATURE_INCOMPAT_FILETYPE` adds to each
/// dentry. Any value this driver doesn't recognize decodes to an
/// "Unknown" variant rather than panicking, which is what lets
/// `Ext2DirEntryHead` stay `bytemuck::Pod` and be read straight out of
/// the raw block with no separate validation pass.
#[pod_enum]
#[repr(u8)]
pub enum Ext2FileType {
    Unknown = 0,
    Regular = 1,
    Dir = 2,
    CharDevice = 3,
    BlockDevice = 4,
    Fifo = 5,
    Socket = 6,
    Symlink = 7,
}

/// `struct ext2_dir_entry`'s fixed 8-byte header; the name bytes and
/// trailing padding to `rec_len` follow it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Ext2DirEntryHead {
    pub inode: u32,
    pub rec_len: u16,
    pub name_len: u8,
    pub file_type: Ext2FileType,
}

const HEAD_SIZE: usize = core::mem::size_of::<Ext2DirEntryHead>();

/// A single directory-entry read at `*pos`, advancing it past the
/// entry's `rec_len` on success. `Ok(None)` at end of directory.
fn read_dentry(
    host: &mut dyn HostAdapter,
    vol: &super::Ext2VolumeData,
    id: DnodeId,
    data: &Ext2DnodeData,
    size: u64,
    extent: &mut Extent,
    pos: &mut u64,
) -> FsResult<Option<(u32, EncodedString)>> {
    if *pos >= size {
        return Ok(None);
    }

    let mut head_buf = [0u8; HEAD_SIZE];
    splice_read::<Ext2Driver>(
        host,
        vol,
        id,
        data,
        size,
        vol.block_size,
        vol.block_size,
        extent,
        pos,
        &mut head_buf,
    )?;
    let head: Ext2DirEntryHead = *bytemuck::from_bytes(&head_buf);

    if (head.rec_len as usize) < HEAD_SIZE + head.name_len as usize {
        return Err(FsError::VolumeCorrupted);
    }

    let mut name_buf = vec![0u8; head.name_len as usize];
    splice_read::<Ext2Driver>(
        host,
        vol,
        id,
        data,
        size,
        vol.block_size,
        vol.block_size,
        extent,
        pos,
        &mut name_buf,
    )?;

    let padding = head.rec_len as u64 - HEAD_SIZE as u64 - head.name_len as u64;
    *pos += padding;

    if head.inode == 0 {
        // A deleted entry still occupies its rec_len slot; skip it.
        return Ok(Some((0, EncodedString::Empty)));
    }

    // The on-disk file_type hint isn't trusted for the dnode's kind (a
    // volume without EXT2_FEATURE_INCOMPAT_FILETYPE leaves it zeroed);
    // the core always fills that from the inode itself. Logged only.
    log::trace!("ext2 dentry inode={} file_type={:?}", head.inode, head.file_type);

    Ok(Some((head.inode, EncodedString::from_iso8859_1_exact(name_buf))))
}

pub(super) fn dir_lookup(
    host: &mut dyn HostAdapter,
    vol: &super::Ext2VolumeData,
    id: DnodeId,
    data: &Ext2DnodeData,
    size: u64,
    name: &EncodedString,
) -> FsResult<DirEntry> {
    let mut extent = Extent::invalid();
    let mut pos = 0u64;
    loop {
        match read_dentry(host, vol, id, data, size, &mut extent, &mut pos)? {
            None => return Err(FsError::NotFound),
            Some((0, _)) => continue,
            Some((inode, entry_name)) => {
                if entry_name.eq(name) {
                    return Ok(DirEntry {
                        id: inode as DnodeId,
                        kind: DnodeKind::Unknown,
                        name: entry_name,
                    });
                }
            }
        }
    }
}

pub(super) fn dir_read(
    host: &mut dyn HostAdapter,
    vol: &super::Ext2VolumeData,
    id: DnodeId,
    data: &Ext2DnodeData,
    size: u64,
    pos: &mut u64,
) -> FsResult<Option<DirEntry>> {
    let mut extent = Extent::invalid();
    loop {
        match read_dentry(host, vol, id, data, size, &mut extent, pos)? {
            None => return Ok(None),
            Some((0, _)) => continue,
            Some((inode, entry_name)) => {
                return Ok(Some(DirEntry {
                    id: inode as DnodeId,
                    kind: DnodeKind::Unknown,
                    name: entry_name,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec;
    use bytemuck::Zeroable;

    use crate::drivers::ext2::{Ext2Inode, Ext2SuperBlock, Ext2VolumeData};

    struct BlockHost {
        blocks: BTreeMap<u64, alloc::vec::Vec<u8>>,
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

    const BLOCK_SIZE: u32 = 1024;

    fn test_volume() -> Ext2VolumeData {
        Ext2VolumeData {
            superblock: Ext2SuperBlock::zeroed(),
            block_size: BLOCK_SIZE,
            ind_bcnt: BLOCK_SIZE / 4,
            dind_bcnt: (BLOCK_SIZE / 4) * (BLOCK_SIZE / 4),
            inode_size: 128,
        }
    }

    /// A directory data block holding one entry whose `rec_len` (4) is
    /// shorter than the 8-byte fixed header it claims to carry.
    #[test]
    fn rec_len_shorter_than_the_header_is_refused_without_looping() {
        let mut data_block = vec![0u8; BLOCK_SIZE as usize];
        data_block[0..4].copy_from_slice(&1u32.to_le_bytes()); // inode
        data_block[4..6].copy_from_slice(&4u16.to_le_bytes()); // rec_len

        let mut blocks = BTreeMap::new();
        blocks.insert(5u64, data_block);
        let mut host = BlockHost { blocks };

        let mut raw = Ext2Inode::zeroed();
        raw.i_block[0] = 5;
        let data = Ext2DnodeData { raw: Some(raw) };

        let vol = test_volume();
        let name = EncodedString::from_iso8859_1_exact(b"anything".to_vec());
        let err = dir_lookup(&mut host, &vol, 1, &data, BLOCK_SIZE as u64, &name).unwrap_err();
        assert!(matches!(err, FsError::VolumeCorrupted));
    }
}
