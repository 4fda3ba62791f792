//! ext2/ext3 driver (§4.4). Grounded in `fsw_ext2_volume_mount`,
//! `fsw_ext2_dnode_fill`/`_stat`, `fsw_ext2_get_extent`, and
//! `fsw_ext2_dir_lookup`/`_read` in `fsw_ext2.c`/`fsw_ext2.h`. Mounts
//! ext3 volumes identically to ext2 — the journal is simply never read,
//! matching the original's treatment of `EXT3_FEATURE_INCOMPAT_RECOVER`
//! as informational only.

mod dir;
mod inode;
mod superblock;

use core::mem::size_of;

use crate::core::extent::Extent;
use crate::core::stat::{DnodeStat, PosixTimes, VolumeStat};
use crate::driver::{DirEntry, DnodeId, DnodeKind, FsDriver, MountResult};
use crate::error::{FsError, FsResult};
use crate::host::HostAdapter;
use crate::string::EncodedString;

pub use inode::Ext2Inode;
use inode::{Ext2DnodeData, EXT2_DIND_BLOCK, EXT2_IND_BLOCK, EXT2_NDIR_BLOCKS, EXT2_TIND_BLOCK};
pub use superblock::Ext2SuperBlock;
use superblock::{
    Ext2GroupDesc, EXT2_ALLOWED_INCOMPAT, EXT2_DYNAMIC_REV, EXT2_ROOT_INO, EXT2_SUPERBLOCK_BLOCKNO,
    EXT2_SUPERBLOCK_BLOCKSIZE, EXT2_SUPER_MAGIC,
};

/// Per-volume state: the validated superblock plus the derived
/// constants every inode/extent lookup needs.
pub struct Ext2VolumeData {
    pub superblock: Ext2SuperBlock,
    pub block_size: u32,
    pub ind_bcnt: u32,
    pub dind_bcnt: u32,
    pub inode_size: u32,
}

/// The ext2/ext3 driver. Zero-sized: all state lives in
/// [`Ext2VolumeData`]/[`Ext2DnodeData`].
pub struct Ext2Driver;

impl FsDriver for Ext2Driver {
    type VolumeData = Ext2VolumeData;
    type DnodeData = Ext2DnodeData;

    fn volume_mount(host: &mut dyn HostAdapter) -> FsResult<MountResult<Self>> {
        // The superblock always lives 1024 bytes into the volume; probing
        // at a 1024-byte blocksize makes block index 1 exactly that
        // region, same as the original, before the real blocksize is
        // known.
        let probe_blocksize = EXT2_SUPERBLOCK_BLOCKSIZE;
        host.change_blocksize(512, 512, probe_blocksize, probe_blocksize);
        let block = host.read_block(EXT2_SUPERBLOCK_BLOCKNO)?;
        if block.len() < size_of::<Ext2SuperBlock>() {
            return Err(FsError::Unsupported);
        }
        let sb: Ext2SuperBlock = *bytemuck::from_bytes(&block[..size_of::<Ext2SuperBlock>()]);

        if sb.s_magic != EXT2_SUPER_MAGIC {
            log::debug!("ext2: bad magic {:#06x}", sb.s_magic);
            return Err(FsError::Unsupported);
        }
        if !sb.has_known_revision() {
            log::debug!("ext2: unsupported revision {}", sb.s_rev_level);
            return Err(FsError::Unsupported);
        }
        if sb.s_rev_level == EXT2_DYNAMIC_REV && sb.s_feature_incompat & !EXT2_ALLOWED_INCOMPAT != 0 {
            log::debug!(
                "ext2: unsupported incompat features {:#010x}",
                sb.s_feature_incompat
            );
            return Err(FsError::Unsupported);
        }

        let block_size = sb.block_size();
        host.change_blocksize(probe_blocksize, probe_blocksize, block_size, block_size);

        let ind_bcnt = block_size / size_of::<u32>() as u32;
        let dind_bcnt = ind_bcnt * ind_bcnt;
        let inode_size = sb.inode_size();
        let label = EncodedString::from_iso8859_1_padded(&sb.s_volume_name);

        log::debug!(
            "ext2: mounted, block_size={} inode_size={} rev={}",
            block_size,
            inode_size,
            sb.s_rev_level
        );

        Ok(MountResult {
            data: Ext2VolumeData {
                superblock: sb,
                block_size,
                ind_bcnt,
                dind_bcnt,
                inode_size,
            },
            root_id: EXT2_ROOT_INO,
            phys_blocksize: block_size,
            log_blocksize: block_size,
            label,
        })
    }

    fn volume_stat(_host: &mut dyn HostAdapter, vol: &Self::VolumeData) -> FsResult<VolumeStat> {
        let block_size = vol.block_size as u64;
        Ok(VolumeStat {
            total_bytes: vol.superblock.s_blocks_count as u64 * block_size,
            free_bytes: vol.superblock.s_free_blocks_count as u64 * block_size,
        })
    }

    fn dnode_fill(
        host: &mut dyn HostAdapter,
        vol: &Self::VolumeData,
        id: DnodeId,
        data: &mut Self::DnodeData,
    ) -> FsResult<(DnodeKind, u64)> {
        if let Some(raw) = data.raw {
            return Ok((raw.kind(), raw.size()));
        }

        let ino = id as u32;
        if ino == 0 {
            return Err(FsError::VolumeCorrupted);
        }
        let inodes_per_group = vol.superblock.s_inodes_per_group.max(1);
        let group = (ino - 1) / inodes_per_group;
        let index_in_group = (ino - 1) % inodes_per_group;

        // The group descriptor table starts in the block right after the
        // one holding the superblock: block 1 for 1024-byte filesystems
        // (where the superblock occupies block 1 on its own), block 1
        // for larger block sizes too (where the superblock only occupies
        // the first 1024 bytes of block 0). `s_first_data_block` already
        // encodes this distinction.
        let gdt_start = vol.superblock.s_first_data_block + 1;
        let gd_block =
            gdt_start + (group as u64 * size_of::<Ext2GroupDesc>() as u64 / vol.block_size as u64) as u32;
        let gd_offset = (group as u64 * size_of::<Ext2GroupDesc>() as u64) % vol.block_size as u64;
        let gd_block_data = host.read_block(gd_block as u64)?;
        if gd_offset as usize + size_of::<Ext2GroupDesc>() > gd_block_data.len() {
            return Err(FsError::VolumeCorrupted);
        }
        let gd: Ext2GroupDesc = *bytemuck::from_bytes(
            &gd_block_data[gd_offset as usize..gd_offset as usize + size_of::<Ext2GroupDesc>()],
        );

        let inode_table_byte = index_in_group as u64 * vol.inode_size as u64;
        let inode_block = gd.bg_inode_table as u64 + inode_table_byte / vol.block_size as u64;
        let inode_offset = (inode_table_byte % vol.block_size as u64) as usize;

        let inode_block_data = host.read_block(inode_block)?;
        if inode_offset + size_of::<Ext2Inode>() > inode_block_data.len() {
            return Err(FsError::VolumeCorrupted);
        }
        let raw: Ext2Inode = *bytemuck::from_bytes(
            &inode_block_data[inode_offset..inode_offset + size_of::<Ext2Inode>()],
        );

        let kind = raw.kind();
        let size = raw.size();
        data.raw = Some(raw);
        Ok((kind, size))
    }

    fn dnode_stat(
        _host: &mut dyn HostAdapter,
        _vol: &Self::VolumeData,
        _id: DnodeId,
        data: &Self::DnodeData,
    ) -> FsResult<DnodeStat> {
        let raw = data.raw.as_ref().ok_or(FsError::VolumeCorrupted)?;
        Ok(DnodeStat {
            used_bytes: raw.i_blocks as u64 * 512,
            times: PosixTimes {
                atime: raw.i_atime as u64,
                mtime: raw.i_mtime as u64,
                ctime: raw.i_ctime as u64,
            },
            posix_mode: raw.i_mode as u32,
        })
    }

    fn get_extent(
        host: &mut dyn HostAdapter,
        vol: &Self::VolumeData,
        _id: DnodeId,
        data: &Self::DnodeData,
        size: u64,
        log_start: u64,
    ) -> FsResult<Extent> {
        let raw = data.raw.as_ref().ok_or(FsError::VolumeCorrupted)?;
        let block_size = vol.block_size as u64;
        let file_bcnt = size.div_ceil(block_size).max(1);

        if log_start >= file_bcnt {
            return Ok(Extent::sparse(log_start, 1));
        }

        let first = resolve_block(host, vol, raw, log_start)?;
        let mut count = 1u64;
        if first == 0 {
            while log_start + count < file_bcnt
                && resolve_block(host, vol, raw, log_start + count)? == 0
            {
                count += 1;
            }
            return Ok(Extent::sparse(log_start, count));
        }

        while log_start + count < file_bcnt {
            let next = resolve_block(host, vol, raw, log_start + count)?;
            if next != first + count as u32 {
                break;
            }
            count += 1;
        }
        Ok(Extent::phys_block(log_start, count, first as u64))
    }

    fn dir_lookup(
        host: &mut dyn HostAdapter,
        vol: &Self::VolumeData,
        id: DnodeId,
        data: &Self::DnodeData,
        size: u64,
        name: &EncodedString,
    ) -> FsResult<DirEntry> {
        dir::dir_lookup(host, vol, id, data, size, name)
    }

    fn dir_read(
        host: &mut dyn HostAdapter,
        vol: &Self::VolumeData,
        id: DnodeId,
        data: &Self::DnodeData,
        size: u64,
        pos: &mut u64,
    ) -> FsResult<Option<DirEntry>> {
        dir::dir_read(host, vol, id, data, size, pos)
    }

    fn readlink(
        _host: &mut dyn HostAdapter,
        _vol: &Self::VolumeData,
        _id: DnodeId,
        _data: &Self::DnodeData,
    ) -> FsResult<EncodedString> {
        // Symlink target data lives inline in `i_block` for short targets
        // or in a separate data block for long ones; neither path is
        // implemented (matches `fsw_ext2_readlink`'s `FSW_UNSUPPORTED`).
        Err(FsError::Unsupported)
    }
}

/// Resolves logical block `log_bno` to a physical block number via the
/// direct/indirect/double-indirect/triple-indirect pointer chain,
/// reading exactly one metadata block per indirection level (so a
/// triple-indirect lookup costs exactly three metadata reads before the
/// final data block is ever touched). A zero pointer at any level means
/// the whole sub-range below it is a hole; returns `Ok(0)` for that case
/// rather than reading through it.
fn resolve_block(
    host: &mut dyn HostAdapter,
    vol: &Ext2VolumeData,
    inode: &Ext2Inode,
    log_bno: u64,
) -> FsResult<u32> {
    let ind_bcnt = vol.ind_bcnt as u64;
    let dind_bcnt = vol.dind_bcnt as u64;

    if log_bno < EXT2_NDIR_BLOCKS as u64 {
        return Ok(inode.i_block[log_bno as usize]);
    }

    let mut bno = log_bno - EXT2_NDIR_BLOCKS as u64;
    if bno < ind_bcnt {
        return read_indirect(host, inode.i_block[EXT2_IND_BLOCK], bno as u32);
    }
    bno -= ind_bcnt;

    if bno < dind_bcnt {
        let ind_index = (bno / ind_bcnt) as u32;
        let leaf_index = (bno % ind_bcnt) as u32;
        let ind_block = read_indirect(host, inode.i_block[EXT2_DIND_BLOCK], ind_index)?;
        return read_indirect(host, ind_block, leaf_index);
    }
    bno -= dind_bcnt;

    let tind_bcnt = dind_bcnt * ind_bcnt;
    if bno < tind_bcnt {
        let dind_index = (bno / dind_bcnt) as u32;
        let rem = bno % dind_bcnt;
        let ind_index = (rem / ind_bcnt) as u32;
        let leaf_index = (rem % ind_bcnt) as u32;
        let dind_block = read_indirect(host, inode.i_block[EXT2_TIND_BLOCK], dind_index)?;
        let ind_block = read_indirect(host, dind_block, ind_index)?;
        return read_indirect(host, ind_block, leaf_index);
    }

    Err(FsError::VolumeCorrupted)
}

fn read_indirect(host: &mut dyn HostAdapter, block_no: u32, index: u32) -> FsResult<u32> {
    if block_no == 0 {
        return Ok(0);
    }
    let block = host.read_block(block_no as u64)?;
    let offset = index as usize * size_of::<u32>();
    if offset + size_of::<u32>() > block.len() {
        return Err(FsError::VolumeCorrupted);
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&block[offset..offset + 4]);
    Ok(u32::from_le_bytes(bytes))
}
