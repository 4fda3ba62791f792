//! Per-open stream state and the generic extent-splicing reader (§4.3.6).
//! Grounded in `struct fsw_shandle` and `fsw_shandle_read` in
//! `fsw_core.c`/`fsw_core.h`.

use crate::core::dnode::Dnode;
use crate::core::extent::{Extent, ExtentKind};
use crate::driver::{DnodeId, FsDriver};
use crate::error::{FsError, FsResult};
use crate::host::HostAdapter;

/// A byte-position cursor plus cached extent over one dnode. Several
/// stream handles may be open on the same dnode at once, each with its
/// own independent position and cached extent.
pub struct StreamHandle<D: FsDriver> {
    pub(crate) dnode: Dnode<D>,
    pub(crate) pos: u64,
    pub(crate) extent: Extent,
}

impl<D: FsDriver> StreamHandle<D> {
    pub fn dnode(&self) -> &Dnode<D> {
        &self.dnode
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }
}

/// The extent-dispatch read loop shared by [`crate::core::volume::Volume::shandle_read`]
/// and the ext2 driver's own directory scan (which has no `Volume` to
/// call back into, only its own `VolumeData`/`DnodeData`). Clamps to
/// `size`, refreshes `extent` via `get_extent` whenever it stops
/// covering the current logical block, and copies bytes out of
/// physical blocks, an owned buffer, or zero-fills a hole, matching
/// `fsw_shandle_read`'s three-way dispatch.
#[allow(clippy::too_many_arguments)]
pub(crate) fn splice_read<D: FsDriver>(
    host: &mut dyn HostAdapter,
    vol: &D::VolumeData,
    id: DnodeId,
    data: &D::DnodeData,
    size: u64,
    phys_blocksize: u32,
    log_blocksize: u32,
    extent: &mut Extent,
    pos: &mut u64,
    buf: &mut [u8],
) -> FsResult<usize> {
    if *pos >= size {
        return Ok(0);
    }

    let mut remaining = buf.len() as u64;
    if remaining > size - *pos {
        remaining = size - *pos;
    }

    let start_pos = *pos;
    let mut written = 0usize;

    while remaining > 0 {
        let log_bno = *pos / log_blocksize as u64;
        if !extent.covers(log_bno) {
            *extent = D::get_extent(host, vol, id, data, size, log_bno)?;
        }

        let pos_in_extent = *pos - extent.log_start * log_blocksize as u64;
        let extent_remaining = extent.log_count * log_blocksize as u64 - pos_in_extent;

        let copy_len = match extent.kind {
            ExtentKind::PhysBlock => {
                let phys_bno = extent.phys_start + pos_in_extent / phys_blocksize as u64;
                let pos_in_physblock = pos_in_extent % phys_blocksize as u64;
                let block = host.read_block(phys_bno)?;
                let copy_len = (phys_blocksize as u64 - pos_in_physblock)
                    .min(remaining)
                    .min(extent_remaining);
                let start = pos_in_physblock as usize;
                let end = start + copy_len as usize;
                if end > block.len() {
                    return Err(FsError::VolumeCorrupted);
                }
                buf[written..written + copy_len as usize].copy_from_slice(&block[start..end]);
                copy_len
            }
            ExtentKind::Buffer => {
                let copy_len = extent_remaining.min(remaining);
                let buffer = extent.buffer.as_ref().ok_or(FsError::VolumeCorrupted)?;
                let start = pos_in_extent as usize;
                let end = start + copy_len as usize;
                if end > buffer.len() {
                    return Err(FsError::VolumeCorrupted);
                }
                buf[written..written + copy_len as usize].copy_from_slice(&buffer[start..end]);
                copy_len
            }
            ExtentKind::Sparse | ExtentKind::Invalid => {
                let copy_len = extent_remaining.min(remaining);
                for byte in &mut buf[written..written + copy_len as usize] {
                    *byte = 0;
                }
                copy_len
            }
        };

        written += copy_len as usize;
        remaining -= copy_len;
        *pos += copy_len;
    }

    Ok((*pos - start_pos) as usize)
}
