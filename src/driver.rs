//! The filesystem driver contract (replaces `fsw_fstype_table`).
//!
//! Each concrete filesystem (ext2, ReiserFS) implements [`FsDriver`]. The
//! core engine in [`crate::core`] is generic over this trait and never
//! special-cases a particular filesystem: everything format-specific —
//! superblock parsing, inode/stat-data layout, directory entry format,
//! block-mapping — lives behind these nine methods, mirroring the original
//! `fsw_fstype_table`'s ten function-pointer slots (`dnode_free` has no
//! Rust counterpart; `Drop` on `D::DnodeData` does its job).

use alloc::vec::Vec;

use crate::core::extent::Extent;
use crate::core::stat::{DnodeStat, VolumeStat};
use crate::error::FsResult;
use crate::host::HostAdapter;
use crate::string::EncodedString;

/// On-disk object identity, scoped to one volume. For ext2 this is the
/// inode number; for ReiserFS, the objectid.
pub type DnodeId = u64;

/// What kind of object a dnode denotes, known even before it is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnodeKind {
    Unknown,
    File,
    Dir,
    Symlink,
    Special,
}

/// The result of a successful `volume_mount`: the driver's private volume
/// payload plus enough information for the core to materialize the root
/// dnode and adopt the real on-disk block size.
pub struct MountResult<D: FsDriver> {
    pub data: D::VolumeData,
    pub root_id: DnodeId,
    pub phys_blocksize: u32,
    pub log_blocksize: u32,
    pub label: EncodedString,
}

/// A directory entry yielded by `dir_lookup`/`dir_read`: enough to create
/// or dedupe a child dnode in the core's cache without filling it yet.
pub struct DirEntry {
    pub id: DnodeId,
    pub kind: DnodeKind,
    pub name: EncodedString,
}

/// Implemented once per supported on-disk format. All methods take the
/// host adapter explicitly since the driver owns no storage of its own;
/// every method is fallible and must not panic on malformed input.
pub trait FsDriver: Sized {
    /// Driver-private per-volume state (superblock-derived constants).
    type VolumeData;
    /// Driver-private per-dnode state (raw inode / stat-data payload).
    /// `Default` gives every newly created dnode an "unfilled" value.
    type DnodeData: Default;

    /// Probes and mounts the volume, reading whatever superblock the
    /// format expects through `host`.
    fn volume_mount(host: &mut dyn HostAdapter) -> FsResult<MountResult<Self>>;

    fn volume_stat(host: &mut dyn HostAdapter, vol: &Self::VolumeData) -> FsResult<VolumeStat>;

    /// Populates `data` from the on-disk record for `id`. Idempotent:
    /// called again on an already-filled dnode, it must succeed (or be
    /// a cheap no-op) rather than re-reading. Returns the dnode's kind
    /// and byte size together since both come from the same on-disk
    /// record read.
    fn dnode_fill(
        host: &mut dyn HostAdapter,
        vol: &Self::VolumeData,
        id: DnodeId,
        data: &mut Self::DnodeData,
    ) -> FsResult<(DnodeKind, u64)>;

    fn dnode_stat(
        host: &mut dyn HostAdapter,
        vol: &Self::VolumeData,
        id: DnodeId,
        data: &Self::DnodeData,
    ) -> FsResult<DnodeStat>;

    /// Returns the extent covering `log_start`, possibly spanning more
    /// than one logical block if the driver coalesces contiguous runs.
    /// `size` is the dnode's byte size, passed in because the driver
    /// only ever sees its own `VolumeData`/`DnodeData`, not the core's
    /// `Dnode` that carries it.
    fn get_extent(
        host: &mut dyn HostAdapter,
        vol: &Self::VolumeData,
        id: DnodeId,
        data: &Self::DnodeData,
        size: u64,
        log_start: u64,
    ) -> FsResult<Extent>;

    /// Looks up one path component inside directory `id`.
    fn dir_lookup(
        host: &mut dyn HostAdapter,
        vol: &Self::VolumeData,
        id: DnodeId,
        data: &Self::DnodeData,
        size: u64,
        name: &EncodedString,
    ) -> FsResult<DirEntry>;

    /// Yields the next entry after opaque bookmark `pos`, advancing it.
    /// Returns `Ok(None)` at end of directory.
    fn dir_read(
        host: &mut dyn HostAdapter,
        vol: &Self::VolumeData,
        id: DnodeId,
        data: &Self::DnodeData,
        size: u64,
        pos: &mut u64,
    ) -> FsResult<Option<DirEntry>>;

    /// Reads a symlink's target text. Both drivers currently answer
    /// `Unsupported`.
    fn readlink(
        host: &mut dyn HostAdapter,
        vol: &Self::VolumeData,
        id: DnodeId,
        data: &Self::DnodeData,
    ) -> FsResult<EncodedString>;
}

/// Copies `len` bytes starting at byte offset `start` within physical
/// block `phys_bno` into a freshly allocated buffer. A thin convenience
/// for drivers reading a single on-disk record (superblock, inode,
/// stat-data item) that doesn't cross a block boundary.
pub(crate) fn read_block_range(
    host: &mut dyn HostAdapter,
    phys_bno: u64,
    start: usize,
    len: usize,
) -> FsResult<Vec<u8>> {
    let block = host.read_block(phys_bno)?;
    if start + len > block.len() {
        return Err(crate::error::FsError::VolumeCorrupted);
    }
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&block[start..start + len]);
    Ok(out)
}
