//! The host adapter contract (C1): physical block reads supplied by the
//! embedder. See `fsw_host_table` in the original rEFIt/rEFInd `fsw_core.h`
//! for the function-table this trait replaces.

use crate::error::FsResult;

/// A physical block number, counted in units of the volume's current
/// physical block size.
pub type PhysBno = u64;

/// Supplies physical block reads to the core engine and is notified of
/// block-size changes. Implemented by the embedder against whatever
/// storage primitive the firmware actually has (AHCI, a disk image,
/// a RAM buffer, ...); this crate never talks to hardware directly.
///
/// Adapters are expected to keep a single-slot cache: the buffer
/// returned by `read_block` must stay valid at least until the next
/// call to `read_block` on the same adapter.
pub trait HostAdapter {
    /// Returns at least one physical block's worth of bytes starting at
    /// `phys_bno * phys_blocksize`. Fails with [`crate::error::FsError::Io`]
    /// on device failure.
    fn read_block(&mut self, phys_bno: PhysBno) -> FsResult<&[u8]>;

    /// Notifies the adapter that `read_block` will subsequently be called
    /// with the new block sizes in effect; any cached block must be
    /// discarded. Called at least once during mount, after the real
    /// on-disk block size has been determined.
    fn change_blocksize(&mut self, old_phys: u32, old_log: u32, new_phys: u32, new_log: u32);
}
