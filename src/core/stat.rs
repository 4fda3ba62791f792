//! Stat output types (§3, §6). Grounded in `struct fsw_volume_stat` and
//! `struct fsw_dnode_stat` in `fsw_core.h`.

#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeStat {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

/// POSIX timestamps, seconds since the epoch. Drivers leave a field at 0
/// when the on-disk format has no corresponding field.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixTimes {
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DnodeStat {
    /// Actual storage consumed on disk. If the driver reports 0, the
    /// core fills in `ceil(size / log_blocksize) * log_blocksize`.
    pub used_bytes: u64,
    pub times: PosixTimes,
    pub posix_mode: u32,
}
