//! Extent model (§4.1): describes the backing of one contiguous logical
//! region of a file. Grounded in `struct fsw_extent` / `fsw_extent_type_t`
//! in `fsw_core.h`.

use alloc::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentKind {
    /// No extent currently cached.
    Invalid,
    /// The logical region has no backing storage; reads synthesize zero
    /// bytes (a hole in a sparse file).
    Sparse,
    /// Backed by `log_count` consecutive logical blocks starting at
    /// `phys_start` on the underlying device.
    PhysBlock,
    /// Backed by an owned in-memory buffer (e.g. a ReiserFS direct item
    /// or tail), not by device blocks.
    Buffer,
}

/// One contiguous logical region of a file, as reported by
/// [`crate::driver::FsDriver::get_extent`].
#[derive(Debug, Clone)]
pub struct Extent {
    pub kind: ExtentKind,
    pub log_start: u64,
    pub log_count: u64,
    /// Valid when `kind == PhysBlock`.
    pub phys_start: u64,
    /// Valid when `kind == Buffer`; owned by whichever stream handle
    /// last requested this extent (§5).
    pub buffer: Option<Vec<u8>>,
}

impl Extent {
    pub fn invalid() -> Self {
        Extent {
            kind: ExtentKind::Invalid,
            log_start: 0,
            log_count: 0,
            phys_start: 0,
            buffer: None,
        }
    }

    pub fn sparse(log_start: u64, log_count: u64) -> Self {
        Extent {
            kind: ExtentKind::Sparse,
            log_start,
            log_count,
            phys_start: 0,
            buffer: None,
        }
    }

    pub fn phys_block(log_start: u64, log_count: u64, phys_start: u64) -> Self {
        Extent {
            kind: ExtentKind::PhysBlock,
            log_start,
            log_count,
            phys_start,
            buffer: None,
        }
    }

    pub fn buffer(log_start: u64, log_count: u64, data: Vec<u8>) -> Self {
        Extent {
            kind: ExtentKind::Buffer,
            log_start,
            log_count,
            phys_start: 0,
            buffer: Some(data),
        }
    }

    /// Whether this extent covers logical block `log_bno`.
    pub fn covers(&self, log_bno: u64) -> bool {
        self.kind != ExtentKind::Invalid
            && log_bno >= self.log_start
            && log_bno < self.log_start + self.log_count
    }
}
