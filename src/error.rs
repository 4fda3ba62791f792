//! Error taxonomy for the filesystem stack.
//!
//! A marker trait (`BaseError`) for anything that can be boxed up as an
//! opaque cause, plus one concrete enum ([`FsError`]) covering the kinds
//! the engine itself raises.

use core::fmt::Debug;

use alloc::boxed::Box;
use alloc::collections::TryReserveError;

/// Implemented by any error type that can be wrapped as an opaque cause.
pub trait BaseError: Debug {}

impl BaseError for TryReserveError {}

/// The error taxonomy the core engine and its drivers report.
///
/// Every on-disk access is fallible; none of them panic on malformed
/// input. `Io` and `Unknown` carry the underlying cause from the host
/// adapter or driver so the embedder can recover the precise reason.
#[derive(Debug)]
pub enum FsError {
    /// An allocation failed.
    OutOfMemory,
    /// The host adapter's `read_block` failed.
    Io(Box<dyn BaseError>),
    /// A requested operation or feature combination isn't implemented
    /// (symlink readlink, writing, non-directory path components, ...).
    Unsupported,
    /// A directory lookup found no match, `..` was requested on the
    /// root, or a symlink chain never resolved.
    NotFound,
    /// An on-disk structure violates a format invariant.
    VolumeCorrupted,
    /// Default fall-through for host-mapped errors with no better kind.
    Unknown(Box<dyn BaseError>),
}

impl BaseError for FsError {}

impl From<TryReserveError> for FsError {
    fn from(_: TryReserveError) -> Self {
        FsError::OutOfMemory
    }
}

pub type FsResult<T> = Result<T, FsError>;
