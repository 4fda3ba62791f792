//! A read-only filesystem wrapper for firmware-level consumers.
//!
//! Mount an ext2/ext3 or ReiserFS volume against a caller-supplied
//! [`host::HostAdapter`], then look up paths and stream file contents
//! through the [`core`] engine. The crate never writes to the underlying
//! storage and never panics on malformed on-disk structures; errors are
//! reported through [`error::FsError`].
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![allow(clippy::mut_from_ref)]

extern crate alloc;
#[cfg(not(any(test, feature = "std")))]
extern crate rlibc;

pub mod core;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod host;
pub mod mount;
pub mod string;

pub use error::{FsError, FsResult};
pub use mount::{mount_any, AnyVolume};
