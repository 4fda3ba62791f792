//! The filesystem-agnostic core engine (§3-5): the dnode cache, extent
//! model, and volume/stream-handle API that every driver plugs into.
//! Grounded in `fsw_core.c`/`fsw_core.h`.

pub mod dnode;
pub mod extent;
pub mod shandle;
pub mod stat;
pub mod volume;

pub use dnode::Dnode;
pub use extent::{Extent, ExtentKind};
pub use shandle::StreamHandle;
pub use stat::{DnodeStat, PosixTimes, VolumeStat};
pub use volume::Volume;
