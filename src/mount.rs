//! Driver auto-detection (§10.3). Which filesystem drivers are compiled
//! in is a Cargo feature choice (`ext2`, `reiserfs`); which one to try
//! against an unidentified volume is this ordered probe. There is no
//! global registry comparable to `fsw_fstype_table[]` — each driver is
//! a distinct type implementing [`crate::driver::FsDriver`], so the
//! result has to be an enum rather than a homogeneous list.

use alloc::boxed::Box;

use crate::core::volume::Volume;
use crate::driver::FsDriver;
use crate::error::{FsError, FsResult};
use crate::host::HostAdapter;

#[cfg(feature = "ext2")]
use crate::drivers::ext2::Ext2Driver;
#[cfg(feature = "reiserfs")]
use crate::drivers::reiserfs::ReiserfsDriver;

/// A volume mounted by [`mount_any`] without knowing its filesystem type
/// ahead of time.
pub enum AnyVolume {
    #[cfg(feature = "ext2")]
    Ext2(Volume<Ext2Driver>),
    #[cfg(feature = "reiserfs")]
    Reiserfs(Volume<ReiserfsDriver>),
}

/// Tries each compiled-in driver's `volume_mount` in turn (ext2, then
/// ReiserFS) and keeps the first one that accepts the volume.
///
/// A failed probe may have already called `host.change_blocksize` before
/// rejecting the volume (e.g. ext2 adopts the real on-disk block size
/// before validating the superblock further); the next driver tried
/// still starts from whatever blocksize the host adapter was
/// constructed with; this is harmless since every driver's own probe
/// reads the blocksize it expects regardless of what the adapter
/// currently assumes.
pub fn mount_any(mut host: Box<dyn HostAdapter>) -> FsResult<AnyVolume> {
    #[cfg(feature = "ext2")]
    {
        match Ext2Driver::volume_mount(host.as_mut()) {
            Ok(mount_result) => {
                log::debug!("mount_any: ext2 accepted the volume");
                return Ok(AnyVolume::Ext2(Volume::from_mount_result(host, mount_result)));
            }
            Err(err) => log::debug!("mount_any: ext2 declined: {:?}", err),
        }
    }

    #[cfg(feature = "reiserfs")]
    {
        match ReiserfsDriver::volume_mount(host.as_mut()) {
            Ok(mount_result) => {
                log::debug!("mount_any: reiserfs accepted the volume");
                return Ok(AnyVolume::Reiserfs(Volume::from_mount_result(host, mount_result)));
            }
            Err(err) => log::debug!("mount_any: reiserfs declined: {:?}", err),
        }
    }

    log::warn!("mount_any: no compiled-in driver recognized this volume");
    let _ = &host;
    Err(FsError::Unsupported)
}
