//! Boot-menu interface skeleton.
//!
//! Out of scope: icon/BMP loading, the screen/console abstraction, and
//! the configuration file parser. What's modeled here is the *shape* of
//! a consumer of `rofsw`'s read-only API: a menu lists entries discovered
//! by walking a mounted volume, and selecting one reads its target via a
//! stream handle.

use anyhow::Result;
use rofsw::core::dnode::Dnode;
use rofsw::driver::FsDriver;

/// One selectable entry in the boot menu.
pub struct MenuEntry<D: FsDriver> {
    pub label: String,
    pub target: Dnode<D>,
}

/// Supplies menu entries, e.g. by scanning a directory of `.conf` stanzas.
///
/// A real implementation would parse a configuration file and load icons;
/// neither is in scope here.
pub trait MenuSource<D: FsDriver> {
    fn entries(&self) -> Result<Vec<MenuEntry<D>>>;
}

/// Renders a list of entries and returns the index the user picked.
///
/// The rendering loop itself (ratatui event loop, key handling) is out
/// of scope for this crate and therefore not implemented.
pub fn select<D: FsDriver>(_entries: &[MenuEntry<D>]) -> Result<usize> {
    todo!("boot-menu rendering is out of scope for the filesystem stack")
}

fn main() -> Result<()> {
    Ok(())
}
