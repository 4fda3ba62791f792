//! Directory-node model and cache (§3, §4.3.2-4.3.3). Grounded in
//! `struct fsw_dnode` and the `fsw_dnode_create*`/`fsw_dnode_retain`/
//! `fsw_dnode_release` family in `fsw_core.c`.
//!
//! The original keeps an intrusive doubly-linked list of all live dnodes
//! and an explicit refcount field, walking the list to dedup by identity
//! on every creation. Here `Rc<RefCell<DnodeInner<D>>>` gives refcounting
//! for free (retain is `Clone`, release is `Drop`), a strong `parent` edge
//! makes "a node's parent outlives its children" automatic instead of a
//! manually cascaded release, and a `hashbrown::HashMap` keyed by on-disk
//! identity replaces the list scan with an O(1) lookup. A stale `Weak`
//! cache entry (its last strong reference already dropped) is left in
//! place and simply overwritten the next time that identity is created;
//! this never leaks live nodes and is never observed as a correctness
//! issue, only as a bounded amount of dead map storage.

use hashbrown::HashMap;

use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

use crate::driver::{DnodeId, DnodeKind, FsDriver};
use crate::error::FsResult;
use crate::host::HostAdapter;
use crate::string::EncodedString;

pub(crate) struct DnodeInner<D: FsDriver> {
    pub id: DnodeId,
    pub parent: Option<Dnode<D>>,
    pub kind: DnodeKind,
    pub size: u64,
    pub name: EncodedString,
    pub filled: bool,
    pub data: D::DnodeData,
}

/// A reference-counted handle to one on-disk object. Cloning is a
/// `retain`; dropping the last clone is a `release`.
pub struct Dnode<D: FsDriver>(pub(crate) Rc<RefCell<DnodeInner<D>>>);

impl<D: FsDriver> Clone for Dnode<D> {
    fn clone(&self) -> Self {
        Dnode(Rc::clone(&self.0))
    }
}

impl<D: FsDriver> Dnode<D> {
    fn new(id: DnodeId, parent: Option<Dnode<D>>, kind: DnodeKind, name: EncodedString) -> Self {
        Dnode(Rc::new(RefCell::new(DnodeInner {
            id,
            parent,
            kind,
            size: 0,
            name,
            filled: false,
            data: D::DnodeData::default(),
        })))
    }

    /// Equivalent to `fsw_dnode_retain`: Rust's `Clone` already increments
    /// the strong count, so this is purely a readability alias.
    pub fn retain(&self) -> Dnode<D> {
        self.clone()
    }

    pub fn id(&self) -> DnodeId {
        self.0.borrow().id
    }

    pub fn kind(&self) -> DnodeKind {
        self.0.borrow().kind
    }

    pub fn size(&self) -> u64 {
        self.0.borrow().size
    }

    pub fn name(&self) -> EncodedString {
        self.0.borrow().name.clone()
    }

    pub fn parent(&self) -> Option<Dnode<D>> {
        self.0.borrow().parent.clone()
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == DnodeKind::Dir
    }

    pub fn is_symlink(&self) -> bool {
        self.kind() == DnodeKind::Symlink
    }

    pub fn ptr_eq(&self, other: &Dnode<D>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// `fsw_dnode_fill`: idempotent; only the first call touches the
    /// host adapter.
    pub fn fill(&self, host: &mut dyn HostAdapter, vol: &D::VolumeData) -> FsResult<()> {
        if self.0.borrow().filled {
            return Ok(());
        }
        let id = self.id();
        let (kind, size) = {
            let mut inner = self.0.borrow_mut();
            D::dnode_fill(host, vol, id, &mut inner.data)?
        };
        let mut inner = self.0.borrow_mut();
        inner.kind = kind;
        inner.size = size;
        inner.filled = true;
        Ok(())
    }

    /// `fsw_ext2_get_extent`/`fsw_reiserfs_get_extent`, dispatched
    /// through the driver. Must be called after `fill`.
    pub fn get_extent(
        &self,
        host: &mut dyn HostAdapter,
        vol: &D::VolumeData,
        log_start: u64,
    ) -> FsResult<crate::core::extent::Extent> {
        let inner = self.0.borrow();
        D::get_extent(host, vol, inner.id, &inner.data, inner.size, log_start)
    }

    /// `fsw_dnode_dir_lookup` at the driver layer: resolves one path
    /// component, without creating the child dnode (that's the core's
    /// job, so it can dedup against the cache).
    pub fn dir_lookup(
        &self,
        host: &mut dyn HostAdapter,
        vol: &D::VolumeData,
        name: &EncodedString,
    ) -> FsResult<crate::driver::DirEntry> {
        let inner = self.0.borrow();
        D::dir_lookup(host, vol, inner.id, &inner.data, inner.size, name)
    }

    /// `fsw_dnode_dir_read` at the driver layer.
    pub fn dir_read(
        &self,
        host: &mut dyn HostAdapter,
        vol: &D::VolumeData,
        pos: &mut u64,
    ) -> FsResult<Option<crate::driver::DirEntry>> {
        let inner = self.0.borrow();
        D::dir_read(host, vol, inner.id, &inner.data, inner.size, pos)
    }

    /// `fsw_dnode_readlink`.
    pub fn readlink(&self, host: &mut dyn HostAdapter, vol: &D::VolumeData) -> FsResult<EncodedString> {
        let inner = self.0.borrow();
        D::readlink(host, vol, inner.id, &inner.data)
    }

    /// `fsw_dnode_stat`: fills first, then asks the driver; if the
    /// driver leaves `used_bytes` at 0 the core fills in a default of
    /// `ceil(size / log_blocksize)` blocks' worth of bytes.
    pub fn stat(
        &self,
        host: &mut dyn HostAdapter,
        vol: &D::VolumeData,
        log_blocksize: u32,
    ) -> FsResult<crate::core::stat::DnodeStat> {
        self.fill(host, vol)?;
        let id = self.id();
        let mut st = {
            let inner = self.0.borrow();
            D::dnode_stat(host, vol, id, &inner.data)?
        };
        if st.used_bytes == 0 && log_blocksize > 0 {
            let size = self.size();
            let blocks = size.div_ceil(log_blocksize as u64);
            st.used_bytes = blocks * log_blocksize as u64;
        }
        Ok(st)
    }
}

/// Owns the set of all currently live dnodes for one volume, keyed by
/// on-disk identity (`fsw_dnode_create`'s dedup scan, realized as a map).
pub(crate) struct DnodeCache<D: FsDriver> {
    by_id: HashMap<DnodeId, Weak<RefCell<DnodeInner<D>>>>,
}

impl<D: FsDriver> DnodeCache<D> {
    pub fn new() -> Self {
        DnodeCache {
            by_id: HashMap::new(),
        }
    }

    /// Creates the volume root: no parent, identity `id`, directory by
    /// convention of the caller (filled lazily like any other node).
    pub fn create_root(&mut self, id: DnodeId) -> Dnode<D> {
        let dnode = Dnode::new(id, None, DnodeKind::Dir, EncodedString::Empty);
        self.by_id.insert(id, Rc::downgrade(&dnode.0));
        dnode
    }

    /// The universal creation path: dedup by identity (existing node's
    /// parent is left untouched on a hit), otherwise allocate, retain
    /// `parent`, and insert.
    pub fn create(
        &mut self,
        parent: &Dnode<D>,
        id: DnodeId,
        kind: DnodeKind,
        name: EncodedString,
    ) -> Dnode<D> {
        if let Some(weak) = self.by_id.get(&id) {
            if let Some(strong) = weak.upgrade() {
                return Dnode(strong);
            }
        }
        let dnode = Dnode::new(id, Some(parent.retain()), kind, name);
        self.by_id.insert(id, Rc::downgrade(&dnode.0));
        dnode
    }

    #[cfg(test)]
    pub fn live_count(&self) -> usize {
        self.by_id
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl<D: FsDriver> DnodeCache<D> {
    /// Creates or dedups a child straight from a driver-reported entry.
    pub fn create_from_entry(
        &mut self,
        parent: &Dnode<D>,
        entry: crate::driver::DirEntry,
    ) -> Dnode<D> {
        self.create(parent, entry.id, entry.kind, entry.name)
    }
}
