//! Mount orchestration, path lookup, symlink resolution, and the public
//! stream-read entry point (§4.3). Grounded in `fsw_mount`/`fsw_unmount`/
//! `fsw_dnode_lookup_path`/`fsw_dnode_resolve`/`fsw_shandle_open`/
//! `fsw_shandle_read` in `fsw_core.c`.

use alloc::boxed::Box;

use crate::core::dnode::{Dnode, DnodeCache};
use crate::core::shandle::StreamHandle;
use crate::core::stat::{DnodeStat, VolumeStat};
use crate::driver::{FsDriver, MountResult};
use crate::error::{FsError, FsResult};
use crate::host::HostAdapter;
use crate::string::EncodedString;

/// Hop cap for symlink resolution (§4.3.5). The dnode cache's identity
/// dedup only catches cycles built from the *same* on-disk object; two
/// distinct symlinks pointing at each other would otherwise loop
/// forever, so resolution gives up after this many hops.
const SYMLINK_HOP_LIMIT: u32 = 40;

/// A mounted volume: the host adapter, the driver's private state, and
/// the core's dnode cache. Generic over one compiled-in `D: FsDriver`;
/// see [`crate::mount::mount_any`] for mounting without knowing the
/// filesystem type ahead of time.
pub struct Volume<D: FsDriver> {
    host: Box<dyn HostAdapter>,
    data: D::VolumeData,
    phys_blocksize: u32,
    log_blocksize: u32,
    label: EncodedString,
    cache: DnodeCache<D>,
    root: Dnode<D>,
}

impl<D: FsDriver> Volume<D> {
    /// `fsw_mount`: probes through the driver and materializes the root
    /// dnode. On failure the host adapter is dropped along with it,
    /// same as the original's `fsw_unmount` cleanup on a failed mount.
    pub fn mount(mut host: Box<dyn HostAdapter>) -> FsResult<Self> {
        let mount_result = D::volume_mount(host.as_mut())?;
        Ok(Self::from_mount_result(host, mount_result))
    }

    pub(crate) fn from_mount_result(host: Box<dyn HostAdapter>, mount_result: MountResult<D>) -> Self {
        log::debug!(
            "volume mounted: phys_blocksize={} log_blocksize={}",
            mount_result.phys_blocksize,
            mount_result.log_blocksize
        );
        let mut cache = DnodeCache::new();
        let root = cache.create_root(mount_result.root_id);
        Volume {
            host,
            data: mount_result.data,
            phys_blocksize: mount_result.phys_blocksize,
            log_blocksize: mount_result.log_blocksize,
            label: mount_result.label,
            cache,
            root,
        }
    }

    /// `fsw_unmount`. Equivalent to dropping the volume; kept as an
    /// explicit call so embedders don't have to rely on `Drop` timing.
    pub fn unmount(self) {}

    /// The volume root, retained once for the caller.
    pub fn root(&self) -> Dnode<D> {
        self.root.retain()
    }

    pub fn label(&self) -> EncodedString {
        self.label.clone()
    }

    pub fn phys_blocksize(&self) -> u32 {
        self.phys_blocksize
    }

    pub fn log_blocksize(&self) -> u32 {
        self.log_blocksize
    }

    pub fn volume_stat(&mut self) -> FsResult<VolumeStat> {
        D::volume_stat(self.host.as_mut(), &self.data)
    }

    /// `fsw_set_blocksize`: notifies the host first, then adopts the new
    /// sizes. Drivers call this once during `volume_mount`; nothing in
    /// this crate calls it afterward.
    pub fn set_blocksize(&mut self, phys_blocksize: u32, log_blocksize: u32) {
        self.host
            .change_blocksize(self.phys_blocksize, self.log_blocksize, phys_blocksize, log_blocksize);
        self.phys_blocksize = phys_blocksize;
        self.log_blocksize = log_blocksize;
    }

    /// `fsw_dnode_lookup_path` (§4.3.4): resolves a `separator`-delimited
    /// path relative to `start`, following symlinks and handling `.`/
    /// `..` along the way. An empty path (`""`, `"/"`, `"//"`, ...)
    /// always resolves to the volume root, regardless of `start`.
    pub fn dnode_lookup_path(
        &mut self,
        start: &Dnode<D>,
        path: &EncodedString,
        separator: char,
    ) -> FsResult<Dnode<D>> {
        if path.is_empty() {
            return Ok(self.root.retain());
        }

        let mut remaining = path.clone();
        let mut work = start.retain();
        let mut first = true;

        while !remaining.is_empty() {
            let component = remaining.split(separator);

            if component.is_empty() {
                if first {
                    work = self.root.retain();
                }
                first = false;
                continue;
            }
            first = false;

            work.fill(self.host.as_mut(), &self.data)?;
            if work.is_symlink() {
                work = self.dnode_resolve(&work)?;
                work.fill(self.host.as_mut(), &self.data)?;
            }
            if !work.is_dir() {
                return Err(FsError::Unsupported);
            }

            work = if component.eq_cstr(".") {
                work
            } else if component.eq_cstr("..") {
                match work.parent() {
                    Some(parent) => parent,
                    None => return Err(FsError::NotFound),
                }
            } else {
                let entry = work.dir_lookup(self.host.as_mut(), &self.data, &component)?;
                self.cache.create_from_entry(&work, entry)
            };
        }

        Ok(work)
    }

    /// A single-component lookup for callers that already hold a name
    /// rather than a whole path.
    pub fn dnode_lookup(&mut self, dnode: &Dnode<D>, name: &EncodedString) -> FsResult<Dnode<D>> {
        dnode.fill(self.host.as_mut(), &self.data)?;
        if !dnode.is_dir() {
            return Err(FsError::Unsupported);
        }
        let entry = dnode.dir_lookup(self.host.as_mut(), &self.data, name)?;
        Ok(self.cache.create_from_entry(dnode, entry))
    }

    /// `fsw_dnode_resolve` (§4.3.5): follows symlinks until a non-symlink
    /// dnode is reached, bounded by [`SYMLINK_HOP_LIMIT`].
    pub fn dnode_resolve(&mut self, dnode: &Dnode<D>) -> FsResult<Dnode<D>> {
        let mut work = dnode.retain();
        for _ in 0..SYMLINK_HOP_LIMIT {
            work.fill(self.host.as_mut(), &self.data)?;
            if !work.is_symlink() {
                return Ok(work);
            }
            let parent = match work.parent() {
                Some(p) => p,
                None => return Err(FsError::NotFound),
            };
            let target_name = work.readlink(self.host.as_mut(), &self.data)?;
            work = self.dnode_lookup_path(&parent, &target_name, '/')?;
        }
        log::warn!("dnode_resolve: symlink hop limit exceeded, treating as a cycle");
        Err(FsError::NotFound)
    }

    /// `fsw_dnode_stat`.
    pub fn dnode_stat(&mut self, dnode: &Dnode<D>) -> FsResult<DnodeStat> {
        dnode.stat(self.host.as_mut(), &self.data, self.log_blocksize)
    }

    /// `fsw_dnode_readlink`.
    pub fn dnode_readlink(&mut self, dnode: &Dnode<D>) -> FsResult<EncodedString> {
        dnode.fill(self.host.as_mut(), &self.data)?;
        if !dnode.is_symlink() {
            return Err(FsError::Unsupported);
        }
        dnode.readlink(self.host.as_mut(), &self.data)
    }

    /// `fsw_shandle_open`.
    pub fn shandle_open(&mut self, dnode: &Dnode<D>) -> FsResult<StreamHandle<D>> {
        dnode.fill(self.host.as_mut(), &self.data)?;
        Ok(StreamHandle {
            dnode: dnode.retain(),
            pos: 0,
            extent: crate::core::extent::Extent::invalid(),
        })
    }

    /// `fsw_shandle_close`. Dropping the handle already releases the
    /// dnode and any buffer extent; kept for API symmetry with `open`.
    pub fn shandle_close(&mut self, _shand: StreamHandle<D>) {}

    /// `fsw_shandle_read`.
    pub fn shandle_read(&mut self, shand: &mut StreamHandle<D>, buf: &mut [u8]) -> FsResult<usize> {
        let id = shand.dnode.id();
        let size = shand.dnode.size();
        let inner = shand.dnode.0.borrow();
        crate::core::shandle::splice_read::<D>(
            self.host.as_mut(),
            &self.data,
            id,
            &inner.data,
            size,
            self.phys_blocksize,
            self.log_blocksize,
            &mut shand.extent,
            &mut shand.pos,
            buf,
        )
    }

    /// `fsw_dnode_dir_read` (§4.3.7). `shand.pos` is an opaque bookmark
    /// whose meaning belongs entirely to the driver.
    pub fn dnode_dir_read(&mut self, shand: &mut StreamHandle<D>) -> FsResult<Option<Dnode<D>>> {
        if !shand.dnode.is_dir() {
            return Err(FsError::Unsupported);
        }
        let entry = shand
            .dnode
            .dir_read(self.host.as_mut(), &self.data, &mut shand.pos)?;
        Ok(entry.map(|e| self.cache.create_from_entry(&shand.dnode, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::core::extent::Extent;
    use crate::driver::{DirEntry, DnodeKind, FsDriver};

    /// A host adapter no [`MemDriver`] test ever actually calls: every
    /// fixture file is small enough to live in one in-memory buffer
    /// extent, so nothing here reaches for a physical block.
    #[derive(Debug)]
    struct UnreachableCause;
    impl crate::error::BaseError for UnreachableCause {}

    struct NullHost;
    impl HostAdapter for NullHost {
        fn read_block(&mut self, _phys_bno: u64) -> FsResult<&[u8]> {
            Err(FsError::Io(Box::new(UnreachableCause)))
        }
        fn change_blocksize(&mut self, _old_phys: u32, _old_log: u32, _new_phys: u32, _new_log: u32) {}
    }

    /// One fixture object: a directory or a file/symlink, parented by id.
    /// The root is its own parent, which `children_of` excludes by id.
    struct MemNode {
        id: u64,
        parent: u64,
        kind: DnodeKind,
        name: &'static str,
        content: &'static [u8],
        symlink_target: Option<&'static str>,
    }

    struct MemVolumeData {
        nodes: Vec<MemNode>,
    }

    impl MemVolumeData {
        fn get(&self, id: u64) -> FsResult<&MemNode> {
            self.nodes.iter().find(|n| n.id == id).ok_or(FsError::NotFound)
        }

        fn children_of(&self, id: u64) -> Vec<&MemNode> {
            self.nodes.iter().filter(|n| n.parent == id && n.id != id).collect()
        }
    }

    fn name_of(n: &MemNode) -> EncodedString {
        EncodedString::from_iso8859_1_exact(n.name.as_bytes().to_vec())
    }

    /// A trivial in-memory [`FsDriver`] standing in for ext2/ReiserFS: it
    /// fixture-resolves everything against a fixed node table instead of
    /// parsing on-disk bytes, so the core's path-lookup, symlink, dedup,
    /// and stream-read logic can be exercised without either real driver.
    struct MemDriver;

    impl FsDriver for MemDriver {
        type VolumeData = MemVolumeData;
        type DnodeData = ();

        fn volume_mount(_host: &mut dyn HostAdapter) -> FsResult<MountResult<Self>> {
            unreachable!("tests build a MemVolumeData fixture directly")
        }

        fn volume_stat(_host: &mut dyn HostAdapter, _vol: &Self::VolumeData) -> FsResult<VolumeStat> {
            Ok(VolumeStat::default())
        }

        fn dnode_fill(
            _host: &mut dyn HostAdapter,
            vol: &Self::VolumeData,
            id: u64,
            _data: &mut Self::DnodeData,
        ) -> FsResult<(DnodeKind, u64)> {
            let node = vol.get(id)?;
            Ok((node.kind, node.content.len() as u64))
        }

        fn dnode_stat(
            _host: &mut dyn HostAdapter,
            _vol: &Self::VolumeData,
            _id: u64,
            _data: &Self::DnodeData,
        ) -> FsResult<DnodeStat> {
            Ok(DnodeStat::default())
        }

        fn get_extent(
            _host: &mut dyn HostAdapter,
            vol: &Self::VolumeData,
            id: u64,
            _data: &Self::DnodeData,
            _size: u64,
            log_start: u64,
        ) -> FsResult<Extent> {
            let node = vol.get(id)?;
            if log_start > 0 {
                return Ok(Extent::sparse(log_start, 1));
            }
            Ok(Extent::buffer(0, 1, node.content.to_vec()))
        }

        fn dir_lookup(
            _host: &mut dyn HostAdapter,
            vol: &Self::VolumeData,
            id: u64,
            _data: &Self::DnodeData,
            _size: u64,
            name: &EncodedString,
        ) -> FsResult<DirEntry> {
            for child in vol.children_of(id) {
                let candidate = name_of(child);
                if candidate.eq(name) {
                    return Ok(DirEntry {
                        id: child.id,
                        kind: child.kind,
                        name: candidate,
                    });
                }
            }
            Err(FsError::NotFound)
        }

        fn dir_read(
            _host: &mut dyn HostAdapter,
            vol: &Self::VolumeData,
            id: u64,
            _data: &Self::DnodeData,
            _size: u64,
            pos: &mut u64,
        ) -> FsResult<Option<DirEntry>> {
            let children = vol.children_of(id);
            let idx = *pos as usize;
            if idx >= children.len() {
                return Ok(None);
            }
            *pos += 1;
            let child = children[idx];
            Ok(Some(DirEntry {
                id: child.id,
                kind: child.kind,
                name: name_of(child),
            }))
        }

        fn readlink(
            _host: &mut dyn HostAdapter,
            vol: &Self::VolumeData,
            id: u64,
            _data: &Self::DnodeData,
        ) -> FsResult<EncodedString> {
            let node = vol.get(id)?;
            match node.symlink_target {
                Some(t) => Ok(EncodedString::from_iso8859_1_exact(t.as_bytes().to_vec())),
                None => Err(FsError::Unsupported),
            }
        }
    }

    const ROOT: u64 = 1;
    const USR: u64 = 2;
    const HELLO: u64 = 3;
    const LINK: u64 = 4;
    const BIN: u64 = 5;

    fn test_volume() -> Volume<MemDriver> {
        let nodes = vec![
            MemNode {
                id: ROOT,
                parent: ROOT,
                kind: DnodeKind::Dir,
                name: "",
                content: b"",
                symlink_target: None,
            },
            MemNode {
                id: USR,
                parent: ROOT,
                kind: DnodeKind::Dir,
                name: "usr",
                content: b"",
                symlink_target: None,
            },
            MemNode {
                id: HELLO,
                parent: ROOT,
                kind: DnodeKind::File,
                name: "hello.txt",
                content: b"Hello, world\n",
                symlink_target: None,
            },
            MemNode {
                id: LINK,
                parent: ROOT,
                kind: DnodeKind::Symlink,
                name: "link",
                content: b"",
                symlink_target: Some("hello.txt"),
            },
            MemNode {
                id: BIN,
                parent: USR,
                kind: DnodeKind::Dir,
                name: "bin",
                content: b"",
                symlink_target: None,
            },
        ];
        let mount_result = MountResult {
            data: MemVolumeData { nodes },
            root_id: ROOT,
            phys_blocksize: 512,
            log_blocksize: 512,
            label: EncodedString::Empty,
        };
        Volume::from_mount_result(Box::new(NullHost), mount_result)
    }

    fn path(s: &str) -> EncodedString {
        EncodedString::from_iso8859_1_exact(s.as_bytes().to_vec())
    }

    #[test]
    fn root_path_variants_are_idempotent() {
        let mut vol = test_volume();
        let root = vol.root();
        for p in ["/", "", "//"] {
            let got = vol.dnode_lookup_path(&root, &path(p), '/').unwrap();
            assert!(got.ptr_eq(&root));
        }
    }

    #[test]
    fn dot_and_dotdot_walk_self_and_parent() {
        let mut vol = test_volume();
        let root = vol.root();
        let usr = vol.dnode_lookup_path(&root, &path("usr"), '/').unwrap();

        let dot = vol.dnode_lookup_path(&usr, &path("."), '/').unwrap();
        assert!(dot.ptr_eq(&usr));

        let parent = vol.dnode_lookup_path(&usr, &path(".."), '/').unwrap();
        assert!(parent.ptr_eq(&root));
    }

    #[test]
    fn dotdot_at_root_is_not_found() {
        let mut vol = test_volume();
        let root = vol.root();
        let err = vol.dnode_lookup_path(&root, &path(".."), '/').unwrap_err();
        assert!(matches!(err, FsError::NotFound));
    }

    #[test]
    fn repeated_lookup_dedups_to_the_same_dnode() {
        let mut vol = test_volume();
        let root = vol.root();
        let usr_a = vol.dnode_lookup_path(&root, &path("usr"), '/').unwrap();
        let usr_b = vol.dnode_lookup_path(&root, &path("usr"), '/').unwrap();
        assert!(usr_a.ptr_eq(&usr_b));
        // Only strongly-held dnodes count as live: the cache itself keeps
        // no strong reference, so a component dropped mid-traversal (like
        // "usr" would be on a longer path) never inflates this count.
        assert_eq!(vol.cache.live_count(), 2); // root, usr
        drop(usr_a);
        drop(usr_b);
        drop(root);
        assert_eq!(vol.cache.live_count(), 0);
    }

    #[test]
    fn symlink_resolves_to_its_target_file() {
        let mut vol = test_volume();
        let root = vol.root();
        let link = vol.dnode_lookup_path(&root, &path("link"), '/').unwrap();
        let target = vol.dnode_resolve(&link).unwrap();
        assert_eq!(target.kind(), DnodeKind::File);
        assert_eq!(target.size(), 13);
    }

    #[test]
    fn stream_read_clamps_to_file_size() {
        let mut vol = test_volume();
        let root = vol.root();
        let file = vol.dnode_lookup_path(&root, &path("hello.txt"), '/').unwrap();
        let mut shand = vol.shandle_open(&file).unwrap();
        let mut buf = [0xffu8; 100];
        let n = vol.shandle_read(&mut shand, &mut buf).unwrap();
        assert_eq!(n, 13);
        assert_eq!(&buf[..13], b"Hello, world\n");
        // A second read past end of file returns 0, not an error.
        let n2 = vol.shandle_read(&mut shand, &mut buf).unwrap();
        assert_eq!(n2, 0);
    }

    #[test]
    fn dir_read_enumerates_children_once_each() {
        let mut vol = test_volume();
        let root = vol.root();
        let mut shand = vol.shandle_open(&root).unwrap();
        let mut names = Vec::new();
        while let Some(child) = vol.dnode_dir_read(&mut shand).unwrap() {
            names.push(child.name());
        }
        assert_eq!(names.len(), 3);
        assert!(names.iter().any(|n| n.eq_cstr("usr")));
        assert!(names.iter().any(|n| n.eq_cstr("hello.txt")));
        assert!(names.iter().any(|n| n.eq_cstr("link")));
    }
}
