//! Mach-O-style fat-archive writer interface skeleton. Independent
//! build-time utility; out of scope beyond its interface.

#[derive(Debug)]
pub struct ArchiveError;

/// Architecture identifier for one slice of a fat archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Ia32,
    X64,
}

pub trait FatArchiveWriter {
    /// Adds one architecture's executable bytes as a slice of the archive.
    fn add_slice(&mut self, arch: Arch, bytes: &[u8]) -> Result<(), ArchiveError>;

    /// Finalizes the archive and returns its encoded bytes.
    fn finish(self) -> Result<Vec<u8>, ArchiveError>;
}
