//! Concrete filesystem drivers plugging into [`crate::driver::FsDriver`].

#[cfg(feature = "ext2")]
pub mod ext2;
#[cfg(feature = "reiserfs")]
pub mod reiserfs;
