//! Partition-table sync skeleton: keeps a protective MBR's partition
//! entries in sync with a GPT. Independent of the filesystem stack other
//! than reading raw blocks through the same host-adapter contract;
//! out of scope beyond its interface.

use rofsw::host::HostAdapter;

#[derive(Debug)]
pub struct SyncError;

pub struct PartitionEntry {
    pub start_lba: u64,
    pub length_lba: u64,
    pub os_type: u8,
}

pub trait PartitionTable {
    /// Reads the partition table from the given host adapter.
    fn read(adapter: &mut dyn HostAdapter) -> Result<Self, SyncError>
    where
        Self: Sized;

    /// Writes a protective MBR reflecting this table's entries. Writing is
    /// out of scope for the read-only filesystem stack; this is a shape
    /// placeholder only.
    fn sync(&self, _adapter: &mut dyn HostAdapter) -> Result<(), SyncError> {
        todo!("partition-table synchronization is out of scope for the filesystem stack")
    }
}
