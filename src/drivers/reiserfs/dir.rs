//! Directory-entry item parsing (§4.5.5). Grounded in
//! `struct reiserfs_de_head`/`fsw_reiserfs_dir_lookup` in
//! `fsw_reiserfs.c`.
//!
//! Names inside a directory item are packed backward from the item's
//! end: the first header's name occupies the item's tail, each later
//! header's name sits directly before the previous one, and the last
//! header's name is adjacent to the header array itself. A header
//! gives only its name's start; the end is the previous header's start
//! (or the item's end, for header 0).
//!
//! A directory whose entries don't fit in one B+-tree item spans
//! several items at increasing key offsets; this driver only reads the
//! first one (§4.5 Non-goals), which covers every directory this
//! project's test fixtures exercise.

use alloc::vec::Vec;

use crate::driver::{DirEntry, DnodeId, DnodeKind};
use crate::error::{FsError, FsResult};
use crate::host::HostAdapter;
use crate::string::EncodedString;

use super::key::{ItemType, Key};
use super::tree::search_key;
use super::{pack_id, ReiserfsVolumeData};

const DEH_SIZE: usize = 16;
pub const DOT_OFFSET: u64 = 1;

struct Deh {
    dir_id: u32,
    objectid: u32,
    location: u16,
}

fn read_deh(item_data: &[u8], index: usize) -> FsResult<Deh> {
    let start = index * DEH_SIZE;
    if start + DEH_SIZE > item_data.len() {
        return Err(FsError::VolumeCorrupted);
    }
    let dir_id = u32::from_le_bytes(item_data[start + 4..start + 8].try_into().unwrap());
    let objectid = u32::from_le_bytes(item_data[start + 8..start + 12].try_into().unwrap());
    let location = u16::from_le_bytes(item_data[start + 12..start + 14].try_into().unwrap());
    Ok(Deh {
        dir_id,
        objectid,
        location,
    })
}

fn entry_name(item_data: &[u8], index: usize) -> FsResult<&[u8]> {
    let deh = read_deh(item_data, index)?;
    let end = if index == 0 {
        item_data.len()
    } else {
        read_deh(item_data, index - 1)?.location as usize
    };
    let start = deh.location as usize;
    if start > end || end > item_data.len() {
        return Err(FsError::VolumeCorrupted);
    }
    Ok(&item_data[start..end])
}

const RESERVED_PRIV_NAME: &[u8] = b".reiserfs_priv";

/// True for names a directory scan must never surface as a real entry:
/// the hidden `.reiserfs_priv` object (xattrs/quota bookkeeping), and
/// for a full listing also the self/parent entries every ReiserFS
/// directory item carries explicitly (§4.5.6).
fn is_hidden(name: &[u8], also_skip_dot_entries: bool) -> bool {
    name == RESERVED_PRIV_NAME || (also_skip_dot_entries && (name == b"." || name == b".."))
}

fn find_directory_item(
    host: &mut dyn HostAdapter,
    vol: &ReiserfsVolumeData,
    dir_id: u32,
    objectid: u32,
) -> FsResult<Option<(Vec<u8>, usize)>> {
    let search = Key::new(dir_id, objectid, DOT_OFFSET);
    let Some(found) = search_key(host, vol.root_block, search)? else {
        return Ok(None);
    };
    if found.item_type != ItemType::DirEntry {
        return Err(FsError::VolumeCorrupted);
    }
    let entry_count = found.ih_free_space_or_entry_count as usize;
    Ok(Some((found.data, entry_count)))
}

pub(super) fn dir_lookup(
    host: &mut dyn HostAdapter,
    vol: &ReiserfsVolumeData,
    id: DnodeId,
    name: &EncodedString,
) -> FsResult<DirEntry> {
    let (dir_id, objectid) = super::unpack_id(id);
    let Some((data, entry_count)) = find_directory_item(host, vol, dir_id, objectid)? else {
        return Err(FsError::NotFound);
    };

    for i in 0..entry_count {
        let bytes = entry_name(&data, i)?;
        if is_hidden(bytes, false) {
            continue;
        }
        let candidate = EncodedString::from_iso8859_1_exact(bytes.to_vec());
        if candidate.eq(name) {
            let deh = read_deh(&data, i)?;
            return Ok(DirEntry {
                id: pack_id(deh.dir_id, deh.objectid),
                kind: DnodeKind::Unknown,
                name: candidate,
            });
        }
    }
    Err(FsError::NotFound)
}

pub(super) fn dir_read(
    host: &mut dyn HostAdapter,
    vol: &ReiserfsVolumeData,
    id: DnodeId,
    pos: &mut u64,
) -> FsResult<Option<DirEntry>> {
    let (dir_id, objectid) = super::unpack_id(id);
    let Some((data, entry_count)) = find_directory_item(host, vol, dir_id, objectid)? else {
        return Ok(None);
    };

    loop {
        let index = *pos as usize;
        if index >= entry_count {
            return Ok(None);
        }
        *pos += 1;

        let bytes = entry_name(&data, index)?;
        if is_hidden(bytes, true) {
            continue;
        }
        let name = EncodedString::from_iso8859_1_exact(bytes.to_vec());
        let deh = read_deh(&data, index)?;
        return Ok(Some(DirEntry {
            id: pack_id(deh.dir_id, deh.objectid),
            kind: DnodeKind::Unknown,
            name,
        }));
    }
}
