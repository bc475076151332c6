//! FAT Directory Entries
//!
//! A directory is nothing but a file whose content is a flat array of
//! 32-byte entries. Special notes about the first byte (DIR_Name[0]) of an
//! entry:
//! - 0xE5: the entry is free (deleted).
//! - 0x00: the entry is free and no allocated entries follow it, so a scan
//!   may stop here.
//! - 0x05: the real first name character is 0xE5 (a valid KANJI lead byte);
//!   this reader treats such slots as deleted rather than decode them.
//!
//! The DIR_Name field is broken into the 8-character main part and the
//! 3-character extension, both trailing-space padded with 0x20, with an
//! implied '.' between them that is not stored.
//!
//! A set of long-name entries is always associated with the short entry it
//! immediately precedes. Every member of the set is numbered in LDIR_Ord
//! starting at 1 for the slot closest to the short entry, and the last
//! member (stored first on disk) is or'd with LAST_LONG_ENTRY. Name
//! characters are UTF-16LE in three disjoint regions of 5, 6 and 2 units;
//! after the name a 0x0000 terminator is stored and the remaining units are
//! padded with 0xFFFF. This reader flattens units to ASCII by dropping the
//! high byte and keeping printable characters only.

use crate::{
    read_le_u16, read_le_u32, ATTR_ARCHIVE, ATTR_DIRECTORY, ATTR_HIDDEN, ATTR_LONG_NAME,
    ATTR_READ_ONLY, ATTR_SYSTEM, ATTR_VOLUME_ID, DIR_ENTRY_LAST_AND_UNUSED, DIR_ENTRY_UNUSED,
    LAST_LONG_ENTRY, LONG_NAME_LEN,
};

/// Decoded 32-byte short (8.3) directory entry.
///
/// 8 + 3 + 1 + 1 + 1 + 2 + 2 + 2 + 2 + 2 + 2 + 2 + 4 = 32 bytes
#[derive(Debug, Clone, Copy)]
pub struct ShortDirEntry {
    /// Main name part, space padded.    Offset: 0x00
    name: [u8; 8],
    /// Extension, space padded.    Offset: 0x08
    extension: [u8; 3],
    /// Attribute bits; 0x0F here marks a long-name slot instead.
    /// Offset: 0x0B
    attr: u8,
    /// Reserved for Windows NT (name-case hints).    Offset: 0x0C
    #[allow(dead_code)]
    nt_res: u8,
    /// Creation time, tenths of a second, 0-199.    Offset: 0x0D
    #[allow(dead_code)]
    crt_time_tenth: u8,
    /// Creation time, 2-second granularity.    Offset: 0x0E
    #[allow(dead_code)]
    crt_time: u16,
    /// Creation date.    Offset: 0x10
    #[allow(dead_code)]
    crt_date: u16,
    /// Last access date.    Offset: 0x12
    #[allow(dead_code)]
    lst_acc_date: u16,
    /// High word of the first cluster; always 0 on FAT12/16.    Offset: 0x14
    #[allow(dead_code)]
    fst_clus_hi: u16,
    /// Last write time.    Offset: 0x16
    #[allow(dead_code)]
    wrt_time: u16,
    /// Last write date.    Offset: 0x18
    #[allow(dead_code)]
    wrt_date: u16,
    /// Low word of the first cluster; the whole number on FAT16.
    /// Offset: 0x1A
    fst_clus_lo: u16,
    /// File size in bytes; always 0 for a directory (directories are sized
    /// by following their cluster chain to the EOC mark).    Offset: 0x1C
    file_size: u32,
}

impl ShortDirEntry {
    /// Decode one 32-byte slot.
    pub(crate) fn from_bytes(raw: &[u8]) -> Self {
        Self {
            name: raw[0x00..0x08].try_into().unwrap(),
            extension: raw[0x08..0x0B].try_into().unwrap(),
            attr: raw[0x0B],
            nt_res: raw[0x0C],
            crt_time_tenth: raw[0x0D],
            crt_time: read_le_u16(&raw[0x0E..]),
            crt_date: read_le_u16(&raw[0x10..]),
            lst_acc_date: read_le_u16(&raw[0x12..]),
            fst_clus_hi: read_le_u16(&raw[0x14..]),
            wrt_time: read_le_u16(&raw[0x16..]),
            wrt_date: read_le_u16(&raw[0x18..]),
            fst_clus_lo: read_le_u16(&raw[0x1A..]),
            file_size: read_le_u32(&raw[0x1C..]),
        }
    }

    /// The normalized `NAME.EXT` form: printable non-space bytes of the main
    /// part, then a dot and the extension when one is present. At most 12
    /// characters.
    pub fn name(&self) -> String {
        let mut name = String::with_capacity(12);
        for &b in self.name.iter() {
            if b.is_ascii_graphic() {
                name.push(b as char);
            }
        }
        if self.extension.iter().any(|b| b.is_ascii_graphic()) {
            name.push('.');
            for &b in self.extension.iter() {
                if b.is_ascii_graphic() {
                    name.push(b as char);
                }
            }
        }
        name
    }

    /// Directory entry is free and terminates the scan.
    pub fn is_empty(&self) -> bool {
        self.name[0] == DIR_ENTRY_LAST_AND_UNUSED
    }

    /// Directory entry is a deleted slot (or a KANJI-escaped one, skipped
    /// alike).
    pub fn is_deleted(&self) -> bool {
        self.name[0] == DIR_ENTRY_UNUSED || self.name[0] == 0x05
    }

    /// The slot actually belongs to a long-name run.
    pub fn is_long(&self) -> bool {
        self.attr == ATTR_LONG_NAME
    }

    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    /// Only meaningful on a decoded short entry (the bit is also part of the
    /// long-name marker).
    pub fn is_volume_label(&self) -> bool {
        self.attr & ATTR_VOLUME_ID != 0
    }

    pub fn attr(&self) -> u8 {
        self.attr
    }

    /// Start cluster of the entry's content; on FAT16 only the low word
    /// counts.
    pub fn first_cluster(&self) -> u16 {
        self.fst_clus_lo
    }

    pub fn file_size(&self) -> u32 {
        self.file_size
    }
}

/// Decoded 32-byte long-name slot.
///
/// 1 + 2*5 + 1 + 1 + 1 + 2*6 + 2 + 2*2 = 32 bytes
#[derive(Debug, Clone, Copy)]
pub struct LongDirEntry {
    /// Sequence byte: low bits are the 1-based ordinal, LAST_LONG_ENTRY
    /// marks the logically last slot (stored first on disk).    Offset: 0x00
    ord: u8,
    /// Name characters 1-5, UTF-16LE.    Offset: 0x01
    name1: [u16; 5],
    /// Must equal ATTR_LONG_NAME.    Offset: 0x0B
    #[allow(dead_code)]
    attr: u8,
    /// Zero for a name sub-component.    Offset: 0x0C
    #[allow(dead_code)]
    ldir_type: u8,
    /// Checksum of the short name this run belongs to.    Offset: 0x0D
    #[allow(dead_code)]
    chk_sum: u8,
    /// Name characters 6-11.    Offset: 0x0E
    name2: [u16; 6],
    /// Must be zero; kept for layout fidelity.    Offset: 0x1A
    #[allow(dead_code)]
    fst_clus_lo: u16,
    /// Name characters 12-13.    Offset: 0x1C
    name3: [u16; 2],
}

impl LongDirEntry {
    /// Decode one 32-byte slot.
    pub(crate) fn from_bytes(raw: &[u8]) -> Self {
        let mut name1 = [0u16; 5];
        for (i, unit) in name1.iter_mut().enumerate() {
            *unit = read_le_u16(&raw[0x01 + 2 * i..]);
        }
        let mut name2 = [0u16; 6];
        for (i, unit) in name2.iter_mut().enumerate() {
            *unit = read_le_u16(&raw[0x0E + 2 * i..]);
        }
        let mut name3 = [0u16; 2];
        for (i, unit) in name3.iter_mut().enumerate() {
            *unit = read_le_u16(&raw[0x1C + 2 * i..]);
        }
        Self {
            ord: raw[0x00],
            name1,
            attr: raw[0x0B],
            ldir_type: raw[0x0C],
            chk_sum: raw[0x0D],
            name2,
            fst_clus_lo: read_le_u16(&raw[0x1A..]),
            name3,
        }
    }

    pub fn order(&self) -> u8 {
        self.ord & (LAST_LONG_ENTRY - 1)
    }

    /// Logically last slot of the run (the first one encountered walking
    /// backwards from the short entry ends the walk).
    pub fn is_last(&self) -> bool {
        self.ord & LAST_LONG_ENTRY != 0
    }

    pub fn is_deleted(&self) -> bool {
        self.ord == DIR_ENTRY_UNUSED
    }

    /// The slot's up-to-13 name units in on-disk order.
    pub fn name_utf16(&self) -> [u16; LONG_NAME_LEN] {
        let mut units = [0u16; LONG_NAME_LEN];
        units[..5].copy_from_slice(&self.name1);
        units[5..11].copy_from_slice(&self.name2);
        units[11..].copy_from_slice(&self.name3);
        units
    }

    /// Append this slot's name characters to `out`, flattened to ASCII: the
    /// 0x0000 terminator stops the slot, 0xFFFF padding is skipped, and a
    /// unit survives only when it is printable ASCII itself.
    pub fn append_name_ascii(&self, out: &mut String) {
        for unit in self.name_utf16() {
            if unit == 0x0000 {
                break;
            }
            if (0x20..=0x7E).contains(&unit) {
                out.push(unit as u8 as char);
            }
        }
    }
}

/// The logical result of a directory walk: one live entry with its
/// reassembled long name, if any preceded it.
#[derive(Debug, Clone)]
pub struct DirEntry {
    name: String,
    long_name: Option<String>,
    size: u32,
    first_cluster: u16,
    attr: u8,
}

impl DirEntry {
    pub(crate) fn from_parts(sde: &ShortDirEntry, long_name: Option<String>) -> Self {
        Self {
            name: sde.name(),
            long_name,
            size: sde.file_size(),
            first_cluster: sde.first_cluster(),
            attr: sde.attr(),
        }
    }

    /// Normalized short name, `NAME.EXT`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reassembled long name, on-disk case preserved.
    pub fn long_name(&self) -> Option<&str> {
        self.long_name.as_deref()
    }

    /// The name a listing would display: the long one when present.
    pub fn display_name(&self) -> &str {
        self.long_name.as_deref().unwrap_or(&self.name)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn first_cluster(&self) -> u16 {
        self.first_cluster
    }

    pub fn attr(&self) -> u8 {
        self.attr
    }

    pub fn is_read_only(&self) -> bool {
        self.attr & ATTR_READ_ONLY != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.attr & ATTR_HIDDEN != 0
    }

    pub fn is_system(&self) -> bool {
        self.attr & ATTR_SYSTEM != 0
    }

    pub fn is_archived(&self) -> bool {
        self.attr & ATTR_ARCHIVE != 0
    }

    /// Directory test by the attribute bit. (The size field is no proxy:
    /// empty regular files are also zero-sized.)
    pub fn is_directory(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    pub fn is_volume_label(&self) -> bool {
        self.attr & ATTR_VOLUME_ID != 0
    }
}
