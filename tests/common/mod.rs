//! Shared test support: assemble a FAT16 volume image in memory, write it to
//! a temp file and mount it through the real file-backed device.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fat16::{
    BlockFile, FileSystem, ATTR_VOLUME_ID, DIRENT_SIZE, FREE_CLUSTER, LAST_LONG_ENTRY, SECTOR_SIZE,
};

/// A volume image on disk; the file is removed when the value drops.
pub struct TempImage {
    pub path: PathBuf,
}

impl TempImage {
    pub fn new(bytes: &[u8]) -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "fat16-rs-{}-{}.img",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&path, bytes).unwrap();
        Self { path }
    }

    pub fn mount(&self) -> FileSystem {
        let device = Arc::new(BlockFile::open(&self.path).unwrap());
        FileSystem::open(device, 0).unwrap()
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        std::fs::remove_file(&self.path).ok();
    }
}

/// Assembles a minimal but well-formed FAT16 volume: boot sector, one or two
/// FATs, the fixed root region and a data region sized to the clusters
/// actually written.
pub struct ImageBuilder {
    sec_per_clus: u8,
    rsvd_sec_cnt: u16,
    num_fats: u8,
    root_ent_cnt: u16,
    fat_sz16: u16,
    label: [u8; 11],
    fat: Vec<u16>,
    root: Vec<u8>,
    data: Vec<u8>,
}

impl ImageBuilder {
    pub fn new(sec_per_clus: u8, num_fats: u8, root_ent_cnt: u16, fat_sz16: u16) -> Self {
        let mut fat = vec![FREE_CLUSTER; fat_sz16 as usize * SECTOR_SIZE / 2];
        fat[0] = 0xFFF8; // media descriptor entry
        fat[1] = 0xFFFF;
        Self {
            sec_per_clus,
            rsvd_sec_cnt: 1,
            num_fats,
            root_ent_cnt,
            fat_sz16,
            label: *b"TESTVOL    ",
            fat,
            root: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn cluster_size(&self) -> usize {
        self.sec_per_clus as usize * SECTOR_SIZE
    }

    pub fn set_fat(&mut self, cluster: u16, value: u16) {
        self.fat[cluster as usize] = value;
    }

    /// Link `clusters` into a chain, ending it after the last one.
    pub fn chain(&mut self, clusters: &[u16]) {
        for pair in clusters.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat(last, 0xFFFF);
        }
    }

    /// Place raw bytes at the start of a data cluster, growing the data
    /// region as needed (clusters are always materialized whole).
    pub fn write_cluster(&mut self, cluster: u16, bytes: &[u8]) {
        let cs = self.cluster_size();
        assert!(bytes.len() <= cs);
        let at = (cluster as usize - 2) * cs;
        if self.data.len() < at + cs {
            self.data.resize(at + cs, 0);
        }
        self.data[at..at + bytes.len()].copy_from_slice(bytes);
    }

    /// Store `content` across `clusters` (in that order) and link them.
    pub fn file(&mut self, clusters: &[u16], content: &[u8]) {
        assert!(content.len() <= clusters.len() * self.cluster_size());
        self.chain(clusters);
        for (i, &cluster) in clusters.iter().enumerate() {
            let at = i * self.cluster_size();
            let end = (at + self.cluster_size()).min(content.len());
            if at < content.len() {
                self.write_cluster(cluster, &content[at..end]);
            } else {
                self.write_cluster(cluster, &[]);
            }
        }
    }

    pub fn push_root(&mut self, slot: [u8; DIRENT_SIZE]) {
        assert!(self.root.len() / DIRENT_SIZE < self.root_ent_cnt as usize);
        self.root.extend_from_slice(&slot);
    }

    pub fn build(&self) -> Vec<u8> {
        let root_sectors =
            (self.root_ent_cnt as usize * DIRENT_SIZE + SECTOR_SIZE - 1) / SECTOR_SIZE;
        let data_sectors = self.data.len() / SECTOR_SIZE;
        let total = self.rsvd_sec_cnt as usize
            + self.num_fats as usize * self.fat_sz16 as usize
            + root_sectors
            + data_sectors;

        let mut img = vec![0u8; total * SECTOR_SIZE];

        // boot sector
        img[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        img[3..11].copy_from_slice(b"MSDOS5.0");
        img[0x0B..0x0D].copy_from_slice(&(SECTOR_SIZE as u16).to_le_bytes());
        img[0x0D] = self.sec_per_clus;
        img[0x0E..0x10].copy_from_slice(&self.rsvd_sec_cnt.to_le_bytes());
        img[0x10] = self.num_fats;
        img[0x11..0x13].copy_from_slice(&self.root_ent_cnt.to_le_bytes());
        img[0x13..0x15].copy_from_slice(&(total as u16).to_le_bytes());
        img[0x15] = 0xF8;
        img[0x16..0x18].copy_from_slice(&self.fat_sz16.to_le_bytes());
        img[0x18..0x1A].copy_from_slice(&32u16.to_le_bytes());
        img[0x1A..0x1C].copy_from_slice(&2u16.to_le_bytes());
        img[0x24] = 0x80;
        img[0x26] = 0x29;
        img[0x27..0x2B].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        img[0x2B..0x36].copy_from_slice(&self.label);
        img[0x36..0x3E].copy_from_slice(b"FAT16   ");
        img[0x1FE..0x200].copy_from_slice(&[0x55, 0xAA]);

        // FAT copies
        let mut at = self.rsvd_sec_cnt as usize * SECTOR_SIZE;
        for _ in 0..self.num_fats {
            for &entry in &self.fat {
                img[at..at + 2].copy_from_slice(&entry.to_le_bytes());
                at += 2;
            }
        }

        // root directory region
        let root_at = (self.rsvd_sec_cnt as usize
            + self.num_fats as usize * self.fat_sz16 as usize)
            * SECTOR_SIZE;
        img[root_at..root_at + self.root.len()].copy_from_slice(&self.root);

        // data region
        let data_at = root_at + root_sectors * SECTOR_SIZE;
        img[data_at..data_at + self.data.len()].copy_from_slice(&self.data);

        img
    }

    pub fn build_image(&self) -> TempImage {
        TempImage::new(&self.build())
    }

    /// Byte offset of FAT #2 inside the built image; for mirror-corruption
    /// tests.
    pub fn fat2_offset(&self) -> usize {
        (self.rsvd_sec_cnt as usize + self.fat_sz16 as usize) * SECTOR_SIZE
    }
}

/// A 32-byte short entry. `name` is the display form (`HELLO.TXT`, `DIR1`,
/// `.`/`..`).
pub fn sfn(name: &str, attr: u8, first_cluster: u16, size: u32) -> [u8; DIRENT_SIZE] {
    let mut raw = [0u8; DIRENT_SIZE];
    raw[..11].copy_from_slice(&format_83(name));
    raw[0x0B] = attr;
    raw[0x1A..0x1C].copy_from_slice(&first_cluster.to_le_bytes());
    raw[0x1C..0x20].copy_from_slice(&size.to_le_bytes());
    raw
}

fn format_83(name: &str) -> [u8; 11] {
    let mut out = [b' '; 11];
    if name == "." || name == ".." {
        out[..name.len()].copy_from_slice(name.as_bytes());
        return out;
    }
    let (base, ext) = match name.rfind('.') {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => (name, ""),
    };
    assert!(base.len() <= 8 && ext.len() <= 3);
    out[..base.len()].copy_from_slice(base.as_bytes());
    out[8..8 + ext.len()].copy_from_slice(ext.as_bytes());
    out
}

/// The volume-label root entry.
pub fn volume_label(label: &str) -> [u8; DIRENT_SIZE] {
    let mut raw = [0u8; DIRENT_SIZE];
    let mut field = [b' '; 11];
    field[..label.len()].copy_from_slice(label.as_bytes());
    raw[..11].copy_from_slice(&field);
    raw[0x0B] = ATTR_VOLUME_ID;
    raw
}

/// Mark a slot deleted.
pub fn deleted(mut slot: [u8; DIRENT_SIZE]) -> [u8; DIRENT_SIZE] {
    slot[0] = 0xE5;
    slot
}

/// The long-name run for `long_name`, in on-disk order (logically last slot
/// first, marked with LAST_LONG_ENTRY), ready to be placed directly before
/// the short entry.
pub fn lfn_run(long_name: &str) -> Vec<[u8; DIRENT_SIZE]> {
    let units: Vec<u16> = long_name.chars().map(|c| c as u16).collect();
    let slot_cnt = (units.len() + 12) / 13;
    let mut slots = Vec::new();
    for ord in (1..=slot_cnt).rev() {
        let chunk = &units[(ord - 1) * 13..(ord * 13).min(units.len())];
        let mut ord_byte = ord as u8;
        if ord == slot_cnt {
            ord_byte |= LAST_LONG_ENTRY;
        }
        slots.push(lfn_slot(ord_byte, chunk));
    }
    slots
}

fn lfn_slot(ord: u8, units_in: &[u16]) -> [u8; DIRENT_SIZE] {
    let mut units = [0xFFFFu16; 13];
    units[..units_in.len()].copy_from_slice(units_in);
    if units_in.len() < 13 {
        units[units_in.len()] = 0x0000;
    }

    let mut raw = [0u8; DIRENT_SIZE];
    raw[0] = ord;
    raw[0x0B] = 0x0F;
    for (i, u) in units[..5].iter().enumerate() {
        raw[0x01 + 2 * i..0x01 + 2 * i + 2].copy_from_slice(&u.to_le_bytes());
    }
    for (i, u) in units[5..11].iter().enumerate() {
        raw[0x0E + 2 * i..0x0E + 2 * i + 2].copy_from_slice(&u.to_le_bytes());
    }
    for (i, u) in units[11..].iter().enumerate() {
        raw[0x1C + 2 * i..0x1C + 2 * i + 2].copy_from_slice(&u.to_le_bytes());
    }
    raw
}

/// Concatenate directory slots into cluster content.
pub fn slots_bytes(slots: &[[u8; DIRENT_SIZE]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(slots.len() * DIRENT_SIZE);
    for s in slots {
        out.extend_from_slice(s);
    }
    out
}
