//! BIOS Parameter Block (BPB) and Boot Sector
//!
//! The first important data structure on a FAT volume is the BPB, located in
//! the first sector of the volume in the Reserved Region. This sector is
//! sometimes called the "boot sector" or the "0th sector", but the important
//! fact is simply that it is the first sector of the volume.
//!
//! The whole record is decoded field by field at its fixed byte offset with
//! little-endian reads. Nothing here depends on the memory layout of a Rust
//! struct; the on-disk bytes are the single source of truth.
//!
//! Given any valid data cluster number N, the sector number of the first
//! sector of that cluster (relative to sector 0 of the volume) is:
//!     FirstSectorofCluster = ((N - 2) * BPB_SecPerClus) + FirstDataSector
//! because the first two FAT entries are reserved and cluster numbering of
//! the data region starts at 2.
//!
//! Only the handful of fields this reader consumes is validated; the
//! remaining fields (geometry hints, the extended boot signature block) are
//! decoded and kept as informational values.

use log::error;

use crate::{read_le_u16, read_le_u32, Error, DIRENT_SIZE, SECTOR_SIZE};

/// Decoded Boot Sector / BPB for a FAT12/16 volume.
///
/// Field names follow the on-disk record; all multi-byte integers are
/// little-endian on disk.
#[derive(Debug, Clone)]
pub struct BiosParameterBlock {
    /// Bytes per sector. The format allows 512, 1024, 2048 or 4096, but this
    /// reader only mounts 512.    Size: 2 bytes    Offset: 0x0B
    pub(crate) byts_per_sec: u16,
    /// Sectors per allocation unit, a power of two in 1..=128.
    /// Size: 1 byte    Offset: 0x0D
    pub(crate) sec_per_clus: u8,
    /// Sectors in the Reserved Region, starting at the boot sector.
    /// Size: 2 bytes    Offset: 0x0E
    pub(crate) rsvd_sec_cnt: u16,
    /// Count of file allocation tables; 2 is recommended, 1 is acceptable.
    /// Size: 1 byte    Offset: 0x10
    pub(crate) num_fats: u8,
    /// Maximum number of 32-byte entries in the fixed root directory.
    /// Size: 2 bytes    Offset: 0x11
    pub(crate) root_ent_cnt: u16,
    /// Total sectors when the count fits in 16 bits, else 0.
    /// Size: 2 bytes    Offset: 0x13
    pub(crate) tot_sec16: u16,
    /// Media descriptor; 0xF8 fixed disk, 0xF0 removable. Informational.
    /// Size: 1 byte    Offset: 0x15
    #[allow(dead_code)]
    pub(crate) media: u8,
    /// Sectors occupied by one FAT.    Size: 2 bytes    Offset: 0x16
    pub(crate) fat_sz16: u16,
    /// Sectors per track for INT 13h geometry. Informational.
    /// Size: 2 bytes    Offset: 0x18
    #[allow(dead_code)]
    pub(crate) sec_per_trk: u16,
    /// Head count for INT 13h geometry. Informational.
    /// Size: 2 bytes    Offset: 0x1A
    #[allow(dead_code)]
    pub(crate) num_heads: u16,
    /// Sectors preceding the partition that holds this volume.
    /// Size: 4 bytes    Offset: 0x1C
    pub(crate) hidd_sec: u32,
    /// Total sectors when the 16-bit field overflows.
    /// Size: 4 bytes    Offset: 0x20
    pub(crate) tot_sec32: u32,
    /// Volume serial number from the extended boot record.
    /// Size: 4 bytes    Offset: 0x27
    pub(crate) vol_id: u32,
    /// Volume label, space-padded ASCII.    Size: 11 bytes    Offset: 0x2B
    pub(crate) vol_lab: [u8; 11],
    /// File system type string, e.g. "FAT16   ". Informational only; it does
    /// not determine the FAT type.    Size: 8 bytes    Offset: 0x36
    pub(crate) fil_sys_type: [u8; 8],
}

impl BiosParameterBlock {
    /// Decode and validate the boot sector.
    ///
    /// Rejected with `InvalidFormat`:
    /// - `sectors_per_cluster` not a power of two (legal set {1,2,..,128})
    /// - `number_of_fats` other than 1 or 2
    /// - `bytes_per_sector` other than 512 (all sector arithmetic in this
    ///   reader is 512-based; refusing the volume beats mis-addressing it)
    pub fn parse(sector: &[u8]) -> Result<Self, Error> {
        let bpb = Self {
            byts_per_sec: read_le_u16(&sector[0x0B..]),
            sec_per_clus: sector[0x0D],
            rsvd_sec_cnt: read_le_u16(&sector[0x0E..]),
            num_fats: sector[0x10],
            root_ent_cnt: read_le_u16(&sector[0x11..]),
            tot_sec16: read_le_u16(&sector[0x13..]),
            media: sector[0x15],
            fat_sz16: read_le_u16(&sector[0x16..]),
            sec_per_trk: read_le_u16(&sector[0x18..]),
            num_heads: read_le_u16(&sector[0x1A..]),
            hidd_sec: read_le_u32(&sector[0x1C..]),
            tot_sec32: read_le_u32(&sector[0x20..]),
            vol_id: read_le_u32(&sector[0x27..]),
            vol_lab: sector[0x2B..0x36].try_into().unwrap(),
            fil_sys_type: sector[0x36..0x3E].try_into().unwrap(),
        };

        if !bpb.sec_per_clus.is_power_of_two() {
            error!(
                "sectors per cluster ({}) shall be a power of 2 in 1..=128",
                bpb.sec_per_clus
            );
            return Err(Error::InvalidFormat);
        }
        if bpb.num_fats != 1 && bpb.num_fats != 2 {
            error!("number of FATs ({}) shall be 1 or 2", bpb.num_fats);
            return Err(Error::InvalidFormat);
        }
        if bpb.byts_per_sec as usize != SECTOR_SIZE {
            error!(
                "bytes per sector ({}) is unsupported; only 512 is mounted",
                bpb.byts_per_sec
            );
            return Err(Error::InvalidFormat);
        }

        Ok(bpb)
    }

    pub fn bytes_per_sector(&self) -> usize {
        self.byts_per_sec as usize
    }

    pub fn sectors_per_cluster(&self) -> usize {
        self.sec_per_clus as usize
    }

    #[inline(always)]
    pub fn cluster_size(&self) -> usize {
        self.sectors_per_cluster() * self.bytes_per_sector()
    }

    pub fn fat_cnt(&self) -> usize {
        self.num_fats as usize
    }

    pub fn sectors_per_fat(&self) -> usize {
        self.fat_sz16 as usize
    }

    pub fn reserved_sector_cnt(&self) -> usize {
        self.rsvd_sec_cnt as usize
    }

    pub fn root_entry_cnt(&self) -> usize {
        self.root_ent_cnt as usize
    }

    pub fn hidden_sector_cnt(&self) -> usize {
        self.hidd_sec as usize
    }

    /// Total sectors of the volume, whichever of the two fields is in use.
    pub fn total_sector_cnt(&self) -> usize {
        if self.tot_sec16 != 0 {
            self.tot_sec16 as usize
        } else {
            self.tot_sec32 as usize
        }
    }

    #[inline(always)]
    /// First sector of FAT #1.
    pub fn fat1_sector(&self) -> usize {
        self.reserved_sector_cnt()
    }

    #[inline(always)]
    /// First sector of the fixed root directory region.
    pub fn root_dir_sector(&self) -> usize {
        self.fat1_sector() + self.fat_cnt() * self.sectors_per_fat()
    }

    #[inline(always)]
    /// Sectors occupied by the root directory region.
    ///
    /// Note that this computation rounds up; the region is read whole and
    /// then truncated to `root_entry_cnt * 32` bytes.
    pub fn root_dir_sector_cnt(&self) -> usize {
        (self.root_ent_cnt as usize * DIRENT_SIZE + self.bytes_per_sector() - 1)
            / self.bytes_per_sector()
    }

    /// Bytes of the root directory region that hold entries.
    pub fn root_dir_byte_len(&self) -> usize {
        self.root_ent_cnt as usize * DIRENT_SIZE
    }

    #[inline(always)]
    /// First sector of the data region, the home of cluster 2.
    ///
    /// The hidden-sector count participates here (and only here); the FAT
    /// and root-directory positions count from the start of the image.
    pub fn data_start_sector(&self) -> usize {
        self.hidden_sector_cnt()
            + self.reserved_sector_cnt()
            + self.fat_cnt() * self.sectors_per_fat()
            + self.root_dir_sector_cnt()
    }

    #[inline(always)]
    /// The first sector of data cluster `cluster`, which must be >= 2.
    pub fn first_sector_of_cluster(&self, cluster: u16) -> usize {
        assert!(cluster >= 2);
        self.data_start_sector() + (cluster as usize - 2) * self.sectors_per_cluster()
    }

    pub fn volume_id(&self) -> u32 {
        self.vol_id
    }

    /// Volume label with the trailing space padding removed.
    pub fn volume_label(&self) -> String {
        let end = self
            .vol_lab
            .iter()
            .rposition(|&b| b != b' ')
            .map_or(0, |i| i + 1);
        self.vol_lab[..end]
            .iter()
            .map(|&b| b as char)
            .collect()
    }

    /// The informational type string, e.g. "FAT16   ". It does not
    /// determine the FAT type and is not validated.
    pub fn file_system_type(&self) -> &[u8; 8] {
        &self.fil_sys_type
    }
}
