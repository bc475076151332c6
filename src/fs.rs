//! The mounted volume.

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::bpb::BiosParameterBlock;
use crate::device::BlockDevice;
use crate::fat::Fat;
use crate::{Error, SECTOR_SIZE};

/// A mounted FAT16 volume: the block device it came from, the decoded BPB,
/// the in-memory FAT copy and the three derived region positions. Immutable
/// after `open`; any number of open files borrow it read-only, so the
/// volume outlives every handle by construction. Dropping it releases the
/// FAT copy.
pub struct FileSystem {
    device: Arc<dyn BlockDevice>,
    bpb: BiosParameterBlock,
    fat: Fat,
    fat_start: usize,
    root_dir_start: usize,
    data_start: usize,
}

impl FileSystem {
    /// Mount the volume whose boot sector sits at `first_sector` of the
    /// device. Validates the BPB, loads the FAT (cross-checking the mirror
    /// on a two-FAT volume) and fixes the region positions.
    pub fn open(device: Arc<dyn BlockDevice>, first_sector: usize) -> Result<Self, Error> {
        let mut sector = [0u8; SECTOR_SIZE];
        device.read_sectors(&mut sector, first_sector, 1)?;
        let bpb = BiosParameterBlock::parse(&sector)?;

        let fat = Fat::load(device.as_ref(), &bpb)?;

        let fat_start = bpb.fat1_sector();
        let root_dir_start = bpb.root_dir_sector();
        let data_start = bpb.data_start_sector();

        debug!(
            "mounted FAT16 volume \"{}\": {} sectors/cluster, {} FAT(s) of {} sectors at {}, root dir at {} ({} entries), data at {}",
            bpb.volume_label(),
            bpb.sectors_per_cluster(),
            bpb.fat_cnt(),
            bpb.sectors_per_fat(),
            fat_start,
            root_dir_start,
            bpb.root_entry_cnt(),
            data_start,
        );

        Ok(Self {
            device,
            bpb,
            fat,
            fat_start,
            root_dir_start,
            data_start,
        })
    }

    pub fn bpb(&self) -> &BiosParameterBlock {
        &self.bpb
    }

    pub fn fat(&self) -> &Fat {
        &self.fat
    }

    #[inline(always)]
    pub fn cluster_size(&self) -> usize {
        self.bpb.cluster_size()
    }

    pub fn fat_start(&self) -> usize {
        self.fat_start
    }

    pub fn root_dir_start(&self) -> usize {
        self.root_dir_start
    }

    pub fn data_start(&self) -> usize {
        self.data_start
    }

    pub fn volume_id(&self) -> u32 {
        self.bpb.volume_id()
    }

    pub fn volume_label(&self) -> String {
        self.bpb.volume_label()
    }

    /// Read one whole data cluster into `buf` (which must hold at least
    /// `cluster_size` bytes).
    pub(crate) fn read_cluster(&self, cluster: u16, buf: &mut [u8]) -> Result<(), Error> {
        let first = self.bpb.first_sector_of_cluster(cluster);
        self.device
            .read_sectors(buf, first, self.bpb.sectors_per_cluster())
    }

    /// Read a materialized chain into one contiguous buffer, cluster after
    /// cluster.
    pub(crate) fn read_chain(&self, chain: &[u16]) -> Result<Vec<u8>, Error> {
        let cluster_size = self.cluster_size();
        let mut buf = vec![0u8; chain.len() * cluster_size];
        for (i, &cluster) in chain.iter().enumerate() {
            self.read_cluster(cluster, &mut buf[i * cluster_size..(i + 1) * cluster_size])?;
        }
        Ok(buf)
    }

    /// Read the fixed root directory region: `root_entry_cnt` 32-byte
    /// entries starting at `root_dir_start`.
    pub(crate) fn read_root_dir(&self) -> Result<Vec<u8>, Error> {
        let sectors = self.bpb.root_dir_sector_cnt();
        let mut buf = vec![0u8; sectors * SECTOR_SIZE];
        self.device
            .read_sectors(&mut buf, self.root_dir_start, sectors)?;
        buf.truncate(self.bpb.root_dir_byte_len());
        Ok(buf)
    }
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystem")
            .field("label", &self.volume_label())
            .field("cluster_size", &self.cluster_size())
            .field("fat_start", &self.fat_start)
            .field("root_dir_start", &self.root_dir_start)
            .field("data_start", &self.data_start)
            .finish()
    }
}
