//! Block device interface and the file-backed implementation.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use spin::RwLock;

use crate::{Error, SECTOR_SIZE};

/// A random-access reader of fixed 512-byte sectors.
///
/// The trait is the seam between the volume layer and its backing storage.
/// Implementations perform no caching: every call goes to the medium.
pub trait BlockDevice: Send + Sync {
    /// Read `sector_cnt` sectors starting at `first_sector` into `buf`.
    ///
    /// - `buf.len()` must be at least `sector_cnt * SECTOR_SIZE`
    /// - `sector_cnt` must be at least 1
    /// - `first_sector + sector_cnt` must not exceed [`BlockDevice::sector_cnt`]
    fn read_sectors(
        &self,
        buf: &mut [u8],
        first_sector: usize,
        sector_cnt: usize,
    ) -> Result<(), Error>;

    /// Total number of addressable sectors on this device.
    fn sector_cnt(&self) -> usize;
}

/// Block device backed by a raw image file.
///
/// The backing `File` cursor is repositioned by every read, so it sits
/// behind a lock; the volume layer above is strictly single-threaded but the
/// trait wants `&self` access.
#[derive(Debug)]
pub struct BlockFile {
    file: RwLock<std::fs::File>,
    sector_cnt: usize,
}

impl BlockFile {
    /// Open a volume image. The image is addressable as `len / 512` whole
    /// sectors; a trailing partial sector is not addressable.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|_| Error::NotFound)?;
        let len = file.metadata().map_err(|_| Error::NotFound)?.len() as usize;
        Ok(Self {
            file: RwLock::new(file),
            sector_cnt: len / SECTOR_SIZE,
        })
    }
}

impl BlockDevice for BlockFile {
    fn read_sectors(
        &self,
        buf: &mut [u8],
        first_sector: usize,
        sector_cnt: usize,
    ) -> Result<(), Error> {
        if sector_cnt < 1 || buf.len() < sector_cnt * SECTOR_SIZE {
            return Err(Error::InvalidArgument);
        }
        if first_sector + sector_cnt > self.sector_cnt {
            return Err(Error::OutOfRange);
        }
        let mut file = self.file.write();
        file.seek(SeekFrom::Start((first_sector * SECTOR_SIZE) as u64))
            .map_err(|_| Error::OutOfRange)?;
        file.read_exact(&mut buf[..sector_cnt * SECTOR_SIZE])
            .map_err(|_| Error::OutOfRange)?;
        Ok(())
    }

    fn sector_cnt(&self) -> usize {
        self.sector_cnt
    }
}
