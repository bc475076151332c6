//! File handles: seekable byte streams over a cluster chain.

use std::fmt;

use crate::entry::ShortDirEntry;
use crate::fs::FileSystem;
use crate::Error;

/// Where a [`File::seek`] measures from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    /// Absolute offset; accepted in `0..=size`.
    Start(usize),
    /// Relative to the current offset; the target must land in `0..=size`.
    Current(isize),
    /// Relative to the end; only non-positive deltas are meaningful.
    End(isize),
}

/// An open file. Owns a copy of its directory entry and its fully
/// materialized cluster chain, and borrows the volume it lives on; the byte
/// offset stays within `[0, size]`.
pub struct File<'fs> {
    fs: &'fs FileSystem,
    entry: ShortDirEntry,
    chain: Vec<u16>,
    offset: usize,
}

impl<'fs> File<'fs> {
    pub(crate) fn new(fs: &'fs FileSystem, entry: ShortDirEntry) -> Result<Self, Error> {
        // A zero first-cluster means nothing is allocated (zero-length
        // file); the chain is empty and `size` already bounds every read.
        let chain = if entry.first_cluster() >= 2 {
            fs.fat().cluster_chain(entry.first_cluster())?
        } else {
            Vec::new()
        };
        Ok(Self {
            fs,
            entry,
            chain,
            offset: 0,
        })
    }

    /// File size in bytes, from the directory entry.
    pub fn size(&self) -> usize {
        self.entry.file_size() as usize
    }

    /// Normalized `NAME.EXT` short name of the file.
    pub fn name(&self) -> String {
        self.entry.name()
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The ordered cluster indices backing this file.
    pub fn cluster_chain(&self) -> &[u16] {
        &self.chain
    }

    /// Read up to `buf.len()` bytes at the current offset, advancing it by
    /// the count returned. Returns 0 at end of file. The file size is a
    /// hard bound: bytes past it are never produced, even when the final
    /// cluster extends further.
    ///
    /// On a device error nothing is consumed: the offset is left where it
    /// was and only `buf` may have been partially scribbled.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let size = self.size();
        if self.offset >= size || buf.is_empty() {
            return Ok(0);
        }

        let cluster_size = self.fs.cluster_size();
        let end = (self.offset + buf.len()).min(size);
        let mut bounce = vec![0u8; cluster_size];
        let mut pos = self.offset;
        let mut copied = 0;

        while pos < end {
            let cluster_in_chain = pos / cluster_size;
            let byte_in_cluster = pos % cluster_size;
            let cluster = *self
                .chain
                .get(cluster_in_chain)
                .ok_or(Error::InvalidFormat)?;
            self.fs.read_cluster(cluster, &mut bounce)?;

            let len = (cluster_size - byte_in_cluster).min(end - pos);
            buf[copied..copied + len]
                .copy_from_slice(&bounce[byte_in_cluster..byte_in_cluster + len]);
            pos += len;
            copied += len;
        }

        self.offset = pos;
        Ok(copied)
    }

    /// Reposition the offset. The new offset is returned; a target outside
    /// `[0, size]` fails with `NoSuchAddress` and leaves the offset alone.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<usize, Error> {
        let size = self.size();
        let target = match pos {
            SeekFrom::Start(offset) => {
                if offset > size {
                    return Err(Error::NoSuchAddress);
                }
                offset
            }
            SeekFrom::Current(delta) => {
                let target = self.offset as isize + delta;
                if target < 0 || target as usize > size {
                    return Err(Error::NoSuchAddress);
                }
                target as usize
            }
            SeekFrom::End(delta) => {
                if delta > 0 {
                    return Err(Error::NoSuchAddress);
                }
                let target = size as isize + delta;
                if target < 0 {
                    return Err(Error::NoSuchAddress);
                }
                target as usize
            }
        };
        self.offset = target;
        Ok(target)
    }
}

impl fmt::Debug for File<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name())
            .field("size", &self.size())
            .field("offset", &self.offset)
            .field("clusters", &self.chain.len())
            .finish()
    }
}
