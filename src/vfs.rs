//! Absolute path resolution over the directory tree.
//!
//! Paths are backslash-separated and case-insensitive; a leading `\` is
//! optional and empty components are ignored, so `\A\B`, `A\B` and `A\\B\`
//! all name the same object. `.` keeps the current directory and `..` pops
//! to the parent — popping past the root is an error, the root has no
//! parent.
//!
//! Resolution keeps a stack of fully loaded directory buffers: the root
//! region first, then one buffer per sub-directory entered. Every loaded
//! buffer is dropped as soon as the walk leaves it, and all of them unwind
//! automatically when a step fails.

use log::trace;

use crate::dir::{self, Dir};
use crate::entry::ShortDirEntry;
use crate::file::File;
use crate::fs::FileSystem;
use crate::Error;

/// What a path resolved to.
enum Resolved {
    /// A directory, with its content loaded whole.
    Dir(Vec<u8>),
    /// A regular file (or any non-directory entry) in final position.
    File(ShortDirEntry),
}

fn resolve(fs: &FileSystem, path: &str) -> Result<Resolved, Error> {
    let upper = path.to_ascii_uppercase();
    let components: Vec<&str> = upper.split('\\').filter(|c| !c.is_empty()).collect();

    let mut stack: Vec<Vec<u8>> = vec![fs.read_root_dir()?];

    for (i, component) in components.iter().enumerate() {
        let last = i + 1 == components.len();
        match *component {
            "." => continue,
            ".." => {
                if stack.len() == 1 {
                    // already at the root
                    return Err(Error::NotFound);
                }
                stack.pop();
            }
            name => {
                let current = stack.last().unwrap();
                let sde = dir::find_in_dir(current, name).ok_or(Error::NotFound)?;
                trace!("resolved component {:?} (attr {:#04x})", name, sde.attr());

                if sde.is_volume_label() {
                    return Err(Error::NotADirectory);
                }
                if !sde.is_dir() {
                    if last {
                        return Ok(Resolved::File(sde));
                    }
                    return Err(Error::NotADirectory);
                }

                let chain = fs.fat().cluster_chain(sde.first_cluster())?;
                let buf = fs.read_chain(&chain)?;
                stack.push(buf);
            }
        }
    }

    Ok(Resolved::Dir(stack.pop().unwrap()))
}

impl FileSystem {
    /// Open the root directory for enumeration.
    pub fn root_dir(&self) -> Result<Dir, Error> {
        Ok(Dir::new(self.read_root_dir()?))
    }

    /// Resolve `path` to a regular file and open it with the offset at 0.
    /// A path naming a directory fails with `IsADirectory`.
    pub fn open_file(&self, path: &str) -> Result<File<'_>, Error> {
        match resolve(self, path)? {
            Resolved::Dir(_) => Err(Error::IsADirectory),
            Resolved::File(entry) => File::new(self, entry),
        }
    }

    /// Resolve `path` to a directory and open it for enumeration. A path
    /// naming a regular file fails with `NotADirectory`.
    pub fn open_dir(&self, path: &str) -> Result<Dir, Error> {
        match resolve(self, path)? {
            Resolved::File(_) => Err(Error::NotADirectory),
            Resolved::Dir(buf) => Ok(Dir::new(buf)),
        }
    }
}
