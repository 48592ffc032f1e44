use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error opening {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("Error mapping {}: {source}", .path.display())]
    Mmap { path: PathBuf, source: io::Error },

    #[error("{} exposes {available:#x} bytes, {requested:#x} requested", .path.display())]
    RegionTooSmall {
        path: PathBuf,
        requested: usize,
        available: usize,
    },

    #[error("{width}-byte access at {offset:#x} outside mapped window of {size:#x} bytes")]
    OutOfBounds {
        offset: usize,
        width: usize,
        size: usize,
    },

    #[error("unaligned {width}-byte access at {offset:#x}")]
    Unaligned { offset: usize, width: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("DMA did not complete after {polls} status polls")]
    Timeout { polls: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseIntError),
}

impl Error {
    /// True for failures while opening or mapping a device node.
    pub fn is_acquisition(&self) -> bool {
        matches!(
            self,
            Error::Open { .. } | Error::Mmap { .. } | Error::RegionTooSmall { .. }
        )
    }
}
