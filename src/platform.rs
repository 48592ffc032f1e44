use std::path::Path;

use crate::mmio::MappedRegion;
use crate::uio::UioMap;
use crate::Result;

/// Source of mapped windows.
///
/// Dropping a returned region releases it.
pub trait Platform {
    type Region: MappedRegion;

    fn map(&mut self, path: &Path, size: usize) -> Result<Self::Region>;
}

/// Real device nodes through the UIO framework.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uio;

impl Platform for Uio {
    type Region = UioMap;

    fn map(&mut self, path: &Path, size: usize) -> Result<UioMap> {
        UioMap::open(path, size)
    }
}
