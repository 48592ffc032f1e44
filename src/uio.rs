use std::fmt;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::prelude::*;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::path::PathBuf;
use std::ptr;

use crate::mmio::check_access;
use crate::mmio::MappedRegion;
use crate::Error;
use crate::Result;

/// A UIO device node mapped into the process.
///
/// The mapping is released on drop, after which the owned descriptor closes.
pub struct UioMap {
    path: PathBuf,
    dev_fd: File,
    base: *mut u8,
    size: usize,
}

impl fmt::Debug for UioMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "UioMap ({})", self.path.display())?;
        writeln!(f, "  file: {:?}", &self.dev_fd)?;
        writeln!(f, "  base: {:?}", &self.base)?;
        write!(f, "  size: {:#x?}", &self.size)
    }
}

impl UioMap {
    pub fn open(path: impl AsRef<Path>, size: usize) -> Result<UioMap> {
        let path = path.as_ref().to_path_buf();

        let dev_fd = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| Error::Open {
                path: path.clone(),
                source,
            })?;

        if let Some(available) = sysfs_map_size(&path)? {
            if available < size {
                return Err(Error::RegionTooSmall {
                    path,
                    requested: size,
                    available,
                });
            }
        }

        let base;
        unsafe {
            base = libc::mmap(
                std::ptr::null_mut::<libc::c_void>(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                dev_fd.as_raw_fd(),
                0,
            );
            if base == libc::MAP_FAILED {
                return Err(Error::Mmap {
                    path,
                    source: io::Error::last_os_error(),
                });
            }
        }
        log::debug!("mapped {} ({:#x} bytes) at {:?}", path.display(), size, base);

        Ok(UioMap {
            path,
            dev_fd,
            base: base as *mut u8,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Size of map0 as published by the UIO framework, if the node is a UIO device.
fn sysfs_map_size(path: &Path) -> Result<Option<usize>> {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) if n.starts_with("uio") => n,
        _ => return Ok(None),
    };
    let mut size_f = match File::open(format!("/sys/class/uio/{}/maps/map0/size", name)) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut buf = String::new();
    size_f.read_to_string(&mut buf)?;
    let buf = buf.trim().trim_start_matches("0x");
    Ok(Some(usize::from_str_radix(buf, 16)?))
}

impl MappedRegion for UioMap {
    fn size(&self) -> usize {
        self.size
    }

    fn read32(&self, offset: usize) -> Result<u32> {
        check_access(offset, 4, self.size)?;
        unsafe { Ok(ptr::read_volatile(self.base.add(offset) as *const u32)) }
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        check_access(offset, 4, self.size)?;
        unsafe { ptr::write_volatile(self.base.add(offset) as *mut u32, value) };
        Ok(())
    }

    fn read64(&self, offset: usize) -> Result<u64> {
        check_access(offset, 8, self.size)?;
        unsafe { Ok(ptr::read_volatile(self.base.add(offset) as *const u64)) }
    }

    fn write64(&mut self, offset: usize, value: u64) -> Result<()> {
        check_access(offset, 8, self.size)?;
        unsafe { ptr::write_volatile(self.base.add(offset) as *mut u64, value) };
        Ok(())
    }
}

impl Drop for UioMap {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.size);
        }
        log::debug!("unmapped {}", self.path.display());
    }
}

unsafe impl Send for UioMap {}
