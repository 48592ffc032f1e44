//! Simulated CDMA, DDR window and BRAM.
//!
//! [`SimPlatform`] hands out regions for the configured control and data
//! paths that share one simulated bus. Writing the byte-count register copies
//! memory on that bus the way the AXI CDMA does in simple mode. Everything the
//! engine sees is recorded so runs can be inspected afterwards.

use std::cell::RefCell;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::rc::Rc;

use crate::cdma::Status;
use crate::cdma::Transfer;
use crate::cdma::BTT;
use crate::cdma::CDMASR;
use crate::cdma::DA;
use crate::cdma::REGISTER_SPAN;
use crate::cdma::SA;
use crate::config::Config;
use crate::mmio::check_access;
use crate::mmio::MappedRegion;
use crate::platform::Platform;
use crate::Error;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Mapped(PathBuf),
    Unmapped(PathBuf),
}

#[derive(Debug)]
struct Memory {
    base: u32,
    bytes: Vec<u8>,
}

impl Memory {
    fn contains(&self, addr: u32, len: usize) -> Option<usize> {
        let start = addr.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        (end <= self.bytes.len()).then_some(start)
    }
}

#[derive(Debug)]
struct Bus {
    ddr: Memory,
    bram: Memory,
    regs: Vec<u32>,
    busy_polls: u32,
    busy_left: u32,
    status: Status,
    status_reads: u64,
    reg_writes: Vec<(usize, u32)>,
    transfers: Vec<Transfer>,
    events: Vec<SimEvent>,
    corrupt: Option<u32>,
}

impl Bus {
    fn memory(&mut self, addr: u32, len: usize) -> Option<(&mut Memory, usize)> {
        if let Some(off) = self.ddr.contains(addr, len) {
            return Some((&mut self.ddr, off));
        }
        if let Some(off) = self.bram.contains(addr, len) {
            return Some((&mut self.bram, off));
        }
        None
    }

    fn start(&mut self) {
        let t = Transfer::new(self.regs[SA / 4], self.regs[DA / 4], self.regs[BTT / 4]);
        self.transfers.push(t);
        self.busy_left = self.busy_polls;
        self.status = Status::empty();

        let len = t.bytes as usize;
        let data = self
            .memory(t.src, len)
            .map(|(mem, off)| mem.bytes[off..off + len].to_vec());
        let Some(data) = data else {
            log::warn!("sim: source {:#010x} (+{:#x}) not on the bus", t.src, len);
            self.status = Status::DMA_DEC_ERR | Status::ERR_IRQ;
            return;
        };
        let Some((mem, off)) = self.memory(t.dst, len) else {
            log::warn!("sim: destination {:#010x} (+{:#x}) not on the bus", t.dst, len);
            self.status = Status::DMA_DEC_ERR | Status::ERR_IRQ;
            return;
        };
        mem.bytes[off..off + len].copy_from_slice(&data);

        if let Some(addr) = self.corrupt {
            if addr >= t.dst && ((addr - t.dst) as usize) + 8 <= len {
                if let Some((mem, off)) = self.memory(addr, 8) {
                    for b in &mut mem.bytes[off..off + 8] {
                        *b = !*b;
                    }
                }
            }
        }
        self.status = Status::IDLE | Status::IOC_IRQ;
    }

    fn read_status(&mut self) -> u32 {
        self.status_reads += 1;
        if self.busy_left > 0 {
            self.busy_left -= 1;
            return (self.status - Status::IDLE).bits();
        }
        self.status.bits()
    }
}

/// Simulated hardware serving the paths of one [`Config`].
/// How a mapping set up with [`SimPlatform::fail_map`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFailure {
    /// The node cannot be opened.
    Open,
    /// The node opens but `mmap` is refused.
    Mmap,
}

#[derive(Debug)]
pub struct SimPlatform {
    bus: Rc<RefCell<Bus>>,
    control_path: PathBuf,
    data_path: PathBuf,
    control_size: usize,
    fail: Option<(PathBuf, MapFailure)>,
}

impl SimPlatform {
    /// Fails with [`Error::Config`] for a configuration the round trip rejects.
    pub fn new(config: &Config) -> Result<SimPlatform> {
        config.validate()?;
        let bus = Bus {
            ddr: Memory {
                base: config.ddr_base,
                bytes: vec![0; config.data_size],
            },
            bram: Memory {
                base: config.accel_base,
                bytes: vec![0; config.half_size()],
            },
            regs: vec![0; REGISTER_SPAN / 4],
            busy_polls: 0,
            busy_left: 0,
            status: Status::IDLE,
            status_reads: 0,
            reg_writes: Vec::new(),
            transfers: Vec::new(),
            events: Vec::new(),
            corrupt: None,
        };
        Ok(SimPlatform {
            bus: Rc::new(RefCell::new(bus)),
            control_path: config.control_path.clone(),
            data_path: config.data_path.clone(),
            control_size: config.control_size,
            fail: None,
        })
    }

    /// Report busy for `polls` status reads after each transfer starts.
    pub fn with_busy_polls(self, polls: u32) -> SimPlatform {
        self.bus.borrow_mut().busy_polls = polls;
        self
    }

    /// Make mapping `path` fail at the given step.
    pub fn fail_map(mut self, path: impl Into<PathBuf>, failure: MapFailure) -> SimPlatform {
        self.fail = Some((path.into(), failure));
        self
    }

    /// Invert the 64-bit word at bus address `addr` whenever a transfer writes it.
    pub fn corrupt_word(self, addr: u32) -> SimPlatform {
        self.bus.borrow_mut().corrupt = Some(addr);
        self
    }

    pub fn register_writes(&self) -> Vec<(usize, u32)> {
        self.bus.borrow().reg_writes.clone()
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.bus.borrow().transfers.clone()
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.bus.borrow().events.clone()
    }

    pub fn status_reads(&self) -> u64 {
        self.bus.borrow().status_reads
    }

    /// Contents of the DDR window as 64-bit words.
    pub fn ddr_words(&self) -> Vec<u64> {
        self.bus
            .borrow()
            .ddr
            .bytes
            .chunks_exact(8)
            .map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                u64::from_le_bytes(b)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Control,
    Data,
}

/// A window onto the simulated bus.
#[derive(Debug)]
pub struct SimRegion {
    bus: Rc<RefCell<Bus>>,
    path: PathBuf,
    role: Role,
    size: usize,
}

impl Platform for SimPlatform {
    type Region = SimRegion;

    fn map(&mut self, path: &Path, size: usize) -> Result<SimRegion> {
        match &self.fail {
            Some((p, MapFailure::Open)) if p == path => {
                return Err(Error::Open {
                    path: path.to_path_buf(),
                    source: io::Error::from_raw_os_error(libc::ENOENT),
                });
            }
            Some((p, MapFailure::Mmap)) if p == path => {
                return Err(Error::Mmap {
                    path: path.to_path_buf(),
                    source: io::Error::from_raw_os_error(libc::EINVAL),
                });
            }
            _ => {}
        }
        let (role, available) = if path == self.control_path {
            (Role::Control, self.control_size)
        } else if path == self.data_path {
            (Role::Data, self.bus.borrow().ddr.bytes.len())
        } else {
            return Err(Error::Open {
                path: path.to_path_buf(),
                source: io::Error::from_raw_os_error(libc::ENOENT),
            });
        };
        if size > available {
            return Err(Error::RegionTooSmall {
                path: path.to_path_buf(),
                requested: size,
                available,
            });
        }
        self.bus
            .borrow_mut()
            .events
            .push(SimEvent::Mapped(path.to_path_buf()));
        Ok(SimRegion {
            bus: Rc::clone(&self.bus),
            path: path.to_path_buf(),
            role,
            size,
        })
    }
}

impl MappedRegion for SimRegion {
    fn size(&self) -> usize {
        self.size
    }

    fn read32(&self, offset: usize) -> Result<u32> {
        check_access(offset, 4, self.size)?;
        let mut bus = self.bus.borrow_mut();
        match self.role {
            Role::Control if offset == CDMASR => Ok(bus.read_status()),
            Role::Control => Ok(bus.regs.get(offset / 4).copied().unwrap_or(0)),
            Role::Data => {
                let b = &bus.ddr.bytes[offset..offset + 4];
                Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            }
        }
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        check_access(offset, 4, self.size)?;
        let mut bus = self.bus.borrow_mut();
        match self.role {
            Role::Control => {
                bus.reg_writes.push((offset, value));
                // status is read-only, nothing beyond BTT is modelled
                if offset != CDMASR {
                    if let Some(reg) = bus.regs.get_mut(offset / 4) {
                        *reg = value;
                    }
                }
                if offset == BTT {
                    bus.start();
                }
            }
            Role::Data => {
                bus.ddr.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            }
        }
        Ok(())
    }

    fn read64(&self, offset: usize) -> Result<u64> {
        check_access(offset, 8, self.size)?;
        match self.role {
            Role::Control => {
                let lo = self.read32(offset)? as u64;
                let hi = self.read32(offset + 4)? as u64;
                Ok(hi << 32 | lo)
            }
            Role::Data => {
                let bus = self.bus.borrow();
                let mut b = [0u8; 8];
                b.copy_from_slice(&bus.ddr.bytes[offset..offset + 8]);
                Ok(u64::from_le_bytes(b))
            }
        }
    }

    fn write64(&mut self, offset: usize, value: u64) -> Result<()> {
        check_access(offset, 8, self.size)?;
        match self.role {
            Role::Control => {
                self.write32(offset, value as u32)?;
                self.write32(offset + 4, (value >> 32) as u32)
            }
            Role::Data => {
                let mut bus = self.bus.borrow_mut();
                bus.ddr.bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
                Ok(())
            }
        }
    }
}

impl Drop for SimRegion {
    fn drop(&mut self) {
        self.bus
            .borrow_mut()
            .events
            .push(SimEvent::Unmapped(self.path.clone()));
    }
}
