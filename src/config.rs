use std::path::PathBuf;
use std::time::Duration;

use crate::cdma::REGISTER_SPAN;
use crate::Error;
use crate::Result;

/// UIO node exposing the CDMA AXI-Lite control port.
pub const CONTROL_PATH: &str = "/dev/uio0";
/// UIO node exposing the reserved DDR window.
pub const DATA_PATH: &str = "/dev/uio2";
/// Size of the AXI-Lite control port, as set in the device tree.
pub const CONTROL_SIZE: usize = 0x1000;
/// Size of the reserved DDR window the round trip runs through.
pub const DATA_SIZE: usize = 0x2000;
/// Physical address of the reserved DDR window.
pub const DDR_BASE: u32 = 0x1000_0000;
/// Bus address of the accelerator-side BRAM.
pub const ACCEL_BASE: u32 = 0xc000_0000;

/// One past the last byte addressable by the CDMA's 32-bit address registers.
const BUS_END: u64 = 1 << 32;

/// Where the hardware lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub control_path: PathBuf,
    pub data_path: PathBuf,
    pub control_size: usize,
    pub data_size: usize,
    pub ddr_base: u32,
    pub accel_base: u32,
    /// `None` spins until the engine reports idle.
    pub poll_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            control_path: PathBuf::from(CONTROL_PATH),
            data_path: PathBuf::from(DATA_PATH),
            control_size: CONTROL_SIZE,
            data_size: DATA_SIZE,
            ddr_base: DDR_BASE,
            accel_base: ACCEL_BASE,
            poll_timeout: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.control_size < REGISTER_SPAN {
            return Err(Error::Config(format!(
                "control window of {:#x} bytes does not cover the CDMA registers ({:#x})",
                self.control_size, REGISTER_SPAN
            )));
        }
        if self.data_size == 0 || self.data_size % 16 != 0 {
            return Err(Error::Config(format!(
                "data window of {:#x} bytes cannot be split into two halves of 64-bit words",
                self.data_size
            )));
        }
        let half = u32::try_from(self.half_size())
            .map_err(|_| Error::Config(format!("data window {:#x} too large", self.data_size)))?;
        let ddr = (self.ddr_base as u64, self.ddr_base as u64 + self.data_size as u64);
        if ddr.1 > BUS_END {
            return Err(Error::Config(format!(
                "data window at {:#x} overflows the 32-bit bus",
                self.ddr_base
            )));
        }
        let accel = (self.accel_base as u64, self.accel_base as u64 + half as u64);
        if accel.1 > BUS_END {
            return Err(Error::Config(format!(
                "accelerator window at {:#x} overflows the 32-bit bus",
                self.accel_base
            )));
        }
        // the copy must leave the data window, or the comparison reads itself
        if accel.0 < ddr.1 && ddr.0 < accel.1 {
            return Err(Error::Config(format!(
                "accelerator window {:#x}..{:#x} overlaps data window {:#x}..{:#x}",
                accel.0, accel.1, ddr.0, ddr.1
            )));
        }
        Ok(())
    }

    /// Bytes moved by each transfer.
    pub fn half_size(&self) -> usize {
        self.data_size / 2
    }

    /// 64-bit words in each half of the data window.
    pub fn words_per_half(&self) -> usize {
        self.half_size() / std::mem::size_of::<u64>()
    }
}
