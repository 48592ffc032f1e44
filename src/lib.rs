//! Userspace round-trip exerciser for a Xilinx AXI CDMA exposed through UIO.
//!
//! The CDMA control port and a reserved DDR window are mapped from two UIO
//! nodes. [`harness::run`] seeds the window, moves it to the accelerator BRAM
//! and back with [`AxiCdma`], and compares the result.

pub mod cdma;
pub mod config;
mod dmb;
mod error;
pub mod harness;
pub mod mmio;
pub mod platform;
pub mod poll;
pub mod sim;
mod uio;

pub use cdma::AxiCdma;
pub use cdma::Status;
pub use cdma::Transfer;
pub use config::Config;
pub use dmb::dmb;
pub use error::Error;
pub use error::Result;
pub use mmio::MappedRegion;
pub use platform::Platform;
pub use uio::UioMap;
