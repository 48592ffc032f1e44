//! Simple-mode driver for the Xilinx AXI Central DMA.
//!
//! A transfer is programmed through three registers and completes when the
//! engine reports idle. Writing the byte count is what starts the engine in
//! simple mode; there is no separate start bit on the variants this was
//! written against, so the register order below is part of the protocol.

use std::fmt;

use bitflags::bitflags;

use crate::dmb;
use crate::mmio::read_words;
use crate::mmio::write_words;
use crate::mmio::MappedRegion;
use crate::poll::Wait;
use crate::Result;

/// Status register (read-only).
pub const CDMASR: usize = 0x04;
/// Source address.
pub const SA: usize = 0x18;
/// Destination address.
pub const DA: usize = 0x20;
/// Bytes to transfer. Writing it starts the transfer.
pub const BTT: usize = 0x28;

/// Smallest control window that covers every register above.
pub const REGISTER_SPAN: usize = BTT + 4;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        const IDLE = 1 << 1;
        const SG_INCLUDED = 1 << 3;
        const DMA_INT_ERR = 1 << 4;
        const DMA_SLV_ERR = 1 << 5;
        const DMA_DEC_ERR = 1 << 6;
        const SG_INT_ERR = 1 << 8;
        const SG_SLV_ERR = 1 << 9;
        const SG_DEC_ERR = 1 << 10;
        const IOC_IRQ = 1 << 12;
        const DLY_IRQ = 1 << 13;
        const ERR_IRQ = 1 << 14;
    }
}

impl Status {
    pub fn is_idle(self) -> bool {
        self.contains(Status::IDLE)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Status::IDLE) {
            write!(f, "idle")?;
        } else {
            write!(f, "busy")?;
        }
        if self.contains(Status::SG_INCLUDED) {
            write!(f, ", scatter gather")?;
        } else {
            write!(f, ", register mode")?;
        }
        let named = [
            (Status::DMA_INT_ERR, "internal error"),
            (Status::DMA_SLV_ERR, "slave error"),
            (Status::DMA_DEC_ERR, "decode error"),
            (Status::SG_INT_ERR, "sg internal error"),
            (Status::SG_SLV_ERR, "sg slave error"),
            (Status::SG_DEC_ERR, "sg dec error"),
            (Status::IOC_IRQ, "ioc_irq"),
            (Status::DLY_IRQ, "dly_irq"),
            (Status::ERR_IRQ, "err_irq"),
        ];
        for (flag, name) in named {
            if self.contains(flag) {
                write!(f, ", {}", name)?;
            }
        }
        Ok(())
    }
}

/// One memory-to-memory move, in bus addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub src: u32,
    pub dst: u32,
    pub bytes: u32,
}

impl Transfer {
    pub fn new(src: u32, dst: u32, bytes: u32) -> Transfer {
        Transfer { src, dst, bytes }
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x} -> {:#010x} ({} bytes)", self.src, self.dst, self.bytes)
    }
}

#[derive(Debug)]
pub struct AxiCdma<R> {
    regs: R,
}

impl<R: MappedRegion> AxiCdma<R> {
    pub fn new(regs: R) -> AxiCdma<R> {
        AxiCdma { regs }
    }

    /// Run one transfer to completion.
    ///
    /// Programs DA, SA and BTT in that order, then polls the idle bit through
    /// `wait`. Only bit 1 of the status register is consulted; error bits are
    /// not interpreted. With an unbounded [`Spin`](crate::poll::Spin) this
    /// never returns if the engine never goes idle.
    pub fn transfer<W: Wait>(&mut self, transfer: &Transfer, wait: &mut W) -> Result<u64> {
        log::debug!("cdma transfer {}", transfer);

        write_words(&mut self.regs, DA, &[transfer.dst])?;
        write_words(&mut self.regs, SA, &[transfer.src])?;
        // source data must be visible before the engine starts
        dmb();
        write_words(&mut self.regs, BTT, &[transfer.bytes])?;

        let regs = &self.regs;
        let polls = wait.wait_until(|| {
            let mut sr = [0u32; 1];
            read_words(regs, CDMASR, &mut sr)?;
            Ok(sr[0] & Status::IDLE.bits() != 0)
        })?;
        dmb();

        log::debug!("cdma idle after {} status polls", polls);
        Ok(polls)
    }

    pub fn status(&self) -> Result<Status> {
        Ok(Status::from_bits_retain(self.regs.read32(CDMASR)?))
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn into_inner(self) -> R {
        self.regs
    }
}
