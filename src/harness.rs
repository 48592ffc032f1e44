//! DDR -> BRAM -> DDR round trip through the CDMA.
//!
//! The first half of the data window is seeded with `0, 1, 2, ...`, moved to
//! the accelerator BRAM and moved back into the second half. Each word pair is
//! then compared and reported on `out`.
//!
//! A data mismatch is only reported; [`run`] still returns `Ok` and
//! [`exit_code`] still yields 0 for it. Only failures to reach the hardware
//! turn into a nonzero exit code.

use std::io::Write;

use crate::cdma::AxiCdma;
use crate::cdma::Transfer;
use crate::config::Config;
use crate::mmio::MappedRegion;
use crate::platform::Platform;
use crate::poll::Wait;
use crate::Result;

const WORD: usize = std::mem::size_of::<u64>();

/// Result of a completed round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub compared: usize,
    pub mismatches: usize,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }
}

pub fn run<P, W, O>(config: &Config, platform: &mut P, wait: &mut W, out: &mut O) -> Result<Outcome>
where
    P: Platform,
    W: Wait,
    O: Write,
{
    config.validate()?;

    // Regions drop in reverse order on every return path.
    let mut dma = AxiCdma::new(platform.map(&config.control_path, config.control_size)?);
    log::info!("mapped CDMA control port {}", config.control_path.display());
    let mut mem = platform.map(&config.data_path, config.data_size)?;
    log::info!("mapped data window {}", config.data_path.display());

    let words = config.words_per_half();
    seed(&mut mem, words)?;
    log::info!("seeded {} words", words);

    let half = config.half_size() as u32;

    let to_bram = Transfer::new(config.ddr_base, config.accel_base, half);
    let polls = dma.transfer(&to_bram, wait)?;
    let status = dma.status()?;
    log::info!("DDR -> BRAM done after {} polls ({})", polls, status);

    let to_ddr = Transfer::new(config.accel_base, config.ddr_base + half, half);
    let polls = dma.transfer(&to_ddr, wait)?;
    let status = dma.status()?;
    log::info!("BRAM -> DDR done after {} polls ({})", polls, status);

    let outcome = verify(&mem, words, out)?;
    if outcome.passed() {
        log::info!("{} words verified", outcome.compared);
    } else {
        log::warn!(
            "{} of {} words differ",
            outcome.mismatches,
            outcome.compared
        );
    }
    Ok(outcome)
}

/// Process exit status for the result of [`run`].
pub fn exit_code(result: &Result<Outcome>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn seed<R: MappedRegion>(mem: &mut R, words: usize) -> Result<()> {
    for i in 0..words {
        mem.write64(i * WORD, i as u64)?;
    }
    Ok(())
}

fn verify<R: MappedRegion, O: Write>(mem: &R, words: usize, out: &mut O) -> Result<Outcome> {
    let mut mismatches = 0;
    for i in 0..words {
        let sent = mem.read64(i * WORD)?;
        let received = mem.read64((i + words) * WORD)?;
        if sent != received {
            mismatches += 1;
            writeln!(out, "Value error: sent {}, received {}", sent, received)?;
        } else {
            writeln!(out, "Sent {}, received {}", sent, received)?;
        }
    }
    let status = if mismatches == 0 { "OK" } else { "ERROR" };
    writeln!(out, "DMA transaction test, status = {}", status)?;
    Ok(Outcome {
        compared: words,
        mismatches,
    })
}
