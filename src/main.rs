use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use log::info;

use uio_cdma::config;
use uio_cdma::harness;
use uio_cdma::platform::Uio;
use uio_cdma::poll::Spin;
use uio_cdma::sim::SimPlatform;
use uio_cdma::Config;

/// DDR -> BRAM -> DDR round trip through an AXI CDMA
#[derive(Parser, Debug)]
#[command(name = "uio-cdma", version, long_about = None)]
struct Args {
    /// UIO node of the CDMA AXI-Lite control port
    #[arg(long, default_value = config::CONTROL_PATH)]
    control: PathBuf,

    /// UIO node of the reserved DDR window
    #[arg(long, default_value = config::DATA_PATH)]
    data: PathBuf,

    /// Size of the control port mapping
    #[arg(long, default_value_t = config::CONTROL_SIZE, value_parser = parse_int::<usize>)]
    control_size: usize,

    /// Size of the DDR window mapping
    #[arg(long, default_value_t = config::DATA_SIZE, value_parser = parse_int::<usize>)]
    data_size: usize,

    /// Physical address of the DDR window
    #[arg(long, default_value_t = config::DDR_BASE, value_parser = parse_int::<u32>)]
    ddr_base: u32,

    /// Bus address of the accelerator BRAM
    #[arg(long, default_value_t = config::ACCEL_BASE, value_parser = parse_int::<u32>)]
    accel_base: u32,

    /// Give up polling after this many milliseconds (default: wait forever)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Run against simulated hardware instead of the UIO nodes
    #[arg(long)]
    simulate: bool,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            control_path: self.control.clone(),
            data_path: self.data.clone(),
            control_size: self.control_size,
            data_size: self.data_size,
            ddr_base: self.ddr_base,
            accel_base: self.accel_base,
            poll_timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Accept decimal or `0x`-prefixed hex.
fn parse_int<T: TryFrom<u64>>(s: &str) -> Result<T> {
    let digits = s.replace('_', "");
    let v = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse::<u64>(),
    }
    .with_context(|| format!("invalid number {:?}", s))?;
    T::try_from(v).map_err(|_| anyhow!("{} out of range", s))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.config();
    info!("uio-cdma v{}", env!("CARGO_PKG_VERSION"));

    let mut wait = Spin::new(config.poll_timeout);
    let mut stdout = std::io::stdout().lock();
    let result = if args.simulate {
        info!("using simulated hardware");
        SimPlatform::new(&config)
            .and_then(|mut sim| harness::run(&config, &mut sim, &mut wait, &mut stdout))
    } else {
        harness::run(&config, &mut Uio, &mut wait, &mut stdout)
    };

    if let Err(e) = &result {
        eprintln!("{}", e);
    }
    ExitCode::from(harness::exit_code(&result))
}
