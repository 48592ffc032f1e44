use proptest::prelude::*;

use uio_cdma::cdma::BTT;
use uio_cdma::cdma::DA;
use uio_cdma::cdma::SA;
use uio_cdma::harness;
use uio_cdma::poll::Bounded;
use uio_cdma::poll::Spin;
use uio_cdma::sim::MapFailure;
use uio_cdma::sim::SimEvent;
use uio_cdma::sim::SimPlatform;
use uio_cdma::AxiCdma;
use uio_cdma::Config;
use uio_cdma::Error;
use uio_cdma::MappedRegion;
use uio_cdma::Platform;
use uio_cdma::Transfer;

fn run_sim(config: &Config, sim: &mut SimPlatform) -> (Result<harness::Outcome, Error>, String) {
    let mut out = Vec::new();
    let result = harness::run(config, sim, &mut Bounded::new(64), &mut out);
    (result, String::from_utf8(out).unwrap())
}

#[test]
fn faithful_hardware_passes() {
    let config = Config::default();
    let mut sim = SimPlatform::new(&config).unwrap().with_busy_polls(3);
    let (result, text) = run_sim(&config, &mut sim);

    assert_eq!(harness::exit_code(&result), 0);
    assert!(result.unwrap().passed());
    let sent = text.lines().filter(|l| l.starts_with("Sent ")).count();
    assert_eq!(sent, 512);
    for (i, line) in text.lines().take(512).enumerate() {
        assert_eq!(line, format!("Sent {}, received {}", i, i));
    }
    assert_eq!(text.lines().last(), Some("DMA transaction test, status = OK"));

    let words = sim.ddr_words();
    assert_eq!(words[..512], words[512..]);
}

#[test]
fn transfers_use_configured_addresses() {
    let config = Config::default();
    let mut sim = SimPlatform::new(&config).unwrap();
    let (result, _) = run_sim(&config, &mut sim);
    result.unwrap();

    assert_eq!(
        sim.transfers(),
        vec![
            Transfer::new(0x1000_0000, 0xc000_0000, 4096),
            Transfer::new(0xc000_0000, 0x1000_1000, 4096),
        ]
    );
    assert_eq!(
        sim.register_writes(),
        vec![
            (DA, 0xc000_0000),
            (SA, 0x1000_0000),
            (BTT, 4096),
            (DA, 0x1000_1000),
            (SA, 0xc000_0000),
            (BTT, 4096),
        ]
    );
}

#[test]
fn second_node_failure_releases_first() {
    let config = Config::default();
    let mut sim = SimPlatform::new(&config)
        .unwrap()
        .fail_map(&config.data_path, MapFailure::Open);
    let (result, text) = run_sim(&config, &mut sim);

    let err = result.as_ref().unwrap_err();
    assert!(err.is_acquisition());
    assert!(err.to_string().starts_with("Error opening /dev/uio2"));
    assert_eq!(harness::exit_code(&result), 1);
    assert!(text.is_empty());
    assert_eq!(
        sim.events(),
        vec![
            SimEvent::Mapped(config.control_path.clone()),
            SimEvent::Unmapped(config.control_path.clone()),
        ]
    );
    assert!(sim.register_writes().is_empty());
}

#[test]
fn second_node_mmap_failure_releases_first() {
    let config = Config::default();
    let mut sim = SimPlatform::new(&config)
        .unwrap()
        .fail_map(&config.data_path, MapFailure::Mmap);
    let (result, text) = run_sim(&config, &mut sim);

    let err = result.as_ref().unwrap_err();
    assert!(matches!(err, Error::Mmap { .. }));
    assert!(err.to_string().starts_with("Error mapping /dev/uio2"));
    assert_eq!(harness::exit_code(&result), 1);
    assert!(text.is_empty());
    assert_eq!(
        sim.events(),
        vec![
            SimEvent::Mapped(config.control_path.clone()),
            SimEvent::Unmapped(config.control_path.clone()),
        ]
    );
}

#[test]
fn aliasing_accel_window_is_refused() {
    let config = Config {
        accel_base: 0x1000_1000,
        ..Config::default()
    };
    assert!(matches!(SimPlatform::new(&config), Err(Error::Config(_))));
    let mut sim = SimPlatform::new(&Config::default()).unwrap();
    let (result, text) = run_sim(&config, &mut sim);
    assert!(matches!(result, Err(Error::Config(_))));
    assert_eq!(harness::exit_code(&result), 1);
    assert!(text.is_empty());
    assert!(sim.events().is_empty());
}

#[test]
fn first_node_failure_maps_nothing() {
    let config = Config::default();
    let mut sim = SimPlatform::new(&config)
        .unwrap()
        .fail_map(&config.control_path, MapFailure::Open);
    let (result, _) = run_sim(&config, &mut sim);
    assert_eq!(harness::exit_code(&result), 1);
    assert!(sim.events().is_empty());
}

#[test]
fn corrupted_word_is_reported_once() {
    let config = Config::default();
    let idx = fastrand::usize(0..config.words_per_half());
    let mirrored = config.ddr_base + (config.half_size() + idx * 8) as u32;
    let mut sim = SimPlatform::new(&config).unwrap().corrupt_word(mirrored);
    let (result, text) = run_sim(&config, &mut sim);

    assert_eq!(harness::exit_code(&result), 0);
    let outcome = result.unwrap();
    assert_eq!(outcome.mismatches, 1);
    assert!(!outcome.passed());

    let errors: Vec<&str> = text
        .lines()
        .filter(|l| l.starts_with("Value error"))
        .collect();
    assert_eq!(errors, vec![format!("Value error: sent {}, received {}", idx, !(idx as u64))]);
    assert_eq!(text.lines().filter(|l| l.starts_with("Sent ")).count(), 511);
    assert_eq!(text.lines().last(), Some("DMA transaction test, status = ERROR"));

    let events = sim.events();
    assert!(events.contains(&SimEvent::Unmapped(config.control_path.clone())));
    assert!(events.contains(&SimEvent::Unmapped(config.data_path.clone())));
}

#[test]
fn corruption_in_bram_propagates() {
    let config = Config::default();
    let mut sim = SimPlatform::new(&config).unwrap().corrupt_word(config.accel_base + 8);
    let (result, text) = run_sim(&config, &mut sim);
    assert_eq!(result.unwrap().mismatches, 1);
    assert!(text.contains(&format!("Value error: sent 1, received {}", !1u64)));
}

#[test]
fn repeated_transfer_repeats_register_writes() {
    let config = Config::default();
    let mut sim = SimPlatform::new(&config).unwrap();
    let ctrl = sim.map(&config.control_path, config.control_size).unwrap();
    let mut dma = AxiCdma::new(ctrl);
    let t = Transfer::new(config.ddr_base, config.accel_base, 0x100);
    dma.transfer(&t, &mut Spin::unbounded()).unwrap();
    dma.transfer(&t, &mut Spin::unbounded()).unwrap();

    let writes = sim.register_writes();
    assert_eq!(writes.len(), 6);
    assert_eq!(writes[..3], writes[3..]);
    assert_eq!(sim.status_reads(), 2);
}

#[test]
fn every_transfer_reads_status() {
    let config = Config::default();
    let mut sim = SimPlatform::new(&config).unwrap().with_busy_polls(5);
    run_sim(&config, &mut sim).0.unwrap();
    // 6 polls per transfer plus one decoded status read each
    assert_eq!(sim.status_reads(), 2 * 6 + 2);
}

proptest! {
    #[test]
    fn round_trip_preserves_data(
        seed in prop::collection::vec(any::<u64>(), 1..256),
        busy in 0u32..8,
    ) {
        let config = Config {
            data_size: seed.len() * 16,
            ..Config::default()
        };
        let mut sim = SimPlatform::new(&config).unwrap().with_busy_polls(busy);
        let mut mem = sim.map(&config.data_path, config.data_size).unwrap();
        let mut dma = AxiCdma::new(sim.map(&config.control_path, config.control_size).unwrap());

        for (i, w) in seed.iter().enumerate() {
            mem.write64(i * 8, *w).unwrap();
        }
        let half = config.half_size() as u32;
        dma.transfer(&Transfer::new(config.ddr_base, config.accel_base, half), &mut Bounded::new(16)).unwrap();
        dma.transfer(&Transfer::new(config.accel_base, config.ddr_base + half, half), &mut Bounded::new(16)).unwrap();

        for (i, w) in seed.iter().enumerate() {
            prop_assert_eq!(mem.read64((seed.len() + i) * 8).unwrap(), *w);
        }
    }
}
