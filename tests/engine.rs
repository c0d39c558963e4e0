//! End-to-end engine scenarios over a scripted transceiver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hidrecon::radio::{RadioError, PING_PAYLOAD};
use hidrecon::testing::{RadioMode, ScriptedRadio};
use hidrecon::{DeviceDirectory, DeviceType, EngineState, ReconConfig, ReconEngine};

fn fast_config() -> ReconConfig {
    ReconConfig {
        hop_period_ms: 5,
        ping_period_ms: 0,
        sniff_period_ms: 100,
        ..Default::default()
    }
}

/// Route engine tracing through the test harness when RUST_LOG is set.
fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine_with(radio: &ScriptedRadio, config: ReconConfig) -> ReconEngine {
    init_logs();
    let radio = radio.clone();
    ReconEngine::new(
        config,
        Arc::new(DeviceDirectory::new()),
        Box::new(move || Ok(radio.as_transceiver())),
    )
}

/// Poll until `cond` holds or the deadline passes.
fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn test_start_is_idempotent_and_stop_releases() {
    let radio = ScriptedRadio::new();
    let engine = engine_with(&radio, fast_config());

    engine.start().unwrap();
    assert!(engine.is_running());
    assert!(radio.lna_enabled());

    // second start is a no-op success
    engine.start().unwrap();
    assert!(engine.is_running());

    engine.stop();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(radio.closed());

    // stopping twice is harmless
    engine.stop();
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn test_lna_failure_is_fatal_to_start() {
    let radio = ScriptedRadio::new();
    radio.fail_lna(true);
    let engine = engine_with(&radio, fast_config());

    assert!(engine.start().is_err());
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(radio.closed());
}

#[test]
fn test_lna_skipped_when_disabled() {
    let radio = ScriptedRadio::new();
    radio.fail_lna(true);
    let config = ReconConfig {
        use_lna: false,
        ..fast_config()
    };
    let engine = engine_with(&radio, config);

    engine.start().unwrap();
    assert!(!radio.lna_enabled());
    engine.stop();
}

#[test]
fn test_open_failure_is_fatal_to_start() {
    init_logs();
    let engine = ReconEngine::new(
        fast_config(),
        Arc::new(DeviceDirectory::new()),
        Box::new(|| Err(RadioError::Device("no dongle on the bus".into()))),
    );

    assert!(engine.start().is_err());
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn test_restart_reopens_the_transceiver() {
    init_logs();
    let opens = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&opens);
    let engine = ReconEngine::new(
        fast_config(),
        Arc::new(DeviceDirectory::new()),
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ScriptedRadio::new().as_transceiver())
        }),
    );

    engine.start().unwrap();
    engine.stop();
    engine.start().unwrap();
    engine.stop();

    assert_eq!(opens.load(Ordering::SeqCst), 2);
}

#[test]
fn test_discovery_hops_and_registers_devices() {
    let radio = ScriptedRadio::new();
    // address a1:b2:c3:d4:e5 with a 10-byte payload sample (Logitech-sized)
    let mut discovery = vec![0xa1, 0xb2, 0xc3, 0xd4, 0xe5];
    discovery.extend_from_slice(&[0u8; 10]);
    radio.push_rx(&discovery);

    let engine = engine_with(&radio, fast_config());
    engine.start().unwrap();

    assert!(wait_for(Duration::from_secs(2), || {
        engine.directory().get("a1:b2:c3:d4:e5").is_some()
    }));
    let dev = engine.directory().get("a1:b2:c3:d4:e5").unwrap();
    assert_eq!(dev.device_type(), DeviceType::Logitech);

    // the triage window pinged and injected on the forged link
    assert!(wait_for(Duration::from_secs(2), || {
        let sent = radio.transmissions();
        sent.iter().any(|(_, p)| p == &PING_PAYLOAD.to_vec())
            && sent.iter().any(|(_, p)| p.len() == 10)
    }));

    // and after it closed, discovery hopping resumed
    assert!(wait_for(Duration::from_secs(2), || {
        radio.mode() == RadioMode::Promiscuous && engine.sniff_target().is_none()
    }));

    engine.stop();
}

#[test]
fn test_operator_sniff_locks_and_clear_resumes() {
    let radio = ScriptedRadio::new();
    let engine = engine_with(&radio, fast_config());
    engine.start().unwrap();

    assert!(wait_for(Duration::from_secs(2), || {
        radio.mode() == RadioMode::Promiscuous
    }));

    engine.set_sniff_mode("A1:B2:C3:D4:E5").unwrap();
    assert!(wait_for(Duration::from_secs(2), || {
        radio.mode() == RadioMode::Sniffer([0xa1, 0xb2, 0xc3, 0xd4, 0xe5])
    }));
    assert!(wait_for(Duration::from_secs(2), || {
        radio
            .transmissions()
            .iter()
            .any(|(_, p)| p == &PING_PAYLOAD.to_vec())
    }));

    engine.set_sniff_mode("clear").unwrap();
    assert!(wait_for(Duration::from_secs(2), || {
        radio.mode() == RadioMode::Promiscuous
    }));

    engine.stop();
}

#[test]
fn test_sniffed_traffic_lands_in_the_directory() {
    let radio = ScriptedRadio::new();
    let engine = engine_with(&radio, fast_config());
    engine.directory().add_if_new([1, 2, 3, 4, 5], 1, &[]);

    engine.start().unwrap();
    engine.set_sniff_mode("01:02:03:04:05").unwrap();

    assert!(wait_for(Duration::from_secs(2), || {
        radio.mode() == RadioMode::Sniffer([1, 2, 3, 4, 5])
    }));
    radio.push_rx(&[0x00, 0xaa, 0xbb]);

    assert!(wait_for(Duration::from_secs(2), || {
        engine
            .directory()
            .get("01:02:03:04:05")
            .map(|d| d.payloads().contains(&vec![0xaa, 0xbb]))
            .unwrap_or(false)
    }));

    engine.stop();
}
