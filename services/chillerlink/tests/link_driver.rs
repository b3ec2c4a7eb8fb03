//! Driver-level tests against the in-memory device
//!
//! All tests run on a paused clock so timing assertions are exact.

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::sync::Arc;
use std::time::Duration;

use chillerlink::{spawn_link, ConnectionState, Intent, LinkConfig, LinkContext, MockDevice};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

const CONNECT_WAIT: Duration = Duration::from_secs(5);

fn start(device: &MockDevice, config: LinkConfig) -> (Arc<LinkContext>, JoinHandle<()>) {
    spawn_link(config, Arc::new(device.opener())).unwrap()
}

fn mock_config() -> LinkConfig {
    LinkConfig::for_port("mock0")
}

async fn wait_for_sequence(link: &LinkContext, sequence: u64) {
    let mut rx = link.store().subscribe();
    timeout(CONNECT_WAIT, rx.wait_for(|s| *s >= sequence))
        .await
        .unwrap()
        .unwrap();
}

async fn stop(link: Arc<LinkContext>, driver: JoinHandle<()>) {
    link.shutdown();
    timeout(link.config().read_timeout(), driver)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_open_retries_on_fixed_backoff() {
    let device = MockDevice::new();
    device.set_unavailable(true);
    let t0 = Instant::now();
    let (link, driver) = start(&device, mock_config());

    sleep(Duration::from_millis(3500)).await;

    let attempts = device.open_attempts();
    assert_eq!(attempts.len(), 4);
    assert_eq!(attempts[0], t0);
    for pair in attempts.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_secs(1));
    }
    assert_eq!(link.state(), ConnectionState::Disconnected);
    assert_eq!(link.stats().snapshot().open_failures, 4);

    // Device comes back: next attempt connects
    device.set_unavailable(false);
    assert!(link.wait_connected(CONNECT_WAIT).await);
    assert_eq!(device.open_attempts().len(), 5);

    stop(link, driver).await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_line_is_isolated() {
    let device = MockDevice::new();
    let (link, driver) = start(&device, mock_config());
    assert!(link.wait_connected(CONNECT_WAIT).await);

    device.push_line(r#"{"EVAP_LWT_F": 44.2}"#);
    wait_for_sequence(&link, 1).await;

    device.push_line(r#"{"EVAP_LWT_F": 4"#);
    device.push_line("not json at all");
    device.push_line(r#"{"EVAP_LWT_F": 45.0}"#);
    wait_for_sequence(&link, 2).await;

    assert_eq!(link.store().record().get_f64("EVAP_LWT_F"), Some(45.0));
    assert_eq!(link.stats().decode_errors(), 2);
    assert_eq!(link.state(), ConnectionState::Connected);

    stop(link, driver).await;
}

#[tokio::test(start_paused = true)]
async fn test_last_record_replaces_snapshot() {
    let device = MockDevice::new();
    let (link, driver) = start(&device, mock_config());
    assert!(link.wait_connected(CONNECT_WAIT).await);

    device.push_line(r#"{"EVAP_LWT_F": 44.2, "ALM_HiDischP": true}"#);
    device.push_line(r#"{"EVAP_LWT_F": 45.0}"#);
    wait_for_sequence(&link, 2).await;

    let snapshot = link.store().get();
    assert_eq!(snapshot.sequence, 2);
    assert_eq!(snapshot.record.get_f64("EVAP_LWT_F"), Some(45.0));
    assert!(!snapshot.record.contains("ALM_HiDischP"));

    stop(link, driver).await;
}

#[tokio::test(start_paused = true)]
async fn test_command_reaches_device_verbatim() {
    let device = MockDevice::new();
    let (link, driver) = start(&device, mock_config());
    assert!(link.wait_connected(CONNECT_WAIT).await);

    assert!(link.submit("PUMP EVAP ON").await);
    assert!(link.submit_intent(&Intent::Reset).await);
    assert_eq!(
        device.writes(),
        vec![b"PUMP EVAP ON\n".to_vec(), b"RESET\n".to_vec()]
    );

    stop(link, driver).await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_command_sends_nothing() {
    let device = MockDevice::new();
    let (link, driver) = start(&device, mock_config());
    assert!(link.wait_connected(CONNECT_WAIT).await);

    assert!(!link.submit("").await);
    assert!(!link.submit(" \t ").await);
    assert!(device.writes().is_empty());

    stop(link, driver).await;
}

#[tokio::test(start_paused = true)]
async fn test_command_while_disconnected_is_dropped() {
    let device = MockDevice::new();
    device.set_unavailable(true);
    let (link, driver) = start(&device, mock_config());
    sleep(Duration::from_millis(10)).await;

    assert!(!link.submit("MODE AUTO").await);
    assert!(device.writes().is_empty());
    assert_eq!(link.stats().snapshot().commands_dropped, 1);

    stop(link, driver).await;
}

#[tokio::test(start_paused = true)]
async fn test_reads_and_writes_never_overlap() {
    let device = MockDevice::new();
    device.set_read_delay(Duration::from_millis(20));
    device.set_write_delay(Duration::from_millis(5));
    let (link, driver) = start(&device, mock_config());
    assert!(link.wait_connected(CONNECT_WAIT).await);

    for i in 0..10 {
        device.push_line(&format!(r#"{{"EVAP_LWT_F": {}.5}}"#, 40 + i));
    }

    let commands: Vec<String> = (0..20).map(|i| format!("SP LWT {}.00", 40 + i)).collect();
    let tasks: Vec<_> = commands
        .iter()
        .cloned()
        .map(|cmd| {
            let link = Arc::clone(&link);
            tokio::spawn(async move { link.submit(&cmd).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap());
    }
    wait_for_sequence(&link, 10).await;

    assert_eq!(device.overlap_count(), 0);
    let writes = device.writes();
    assert_eq!(writes.len(), commands.len());
    for write in &writes {
        let text = std::str::from_utf8(write).unwrap();
        let line = text.strip_suffix('\n').unwrap();
        assert!(commands.iter().any(|c| c == line), "torn write: {:?}", text);
    }
    assert_eq!(link.store().record().get_f64("EVAP_LWT_F"), Some(49.5));

    stop(link, driver).await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_after_read_fault() {
    let device = MockDevice::new();
    let (link, driver) = start(&device, mock_config());
    assert!(link.wait_connected(CONNECT_WAIT).await);

    device.push_fault("cable pulled");
    sleep(Duration::from_millis(500)).await;
    assert_eq!(link.state(), ConnectionState::Disconnected);
    assert_eq!(device.open_handles(), 0);

    sleep(Duration::from_millis(600)).await;
    assert_eq!(link.state(), ConnectionState::Connected);
    assert_eq!(device.open_handles(), 1);

    let attempts = device.open_attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1] - attempts[0] >= Duration::from_secs(1));

    let stats = link.stats().snapshot();
    assert_eq!(stats.connections, 2);
    assert_eq!(stats.disconnections, 1);

    // Telemetry flows again on the new handle
    device.push_line(r#"{"P_SUCTION": 61.5}"#);
    wait_for_sequence(&link, 1).await;
    assert_eq!(link.store().record().get_f64("P_SUCTION"), Some(61.5));

    stop(link, driver).await;
}

#[tokio::test(start_paused = true)]
async fn test_partial_line_dropped_on_reconnect() {
    let device = MockDevice::new();
    let (link, driver) = start(&device, mock_config());
    assert!(link.wait_connected(CONNECT_WAIT).await);

    device.push_bytes(br#"{"EVAP_LWT_F": 4"#.to_vec());
    device.push_fault("cable pulled");
    sleep(Duration::from_millis(1100)).await;
    assert_eq!(link.state(), ConnectionState::Connected);

    device.push_bytes(b"4.2}\n".to_vec());
    device.push_line(r#"{"EVAP_LWT_F": 45.0}"#);
    wait_for_sequence(&link, 1).await;

    assert_eq!(link.store().sequence(), 1);
    assert_eq!(link.store().record().get_f64("EVAP_LWT_F"), Some(45.0));
    assert_eq!(link.stats().decode_errors(), 1);

    stop(link, driver).await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_connected_is_prompt() {
    let device = MockDevice::new();
    let (link, driver) = start(&device, mock_config());
    assert!(link.wait_connected(CONNECT_WAIT).await);

    let started = Instant::now();
    link.shutdown();
    timeout(link.config().read_timeout(), driver)
        .await
        .unwrap()
        .unwrap();
    assert!(started.elapsed() <= link.config().read_timeout());
    assert_eq!(link.state(), ConnectionState::Disconnected);
    assert_eq!(device.open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_backoff_is_prompt() {
    let device = MockDevice::new();
    device.set_unavailable(true);
    let (link, driver) = start(&device, mock_config());
    sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    stop(Arc::clone(&link), driver).await;
    assert!(started.elapsed() < link.config().reconnect_backoff());
    assert_eq!(device.open_attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_overlong_line_is_discarded_once() {
    let device = MockDevice::new();
    let config = LinkConfig {
        read_chunk_size: 64,
        max_line_bytes: 512,
        ..mock_config()
    };
    let (link, driver) = start(&device, config);
    assert!(link.wait_connected(CONNECT_WAIT).await);

    device.push_bytes(vec![b'x'; 2000]);
    device.push_bytes(b"still the same line\n".to_vec());
    device.push_line(r#"{"F_EVAP_GPM": 120.5}"#);
    wait_for_sequence(&link, 1).await;

    let stats = link.stats().snapshot();
    assert_eq!(stats.buffer_overflows, 1);
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(link.store().record().get_f64("F_EVAP_GPM"), Some(120.5));

    stop(link, driver).await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_with_wedged_write_is_prompt() {
    let device = MockDevice::new();
    let (link, driver) = start(&device, mock_config());
    assert!(link.wait_connected(CONNECT_WAIT).await);

    device.set_write_delay(Duration::from_secs(30));
    let writer = {
        let link = Arc::clone(&link);
        tokio::spawn(async move { link.submit("MODE SERVICE").await })
    };
    // Let the writer take the lock once the in-flight read times out
    sleep(Duration::from_millis(150)).await;

    let started = Instant::now();
    stop(Arc::clone(&link), driver).await;
    assert!(started.elapsed() <= link.config().read_timeout());
    assert!(!writer.await.unwrap());
    assert_eq!(device.open_handles(), 0);
    assert!(device.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_link_recovers_after_stalled_write() {
    let device = MockDevice::new();
    let (link, driver) = start(&device, mock_config());
    assert!(link.wait_connected(CONNECT_WAIT).await);

    device.set_write_stall_after(Some(8));
    assert!(!link.submit("MODE SERVICE").await);
    assert_eq!(link.stats().snapshot().commands_dropped, 1);

    device.set_write_stall_after(None);
    assert!(link.wait_connected(CONNECT_WAIT).await);
    assert!(link.submit("PUMP EVAP ON").await);

    let written = device.written();
    let lines: Vec<&[u8]> = written.split(|b| *b == b'\n').collect();
    assert_eq!(lines, vec![&b"MODE SER"[..], &b"PUMP EVAP ON"[..], &b""[..]]);
    assert_eq!(device.open_attempts().len(), 2);

    stop(link, driver).await;
}
