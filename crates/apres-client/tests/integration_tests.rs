//! Client integration tests against the device simulator
//!
//! Run with: cargo test -p apres-client --test integration_tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use apres_client::testing::TestServer;
use apres_client::{ApresError, AttenuatorSetting, BurstKind, ConfigUpdate};
use apres_sim::{create_router, SimConfig, SimState};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

const API_KEY: &str = "18052021";

async fn simulator(configure: impl FnOnce(&mut SimConfig)) -> (TestServer, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SimConfig::with_local_folder(dir.path());
    config.seconds_per_chirp = 0.01;
    configure(&mut config);

    let router = create_router(SimState::new(config).unwrap());
    let server = TestServer::start(router).await.unwrap();
    (server, dir)
}

async fn keyed_simulator(configure: impl FnOnce(&mut SimConfig)) -> (TestServer, TempDir) {
    let (server, dir) = simulator(configure).await;
    server.client.set_api_key(API_KEY).unwrap();
    (server, dir)
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_config_get_is_idempotent() {
    let (server, _dir) = simulator(|_| {}).await;
    let config = server.client.radar_config();

    let first = config.get().await.unwrap();
    let second = config.get().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(config.cached(), Some(second));
    assert!(first.is_consistent());
}

#[tokio::test]
async fn test_read_after_write_preserves_untouched_indices() {
    let (server, _dir) = keyed_simulator(|_| {}).await;
    let config = server.client.radar_config();

    let updated = config
        .set(
            ConfigUpdate::new()
                .attenuators(3)
                .rf_attenuation(AttenuatorSetting::sparse([("rfAttn2", 10.0)])),
        )
        .await
        .unwrap();
    assert_eq!(updated.attenuators, 3);
    assert_eq!(updated.rf_attenuation, vec![0.0, 10.0, 31.0]);
    assert_eq!(updated.af_gain, vec![-4, -14, -14]);

    let updated = config
        .set(ConfigUpdate::new().af_gain(AttenuatorSetting::Sequence(vec![
            Some(6),
            None,
            Some(-4),
        ])))
        .await
        .unwrap();
    assert_eq!(updated.af_gain, vec![6, -14, -4]);
    assert_eq!(updated.rf_attenuation, vec![0.0, 10.0, 31.0]);
    assert_eq!(config.get().await.unwrap(), updated);
}

#[tokio::test]
async fn test_counts_antennas_and_user_data() {
    let (server, _dir) = keyed_simulator(|_| {}).await;
    let tx = vec![0, 1, 1, 0, 0, 0, 0, 0];

    let updated = server
        .client
        .radar_config()
        .set(
            ConfigUpdate::new()
                .sub_bursts(10)
                .averages(4)
                .tx_antenna(tx.clone())
                .user_data("Rutford Ice Stream"),
        )
        .await
        .unwrap();
    assert_eq!(updated.sub_bursts, 10);
    assert_eq!(updated.averages, 4);
    assert_eq!(updated.tx_antenna, tx);
    assert_eq!(updated.user_data, "Rutford Ice Stream");
}

#[tokio::test]
async fn test_partial_key_validation() {
    let (server, _dir) = keyed_simulator(|_| {}).await;
    let config = server.client.radar_config();
    config.set(ConfigUpdate::new().attenuators(3)).await.unwrap();

    let err = config
        .set(ConfigUpdate::new().rf_attenuation(AttenuatorSetting::sparse([("rfAttn4", 5.0)])))
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::InvalidKey(k) if k == "rfAttn4"));

    let err = config
        .set(ConfigUpdate::new().rf_attenuation(vec![1.0, 2.0]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::InvalidArgument(_)));

    let err = config
        .set(ConfigUpdate::new().af_gain(6))
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::InvalidArgument(_)));

    let err = config
        .set(ConfigUpdate::new().attenuators(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::InvalidArgument(_)));

    let err = config
        .set(ConfigUpdate::new().rx_antenna(vec![0; 8]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::InvalidArgument(_)));

    // Rejected updates never reach the device
    let current = config.get().await.unwrap();
    assert_eq!(current.rf_attenuation, vec![0.0, 31.0, 31.0]);
    assert_eq!(current.attenuators, 3);
}

#[tokio::test]
async fn test_set_without_key_is_rejected() {
    let (server, _dir) = simulator(|_| {}).await;
    let err = server
        .client
        .radar_config()
        .set(ConfigUpdate::new().attenuators(3))
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::InvalidCredentials(_)));
}

#[tokio::test]
async fn test_clamped_attenuation_is_reported() {
    let (server, _dir) = keyed_simulator(|_| {}).await;
    let err = server
        .client
        .radar_config()
        .set(ConfigUpdate::new().rf_attenuation(40.0))
        .await
        .unwrap_err();
    match err {
        ApresError::UpdateNotApplied {
            field,
            requested,
            actual,
        } => {
            assert_eq!(field, "rfAttn1");
            assert_eq!(requested, "40");
            assert_eq!(actual, "31");
        }
        other => panic!("expected UpdateNotApplied, got {:?}", other),
    }
}

#[tokio::test]
async fn test_device_rejection_is_malformed_response() {
    let (server, _dir) = keyed_simulator(|_| {}).await;
    // The client does not check gain steps; the device answers 400
    let err = server
        .client
        .radar_config()
        .set(ConfigUpdate::new().af_gain(3))
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::MalformedResponse(m) if m.contains("afGain1")));
}

// =============================================================================
// Bursts
// =============================================================================

#[tokio::test]
async fn test_trial_burst_scenario() {
    let (server, _dir) = keyed_simulator(|_| {}).await;
    server
        .client
        .radar_config()
        .set(ConfigUpdate::new().attenuators(3))
        .await
        .unwrap();

    let mut progress = Vec::new();
    let result = server
        .client
        .radar()
        .trial_burst(Some(|payload: &Value| progress.push(payload.clone())))
        .await
        .unwrap();

    assert_eq!(result.kind(), BurstKind::Trial);
    assert_eq!(result.attenuators, 3);
    let trial = result.trial().unwrap();
    assert_eq!(trial.histogram.len(), 3);
    assert_eq!(trial.chirp.len(), 3);

    assert!(!progress.is_empty());
    assert_eq!(progress[0]["type"], "trial");
}

#[tokio::test]
async fn test_start_burst_requires_key() {
    let (server, _dir) = simulator(|_| {}).await;
    let err = server
        .client
        .radar()
        .start_burst(BurstKind::Trial)
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::InvalidCredentials(_)));
}

#[tokio::test]
async fn test_busy_rejection() {
    let (server, _dir) = keyed_simulator(|c| c.seconds_per_chirp = 30.0).await;
    let radar = server.client.radar();

    radar.start_burst(BurstKind::Full).await.unwrap();
    let err = radar.start_burst(BurstKind::Trial).await.unwrap_err();
    assert!(matches!(err, ApresError::DeviceBusy(m) if m == "Radar is already bursting"));
    assert_eq!(radar.last_kind(), Some(BurstKind::Full));
}

#[tokio::test]
async fn test_empty_pool_is_device_error() {
    let (server, _dir) = keyed_simulator(|c| c.seed_sample_data = false).await;
    let err = server
        .client
        .radar()
        .start_burst(BurstKind::Trial)
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::DeviceInternalError(_)));
}

#[tokio::test]
async fn test_results_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SimConfig::with_local_folder(dir.path());
    config.seconds_per_chirp = 30.0;
    let router = create_router(SimState::new(config).unwrap());
    let server = TestServer::start_with(router, |settings| {
        settings
            .api_key(API_KEY)
            .request_timeout(Duration::from_millis(500))
            .per_chirp_budget(Duration::from_millis(50))
    })
    .await
    .unwrap();

    let radar = server.client.radar();
    radar.start_burst(BurstKind::Trial).await.unwrap();
    assert_eq!(radar.results_budget(), Duration::from_millis(550));

    let started = Instant::now();
    let err = radar.await_results_simple().await.unwrap_err();
    assert!(matches!(err, ApresError::ResultsTimeout(_)));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_trial_deadline_is_sized_by_sub_bursts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SimConfig::with_local_folder(dir.path());
    config.seconds_per_chirp = 30.0;
    config.radar.averages = 10;
    config.radar.sub_bursts = 1;
    let router = create_router(SimState::new(config).unwrap());
    let server = TestServer::start_with(router, |settings| {
        settings
            .api_key(API_KEY)
            .request_timeout(Duration::from_millis(500))
            .per_chirp_budget(Duration::from_millis(50))
    })
    .await
    .unwrap();

    let radar = server.client.radar();
    radar.start_burst(BurstKind::Trial).await.unwrap();
    assert_eq!(radar.results_budget(), Duration::from_millis(550));

    let started = Instant::now();
    let err = radar.await_results_simple().await.unwrap_err();
    assert!(matches!(err, ApresError::ResultsTimeout(_)));
    assert!(started.elapsed() < Duration::from_millis(900));
}

#[tokio::test]
async fn test_idle_results_means_no_chirp() {
    let (server, _dir) = simulator(|_| {}).await;
    let err = server.client.radar().await_results_simple().await.unwrap_err();
    assert!(matches!(err, ApresError::NoChirpStarted));
}

#[tokio::test]
async fn test_named_full_burst_is_downloadable() {
    let (server, dir) = keyed_simulator(|_| {}).await;

    let result = server
        .client
        .radar()
        .full_burst(Some("site-a.dat"), None::<fn(&Value)>)
        .await
        .unwrap();
    let full = result.full().unwrap();
    assert_eq!(full.filename, "Survey/site-a.dat");

    let listing = server.client.data().dir(Some("Survey"), None).await.unwrap();
    assert_eq!(listing.path, "Survey");
    assert!(listing.files.iter().any(|f| f.name == "site-a.dat"));

    let target = tempfile::tempdir().unwrap();
    let local = target.path().join("site-a.dat");
    let written = server
        .client
        .data()
        .download(&full.filename, Some(&local))
        .await
        .unwrap();

    let original = std::fs::read(dir.path().join("data_files/sample-apres-data.dat")).unwrap();
    assert_eq!(written, original.len());
    assert_eq!(std::fs::read(&local).unwrap(), original);
}

#[tokio::test]
async fn test_background_polling_completes() {
    let (server, _dir) = keyed_simulator(|_| {}).await;
    let radar = server.client.radar();
    radar.start_burst(BurstKind::Trial).await.unwrap();

    let completed = Arc::new(AtomicUsize::new(0));
    let counter = completed.clone();
    let handle = radar.spawn_await_results(
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        None::<fn(&Value)>,
    );

    let result = handle.join().await.unwrap();
    assert_eq!(result.kind(), BurstKind::Trial);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_background_polling_reports_errors_through_handle() {
    let (server, _dir) = simulator(|_| {}).await;
    let completed = Arc::new(AtomicUsize::new(0));
    let counter = completed.clone();

    let handle = server.client.radar().spawn_await_results(
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        None::<fn(&Value)>,
    );

    assert!(matches!(handle.join().await, Err(ApresError::NoChirpStarted)));
    assert_eq!(completed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_background_polling_can_be_cancelled() {
    let (server, _dir) = keyed_simulator(|c| c.seconds_per_chirp = 30.0).await;
    let radar = server.client.radar();
    radar.start_burst(BurstKind::Full).await.unwrap();

    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    let handle = radar.spawn_await_results(
        |_| {},
        Some(move |_: &Value| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();
    assert!(matches!(handle.join().await, Err(ApresError::Cancelled)));

    let seen = polls.load(Ordering::SeqCst);
    assert!(seen > 0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(polls.load(Ordering::SeqCst), seen);
}

// =============================================================================
// System and Housekeeping
// =============================================================================

#[tokio::test]
async fn test_reset() {
    let (server, _dir) = simulator(|_| {}).await;
    let system = server.client.system();

    assert!(matches!(
        system.reset().await,
        Err(ApresError::InvalidCredentials(_))
    ));

    server.client.set_api_key(API_KEY).unwrap();
    let message = system.reset().await.unwrap();
    assert!(!message.message.is_empty());
}

#[tokio::test]
async fn test_housekeeping_status() {
    let (server, _dir) = simulator(|c| {
        c.housekeeping.gps_valid = true;
        c.housekeeping.latitude = -78.1;
    })
    .await;
    let status = server.client.system().housekeeping_status().await.unwrap();
    assert_eq!(status.battery_voltage, 13.0);
    assert_eq!(status.latitude, -78.1);
    assert!(status.time_gps.is_some());
}

#[tokio::test]
async fn test_housekeeping_config_upload_and_download() {
    let (server, _dir) = simulator(|_| {}).await;
    let system = server.client.system();
    let content = b"[main]\nSite = Rutford\nnSubBursts = 10\n".to_vec();

    let err = system
        .upload_housekeeping_config_bytes(content.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::InvalidCredentials(_)));

    server.client.set_api_key(API_KEY).unwrap();
    let work = tempfile::tempdir().unwrap();
    let upload = work.path().join("upload.ini");
    std::fs::write(&upload, &content).unwrap();
    system.upload_housekeeping_config(&upload).await.unwrap();

    let download = work.path().join("config.ini");
    let path = system
        .download_housekeeping_config(Some(&download), false)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), content);

    let err = system
        .download_housekeeping_config(Some(&download), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::FileExists(p) if p == download));
    system
        .download_housekeeping_config(Some(&download), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_housekeeping_config_is_not_found() {
    let (server, dir) = simulator(|_| {}).await;
    std::fs::remove_file(dir.path().join("config.ini")).unwrap();

    let err = server
        .client
        .system()
        .housekeeping_config_text()
        .await
        .unwrap_err();
    assert!(matches!(err, ApresError::NotFound(_)));
}
