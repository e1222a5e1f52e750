use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::Ordering,
    time::{Duration, Instant},
};

use chrono::{DateTime, TimeZone, Utc};
use iqdwell_core::{file_name_at, read_capture_file, Clock, SampleRange, PACKET_HEADER_SIZE};
use iqdwell_recorder::{
    scripted::{DeviceCall, DeviceOp, Fill, RxStep, ScriptedDevice},
    CaptureLoop, DeviceError, RecorderConfig, RecorderError, SimulatedDevice, STATUS_RANGE,
    STATUS_TIMEOUT,
};
use tempfile::TempDir;

// ===========================================================================
// Helpers
// ===========================================================================

fn config(
    dir: &Path,
    collection_secs: f64,
) -> RecorderConfig {
    RecorderConfig {
        center_freq_hz: 915_000_000,
        bandwidth_hz: 1_500_000,
        sample_rate_hz: 2_000_000,
        gain_db: 30,
        dwell_secs: 0.1,
        collection_secs,
        output_dir: dir.to_path_buf(),
        ..RecorderConfig::default()
    }
}

fn iq_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "iq"))
        .collect();
    files.sort();
    files
}

/// Часы, всегда показывающие один и тот же момент.
struct FrozenClock(DateTime<Utc>);

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ===========================================================================
// Сценарии
// ===========================================================================

#[test]
fn test_single_clean_dwell() {
    let tmp = TempDir::new().unwrap();
    let (mut capture, metrics) = CaptureLoop::new(config(tmp.path(), 0.0));
    let mut dev = ScriptedDevice::new();

    let report = capture.run(&mut dev).unwrap();

    assert_eq!(report.dwells, 1);
    assert_eq!(report.overruns, 0);
    assert_eq!(report.final_gain_db, 30);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(dev.gain_sets(), vec![30], "только начальная установка");

    let files = iq_files(tmp.path());
    assert_eq!(files.len(), 1);
    assert_eq!(
        fs::metadata(&files[0]).unwrap().len(),
        (PACKET_HEADER_SIZE + 200_000 * 4) as u64
    );

    let file = read_capture_file(&files[0]).unwrap();
    assert_eq!(file.header.sample_count, 200_000);
    assert_eq!(file.header.center_frequency_hz, 915_000_000);
    assert_eq!(file.header.rx_gain_db, 30);
    assert_eq!(file.samples.len(), 400_000);

    assert_eq!(metrics.files_written.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.samples_recorded.load(Ordering::Relaxed), 200_000);
}

#[test]
fn test_overrun_truncates_dwell_and_skips_detection() {
    let tmp = TempDir::new().unwrap();
    let (mut capture, metrics) = CaptureLoop::new(config(tmp.path(), 0.0));
    // Клиппированное значение в валидной части: при overrun вердикт не
    // выносится
    let mut dev = ScriptedDevice::new().with_script([RxStep::Overrun {
        actual_count: 50_000,
        fill: Fill {
            value: 0,
            spikes: vec![(10, 2047)],
        },
    }]);

    let report = capture.run(&mut dev).unwrap();

    assert_eq!(report.overruns, 1);
    assert_eq!(report.final_gain_db, 30);
    assert_eq!(metrics.saturated_dwells.load(Ordering::Relaxed), 0);

    let file = read_capture_file(&iq_files(tmp.path())[0]).unwrap();
    assert_eq!(file.header.sample_count, 50_000);
    assert_eq!(file.samples.len(), 100_000);
    assert_eq!(file.samples[10], 2047);
}

#[test]
fn test_saturation_lowers_gain_before_next_dwell() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(tmp.path(), 0.01);
    cfg.dwell_secs = 0.001;

    let (mut capture, metrics) = CaptureLoop::new(cfg);
    let mut dev = ScriptedDevice::new()
        .with_script([RxStep::spike(7, 2047), RxStep::clean()])
        .with_receive_delay(Duration::from_millis(6));

    let report = capture.run(&mut dev).unwrap();

    assert!(report.dwells >= 2);
    assert_eq!(report.final_gain_db, 29);
    assert_eq!(dev.gain_sets(), vec![30, 29]);
    assert_eq!(metrics.saturated_dwells.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.gain_steps.load(Ordering::Relaxed), 1);

    // set_gain(29) стоит между первым и вторым приёмом
    let calls = dev.calls();
    let receives: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, DeviceCall::Receive { .. }))
        .map(|(i, _)| i)
        .collect();
    let lowered = calls
        .iter()
        .position(|c| *c == DeviceCall::SetGain(29))
        .unwrap();
    assert!(receives[0] < lowered && lowered < receives[1]);

    let files = iq_files(tmp.path());
    let gains: Vec<i32> = files
        .iter()
        .map(|p| read_capture_file(p).unwrap().header.rx_gain_db)
        .collect();
    assert_eq!(gains[0], 30);
    assert!(gains[1..].iter().all(|&g| g == 29));
}

#[test]
fn test_negative_extreme_counts_as_saturation() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(tmp.path(), 0.01);
    cfg.dwell_secs = 0.001;

    let (mut capture, _) = CaptureLoop::new(cfg);
    let mut dev = ScriptedDevice::new()
        .with_script([RxStep::spike(0, SampleRange::SC16_Q11.min)])
        .with_receive_delay(Duration::from_millis(6));

    let report = capture.run(&mut dev).unwrap();
    assert_eq!(report.final_gain_db, 29);
}

#[test]
fn test_collection_ends_within_one_dwell() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(tmp.path(), 0.2);
    cfg.dwell_secs = 0.05;
    cfg.sample_rate_hz = 1_000_000;

    let (mut capture, _) = CaptureLoop::new(cfg);
    let mut dev = ScriptedDevice::new().with_receive_delay(Duration::from_millis(50));

    let start = Instant::now();
    let report = capture.run(&mut dev).unwrap();
    let elapsed = start.elapsed();

    // Проверка времени после каждого dwell: не меньше collection, не больше
    // collection + dwell (с запасом на планировщик)
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(500), "elapsed {elapsed:?}");
    assert!((4..=6).contains(&report.dwells), "dwells {}", report.dwells);
}

#[test]
fn test_configuration_failure_closes_device() {
    let tmp = TempDir::new().unwrap();
    let (mut capture, _) = CaptureLoop::new(config(tmp.path(), 1.0));
    let mut dev = ScriptedDevice::new().fail_nth(
        DeviceOp::SetSampleRate,
        0,
        DeviceError::new(STATUS_RANGE, "Value out of range"),
    );

    let err = capture.run(&mut dev).unwrap_err();

    assert!(matches!(err, RecorderError::Device { op: "set sample rate", .. }));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(dev.receive_count(), 0);
    assert_eq!(dev.calls().last(), Some(&DeviceCall::Close));
    assert!(iq_files(tmp.path()).is_empty());
}

#[test]
fn test_gain_set_failure_mid_session_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(tmp.path(), 10.0);
    cfg.dwell_secs = 0.001;

    let (mut capture, _) = CaptureLoop::new(cfg);
    // Вызов 0 — начальная установка, вызов 1 — снижение после насыщения
    let mut dev = ScriptedDevice::new()
        .with_script([RxStep::spike(0, 2047)])
        .fail_nth(
            DeviceOp::SetGain,
            1,
            DeviceError::new(STATUS_RANGE, "Gain below minimum"),
        );

    let err = capture.run(&mut dev).unwrap_err();

    assert!(matches!(err, RecorderError::Device { op: "set gain", .. }));
    assert_eq!(dev.receive_count(), 1, "второй dwell не начинался");
    assert_eq!(dev.calls().last(), Some(&DeviceCall::Close));
    // Первый dwell уже записан
    assert_eq!(iq_files(tmp.path()).len(), 1);
}

#[test]
fn test_receive_error_writes_empty_file() {
    let tmp = TempDir::new().unwrap();
    let (mut capture, metrics) = CaptureLoop::new(config(tmp.path(), 0.0));
    let mut dev =
        ScriptedDevice::new().with_script([RxStep::error(STATUS_TIMEOUT, "Operation timed out")]);

    let report = capture.run(&mut dev).unwrap();

    assert_eq!(report.exit_code(), 0);
    assert_eq!(metrics.rx_errors.load(Ordering::Relaxed), 1);

    let files = iq_files(tmp.path());
    assert_eq!(files.len(), 1);
    assert_eq!(
        fs::metadata(&files[0]).unwrap().len(),
        PACKET_HEADER_SIZE as u64
    );
    assert_eq!(read_capture_file(&files[0]).unwrap().header.sample_count, 0);
}

#[test]
fn test_write_failure_does_not_stop_capture() {
    let tmp = TempDir::new().unwrap();
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    // Каталог на месте файла: каждая запись завершится ошибкой
    fs::create_dir(tmp.path().join(file_name_at(&at))).unwrap();

    let mut cfg = config(tmp.path(), 0.02);
    cfg.dwell_secs = 0.001;

    let (mut capture, metrics) = CaptureLoop::with_clock(cfg, FrozenClock(at));
    let mut dev = ScriptedDevice::new().with_receive_delay(Duration::from_millis(5));

    let report = capture.run(&mut dev).unwrap();

    assert!(report.dwells > 1);
    assert_eq!(
        metrics.write_errors.load(Ordering::Relaxed),
        report.dwells
    );
    assert_eq!(metrics.files_written.load(Ordering::Relaxed), 0);
    assert_eq!(report.exit_code(), 0);
    // Ни одного недописанного файла рядом с занятым именем
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
}

#[test]
fn test_disable_rx_failure_reports_status() {
    let tmp = TempDir::new().unwrap();
    let (mut capture, _) = CaptureLoop::new(config(tmp.path(), 0.0));
    let mut dev = ScriptedDevice::new().fail_nth(
        DeviceOp::EnableRx,
        1,
        DeviceError::new(STATUS_TIMEOUT, "Operation timed out"),
    );

    let report = capture.run(&mut dev).unwrap();

    assert_eq!(report.exit_code(), 6);
    assert_eq!(iq_files(tmp.path()).len(), 1);
    assert_eq!(dev.calls().last(), Some(&DeviceCall::Close));
}

#[test]
fn test_header_carries_actual_device_values() {
    let tmp = TempDir::new().unwrap();
    let (mut capture, _) = CaptureLoop::new(config(tmp.path(), 0.0));
    let mut dev = ScriptedDevice::new().with_actual_rates(Some(1_999_999), Some(1_536_000));

    let before = Utc::now().timestamp() as f64;
    let report = capture.run(&mut dev).unwrap();
    let after = Utc::now().timestamp() as f64 + 1.0;

    assert_eq!(report.dwell_sample_count, 199_999);

    let file = read_capture_file(&iq_files(tmp.path())[0]).unwrap();
    assert_eq!(file.header.sample_rate_hz, 1_999_999);
    assert_eq!(file.header.bandwidth_hz, 1_536_000);
    assert_eq!(file.header.fpga_version.as_str(), "0.15.3");
    assert_eq!(file.header.firmware_version.as_str(), "2.4.0");
    assert!(file.header.dwell_start_epoch_secs >= before);
    assert!(file.header.dwell_start_epoch_secs <= after);
}

#[test]
fn test_output_dir_is_created() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("a").join("b");
    let (mut capture, _) = CaptureLoop::new(config(&nested, 0.0));

    capture.run(&mut ScriptedDevice::new()).unwrap();

    assert_eq!(iq_files(&nested).len(), 1);
}

#[test]
fn test_simulated_device_settles_below_clipping() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(tmp.path(), 0.06);
    cfg.dwell_secs = 0.002;

    // Тон 100 отсчётов при 0 дБ: при 30 дБ клиппирует, при 26 дБ (≈1995) уже нет
    let (mut capture, metrics) = CaptureLoop::new(cfg);
    let mut dev = SimulatedDevice::new();

    let report = capture.run(&mut dev).unwrap();

    assert!(report.dwells > 5, "dwells {}", report.dwells);
    assert_eq!(report.final_gain_db, 26);
    assert_eq!(metrics.saturated_dwells.load(Ordering::Relaxed), 4);
    assert_eq!(metrics.gain_steps.load(Ordering::Relaxed), 4);
}
