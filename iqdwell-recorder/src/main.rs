use std::{path::PathBuf, process, sync::atomic::Ordering, time::Instant};

use clap::Parser;
use iqdwell_recorder::{
    open_device, parse_freq_hz, parse_freq_hz_u32, CaptureLoop, DeviceKind, RecorderConfig,
};
use log::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "iqdwell-recorder",
    version = env!("CARGO_PKG_VERSION"),
    about = "Record SDR IQ samples dwell by dwell, lowering gain on saturation",
    long_about = None,
)]
struct Cli {
    /// Несущая частота, МГц (915, 1.602GHz)
    freq: String,
    /// Полоса, МГц
    bandwidth: String,
    /// Частота дискретизации, Msps
    rate: String,
    /// Начальное усиление, дБ
    #[arg(allow_negative_numbers = true)]
    gain: i32,
    /// Длительность dwell, секунды
    dwell: f64,
    /// Длительность сбора, секунды
    collection: f64,
    /// SDR устройство: sim, bladerf
    #[arg(short, long, default_value = "sim")]
    device: String,
    /// Каталог для файлов .iq
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let device_kind: DeviceKind = match cli.device.parse() {
        Ok(d) => d,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let center_freq_hz = match parse_freq_hz(&cli.freq) {
        Ok(f) => f,
        Err(e) => {
            error!("<freq>: {e}");
            process::exit(1);
        }
    };

    let bandwidth_hz = match parse_freq_hz_u32(&cli.bandwidth) {
        Ok(b) => b,
        Err(e) => {
            error!("<bandwidth>: {e}");
            process::exit(1);
        }
    };

    let sample_rate_hz = match parse_freq_hz_u32(&cli.rate) {
        Ok(r) => r,
        Err(e) => {
            error!("<rate>: {e}");
            process::exit(1);
        }
    };

    let config = RecorderConfig {
        device: device_kind,
        center_freq_hz,
        bandwidth_hz,
        sample_rate_hz,
        gain_db: cli.gain,
        dwell_secs: cli.dwell,
        collection_secs: cli.collection,
        output_dir: cli.output_dir.clone(),
        ..RecorderConfig::default()
    };

    if let Err(e) = config.validate() {
        error!("{e}");
        process::exit(1);
    }

    let mut device = match open_device(&config) {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to open device: {e}");
            process::exit(e.exit_code());
        }
    };

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Device        : {}", cli.device);
    info!("  Center freq   : {:.3} MHz", center_freq_hz as f64 / 1e6);
    info!("  Bandwidth     : {:.3} MHz", bandwidth_hz as f64 / 1e6);
    info!("  Sample rate   : {:.3} Msps", sample_rate_hz as f64 / 1e6);
    info!("  Gain          : {} dB", cli.gain);
    info!("  Dwell         : {} s", cli.dwell);
    info!("  Collection    : {} s", cli.collection);
    info!("  Output        : {:?}", cli.output_dir);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let session_start = Instant::now();
    let (mut capture, metrics) = CaptureLoop::new(config);

    let report = match capture.run(device.as_mut()) {
        Ok(r) => r,
        Err(e) => {
            error!("Capture failed: {e}");
            process::exit(e.exit_code());
        }
    };

    let summary = metrics.summary(&session_start);
    info!("\n{summary}");

    if report.final_gain_db != cli.gain {
        info!(
            "Gain lowered from {} dB to {} dB",
            cli.gain, report.final_gain_db
        );
    }

    if metrics.write_errors.load(Ordering::Relaxed) > 0 {
        warn!(
            "⚠ {} dwell files could not be written. Check disk space and I/O.",
            metrics.write_errors.load(Ordering::Relaxed)
        );
    }

    if let Some(e) = &report.drain_error {
        error!("Device shutdown failed: {e}");
        process::exit(report.exit_code());
    }

    info!("✓ Capture complete: {} dwells", report.dwells);
}
