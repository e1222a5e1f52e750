//! Пример: чтение файла dwell через CaptureFileReader
//!
//! ```text
//! cargo run -p iqdwell-core --example read_capture_file -- 2024_01_01_00_00_00_000.iq
//! ```

use std::fs::File;

use iqdwell_core::{CaptureFileReader, SaturationDetector};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input_path = std::env::args()
        .nth(1)
        .ok_or("usage: read_capture_file <file.iq>")?;

    let reader = match CaptureFileReader::new(File::open(&input_path)?) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("✗ Header decode failed: {e}");
            return Err(Box::new(e));
        }
    };

    let h = reader.header().clone();
    println!("✓ {input_path}");
    println!("  Link speed    : {}", h.link_speed);
    println!("  FPGA          : {}", h.fpga_version);
    println!("  Firmware      : {}", h.firmware_version);
    println!("  Byte order    : {:?}", h.endianness);
    println!("  Center freq   : {:.3} MHz", h.center_frequency_hz as f64 / 1e6);
    println!("  Bandwidth     : {:.3} MHz", h.bandwidth_hz as f64 / 1e6);
    println!("  Sample rate   : {:.3} Msps", h.sample_rate_hz as f64 / 1e6);
    println!("  Gain          : {} dB", h.rx_gain_db);
    println!("  Dwell start   : {:.6}", h.dwell_start_epoch_secs);
    println!("  Samples       : {}", h.sample_count);

    // Длина нагрузки сверяется с sample_count
    let samples = reader.read_samples()?;

    let detector = SaturationDetector::default();
    match detector.min_max(&samples) {
        Some((lo, hi)) => println!(
            "  Min / max     : {lo} / {hi} (saturated={})",
            detector.is_saturated(&samples)
        ),
        None => println!("  Min / max     : — (empty dwell)"),
    }

    Ok(())
}
