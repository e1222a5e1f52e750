//! Библиотека формата файлов iqdwell
//!
//! Каждый dwell захвата сохраняется отдельным файлом: фиксированный
//! заголовок с происхождением записи и сырые IQ выборки SC16.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use iqdwell_core::{CaptureFileWriter, FilenameClock, SaturationDetector};
//! use iqdwell_types::PacketHeader;
//!
//! let samples = vec![0i16; 2 * 1000];
//! let detector = SaturationDetector::default();
//! assert!(!detector.is_saturated(&samples));
//!
//! let header = PacketHeader {
//!     sample_rate_hz: 2_000_000,
//!     sample_count: 1000,
//!     ..PacketHeader::default()
//! };
//! let mut writer = CaptureFileWriter::new(".");
//! writer.write_dwell(&FilenameClock::system().next_file_name(), &header, &samples)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binary;
pub mod clock;
pub mod format;
pub mod saturation;
pub mod serialization;

pub use clock::*;
pub use format::*;
pub use saturation::*;
pub use serialization::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
