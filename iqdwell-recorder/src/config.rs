use std::{path::PathBuf, time::Duration};

use iqdwell_core::SampleRange;

use crate::{device::StreamConfig, RecorderError, RecorderResult};

/// Тип SDR устройства (выбор при старте).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    /// Встроенный симулятор (не требует железа).
    Simulated,
    /// bladeRF (через libbladeRF).
    BladeRf,
}

/// Полная конфигурация сессии записи.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Тип SDR устройства
    pub device: DeviceKind,
    /// Запрошенная несущая частота (Гц)
    pub center_freq_hz: u64,
    /// Запрошенная полоса (Гц)
    pub bandwidth_hz: u32,
    /// Запрошенная частота дискретизации (Гц)
    pub sample_rate_hz: u32,
    /// Начальное усиление приёмника (дБ)
    pub gain_db: i32,
    /// Длительность одного dwell (секунды)
    pub dwell_secs: f64,
    /// Общая длительность сбора (секунды)
    pub collection_secs: f64,
    /// Каталог для файлов dwell
    pub output_dir: PathBuf,
    /// Параметры синхронного потока устройства
    pub stream: StreamConfig,
    /// Таймаут одного блокирующего приёма
    pub rx_timeout: Duration,
    /// Представимый диапазон выборок (для детектора насыщения)
    pub sample_range: SampleRange,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl RecorderConfig {
    /// Проверяет параметры до открытия устройства.
    pub fn validate(&self) -> RecorderResult<()> {
        if !(self.dwell_secs.is_finite() && self.dwell_secs > 0.0) {
            return Err(RecorderError::Config(format!(
                "dwell duration must be > 0 s, got {}",
                self.dwell_secs
            )));
        }

        if !(self.collection_secs.is_finite() && self.collection_secs >= 0.0) {
            return Err(RecorderError::Config(format!(
                "collection duration must be >= 0 s, got {}",
                self.collection_secs
            )));
        }

        if self.stream.buffer_size == 0 || self.stream.buffer_size % 1024 != 0 {
            return Err(RecorderError::Config(format!(
                "stream buffer size must be a non-zero multiple of 1024, got {}",
                self.stream.buffer_size
            )));
        }

        if self.sample_range.min >= self.sample_range.max {
            return Err(RecorderError::Config(format!(
                "empty sample range {:?}",
                self.sample_range
            )));
        }

        Ok(())
    }

    /// `floor(dwell_secs × actual_sample_rate)` — выборок на dwell.
    pub fn dwell_sample_count(
        &self,
        actual_sample_rate_hz: u32,
    ) -> RecorderResult<u32> {
        let exact = self.dwell_secs * actual_sample_rate_hz as f64;
        // 2.3 × 3e6 даёт 6899999.999…: погрешность f64 не должна съедать выборку
        let n = if (exact - exact.round()).abs() < 1e-6 {
            exact.round()
        } else {
            exact.floor()
        };

        if n < 1.0 {
            return Err(RecorderError::Config(format!(
                "dwell of {} s at {actual_sample_rate_hz} sps yields no samples",
                self.dwell_secs
            )));
        }

        // Буфер I/Q в два раза длиннее и тоже должен адресоваться u32
        if n * 2.0 > u32::MAX as f64 {
            return Err(RecorderError::Config(format!(
                "dwell of {} s at {actual_sample_rate_hz} sps is too long",
                self.dwell_secs
            )));
        }

        Ok(n as u32)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для DeviceKind, RecorderConfig
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for DeviceKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            DeviceKind::Simulated => write!(f, "sim"),
            DeviceKind::BladeRf => write!(f, "bladerf"),
        }
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sim" | "simulated" => Ok(DeviceKind::Simulated),
            "bladerf" | "bladerf2" | "blade" => Ok(DeviceKind::BladeRf),
            _ => Err(format!("Unknown device type: '{s}'. Use: sim, bladerf")),
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            device: DeviceKind::Simulated,
            center_freq_hz: 915_000_000,
            bandwidth_hz: 1_500_000,
            sample_rate_hz: 2_000_000,
            gain_db: 30,
            dwell_secs: 0.1,
            collection_secs: 1.0,
            output_dir: PathBuf::from("."),
            stream: StreamConfig::default(),
            rx_timeout: Duration::from_millis(5_000),
            sample_range: SampleRange::SC16_Q11,
        }
    }
}

/// Парсит частоту в герцы.
///
/// Число без суффикса трактуется как мегагерцы (так частоты и скорости
/// задаются в командной строке). Поддерживает суффиксы `GHz`, `MHz`, `kHz`,
/// `Hz` (регистронезависимо).
///
/// # Примеры
/// ```
/// use iqdwell_recorder::config::parse_freq_hz;
/// assert_eq!(parse_freq_hz("915").unwrap(), 915_000_000);
/// assert_eq!(parse_freq_hz("1.602GHz").unwrap(), 1_602_000_000);
/// assert_eq!(parse_freq_hz("2000000Hz").unwrap(), 2_000_000);
/// ```
pub fn parse_freq_hz(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let lower = s.to_lowercase();

    let (num_str, mult) = if let Some(v) = lower.strip_suffix("ghz") {
        (v.trim(), 1_000_000_000_f64)
    } else if let Some(v) = lower.strip_suffix("mhz") {
        (v.trim(), 1_000_000_f64)
    } else if let Some(v) = lower.strip_suffix("khz") {
        (v.trim(), 1_000_f64)
    } else if let Some(v) = lower.strip_suffix("hz") {
        (v.trim(), 1_f64)
    } else {
        (lower.as_str(), 1_000_000_f64)
    };

    let n: f64 = num_str
        .parse()
        .map_err(|e| format!("Invalid frequency value '{num_str}': {e}"))?;

    if !n.is_finite() || n < 0.0 {
        return Err(format!("Invalid frequency '{s}'"));
    }

    Ok((n * mult).round() as u64)
}

/// Как [`parse_freq_hz`], но с проверкой, что значение влезает в `u32`.
pub fn parse_freq_hz_u32(s: &str) -> Result<u32, String> {
    let hz = parse_freq_hz(s)?;
    u32::try_from(hz).map_err(|_| format!("{hz} Hz exceeds u32::MAX"))
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_freq_hz() {
        assert_eq!(parse_freq_hz("915").unwrap(), 915_000_000);
        assert_eq!(parse_freq_hz("2.5").unwrap(), 2_500_000);
        assert_eq!(parse_freq_hz("1602MHz").unwrap(), 1_602_000_000);
        assert_eq!(parse_freq_hz("1.602GHz").unwrap(), 1_602_000_000);
        assert_eq!(parse_freq_hz("2000kHz").unwrap(), 2_000_000);
        assert_eq!(parse_freq_hz("2000000Hz").unwrap(), 2_000_000);
        assert!(parse_freq_hz("abc").is_err());
        assert!(parse_freq_hz("-5").is_err());
    }

    #[test]
    fn test_parse_freq_hz_u32_overflow() {
        assert_eq!(parse_freq_hz_u32("61.44").unwrap(), 61_440_000);
        assert!(parse_freq_hz_u32("5GHz").is_err());
    }

    #[test]
    fn test_device_kind_fromstr() {
        assert_eq!("sim".parse::<DeviceKind>().unwrap(), DeviceKind::Simulated);
        assert_eq!("bladeRF".parse::<DeviceKind>().unwrap(), DeviceKind::BladeRf);
        assert!("unknown".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_dwell_sample_count_floors() {
        let cfg = RecorderConfig {
            dwell_secs: 0.1,
            ..RecorderConfig::default()
        };
        assert_eq!(cfg.dwell_sample_count(2_000_000).unwrap(), 200_000);
        assert_eq!(cfg.dwell_sample_count(1_000_001).unwrap(), 100_000);
    }

    #[test]
    fn test_dwell_sample_count_exact_decimal_product() {
        let cfg = RecorderConfig {
            dwell_secs: 2.3,
            ..RecorderConfig::default()
        };
        assert_eq!(cfg.dwell_sample_count(3_000_000).unwrap(), 6_900_000);

        let cfg = RecorderConfig {
            dwell_secs: 0.7,
            ..RecorderConfig::default()
        };
        assert_eq!(cfg.dwell_sample_count(61_440_000).unwrap(), 43_008_000);
        assert_eq!(cfg.dwell_sample_count(1_999_999).unwrap(), 1_399_999);
    }

    #[test]
    fn test_dwell_sample_count_rejects_empty_and_huge() {
        let tiny = RecorderConfig {
            dwell_secs: 1e-9,
            ..RecorderConfig::default()
        };
        assert!(tiny.dwell_sample_count(2_000_000).is_err());

        let huge = RecorderConfig {
            dwell_secs: 1_000.0,
            ..RecorderConfig::default()
        };
        assert!(huge.dwell_sample_count(61_440_000).is_err());
    }

    #[test]
    fn test_validate() {
        RecorderConfig::default().validate().unwrap();

        let bad_dwell = RecorderConfig {
            dwell_secs: 0.0,
            ..RecorderConfig::default()
        };
        assert!(bad_dwell.validate().is_err());

        let bad_collection = RecorderConfig {
            collection_secs: f64::NAN,
            ..RecorderConfig::default()
        };
        assert!(bad_collection.validate().is_err());

        let mut bad_stream = RecorderConfig::default();
        bad_stream.stream.buffer_size = 1_000;
        assert!(bad_stream.validate().is_err());
    }
}
