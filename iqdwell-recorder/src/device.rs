// Граница с SDR: цикл захвата видит устройство только через `RxDevice`.
// SimulatedDevice генерирует комплексный тон, амплитуда которого растёт с
// усилением, так что на большом усилении сигнал упирается в границы SC16 Q11
// и срабатывает обратная связь по усилению.
// Темп выдачи выборок привязан к реальному времени, как у настоящего приёмника.

use std::{
    f32::consts::PI,
    thread,
    time::{Duration, Instant},
};

use iqdwell_core::SampleRange;
use iqdwell_types::LinkSpeed;
use log::debug;
use thiserror::Error;

use crate::{DeviceKind, RecorderConfig, RecorderError, RecorderResult};

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Коды статуса в стиле libbladeRF.
pub const STATUS_RANGE: i32 = -2;
pub const STATUS_INVAL: i32 = -3;
pub const STATUS_TIMEOUT: i32 = -6;
pub const STATUS_NODEV: i32 = -7;

/// Ошибка устройства: код статуса и описание от драйвера.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (status {status})")]
pub struct DeviceError {
    pub status: i32,
    pub message: String,
}

impl DeviceError {
    pub fn new<S: Into<String>>(
        status: i32,
        message: S,
    ) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Положительный код завершения процесса (1..=255).
    pub fn exit_code(&self) -> i32 {
        self.status.unsigned_abs().clamp(1, 255) as i32
    }
}

/// Режим усиления приёмника.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainMode {
    /// Ручное усиление (AGC выключен)
    Manual,
    /// Встроенный AGC устройства
    Automatic,
}

/// Параметры синхронного потока приёма.
///
/// `buffer_size` — выборок в одном внутреннем буфере драйвера, должен быть
/// кратен 1024. Выборки становятся доступны только целыми буферами.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub num_buffers: u32,
    pub buffer_size: u32,
    pub num_transfers: u32,
    pub timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            num_buffers: 4,
            buffer_size: 1024 * 1024,
            num_transfers: 2,
            timeout: Duration::from_millis(3_500),
        }
    }
}

/// Метаданные одного блокирующего приёма.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxMetadata {
    /// Сколько комплексных выборок реально доставлено
    pub actual_count: u32,
    /// Устройство не успело отдать данные: буфер заполнен частично
    pub overrun: bool,
}

/// Информация об устройстве (для логирования и заголовка файла).
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub board_name: String,
    pub serial: String,
    pub link_speed: LinkSpeed,
    pub fpga_version: String,
    pub firmware_version: String,
}

/// Абстракция SDR приёмника (один RX канал).
pub trait RxDevice {
    /// Информация об устройстве
    fn info(&self) -> DeviceInfo;

    /// Возвращает фактически установленную частоту.
    fn set_frequency(
        &mut self,
        hz: u64,
    ) -> DeviceResult<u64>;

    /// Возвращает фактическую частоту дискретизации.
    fn set_sample_rate(
        &mut self,
        sps: u32,
    ) -> DeviceResult<u32>;

    /// Возвращает фактическую полосу.
    fn set_bandwidth(
        &mut self,
        hz: u32,
    ) -> DeviceResult<u32>;

    fn set_gain_mode(
        &mut self,
        mode: GainMode,
    ) -> DeviceResult<()>;

    fn set_gain(
        &mut self,
        gain_db: i32,
    ) -> DeviceResult<()>;

    fn configure_stream(
        &mut self,
        config: &StreamConfig,
    ) -> DeviceResult<()>;

    fn enable_rx(
        &mut self,
        enable: bool,
    ) -> DeviceResult<()>;

    /// Блокирующий приём `count` комплексных выборок в `buf` (I, Q
    /// чередуются, `buf.len() >= 2 * count`).
    fn receive(
        &mut self,
        buf: &mut [i16],
        count: u32,
        timeout: Duration,
    ) -> DeviceResult<RxMetadata>;

    fn close(&mut self);
}

/// Генерирует синтетический IQ сигнал (комплексная синусоида).
pub struct SimulatedDevice {
    pub center_freq_hz: u64,
    pub sample_rate_hz: u32,
    pub bandwidth_hz: u32,
    pub gain_db: i32,
    pub gain_mode: GainMode,
    /// Амплитуда тона при усилении 0 дБ (в отсчётах АЦП)
    pub amplitude_at_0db: f32,
    pub tone_freq_hz: f32,
    /// Выдавать выборки в темпе реального времени
    pub realtime: bool,
    stream: Option<StreamConfig>,
    rx_enabled: bool,
    open: bool,
    sample_index: u64,
    stream_start: Option<Instant>,
}

impl SimulatedDevice {
    pub const FREQUENCY_RANGE_HZ: (u64, u64) = (70_000_000, 6_000_000_000);
    pub const SAMPLE_RATE_RANGE: (u32, u32) = (520_834, 61_440_000);
    pub const BANDWIDTH_RANGE_HZ: (u32, u32) = (200_000, 56_000_000);
    pub const GAIN_RANGE_DB: (i32, i32) = (-15, 60);

    pub fn new() -> Self {
        Self {
            center_freq_hz: 0,
            sample_rate_hz: 0,
            bandwidth_hz: 0,
            gain_db: 0,
            gain_mode: GainMode::Automatic,
            amplitude_at_0db: 100.0,
            tone_freq_hz: 10_000.0,
            realtime: true,
            stream: None,
            rx_enabled: false,
            open: true,
            sample_index: 0,
            stream_start: None,
        }
    }

    /// Амплитуда тона при текущем усилении.
    pub fn amplitude(&self) -> f32 {
        self.amplitude_at_0db * 10f32.powf(self.gain_db as f32 / 20.0)
    }

    fn ensure_open(&self) -> DeviceResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DeviceError::new(STATUS_NODEV, "Device closed"))
        }
    }

    fn pace(
        &mut self,
        delivered: u64,
    ) {
        let start = *self.stream_start.get_or_insert_with(Instant::now);
        let expected =
            Duration::from_secs_f64(delivered as f64 / self.sample_rate_hz.max(1) as f64);
        let elapsed = start.elapsed();

        if expected > elapsed {
            thread::sleep(expected - elapsed);
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RxDevice for SimulatedDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            board_name: "bladerf2 (simulated)".to_string(),
            serial: "SIM-0001".to_string(),
            link_speed: LinkSpeed::Super,
            fpga_version: "0.15.3".to_string(),
            firmware_version: "2.4.0".to_string(),
        }
    }

    fn set_frequency(
        &mut self,
        hz: u64,
    ) -> DeviceResult<u64> {
        self.ensure_open()?;
        let (lo, hi) = Self::FREQUENCY_RANGE_HZ;

        if !(lo..=hi).contains(&hz) {
            return Err(DeviceError::new(STATUS_RANGE, "Value out of range"));
        }

        self.center_freq_hz = hz;
        Ok(hz)
    }

    fn set_sample_rate(
        &mut self,
        sps: u32,
    ) -> DeviceResult<u32> {
        self.ensure_open()?;
        let (lo, hi) = Self::SAMPLE_RATE_RANGE;

        if !(lo..=hi).contains(&sps) {
            return Err(DeviceError::new(STATUS_RANGE, "Value out of range"));
        }

        self.sample_rate_hz = sps;
        Ok(sps)
    }

    fn set_bandwidth(
        &mut self,
        hz: u32,
    ) -> DeviceResult<u32> {
        self.ensure_open()?;
        let (lo, hi) = Self::BANDWIDTH_RANGE_HZ;

        // Полоса приводится к ближайшей поддерживаемой, как у RF фильтра
        self.bandwidth_hz = hz.clamp(lo, hi);
        Ok(self.bandwidth_hz)
    }

    fn set_gain_mode(
        &mut self,
        mode: GainMode,
    ) -> DeviceResult<()> {
        self.ensure_open()?;
        self.gain_mode = mode;
        Ok(())
    }

    fn set_gain(
        &mut self,
        gain_db: i32,
    ) -> DeviceResult<()> {
        self.ensure_open()?;
        let (lo, hi) = Self::GAIN_RANGE_DB;

        if !(lo..=hi).contains(&gain_db) {
            return Err(DeviceError::new(STATUS_RANGE, "Value out of range"));
        }

        self.gain_db = gain_db;
        Ok(())
    }

    fn configure_stream(
        &mut self,
        config: &StreamConfig,
    ) -> DeviceResult<()> {
        self.ensure_open()?;

        if config.buffer_size == 0 || config.buffer_size % 1024 != 0 {
            return Err(DeviceError::new(STATUS_INVAL, "Invalid argument"));
        }

        self.stream = Some(config.clone());
        Ok(())
    }

    fn enable_rx(
        &mut self,
        enable: bool,
    ) -> DeviceResult<()> {
        self.ensure_open()?;
        self.rx_enabled = enable;

        if !enable {
            self.stream_start = None;
            self.sample_index = 0;
        }

        Ok(())
    }

    fn receive(
        &mut self,
        buf: &mut [i16],
        count: u32,
        _timeout: Duration,
    ) -> DeviceResult<RxMetadata> {
        self.ensure_open()?;

        if self.stream.is_none() || !self.rx_enabled {
            return Err(DeviceError::new(STATUS_INVAL, "RX stream not enabled"));
        }

        let values = count as usize * 2;
        if buf.len() < values {
            return Err(DeviceError::new(STATUS_INVAL, "Buffer too small"));
        }

        let amplitude = self.amplitude();
        let range = SampleRange::SC16_Q11;
        let rate = self.sample_rate_hz.max(1) as f32;

        for (n, pair) in buf[..values].chunks_exact_mut(2).enumerate() {
            let t = (self.sample_index + n as u64) as f32 / rate;
            let phase = 2.0 * PI * self.tone_freq_hz * t;

            pair[0] = (amplitude * phase.cos())
                .round()
                .clamp(range.min as f32, range.max as f32) as i16;
            pair[1] = (amplitude * phase.sin())
                .round()
                .clamp(range.min as f32, range.max as f32) as i16;
        }

        self.sample_index += count as u64;

        if self.realtime {
            let delivered = self.sample_index;
            self.pace(delivered);
        }

        debug!("Simulated RX: {count} samples, amplitude {amplitude:.0}");

        Ok(RxMetadata {
            actual_count: count,
            overrun: false,
        })
    }

    fn close(&mut self) {
        self.rx_enabled = false;
        self.open = false;
    }
}

/// Открывает устройство по конфигурации.
pub fn open_device(config: &RecorderConfig) -> RecorderResult<Box<dyn RxDevice>> {
    match &config.device {
        DeviceKind::Simulated => Ok(Box::new(SimulatedDevice::new())),
        DeviceKind::BladeRf => Err(RecorderError::DeviceNotFound(
            "bladeRF backend is not built into this binary; use --device sim".to_string(),
        )),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
