use std::{
    fs,
    sync::{atomic::Ordering, Arc},
    time::Instant,
};

use iqdwell_core::{CaptureFileWriter, Clock, FilenameClock, SaturationDetector, SystemClock};
use iqdwell_types::{EndiannessTag, LinkSpeed, PacketHeader, VersionString};
use log::{debug, error, info, warn};

use crate::{
    device::{DeviceError, GainMode, RxDevice},
    gain::GainController,
    metrics::CaptureMetrics,
    RecorderConfig, RecorderError, RecorderResult,
};

/// Состояние цикла захвата.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Configuring,
    Streaming { dwell: u64 },
    Draining,
    Stopped,
}

/// Изменяемое состояние сессии, которым владеет только цикл захвата.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub gain: GainController,
    pub overruns: u32,
}

/// Параметры, согласованные с устройством на этапе настройки.
#[derive(Debug, Clone)]
pub struct NegotiatedSession {
    /// Шаблон заголовка: общие для всех dwell поля
    pub header: PacketHeader,
    pub dwell_sample_count: u32,
}

/// Итог завершённой сессии.
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub dwells: u64,
    pub overruns: u32,
    pub final_gain_db: i32,
    pub dwell_sample_count: u32,
    /// Ошибка выключения приёма (сессия уже записана)
    pub drain_error: Option<DeviceError>,
}

impl CaptureReport {
    pub fn exit_code(&self) -> i32 {
        self.drain_error.as_ref().map_or(0, DeviceError::exit_code)
    }
}

/// Оркестрирует сессию: настройка устройства, dwell за dwell до истечения
/// времени сбора, выключение приёма.
pub struct CaptureLoop<C: Clock = SystemClock> {
    config: RecorderConfig,
    metrics: Arc<CaptureMetrics>,
    clock: FilenameClock<C>,
    detector: SaturationDetector,
    state: CaptureState,
}

impl CaptureLoop<SystemClock> {
    /// Создаёт цикл. Возвращает также shared-ссылку на метрики.
    pub fn new(config: RecorderConfig) -> (Self, Arc<CaptureMetrics>) {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> CaptureLoop<C> {
    pub fn with_clock(
        config: RecorderConfig,
        clock: C,
    ) -> (Self, Arc<CaptureMetrics>) {
        let metrics = CaptureMetrics::new();
        let detector = SaturationDetector::new(config.sample_range);
        let l = Self {
            config,
            metrics: metrics.clone(),
            clock: FilenameClock::with_clock(clock),
            detector,
            state: CaptureState::Configuring,
        };

        (l, metrics)
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Запускает сессию. Блокируется до завершения; устройство закрывается
    /// на любом пути выхода, и цикл остаётся в `Stopped`.
    pub fn run<D: RxDevice + ?Sized>(
        &mut self,
        device: &mut D,
    ) -> RecorderResult<CaptureReport> {
        let result = self.run_session(device);

        device.close();
        self.enter(CaptureState::Stopped);

        info!(
            "There were {} overruns.",
            self.metrics.overruns.load(Ordering::Relaxed)
        );

        result
    }

    fn enter(
        &mut self,
        state: CaptureState,
    ) {
        debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn run_session<D: RxDevice + ?Sized>(
        &mut self,
        device: &mut D,
    ) -> RecorderResult<CaptureReport> {
        self.enter(CaptureState::Configuring);
        let session = self.configure(device)?;

        let (dwells, state) = self.stream(device, &session)?;

        self.enter(CaptureState::Draining);
        let drain_error = match device.enable_rx(false) {
            Ok(()) => {
                info!("Disabled RX");
                None
            }
            Err(e) => {
                error!("Failed to disable RX: {e}");
                Some(e)
            }
        };

        Ok(CaptureReport {
            dwells,
            overruns: state.overruns,
            final_gain_db: state.gain.gain_db(),
            dwell_sample_count: session.dwell_sample_count,
            drain_error,
        })
    }

    /// Однократная настройка. Любой отказ прерывает сессию.
    pub fn configure<D: RxDevice + ?Sized>(
        &self,
        device: &mut D,
    ) -> RecorderResult<NegotiatedSession> {
        let cfg = &self.config;
        cfg.validate()?;

        fs::create_dir_all(&cfg.output_dir)?;

        let dev_info = device.info();
        match dev_info.link_speed {
            LinkSpeed::Super => info!("Negotiated USB 3 link speed"),
            LinkSpeed::High => info!("Negotiated USB 2 link speed"),
            LinkSpeed::Unknown => warn!("Negotiated unknown link speed"),
        }

        let fpga_version = version_field("FPGA", &dev_info.fpga_version);
        let firmware_version = version_field("Firmware", &dev_info.firmware_version);
        info!(
            "Using {} serial number {}",
            dev_info.board_name, dev_info.serial
        );

        let center_frequency_hz = device
            .set_frequency(cfg.center_freq_hz)
            .map_err(|e| RecorderError::device("set frequency", e))?;
        info!("Frequency = {:.6} MHz", center_frequency_hz as f64 * 1e-6);

        let sample_rate_hz = device
            .set_sample_rate(cfg.sample_rate_hz)
            .map_err(|e| RecorderError::device("set sample rate", e))?;
        info!("Sample rate = {:.6} Msps", sample_rate_hz as f64 * 1e-6);
        if sample_rate_hz != cfg.sample_rate_hz {
            warn!(
                "Requested {} sps, device runs at {sample_rate_hz} sps",
                cfg.sample_rate_hz
            );
        }

        let bandwidth_hz = device
            .set_bandwidth(cfg.bandwidth_hz)
            .map_err(|e| RecorderError::device("set bandwidth", e))?;
        info!("Bandwidth = {:.6} MHz", bandwidth_hz as f64 * 1e-6);

        device
            .set_gain_mode(GainMode::Manual)
            .map_err(|e| RecorderError::device("disable automatic gain control", e))?;
        info!("Disabled automatic gain control");

        device
            .set_gain(cfg.gain_db)
            .map_err(|e| RecorderError::device("set gain", e))?;
        info!("Gain = {} dB", cfg.gain_db);

        let dwell_sample_count = cfg.dwell_sample_count(sample_rate_hz)?;

        device
            .configure_stream(&cfg.stream)
            .map_err(|e| RecorderError::device("configure RX sync interface", e))?;
        info!(
            "Configured RX sync interface: {} buffers × {} samples, {} transfers",
            cfg.stream.num_buffers, cfg.stream.buffer_size, cfg.stream.num_transfers
        );

        device
            .enable_rx(true)
            .map_err(|e| RecorderError::device("enable RX", e))?;
        info!("Enabled RX");

        Ok(NegotiatedSession {
            header: PacketHeader {
                link_speed: dev_info.link_speed,
                fpga_version,
                firmware_version,
                endianness: EndiannessTag::native(),
                center_frequency_hz,
                bandwidth_hz,
                sample_rate_hz,
                rx_gain_db: cfg.gain_db,
                dwell_start_epoch_secs: 0.0,
                sample_count: 0,
            },
            dwell_sample_count,
        })
    }

    /// Dwell за dwell, пока время с начала сбора не превысит
    /// `collection_secs`. Первый dwell выполняется всегда.
    fn stream<D: RxDevice + ?Sized>(
        &mut self,
        device: &mut D,
        session: &NegotiatedSession,
    ) -> RecorderResult<(u64, SessionState)> {
        let n = session.dwell_sample_count;
        let values = n as usize * 2;
        let metrics = self.metrics.clone();

        let mut state = SessionState {
            gain: GainController::new(self.config.gain_db),
            overruns: 0,
        };
        let mut buffer = vec![0i16; values];
        let mut writer = CaptureFileWriter::with_capacity(&self.config.output_dir, n);
        let mut header = session.header.clone();

        info!(
            "Streaming {n} samples per dwell into {:?}",
            writer.output_dir()
        );

        let start = Instant::now();
        let mut dwell: u64 = 0;

        loop {
            self.enter(CaptureState::Streaming { dwell });

            // Снижение усиления после насыщенного dwell
            if let Some(gain) = state
                .gain
                .apply_pending(device)
                .map_err(|e| RecorderError::device("set gain", e))?
            {
                CaptureMetrics::inc(&metrics.gain_steps);
                info!("Gain = {gain} dB");
            }

            header.rx_gain_db = state.gain.gain_db();
            buffer.fill(0);
            header.dwell_start_epoch_secs = self.clock.epoch_secs();

            let received = device.receive(&mut buffer, n, self.config.rx_timeout);

            header.sample_count = match received {
                Err(e) => {
                    warn!("RX \"now\" failed: {e}");
                    CaptureMetrics::inc(&metrics.rx_errors);
                    0
                }
                Ok(meta) if meta.overrun => {
                    warn!(
                        "Overrun detected. {} valid samples were read.",
                        meta.actual_count
                    );
                    state.overruns += 1;
                    CaptureMetrics::inc(&metrics.overruns);
                    meta.actual_count.min(n)
                }
                Ok(meta) => {
                    debug!("Received {}", meta.actual_count);

                    let saturated = self.detector.is_saturated(&buffer);
                    if saturated {
                        CaptureMetrics::inc(&metrics.saturated_dwells);
                        let range = self.detector.range();
                        warn!(
                            "Saturation detected at {} dB (samples reached {} or {})",
                            header.rx_gain_db, range.min, range.max
                        );
                    }
                    state.gain.on_dwell_complete(saturated);

                    if meta.actual_count > n {
                        warn!(
                            "Device reported {} samples for a {n}-sample request",
                            meta.actual_count
                        );
                    }
                    meta.actual_count.min(n)
                }
            };

            let file_name = self.clock.next_file_name();
            match writer.write_dwell(&file_name, &header, &buffer) {
                Ok(written) => {
                    CaptureMetrics::inc(&metrics.files_written);
                    metrics
                        .samples_recorded
                        .fetch_add(header.sample_count as u64, Ordering::Relaxed);
                    metrics
                        .bytes_written
                        .fetch_add(written.bytes_written, Ordering::Relaxed);
                    debug!("Wrote {:?}", written.path);
                }
                Err(e) => {
                    CaptureMetrics::inc(&metrics.write_errors);
                    error!("Failed to write {file_name}: {e}");
                }
            }

            CaptureMetrics::inc(&metrics.dwells);
            dwell += 1;

            if start.elapsed().as_secs_f64() > self.config.collection_secs {
                break;
            }
        }

        Ok((dwell, state))
    }
}

/// Строка версии для заголовка; обрезка — не ошибка, только предупреждение.
fn version_field(
    what: &str,
    source: &str,
) -> VersionString {
    let (v, truncated) = VersionString::new(source);

    if truncated {
        warn!("{what} version '{source}' truncated to '{v}'");
    }
    info!("{what} version: {v}");

    v
}
