use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

/// Счётчики сессии захвата.
#[derive(Debug, Default)]
pub struct CaptureMetrics {
    pub dwells: AtomicU64,
    pub files_written: AtomicU64,
    pub samples_recorded: AtomicU64,
    pub bytes_written: AtomicU64,
    pub overruns: AtomicU64,
    pub rx_errors: AtomicU64,
    pub write_errors: AtomicU64,
    pub saturated_dwells: AtomicU64,
    pub gain_steps: AtomicU64,
}

/// Snapshot метрик для отображения / тестирования.
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    pub duration_secs: f64,
    pub dwells: u64,
    pub files_written: u64,
    pub samples_recorded: u64,
    pub bytes_written: u64,
    pub overruns: u64,
    pub rx_errors: u64,
    pub write_errors: u64,
    pub saturated_dwells: u64,
    pub gain_steps: u64,
    pub throughput_msps: f64,
}

impl CaptureMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn throughput_msps(
        &self,
        elapsed: &Instant,
    ) -> f64 {
        let secs = elapsed.elapsed().as_secs_f64();

        if secs < 1e-9 {
            return 0.0;
        }

        self.samples_recorded.load(Ordering::Relaxed) as f64 / secs / 1_000_000.0
    }

    /// Итоговая сводка для вывода в конце сессии.
    pub fn summary(
        &self,
        elapsed: &Instant,
    ) -> CaptureSummary {
        CaptureSummary {
            duration_secs: elapsed.elapsed().as_secs_f64(),
            dwells: self.dwells.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            rx_errors: self.rx_errors.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            saturated_dwells: self.saturated_dwells.load(Ordering::Relaxed),
            gain_steps: self.gain_steps.load(Ordering::Relaxed),
            throughput_msps: self.throughput_msps(elapsed),
        }
    }
}

impl std::fmt::Display for CaptureSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Duration      : {:.1}s", self.duration_secs)?;
        writeln!(f, "  Dwells        : {}", self.dwells)?;
        writeln!(f, "  Files         : {}", self.files_written)?;
        writeln!(f, "  Samples       : {}", self.samples_recorded)?;
        writeln!(
            f,
            "  Bytes written : {:.1} MB",
            self.bytes_written as f64 / 1e6
        )?;
        writeln!(f, "  Overruns      : {}", self.overruns)?;
        writeln!(f, "  RX errors     : {}", self.rx_errors)?;
        writeln!(f, "  Write errors  : {}", self.write_errors)?;
        writeln!(
            f,
            "  Saturated     : {} dwells, gain lowered {} dB",
            self.saturated_dwells, self.gain_steps
        )?;
        writeln!(f, "  Throughput    : {:.3} Msps", self.throughput_msps)?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}
