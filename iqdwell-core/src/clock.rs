//! Имена файлов dwell по UTC-времени с точностью до миллисекунды.
//!
//! Формат `YYYY_MM_DD_HH_MM_SS_mmm.iq`: лексикографический порядок имён
//! совпадает с хронологическим. Два dwell, завершившиеся в одну
//! миллисекунду, получают одинаковое имя, и второй файл заменяет первый.

use chrono::{DateTime, Utc};

/// Расширение файлов dwell
pub const CAPTURE_FILE_EXTENSION: &str = "iq";

/// Источник текущего времени.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Системные часы.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Выдаёт имена файлов и метки начала dwell от одного источника времени.
#[derive(Debug, Default, Clone)]
pub struct FilenameClock<C: Clock = SystemClock> {
    clock: C,
}

impl FilenameClock<SystemClock> {
    pub fn system() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> FilenameClock<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Имя для dwell, завершившегося только что.
    pub fn next_file_name(&self) -> String {
        file_name_at(&self.clock.now())
    }

    /// Текущее время в секундах Unix epoch с дробной частью.
    pub fn epoch_secs(&self) -> f64 {
        epoch_secs_at(&self.clock.now())
    }
}

/// Имя файла для заданного момента.
pub fn file_name_at(at: &DateTime<Utc>) -> String {
    format!(
        "{}.{CAPTURE_FILE_EXTENSION}",
        at.format("%Y_%m_%d_%H_%M_%S_%3f")
    )
}

pub fn epoch_secs_at(at: &DateTime<Utc>) -> f64 {
    at.timestamp() as f64 + at.timestamp_subsec_nanos() as f64 * 1e-9
}
