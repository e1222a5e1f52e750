use iqdwell_types::FormatError;
use thiserror::Error;

use crate::device::DeviceError;

pub type RecorderResult<T> = std::result::Result<T, RecorderError>;

/// Ошибки, прерывающие сессию записи.
///
/// Ошибки отдельного dwell (приём, overrun, запись файла) сюда не попадают:
/// они учитываются в метриках, и цикл продолжается.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// SDR устройство не найдено
    #[error("SDR device not found: {0}")]
    DeviceNotFound(String),

    /// Отказ устройства при настройке или при снижении усиления
    #[error("Failed to {op}: {source}")]
    Device {
        op: &'static str,
        source: DeviceError,
    },

    /// Некорректные параметры сессии
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Ошибка ввода/вывода
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка формата файла захвата
    #[error("Capture file error: {0}")]
    Format(#[from] FormatError),
}

impl RecorderError {
    pub fn device(
        op: &'static str,
        source: DeviceError,
    ) -> Self {
        Self::Device { op, source }
    }

    /// Код завершения процесса: статус устройства, если ошибка пришла от
    /// него, иначе 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RecorderError::Device { source, .. } => source.exit_code(),
            _ => 1,
        }
    }
}
