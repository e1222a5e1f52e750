use thiserror::Error;

/// Результат для операций с форматом файла захвата.
pub type FormatResult<T> = std::result::Result<T, FormatError>;

/// Типы ошибок формата файла захвата (`.iq`).
#[derive(Debug, Error)]
pub enum FormatError {
    /// Неизвестный маркер порядка байт
    #[error("Invalid endianness tag: {0:#010x}")]
    InvalidEndianness(u32),

    /// Длина полезной нагрузки не совпадает с `sample_count` из заголовка
    #[error("Payload length mismatch: header declares {declared} bytes, found {found}")]
    PayloadLength { declared: u64, found: u64 },

    /// Файл короче фиксированного заголовка
    #[error("Truncated header: {0} bytes")]
    Truncated(usize),

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Нарушение спецификации формата
    #[error("Format violation: {0}")]
    FormatViolation(String),
}

impl FormatError {
    pub fn format_violation<S: Into<String>>(s: S) -> Self {
        Self::FormatViolation(s.into())
    }
}
