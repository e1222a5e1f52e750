use crate::{FormatError, FormatResult};

/// Ёмкость строкового поля версии в заголовке (байт).
pub const VERSION_STRING_CAPACITY: usize = 32;

/// Строка фиксированной ёмкости для версий FPGA / прошивки.
///
/// Хранится как UTF-8, дополненный нулями до [`VERSION_STRING_CAPACITY`].
/// Длинные строки обрезаются по границе символа.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct VersionString {
    bytes: [u8; VERSION_STRING_CAPACITY],
    len: usize,
}

impl VersionString {
    /// Создаёт строку, обрезая источник при необходимости.
    ///
    /// Второй элемент кортежа — `true`, если источник был обрезан.
    pub fn new(s: &str) -> (Self, bool) {
        let mut end = s.len().min(VERSION_STRING_CAPACITY);
        while !s.is_char_boundary(end) {
            end -= 1;
        }

        let mut bytes = [0u8; VERSION_STRING_CAPACITY];
        bytes[..end].copy_from_slice(&s.as_bytes()[..end]);

        (Self { bytes, len: end }, end < s.len())
    }

    /// Восстанавливает строку из дополненного нулями поля заголовка.
    pub fn from_padded(raw: &[u8; VERSION_STRING_CAPACITY]) -> FormatResult<Self> {
        let len = raw
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(VERSION_STRING_CAPACITY);

        std::str::from_utf8(&raw[..len])
            .map_err(|e| FormatError::format_violation(format!("version string: {e}")))?;

        let mut bytes = [0u8; VERSION_STRING_CAPACITY];
        bytes[..len].copy_from_slice(&raw[..len]);

        Ok(Self { bytes, len })
    }

    pub fn as_str(&self) -> &str {
        // Содержимое проверено в конструкторах
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }

    /// Поле заголовка целиком, включая нулевое дополнение.
    pub fn as_padded(&self) -> &[u8; VERSION_STRING_CAPACITY] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for VersionString {
    fn default() -> Self {
        Self {
            bytes: [0u8; VERSION_STRING_CAPACITY],
            len: 0,
        }
    }
}

impl std::fmt::Debug for VersionString {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for VersionString {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
