use crate::{FormatError, FormatResult};

/// Маркер порядка байт, которым записаны числовые поля и выборки.
///
/// Значения побайтово симметричны, поэтому читатель декодирует маркер ещё
/// до того, как узнает порядок байт файла.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EndiannessTag {
    Big = 0x0000_0000,
    Little = 0x0101_0101,
    Unknown = 0xFFFF_FFFF,
}

impl EndiannessTag {
    /// Порядок байт хоста.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            EndiannessTag::Little
        } else if cfg!(target_endian = "big") {
            EndiannessTag::Big
        } else {
            EndiannessTag::Unknown
        }
    }

    pub fn from_u32(v: u32) -> FormatResult<Self> {
        match v {
            0x0000_0000 => Ok(EndiannessTag::Big),
            0x0101_0101 => Ok(EndiannessTag::Little),
            0xFFFF_FFFF => Ok(EndiannessTag::Unknown),
            _ => Err(FormatError::InvalidEndianness(v)),
        }
    }

    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// `None` для `Unknown`: раскладку байт определить нельзя.
    pub fn is_little_endian(&self) -> Option<bool> {
        match self {
            EndiannessTag::Big => Some(false),
            EndiannessTag::Little => Some(true),
            EndiannessTag::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_byte_palindromes() {
        for tag in [
            EndiannessTag::Big,
            EndiannessTag::Little,
            EndiannessTag::Unknown,
        ] {
            let v = tag.as_u32();
            assert_eq!(v.to_le_bytes(), v.to_be_bytes());
            assert_eq!(EndiannessTag::from_u32(v).unwrap(), tag);
        }
    }

    #[test]
    fn test_native_matches_target() {
        let expected = if cfg!(target_endian = "little") {
            EndiannessTag::Little
        } else {
            EndiannessTag::Big
        };
        assert_eq!(EndiannessTag::native(), expected);
    }

    #[test]
    fn test_invalid_tag_rejected() {
        assert!(matches!(
            EndiannessTag::from_u32(0x0102_0304),
            Err(FormatError::InvalidEndianness(0x0102_0304))
        ));
    }
}
