/// Скорость USB-линка, согласованная с устройством при открытии.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum LinkSpeed {
    /// Не удалось определить
    #[default]
    Unknown = 0,
    /// USB 2.0 High-Speed
    High = 1,
    /// USB 3.0 SuperSpeed
    Super = 2,
}

impl LinkSpeed {
    /// Неизвестные значения не считаются ошибкой: сессия продолжается
    /// с `Unknown`.
    pub fn from_u32(v: u32) -> Self {
        match v {
            1 => LinkSpeed::High,
            2 => LinkSpeed::Super,
            _ => LinkSpeed::Unknown,
        }
    }

    pub fn as_u32(&self) -> u32 {
        *self as u32
    }
}

impl std::fmt::Display for LinkSpeed {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            LinkSpeed::Unknown => write!(f, "unknown"),
            LinkSpeed::High => write!(f, "USB 2 (high speed)"),
            LinkSpeed::Super => write!(f, "USB 3 (super speed)"),
        }
    }
}
