use crate::{EndiannessTag, LinkSpeed, VersionString};

/// Заголовок файла одного dwell (фиксированный размер, см. `iqdwell-core`).
///
/// Параметры приёмника — фактические значения, возвращённые устройством,
/// а не запрошенные.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketHeader {
    /// Скорость USB-линка
    pub link_speed: LinkSpeed,
    /// Версия FPGA
    pub fpga_version: VersionString,
    /// Версия прошивки
    pub firmware_version: VersionString,
    /// Порядок байт числовых полей и выборок
    pub endianness: EndiannessTag,
    /// Несущая частота в Гц
    pub center_frequency_hz: u64,
    /// Полоса в Гц
    pub bandwidth_hz: u32,
    /// Частота дискретизации в Гц
    pub sample_rate_hz: u32,
    /// Усиление, действовавшее в этом dwell (дБ)
    pub rx_gain_db: i32,
    /// Момент перед блокирующим приёмом (Unix time, секунды)
    pub dwell_start_epoch_secs: f64,
    /// Фактическое количество комплексных выборок в файле
    pub sample_count: u32,
}

impl PacketHeader {
    /// Размер полезной нагрузки в байтах: два `i16` на IQ пару.
    pub fn payload_len_bytes(&self) -> u64 {
        self.sample_count as u64 * 2 * std::mem::size_of::<i16>() as u64
    }
}

impl Default for PacketHeader {
    fn default() -> Self {
        Self {
            link_speed: LinkSpeed::Unknown,
            fpga_version: VersionString::default(),
            firmware_version: VersionString::default(),
            endianness: EndiannessTag::native(),
            center_frequency_hz: 0,
            bandwidth_hz: 0,
            sample_rate_hz: 0,
            rx_gain_db: 0,
            dwell_start_epoch_secs: 0.0,
            sample_count: 0,
        }
    }
}
