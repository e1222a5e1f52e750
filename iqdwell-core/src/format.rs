//! Формат файла dwell-захвата (`.iq`)
//!
//! Один файл на dwell: фиксированный заголовок [`PACKET_HEADER_SIZE`] байт,
//! за ним `sample_count × 2` значений `i16` (чередование I, Q).
//!
//! ```text
//! off  size поле
//!   0     4 link_speed (u32: 0 unknown, 1 high, 2 super)
//!   4    32 fpga_version (UTF-8, дополнено нулями)
//!  36    32 firmware_version (UTF-8, дополнено нулями)
//!  68     4 маркер порядка байт
//!  72     8 center_frequency_hz (u64)
//!  80     4 bandwidth_hz (u32)
//!  84     4 sample_rate_hz (u32)
//!  88     4 rx_gain_db (i32)
//!  92     8 dwell_start_epoch_secs (f64)
//! 100     4 sample_count (u32)
//! ```
//!
//! Числовые поля и выборки записаны в порядке байт, объявленном маркером.
//! Контрольной суммы и версии формата нет.

use iqdwell_types::{
    EndiannessTag, FormatError, FormatResult, LinkSpeed, PacketHeader, VersionString,
    VERSION_STRING_CAPACITY,
};

use crate::binary::{FieldReader, FieldWriter};

/// Размер фиксированного заголовка (104 байта)
pub const PACKET_HEADER_SIZE: usize = 104;

/// Смещение маркера порядка байт
pub const ENDIANNESS_OFFSET: usize = 4 + 2 * VERSION_STRING_CAPACITY;

/// Байт на одну комплексную выборку (I16 + Q16)
pub const BYTES_PER_SAMPLE: usize = 2 * std::mem::size_of::<i16>();

/// Кодирование [`PacketHeader`] в фиксированную раскладку.
pub trait PacketHeaderExt: Sized {
    /// Сериализация заголовка в [`PACKET_HEADER_SIZE`] байт
    fn serialize(&self) -> FormatResult<[u8; PACKET_HEADER_SIZE]>;

    /// Десериализация заголовка; порядок байт берётся из маркера
    fn deserialize(buf: &[u8; PACKET_HEADER_SIZE]) -> FormatResult<Self>;
}

impl PacketHeaderExt for PacketHeader {
    fn serialize(&self) -> FormatResult<[u8; PACKET_HEADER_SIZE]> {
        let is_le = self
            .endianness
            .is_little_endian()
            .ok_or_else(|| FormatError::format_violation("cannot encode with unknown byte order"))?;

        let mut buf = [0u8; PACKET_HEADER_SIZE];
        let mut w = FieldWriter::new(&mut buf, is_le);

        w.put_u32(self.link_speed.as_u32());
        w.put_bytes(self.fpga_version.as_padded());
        w.put_bytes(self.firmware_version.as_padded());
        w.put_u32(self.endianness.as_u32());
        w.put_u64(self.center_frequency_hz);
        w.put_u32(self.bandwidth_hz);
        w.put_u32(self.sample_rate_hz);
        w.put_i32(self.rx_gain_db);
        w.put_f64(self.dwell_start_epoch_secs);
        w.put_u32(self.sample_count);

        debug_assert_eq!(w.position(), PACKET_HEADER_SIZE);

        Ok(buf)
    }

    fn deserialize(buf: &[u8; PACKET_HEADER_SIZE]) -> FormatResult<Self> {
        // Маркер симметричен, порядок байт для него не важен
        let raw_tag = u32::from_ne_bytes([
            buf[ENDIANNESS_OFFSET],
            buf[ENDIANNESS_OFFSET + 1],
            buf[ENDIANNESS_OFFSET + 2],
            buf[ENDIANNESS_OFFSET + 3],
        ]);
        let endianness = EndiannessTag::from_u32(raw_tag)?;
        let is_le = endianness.is_little_endian().ok_or_else(|| {
            FormatError::format_violation("file was written with unknown byte order")
        })?;

        let mut r = FieldReader::new(buf, is_le);

        let link_speed = LinkSpeed::from_u32(r.u32());
        let fpga_version = VersionString::from_padded(&r.take::<VERSION_STRING_CAPACITY>())?;
        let firmware_version = VersionString::from_padded(&r.take::<VERSION_STRING_CAPACITY>())?;
        let _tag = r.u32();
        let center_frequency_hz = r.u64();
        let bandwidth_hz = r.u32();
        let sample_rate_hz = r.u32();
        let rx_gain_db = r.i32();
        let dwell_start_epoch_secs = r.f64();
        let sample_count = r.u32();

        debug_assert_eq!(r.position(), PACKET_HEADER_SIZE);

        Ok(PacketHeader {
            link_speed,
            fpga_version,
            firmware_version,
            endianness,
            center_frequency_hz,
            bandwidth_hz,
            sample_rate_hz,
            rx_gain_db,
            dwell_start_epoch_secs,
            sample_count,
        })
    }
}
