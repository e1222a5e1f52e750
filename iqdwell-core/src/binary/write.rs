use crate::PACKET_HEADER_SIZE;

/// Последовательно записывает поля в буфер заголовка в заданном порядке байт.
pub struct FieldWriter<'a> {
    buf: &'a mut [u8; PACKET_HEADER_SIZE],
    off: usize,
    is_le: bool,
}

impl<'a> FieldWriter<'a> {
    pub fn new(
        buf: &'a mut [u8; PACKET_HEADER_SIZE],
        is_le: bool,
    ) -> Self {
        Self { buf, off: 0, is_le }
    }

    pub fn put_bytes(
        &mut self,
        val: &[u8],
    ) {
        self.buf[self.off..self.off + val.len()].copy_from_slice(val);
        self.off += val.len();
    }

    pub fn put_u32(
        &mut self,
        val: u32,
    ) {
        if self.is_le {
            self.put_bytes(&val.to_le_bytes());
        } else {
            self.put_bytes(&val.to_be_bytes());
        }
    }

    pub fn put_i32(
        &mut self,
        val: i32,
    ) {
        self.put_u32(val as u32);
    }

    pub fn put_u64(
        &mut self,
        val: u64,
    ) {
        if self.is_le {
            self.put_bytes(&val.to_le_bytes());
        } else {
            self.put_bytes(&val.to_be_bytes());
        }
    }

    pub fn put_f64(
        &mut self,
        val: f64,
    ) {
        self.put_u64(val.to_bits());
    }

    /// Текущее смещение (для проверки раскладки).
    pub fn position(&self) -> usize {
        self.off
    }
}
