use crate::PACKET_HEADER_SIZE;

/// Последовательно читает поля из буфера заголовка.
pub struct FieldReader<'a> {
    buf: &'a [u8; PACKET_HEADER_SIZE],
    off: usize,
    is_le: bool,
}

impl<'a> FieldReader<'a> {
    pub fn new(
        buf: &'a [u8; PACKET_HEADER_SIZE],
        is_le: bool,
    ) -> Self {
        Self { buf, off: 0, is_le }
    }

    pub fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.off..self.off + N]);
        self.off += N;
        out
    }

    pub fn u32(&mut self) -> u32 {
        let b = self.take::<4>();
        if self.is_le {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        }
    }

    pub fn i32(&mut self) -> i32 {
        self.u32() as i32
    }

    pub fn u64(&mut self) -> u64 {
        let b = self.take::<8>();
        if self.is_le {
            u64::from_le_bytes(b)
        } else {
            u64::from_be_bytes(b)
        }
    }

    pub fn f64(&mut self) -> f64 {
        f64::from_bits(self.u64())
    }

    pub fn position(&self) -> usize {
        self.off
    }
}
