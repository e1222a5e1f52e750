use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use iqdwell_types::{EndiannessTag, FormatError, FormatResult, PacketHeader};
use log::debug;
use tempfile::NamedTempFile;

use crate::format::{PacketHeaderExt, BYTES_PER_SAMPLE, PACKET_HEADER_SIZE};

/// Писатель файлов dwell: один новый файл на каждый dwell.
///
/// Держит переиспользуемый байтовый буфер, чтобы запись не выделяла память
/// на каждом dwell.
pub struct CaptureFileWriter {
    output_dir: PathBuf,
    scratch: Vec<u8>,
}

/// Результат записи одного файла.
#[derive(Debug, Clone)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Прочитанный и проверенный файл dwell.
#[derive(Debug, Clone)]
pub struct CaptureFile {
    pub header: PacketHeader,
    /// Чередование I, Q; длина `2 × header.sample_count`
    pub samples: Vec<i16>,
}

/// Потоковый читатель файла dwell.
pub struct CaptureFileReader<R: Read> {
    reader: BufReader<R>,
    header: PacketHeader,
}

impl CaptureFileWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            scratch: Vec::new(),
        }
    }

    /// Заранее резервирует буфер под `max_samples` комплексных выборок.
    pub fn with_capacity(
        output_dir: impl Into<PathBuf>,
        max_samples: u32,
    ) -> Self {
        let mut writer = Self::new(output_dir);
        writer
            .scratch
            .reserve(PACKET_HEADER_SIZE + max_samples as usize * BYTES_PER_SAMPLE);
        writer
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Создаёт `file_name` в выходном каталоге (существующий файл
    /// заменяется) и пишет заголовок и первые `header.sample_count`
    /// IQ пар из `samples`.
    ///
    /// Файл появляется под своим именем только целиком: при ошибке записи
    /// в каталоге не остаётся файла, чей заголовок не совпадает с данными.
    pub fn write_dwell(
        &mut self,
        file_name: &str,
        header: &PacketHeader,
        samples: &[i16],
    ) -> FormatResult<WrittenFile> {
        if header.endianness != EndiannessTag::native() {
            return Err(FormatError::format_violation(format!(
                "header declares {:?}, payload is written in host order",
                header.endianness
            )));
        }

        let values = header.sample_count as usize * 2;
        if samples.len() < values {
            return Err(FormatError::format_violation(format!(
                "sample_count={} needs {values} values, buffer holds {}",
                header.sample_count,
                samples.len()
            )));
        }

        let payload_len = values * std::mem::size_of::<i16>();

        self.scratch.clear();
        self.scratch.extend_from_slice(&header.serialize()?);
        self.scratch.resize(PACKET_HEADER_SIZE + payload_len, 0);
        NativeEndian::write_i16_into(&samples[..values], &mut self.scratch[PACKET_HEADER_SIZE..]);

        let path = self.output_dir.join(file_name);
        let bytes = &self.scratch;
        if let Err(e) = write_atomically(&self.output_dir, &path, |out| out.write_all(bytes)) {
            debug!("Discarded {path:?}: {e}");
            return Err(e.into());
        }

        Ok(WrittenFile {
            path,
            bytes_written: self.scratch.len() as u64,
        })
    }
}

impl<R: Read> CaptureFileReader<R> {
    /// Создаёт читатель, читая и разбирая заголовок из `inner`.
    pub fn new(inner: R) -> FormatResult<Self> {
        let mut reader = BufReader::new(inner);
        let mut hdr_buf = [0u8; PACKET_HEADER_SIZE];

        let mut filled = 0;
        while filled < PACKET_HEADER_SIZE {
            match reader.read(&mut hdr_buf[filled..])? {
                0 => return Err(FormatError::Truncated(filled)),
                n => filled += n,
            }
        }

        let header = PacketHeader::deserialize(&hdr_buf)?;

        Ok(Self { reader, header })
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    /// Читает полезную нагрузку до конца файла.
    ///
    /// Длина должна точно совпадать с объявленной в заголовке.
    pub fn read_samples(mut self) -> FormatResult<Vec<i16>> {
        let declared = self.header.payload_len_bytes();

        let mut raw = Vec::with_capacity(declared as usize);
        self.reader.read_to_end(&mut raw)?;

        if raw.len() as u64 != declared {
            return Err(FormatError::PayloadLength {
                declared,
                found: raw.len() as u64,
            });
        }

        let mut samples = vec![0i16; raw.len() / std::mem::size_of::<i16>()];
        match self.header.endianness.is_little_endian() {
            Some(true) => LittleEndian::read_i16_into(&raw, &mut samples),
            Some(false) => BigEndian::read_i16_into(&raw, &mut samples),
            // Заголовок с Unknown отвергается ещё в `new`
            None => return Err(FormatError::InvalidEndianness(self.header.endianness.as_u32())),
        }

        Ok(samples)
    }

    /// Заголовок и выборки одним значением.
    pub fn into_capture(self) -> FormatResult<CaptureFile> {
        let header = self.header.clone();
        let samples = self.read_samples()?;
        Ok(CaptureFile { header, samples })
    }
}

/// Пишет файл через временный файл в том же каталоге и переименовывает его
/// в `path` только после успешной записи. При ошибке `path` не появляется
/// (или остаётся прежним), временный файл удаляется.
fn write_atomically<F>(
    dir: &Path,
    path: &Path,
    fill: F,
) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        fill(&mut out)?;
        out.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Convenience: открывает и целиком читает файл dwell.
pub fn read_capture_file(path: impl AsRef<Path>) -> FormatResult<CaptureFile> {
    CaptureFileReader::new(File::open(path)?)?.into_capture()
}
