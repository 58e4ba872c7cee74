use crate::audio_data::Sample;
use crate::backend::{AudioBackend, SampleFormat};
use crate::error::{Result, SoundDriverError};
use std::fs::File;
use std::io::{BufReader, Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

const RIFF_HEADER_LEN: u64 = 12;
const CHUNK_HEADER_LEN: u64 = 8;

const FORMAT_PCM: u16 = 1;
const FORMAT_IMA_ADPCM: u16 = 0x11;

/// Contents of the `fmt ` chunk.
#[derive(Debug, Clone, Copy)]
struct WavFormat {
    fmt_length: u32,
    format_type: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

/// How the `data` chunk is handed to the sample store.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Encoding {
    Pcm8,
    Pcm16,
    ImaAdpcm { block_size: u32 },
}

impl WavFormat {
    fn encoding(&self) -> Result<Encoding> {
        match (self.format_type, self.bits_per_sample) {
            (FORMAT_PCM, 8) => Ok(Encoding::Pcm8),
            (FORMAT_PCM, 16) => Ok(Encoding::Pcm16),
            (FORMAT_IMA_ADPCM, _) => Ok(Encoding::ImaAdpcm {
                block_size: self.block_align as u32,
            }),
            (format_type, bits_per_sample) => Err(SoundDriverError::UnsupportedFormat {
                format_type,
                bits_per_sample,
            }),
        }
    }
}

/// Loads a mono WAV file from an in-memory blob and uploads it to `backend`.
///
/// Chunk scanning stops at the end of the RIFF chunk as declared in the header, or at
/// the end of `data`, whichever comes first. The `data` payload itself is only bounded
/// by the end of `data`.
pub fn load_wav_bytes<B: AudioBackend + ?Sized>(backend: &mut B, data: &[u8]) -> Result<Sample> {
    let riff_end = data.get(4..8).map(|size| {
        let overall_size = u32::from_le_bytes([size[0], size[1], size[2], size[3]]);
        overall_size as u64 + CHUNK_HEADER_LEN
    });

    load(backend, Cursor::new(data), riff_end)
}

/// Loads a mono WAV file from a seekable stream and uploads it to `backend`.
///
/// The stream is read from its current position until the `data` chunk is found or the
/// stream ends.
pub fn load_wav<B, R>(backend: &mut B, reader: R) -> Result<Sample>
where
    B: AudioBackend + ?Sized,
    R: Read + Seek,
{
    load(backend, reader, None)
}

/// `scan_end` is relative to the stream's start position and limits where a chunk
/// header may begin.
fn load<B, R>(backend: &mut B, mut reader: R, scan_end: Option<u64>) -> Result<Sample>
where
    B: AudioBackend + ?Sized,
    R: Read + Seek,
{
    let start = reader.stream_position()?;
    let format = read_header(&mut reader)?;
    let encoding = format.encoding()?;

    // Chunks following `fmt ` start right after its declared length.
    reader.seek(SeekFrom::Start(
        start + RIFF_HEADER_LEN + CHUNK_HEADER_LEN + format.fmt_length as u64,
    ))?;

    let data_len = find_data_chunk(&mut reader, scan_end.map(|end| start + end))?;
    // The declared length is untrusted; only allocate what the input actually holds.
    let mut data = Vec::new();
    reader.by_ref().take(data_len as u64).read_to_end(&mut data)?;
    if data.len() < data_len as usize {
        return Err(SoundDriverError::InvalidWav(
            "Input ends inside the data chunk".to_string(),
        ));
    }

    log::debug!(
        "Loaded WAV data: {:?}, {} Hz, {} bytes",
        encoding,
        format.sample_rate,
        data.len()
    );

    let handle = match encoding {
        Encoding::Pcm8 => {
            // unsigned 0..255 to signed -128..127
            for byte in data.iter_mut() {
                *byte = byte.wrapping_sub(128);
            }
            backend.alloc_sample(&data, SampleFormat::PcmS8)?
        }
        Encoding::Pcm16 => backend.alloc_sample(&data, SampleFormat::PcmS16)?,
        Encoding::ImaAdpcm { block_size } => backend.alloc_compressed(&data, block_size)?,
    };

    Ok(Sample::new(handle, format.sample_rate))
}

/// Opens `path` and loads it with [`load_wav`].
pub fn load_wav_file<B, P>(backend: &mut B, path: P) -> Result<Sample>
where
    B: AudioBackend + ?Sized,
    P: AsRef<Path>,
{
    let file = File::open(path)?;
    load_wav(backend, BufReader::new(file))
}

fn read_header<R: Read>(reader: &mut R) -> Result<WavFormat> {
    let header: [u8; 12] = read_array(reader, "RIFF header")?;
    if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        return Err(SoundDriverError::InvalidWav(
            "Input is not valid WAV file".to_string(),
        ));
    }

    let fmt: [u8; 24] = read_array(reader, "fmt chunk")?;
    if &fmt[0..4] != b"fmt " {
        return Err(SoundDriverError::InvalidWav("Expected fmt chunk".to_string()));
    }

    let format = WavFormat {
        fmt_length: u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]),
        format_type: u16::from_le_bytes([fmt[8], fmt[9]]),
        channels: u16::from_le_bytes([fmt[10], fmt[11]]),
        sample_rate: u32::from_le_bytes([fmt[12], fmt[13], fmt[14], fmt[15]]),
        // bytes 16..20 hold the byte rate, which is implied by the rest
        block_align: u16::from_le_bytes([fmt[20], fmt[21]]),
        bits_per_sample: u16::from_le_bytes([fmt[22], fmt[23]]),
    };

    if format.channels != 1 {
        return Err(SoundDriverError::InvalidWav(format!(
            "Only mono WAV files are supported, got {} channels",
            format.channels
        )));
    }

    Ok(format)
}

/// Skips chunks until `data` and returns its length, leaving the reader at its payload.
fn find_data_chunk<R: Read + Seek>(reader: &mut R, scan_end: Option<u64>) -> Result<u32> {
    loop {
        if let Some(end) = scan_end {
            if reader.stream_position()? >= end {
                return Err(SoundDriverError::MissingDataChunk);
            }
        }

        let mut chunk = [0u8; CHUNK_HEADER_LEN as usize];
        match reader.read_exact(&mut chunk) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(SoundDriverError::MissingDataChunk);
            }
            Err(e) => return Err(e.into()),
        }

        let chunk_size = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        if &chunk[0..4] == b"data" {
            return Ok(chunk_size);
        }

        log::trace!(
            "Skipping WAV chunk {:?} ({} bytes)",
            String::from_utf8_lossy(&chunk[0..4]),
            chunk_size
        );
        reader.seek(SeekFrom::Current(chunk_size as i64))?;
    }
}

fn read_array<R: Read, const N: usize>(reader: &mut R, what: &str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| truncated(e, what))?;
    Ok(buf)
}

fn truncated(error: std::io::Error, what: &str) -> SoundDriverError {
    if error.kind() == ErrorKind::UnexpectedEof {
        SoundDriverError::InvalidWav(format!("Input ends inside the {}", what))
    } else {
        SoundDriverError::Io(error)
    }
}
