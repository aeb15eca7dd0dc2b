use std::io::Cursor;
use tracing::debug;

use crate::error::CaptureError;

/// Chunk container format, chosen by capability probe at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFormat {
    /// Each chunk is a self-contained WAV file (16-bit PCM).
    Wav,
    /// Raw little-endian 16-bit PCM, no container.
    RawPcm,
}

impl ChunkFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ChunkFormat::Wav => "audio/wav",
            ChunkFormat::RawPcm => "audio/l16",
        }
    }

    /// Pick the first format from `preferred` that can actually encode
    /// in this environment. Raw PCM always works, so a probe over a
    /// list ending in `RawPcm` cannot fail.
    pub fn probe(preferred: &[ChunkFormat], sample_rate: u32, channels: u16) -> ChunkFormat {
        for format in preferred {
            let encoder = ChunkEncoder::new(*format, sample_rate, channels);
            if encoder.encode(&[0i16; 4]).is_ok() {
                debug!("chunk format probe selected {:?}", format);
                return *format;
            }
        }
        ChunkFormat::RawPcm
    }
}

/// Encodes accumulated PCM samples into one binary chunk.
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    format: ChunkFormat,
    sample_rate: u32,
    channels: u16,
}

impl ChunkEncoder {
    pub fn new(format: ChunkFormat, sample_rate: u32, channels: u16) -> Self {
        Self {
            format,
            sample_rate,
            channels,
        }
    }

    pub fn format(&self) -> ChunkFormat {
        self.format
    }

    pub fn encode(&self, samples: &[i16]) -> Result<Vec<u8>, CaptureError> {
        match self.format {
            ChunkFormat::Wav => self.encode_wav(samples),
            ChunkFormat::RawPcm => Ok(samples.iter().flat_map(|s| s.to_le_bytes()).collect()),
        }
    }

    fn encode_wav(&self, samples: &[i16]) -> Result<Vec<u8>, CaptureError> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::Encode(e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| CaptureError::Encode(e.to_string()))?;

        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_chunk_carries_riff_header() {
        let encoder = ChunkEncoder::new(ChunkFormat::Wav, 16000, 1);
        let bytes = encoder.encode(&[1, 2, 3, 4]).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }

    #[test]
    fn raw_pcm_is_little_endian() {
        let encoder = ChunkEncoder::new(ChunkFormat::RawPcm, 16000, 1);
        let bytes = encoder.encode(&[0x0102, -1]).unwrap();
        assert_eq!(bytes, vec![0x02, 0x01, 0xff, 0xff]);
    }

    #[test]
    fn probe_prefers_first_supported() {
        let format = ChunkFormat::probe(&[ChunkFormat::Wav, ChunkFormat::RawPcm], 16000, 1);
        assert_eq!(format, ChunkFormat::Wav);
        assert_eq!(format.mime_type(), "audio/wav");
    }
}
