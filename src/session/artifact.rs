use std::io::Cursor;
use std::path::Path;
use tracing::info;

use crate::capture::{AudioChunk, ChunkFormat};
use crate::error::RecordError;

/// The assembled result of a stopped recording: one playable WAV.
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub duration_secs: f64,
    pub chunk_count: usize,
}

impl RecordingArtifact {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        std::fs::write(path.as_ref(), &self.bytes)
            .map_err(|e| RecordError::Artifact(e.to_string()))
    }
}

/// Concatenate the collected chunks into a single WAV artifact.
///
/// WAV chunks each carry their own header, so they are decoded and the
/// samples re-written under one header; raw PCM chunks are interpreted
/// directly.
pub fn assemble(
    chunks: &[AudioChunk],
    format: ChunkFormat,
    sample_rate: u32,
    channels: u16,
) -> Result<RecordingArtifact, RecordError> {
    let mut samples: Vec<i16> = Vec::new();

    for chunk in chunks {
        match format {
            ChunkFormat::Wav => {
                let reader = hound::WavReader::new(Cursor::new(&chunk.bytes))
                    .map_err(|e| RecordError::Artifact(e.to_string()))?;
                for sample in reader.into_samples::<i16>() {
                    samples.push(sample.map_err(|e| RecordError::Artifact(e.to_string()))?);
                }
            }
            ChunkFormat::RawPcm => {
                for pair in chunk.bytes.chunks_exact(2) {
                    samples.push(i16::from_le_bytes([pair[0], pair[1]]));
                }
            }
        }
    }

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| RecordError::Artifact(e.to_string()))?;
    for &sample in &samples {
        writer
            .write_sample(sample)
            .map_err(|e| RecordError::Artifact(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| RecordError::Artifact(e.to_string()))?;

    let duration_secs = samples.len() as f64 / (sample_rate as f64 * channels as f64);

    info!(
        "Assembled artifact: {:.2}s from {} chunks",
        duration_secs,
        chunks.len()
    );

    Ok(RecordingArtifact {
        bytes: cursor.into_inner(),
        mime_type: "audio/wav".to_string(),
        duration_secs,
        chunk_count: chunks.len(),
    })
}
