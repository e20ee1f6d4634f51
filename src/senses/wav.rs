//! In-memory WAV encoding and decoding.

use std::io::Cursor;
use std::time::Duration;

use crate::error::{LucyError, Result};
use crate::exec::run_command;

const FFMPEG_TIMEOUT: Duration = Duration::from_secs(30);

/// Encode mono float samples as a 32-bit float WAV file.
///
/// # Errors
///
/// Returns [`LucyError::Tts`] if the writer fails.
pub fn encode_wav_f32(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| LucyError::Tts(format!("failed to create wav writer: {e}")))?;
    for &s in samples {
        writer
            .write_sample(s)
            .map_err(|e| LucyError::Tts(format!("failed to write wav sample: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| LucyError::Tts(format!("failed to finalize wav: {e}")))?;
    Ok(cursor.into_inner())
}

/// Decode a WAV file to mono float samples, keeping the first channel.
///
/// # Errors
///
/// Returns [`LucyError::Tts`] if the bytes are not a readable WAV file.
pub fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| LucyError::Tts(format!("invalid wav: {e}")))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| LucyError::Tts(format!("wav read failed: {e}")))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| LucyError::Tts(format!("wav read failed: {e}")))?
        }
    };

    let mono = interleaved.into_iter().step_by(channels).collect();
    Ok((mono, spec.sample_rate))
}

/// Decode any container ffmpeg understands (webm, ogg, mp3, wav) to mono
/// float samples at `target_rate`.
///
/// # Errors
///
/// Returns [`LucyError::Asr`] if ffmpeg is missing or fails, or if its
/// output cannot be decoded.
pub async fn decode_audio_bytes(bytes: &[u8], target_rate: u32) -> Result<(Vec<f32>, u32)> {
    let args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-i",
        "pipe:0",
        "-ac",
        "1",
        "-ar",
        &target_rate.to_string(),
        "-f",
        "wav",
        "pipe:1",
    ]
    .iter()
    .map(|s| (*s).to_owned())
    .collect();

    let out = run_command("ffmpeg", &args, FFMPEG_TIMEOUT, Some(bytes))
        .await
        .map_err(|e| LucyError::Asr(format!("ffmpeg: {e}")))?;
    if !out.success() {
        return Err(LucyError::Asr(format!(
            "ffmpeg decode failed: {}",
            out.stderr_text().trim()
        )));
    }
    decode_wav(&out.stdout).map_err(|e| LucyError::Asr(e.to_string()))
}
