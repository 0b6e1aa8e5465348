//! Audio file decoding
//!
//! Decodes any symphonia-supported source into an in-memory stereo buffer at
//! the engine's sample rate. Channel folding is fixed: mono is duplicated
//! into both channels, and sources with more than two channels contribute
//! their first pair; rate conversion uses a windowed-sinc resampler.

use std::fs::File;
use std::path::Path;

use basedrop::Shared;
use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::LoadError;
use crate::gc::gc_handle;
use crate::track::LoadedTrack;
use crate::types::{StereoBuffer, StereoSample};

/// Decode a file into a [`LoadedTrack`] at `target_rate`
pub fn decode_file(path: &Path, target_rate: u32) -> Result<LoadedTrack, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::Unreadable(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| LoadError::UnsupportedFormat(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(LoadError::NoAudioTrack)?;
    let track_id = track.id;
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| LoadError::UnsupportedFormat("missing sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| LoadError::UnsupportedFormat(e.to_string()))?;

    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut frames: Vec<StereoSample> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(LoadError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let channels = decoded.spec().channels.count();
                if sample_buf.is_none() {
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, *decoded.spec()));
                }
                let buf = sample_buf.as_mut().unwrap();
                buf.copy_interleaved_ref(decoded);
                fold_to_stereo(buf.samples(), channels, &mut frames);
            }
            // Skip corrupt packets rather than failing the whole load
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(SymphoniaError::IoError(_)) => continue,
            Err(e) => return Err(LoadError::Decode(e.to_string())),
        }
    }

    if frames.is_empty() {
        return Err(LoadError::Empty);
    }

    if source_rate != target_rate {
        frames = resample_stereo(frames, source_rate, target_rate)?;
    }

    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .to_string();

    log::info!(
        "decoded {:?}: {} frames at {} Hz ({} Hz source)",
        path,
        frames.len(),
        target_rate,
        source_rate
    );

    Ok(LoadedTrack {
        title,
        sample_rate: target_rate,
        frames: Shared::new(&gc_handle(), StereoBuffer::from_frames(frames)),
    })
}

/// Fold interleaved samples of any channel count into stereo frames
fn fold_to_stereo(interleaved: &[f32], channels: usize, out: &mut Vec<StereoSample>) {
    match channels {
        0 => {}
        1 => out.extend(interleaved.iter().map(|&s| StereoSample::mono(s))),
        _ => out.extend(
            interleaved
                .chunks_exact(channels)
                .map(|frame| StereoSample::new(frame[0], frame[1])),
        ),
    }
}

/// Resample stereo frames with a windowed-sinc converter
fn resample_stereo(
    frames: Vec<StereoSample>,
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<StereoSample>, LoadError> {
    let ratio = to_rate as f64 / from_rate as f64;
    let sinc_len = 256;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window,
    };
    let chunk_size = 1024;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 2)
        .map_err(|e| LoadError::Decode(format!("resampler: {e}")))?;

    let left: Vec<f32> = frames.iter().map(|s| s.left).collect();
    let right: Vec<f32> = frames.iter().map(|s| s.right).collect();
    let mut out: Vec<StereoSample> = Vec::with_capacity((frames.len() as f64 * ratio) as usize + 64);

    let mut pos = 0;
    loop {
        let need = resampler.input_frames_next();
        if pos + need > left.len() {
            break;
        }
        let block = [&left[pos..pos + need], &right[pos..pos + need]];
        let resampled = resampler
            .process(&block, None)
            .map_err(|e| LoadError::Decode(format!("resample: {e}")))?;
        append_planar(&resampled, &mut out);
        pos += need;
    }

    // Remainder plus whatever is buffered inside the resampler
    if pos < left.len() {
        let block = [&left[pos..], &right[pos..]];
        let resampled = resampler
            .process_partial(Some(&block[..]), None)
            .map_err(|e| LoadError::Decode(format!("resample: {e}")))?;
        append_planar(&resampled, &mut out);
    }
    let tail = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| LoadError::Decode(format!("resample: {e}")))?;
    append_planar(&tail, &mut out);

    Ok(out)
}

fn append_planar(planar: &[Vec<f32>], out: &mut Vec<StereoSample>) {
    if planar.len() < 2 {
        return;
    }
    out.extend(
        planar[0]
            .iter()
            .zip(planar[1].iter())
            .map(|(&l, &r)| StereoSample::new(l, r)),
    );
}
