
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use rubato::{Resampler, SincFixedIn, SincInterpolationType, SincInterpolationParameters, WindowFunction};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample,
    Sample,
    SampleFormat,
    StreamConfig,
    SupportedStreamConfig,
};

use voicevox_say::{PcmFormat, PlaybackDevice};

pub(crate) fn format_sample<O: FromSample<i16> + Sample>(sample: i16) -> O {
    O::from_sample(sample)
}

/// Sample queue shared with the cpal callback.
#[derive(Debug, Clone, Default)]
struct PlaybackQueue {
    chunks: Arc<Mutex<VecDeque<Vec<i16>>>>,
    current: Arc<Mutex<Option<PlaybackCursor>>>,
    /// Samples queued or partly played. Raised before a chunk becomes visible to `fill`.
    pending: Arc<AtomicUsize>,
    failed: Arc<AtomicBool>,
}

#[derive(Debug)]
struct PlaybackCursor {
    buffer: Vec<i16>,
    pos: usize,
}

impl PlaybackQueue {
    fn push(&self, chunk: Vec<i16>) {
        if chunk.is_empty() {
            return;
        }
        self.pending.fetch_add(chunk.len(), Ordering::AcqRel);
        self.chunks.lock().push_back(chunk);
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn fill<S: FromSample<i16> + Sample>(&self, out: &mut [S]) {
        let mut current = self.current.lock();
        let mut written = 0;

        while written < out.len() {
            if current.is_none() {
                let chunk = self.chunks.lock().pop_front();
                match chunk {
                    Some(buffer) => *current = Some(PlaybackCursor { buffer, pos: 0 }),
                    None => break,
                }
            }

            let Some(cursor) = current.as_mut() else {
                break;
            };
            let remaining = &cursor.buffer[cursor.pos..];
            let n = remaining.len().min(out.len() - written);
            for (dst, src) in out[written..written + n].iter_mut().zip(remaining) {
                *dst = format_sample::<S>(*src);
            }
            written += n;
            cursor.pos += n;
            self.pending.fetch_sub(n, Ordering::AcqRel);
            if cursor.pos >= cursor.buffer.len() {
                *current = None;
            }
        }

        for dst in out[written..].iter_mut() {
            *dst = S::EQUILIBRIUM;
        }
    }

    fn check(&self) -> io::Result<()> {
        if self.failed.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "output stream failed"));
        }
        Ok(())
    }
}

/// Default output device opened for one waveform. The stream is released on drop.
pub(crate) struct AudioPlayer {
    queue: PlaybackQueue,
    _stream: cpal::Stream,
    source: PcmFormat,
    device_rate: u32,
    device_channels: u16,
    passthrough: bool,
    carry: Option<u8>,
    staged: Vec<i16>,
}

impl AudioPlayer {
    pub fn open(format: PcmFormat) -> Result<Self, anyhow::Error> {
        if format.sample_width != 2 {
            return Err(anyhow::anyhow!("Unsupported sample width: {} bytes", format.sample_width));
        }
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(anyhow::anyhow!("Invalid output format: {} Hz, {} channel(s)", format.sample_rate, format.channels));
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| anyhow::anyhow!("No default output device"))?;

        let (supported, passthrough) = match matching_config(&device, &format)? {
            Some(config) => (config, true),
            None => {
                log::warn!("Output device cannot play {} Hz / {} channel(s) directly; resampling", format.sample_rate, format.channels);
                (device.default_output_config()?, false)
            },
        };
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        log::debug!("Opening output stream: {:?} ({:?})", config, sample_format);

        let queue = PlaybackQueue::default();

        let failed = queue.failed.clone();
        let err_fn = move |err: cpal::StreamError| {
            log::error!("an error occurred on the output audio stream: {}", err);
            failed.store(true, Ordering::Release);
        };

        let stream = match sample_format {
            SampleFormat::F32 => device.build_output_stream(&config, callback::<f32>(&queue), err_fn, None)?,
            SampleFormat::F64 => device.build_output_stream(&config, callback::<f64>(&queue), err_fn, None)?,
            SampleFormat::I8 => device.build_output_stream(&config, callback::<i8>(&queue), err_fn, None)?,
            SampleFormat::U8 => device.build_output_stream(&config, callback::<u8>(&queue), err_fn, None)?,
            SampleFormat::I16 => device.build_output_stream(&config, callback::<i16>(&queue), err_fn, None)?,
            SampleFormat::U16 => device.build_output_stream(&config, callback::<u16>(&queue), err_fn, None)?,
            SampleFormat::I32 => device.build_output_stream(&config, callback::<i32>(&queue), err_fn, None)?,
            SampleFormat::U32 => device.build_output_stream(&config, callback::<u32>(&queue), err_fn, None)?,
            SampleFormat::I64 => device.build_output_stream(&config, callback::<i64>(&queue), err_fn, None)?,
            SampleFormat::U64 => device.build_output_stream(&config, callback::<u64>(&queue), err_fn, None)?,
            _ => {
                return Err(anyhow::anyhow!("Unsupported sample format"));
            },
        };

        stream.play()?;

        Ok(Self {
            queue,
            _stream: stream,
            source: format,
            device_rate: config.sample_rate.0,
            device_channels: config.channels,
            passthrough,
            carry: None,
            staged: Vec::new(),
        })
    }

    fn wait_blocking_until_empty(&self) -> io::Result<()> {
        while self.queue.pending() > 0 {
            self.queue.check()?;
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        std::thread::sleep(std::time::Duration::from_millis(100));
        self.queue.check()
    }
}

impl io::Write for AudioPlayer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.queue.check()?;
        let samples = decode_le_samples(&mut self.carry, buf);
        if self.passthrough {
            self.queue.push(samples);
        } else {
            self.staged.extend_from_slice(&samples);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl PlaybackDevice for AudioPlayer {
    fn drain(&mut self) -> io::Result<()> {
        if !self.staged.is_empty() {
            let staged = std::mem::take(&mut self.staged);
            let converted = convert_for_device(&staged, &self.source, self.device_rate, self.device_channels)
                .map_err(io::Error::other)?;
            self.queue.push(converted);
        }

        log::debug!("Waiting for audio to finish...");
        self.wait_blocking_until_empty()
    }
}

fn callback<T>(queue: &PlaybackQueue) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static
where
    T: FromSample<i16> + Sample,
{
    let queue = queue.clone();
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        queue.fill(data);
    }
}

/// A device config that plays `format` as-is, preferring 16-bit output.
fn matching_config(device: &cpal::Device, format: &PcmFormat) -> Result<Option<SupportedStreamConfig>, anyhow::Error> {
    let rate = cpal::SampleRate(format.sample_rate);
    let mut candidates = device
        .supported_output_configs()?
        .filter(|range| range.channels() == format.channels)
        .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
        .collect::<Vec<_>>();
    candidates.sort_by_key(|range| range.sample_format() != SampleFormat::I16);
    Ok(candidates.into_iter().next().map(|range| range.with_sample_rate(rate)))
}

/// Little-endian 16-bit samples in `buf`. An odd trailing byte is kept in `carry` for the next call.
pub(crate) fn decode_le_samples(carry: &mut Option<u8>, buf: &[u8]) -> Vec<i16> {
    let mut samples = Vec::with_capacity(buf.len() / 2 + 1);
    let mut rest = buf;
    if let Some(low) = carry.take() {
        match rest.split_first() {
            Some((high, tail)) => {
                samples.push(i16::from_le_bytes([low, *high]));
                rest = tail;
            },
            None => {
                *carry = Some(low);
                return samples;
            },
        }
    }

    let mut pairs = rest.chunks_exact(2);
    samples.extend(pairs.by_ref().map(|pair| i16::from_le_bytes([pair[0], pair[1]])));
    if let [last] = pairs.remainder() {
        *carry = Some(*last);
    }
    samples
}

/// Down-mixes to mono, resamples to `target_rate`, and copies the result onto every device channel.
pub(crate) fn convert_for_device(samples: &[i16], source: &PcmFormat, target_rate: u32, target_channels: u16) -> Result<Vec<i16>, anyhow::Error> {
    let orig_channel_count = source.channels.max(1) as usize;
    let mono_samples = samples.chunks(orig_channel_count).map(|chunk| {
        let sum = chunk.iter().fold(0.0, |acc, &sample| acc + format_sample::<f64>(sample));
        sum / chunk.len() as f64
    }).collect::<Vec<_>>();

    let orig_frame_count = mono_samples.len();
    if orig_frame_count == 0 {
        return Ok(Vec::new());
    }

    let resample_ratio = target_rate as f64 / source.sample_rate as f64;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let input_chunk_size = orig_frame_count.min(1024);

    let mut resampler = SincFixedIn::<f64>::new(
        resample_ratio,
        2.0,
        params,
        input_chunk_size,
        1,
    )?;

    let mut input_buffer = vec![Vec::with_capacity(input_chunk_size)];

    let new_length = (orig_frame_count as f64 * resample_ratio) as usize;
    let output_delay = resampler.output_delay();
    let mut output_buffer: Vec<f64> = Vec::with_capacity(new_length + output_delay);

    let mut output_frames = vec![vec![0.0f64; resampler.output_frames_max()]];
    let mut input_index = 0;
    loop {
        let frames = resampler.input_frames_next();
        let remaining = orig_frame_count - input_index;
        if frames > remaining {
            break;
        }

        input_buffer[0].clear();
        input_buffer[0].extend_from_slice(&mono_samples[input_index..input_index + frames]);

        let (_, output_count) = resampler.process_into_buffer(&input_buffer, &mut output_frames, None)?;
        output_buffer.extend_from_slice(&output_frames[0][..output_count]);

        input_index += frames;
    }

    let frames = resampler.input_frames_next();
    let remaining = orig_frame_count - input_index;
    if remaining > 0 {
        input_buffer[0].clear();
        input_buffer[0].extend_from_slice(&mono_samples[input_index..]);
        input_buffer[0].resize(frames, 0.0);

        let (_, output_count) = resampler.process_into_buffer(&input_buffer, &mut output_frames, None)?;
        output_buffer.extend_from_slice(&output_frames[0][..output_count]);
    }

    while output_buffer.len() < new_length + output_delay {
        let (_, output_count) = resampler.process_partial_into_buffer(None::<&[Vec<f64>]>, &mut output_frames, None)?;
        output_buffer.extend_from_slice(&output_frames[0][..output_count]);
    }

    let channels = target_channels.max(1) as usize;
    let output = output_buffer[output_delay..output_delay + new_length]
        .iter()
        .flat_map(|sample| std::iter::repeat(<i16 as Sample>::from_sample(*sample)).take(channels))
        .collect::<Vec<_>>();

    Ok(output)
}
