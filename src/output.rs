
use std::io::Write;
use std::path::Path;

use crate::error::{BoxError, ClientError, Stage};
use crate::types::AudioQuery;

/// Size of the RIFF/WAVE header the engine puts in front of the samples.
pub const WAV_HEADER_LEN: usize = 44;

/// Bytes per sample. The engine always emits 16-bit PCM.
pub const SAMPLE_WIDTH: u16 = 2;

const PLAYBACK_CHUNK_LEN: usize = 3200;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_width: u16,
}

impl PcmFormat {
    /// Format the engine was asked to produce, as echoed back in the query.
    pub fn from_query(query: &AudioQuery) -> Self {
        Self {
            sample_rate: query.output_sampling_rate,
            channels: query.channel_count(),
            sample_width: SAMPLE_WIDTH,
        }
    }
}

/// A byte sink that plays raw little-endian PCM.
///
/// Dropping the device releases it; `drain` is called first on the success path.
pub trait PlaybackDevice: Write {
    /// Blocks until everything written so far has been played.
    fn drain(&mut self) -> std::io::Result<()>;
}

impl<D: PlaybackDevice + ?Sized> PlaybackDevice for &mut D {
    fn drain(&mut self) -> std::io::Result<()> {
        (**self).drain()
    }
}

/// Writes the waveform verbatim, replacing any existing file.
pub fn write_wav_file<P: AsRef<Path>>(path: P, wav: &[u8]) -> Result<(), ClientError> {
    std::fs::write(path.as_ref(), wav).map_err(|e| ClientError::io(Stage::Output, e))?;
    log::info!("Wrote {} bytes to {}", wav.len(), path.as_ref().display());
    Ok(())
}

/// Samples following the fixed-size header.
pub fn pcm_payload(wav: &[u8]) -> Result<&[u8], ClientError> {
    if wav.len() < WAV_HEADER_LEN {
        return Err(ClientError::decode(
            Stage::Playback,
            format!("waveform is {} bytes, shorter than the {}-byte header", wav.len(), WAV_HEADER_LEN),
        ));
    }
    Ok(&wav[WAV_HEADER_LEN..])
}

/// Streams `pcm` into an open device and waits for it to finish.
pub fn stream_pcm<D: PlaybackDevice + ?Sized>(device: &mut D, pcm: &[u8]) -> Result<(), ClientError> {
    for chunk in pcm.chunks(PLAYBACK_CHUNK_LEN) {
        device.write_all(chunk).map_err(|e| ClientError::io(Stage::Playback, e))?;
    }
    device.flush().map_err(|e| ClientError::io(Stage::Playback, e))?;
    device.drain().map_err(|e| ClientError::io(Stage::Playback, e))?;
    Ok(())
}

/// Opens a device for `format`, plays the samples of `wav` and releases the device.
///
/// A waveform shorter than the header is rejected before any device is opened.
pub fn play<D, E, F>(format: PcmFormat, wav: &[u8], open: F) -> Result<(), ClientError>
where
    D: PlaybackDevice,
    E: Into<BoxError>,
    F: FnOnce(PcmFormat) -> Result<D, E>,
{
    let pcm = pcm_payload(wav)?;
    log::debug!("Playing {} bytes at {} Hz, {} channel(s)", pcm.len(), format.sample_rate, format.channels);

    let mut device = open(format).map_err(ClientError::playback_init)?;
    stream_pcm(&mut device, pcm)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ErrorKind;

    /// Records everything written to it.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingDevice {
        pub written: Vec<u8>,
        pub drained: bool,
        pub fail_after: Option<usize>,
    }

    impl Write for RecordingDevice {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Some(limit) = self.fail_after {
                if self.written.len() + buf.len() > limit {
                    return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "device lost"));
                }
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl PlaybackDevice for RecordingDevice {
        fn drain(&mut self) -> std::io::Result<()> {
            self.drained = true;
            Ok(())
        }
    }

    fn waveform(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("voicevox-say-{}-{}", std::process::id(), name))
    }

    #[test]
    fn file_contents_match_waveform_exactly() {
        for len in [0, 43, 44, 10_000] {
            let path = temp_path(&format!("out-{}.wav", len));
            let wav = waveform(len);
            write_wav_file(&path, &wav).unwrap();
            assert_eq!(std::fs::read(&path).unwrap(), wav);
            std::fs::remove_file(&path).unwrap();
        }
    }

    #[test]
    fn existing_file_is_overwritten() {
        let path = temp_path("overwrite.wav");
        std::fs::write(&path, vec![0xffu8; 4096]).unwrap();
        write_wav_file(&path, b"RIFF").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let path = temp_path("missing-dir").join("out.wav");
        let err = write_wav_file(&path, b"RIFF").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.stage(), Stage::Output);
    }

    #[test]
    fn payload_skips_header() {
        let wav = waveform(100);
        assert_eq!(pcm_payload(&wav).unwrap(), &wav[44..]);
        assert!(pcm_payload(&wav[..44]).unwrap().is_empty());
    }

    #[test]
    fn short_waveform_is_a_decode_error() {
        let err = pcm_payload(&waveform(43)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn playback_streams_everything_after_header_and_drains() {
        let wav = waveform(44 + PLAYBACK_CHUNK_LEN * 2 + 17);
        let format = PcmFormat { sample_rate: 24000, channels: 1, sample_width: SAMPLE_WIDTH };

        let mut opened = None;
        let mut device = RecordingDevice::default();
        stream_pcm(&mut device, pcm_payload(&wav).unwrap()).unwrap();
        assert_eq!(device.written, &wav[44..]);
        assert!(device.drained);

        play(format, &wav, |f| {
            opened = Some(f);
            Ok::<_, BoxError>(RecordingDevice::default())
        }).unwrap();
        assert_eq!(opened, Some(format));
    }

    #[test]
    fn short_waveform_never_opens_device() {
        let format = PcmFormat { sample_rate: 24000, channels: 2, sample_width: SAMPLE_WIDTH };
        let mut opened = false;
        let err = play(format, &waveform(10), |_| {
            opened = true;
            Ok::<_, BoxError>(RecordingDevice::default())
        }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(!opened);
    }

    #[test]
    fn device_open_failure_is_playback_init() {
        let format = PcmFormat { sample_rate: 24000, channels: 1, sample_width: SAMPLE_WIDTH };
        let err = play(format, &waveform(100), |_| Err::<RecordingDevice, _>("no output device")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PlaybackInit);
    }

    #[test]
    fn write_failure_midway_is_an_io_error() {
        let mut device = RecordingDevice { fail_after: Some(PLAYBACK_CHUNK_LEN), ..Default::default() };
        let err = stream_pcm(&mut device, &waveform(PLAYBACK_CHUNK_LEN * 3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.stage(), Stage::Playback);
        assert!(!device.drained);
    }

    #[test]
    fn format_comes_from_query() {
        let mut query = crate::types::tests::sample_query();
        query.output_stereo = true;
        query.output_sampling_rate = 48000;
        assert_eq!(
            PcmFormat::from_query(&query),
            PcmFormat { sample_rate: 48000, channels: 2, sample_width: 2 },
        );
    }
}
