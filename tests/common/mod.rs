#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use voicevox_say::{AudioQuery, PlaybackDevice, Speaker};

pub const QUERY_JSON: &str = r#"{
    "accent_phrases": [
        {
            "moras": [
                {"text": "ハ", "consonant": "h", "consonant_length": 0.0711, "vowel": "a", "vowel_length": 0.1182, "pitch": 5.52},
                {"text": "ロ", "consonant": "r", "consonant_length": 0.0371, "vowel": "o", "vowel_length": 0.1024, "pitch": 5.74},
                {"text": "オ", "consonant": null, "consonant_length": null, "vowel": "o", "vowel_length": 0.1306, "pitch": 5.61}
            ],
            "accent": 1,
            "pause_mora": null,
            "is_interrogative": false
        }
    ],
    "speedScale": 1.0,
    "pitchScale": 0.0,
    "intonationScale": 1.0,
    "volumeScale": 1.0,
    "prePhonemeLength": 0.1,
    "postPhonemeLength": 0.1,
    "pauseLength": null,
    "pauseLengthScale": 1.0,
    "outputSamplingRate": 24000,
    "outputStereo": false,
    "kana": "ハ'ロオ"
}"#;

pub const SPEAKERS_JSON: &str = r#"[
    {
        "name": "A",
        "speaker_uuid": "7ffcb7ce-00ec-4bdc-82cd-45a8889e43ff",
        "styles": [{"name": "normal", "id": 7, "type": "talk"}],
        "version": "0.14.0"
    }
]"#;

pub fn sample_query() -> AudioQuery {
    serde_json::from_str(QUERY_JSON).unwrap()
}

pub fn sample_speakers() -> Vec<Speaker> {
    serde_json::from_str(SPEAKERS_JSON).unwrap()
}

/// 16-bit mono WAV produced by hound, 44-byte header included.
pub fn sample_wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for sample in samples {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("voicevox-say-it-{}-{}", std::process::id(), name))
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub written: Vec<u8>,
    pub drained: bool,
}

impl Write for RecordingDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
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
