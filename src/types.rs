use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Keys the engine sent that this client does not model. Written back verbatim.
pub type ExtraFields = Map<String, Value>;

/// `None` when the key was missing, `Some(None)` when it was an explicit `null`.
/// Paired with `skip_serializing_if = "Option::is_none"` so a missing key stays missing.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Speaker {
    pub name: String,
    pub speaker_uuid: String,
    pub styles: Vec<Style>,
    pub version: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Style {
    pub id: u32,
    pub name: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Phoneme/prosody document returned by `/audio_query` and sent back to `/synthesis`.
///
/// The scalar controls use the engine's camelCase names; the phrase list does not.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AudioQuery {
    pub accent_phrases: Vec<AccentPhrase>,
    #[serde(rename = "speedScale")]
    pub speed_scale: f64,
    #[serde(rename = "pitchScale")]
    pub pitch_scale: f64,
    #[serde(rename = "intonationScale")]
    pub intonation_scale: f64,
    #[serde(rename = "volumeScale")]
    pub volume_scale: f64,
    #[serde(rename = "prePhonemeLength")]
    pub pre_phoneme_length: f64,
    #[serde(rename = "postPhonemeLength")]
    pub post_phoneme_length: f64,
    #[serde(rename = "outputSamplingRate")]
    pub output_sampling_rate: u32,
    #[serde(rename = "outputStereo")]
    pub output_stereo: bool,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub kana: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AccentPhrase {
    pub moras: Vec<Mora>,
    pub accent: i32,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub pause_mora: Option<Option<Mora>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_interrogative: Option<bool>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Mora {
    pub text: String,
    pub consonant: Option<String>,
    pub consonant_length: Option<f64>,
    pub vowel: String,
    pub vowel_length: f64,
    pub pitch: f64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// User-tunable scalars written onto a query before synthesis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Overrides {
    pub speed: f64,
    pub pitch: f64,
    pub intonation: f64,
    pub volume: f64,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch: 0.0,
            intonation: 1.0,
            volume: 1.0,
        }
    }
}

impl AccentPhrase {
    pub fn is_interrogative(&self) -> bool {
        self.is_interrogative.unwrap_or(false)
    }

    pub fn pause_mora(&self) -> Option<&Mora> {
        self.pause_mora.as_ref()?.as_ref()
    }
}

impl AudioQuery {
    /// Overwrites the four user scalars. Every other field is left as the engine sent it.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        self.speed_scale = overrides.speed;
        self.pitch_scale = overrides.pitch;
        self.intonation_scale = overrides.intonation;
        self.volume_scale = overrides.volume;
    }

    /// AquesTalk-style reading, if the engine supplied one.
    pub fn kana(&self) -> Option<&str> {
        self.kana.as_ref()?.as_deref()
    }

    pub fn channel_count(&self) -> u16 {
        if self.output_stereo { 2 } else { 1 }
    }
}
