
use crate::error::{ClientError, ClientErrorDescription, OutOfRange};
use crate::types::Speaker;

/// A style picked out of the speaker directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub style_id: u32,
    pub speaker_name: String,
    pub style_name: String,
}

/// Looks up `speakers[speaker_index].styles[style_index]`. Indices are zero-based and never clamped.
pub fn resolve(speakers: &[Speaker], speaker_index: usize, style_index: usize) -> Result<Selection, ClientError> {
    let speaker = speakers.get(speaker_index).ok_or_else(|| {
        ClientError::new(ClientErrorDescription::OutOfRange(OutOfRange::Speaker {
            index: speaker_index,
            available: speakers.len(),
        }))
    })?;

    let style = speaker.styles.get(style_index).ok_or_else(|| {
        ClientError::new(ClientErrorDescription::OutOfRange(OutOfRange::Style {
            speaker: speaker.name.clone(),
            index: style_index,
            available: speaker.styles.len(),
        }))
    })?;

    Ok(Selection {
        style_id: style.id,
        speaker_name: speaker.name.clone(),
        style_name: style.name.clone(),
    })
}
