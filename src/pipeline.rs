
use crate::config::{OutputTarget, RunConfig};
use crate::engine::SpeechEngine;
use crate::error::{BoxError, ClientError};
use crate::output::{self, PcmFormat, PlaybackDevice};
use crate::selection::{self, Selection};
use crate::types::AudioQuery;

/// Result of one pass through the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesized {
    pub selection: Selection,
    /// The query exactly as it was submitted for synthesis.
    pub query: AudioQuery,
    pub wav: Vec<u8>,
}

/// Directory lookup, query, overrides and synthesis. The same style id is used for both requests.
pub async fn synthesize<E: SpeechEngine>(engine: &E, config: &RunConfig, text: &str) -> Result<Synthesized, ClientError> {
    let speakers = engine.speakers().await?;
    log::debug!("Engine reported {} speaker(s)", speakers.len());

    let selection = selection::resolve(&speakers, config.speaker(), config.style())?;
    log::info!("Speaker: {} / {} (style id {})", selection.speaker_name, selection.style_name, selection.style_id);

    let mut query = engine.audio_query(selection.style_id, text).await?;
    query.apply_overrides(config.overrides());

    let wav = engine.synthesis(selection.style_id, &query).await?;

    Ok(Synthesized {
        selection,
        query,
        wav,
    })
}

/// Writes the waveform to the configured file, or plays it on a device opened by `open_device`.
pub fn deliver<D, OpenErr, F>(config: &RunConfig, synthesized: &Synthesized, open_device: F) -> Result<(), ClientError>
where
    D: PlaybackDevice,
    OpenErr: Into<BoxError>,
    F: FnOnce(PcmFormat) -> Result<D, OpenErr>,
{
    match config.output_target() {
        OutputTarget::File(path) => output::write_wav_file(path, &synthesized.wav),
        OutputTarget::Playback => {
            let format = PcmFormat::from_query(&synthesized.query);
            output::play(format, &synthesized.wav, open_device)
        },
    }
}

pub async fn run<E, D, OpenErr, F>(engine: &E, config: &RunConfig, text: &str, open_device: F) -> Result<(), ClientError>
where
    E: SpeechEngine,
    D: PlaybackDevice,
    OpenErr: Into<BoxError>,
    F: FnOnce(PcmFormat) -> Result<D, OpenErr>,
{
    let synthesized = synthesize(engine, config, text).await?;
    deliver(config, &synthesized, open_device)
}
