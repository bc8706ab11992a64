
pub(crate) mod audio_output;

use voicevox_say::{self as vv, pipeline, ClientError, HttpEngine, Overrides, RunConfig, SpeechEngine};

use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

/// Speaks text through a VOICEVOX engine, or saves the result as WAV.
#[derive(Debug, Parser)]
#[command(long_about = None, version)]
struct Cli {
    /// Base URL of the synthesis engine
    #[arg(long, env = "VOICEVOX_ENDPOINT", default_value = vv::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Zero-based index into the engine's speaker list
    #[arg(long, default_value_t = 0)]
    speaker: usize,

    /// Zero-based index into the selected speaker's styles
    #[arg(long, default_value_t = 0)]
    style: usize,

    /// Speed scale
    #[arg(long, default_value_t = Overrides::default().speed)]
    speed: f64,

    /// Intonation scale
    #[arg(long, default_value_t = Overrides::default().intonation)]
    intonation: f64,

    /// Volume scale
    #[arg(long, default_value_t = Overrides::default().volume)]
    volume: f64,

    /// Pitch scale
    #[arg(long, default_value_t = Overrides::default().pitch, allow_negative_numbers = true)]
    pitch: f64,

    /// Write WAV to this file instead of playing it
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    /// Request timeout in seconds (none by default)
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the engine's speakers and styles, then exit
    #[arg(long)]
    list_speakers: bool,

    /// JSON output for --list-speakers
    #[arg(long, requires = "list_speakers")]
    json: bool,

    /// Text to speak. Read from stdin when omitted.
    text: Vec<String>,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let overrides = Overrides {
            speed: self.speed,
            pitch: self.pitch,
            intonation: self.intonation,
            volume: self.volume,
        };
        RunConfig::new(&self.endpoint, self.speaker, self.style, overrides, self.output.clone())
            .with_timeout(self.timeout.map(Duration::from_secs))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse_from(vv::normalize_args(std::env::args_os()));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("voicevox-say: {} [{}]", err, err.error_name());
            let code = err.code().unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        },
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = cli.run_config();
    let engine = HttpEngine::new(config.endpoint(), config.timeout())?;

    if cli.list_speakers {
        return list_speakers(&engine, cli.json).await;
    }

    let stdin = std::io::stdin();
    let piped = !stdin.is_terminal();
    let text = input_text(&cli.text, piped, stdin.lock())?;
    log::debug!("Input text: {}", text);

    pipeline::run(&engine, &config, &text, audio_output::AudioPlayer::open).await?;

    log::info!("Done.");
    Ok(())
}

/// Positional words win; otherwise piped input is read to the end.
fn input_text<R: Read>(words: &[String], piped: bool, mut input: R) -> Result<String, ClientError> {
    if words.is_empty() && piped {
        let mut text = String::new();
        input.read_to_string(&mut text).map_err(|e| ClientError::io(vv::Stage::Input, e))?;
        return Ok(text.trim().to_string());
    }
    Ok(vv::join_text(words))
}

async fn list_speakers(engine: &HttpEngine, json: bool) -> Result<(), ClientError> {
    let speakers = engine.speakers().await?;
    let io_err = |e| ClientError::io(vv::Stage::Output, e);

    let mut stdout = std::io::stdout().lock();
    if json {
        let mut json = serde_json::to_string_pretty(&speakers).map_err(|e| ClientError::serialization(vv::Stage::Output, e))?;
        json.push('\n');
        stdout.write_all(json.as_bytes()).map_err(io_err)?;
    } else {
        writeln!(stdout, "SPEAKER\tSTYLE\tSTYLE_ID\tSPEAKER_NAME\tSTYLE_NAME").map_err(io_err)?;
        for (i, speaker) in speakers.iter().enumerate() {
            for (j, style) in speaker.styles.iter().enumerate() {
                writeln!(stdout, "{}\t{}\t{}\t{}\t{}", i, j, style.id, speaker.name, style.name).map_err(io_err)?;
            }
        }
    }
    Ok(())
}
