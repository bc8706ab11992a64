pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod selection;
pub mod types;

pub use config::{normalize_args, OutputTarget, RunConfig, DEFAULT_ENDPOINT};
pub use engine::{HttpEngine, SpeechEngine};
pub use error::{
    BoxError,
    ClientError,
    ClientErrorDescription,
    ErrorDescription,
    ErrorKind,
    GenericError,
    OutOfRange,
    Stage,
};
pub use output::{PcmFormat, PlaybackDevice};
pub use pipeline::Synthesized;
pub use selection::Selection;
pub use types::{AccentPhrase, AudioQuery, Mora, Overrides, Speaker, Style};

/// Joins positional words into one input string.
pub fn join_text<S: AsRef<str>>(words: &[S]) -> String {
    words.iter().map(|w| w.as_ref()).collect::<Vec<_>>().join(" ")
}
