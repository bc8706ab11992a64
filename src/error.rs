
use std::error::Error;
use std::fmt::{self, Display, Debug};

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

pub trait ErrorDescription {
    fn description(&self) -> impl Display;
    fn code(&self) -> Option<i32> {
        None
    }
    fn error_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl<T> ErrorDescription for T
where
    T: Display,
{
    fn description(&self) -> impl Display {
        self
    }
}

pub struct GenericError<T>(pub T) where T: ErrorDescription;

impl<T> GenericError<T>
where
    T: ErrorDescription,
{
    pub const fn new(err: T) -> Self {
        Self(err)
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn as_inner(&self) -> &T {
        &self.0
    }

    pub fn error_name(&self) -> &'static str {
        self.0.error_name()
    }

    pub fn code(&self) -> Option<i32> {
        self.0.code()
    }
}

impl<T> Debug for GenericError<T>
where
    T: ErrorDescription,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(code) = self.0.code() {
            write!(f, "GenericError({}): {} ({})", self.error_name(), self.0.description(), code)
        } else {
            write!(f, "GenericError({}): {}", self.error_name(), self.0.description())
        }
    }
}

impl<T> Display for GenericError<T>
where
    T: ErrorDescription,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.description())
    }
}

impl<T> Error for GenericError<T>
where
    T: ErrorDescription,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

impl<T> From<T> for GenericError<T>
where
    T: ErrorDescription,
{
    fn from(err: T) -> Self {
        Self::new(err)
    }
}

/// Pipeline step an error was raised in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Building the HTTP client before any request is made.
    Setup,
    /// Reading the text to speak.
    Input,
    Speakers,
    Selection,
    AudioQuery,
    Synthesis,
    Output,
    Playback,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Input => "input",
            Self::Speakers => "speakers",
            Self::Selection => "selection",
            Self::AudioQuery => "audio_query",
            Self::Synthesis => "synthesis",
            Self::Output => "output",
            Self::Playback => "playback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Decode,
    Serialization,
    OutOfRange,
    Io,
    PlaybackInit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutOfRange {
    Speaker { index: usize, available: usize },
    Style { speaker: String, index: usize, available: usize },
}

#[non_exhaustive]
#[derive(Debug)]
pub enum ClientErrorDescription {
    Transport { stage: Stage, source: reqwest::Error },
    Decode { stage: Stage, source: BoxError },
    Serialization { stage: Stage, source: serde_json::Error },
    OutOfRange(OutOfRange),
    Io { stage: Stage, source: std::io::Error },
    PlaybackInit { source: BoxError },
}

impl ClientErrorDescription {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::OutOfRange(_) => ErrorKind::OutOfRange,
            Self::Io { .. } => ErrorKind::Io,
            Self::PlaybackInit { .. } => ErrorKind::PlaybackInit,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Transport { stage, .. }
            | Self::Decode { stage, .. }
            | Self::Serialization { stage, .. }
            | Self::Io { stage, .. } => *stage,
            Self::OutOfRange(_) => Stage::Selection,
            Self::PlaybackInit { .. } => Stage::Playback,
        }
    }
}

impl ErrorDescription for ClientErrorDescription {
    #[allow(refining_impl_trait)]
    fn description(&self) -> String {
        let stage = self.stage();
        match self {
            Self::Transport { source, .. } => {
                if let Some(status) = source.status() {
                    format!("{}: engine responded with {}", stage, status)
                } else {
                    format!("{}: engine unreachable: {}", stage, source)
                }
            },
            Self::Decode { source, .. } => format!("{}: malformed response: {}", stage, source),
            Self::Serialization { source, .. } => format!("{}: failed to encode request: {}", stage, source),
            Self::OutOfRange(OutOfRange::Speaker { index, available }) => {
                format!("{}: speaker not found (index {}, {} available)", stage, index, available)
            },
            Self::OutOfRange(OutOfRange::Style { speaker, index, available }) => {
                format!("{}: style not found (index {} of speaker {}, {} available)", stage, index, speaker, available)
            },
            Self::Io { source, .. } => format!("{}: {}", stage, source),
            Self::PlaybackInit { source } => format!("{}: audio device unavailable: {}", stage, source),
        }
    }

    fn code(&self) -> Option<i32> {
        let code = match self.kind() {
            ErrorKind::OutOfRange => 2,
            ErrorKind::Transport => 3,
            ErrorKind::Decode => 4,
            ErrorKind::Serialization => 5,
            ErrorKind::Io => 6,
            ErrorKind::PlaybackInit => 7,
        };
        Some(code)
    }

    fn error_name(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Transport => "TransportError",
            ErrorKind::Decode => "DecodeError",
            ErrorKind::Serialization => "SerializationError",
            ErrorKind::OutOfRange => "OutOfRangeError",
            ErrorKind::Io => "IOError",
            ErrorKind::PlaybackInit => "PlaybackInitError",
        }
    }

    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::Decode { source, .. } => Some(source.as_ref()),
            Self::Serialization { source, .. } => Some(source),
            Self::OutOfRange(_) => None,
            Self::Io { source, .. } => Some(source),
            Self::PlaybackInit { source } => Some(source.as_ref()),
        }
    }
}

pub type ClientError = GenericError<ClientErrorDescription>;

impl GenericError<ClientErrorDescription> {
    pub fn transport(stage: Stage, source: reqwest::Error) -> Self {
        Self::new(ClientErrorDescription::Transport { stage, source })
    }

    pub fn decode<E: Into<BoxError>>(stage: Stage, source: E) -> Self {
        Self::new(ClientErrorDescription::Decode { stage, source: source.into() })
    }

    pub fn serialization(stage: Stage, source: serde_json::Error) -> Self {
        Self::new(ClientErrorDescription::Serialization { stage, source })
    }

    pub fn io(stage: Stage, source: std::io::Error) -> Self {
        Self::new(ClientErrorDescription::Io { stage, source })
    }

    pub fn playback_init<E: Into<BoxError>>(source: E) -> Self {
        Self::new(ClientErrorDescription::PlaybackInit { source: source.into() })
    }

    pub fn kind(&self) -> ErrorKind {
        self.0.kind()
    }

    pub fn stage(&self) -> Stage {
        self.0.stage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_is_reported_as_selection_error() {
        let err = ClientError::new(ClientErrorDescription::OutOfRange(OutOfRange::Speaker { index: 3, available: 1 }));
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(err.stage(), Stage::Selection);
        assert_eq!(err.code(), Some(2));
        assert_eq!(err.error_name(), "OutOfRangeError");
        assert!(err.to_string().contains("speaker not found"));
        assert!(Error::source(&err).is_none());
    }

    #[test]
    fn io_error_keeps_stage_and_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ClientError::io(Stage::Output, cause);
        assert_eq!(err.to_string(), "output: denied");
        assert_eq!(err.code(), Some(6));
        assert!(Error::source(&err).is_some());
    }

    #[test]
    fn stages_render_as_snake_case() {
        assert_eq!(Stage::Setup.to_string(), "setup");
        assert_eq!(Stage::Input.to_string(), "input");
        assert_eq!(Stage::AudioQuery.to_string(), "audio_query");
        let err = ClientError::io(Stage::Input, std::io::Error::other("stdin closed"));
        assert_eq!(err.to_string(), "input: stdin closed");
    }

    #[test]
    fn kinds_have_distinct_exit_codes() {
        let errors = vec![
            ClientError::decode(Stage::Speakers, "bad"),
            ClientError::io(Stage::Output, std::io::Error::other("x")),
            ClientError::playback_init("no device"),
            ClientError::new(ClientErrorDescription::OutOfRange(OutOfRange::Style { speaker: "A".into(), index: 1, available: 1 })),
        ];
        let mut codes = errors.iter().filter_map(|e| e.code()).collect::<Vec<_>>();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|c| *c != 0));
    }
}
