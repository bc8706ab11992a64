
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::Overrides;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:50021";

/// Long flags that may be spelled with a single dash (`-speaker 1`).
const LONG_FLAGS: &[&str] = &[
    "endpoint",
    "speaker",
    "style",
    "speed",
    "intonation",
    "volume",
    "pitch",
    "timeout",
    "list-speakers",
    "json",
];

#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    File(PathBuf),
    Playback,
}

/// Resolved invocation parameters. Built once at startup and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    endpoint: String,
    speaker: usize,
    style: usize,
    overrides: Overrides,
    output: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, 0, 0, Overrides::default(), None)
    }
}

impl RunConfig {
    pub fn new(endpoint: &str, speaker: usize, style: usize, overrides: Overrides, output: Option<PathBuf>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            speaker,
            style,
            overrides,
            output: output.filter(|path| !path.as_os_str().is_empty()),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn speaker(&self) -> usize {
        self.speaker
    }

    pub fn style(&self) -> usize {
        self.style
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn output_target(&self) -> OutputTarget {
        match &self.output {
            Some(path) => OutputTarget::File(path.clone()),
            None => OutputTarget::Playback,
        }
    }
}

/// Rewrites `-name` / `-name=value` into `--name` / `--name=value` for the known long flags.
/// Everything after a bare `--` is left alone.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut passthrough = false;
    args.into_iter().map(|arg| {
        if passthrough {
            return arg;
        }
        let Some(s) = arg.to_str() else {
            return arg;
        };
        if s == "--" {
            passthrough = true;
            return arg;
        }
        match s.strip_prefix('-') {
            Some(rest) if !rest.starts_with('-') => {
                let name = rest.split('=').next().unwrap_or(rest);
                if LONG_FLAGS.contains(&name) {
                    OsString::from(format!("-{}", s))
                } else {
                    arg
                }
            },
            _ => arg,
        }
    }).collect()
}
