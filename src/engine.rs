
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Response;

use crate::error::{ClientError, Stage};
use crate::types::{AudioQuery, Speaker};

/// The three calls this client makes against a synthesis engine.
#[allow(async_fn_in_trait)]
pub trait SpeechEngine {
    async fn speakers(&self) -> Result<Vec<Speaker>, ClientError>;

    /// Unmodified query for `text` spoken with `style_id`.
    async fn audio_query(&self, style_id: u32, text: &str) -> Result<AudioQuery, ClientError>;

    /// Complete WAV container for `query`.
    async fn synthesis(&self, style_id: u32, query: &AudioQuery) -> Result<Vec<u8>, ClientError>;
}

/// Talks to a VOICEVOX-compatible engine over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpEngine {
    /// No timeout unless one is given; a stalled engine blocks the call.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ClientError::transport(Stage::Setup, e))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }
}

async fn check_status(resp: Response, stage: Stage) -> Result<Response, ClientError> {
    let status_error = resp.error_for_status_ref().err();
    if let Some(err) = status_error {
        let body = resp.text().await.unwrap_or_default();
        log::debug!("{} failed with body: {}", stage, body);
        return Err(ClientError::transport(stage, err));
    }
    Ok(resp)
}

async fn decode_json<T: serde::de::DeserializeOwned>(resp: Response, stage: Stage) -> Result<T, ClientError> {
    let resp = check_status(resp, stage).await?;
    let body = resp.bytes().await.map_err(|e| ClientError::transport(stage, e))?;
    log::debug!("{} returned {} bytes", stage, body.len());
    serde_json::from_slice(&body).map_err(|e| ClientError::decode(stage, e))
}

impl SpeechEngine for HttpEngine {
    async fn speakers(&self) -> Result<Vec<Speaker>, ClientError> {
        let stage = Stage::Speakers;
        let url = self.url("speakers");
        log::debug!("GET {}", url);

        let resp = self.http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::transport(stage, e))?;
        decode_json(resp, stage).await
    }

    async fn audio_query(&self, style_id: u32, text: &str) -> Result<AudioQuery, ClientError> {
        let stage = Stage::AudioQuery;
        let url = self.url("audio_query");
        log::debug!("POST {} (speaker={})", url, style_id);

        let resp = self.http_client
            .post(&url)
            .query(&[("speaker", style_id.to_string().as_str()), ("text", text)])
            .send()
            .await
            .map_err(|e| ClientError::transport(stage, e))?;
        decode_json(resp, stage).await
    }

    async fn synthesis(&self, style_id: u32, query: &AudioQuery) -> Result<Vec<u8>, ClientError> {
        let stage = Stage::Synthesis;
        let url = self.url("synthesis");
        let body = serde_json::to_vec(query).map_err(|e| ClientError::serialization(stage, e))?;
        log::debug!("POST {} (speaker={}) with {} byte query", url, style_id, body.len());

        let resp = self.http_client
            .post(&url)
            .query(&[("speaker", style_id)])
            .header(ACCEPT, "audio/wav")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::transport(stage, e))?;
        let resp = check_status(resp, stage).await?;

        let wav = resp
            .bytes()
            .await
            .map_err(|e| ClientError::io(stage, std::io::Error::other(e)))?;
        log::debug!("{} returned {} bytes", stage, wav.len());
        Ok(wav.to_vec())
    }
}
