use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use crate::domain::config::ScriptConfig;
use crate::domain::{DomainError, ScriptError, ScriptRequest};
use crate::ports::{HttpClient, ScriptGenerator};

/// API credential, wiped from memory on drop.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key; blank values count as absent.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key.trim().to_string()))
        }
    }

    /// Read the key from an environment variable.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var).ok().and_then(Self::new)
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(..)")
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: String,
}

/// Script generator backed by the Gemini `generateContent` API.
pub struct GeminiScriptGenerator<H: HttpClient> {
    http: H,
    endpoint: String,
    model: String,
    api_key_env: String,
    api_key: Option<ApiKey>,
}

impl<H: HttpClient> GeminiScriptGenerator<H> {
    /// Build a generator, reading the key from the configured environment variable.
    pub fn from_env(http: H, config: &ScriptConfig) -> Self {
        let api_key = ApiKey::from_env(&config.api_key_env);
        Self::new(http, config, api_key)
    }

    pub fn new(http: H, config: &ScriptConfig, api_key: Option<ApiKey>) -> Self {
        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl<H: HttpClient> ScriptGenerator for GeminiScriptGenerator<H> {
    async fn generate(&self, request: &ScriptRequest) -> Result<String, ScriptError> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            ScriptError::MissingCredential(format!(
                "No API key configured. Set the {} environment variable and restart to enable script generation.",
                self.api_key_env
            ))
        })?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
        };

        debug!(model = %self.model, chars = request.prompt.len(), "Submitting prompt");
        let response: GenerateContentResponse = self
            .http
            .post_json(&self.url(), &[("x-goog-api-key", key.expose())], &body)
            .await
            .map_err(|e| match e {
                DomainError::NetworkBlocked { reason } => ScriptError::Service(reason),
                DomainError::HttpRequest(message) => ScriptError::Service(message),
                other => ScriptError::Service(other.to_string()),
            })?;

        // Candidates are alternatives; a single reply may span several parts.
        let text: String = response
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ScriptError::Service("Service returned no text".to_string()));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
