//! JSON-over-HTTP collaborator client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::{
    ClipConcatenator, CollaboratorError, CollaboratorsConfig, Difficulty, NarrationGenerator,
    Question, QuizGenerator, RenderOutput, StyleConfig, UnitRenderer,
};
use crate::document::UnitContent;

/// Talks to all four collaborators by POSTing JSON to their configured URLs.
pub struct HttpCollaborators {
    client: reqwest::Client,
    config: CollaboratorsConfig,
}

impl HttpCollaborators {
    pub fn new(config: CollaboratorsConfig) -> Result<Self, CollaboratorError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| CollaboratorError::permanent(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn post<Req, Resp>(&self, url: Option<&str>, body: &Req) -> Result<Resp, CollaboratorError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = url.ok_or_else(|| CollaboratorError::permanent("not configured"))?;
        debug!(url = %url, "Calling collaborator");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            return Err(classify_status(status, message));
        }

        response
            .json()
            .await
            .map_err(|e| CollaboratorError::permanent(format!("undecodable response: {e}")))
    }

    fn map_transport_error(&self, err: reqwest::Error) -> CollaboratorError {
        if err.is_timeout() {
            CollaboratorError::Timeout(self.config.request_timeout_secs.unwrap_or_default() * 1000)
        } else {
            CollaboratorError::transient(err.to_string())
        }
    }
}

/// 408, 429 and 5xx are retryable; everything else is the request's fault.
fn classify_status(status: u16, message: String) -> CollaboratorError {
    let message = format!("HTTP {status}: {message}");
    match status {
        408 | 429 | 500..=599 => CollaboratorError::Transient(message),
        _ => CollaboratorError::Permanent(message),
    }
}

#[derive(Debug, Serialize)]
struct NarrationRequest<'a> {
    unit: &'a UnitContent,
    language: &'a str,
    style: &'a StyleConfig,
}

#[derive(Debug, Deserialize)]
struct NarrationResponse {
    narration: String,
}

#[derive(Debug, Serialize)]
struct QuizRequest<'a> {
    unit: &'a UnitContent,
    narration: &'a str,
    tiers: &'a [Difficulty],
}

#[derive(Debug, Deserialize)]
struct QuizResponse {
    questions: Vec<Question>,
}

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    unit: &'a UnitContent,
    narration: &'a str,
}

#[derive(Debug, Serialize)]
struct ConcatRequest<'a> {
    clips: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ConcatResponse {
    artifact: String,
}

#[async_trait]
impl NarrationGenerator for HttpCollaborators {
    fn name(&self) -> &str {
        "http-narration"
    }

    async fn generate_narration(
        &self,
        unit: &UnitContent,
        language: &str,
        style: &StyleConfig,
    ) -> Result<String, CollaboratorError> {
        let response: NarrationResponse = self
            .post(
                self.config.narration_url.as_deref(),
                &NarrationRequest {
                    unit,
                    language,
                    style,
                },
            )
            .await?;
        Ok(response.narration)
    }
}

#[async_trait]
impl QuizGenerator for HttpCollaborators {
    fn name(&self) -> &str {
        "http-quiz"
    }

    async fn generate_quiz(
        &self,
        unit: &UnitContent,
        narration: &str,
        tiers: &[Difficulty],
    ) -> Result<Vec<Question>, CollaboratorError> {
        let response: QuizResponse = self
            .post(
                self.config.quiz_url.as_deref(),
                &QuizRequest {
                    unit,
                    narration,
                    tiers,
                },
            )
            .await?;
        Ok(response.questions)
    }
}

#[async_trait]
impl UnitRenderer for HttpCollaborators {
    fn name(&self) -> &str {
        "http-render"
    }

    async fn render_unit(
        &self,
        unit: &UnitContent,
        narration: &str,
    ) -> Result<RenderOutput, CollaboratorError> {
        self.post(
            self.config.render_url.as_deref(),
            &RenderRequest { unit, narration },
        )
        .await
    }
}

#[async_trait]
impl ClipConcatenator for HttpCollaborators {
    fn name(&self) -> &str {
        "http-concat"
    }

    async fn concatenate(&self, clips: &[String]) -> Result<String, CollaboratorError> {
        let response: ConcatResponse = self
            .post(self.config.concat_url.as_deref(), &ConcatRequest { clips })
            .await?;
        Ok(response.artifact)
    }

    /// Rendering and concatenation both need an endpoint before a video job
    /// can start.
    async fn validate(&self) -> Result<(), CollaboratorError> {
        if self.config.render_url.is_none() {
            return Err(CollaboratorError::permanent("render collaborator not configured"));
        }
        if self.config.concat_url.is_none() {
            return Err(CollaboratorError::permanent("concat collaborator not configured"));
        }
        Ok(())
    }
}
