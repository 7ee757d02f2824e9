//! Collaborator endpoint configuration.

use serde::{Deserialize, Serialize};

/// Where the HTTP collaborators live. An unset URL makes that collaborator
/// fail permanently, which is enough for quiz-less deployments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollaboratorsConfig {
    #[serde(default)]
    pub narration_url: Option<String>,
    #[serde(default)]
    pub quiz_url: Option<String>,
    #[serde(default)]
    pub render_url: Option<String>,
    #[serde(default)]
    pub concat_url: Option<String>,
    /// Per-request HTTP timeout in seconds. Unset means wait until the
    /// collaborator answers.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}
