use async_trait::async_trait;

use crate::domain::{ScriptError, ScriptRequest};

/// Port for the external text-generation service.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Submit the prompt and return the raw generated text.
    ///
    /// A missing credential must surface as [`ScriptError::MissingCredential`];
    /// everything else as [`ScriptError::Service`].
    async fn generate(&self, request: &ScriptRequest) -> Result<String, ScriptError>;

    /// Backend name for display.
    fn name(&self) -> &str;
}
