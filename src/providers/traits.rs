use async_trait::async_trait;

/// What came back from one generation call.
///
/// A safety block and an empty reply are normal outcomes, not errors —
/// the dispatcher logs them and sends nothing. Transport and API failures
/// surface as `Err` from [`TextGenerator::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Usable text, guaranteed non-blank.
    Text(String),
    /// The service refused on content-policy grounds; payload is the reason.
    SafetyBlocked(String),
    /// The service answered but produced no usable text.
    Empty,
}

/// Generative-text seam — implement for any completion API.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable generator name
    fn name(&self) -> &str;

    /// Submit a prompt and interpret the response.
    async fn generate(&self, prompt: &str) -> anyhow::Result<GenerateOutcome>;

    /// Check if the generator is reachable and authenticated.
    async fn health_check(&self) -> bool {
        true
    }
}
