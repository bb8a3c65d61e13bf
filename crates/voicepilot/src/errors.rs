use std::time::Duration;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CommandError>;

/// Error types that can occur while resolving or executing a voice command.
///
/// Every external call in the pipeline (model request, page messaging, tab
/// queries) is wrapped so its failure degrades to one of these values; none
/// of them is allowed to escape the orchestrator as an unhandled fault.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Network or timeout failure while reaching the model endpoint
    #[error("AI transport error: {0}")]
    AiTransport(String),

    /// The model replied, but the body did not contain parseable JSON
    #[error("AI response was not valid JSON: {0}")]
    AiParse(String),

    /// Valid JSON with an `action` value outside the known vocabulary
    #[error("AI returned unrecognized action: {0}")]
    AiUnrecognizedAction(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The resolved element cannot perform the requested interaction
    #[error("Element is not {expected}: got <{actual}>")]
    ElementWrongType { expected: &'static str, actual: String },

    /// Ping and re-injection both failed (e.g. a restricted page)
    #[error("Content script unavailable: {0}")]
    ContentScriptUnavailable(String),

    #[error("Tab not found for target: {0}")]
    TabNotFound(String),

    #[error("No navigation target provided")]
    NavigationTargetMissing,

    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    /// The message channel to the page dropped mid-request
    #[error("Page channel closed: {0}")]
    ChannelClosed(String),

    #[error("Session is not listening")]
    NotListening,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
