pub mod ai;
pub mod config;
pub mod format;
pub mod request;
pub mod session;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use ai::{CompletionBackend, CompletionClient, CompletionError, GeminiBackend, Reply};
pub use config::{Config, ConfigError, FailurePolicy};
pub use format::{format, FormattedText, Node, OrderedItem};
pub use request::{build_contents, build_request, GenerateRequest, WireContent, WirePart, WireRole};
pub use session::{
    Completion, Diagnostic, PendingRequest, Phase, Resolution, SessionController, SessionState, SubmitError,
};
pub use state::{ChatRole, Turn, TurnId, TurnKind, THINKING_SENTINEL};
pub use store::ConversationStore;
