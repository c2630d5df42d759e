//! Session controller
//!
//! Owns the conversation and drives the submit → placeholder → request →
//! reconcile cycle. Front-ends talk to the session only through this type and
//! observe it through [`SessionState`] snapshots.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ai::{CompletionClient, CompletionError, Reply};
use crate::config::{Config, FailurePolicy};
use crate::request::{build_request, GenerateRequest};
use crate::state::{Turn, TurnId};
use crate::store::ConversationStore;

/// Shown to the user in place of an answer when a request fails.
pub const FAILURE_NOTICE: &str = "Sorry, I couldn't get a response right now. Please try again.";

/// How many failures are kept; older ones are dropped first.
pub const MAX_DIAGNOSTICS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingResponse { pending: TurnId },
}

/// Value snapshot of the session, published after every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub turns: Vec<Turn>,
}

impl SessionState {
    pub fn is_pending(&self, id: TurnId) -> bool {
        self.phase == Phase::AwaitingResponse { pending: id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("still waiting for the answer to turn {0}")]
    Busy(TurnId),
}

/// A request ready to be sent, tagged with the placeholder it will resolve.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub turn_id: TurnId,
    pub request: GenerateRequest,
}

/// Outcome of one request, tagged with its placeholder.
#[derive(Debug)]
pub struct Completion {
    pub turn_id: TurnId,
    pub result: Result<Reply, CompletionError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Answered(TurnId),
    Failed { turn_id: TurnId, error: String },
    /// The completion no longer matches the pending turn and was dropped.
    Stale(TurnId),
}

/// A failed request, kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub turn_id: TurnId,
    pub message: String,
    pub at: DateTime<Local>,
}

pub struct SessionController {
    store: ConversationStore,
    phase: Phase,
    client: CompletionClient,
    persona: String,
    failure_policy: FailurePolicy,
    diagnostics: VecDeque<Diagnostic>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionController {
    pub fn new(client: CompletionClient, persona: impl Into<String>, failure_policy: FailurePolicy) -> Self {
        let (state_tx, _) = watch::channel(SessionState {
            phase: Phase::Idle,
            turns: Vec::new(),
        });
        Self {
            store: ConversationStore::new(),
            phase: Phase::Idle,
            client,
            persona: persona.into(),
            failure_policy,
            diagnostics: VecDeque::with_capacity(MAX_DIAGNOSTICS),
            state_tx,
        }
    }

    pub fn with_config(client: CompletionClient, config: &Config) -> Self {
        Self::new(client, config.persona(), config.failure_policy)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.phase, Phase::AwaitingResponse { .. })
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.store.iter()
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            phase: self.phase,
            turns: self.store.snapshot(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// The most recent failures, oldest first.
    pub fn diagnostics(&self) -> &VecDeque<Diagnostic> {
        &self.diagnostics
    }

    /// Record the user's message and a placeholder, and build the request.
    pub fn submit(&mut self, text: &str) -> Result<PendingRequest, SubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyMessage);
        }
        if let Phase::AwaitingResponse { pending } = self.phase {
            tracing::warn!(%pending, "submit rejected while a request is outstanding");
            return Err(SubmitError::Busy(pending));
        }

        self.store.append(Turn::user(text));

        let history: Vec<Turn> = self
            .store
            .iter()
            .filter(|t| t.is_transmittable())
            .cloned()
            .collect();
        let request = build_request(&history, &self.persona);

        let turn_id = self.store.append(Turn::placeholder());
        self.phase = Phase::AwaitingResponse { pending: turn_id };
        tracing::info!(%turn_id, history = history.len(), "awaiting response");
        self.publish();

        Ok(PendingRequest { turn_id, request })
    }

    /// Run the request on a background task.
    pub fn dispatch(&self, pending: PendingRequest) -> JoinHandle<Completion> {
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client.send_request(&pending.request).await;
            Completion {
                turn_id: pending.turn_id,
                result,
            }
        })
    }

    /// Reconcile a finished request with the conversation.
    pub fn resolve(&mut self, completion: Completion) -> Resolution {
        let Completion { turn_id, result } = completion;

        if self.phase != (Phase::AwaitingResponse { pending: turn_id }) {
            tracing::warn!(%turn_id, "dropping completion for a turn that is no longer pending");
            return Resolution::Stale(turn_id);
        }

        match result {
            Ok(reply) => {
                self.store
                    .replace_last(|t| t.id == turn_id, Turn::assistant(reply.text, reply.formatted));
                self.phase = Phase::Idle;
                tracing::info!(%turn_id, "response received");
                self.publish();
                Resolution::Answered(turn_id)
            }
            Err(error) => self.fail(turn_id, error.to_string()),
        }
    }

    /// Give up on the outstanding request, e.g. when its task died.
    pub fn abandon(&mut self, reason: &str) -> Option<Resolution> {
        match self.phase {
            Phase::AwaitingResponse { pending } => Some(self.fail(pending, reason.to_string())),
            Phase::Idle => None,
        }
    }

    /// Submit, wait for the endpoint, and resolve in one go.
    pub async fn ask(&mut self, text: &str) -> Result<Resolution, SubmitError> {
        let pending = self.submit(text)?;
        let result = self.client.send_request(&pending.request).await;
        Ok(self.resolve(Completion {
            turn_id: pending.turn_id,
            result,
        }))
    }

    /// Start a new conversation. Any outstanding completion becomes stale.
    pub fn reset(&mut self) {
        self.store.clear();
        self.phase = Phase::Idle;
        self.publish();
    }

    fn fail(&mut self, turn_id: TurnId, message: String) -> Resolution {
        tracing::warn!(%turn_id, error = %message, "no response obtained");
        if self.diagnostics.len() == MAX_DIAGNOSTICS {
            self.diagnostics.pop_front();
        }
        self.diagnostics.push_back(Diagnostic {
            turn_id,
            message: message.clone(),
            at: Local::now(),
        });

        match self.failure_policy {
            FailurePolicy::ReplaceWithNotice => {
                self.store
                    .replace_last(|t| t.id == turn_id, Turn::notice(FAILURE_NOTICE));
            }
            FailurePolicy::RemovePlaceholder => {
                self.store.remove_last(|t| t.id == turn_id);
            }
            FailurePolicy::KeepPlaceholder => {}
        }

        self.phase = Phase::Idle;
        self.publish();
        Resolution::Failed {
            turn_id,
            error: message,
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state());
    }
}
