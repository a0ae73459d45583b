//! Caller-visible login flow state.

use crate::error::{ErrorKind, OAuth2Error};
use serde::{Deserialize, Serialize};

/// Where a single login round trip stands.
///
/// `Initiated -> AwaitingCallback -> CodeReceived -> TokenExchanged ->
/// ProfileFetched`, with `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Initiated,
    AwaitingCallback,
    CodeReceived,
    TokenExchanged,
    ProfileFetched,
    Failed(ErrorKind),
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::ProfileFetched | FlowState::Failed(_))
    }

    /// Next state on success. Terminal states have no successor.
    pub fn advance(self) -> Option<FlowState> {
        match self {
            FlowState::Initiated => Some(FlowState::AwaitingCallback),
            FlowState::AwaitingCallback => Some(FlowState::CodeReceived),
            FlowState::CodeReceived => Some(FlowState::TokenExchanged),
            FlowState::TokenExchanged => Some(FlowState::ProfileFetched),
            FlowState::ProfileFetched | FlowState::Failed(_) => None,
        }
    }

    /// Absorb a failure. A state that already failed keeps its first cause.
    pub fn fail(self, kind: ErrorKind) -> FlowState {
        match self {
            FlowState::Failed(first) => FlowState::Failed(first),
            _ => FlowState::Failed(kind),
        }
    }

    /// Fold an operation outcome into the state.
    pub fn record<T>(self, outcome: &Result<T, OAuth2Error>) -> FlowState {
        match outcome {
            Ok(_) => self.advance().unwrap_or(self),
            Err(err) => self.fail(err.kind()),
        }
    }
}

/// Serializable label, handy for storing the state next to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    Initiated,
    AwaitingCallback,
    CodeReceived,
    TokenExchanged,
    ProfileFetched,
    Failed,
}

impl From<FlowState> for FlowStage {
    fn from(state: FlowState) -> Self {
        match state {
            FlowState::Initiated => FlowStage::Initiated,
            FlowState::AwaitingCallback => FlowStage::AwaitingCallback,
            FlowState::CodeReceived => FlowStage::CodeReceived,
            FlowState::TokenExchanged => FlowStage::TokenExchanged,
            FlowState::ProfileFetched => FlowStage::ProfileFetched,
            FlowState::Failed(_) => FlowStage::Failed,
        }
    }
}
