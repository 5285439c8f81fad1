use serde::{Deserialize, Serialize};

/// Position of a transaction flow.
///
/// ```text
/// method-selection -> data-entry -> kyc-confirmation -> processing -> complete
///                          |  ^            |                 |
///                          |  +------------+-----------------+  (back / failure)
///                          +------------------------------> processing  (direct path)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Waiting for the authorization method
    MethodSelection,
    /// Collecting phone or voucher number, amount, PIN
    DataEntry,
    /// Customer resolved, waiting for the agent to confirm
    KycConfirmation,
    /// One submission in flight; input is blocked
    Processing,
    /// Transaction accepted
    Complete,
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowState::MethodSelection => write!(f, "method_selection"),
            FlowState::DataEntry => write!(f, "data_entry"),
            FlowState::KycConfirmation => write!(f, "kyc_confirmation"),
            FlowState::Processing => write!(f, "processing"),
            FlowState::Complete => write!(f, "complete"),
        }
    }
}

impl FlowState {
    /// Forward and failure transitions. Reset is not listed: it is allowed
    /// from every state.
    pub fn valid_transitions(&self) -> Vec<FlowState> {
        match self {
            FlowState::MethodSelection => vec![FlowState::DataEntry],
            FlowState::DataEntry => vec![FlowState::KycConfirmation, FlowState::Processing],
            FlowState::KycConfirmation => vec![FlowState::Processing, FlowState::DataEntry],
            FlowState::Processing => vec![FlowState::Complete, FlowState::DataEntry],
            FlowState::Complete => vec![],
        }
    }

    pub fn can_transition_to(&self, next: FlowState) -> bool {
        self.valid_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Complete)
    }

    /// Whether draft fields may be edited.
    pub fn accepts_input(&self) -> bool {
        matches!(self, FlowState::DataEntry)
    }
}
