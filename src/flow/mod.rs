//! Agent-assisted cash-in / cash-out flow
//!
//! ```text
//! enter -> [select_method] -> edit draft -> lookup -> confirm -> complete
//!                                        \-> submit (voucher, no KYC) -/
//! ```

pub mod draft;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod state;

pub use crate::payments::Direction;
pub use draft::{normalize_msisdn, parse_amount, TransactionDraft, ValidatedDraft};
pub use error::{FlowError, FlowResult};
pub use orchestrator::{FlowContext, FlowSnapshot, TransactionFlow};
pub use outcome::{Notice, NoticeLevel, Receipt};
pub use state::FlowState;
