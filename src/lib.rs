//! Core of the agent-facing CICO (cash-in / cash-out) portal.
//!
//! The crate exposes the transaction flow an agent walks through for each
//! customer, the two backend adapters it dispatches to, the session it
//! charges balances against and the ledger of decline reasons. Rendering is
//! left to the embedder, which reads [`flow::FlowSnapshot`]s.

pub mod config;
pub mod error;
pub mod flow;
pub mod logging;
pub mod payments;
pub mod portal;
pub mod reasons;
pub mod services;
pub mod session;
pub mod storage;
pub mod wallets;

pub use config::PortalConfig;
pub use error::{ErrorCode, PortalError, PortalResult};
pub use flow::{Direction, FlowContext, FlowError, FlowState, TransactionFlow};
pub use portal::Portal;
pub use reasons::FailureReasonLedger;
pub use session::{Agent, SessionContext, SessionStore};
pub use wallets::{AuthMethod, WalletProvider, WalletRegistry};
