//! Backend adapters
//!
//! Two backends sit behind [`ProviderAdapter`]: the ledger-backed CICO API
//! (customer lookup, then a with-status submission) and the external
//! voucher-redemption API.

pub mod error;
pub mod factory;
pub mod provider;
pub mod providers;
pub mod types;
pub mod utils;

pub use error::{PaymentError, PaymentResult};
pub use factory::AdapterFactory;
pub use provider::{AdapterKind, AdapterSource, ProviderAdapter};
pub use providers::{LedgerAdapter, VoucherAdapter};
pub use types::{
    CompletedTransaction, CustomerRecord, Direction, SubmissionOutcome, SubmitRequest,
};
pub use utils::PortalHttpClient;
