use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::{CustomerRecord, SubmissionOutcome, SubmitRequest};
use crate::session::SessionContext;
use crate::wallets::WalletProvider;
use async_trait::async_trait;
use std::sync::Arc;

/// Which backend shape an adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// Internal ledger API: customer lookup, then with-status submission
    Ledger,
    /// External voucher-redemption API: direct submission, no lookup
    Voucher,
}

/// Capability interface the transaction flow dispatches through.
///
/// Adapters are stateless request/response shims. They never retry and
/// they normalize every response into [`SubmissionOutcome`] so the flow
/// branches on one shape only. Transport failures and non-2xx replies
/// without a usable outcome surface as [`PaymentError`].
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    /// Resolve the customer behind a normalized MSISDN.
    async fn lookup_customer(&self, msisdn: &str) -> PaymentResult<CustomerRecord> {
        let _ = msisdn;
        Err(PaymentError::Unsupported {
            message: "customer lookup is not available for this wallet".to_string(),
        })
    }

    async fn submit(&self, request: SubmitRequest) -> PaymentResult<SubmissionOutcome>;
}

/// Resolves the adapter serving a wallet for one authenticated session.
pub trait AdapterSource: Send + Sync {
    fn adapter_for(
        &self,
        wallet: &WalletProvider,
        session: &SessionContext,
    ) -> PaymentResult<Arc<dyn ProviderAdapter>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::{CompletedTransaction, Direction};
    use crate::wallets::AuthMethod;

    struct MockVoucher;

    #[async_trait]
    impl ProviderAdapter for MockVoucher {
        fn kind(&self) -> AdapterKind {
            AdapterKind::Voucher
        }

        async fn submit(&self, request: SubmitRequest) -> PaymentResult<SubmissionOutcome> {
            Ok(SubmissionOutcome::Completed(CompletedTransaction {
                transaction_id: Some("mock_ref".to_string()),
                balance_after: None,
                amount_settled: Some(request.amount),
                advisory_reason: None,
            }))
        }
    }

    #[tokio::test]
    async fn default_lookup_is_unsupported() {
        let adapter: Box<dyn ProviderAdapter> = Box::new(MockVoucher);
        let err = adapter.lookup_customer("26876123456").await.unwrap_err();
        assert!(matches!(err, PaymentError::Unsupported { .. }));

        let outcome = adapter
            .submit(SubmitRequest {
                direction: Direction::CashIn,
                wallet_id: "UNAYO".to_string(),
                method: AuthMethod::Voucher,
                msisdn: None,
                voucher_number: Some("V1".to_string()),
                amount: 10.0,
                pin: None,
                otp: None,
                description: "test".to_string(),
                reference: "ref-1".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Completed(_)));
    }
}
