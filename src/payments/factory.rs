use crate::config::{LedgerApiConfig, PortalConfig, VoucherApiConfig};
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::{AdapterSource, ProviderAdapter};
use crate::payments::providers::{LedgerAdapter, VoucherAdapter};
use crate::session::SessionContext;
use crate::wallets::{AuthMethod, WalletProvider};
use std::sync::Arc;

/// Picks the backend adapter for a wallet.
///
/// Wallets that require KYC go through the ledger API; everything else is
/// redeemed directly against the voucher API, which only knows vouchers.
/// Whether the chosen method fits the path is checked by the flow.
#[derive(Debug, Clone)]
pub struct AdapterFactory {
    ledger: LedgerApiConfig,
    voucher: VoucherApiConfig,
}

impl AdapterFactory {
    pub fn new(ledger: LedgerApiConfig, voucher: VoucherApiConfig) -> Self {
        Self { ledger, voucher }
    }

    pub fn from_config(config: &PortalConfig) -> Self {
        Self::new(config.ledger_api.clone(), config.voucher_api.clone())
    }
}

impl AdapterSource for AdapterFactory {
    fn adapter_for(
        &self,
        wallet: &WalletProvider,
        session: &SessionContext,
    ) -> PaymentResult<Arc<dyn ProviderAdapter>> {
        if wallet.requires_kyc {
            return Ok(Arc::new(LedgerAdapter::new(
                self.ledger.clone(),
                session.token(),
            )?));
        }

        if !wallet.supports(AuthMethod::Voucher) {
            return Err(PaymentError::Unsupported {
                message: format!(
                    "{} is not available without customer lookup",
                    wallet.name
                ),
            });
        }

        Ok(Arc::new(VoucherAdapter::new(self.voucher.clone())?))
    }
}
