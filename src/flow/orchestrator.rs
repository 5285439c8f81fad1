//! Transaction Orchestrator
//!
//! One state machine serves both directions. The flow owns the draft, the
//! resolved customer and the completion artifacts; the agent balance lives in
//! the [`SessionContext`] and is touched only after an accepted result.
//!
//! At most one network call is in flight per flow. Every call captures the
//! draft generation first and its result is applied only if the flow has not
//! been reset or moved on in the meantime.

use crate::config::MsisdnConfig;
use crate::flow::draft::{TransactionDraft, ValidatedDraft};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::outcome::{Notice, Receipt};
use crate::flow::state::FlowState;
use crate::logging::mask_msisdn;
use crate::payments::{
    AdapterSource, CustomerRecord, Direction, PaymentResult, ProviderAdapter, SubmissionOutcome,
    SubmitRequest,
};
use crate::reasons::FailureReasonLedger;
use crate::session::{BalanceUpdate, SessionContext};
use crate::wallets::{AuthMethod, WalletProvider, WalletRegistry};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Collaborators a flow is built from.
#[derive(Clone)]
pub struct FlowContext {
    pub session: SessionContext,
    pub adapters: Arc<dyn AdapterSource>,
    pub reasons: FailureReasonLedger,
    pub msisdn: MsisdnConfig,
}

struct FlowCore {
    flow_id: Uuid,
    direction: Direction,
    wallet: WalletProvider,
    adapter: Arc<dyn ProviderAdapter>,
    session: SessionContext,
    reasons: FailureReasonLedger,
    msisdn: MsisdnConfig,
}

struct FlowInner {
    state: FlowState,
    method: Option<AuthMethod>,
    draft: TransactionDraft,
    customer: Option<CustomerRecord>,
    receipt: Option<Receipt>,
    notice: Option<Notice>,
    generation: u64,
    lookup_in_flight: bool,
}

/// Read-only view for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub flow_id: Uuid,
    pub direction: Direction,
    pub wallet_id: String,
    pub state: FlowState,
    pub method: Option<AuthMethod>,
    pub draft: TransactionDraft,
    pub customer: Option<CustomerRecord>,
    pub receipt: Option<Receipt>,
    pub notice: Option<Notice>,
}

/// Cloneable handle to one cash-in or cash-out flow.
#[derive(Clone)]
pub struct TransactionFlow {
    core: Arc<FlowCore>,
    inner: Arc<Mutex<FlowInner>>,
}

fn initial_state(method: Option<AuthMethod>) -> FlowState {
    match method {
        Some(_) => FlowState::DataEntry,
        None => FlowState::MethodSelection,
    }
}

impl TransactionFlow {
    /// Start a flow for the wallet named by `wallet_id`.
    ///
    /// Fails with [`FlowError::MissingWallet`] when nothing resolves; the
    /// caller is expected to send the agent back to wallet selection.
    pub fn enter(
        registry: &WalletRegistry,
        wallet_id: Option<&str>,
        direction: Direction,
        ctx: FlowContext,
    ) -> FlowResult<Self> {
        let wallet = wallet_id
            .and_then(|id| registry.get(id))
            .cloned()
            .ok_or_else(|| {
                warn!(requested = ?wallet_id, "no wallet resolved for transaction flow");
                FlowError::MissingWallet {
                    requested: wallet_id.map(str::to_string),
                }
            })?;

        let adapter = ctx
            .adapters
            .adapter_for(&wallet, &ctx.session)
            .map_err(|e| {
                warn!(wallet = %wallet.id, error = %e, "no adapter available for wallet");
                FlowError::from(e)
            })?;

        let method = wallet.sole_method();
        let state = initial_state(method);
        let flow_id = Uuid::new_v4();

        info!(
            flow_id = %flow_id,
            direction = %direction,
            wallet = %wallet.id,
            state = %state,
            "transaction flow entered"
        );

        Ok(Self {
            core: Arc::new(FlowCore {
                flow_id,
                direction,
                wallet,
                adapter,
                session: ctx.session,
                reasons: ctx.reasons,
                msisdn: ctx.msisdn,
            }),
            inner: Arc::new(Mutex::new(FlowInner {
                state,
                method,
                draft: TransactionDraft::default(),
                customer: None,
                receipt: None,
                notice: None,
                generation: 0,
                lookup_in_flight: false,
            })),
        })
    }

    pub fn flow_id(&self) -> Uuid {
        self.core.flow_id
    }

    pub fn direction(&self) -> Direction {
        self.core.direction
    }

    pub fn wallet(&self) -> &WalletProvider {
        &self.core.wallet
    }

    pub async fn state(&self) -> FlowState {
        self.inner.lock().await.state
    }

    pub async fn method(&self) -> Option<AuthMethod> {
        self.inner.lock().await.method
    }

    pub async fn draft(&self) -> TransactionDraft {
        self.inner.lock().await.draft.clone()
    }

    pub async fn customer(&self) -> Option<CustomerRecord> {
        self.inner.lock().await.customer.clone()
    }

    pub async fn receipt(&self) -> Option<Receipt> {
        self.inner.lock().await.receipt.clone()
    }

    pub async fn notice(&self) -> Option<Notice> {
        self.inner.lock().await.notice.clone()
    }

    pub async fn dismiss_notice(&self) {
        self.inner.lock().await.notice = None;
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        let inner = self.inner.lock().await;
        FlowSnapshot {
            flow_id: self.core.flow_id,
            direction: self.core.direction,
            wallet_id: self.core.wallet.id.clone(),
            state: inner.state,
            method: inner.method,
            draft: inner.draft.clone(),
            customer: inner.customer.clone(),
            receipt: inner.receipt.clone(),
            notice: inner.notice.clone(),
        }
    }

    // =========================================================================
    // Method selection and draft input
    // =========================================================================

    pub async fn select_method(&self, method: AuthMethod) -> FlowResult<FlowState> {
        let mut inner = self.inner.lock().await;
        Self::ensure_state(&inner, FlowState::MethodSelection, "select_method")?;

        let wallet = &self.core.wallet;
        if !wallet.supports(method) {
            return self.fail(
                &mut inner,
                FlowError::validation(
                    format!("{} does not offer {} transactions", wallet.name, method),
                    "method",
                ),
            );
        }
        if !wallet.requires_kyc && method != AuthMethod::Voucher {
            return self.fail(&mut inner, self.unsupported_method(method));
        }

        inner.method = Some(method);
        self.transition(&mut inner, FlowState::DataEntry)?;
        Ok(inner.state)
    }

    pub async fn set_phone(&self, value: impl Into<String>) -> FlowResult<()> {
        let value = value.into();
        self.edit("set_phone", move |draft| draft.phone = value).await
    }

    pub async fn set_voucher_number(&self, value: impl Into<String>) -> FlowResult<()> {
        let value = value.into();
        self.edit("set_voucher_number", move |draft| draft.voucher_number = value)
            .await
    }

    pub async fn set_amount(&self, value: impl Into<String>) -> FlowResult<()> {
        let value = value.into();
        self.edit("set_amount", move |draft| draft.amount = value).await
    }

    /// Fill the amount from the wallet's preset list.
    pub async fn apply_quick_amount(&self, index: usize) -> FlowResult<f64> {
        let amount = self
            .core
            .wallet
            .quick_amounts
            .get(index)
            .copied()
            .ok_or_else(|| FlowError::validation("Unknown quick amount", "amount"))?;
        self.edit("apply_quick_amount", move |draft| {
            draft.amount = format!("{:.2}", amount)
        })
        .await?;
        Ok(amount)
    }

    pub async fn set_pin(&self, value: impl Into<String>) -> FlowResult<()> {
        let value = value.into();
        self.edit("set_pin", move |draft| draft.pin = value).await
    }

    pub async fn set_otp(&self, value: impl Into<String>) -> FlowResult<()> {
        let value = value.into();
        self.edit("set_otp", move |draft| draft.otp = value).await
    }

    async fn edit(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut TransactionDraft),
    ) -> FlowResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.state.accepts_input() || inner.lookup_in_flight {
            return Err(FlowError::InvalidState {
                operation,
                state: inner.state,
            });
        }
        apply(&mut inner.draft);
        Ok(())
    }

    // =========================================================================
    // Ledger-backed path: lookup, confirm
    // =========================================================================

    /// Validate the draft and resolve the customer behind the phone number.
    pub async fn lookup(&self) -> FlowResult<CustomerRecord> {
        let (generation, msisdn) = {
            let mut inner = self.inner.lock().await;
            Self::ensure_state(&inner, FlowState::DataEntry, "lookup")?;
            if inner.lookup_in_flight {
                return Err(FlowError::InvalidState {
                    operation: "lookup",
                    state: inner.state,
                });
            }
            if !self.core.wallet.requires_kyc {
                let err = FlowError::UnsupportedConfiguration {
                    message: format!("{} does not use customer lookup", self.core.wallet.name),
                };
                return self.fail(&mut inner, err);
            }

            let validated = match self.validate_for_lookup(&inner.draft).await {
                Ok(validated) => validated,
                Err(e) => return self.fail(&mut inner, e),
            };
            let Some(msisdn) = validated.msisdn else {
                let err = FlowError::validation("Please enter a valid phone number", "phone");
                return self.fail(&mut inner, err);
            };

            inner.lookup_in_flight = true;
            inner.notice = None;
            (inner.generation, msisdn)
        };

        let result = self.core.adapter.lookup_customer(&msisdn).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            warn!(flow_id = %self.core.flow_id, "discarding stale lookup result");
            return Err(FlowError::Superseded);
        }
        inner.lookup_in_flight = false;

        match result {
            Ok(customer) => {
                info!(
                    flow_id = %self.core.flow_id,
                    msisdn = %mask_msisdn(&msisdn),
                    "customer confirmed for transaction"
                );
                inner.customer = Some(customer.clone());
                inner.notice = None;
                self.transition(&mut inner, FlowState::KycConfirmation)?;
                Ok(customer)
            }
            Err(e) => {
                warn!(
                    flow_id = %self.core.flow_id,
                    msisdn = %mask_msisdn(&msisdn),
                    error = %e,
                    "customer lookup failed"
                );
                self.fail(
                    &mut inner,
                    FlowError::LookupFailed {
                        message: e.user_message(),
                    },
                )
            }
        }
    }

    /// Return from KYC confirmation to data entry, keeping the draft.
    pub async fn back(&self) -> FlowResult<FlowState> {
        let mut inner = self.inner.lock().await;
        Self::ensure_state(&inner, FlowState::KycConfirmation, "back")?;
        inner.customer = None;
        self.transition(&mut inner, FlowState::DataEntry)?;
        Ok(inner.state)
    }

    /// Submit the confirmed transaction on the ledger-backed path.
    pub async fn confirm(&self) -> FlowResult<Receipt> {
        let (generation, request) = {
            let mut inner = self.inner.lock().await;
            Self::ensure_state(&inner, FlowState::KycConfirmation, "confirm")?;

            let mut validated = match self.validate_for_lookup(&inner.draft).await {
                Ok(validated) => validated,
                Err(e) => return self.fail(&mut inner, e),
            };
            // party id is the number the backend confirmed, not the typed one
            if let Some(customer) = &inner.customer {
                validated.msisdn = Some(customer.msisdn.clone());
            }
            let method = inner.method.unwrap_or(AuthMethod::Normal);
            let request = self.submit_request(method, validated);

            self.transition(&mut inner, FlowState::Processing)?;
            inner.notice = Some(Notice::info(self.processing_message()));
            (inner.generation, request)
        };

        let amount = request.amount;
        let result = self.core.adapter.submit(request).await;
        self.settle(generation, amount, result).await
    }

    // =========================================================================
    // Direct path: submit
    // =========================================================================

    /// Redeem a voucher directly, without customer lookup.
    pub async fn submit(&self) -> FlowResult<Receipt> {
        let (generation, request) = {
            let mut inner = self.inner.lock().await;
            Self::ensure_state(&inner, FlowState::DataEntry, "submit")?;
            if self.core.wallet.requires_kyc {
                return Err(FlowError::InvalidState {
                    operation: "submit",
                    state: inner.state,
                });
            }

            let method = inner.method.unwrap_or(AuthMethod::Voucher);
            if method != AuthMethod::Voucher {
                return self.fail(&mut inner, self.unsupported_method(method));
            }

            let available = self.core.session.available_balance().await;
            let validated = match inner.draft.validate_for_redemption(
                self.core.direction,
                available,
                self.core.wallet.requires_pin,
            ) {
                Ok(validated) => validated,
                Err(e) => return self.fail(&mut inner, e),
            };
            let request = self.submit_request(method, validated);

            self.transition(&mut inner, FlowState::Processing)?;
            inner.notice = Some(Notice::info(self.processing_message()));
            (inner.generation, request)
        };

        let amount = request.amount;
        let result = self.core.adapter.submit(request).await;
        self.settle(generation, amount, result).await
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Abandon the current transaction and start over with an empty draft.
    ///
    /// The agent balance is left as is. A call still in flight is not
    /// cancelled; its result is discarded when it arrives.
    pub async fn reset(&self) -> FlowState {
        let mut inner = self.inner.lock().await;
        let from = inner.state;

        inner.generation += 1;
        inner.method = self.core.wallet.sole_method();
        inner.state = initial_state(inner.method);
        inner.draft = TransactionDraft::default();
        inner.customer = None;
        inner.receipt = None;
        inner.notice = None;
        inner.lookup_in_flight = false;

        info!(
            flow_id = %self.core.flow_id,
            direction = %self.core.direction,
            wallet = %self.core.wallet.id,
            from = %from,
            to = %inner.state,
            "transaction flow reset"
        );
        inner.state
    }

    // =========================================================================
    // Result handling
    // =========================================================================

    async fn settle(
        &self,
        generation: u64,
        requested_amount: f64,
        result: PaymentResult<SubmissionOutcome>,
    ) -> FlowResult<Receipt> {
        // Reasons are keyed by transaction id, so they are kept even when the
        // flow has moved on.
        match &result {
            Ok(SubmissionOutcome::Completed(done)) => {
                self.core
                    .reasons
                    .record(done.transaction_id.as_deref(), done.advisory_reason.as_deref())
                    .await
            }
            Ok(SubmissionOutcome::Declined {
                transaction_id,
                reason,
            }) => {
                self.core
                    .reasons
                    .record(Some(transaction_id), Some(reason))
                    .await
            }
            _ => {}
        }

        let mut inner = self.inner.lock().await;
        if inner.generation != generation || inner.state != FlowState::Processing {
            warn!(
                flow_id = %self.core.flow_id,
                generation,
                current_generation = inner.generation,
                "discarding stale transaction result"
            );
            return Err(FlowError::Superseded);
        }

        let direction = self.core.direction;
        match result {
            Ok(SubmissionOutcome::Completed(done)) => {
                let amount = done.amount_settled.unwrap_or(requested_amount);
                let update = match done.balance_after {
                    Some(balance) => BalanceUpdate::Absolute(balance),
                    None => BalanceUpdate::Delta(direction.balance_sign() * amount),
                };
                let balance_after = self.core.session.apply_balance(update).await;

                let receipt = Receipt {
                    transaction_id: done.transaction_id.clone(),
                    direction,
                    wallet_id: self.core.wallet.id.clone(),
                    amount,
                    balance_after,
                    customer: inner.customer.clone(),
                    reason: done.advisory_reason.clone(),
                    completed_at: Utc::now(),
                };

                inner.notice = Some(match &done.advisory_reason {
                    Some(reason) => Notice::warning(format!(
                        "{} of E{:.2} completed: {}",
                        direction.label(),
                        amount,
                        reason
                    )),
                    None => Notice::success(format!(
                        "{} of E{:.2} completed",
                        direction.label(),
                        amount
                    )),
                });
                inner.receipt = Some(receipt.clone());
                self.transition(&mut inner, FlowState::Complete)?;

                info!(
                    flow_id = %self.core.flow_id,
                    transaction_id = ?receipt.transaction_id,
                    amount,
                    balance_after,
                    "transaction completed"
                );
                Ok(receipt)
            }
            Ok(SubmissionOutcome::Declined {
                transaction_id,
                reason,
            }) => {
                warn!(
                    flow_id = %self.core.flow_id,
                    %transaction_id,
                    %reason,
                    "transaction declined"
                );
                self.return_to_entry(&mut inner)?;
                self.fail(
                    &mut inner,
                    FlowError::SoftFailure {
                        transaction_id: Some(transaction_id),
                        reason,
                    },
                )
            }
            Ok(SubmissionOutcome::Rejected { reason }) => {
                warn!(flow_id = %self.core.flow_id, %reason, "transaction rejected");
                self.return_to_entry(&mut inner)?;
                self.fail(
                    &mut inner,
                    FlowError::SoftFailure {
                        transaction_id: None,
                        reason,
                    },
                )
            }
            Err(e) => {
                error!(flow_id = %self.core.flow_id, error = %e, "transaction failed");
                self.return_to_entry(&mut inner)?;
                self.fail(&mut inner, FlowError::from(e))
            }
        }
    }

    fn return_to_entry(&self, inner: &mut FlowInner) -> FlowResult<()> {
        inner.customer = None;
        self.transition(inner, FlowState::DataEntry)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn ensure_state(
        inner: &FlowInner,
        expected: FlowState,
        operation: &'static str,
    ) -> FlowResult<()> {
        if inner.state == expected {
            Ok(())
        } else {
            Err(FlowError::InvalidState {
                operation,
                state: inner.state,
            })
        }
    }

    fn transition(&self, inner: &mut FlowInner, to: FlowState) -> FlowResult<()> {
        let from = inner.state;
        if !from.can_transition_to(to) {
            return Err(FlowError::InvalidState {
                operation: "transition",
                state: from,
            });
        }
        inner.state = to;

        info!(
            flow_id = %self.core.flow_id,
            direction = %self.core.direction,
            wallet = %self.core.wallet.id,
            from = %from,
            to = %to,
            "flow state transitioned"
        );
        Ok(())
    }

    /// Record the failure as a notice and hand it back.
    fn fail<T>(&self, inner: &mut FlowInner, err: FlowError) -> FlowResult<T> {
        inner.notice = Some(Notice::error(err.user_message()));
        Err(err)
    }

    async fn validate_for_lookup(&self, draft: &TransactionDraft) -> FlowResult<ValidatedDraft> {
        let available = self.core.session.available_balance().await;
        draft.validate_for_lookup(self.core.direction, available, &self.core.msisdn)
    }

    fn submit_request(&self, method: AuthMethod, validated: ValidatedDraft) -> SubmitRequest {
        SubmitRequest {
            direction: self.core.direction,
            wallet_id: self.core.wallet.id.clone(),
            method,
            msisdn: validated.msisdn,
            voucher_number: validated.voucher_number,
            amount: validated.amount,
            pin: validated.pin,
            otp: validated.otp,
            description: format!("{} via {}", self.core.direction.label(), self.core.wallet.name),
            reference: Uuid::new_v4().to_string(),
        }
    }

    fn unsupported_method(&self, method: AuthMethod) -> FlowError {
        FlowError::UnsupportedConfiguration {
            message: format!(
                "{} {} transactions are not supported without customer lookup",
                self.core.wallet.name, method
            ),
        }
    }

    fn processing_message(&self) -> String {
        match self.core.direction {
            Direction::CashOut => "Waiting for the customer to approve on their phone".to_string(),
            Direction::CashIn => "Processing transaction".to_string(),
        }
    }
}
