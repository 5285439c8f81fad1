use crate::config::MsisdnConfig;
use crate::flow::error::{FlowError, FlowResult};
use crate::payments::Direction;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Shortest subscriber number that can follow the country code.
const MIN_SUBSCRIBER_DIGITS: usize = 7;

fn non_digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\D").expect("non-digit regex must compile"))
}

/// Raw form input for one transaction, kept exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionDraft {
    pub phone: String,
    pub voucher_number: String,
    pub amount: String,
    #[serde(skip_serializing)]
    pub pin: String,
    #[serde(skip_serializing)]
    pub otp: String,
}

/// A draft that passed local validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft {
    pub msisdn: Option<String>,
    pub voucher_number: Option<String>,
    pub amount: f64,
    pub pin: Option<String>,
    pub otp: Option<String>,
}

impl TransactionDraft {
    pub fn is_empty(&self) -> bool {
        *self == TransactionDraft::default()
    }

    /// Checks for the customer-lookup path, in order: phone, amount, balance
    /// ceiling (cash-out only).
    pub fn validate_for_lookup(
        &self,
        direction: Direction,
        available_balance: f64,
        msisdn: &MsisdnConfig,
    ) -> FlowResult<ValidatedDraft> {
        if self.phone.trim().is_empty() {
            return Err(FlowError::validation(
                "Please enter the customer's phone number",
                "phone",
            ));
        }
        let amount = self.checked_amount(direction, available_balance)?;
        let normalized = normalize_msisdn(&self.phone, msisdn)
            .ok_or_else(|| FlowError::validation("Please enter a valid phone number", "phone"))?;

        Ok(ValidatedDraft {
            msisdn: Some(normalized),
            voucher_number: None,
            amount,
            pin: None,
            otp: optional(&self.otp),
        })
    }

    /// Checks for the direct voucher path, in order: voucher number, amount,
    /// balance ceiling (cash-out only), PIN when the wallet asks for one.
    pub fn validate_for_redemption(
        &self,
        direction: Direction,
        available_balance: f64,
        requires_pin: bool,
    ) -> FlowResult<ValidatedDraft> {
        let voucher_number = optional(&self.voucher_number).ok_or_else(|| {
            FlowError::validation("Please enter the voucher number", "voucher_number")
        })?;
        let amount = self.checked_amount(direction, available_balance)?;
        let pin = optional(&self.pin);
        if requires_pin && pin.is_none() {
            return Err(FlowError::validation(
                "Please enter the customer's PIN",
                "pin",
            ));
        }

        Ok(ValidatedDraft {
            msisdn: None,
            voucher_number: Some(voucher_number),
            amount,
            pin,
            otp: optional(&self.otp),
        })
    }

    fn checked_amount(&self, direction: Direction, available_balance: f64) -> FlowResult<f64> {
        let amount = parse_amount(&self.amount)?;
        if direction == Direction::CashOut && amount > available_balance {
            return Err(FlowError::validation(
                format!(
                    "Insufficient balance: available E{:.2}, requested E{:.2}",
                    available_balance, amount
                ),
                "amount",
            ));
        }
        Ok(amount)
    }
}

/// Parse a typed amount. Rejects blanks, non-numbers and values <= 0.
pub fn parse_amount(raw: &str) -> FlowResult<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FlowError::validation("Please enter an amount", "amount"));
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(FlowError::validation(
            "Please enter a valid amount greater than zero",
            "amount",
        )),
    }
}

/// Bring a typed phone number into international format.
///
/// Non-digits are stripped. A number already carrying the country code is
/// kept, a leading national prefix is swapped for the country code, anything
/// else gets the country code prepended. `None` when no digits remain.
pub fn normalize_msisdn(raw: &str, config: &MsisdnConfig) -> Option<String> {
    let digits = non_digit_re().replace_all(raw, "").into_owned();
    if digits.is_empty() {
        return None;
    }

    let country_code = config.country_code.as_str();
    if digits.starts_with(country_code) && digits.len() >= country_code.len() + MIN_SUBSCRIBER_DIGITS
    {
        return Some(digits);
    }

    let prefix = config.national_prefix.as_str();
    if !prefix.is_empty() {
        if let Some(rest) = digits.strip_prefix(prefix) {
            return Some(format!("{}{}", country_code, rest));
        }
    }

    Some(format!("{}{}", country_code, digits))
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
