//! Wallet/provider registry
//!
//! Static catalog of the wallets an agent can transact against and the
//! capability flags that decide which flow states are reachable.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WalletCategory {
    MobileMoney,
    Bank,
}

/// How the customer authorizes a transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Customer phone number, PIN prompt on the handset
    Normal,
    /// Pre-issued voucher code
    Voucher,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Normal => "normal",
            AuthMethod::Voucher => "voucher",
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "normal" => Ok(AuthMethod::Normal),
            "voucher" => Ok(AuthMethod::Voucher),
            _ => Err(format!("unsupported authorization method: {}", value)),
        }
    }
}

/// Immutable wallet configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletProvider {
    pub id: String,
    pub name: String,
    pub category: WalletCategory,
    pub supported_methods: Vec<AuthMethod>,
    pub requires_pin: bool,
    /// Selects the ledger-backed path (customer lookup first) over the
    /// direct voucher path.
    #[serde(rename = "requiresKYC")]
    pub requires_kyc: bool,
    pub requires_balance: bool,
    pub quick_amounts: Vec<f64>,
}

impl WalletProvider {
    /// The method to pre-select when only one is offered.
    pub fn sole_method(&self) -> Option<AuthMethod> {
        match self.supported_methods.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn supports(&self, method: AuthMethod) -> bool {
        self.supported_methods.contains(&method)
    }
}

#[derive(Debug, Clone)]
pub struct WalletRegistry {
    wallets: Vec<WalletProvider>,
}

impl Default for WalletRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl WalletRegistry {
    pub fn new(wallets: Vec<WalletProvider>) -> Self {
        Self { wallets }
    }

    /// The catalog shipped with the portal.
    pub fn builtin() -> Self {
        #[allow(clippy::too_many_arguments)]
        fn wallet(
            id: &str,
            name: &str,
            category: WalletCategory,
            supported_methods: &[AuthMethod],
            requires_pin: bool,
            requires_kyc: bool,
            requires_balance: bool,
            quick_amounts: &[f64],
        ) -> WalletProvider {
            WalletProvider {
                id: id.to_string(),
                name: name.to_string(),
                category,
                supported_methods: supported_methods.to_vec(),
                requires_pin,
                requires_kyc,
                requires_balance,
                quick_amounts: quick_amounts.to_vec(),
            }
        }

        use AuthMethod::{Normal, Voucher};
        use WalletCategory::{Bank, MobileMoney};

        Self::new(vec![
            wallet(
                "MOMO",
                "MTN MoMo",
                MobileMoney,
                &[Normal],
                false,
                true,
                true,
                &[50.0, 100.0, 200.0, 500.0, 1000.0],
            ),
            wallet(
                "EMALI",
                "Eswatini Mobile eMali",
                MobileMoney,
                &[Normal],
                false,
                true,
                true,
                &[50.0, 100.0, 200.0, 500.0],
            ),
            wallet(
                "UNAYO",
                "Unayo",
                MobileMoney,
                &[Voucher],
                false,
                false,
                false,
                &[100.0, 200.0, 500.0, 1000.0],
            ),
            wallet(
                "INSTACASH",
                "InstaCash",
                MobileMoney,
                &[Normal, Voucher],
                true,
                false,
                false,
                &[100.0, 200.0, 500.0],
            ),
            wallet(
                "STANDARD_BANK",
                "Standard Bank",
                Bank,
                &[Normal],
                false,
                true,
                true,
                &[500.0, 1000.0, 2000.0],
            ),
        ])
    }

    /// Case-insensitive lookup by wallet id.
    pub fn get(&self, id: &str) -> Option<&WalletProvider> {
        let id = id.trim();
        self.wallets.iter().find(|w| w.id.eq_ignore_ascii_case(id))
    }

    pub fn all(&self) -> &[WalletProvider] {
        &self.wallets
    }

    pub fn by_category(&self, category: WalletCategory) -> Vec<&WalletProvider> {
        self.wallets
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = WalletRegistry::builtin();
        assert_eq!(registry.get("momo").map(|w| w.id.as_str()), Some("MOMO"));
        assert_eq!(registry.get(" Unayo ").map(|w| w.id.as_str()), Some("UNAYO"));
        assert!(registry.get("paypal").is_none());
    }

    #[test]
    fn sole_method_only_for_single_method_wallets() {
        let registry = WalletRegistry::builtin();
        assert_eq!(
            registry.get("MOMO").and_then(|w| w.sole_method()),
            Some(AuthMethod::Normal)
        );
        assert_eq!(
            registry.get("UNAYO").and_then(|w| w.sole_method()),
            Some(AuthMethod::Voucher)
        );
        assert_eq!(registry.get("INSTACASH").and_then(|w| w.sole_method()), None);
    }

    #[test]
    fn categories_partition_catalog() {
        let registry = WalletRegistry::builtin();
        let banks = registry.by_category(WalletCategory::Bank);
        let mobile = registry.by_category(WalletCategory::MobileMoney);
        assert_eq!(banks.len() + mobile.len(), registry.all().len());
        assert!(banks.iter().all(|w| w.requires_kyc));
    }

    #[test]
    fn wallet_serializes_with_frontend_field_names() {
        let registry = WalletRegistry::builtin();
        let json = serde_json::to_value(registry.get("UNAYO").unwrap()).unwrap();
        assert_eq!(json["requiresKYC"], false);
        assert_eq!(json["supportedMethods"][0], "voucher");
        assert_eq!(json["category"], "mobile_money");
    }

    #[test]
    fn auth_method_parsing() {
        assert_eq!("Voucher".parse::<AuthMethod>(), Ok(AuthMethod::Voucher));
        assert!("card".parse::<AuthMethod>().is_err());
    }
}
