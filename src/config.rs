//! Portal configuration module
//! Handles environment variable loading, configuration validation, and client settings

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main portal configuration
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub ledger_api: LedgerApiConfig,
    pub voucher_api: VoucherApiConfig,
    pub msisdn: MsisdnConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Ledger-backed CICO API configuration
#[derive(Debug, Clone)]
pub struct LedgerApiConfig {
    pub base_url: String,
    pub lookup_timeout: u64,   // seconds
    pub cash_in_timeout: u64,  // seconds
    pub cash_out_timeout: u64, // seconds, covers customer PIN entry
    pub default_timeout: u64,  // seconds
}

/// External voucher-redemption API configuration
#[derive(Debug, Clone)]
pub struct VoucherApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: u64, // seconds
}

/// Phone number normalization settings
#[derive(Debug, Clone)]
pub struct MsisdnConfig {
    pub country_code: String,
    pub national_prefix: String,
}

/// Client-persisted state locations
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub session_path: PathBuf,
    pub reasons_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

impl PortalConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(PortalConfig {
            ledger_api: LedgerApiConfig::from_env()?,
            voucher_api: VoucherApiConfig::from_env()?,
            msisdn: MsisdnConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ledger_api.validate()?;
        self.voucher_api.validate()?;
        self.msisdn.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

fn parse_secs(key: &str, default: &str) -> Result<u64, ConfigError> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn validate_url(key: &str, url: &str) -> Result<(), ConfigError> {
    if url.is_empty() {
        return Err(ConfigError::InvalidValue(key.to_string()));
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be a valid URL",
            key
        )));
    }

    Ok(())
}

impl Default for LedgerApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            lookup_timeout: 30,
            cash_in_timeout: 5,
            cash_out_timeout: 120,
            default_timeout: 15,
        }
    }
}

impl LedgerApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LedgerApiConfig {
            base_url: env::var("CICO_API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string())
                .trim_end_matches('/')
                .to_string(),
            lookup_timeout: parse_secs("CICO_LOOKUP_TIMEOUT_SECS", "30")?,
            cash_in_timeout: parse_secs("CICO_CASH_IN_TIMEOUT_SECS", "5")?,
            cash_out_timeout: parse_secs("CICO_CASH_OUT_TIMEOUT_SECS", "120")?,
            default_timeout: parse_secs("CICO_DEFAULT_TIMEOUT_SECS", "15")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("CICO_API_BASE_URL", &self.base_url)?;

        if self.lookup_timeout == 0
            || self.cash_in_timeout == 0
            || self.cash_out_timeout == 0
            || self.default_timeout == 0
        {
            return Err(ConfigError::InvalidValue(
                "CICO timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout)
    }

    pub fn cash_in_timeout(&self) -> Duration {
        Duration::from_secs(self.cash_in_timeout)
    }

    pub fn cash_out_timeout(&self) -> Duration {
        Duration::from_secs(self.cash_out_timeout)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout)
    }
}

impl Default for VoucherApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8100".to_string(),
            api_key: String::new(),
            timeout: 30,
        }
    }
}

impl VoucherApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(VoucherApiConfig {
            base_url: env::var("VOUCHER_API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8100".to_string())
                .trim_end_matches('/')
                .to_string(),
            // Only needed once a voucher wallet is actually used
            api_key: env::var("VOUCHER_API_KEY").unwrap_or_default(),
            timeout: parse_secs("VOUCHER_TIMEOUT_SECS", "30")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("VOUCHER_API_BASE_URL", &self.base_url)?;

        if self.timeout == 0 {
            return Err(ConfigError::InvalidValue("VOUCHER_TIMEOUT_SECS".to_string()));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for MsisdnConfig {
    fn default() -> Self {
        Self {
            country_code: "268".to_string(),
            national_prefix: "0".to_string(),
        }
    }
}

impl MsisdnConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(MsisdnConfig {
            country_code: env::var("CICO_COUNTRY_CODE")
                .unwrap_or_else(|_| "268".to_string())
                .trim_start_matches('+')
                .to_string(),
            national_prefix: env::var("CICO_NATIONAL_PREFIX").unwrap_or_else(|_| "0".to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.country_code.is_empty() || !self.country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::InvalidValue("CICO_COUNTRY_CODE".to_string()));
        }

        if !self.national_prefix.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue("CICO_NATIONAL_PREFIX".to_string()));
        }

        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_path: PathBuf::from(".cico/session.json"),
            reasons_path: PathBuf::from(".cico/failure_reasons.json"),
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(StorageConfig {
            session_path: env::var("CICO_SESSION_PATH")
                .unwrap_or_else(|_| ".cico/session.json".to_string())
                .into(),
            reasons_path: env::var("CICO_REASONS_PATH")
                .unwrap_or_else(|_| ".cico/failure_reasons.json".to_string())
                .into(),
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: LogFormat::Plain,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}
