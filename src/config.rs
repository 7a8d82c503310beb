use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const CONFIG_DIR: &str = "config";
/// Environment variable carrying the integration config as one JSON document.
pub const INTEGRATION_CONFIG_ENV: &str = "ADYEN_INTEGRATION_CONFIG";

/// Module behaviour switches, resolved per merchant account.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Attach cart line items to every make-payment request by default
    #[serde(default)]
    pub add_commercetools_line_items: bool,

    /// Fail when more than one cart references a payment instead of taking the first
    #[serde(default = "default_true_bool")]
    pub strict_cart_lookup: bool,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            add_commercetools_line_items: false,
            strict_cart_lookup: true,
        }
    }
}

/// Credentials and endpoints of one commerce platform project.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CtpProjectConfig {
    #[validate(length(min = 1))]
    pub project_key: String,

    #[validate(length(min = 1))]
    pub client_id: String,

    #[validate(length(min = 1))]
    pub client_secret: String,

    /// API base URL, e.g. `https://api.europe-west1.gcp.commercetools.com`
    #[validate(url)]
    pub api_url: String,

    /// Auth base URL; the token endpoint is `{auth_url}/oauth/token`
    #[validate(url)]
    pub auth_url: String,

    /// OAuth2 scope, defaults to `manage_project:{project_key}`
    #[serde(default)]
    pub scope: Option<String>,
}

impl CtpProjectConfig {
    pub fn scope(&self) -> String {
        self.scope
            .clone()
            .unwrap_or_else(|| format!("manage_project:{}", self.project_key))
    }
}

/// Credentials of one payment provider merchant account.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AdyenMerchantConfig {
    #[validate(length(min = 1))]
    pub merchant_account: String,

    #[validate(length(min = 1))]
    pub api_key: String,

    /// Checkout API base URL, e.g. `https://checkout-test.adyen.com/v71`
    #[validate(url)]
    pub api_base_url: String,

    /// Overrides `module.add_commercetools_line_items` for this account
    #[serde(default)]
    pub add_commercetools_line_items: Option<bool>,
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Timeout for outbound HTTP calls (commerce platform and provider)
    #[serde(default = "default_http_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub http_timeout_secs: u64,

    /// Global module defaults
    #[serde(default)]
    pub module: ModuleConfig,

    /// Commerce platform projects the bridge may serve
    #[serde(default)]
    pub ctp_projects: Vec<CtpProjectConfig>,

    /// Payment provider merchant accounts the bridge may charge against
    #[serde(default)]
    pub adyen_merchant_accounts: Vec<AdyenMerchantConfig>,
}

impl AppConfig {
    /// Creates a new configuration with default server and module settings
    pub fn new(
        ctp_projects: Vec<CtpProjectConfig>,
        adyen_merchant_accounts: Vec<AdyenMerchantConfig>,
    ) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            module: ModuleConfig::default(),
            ctp_projects,
            adyen_merchant_accounts,
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn ctp_project(&self, project_key: &str) -> Option<&CtpProjectConfig> {
        self.ctp_projects
            .iter()
            .find(|p| p.project_key == project_key)
    }

    pub fn adyen_merchant(&self, merchant_account: &str) -> Option<&AdyenMerchantConfig> {
        self.adyen_merchant_accounts
            .iter()
            .find(|m| m.merchant_account == merchant_account)
    }

    /// Module config with the merchant account's overrides applied.
    pub fn module_config_for(&self, merchant_account: &str) -> ModuleConfig {
        let mut module = self.module.clone();
        if let Some(add) = self
            .adyen_merchant(merchant_account)
            .and_then(|m| m.add_commercetools_line_items)
        {
            module.add_commercetools_line_items = add;
        }
        module
    }

    /// Merges a JSON integration document keyed by project key and merchant
    /// account into this config. Entries override file entries with the same key.
    pub fn apply_integration_config(&mut self, raw: &str) -> Result<(), AppConfigError> {
        let doc: IntegrationConfig = serde_json::from_str(raw)
            .map_err(|e| AppConfigError::Integration(e.to_string()))?;

        for (project_key, project) in doc.commercetools {
            self.ctp_projects.retain(|p| p.project_key != project_key);
            self.ctp_projects.push(CtpProjectConfig {
                project_key,
                client_id: project.client_id,
                client_secret: project.client_secret,
                api_url: project.api_url,
                auth_url: project.auth_url,
                scope: project.scope,
            });
        }

        for (merchant_account, merchant) in doc.adyen {
            self.adyen_merchant_accounts
                .retain(|m| m.merchant_account != merchant_account);
            self.adyen_merchant_accounts.push(AdyenMerchantConfig {
                merchant_account,
                api_key: merchant.api_key,
                api_base_url: merchant.api_base_url,
                add_commercetools_line_items: merchant.add_commercetools_line_items,
            });
        }

        if let Some(add) = doc.add_commercetools_line_items {
            self.module.add_commercetools_line_items = add;
        }

        Ok(())
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.ctp_projects.is_empty() {
            let mut err = ValidationError::new("ctp_projects_required");
            err.message = Some("At least one commercetools project must be configured".into());
            errors.add("ctp_projects", err);
        }

        if self.adyen_merchant_accounts.is_empty() {
            let mut err = ValidationError::new("adyen_merchant_accounts_required");
            err.message = Some("At least one Adyen merchant account must be configured".into());
            errors.add("adyen_merchant_accounts", err);
        }

        let mut seen = HashSet::new();
        for project in &self.ctp_projects {
            if let Err(e) = project.validate() {
                let mut err = ValidationError::new("ctp_project");
                err.message = Some(format!("project {}: {}", project.project_key, e).into());
                errors.add("ctp_projects", err);
            }
            if !seen.insert(project.project_key.as_str()) {
                let mut err = ValidationError::new("ctp_project_duplicate");
                err.message = Some(format!("project {} is configured twice", project.project_key).into());
                errors.add("ctp_projects", err);
            }
        }

        let mut seen = HashSet::new();
        for merchant in &self.adyen_merchant_accounts {
            if let Err(e) = merchant.validate() {
                let mut err = ValidationError::new("adyen_merchant_account");
                err.message =
                    Some(format!("merchant account {}: {}", merchant.merchant_account, e).into());
                errors.add("adyen_merchant_accounts", err);
            }
            if !seen.insert(merchant.merchant_account.as_str()) {
                let mut err = ValidationError::new("adyen_merchant_account_duplicate");
                err.message = Some(
                    format!("merchant account {} is configured twice", merchant.merchant_account)
                        .into(),
                );
                errors.add("adyen_merchant_accounts", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegrationConfig {
    #[serde(default)]
    commercetools: BTreeMap<String, IntegrationProject>,
    #[serde(default)]
    adyen: BTreeMap<String, IntegrationMerchant>,
    #[serde(default)]
    add_commercetools_line_items: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegrationProject {
    client_id: String,
    client_secret: String,
    api_url: String,
    auth_url: String,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegrationMerchant {
    api_key: String,
    api_base_url: String,
    #[serde(default)]
    add_commercetools_line_items: Option<bool>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Integration config in {INTEGRATION_CONFIG_ENV} is invalid: {0}")]
    Integration(String),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_true_bool() -> bool {
    true
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("payment_bridge={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
/// 5. JSON integration document in `ADYEN_INTEGRATION_CONFIG`
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let integration = env::var(INTEGRATION_CONFIG_ENV)
        .ok()
        .filter(|raw| !raw.trim().is_empty());

    load_config_from(Path::new(CONFIG_DIR), &run_env, integration.as_deref())
}

/// Loads configuration from an explicit config directory and profile.
pub fn load_config_from(
    config_dir: &Path,
    run_env: &str,
    integration: Option<&str>,
) -> Result<AppConfig, AppConfigError> {
    let config = Config::builder()
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(
            File::with_name(&config_dir.join("default").to_string_lossy()).required(false),
        )
        .add_source(File::with_name(&config_dir.join(run_env).to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let mut app_config: AppConfig = config.try_deserialize()?;

    if let Some(raw) = integration {
        app_config.apply_integration_config(raw).map_err(|e| {
            error!("Failed to apply {}: {}", INTEGRATION_CONFIG_ENV, e);
            e
        })?;
    }

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    if app_config.module.add_commercetools_line_items {
        info!("Cart line items are attached to every make-payment request by default");
    }
    if !app_config.module.strict_cart_lookup {
        warn!("Strict cart lookup disabled; the first matching cart is used");
    }

    info!("Configuration loaded successfully");
    Ok(app_config)
}
