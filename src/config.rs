use crate::domain::Decimal;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub public_base_url: String,
    pub profiles_api: Option<ProfilesApi>,
    pub agent_commission_pct: Decimal,
    pub wallet_policy: WalletPolicy,
}

/// Hosted profile directory used by user refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilesApi {
    pub url: String,
    pub api_key: String,
}

/// How loss-making PnL entries affect wallets, platform totals and agent earnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletPolicy {
    /// Every entry moves the wallet by its signed net platform share.
    Signed,
    /// Only profitable entries count; losses leave the wallet untouched.
    ProfitOnly,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let public_base_url = env_map
            .get("PUBLIC_BASE_URL")
            .cloned()
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let profiles_api = match (env_map.get("PROFILES_API_URL"), env_map.get("PROFILES_API_KEY")) {
            (Some(url), Some(api_key)) => Some(ProfilesApi {
                url: url.trim_end_matches('/').to_string(),
                api_key: api_key.clone(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingEnv("PROFILES_API_KEY".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingEnv("PROFILES_API_URL".to_string())),
        };

        let agent_commission_pct = env_map
            .get("AGENT_COMMISSION_PCT")
            .map(|s| s.as_str())
            .unwrap_or("30")
            .parse::<Decimal>()
            .ok()
            .filter(|pct| !pct.is_negative() && *pct <= Decimal::hundred())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "AGENT_COMMISSION_PCT".to_string(),
                    "must be a number between 0 and 100".to_string(),
                )
            })?;

        let wallet_policy = match env_map
            .get("WALLET_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("signed")
        {
            "signed" => WalletPolicy::Signed,
            "profit_only" => WalletPolicy::ProfitOnly,
            other => {
                return Err(ConfigError::InvalidValue(
                    "WALLET_POLICY".to_string(),
                    format!("must be signed or profit_only, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_path,
            public_base_url,
            profiles_api,
            agent_commission_pct,
            wallet_policy,
        })
    }
}
