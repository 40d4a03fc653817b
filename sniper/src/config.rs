//! Configuration loaded from environment variables.
//!
//! Credentials are required; everything else falls back to the defaults
//! for the `24ska01` plan in `bhs`. See [`Config::from_lookup`] for the
//! full variable list.

use ovh_sniper_ovh::{Credentials, Endpoint};
use ovh_sniper_runtime::{
    CartSteps, OnFatalError, OrderTarget, RetryPolicy, WorkflowConfig,
};
use ovh_sniper_telegram::DEFAULT_API_URL;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors, reported before the first poll.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set to something that cannot be used.
    #[error("Invalid value for {var} ({value:?}): {reason}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Retry delay schedule selected by `BACKOFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    /// 2 seconds between attempts
    Fixed,
    /// `min(2 × attempt, 10)` seconds
    Linear,
}

impl FromStr for BackoffKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "linear" => Ok(Self::Linear),
            _ => Err("expected `fixed` or `linear`".to_string()),
        }
    }
}

/// Telegram bot settings
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot API base URL
    pub api_url: String,
    /// Bot token
    pub bot_token: String,
    /// Destination chat
    pub chat_id: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_url", &self.api_url)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// OVH API settings
#[derive(Debug, Clone)]
pub struct OvhConfig {
    /// API region or explicit base URL
    pub endpoint: Endpoint,
    /// Application credentials (secrets redacted in `Debug`)
    pub credentials: Credentials,
}

/// Retry settings for every outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total calls per operation, the first one included
    pub max_attempts: u32,
    /// Delay schedule
    pub backoff: BackoffKind,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Notification channel
    pub telegram: TelegramConfig,
    /// Ordering API
    pub ovh: OvhConfig,
    /// Server to watch and order
    pub target: OrderTarget,
    /// Retry wrapper settings
    pub retry: RetryConfig,
    /// Sleep after a cycle that did not observe `unavailable`
    pub poll_interval: Duration,
    /// Sleep after an `unavailable` observation
    pub unavailable_interval: Duration,
    /// Unrecoverable error policy
    pub on_fatal_error: OnFatalError,
    /// Intermediate cart step policy
    pub cart_steps: CartSteps,
    /// Alert the operator when a call is given up on
    pub notify_call_failures: bool,
    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration from any variable lookup.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `BOT_TOKEN`, `CHAT_ID` | required |
    /// | `OVH_APPLICATION_KEY`, `OVH_APPLICATION_SECRET`, `OVH_CONSUMER_KEY` | required |
    /// | `TELEGRAM_API_URL` | `https://api.telegram.org` |
    /// | `OVH_ENDPOINT` | `ovh-eu` |
    /// | `PLAN_CODE` / `DATACENTER` / `SERVER_LABEL` | `24ska01` / `bhs` / `KSA` |
    /// | `OPTION_PLAN_CODES` | `ram-64g-noecc-2133-24ska01,softraid-1x480ssd-24ska01` |
    /// | `OS` / `DURATION` / `PRICING_MODE` | `none_64.en` / `P1M` / `default` |
    /// | `AUTO_PAY` | `false` |
    /// | `MAX_ATTEMPTS` / `BACKOFF` | `5` / `linear` |
    /// | `POLL_INTERVAL_SECS` / `UNAVAILABLE_INTERVAL_SECS` | `2` / `2` |
    /// | `ON_FATAL_ERROR` / `FATAL_COOLDOWN_SECS` | `abort` / `300` |
    /// | `CART_STEPS` | `checked` |
    /// | `NOTIFY_CALL_FAILURES` | `true` |
    /// | `HTTP_TIMEOUT_SECS` | `30` |
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let defaults = OrderTarget::default();

        let telegram = TelegramConfig {
            api_url: vars.or("TELEGRAM_API_URL", DEFAULT_API_URL),
            bot_token: vars.required("BOT_TOKEN")?,
            chat_id: vars.required("CHAT_ID")?,
        };

        let ovh = OvhConfig {
            endpoint: vars.parse_or("OVH_ENDPOINT", Endpoint::default())?,
            credentials: Credentials {
                application_key: vars.required("OVH_APPLICATION_KEY")?,
                application_secret: vars.required("OVH_APPLICATION_SECRET")?,
                consumer_key: vars.required("OVH_CONSUMER_KEY")?,
            },
        };

        let option_plan_codes = vars.get("OPTION_PLAN_CODES").map_or(
            defaults.option_plan_codes.clone(),
            |raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(str::to_string)
                    .collect()
            },
        );

        let target = OrderTarget {
            plan_code: vars.or("PLAN_CODE", &defaults.plan_code),
            datacenter: vars.or("DATACENTER", &defaults.datacenter),
            label: vars.or("SERVER_LABEL", &defaults.label),
            option_plan_codes,
            os: vars.or("OS", &defaults.os),
            duration: vars.or("DURATION", &defaults.duration),
            pricing_mode: vars.or("PRICING_MODE", &defaults.pricing_mode),
            quantity: defaults.quantity,
            auto_pay: vars.flag_or("AUTO_PAY", defaults.auto_pay)?,
        };

        let max_attempts: u32 = vars.parse_or("MAX_ATTEMPTS", 5)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        let retry = RetryConfig {
            max_attempts,
            backoff: vars.parse_or("BACKOFF", BackoffKind::Linear)?,
        };

        let on_fatal_error = match vars.or("ON_FATAL_ERROR", "abort").to_ascii_lowercase().as_str()
        {
            "abort" => OnFatalError::Abort,
            "continue" => OnFatalError::Continue {
                cooldown: vars.seconds_or("FATAL_COOLDOWN_SECS", 300)?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: "ON_FATAL_ERROR",
                    value: other.to_string(),
                    reason: "expected `abort` or `continue`".to_string(),
                });
            }
        };

        let cart_steps = match vars.or("CART_STEPS", "checked").to_ascii_lowercase().as_str() {
            "checked" => CartSteps::Checked,
            "best-effort" | "best_effort" => CartSteps::BestEffort,
            other => {
                return Err(ConfigError::Invalid {
                    var: "CART_STEPS",
                    value: other.to_string(),
                    reason: "expected `checked` or `best-effort`".to_string(),
                });
            }
        };

        Ok(Self {
            telegram,
            ovh,
            target,
            retry,
            poll_interval: vars.seconds_or("POLL_INTERVAL_SECS", 2)?,
            unavailable_interval: vars.seconds_or("UNAVAILABLE_INTERVAL_SECS", 2)?,
            on_fatal_error,
            cart_steps,
            notify_call_failures: vars.flag_or("NOTIFY_CALL_FAILURES", true)?,
            http_timeout: vars.seconds_or("HTTP_TIMEOUT_SECS", 30)?,
        })
    }

    /// Workflow settings derived from this configuration.
    #[must_use]
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            target: self.target.clone(),
            poll_interval: self.poll_interval,
            unavailable_interval: self.unavailable_interval,
            on_fatal_error: self.on_fatal_error,
            cart_steps: self.cart_steps,
        }
    }

    /// Retry policy derived from this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let builder = RetryPolicy::builder().max_attempts(self.retry.max_attempts);
        match self.retry.backoff {
            BackoffKind::Fixed => builder.fixed(Duration::from_secs(2)),
            BackoffKind::Linear => builder.linear(Duration::from_secs(2), Duration::from_secs(10)),
        }
        .build()
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.get(var).ok_or(ConfigError::Missing(var))
    }

    fn or(&self, var: &str, default: &str) -> String {
        self.get(var).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(var) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn seconds_or(&self, var: &'static str, default: u64) -> Result<Duration, ConfigError> {
        self.parse_or(var, default).map(Duration::from_secs)
    }

    fn flag_or(&self, var: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(var) {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    var,
                    value,
                    reason: "expected a boolean".to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Tests can unwrap

    use super::*;
    use ovh_sniper_runtime::Backoff;
    use std::collections::HashMap;

    fn required() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("BOT_TOKEN", "123:abc"),
            ("CHAT_ID", "42"),
            ("OVH_APPLICATION_KEY", "ak"),
            ("OVH_APPLICATION_SECRET", "as"),
            ("OVH_CONSUMER_KEY", "ck"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|var| vars.get(var).map(|value| (*value).to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&required()).unwrap();

        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.ovh.endpoint.base_url(), "https://eu.api.ovh.com/1.0");
        assert_eq!(config.target, OrderTarget::default());
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.unavailable_interval, Duration::from_secs(2));
        assert_eq!(config.on_fatal_error, OnFatalError::Abort);
        assert_eq!(config.cart_steps, CartSteps::Checked);
        assert!(config.notify_call_failures);
        assert_eq!(config.http_timeout, Duration::from_secs(30));

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(
            policy.backoff,
            Backoff::Linear {
                step: Duration::from_secs(2),
                max_delay: Duration::from_secs(10),
            }
        );
    }

    #[test]
    fn test_missing_credentials() {
        for var in [
            "BOT_TOKEN",
            "CHAT_ID",
            "OVH_APPLICATION_KEY",
            "OVH_APPLICATION_SECRET",
            "OVH_CONSUMER_KEY",
        ] {
            let mut vars = required();
            vars.remove(var);
            assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing(var));
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut vars = required();
        vars.insert("CHAT_ID", "  ");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("CHAT_ID"));
    }

    #[test]
    fn test_overrides() {
        let mut vars = required();
        vars.extend([
            ("OVH_ENDPOINT", "ovh-ca"),
            ("PLAN_CODE", "24sk10"),
            ("DATACENTER", "gra"),
            ("SERVER_LABEL", "KS-1"),
            ("OPTION_PLAN_CODES", "ram-32g-24sk10, , softraid-2x2000sa-24sk10"),
            ("AUTO_PAY", "yes"),
            ("MAX_ATTEMPTS", "3"),
            ("BACKOFF", "fixed"),
            ("ON_FATAL_ERROR", "continue"),
            ("FATAL_COOLDOWN_SECS", "60"),
            ("CART_STEPS", "best-effort"),
            ("NOTIFY_CALL_FAILURES", "false"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.ovh.endpoint.base_url(), "https://ca.api.ovh.com/1.0");
        assert_eq!(config.target.plan_code, "24sk10");
        assert_eq!(config.target.datacenter, "gra");
        assert_eq!(config.target.label, "KS-1");
        assert_eq!(
            config.target.option_plan_codes,
            vec!["ram-32g-24sk10", "softraid-2x2000sa-24sk10"]
        );
        assert!(config.target.auto_pay);
        assert_eq!(
            config.on_fatal_error,
            OnFatalError::Continue {
                cooldown: Duration::from_secs(60)
            }
        );
        assert_eq!(config.cart_steps, CartSteps::BestEffort);
        assert!(!config.notify_call_failures);

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(
            policy.backoff,
            Backoff::Fixed {
                delay: Duration::from_secs(2)
            }
        );

        let workflow = config.workflow_config();
        assert_eq!(workflow.target, config.target);
        assert_eq!(workflow.cart_steps, CartSteps::BestEffort);
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("OVH_ENDPOINT", "ovh-mars"),
            ("MAX_ATTEMPTS", "0"),
            ("MAX_ATTEMPTS", "many"),
            ("BACKOFF", "exponential"),
            ("POLL_INTERVAL_SECS", "-1"),
            ("ON_FATAL_ERROR", "retry"),
            ("CART_STEPS", "sometimes"),
            ("AUTO_PAY", "maybe"),
        ];

        for (var, value) in cases {
            let mut vars = required();
            vars.insert(var, value);
            assert!(
                matches!(load(&vars), Err(ConfigError::Invalid { var: v, .. }) if v == var),
                "{var}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut vars = required();
        vars.insert("BOT_TOKEN", "bot-token-value");
        vars.insert("OVH_APPLICATION_SECRET", "app-secret-value");
        vars.insert("OVH_CONSUMER_KEY", "consumer-key-value");
        let debug = format!("{:?}", load(&vars).unwrap());

        assert!(!debug.contains("bot-token-value"));
        assert!(!debug.contains("app-secret-value"));
        assert!(!debug.contains("consumer-key-value"));
    }
}
