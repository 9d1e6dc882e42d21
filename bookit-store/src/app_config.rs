use bookit_core::locks::LockPolicy;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking_rules: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Quotas and timeouts for room locks.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BookingRules {
    pub max_locks_per_user: usize,
    pub lock_timeout_minutes: i64,
    pub lock_cooldown_minutes: i64,
    /// 0 turns the background sweeper off.
    pub lock_sweep_interval_seconds: u64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            max_locks_per_user: 3,
            lock_timeout_minutes: 15,
            lock_cooldown_minutes: 5,
            lock_sweep_interval_seconds: 60,
        }
    }
}

impl BookingRules {
    /// Rejects rules that would make every lock attempt fail or expire at once.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.max_locks_per_user == 0 {
            return Err(config::ConfigError::Message(
                "booking_rules.max_locks_per_user must be at least 1".into(),
            ));
        }
        for (key, minutes) in [
            ("lock_timeout_minutes", self.lock_timeout_minutes),
            ("lock_cooldown_minutes", self.lock_cooldown_minutes),
        ] {
            if minutes <= 0 {
                return Err(config::ConfigError::Message(format!(
                    "booking_rules.{} must be positive, got {}",
                    key, minutes
                )));
            }
        }
        Ok(())
    }

    pub fn to_lock_policy(&self) -> LockPolicy {
        LockPolicy {
            max_locks_per_user: self.max_locks_per_user,
            lock_timeout: chrono::Duration::minutes(self.lock_timeout_minutes),
            cooldown: chrono::Duration::minutes(self.lock_cooldown_minutes),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `BOOKIT__SERVER__PORT=9000`
            .add_source(config::Environment::with_prefix("BOOKIT").separator("__"))
            .build()?;

        Self::from_source(s)
    }

    fn from_source(source: config::Config) -> Result<Self, config::ConfigError> {
        let config: Config = source.try_deserialize()?;
        config.booking_rules.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn try_parse(toml: &str) -> Result<Config, config::ConfigError> {
        let source = config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Config::from_source(source)
    }

    fn parse(toml: &str) -> Config {
        try_parse(toml).unwrap()
    }

    const BASE: &str = r#"
        [server]
        port = 3000
        [database]
        url = "postgres://localhost/bookit"
        [redis]
        url = "redis://localhost:6379"
        [auth]
        jwt_secret = "secret"
    "#;

    #[test]
    fn test_booking_rules_default_when_absent() {
        let config = parse(BASE);
        assert_eq!(config.booking_rules, BookingRules::default());
        assert_eq!(config.database.max_connections, 5);

        let policy = config.booking_rules.to_lock_policy();
        assert_eq!(policy.max_locks_per_user, 3);
        assert_eq!(policy.lock_timeout, chrono::Duration::minutes(15));
        assert_eq!(policy.cooldown, chrono::Duration::minutes(5));
    }

    #[test]
    fn test_partial_booking_rules_override() {
        let config = parse(&format!(
            "{}\n[booking_rules]\nmax_locks_per_user = 5\nlock_sweep_interval_seconds = 0\n",
            BASE
        ));
        assert_eq!(config.booking_rules.max_locks_per_user, 5);
        assert_eq!(config.booking_rules.lock_timeout_minutes, 15);
        assert_eq!(config.booking_rules.lock_sweep_interval_seconds, 0);
    }

    #[test]
    fn test_non_positive_booking_rules_rejected() {
        for rule in [
            "lock_timeout_minutes = -15",
            "lock_timeout_minutes = 0",
            "lock_cooldown_minutes = -1",
            "max_locks_per_user = 0",
        ] {
            let err = try_parse(&format!("{}\n[booking_rules]\n{}\n", BASE, rule)).unwrap_err();
            let key = rule.split(' ').next().unwrap();
            assert!(err.to_string().contains(key), "{}: {}", rule, err);
        }
    }
}
