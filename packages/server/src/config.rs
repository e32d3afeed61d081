//! Server configuration, read from command-line flags or `MURMUR_*` environment variables.

use std::{fmt, time::Duration};

use clap::Parser;
use thiserror::Error;

const PLACEHOLDER_SECRET: &str = "your_jwt_secret_key";

/// Upper bound for every interval and threshold (ten years)
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Upper bound for the router queue
pub const MAX_QUEUE_CAPACITY: u64 = 1 << 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT secret must not be empty")]
    EmptySecret,

    #[error("JWT secret is still the placeholder value; set MURMUR_JWT_SECRET")]
    PlaceholderSecret,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{name} must be at most {max}")]
    TooLarge { name: &'static str, max: u64 },
}

#[derive(Clone, Parser)]
#[command(name = "murmur-server", version, about = "Real-time chat server")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "MURMUR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "MURMUR_PORT", default_value_t = 8080)]
    pub port: u16,

    /// HS256 secret shared with the account service
    #[arg(long, env = "MURMUR_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Seconds between stale presence sweeps
    #[arg(long, env = "MURMUR_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Seconds of inactivity after which a user is evicted
    #[arg(long, env = "MURMUR_STALE_AFTER_SECS", default_value_t = 600)]
    pub stale_after_secs: u64,

    /// Seconds between WebSocket pings
    #[arg(long, env = "MURMUR_HEARTBEAT_INTERVAL_SECS", default_value_t = 30)]
    pub heartbeat_interval_secs: u64,

    /// Seconds a new connection has to send its auth frame
    #[arg(long, env = "MURMUR_AUTH_TIMEOUT_SECS", default_value_t = 10)]
    pub auth_timeout_secs: u64,

    /// Events the router queue holds before rejecting new ones
    #[arg(long, env = "MURMUR_ROUTER_QUEUE_CAPACITY", default_value_t = 1024)]
    pub router_queue_capacity: usize,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "MURMUR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.jwt_secret == PLACEHOLDER_SECRET {
            return Err(ConfigError::PlaceholderSecret);
        }
        let bounded = [
            (
                "router queue capacity",
                u64::try_from(self.router_queue_capacity).unwrap_or(u64::MAX),
                MAX_QUEUE_CAPACITY,
            ),
            ("sweep interval", self.sweep_interval_secs, MAX_DURATION_SECS),
            ("stale threshold", self.stale_after_secs, MAX_DURATION_SECS),
            ("heartbeat interval", self.heartbeat_interval_secs, MAX_DURATION_SECS),
            ("auth timeout", self.auth_timeout_secs, MAX_DURATION_SECS),
        ];
        for (name, value, max) in bounded {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
            if value > max {
                return Err(ConfigError::TooLarge { name, max });
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn stale_threshold(&self) -> chrono::Duration {
        i64::try_from(self.stale_after_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"<redacted>")
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("stale_after_secs", &self.stale_after_secs)
            .field("heartbeat_interval_secs", &self.heartbeat_interval_secs)
            .field("auth_timeout_secs", &self.auth_timeout_secs)
            .field("router_queue_capacity", &self.router_queue_capacity)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["murmur-server"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        // テスト項目: 秘密鍵以外は既定値が使われる
        // given (前提条件):
        let args = ["--jwt-secret", "s3cret"];

        // when (操作):
        let config = parse(&args);

        // then (期待する結果):
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.stale_threshold(), chrono::Duration::minutes(10));
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(config.auth_timeout(), Duration::from_secs(10));
        assert_eq!(config.router_queue_capacity, 1024);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_weak_secrets() {
        // テスト項目: 空・プレースホルダーの秘密鍵は拒否される
        // given (前提条件):
        let empty = parse(&["--jwt-secret", ""]);
        let placeholder = parse(&["--jwt-secret", "your_jwt_secret_key"]);

        // when (操作):
        let empty_result = empty.validate();
        let placeholder_result = placeholder.validate();

        // then (期待する結果):
        assert_eq!(empty_result, Err(ConfigError::EmptySecret));
        assert_eq!(placeholder_result, Err(ConfigError::PlaceholderSecret));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        // テスト項目: 0 のキュー容量・間隔は拒否される
        // given (前提条件):
        let config = parse(&["--jwt-secret", "s3cret", "--router-queue-capacity", "0"]);
        let sweep = parse(&["--jwt-secret", "s3cret", "--sweep-interval-secs", "0"]);

        // when (操作):
        let result = config.validate();
        let sweep_result = sweep.validate();

        // then (期待する結果):
        assert_eq!(result, Err(ConfigError::Zero("router queue capacity")));
        assert_eq!(sweep_result, Err(ConfigError::Zero("sweep interval")));
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        // テスト項目: 上限を超える閾値・容量は拒否され、閾値の変換でパニックしない
        // given (前提条件):
        let stale = parse(&[
            "--jwt-secret",
            "s3cret",
            "--stale-after-secs",
            "18446744073709551615",
        ]);
        let capacity = parse(&[
            "--jwt-secret",
            "s3cret",
            "--router-queue-capacity",
            "1048577",
        ]);

        // when (操作):
        let stale_result = stale.validate();
        let capacity_result = capacity.validate();
        let threshold = stale.stale_threshold();

        // then (期待する結果):
        assert_eq!(
            stale_result,
            Err(ConfigError::TooLarge {
                name: "stale threshold",
                max: MAX_DURATION_SECS,
            })
        );
        assert_eq!(
            capacity_result,
            Err(ConfigError::TooLarge {
                name: "router queue capacity",
                max: MAX_QUEUE_CAPACITY,
            })
        );
        assert_eq!(threshold, chrono::Duration::MAX);
    }

    #[test]
    fn test_validate_accepts_upper_bound() {
        // テスト項目: 上限ちょうどの値は受け付けられる
        // given (前提条件):
        let max = MAX_DURATION_SECS.to_string();
        let config = parse(&["--jwt-secret", "s3cret", "--stale-after-secs", &max]);

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Ok(()));
        assert_eq!(
            config.stale_threshold().num_seconds(),
            MAX_DURATION_SECS as i64
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        // テスト項目: Debug 出力に秘密鍵が含まれない
        // given (前提条件):
        let config = parse(&["--jwt-secret", "s3cret"]);

        // when (操作):
        let printed = format!("{config:?}");

        // then (期待する結果):
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("<redacted>"));
    }
}
