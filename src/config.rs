use rocket::figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_PATH: &str = "/api";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub rate_limit: RateLimitConfig,
    pub qr: QrConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_path: String,
    pub enable_swagger: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    pub read_limit: u32,
    pub mutation_limit: u32,
    pub window_seconds: u64,
    pub cleanup_interval_seconds: u64,
    pub require_client_ip: bool,
}

/// Settings for QR attendance sessions.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QrConfig {
    /// Lifetime of a generated session.
    pub session_ttl_seconds: i64,
    /// Externally reachable origin embedded in QR payloads, e.g. `https://attendance.example.edu`.
    pub public_url: String,
    /// How long an expired session stays queryable before it is purged.
    pub retention_seconds: i64,
    pub cleanup_interval_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/attendance_db".to_string(),
            max_connections: 16,
            min_connections: 4,
            acquire_timeout: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            allow_credentials: false,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            enable_swagger: true,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // Polling clients hit the status endpoint every 2-5 seconds.
        Self {
            read_limit: 120,
            mutation_limit: 30,
            window_seconds: 60,
            cleanup_interval_seconds: 120,
            require_client_ip: false,
        }
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: 300,
            public_url: "http://localhost:8000".to_string(),
            retention_seconds: 3600,
            cleanup_interval_seconds: 60,
        }
    }
}

const MAX_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const MAX_RETENTION_SECONDS: i64 = 30 * 24 * 60 * 60;

impl QrConfig {
    /// Session lifetime, clamped to between one second and one day.
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_seconds.clamp(1, MAX_SESSION_TTL_SECONDS))
    }

    /// Retention after expiry, clamped to between zero and thirty days.
    pub fn retention(&self) -> Duration {
        Duration::seconds(self.retention_seconds.clamp(0, MAX_RETENTION_SECONDS))
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Attendance.toml (base configuration file)
    /// 2. Environment variables (prefixed with ATTENDANCE_, `__` separates sections)
    /// 3. DATABASE_URL environment variable
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("Attendance.toml"))
            .merge(Env::prefixed("ATTENDANCE_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_loaded_without_sources() {
        Jail::expect_with(|_jail| {
            let config = Config::load()?;
            assert_eq!(config.qr.session_ttl_seconds, 300);
            assert_eq!(config.api.base_path, DEFAULT_API_BASE_PATH);
            Ok(())
        });
    }

    #[test]
    fn out_of_range_durations_are_clamped() {
        let qr = QrConfig {
            session_ttl_seconds: i64::MAX,
            retention_seconds: i64::MIN,
            ..QrConfig::default()
        };
        assert_eq!(qr.session_ttl(), Duration::days(1));
        assert_eq!(qr.retention(), Duration::zero());

        let qr = QrConfig {
            session_ttl_seconds: -5,
            retention_seconds: i64::MAX,
            ..QrConfig::default()
        };
        assert_eq!(qr.session_ttl(), Duration::seconds(1));
        assert_eq!(qr.retention(), Duration::days(30));

        let defaults = QrConfig::default();
        assert_eq!(defaults.session_ttl(), Duration::seconds(300));
        assert_eq!(defaults.retention(), Duration::hours(1));
    }

    #[test]
    fn env_overrides_nested_keys() {
        Jail::expect_with(|jail| {
            jail.set_env("ATTENDANCE_QR__SESSION_TTL_SECONDS", "120");
            jail.set_env("DATABASE_URL", "postgres://db.internal/attendance");
            let config = Config::load()?;
            assert_eq!(config.qr.session_ttl_seconds, 120);
            assert_eq!(config.database.url, "postgres://db.internal/attendance");
            Ok(())
        });
    }

    #[test]
    fn toml_file_is_layered_under_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Attendance.toml",
                r#"
                [rate_limit]
                read_limit = 10

                [qr]
                public_url = "https://attendance.example.edu"
                "#,
            )?;
            jail.set_env("ATTENDANCE_RATE_LIMIT__READ_LIMIT", "20");
            let config = Config::load()?;
            assert_eq!(config.rate_limit.read_limit, 20);
            assert_eq!(config.qr.public_url, "https://attendance.example.edu");
            Ok(())
        });
    }
}
