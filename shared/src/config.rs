use crate::TtlMs;
use std::str::FromStr;
use tracing::warn;

/// Settings for one fast-store instance. Every cached entity type gets its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreSettings {
    pub name: String,
    pub ttl: TtlMs,
    pub max_entries: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheSettings {
    pub cinemas: StoreSettings,
    pub cities_cinemas: StoreSettings,
    pub cities: StoreSettings,
    pub halls: StoreSettings,
    pub halls_configurations: StoreSettings,
}

impl CacheSettings {
    pub fn all(&self) -> [&StoreSettings; 5] {
        [
            &self.cinemas,
            &self.cities_cinemas,
            &self.cities,
            &self.halls,
            &self.halls_configurations,
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteBackSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub job_timeout: TtlMs,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub data_dir: String,
    pub seed_path: Option<String>,
    pub log_level: String,
    pub request_timeout: TtlMs,
    pub allowed_origins: Vec<String>,
    pub write_back: WriteBackSettings,
    pub cache: CacheSettings,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8080;
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_LOG_LEVEL: &str = "info";
    const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
    const DEFAULT_WRITE_BACK_WORKERS: usize = 4;
    const DEFAULT_WRITE_BACK_QUEUE: usize = 1024;
    const DEFAULT_WRITE_BACK_TIMEOUT_MS: u64 = 2_000;

    const HOUR_MS: u64 = 3_600_000;

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = |prefix: &str, name: &str, default_ttl_ms: u64| StoreSettings {
            name: name.to_string(),
            ttl: TtlMs(parse_or(
                &lookup,
                &format!("{prefix}_TTL_MS"),
                default_ttl_ms,
            )),
            max_entries: parse_opt(&lookup, &format!("{prefix}_MAX_ENTRIES")),
        };

        let cache = CacheSettings {
            cinemas: store("CINEMAS_CACHE", "cinemas", Self::HOUR_MS),
            cities_cinemas: store("CITIES_CINEMAS_CACHE", "cities_cinemas", Self::HOUR_MS),
            cities: store("CITIES_CACHE", "cities", 2 * Self::HOUR_MS),
            halls: store("HALLS_CACHE", "halls", Self::HOUR_MS),
            halls_configurations: store(
                "HALLS_CONFIGURATIONS_CACHE",
                "halls_configurations",
                24 * Self::HOUR_MS,
            ),
        };

        Self {
            host: lookup("CINEMA_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port: parse_or(&lookup, "CINEMA_HTTP_PORT", Self::DEFAULT_HTTP_PORT),
            data_dir: lookup("CINEMA_DATA_DIR")
                .unwrap_or_else(|| Self::DEFAULT_DATA_DIR.to_string()),
            seed_path: lookup("CINEMA_SEED_PATH").filter(|path| !path.trim().is_empty()),
            log_level: lookup("CINEMA_LOG_LEVEL")
                .unwrap_or_else(|| Self::DEFAULT_LOG_LEVEL.to_string()),
            request_timeout: TtlMs(parse_or(
                &lookup,
                "CINEMA_REQUEST_TIMEOUT_MS",
                Self::DEFAULT_REQUEST_TIMEOUT_MS,
            )),
            allowed_origins: lookup("CINEMA_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            write_back: WriteBackSettings {
                workers: parse_or(
                    &lookup,
                    "CINEMA_WRITE_BACK_WORKERS",
                    Self::DEFAULT_WRITE_BACK_WORKERS,
                )
                .max(1),
                queue_capacity: parse_or(
                    &lookup,
                    "CINEMA_WRITE_BACK_QUEUE",
                    Self::DEFAULT_WRITE_BACK_QUEUE,
                )
                .max(1),
                job_timeout: TtlMs(parse_or(
                    &lookup,
                    "CINEMA_WRITE_BACK_TIMEOUT_MS",
                    Self::DEFAULT_WRITE_BACK_TIMEOUT_MS,
                )),
            },
            cache,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{key}='{raw}' is not valid, using default {default}");
            default
        }),
        None => default,
    }
}

fn parse_opt<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{key}='{raw}' is not valid, ignoring it");
            None
        }
    }
}
