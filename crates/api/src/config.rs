use std::path::PathBuf;
use std::str::FromStr;

use zipdesk_core::extract::{self, ExtractLimits};
use zipdesk_core::registry::StoreLimits;
use zipdesk_core::walk::{self, WalkOptions};

/// Headroom on top of the upload limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`).
    pub request_timeout_secs: u64,
    /// Base directory holding `uploads/`, `extracted/` and `packages/`.
    pub data_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub max_extract_entries: usize,
    pub max_extract_bytes: u64,
    pub max_walk_depth: usize,
    pub max_walk_entries: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `120`                      |
    /// | `DATA_DIR`             | `.`                        |
    /// | `MAX_UPLOAD_BYTES`     | `104857600` (100 MiB)      |
    /// | `MAX_EXTRACT_ENTRIES`  | `10000`                    |
    /// | `MAX_EXTRACT_BYTES`    | `1073741824` (1 GiB)       |
    /// | `MAX_WALK_DEPTH`       | `64`                       |
    /// | `MAX_WALK_ENTRIES`     | `100000`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Self {
            host,
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 120),
            data_dir,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", extract::DEFAULT_MAX_UPLOAD_BYTES),
            max_extract_entries: env_or("MAX_EXTRACT_ENTRIES", extract::DEFAULT_MAX_ENTRIES),
            max_extract_bytes: env_or("MAX_EXTRACT_BYTES", extract::DEFAULT_MAX_TOTAL_BYTES),
            max_walk_depth: env_or("MAX_WALK_DEPTH", walk::DEFAULT_MAX_DEPTH),
            max_walk_entries: env_or("MAX_WALK_ENTRIES", walk::DEFAULT_MAX_ENTRIES),
        }
    }

    /// Limits handed to the project store.
    pub fn store_limits(&self) -> StoreLimits {
        StoreLimits {
            max_upload_bytes: self.max_upload_bytes,
            extract: ExtractLimits {
                max_entries: self.max_extract_entries,
                max_total_bytes: self.max_extract_bytes,
                max_depth: self.max_walk_depth,
            },
            walk: WalkOptions {
                max_depth: self.max_walk_depth,
                max_entries: self.max_walk_entries,
                ..WalkOptions::default()
            },
        }
    }

    /// Request body limit: the upload limit plus multipart framing.
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES))
            .unwrap_or(usize::MAX)
    }
}

/// Parse an env var, falling back to `default` when unset.
///
/// Panics on an unparsable value so misconfiguration fails at startup.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid number: {e}")),
        Err(_) => default,
    }
}
