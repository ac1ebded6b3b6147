//! Application configuration.
//!
//! Fixed names and MIME types are constants. Server settings come from the
//! environment (a `.env` file is honored) with the defaults below; CLI flags
//! override them.

use std::env;

use crate::error::ConfigError;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default upload size limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Rows covered by the template's dropdown validation.
pub const DEFAULT_TEMPLATE_ROWS: u32 = 500;

/// Sheet name of the blank template.
pub const TEMPLATE_SHEET_NAME: &str = "名單";

/// Download name of the blank template.
pub const TEMPLATE_FILE_NAME: &str = "學生名單_樣板.xlsx";

/// Download name of the all-classes archive.
pub const BUNDLE_FILE_NAME: &str = "全部班級_游泳課名單.zip";

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const ZIP_MIME: &str = "application/zip";

/// Download name of one class export.
pub fn class_file_name(class_id: &str) -> String {
    crate::export::entry_name(class_id)
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
    pub template_rows: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            template_rows: DEFAULT_TEMPLATE_ROWS,
        }
    }
}

impl ServerConfig {
    /// Load from `SWIMROLL_PORT`, `SWIMROLL_MAX_UPLOAD_BYTES` and
    /// `SWIMROLL_TEMPLATE_ROWS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            port: parse_var(&lookup, "SWIMROLL_PORT", defaults.port)?,
            max_upload_bytes: parse_var(&lookup, "SWIMROLL_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            template_rows: parse_var(&lookup, "SWIMROLL_TEMPLATE_ROWS", defaults.template_rows)?,
        })
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}
