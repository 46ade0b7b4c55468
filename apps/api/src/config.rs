use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_client_id: String,
    pub admin_emails: Vec<String>,
    /// Shared secret that grants admin access without token verification.
    /// Disabled unless explicitly configured.
    pub admin_bypass_secret: Option<String>,
    pub port: u16,
    pub database_url: String,
    /// Root for `uploads/` and `public/generated/`.
    pub data_dir: PathBuf,
    pub client_dist_dir: Option<PathBuf>,
    pub font_dir: Option<PathBuf>,
    pub fallback_font_family: String,
    pub max_upload_bytes: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            google_client_id: require_env("GOOGLE_CLIENT_ID")?,
            admin_emails: parse_admin_emails(
                &std::env::var("ALLOWED_ADMIN_EMAILS").unwrap_or_default(),
            ),
            admin_bypass_secret: optional_env("ADMIN_BYPASS_SECRET"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:database.sqlite".to_string()),
            data_dir: optional_env("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            client_dist_dir: optional_env("CLIENT_DIST_DIR").map(PathBuf::from),
            font_dir: optional_env("FONT_DIR").map(PathBuf::from),
            fallback_font_family: optional_env("FALLBACK_FONT_FAMILY")
                .unwrap_or_else(|| "DejaVu Sans".to_string()),
            max_upload_bytes: match optional_env("MAX_UPLOAD_BYTES") {
                Some(v) => v
                    .parse::<usize>()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
                None => DEFAULT_MAX_UPLOAD_BYTES,
            },
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Directory uploaded card templates are written to.
    pub fn cards_upload_dir(&self) -> PathBuf {
        self.uploads_dir().join("cards")
    }

    /// Served read-only under `/uploads`.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Served read-only under `/generated`.
    pub fn generated_dir(&self) -> PathBuf {
        self.data_dir.join("public").join("generated")
    }
}

/// Splits the comma-separated allow-list, trimming whitespace and dropping empty entries.
pub fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
impl Config {
    pub fn for_tests(data_dir: PathBuf) -> Self {
        Config {
            google_client_id: "test-client".to_string(),
            admin_emails: vec!["admin@example.com".to_string()],
            admin_bypass_secret: Some("s3cret".to_string()),
            port: 3000,
            database_url: "sqlite::memory:".to_string(),
            data_dir,
            client_dist_dir: None,
            font_dir: None,
            fallback_font_family: "DejaVu Sans".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            rust_log: "info".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_emails_trims_and_drops_empty() {
        let emails = parse_admin_emails(" alice@example.com, bob@example.com ,,");
        assert_eq!(emails, vec!["alice@example.com", "bob@example.com"]);
    }

    #[test]
    fn test_parse_admin_emails_empty_input() {
        assert!(parse_admin_emails("").is_empty());
        assert!(parse_admin_emails("  ,  ").is_empty());
    }

    #[test]
    fn test_derived_directories() {
        let config = Config::for_tests(PathBuf::from("/srv/cards"));
        assert_eq!(config.cards_upload_dir(), PathBuf::from("/srv/cards/uploads/cards"));
        assert_eq!(config.generated_dir(), PathBuf::from("/srv/cards/public/generated"));
    }
}
