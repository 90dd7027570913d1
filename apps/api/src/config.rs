use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Application configuration loaded from environment variables once at startup.
/// Shared read-only through `AppState`; nothing mutates it after `from_env` returns.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub llm_timeout: Duration,
    pub llm_retry_backoff: Duration,
    /// Uploaded originals and generated PDFs.
    pub upload_dir: PathBuf,
    /// Word-cloud images, served under `/static/resumes`.
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// TrueType font for the word cloud. `None` means search the usual system locations.
    pub wordcloud_font: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: env_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: env_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 60)?),
            llm_retry_backoff: Duration::from_millis(parse_env("LLM_RETRY_BACKOFF_MS", 1000)?),
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "resumes")),
            static_dir: PathBuf::from(env_or("STATIC_DIR", "static/resumes")),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            wordcloud_font: std::env::var("WORDCLOUD_FONT").ok().map(PathBuf::from),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Configuration rooted in a scratch directory, pointing the LLM at `base_url`.
    #[cfg(test)]
    pub fn for_tests(root: &std::path::Path, base_url: &str) -> Self {
        Config {
            openai_api_key: "test-key".to_string(),
            openai_base_url: base_url.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            llm_timeout: Duration::from_secs(5),
            llm_retry_backoff: Duration::from_millis(10),
            upload_dir: root.join("resumes"),
            static_dir: root.join("static").join("resumes"),
            max_upload_bytes: 10 * 1024 * 1024,
            wordcloud_font: None,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_padded_number() {
        let port: u16 = parse_value("PORT", " 9090 ").unwrap();
        assert_eq!(port, 9090);
    }

    #[test]
    fn test_parse_value_error_names_the_variable() {
        let err = parse_value::<u64>("LLM_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("LLM_TIMEOUT_SECS"));
    }

    #[test]
    fn test_parse_value_rejects_out_of_range_port() {
        assert!(parse_value::<u16>("PORT", "70000").is_err());
    }

    #[test]
    fn test_for_tests_keeps_directories_under_root() {
        let root = std::path::Path::new("/tmp/advisor");
        let config = Config::for_tests(root, "http://127.0.0.1:1");
        assert!(config.upload_dir.starts_with(root));
        assert!(config.static_dir.starts_with(root));
        assert_ne!(config.upload_dir, config.static_dir);
    }
}
