//! Application settings.
//!
//! All configuration comes from the environment (a `.env` file is honored
//! via `dotenv` in `main`). The only fatal validation is the missing LLM
//! credential: the process must not serve traffic without it.

use std::env;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["txt", "md", "pdf", "docx"];

/// 10 MB default upload/ingest bound.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const DEFAULT_CHAT_MODEL: &str = "gpt-4";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is required")]
    MissingApiKey,
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub google_search_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub max_file_size: u64,
    pub max_sessions: usize,
}

impl Settings {
    /// Read settings from the environment. Creates the data and log
    /// directories as a side effect so later components can assume they
    /// exist.
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = non_empty_var("OPENAI_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let data_dir = non_empty_var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let log_dir = data_dir.join("logs");

        let port = parse_var("PORT", 8000u16)?;
        let max_file_size = parse_var("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?;
        let max_sessions = parse_var("MAX_SESSIONS", 256usize)?;

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        Ok(Settings {
            openai_api_key,
            openai_base_url: non_empty_var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            chat_model: non_empty_var("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: non_empty_var("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            data_dir,
            log_dir,
            host: non_empty_var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            google_search_api_key: non_empty_var("GOOGLE_SEARCH_API_KEY"),
            google_search_engine_id: non_empty_var("GOOGLE_SEARCH_ENGINE_ID"),
            max_file_size,
            max_sessions,
        })
    }

    pub fn store_db_path(&self) -> PathBuf {
        self.data_dir.join("vector_store.db")
    }

    /// Both credentials are required for the Google Custom Search API.
    pub fn search_credentials(&self) -> Option<(String, String)> {
        match (&self.google_search_api_key, &self.google_search_engine_id) {
            (Some(key), Some(engine)) => Some((key.clone(), engine.clone())),
            _ => None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
    }
}
