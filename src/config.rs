use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "csvsight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Gemini model used when GEMINI_MODEL is not set.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Public Gemini API endpoint used when GEMINI_BASE_URL is not set.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "info,csvsight=debug"
}

/// Get the application data directory (~/.csvsight/).
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(".csvsight")
}

/// Process-wide configuration, read from the environment once at startup
/// and treated as immutable thereafter.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub gemini_base_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
}

impl Config {
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("CSVSIGHT_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let database_path = std::env::var("CSVSIGHT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| app_data_dir().join("reports.db"));
        let gemini_base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());
        let gemini_api_key = std::env::var("GOOGLE_API_KEY").unwrap_or_default();
        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self {
            bind_addr,
            database_path,
            gemini_base_url,
            gemini_api_key,
            gemini_model,
        }
    }
}
