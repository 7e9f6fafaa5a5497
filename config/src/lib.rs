pub mod paths;
pub mod settings;

pub use paths::PathManager;
pub use settings::Settings;

/// Environment variable holding the Gemini credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Load environment variables from .env files.
/// Loads ./.env (project directory) first, then ~/.env (home directory).
/// Variables already set are never overwritten, so the process environment wins,
/// then the project file, then the home file.
/// Call this before parsing CLI args to ensure env vars are available.
pub fn load_env_file() {
    dotenv::dotenv().ok();

    if let Some(home) = dirs::home_dir() {
        dotenv::from_path(home.join(".env")).ok();
    }
}

/// Read the Gemini API key. An absent key yields an empty string; the remote
/// service rejects the request and that failure is reported to the user.
pub fn api_key() -> String {
    std::env::var(API_KEY_ENV).unwrap_or_default()
}
