use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api-atlas.nomic.ai/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text-v1.5";
const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";

/// Filesystem locations for the backend's local data.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub index_db_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let user_data_dir = discover_user_data_dir();
        let log_dir = user_data_dir.join("logs");
        let index_db_path = user_data_dir.join("pagepilot_index.db");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            user_data_dir,
            log_dir,
            index_db_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_user_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("PAGEPILOT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("PagePilot");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("PagePilot");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("pagepilot")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Which vector index implementation backs the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBackend {
    /// Hosted Pinecone index, reached over its REST API.
    Pinecone,
    /// Local SQLite file with brute-force cosine search.
    Sqlite,
}

/// Runtime configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub allowed_origins: Vec<String>,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embedding_dimension: usize,

    pub embedding_base_url: String,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,

    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,

    pub index_backend: IndexBackend,
    pub pinecone_host: Option<String>,
    pub pinecone_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let pinecone_host = env_opt("PINECONE_INDEX_HOST");
        let pinecone_api_key = env_opt("PINECONE_API_KEY");

        // Pinecone only when fully configured; otherwise fall back to the
        // local SQLite index so the server works out of the box.
        let index_backend = match env_opt("PAGEPILOT_INDEX_BACKEND").as_deref() {
            Some("pinecone") => IndexBackend::Pinecone,
            Some("sqlite") => IndexBackend::Sqlite,
            _ => {
                if pinecone_host.is_some() && pinecone_api_key.is_some() {
                    IndexBackend::Pinecone
                } else {
                    IndexBackend::Sqlite
                }
            }
        };

        AppConfig {
            port: env_parse("PORT", 8000),
            allowed_origins: resolve_allowed_origins(),
            chunk_size: env_parse("PAGEPILOT_CHUNK_SIZE", DEFAULT_CHUNK_SIZE),
            chunk_overlap: env_parse("PAGEPILOT_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP),
            top_k: env_parse("PAGEPILOT_TOP_K", DEFAULT_TOP_K),
            embedding_dimension: env_parse(
                "PAGEPILOT_EMBEDDING_DIMENSION",
                DEFAULT_EMBEDDING_DIMENSION,
            ),
            embedding_base_url: env_or("PAGEPILOT_EMBEDDING_BASE_URL", DEFAULT_EMBEDDING_BASE_URL),
            embedding_model: env_or("PAGEPILOT_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_api_key: env_opt("NOMIC_API_KEY"),
            llm_base_url: env_or("PAGEPILOT_LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
            llm_model: env_or("PAGEPILOT_LLM_MODEL", DEFAULT_LLM_MODEL),
            llm_api_key: env_opt("GEMINI_API_KEY"),
            index_backend,
            pinecone_host,
            pinecone_api_key,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn resolve_allowed_origins() -> Vec<String> {
    if let Some(raw) = env_opt("PAGEPILOT_ALLOWED_ORIGINS") {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| item.to_string())
            .collect();
        if !origins.is_empty() {
            return origins;
        }
    }

    default_local_origins()
}

/// Placeholder for the extension's installed id; real deployments set
/// `PAGEPILOT_ALLOWED_ORIGINS` with the actual `chrome-extension://` origin.
const DEFAULT_EXTENSION_ORIGIN: &str = "chrome-extension://your-extension-id";

fn default_local_origins() -> Vec<String> {
    vec![
        DEFAULT_EXTENSION_ORIGIN.to_string(),
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_origins_cover_extension_and_localhost() {
        let origins = default_local_origins();
        assert!(origins
            .iter()
            .any(|o| o.starts_with("chrome-extension://")));
        assert!(origins.iter().any(|o| o.contains("localhost")));
    }

    #[test]
    fn origins_split_and_trim() {
        std::env::set_var(
            "PAGEPILOT_ALLOWED_ORIGINS",
            "chrome-extension://abc , http://localhost:3000,",
        );
        let origins = resolve_allowed_origins();
        std::env::remove_var("PAGEPILOT_ALLOWED_ORIGINS");

        assert_eq!(
            origins,
            vec![
                "chrome-extension://abc".to_string(),
                "http://localhost:3000".to_string()
            ]
        );
    }
}
