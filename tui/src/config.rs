use std::path::PathBuf;

const DEFAULT_BACKEND_ADDR: &str = "localhost:8080";
const DEFAULT_LOCAL_STORE: &str = "roomchat-local.json";
const DEFAULT_LOG_FILE: &str = "roomchat.log";

#[derive(Debug, Clone)]
pub struct Config {
    /// Host and port of the backend
    pub backend_addr: String,
    /// Where the display name and session flag are kept between runs
    pub local_store_path: PathBuf,
    pub log_file: PathBuf,
}

impl Config {
    /// Reads the `ROOMCHAT_*` variables, from the environment or a `.env` file
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| dotenv::var(key).unwrap_or_else(|_| default.into());

        Config {
            backend_addr: var("ROOMCHAT_BACKEND_ADDR", DEFAULT_BACKEND_ADDR),
            local_store_path: var("ROOMCHAT_LOCAL_STORE", DEFAULT_LOCAL_STORE).into(),
            log_file: var("ROOMCHAT_LOG_FILE", DEFAULT_LOG_FILE).into(),
        }
    }
}
