use anyhow::Context;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
}

impl Config {
    /// Reads `ROOMCHAT_PORT`, from the environment or a `.env` file
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match dotenv::var("ROOMCHAT_PORT") {
            Ok(port) => port
                .parse()
                .with_context(|| format!("ROOMCHAT_PORT '{}' is not a port number", port))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Config { port })
    }
}
