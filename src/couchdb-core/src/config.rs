use serde::{Deserialize, Serialize};

pub const ENV_BASE_URL: &str = "COUCHDB_BASE_URL";
pub const ENV_USERNAME: &str = "COUCHDB_USERNAME";
pub const ENV_PASSWORD: &str = "COUCHDB_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Empty means unauthenticated.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5984".to_string()
}

/// Basic-Auth credentials. Only exist when both parts are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { username, password })
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Read `COUCHDB_BASE_URL`, `COUCHDB_USERNAME` and `COUCHDB_PASSWORD`,
    /// falling back to the defaults for unset variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var(ENV_BASE_URL).unwrap_or(defaults.base_url),
            username: std::env::var(ENV_USERNAME).unwrap_or(defaults.username),
            password: std::env::var(ENV_PASSWORD).unwrap_or(defaults.password),
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: String::new(),
            password: String::new(),
        }
    }
}
