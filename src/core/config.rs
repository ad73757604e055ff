use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingVar(&'static str),
}

const DEFAULT_COROOT_URL: &str = "http://localhost:8080";

/// Runtime configuration, sourced from the environment before any network
/// call. Missing or empty required credentials are a startup error.
#[derive(Debug, Clone)]
pub struct Config {
    pub hetzner_token: String,
    pub coroot_email: String,
    pub coroot_password: String,
    /// Base URL of the Coroot instance, trailing slash trimmed.
    pub coroot_url: String,
    /// Explicit project override; discovery runs when unset.
    pub coroot_project: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            match get(key) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(ConfigError::MissingVar(key)),
            }
        };

        let hetzner_token = required("HETZNER_TOKEN")?;
        let coroot_email = required("COROOT_EMAIL")?;
        let coroot_password = required("COROOT_PASSWORD")?;

        let coroot_url = get("COROOT_URL")
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_COROOT_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let coroot_project = get("COROOT_PROJECT").filter(|name| !name.is_empty());

        Ok(Self {
            hetzner_token,
            coroot_email,
            coroot_password,
            coroot_url,
            coroot_project,
        })
    }
}
