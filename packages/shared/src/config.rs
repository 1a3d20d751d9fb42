use std::fmt;

/// Key prefixes of the document families sharing one bucket.
pub const ENTITIES_PREFIX: &str = "entities/";
pub const USERS_PREFIX: &str = "users/";
pub const GAMES_PREFIX: &str = "games/";

/// Limits applied by the document repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub max_payload_bytes: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            max_payload_bytes: 1024 * 1024,
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}

impl RepositoryConfig {
    /// Page size for a listing request, clamped to `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    S3 { bucket: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub repository: RepositoryConfig,
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => {
                write!(f, "{} environment variable must be set", name)
            }
            ConfigError::Invalid { name, value } => {
                write!(f, "Invalid value for {}: {}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match lookup("STORE_BACKEND").as_deref().unwrap_or("s3") {
            "s3" => StoreBackend::S3 {
                bucket: lookup("DOCUMENTS_BUCKET")
                    .filter(|bucket| !bucket.is_empty())
                    .ok_or(ConfigError::Missing("DOCUMENTS_BUCKET"))?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let defaults = RepositoryConfig::default();
        let repository = RepositoryConfig {
            max_payload_bytes: parse_positive(
                &lookup,
                "MAX_PAYLOAD_BYTES",
                defaults.max_payload_bytes,
            )?,
            default_page_size: parse_positive(
                &lookup,
                "DEFAULT_PAGE_SIZE",
                defaults.default_page_size,
            )?,
            max_page_size: parse_positive(&lookup, "MAX_PAGE_SIZE", defaults.max_page_size)?,
        };
        if repository.default_page_size > repository.max_page_size {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_PAGE_SIZE",
                value: repository.default_page_size.to_string(),
            });
        }

        Ok(AppConfig {
            store,
            repository,
            jwt_secret: lookup("JWT_SECRET").filter(|secret| !secret.is_empty()),
        })
    }
}

fn parse_positive<F>(lookup: &F, name: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<usize>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}
