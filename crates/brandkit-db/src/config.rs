use brandkit_core::AppError;

/// Connection settings for the Postgres project store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Reads `DATABASE_URL` (required) and `DATABASE_MAX_CONNECTIONS` (default 5).
    pub fn from_env() -> Result<Self, AppError> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| AppError::ConfigError("DATABASE_URL not set".into()))?;
        Self::from_parts(url, std::env::var("DATABASE_MAX_CONNECTIONS").ok())
    }

    /// Like [`from_env`](Self::from_env), but `None` when `DATABASE_URL` is
    /// unset or blank. Used by callers that fall back to the in-memory store.
    pub fn from_env_optional() -> Result<Option<Self>, AppError> {
        match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::from_parts(
                url,
                std::env::var("DATABASE_MAX_CONNECTIONS").ok(),
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    fn from_parts(url: String, max_connections: Option<String>) -> Result<Self, AppError> {
        let max_connections = match max_connections {
            None => 5,
            Some(raw) => {
                let parsed: u32 = raw.trim().parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid DATABASE_MAX_CONNECTIONS '{raw}': must be a positive integer"
                    ))
                })?;
                if parsed == 0 {
                    return Err(AppError::ConfigError(
                        "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
                    ));
                }
                parsed
            }
        };

        Ok(Self {
            url,
            max_connections,
        })
    }
}
