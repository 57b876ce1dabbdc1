use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use gamex_db::StoreConfig;
use gamex_types::Profile;

/// Placeholder secret used when none is configured. Fine for local runs only.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

const DEFAULT_ADMIN_PIN: &str = "8180";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    pub admin_pin: AdminPin,
    pub jwt_secret: String,
    pub profile_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPin {
    Plain(String),
    /// Argon2 PHC string, used as-is.
    Hash(String),
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("GAMEX_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("GAMEX_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("GAMEX_PORT must be a port number")?;

        let backend = var("GAMEX_BACKEND").unwrap_or_else(|| "sqlite".into());
        let store = match backend.trim().to_ascii_lowercase().as_str() {
            "sqlite" => {
                let path = match (var("GAMEX_DB_PATH"), var("DATABASE_URL")) {
                    (Some(path), _) => PathBuf::from(path),
                    (None, Some(url)) => sqlite_path_from_url(&url)?,
                    (None, None) => PathBuf::from("data.db"),
                };
                StoreConfig::Sqlite(path)
            }
            "json" => StoreConfig::Json(
                var("GAMEX_DATA_FILE")
                    .unwrap_or_else(|| "data.json".into())
                    .into(),
            ),
            other => bail!("GAMEX_BACKEND must be 'sqlite' or 'json', got '{}'", other),
        };

        let admin_pin = match var("GAMEX_ADMIN_PIN_HASH") {
            Some(hash) => AdminPin::Hash(hash.trim().to_string()),
            None => AdminPin::Plain(
                var("GAMEX_ADMIN_PIN").unwrap_or_else(|| DEFAULT_ADMIN_PIN.into()),
            ),
        };

        Ok(Self {
            host,
            port,
            store,
            admin_pin,
            jwt_secret: var("GAMEX_JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.into()),
            profile_path: var("GAMEX_PROFILE_PATH").map(PathBuf::from),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Built-in profile, overridden field by field from `GAMEX_PROFILE_PATH`.
    pub fn load_profile(&self) -> Result<Profile> {
        let Some(path) = &self.profile_path else {
            return Ok(Profile::default());
        };
        let raw = std::fs::read(path)
            .with_context(|| format!("read profile {}", path.display()))?;
        let profile = serde_json::from_slice(&raw)
            .with_context(|| format!("parse profile {}", path.display()))?;
        Ok(profile)
    }
}

/// Accepts `sqlite://relative.db`, `sqlite:///relative.db` and
/// `sqlite:////abs/path.db`, the forms SQLAlchemy-style URLs use.
fn sqlite_path_from_url(url: &str) -> Result<PathBuf> {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        bail!("DATABASE_URL must be a sqlite:// URL, got '{}'", url);
    };
    let path = rest.strip_prefix('/').unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        bail!("DATABASE_URL must name a database file");
    }
    Ok(PathBuf::from(path))
}
