//! Configuration management.
//!
//! Settings are loaded from `~/.campus-report/config.json`; environment
//! variables take precedence over the file, and built-in defaults fill the
//! rest:
//!
//! - `CAMPUS_BACKEND_URL` - Primary REST API root (default: `http://localhost:8001`)
//! - `CAMPUS_FIREBASE_PROJECT_ID` - Firestore project for the mirror
//! - `CAMPUS_FIREBASE_API_KEY` - Web API key sent to Firestore/Storage
//! - `CAMPUS_FIREBASE_STORAGE_BUCKET` - Blob storage bucket for photos
//! - `CAMPUS_MIRROR_BACKEND` - `firestore` or `sqlite`
//! - `CAMPUS_MIRROR_DB` - SQLite mirror path (default: `~/.campus-report/mirror.db`)
//! - `CAMPUS_MAX_IMAGE_WIDTH` - Resize bound in pixels (default: 800)
//! - `CAMPUS_CREATE_TIMEOUT_SECS` - Primary create timeout (default: 10)
//! - `CAMPUS_REQUEST_TIMEOUT_SECS` - Timeout for other HTTP calls (default: 30)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::imaging::DEFAULT_MAX_WIDTH;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";
pub const DEFAULT_CREATE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Which database backs the secondary mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorKind {
    Firestore,
    Sqlite,
}

impl std::fmt::Display for MirrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Firestore => write!(f, "firestore"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for MirrorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::Config(format!(
                "Unknown mirror backend '{other}' (expected firestore or sqlite)"
            ))),
        }
    }
}

/// On-disk configuration file. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampusConfig {
    pub backend_url: Option<String>,
    pub firebase_project_id: Option<String>,
    pub firebase_api_key: Option<String>,
    pub firebase_storage_bucket: Option<String>,
    pub mirror_backend: Option<MirrorKind>,
    pub mirror_db: Option<PathBuf>,
    pub max_image_width: Option<u32>,
    pub create_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Primary API root without the `/api` prefix or a trailing slash.
    pub backend_url: String,
    pub firebase_project_id: Option<String>,
    pub firebase_api_key: Option<String>,
    pub storage_bucket: Option<String>,
    pub mirror: MirrorKind,
    pub mirror_db: PathBuf,
    pub max_image_width: u32,
    pub create_timeout: Duration,
    pub request_timeout: Duration,
}

/// Get the config directory (`~/.campus-report`).
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".campus-report"))
}

/// Get the config file path.
fn config_path() -> Result<PathBuf> {
    config_dir()
        .map(|d| d.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load the configuration file, or defaults when it does not exist.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<CampusConfig> {
    load_config_from(&config_path()?)
}

/// Load a configuration file from an explicit path.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<CampusConfig> {
    if !path.exists() {
        return Ok(CampusConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

impl Settings {
    /// Resolve settings from the process environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns `Config` for unreadable files or invalid values.
    pub fn resolve() -> Result<Self> {
        let file = load_config()?;
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Resolve settings from a parsed file and an environment lookup.
    ///
    /// Priority: env var > config file > default. Empty env values are
    /// treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `Config` for unparseable numbers, an unknown mirror backend,
    /// or a Firestore mirror without a project id.
    pub fn from_sources(file: CampusConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let backend_url = env("CAMPUS_BACKEND_URL")
            .or(file.backend_url)
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let firebase_project_id = env("CAMPUS_FIREBASE_PROJECT_ID").or(file.firebase_project_id);
        let firebase_api_key = env("CAMPUS_FIREBASE_API_KEY").or(file.firebase_api_key);
        let storage_bucket = env("CAMPUS_FIREBASE_STORAGE_BUCKET").or(file.firebase_storage_bucket);

        let mirror = match env("CAMPUS_MIRROR_BACKEND") {
            Some(raw) => raw.parse()?,
            None => file.mirror_backend.unwrap_or(if firebase_project_id.is_some() {
                MirrorKind::Firestore
            } else {
                MirrorKind::Sqlite
            }),
        };
        if mirror == MirrorKind::Firestore && firebase_project_id.is_none() {
            return Err(Error::Config(
                "Firestore mirror selected but no project id configured".into(),
            ));
        }

        let mirror_db = env("CAMPUS_MIRROR_DB")
            .map(PathBuf::from)
            .or(file.mirror_db)
            .or_else(|| config_dir().map(|d| d.join("mirror.db")))
            .unwrap_or_else(|| PathBuf::from("campus-mirror.db"));

        let max_image_width = parse_env(&env, "CAMPUS_MAX_IMAGE_WIDTH")?
            .or(file.max_image_width)
            .unwrap_or(DEFAULT_MAX_WIDTH);
        if max_image_width == 0 {
            return Err(Error::Config("max_image_width must be positive".into()));
        }

        let create_timeout_secs = parse_env(&env, "CAMPUS_CREATE_TIMEOUT_SECS")?
            .or(file.create_timeout_secs)
            .unwrap_or(DEFAULT_CREATE_TIMEOUT_SECS);
        let request_timeout_secs = parse_env(&env, "CAMPUS_REQUEST_TIMEOUT_SECS")?
            .or(file.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if create_timeout_secs == 0 || request_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be at least one second".into()));
        }

        Ok(Self {
            backend_url,
            firebase_project_id,
            firebase_api_key,
            storage_bucket,
            mirror,
            mirror_db,
            max_image_width,
            create_timeout: Duration::from_secs(create_timeout_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    /// Root of the REST endpoints (`{backend_url}/api`).
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("{}/api", self.backend_url)
    }
}

fn parse_env<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    env(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key} is not a valid number: {raw}")))
        })
        .transpose()
}
