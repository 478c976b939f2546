use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

fn default_cache_timeout() -> u32 {
    30
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration d'un roster, persistée en JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Nom court, utilisé aussi pour nommer le fichier de cache.
    pub name: String,
    pub calendar_id: String,
    #[serde(default)]
    pub min_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_start: Option<DateTime<Utc>>,
    /// Décalage (heures) appliqué aux évènements « journée entière ».
    #[serde(default)]
    pub all_day_offset: i32,
    /// Durée de validité du cache, en minutes.
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout: u32,
    #[serde(default)]
    pub cache_directory: Option<PathBuf>,
    /// Fuseau IANA pour l'affichage et les rapports (UTC par défaut).
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub fallback_email: Option<String>,
    #[serde(default)]
    pub fallback_phone: Option<String>,
    pub events_path: PathBuf,
    pub contacts_path: PathBuf,
    /// Répertoire du fichier de configuration, base des chemins relatifs.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl RosterConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg: RosterConfig =
            serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.base_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("roster name cannot be empty".into()));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(ConfigError::Invalid(format!(
                "roster name {:?} may only contain ASCII letters, digits and .-_",
                self.name
            )));
        }
        if self.calendar_id.trim().is_empty() {
            return Err(ConfigError::Invalid("calendar_id cannot be empty".into()));
        }
        if self.cache_timeout == 0 {
            return Err(ConfigError::Invalid("cache_timeout must be > 0".into()));
        }
        if let (Some(min_end), Some(max_start)) = (self.min_end, self.max_start) {
            if max_start <= min_end {
                return Err(ConfigError::Invalid(
                    "max_start must be after min_end".into(),
                ));
            }
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        match self.timezone.as_deref() {
            None => Ok(Tz::UTC),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::Invalid(format!("unknown timezone {name:?}"))),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        match &self.cache_directory {
            Some(dir) => self.resolve(dir),
            None => self.base_dir.clone(),
        }
    }

    pub fn events_file(&self) -> PathBuf {
        self.resolve(&self.events_path)
    }

    pub fn contacts_file(&self) -> PathBuf {
        self.resolve(&self.contacts_path)
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }
}
