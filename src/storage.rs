use crate::model::{Contact, Shift};
use chrono::{DateTime, Duration, Utc};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cache file {0} not found")]
    NotFound(PathBuf),
    #[error("cache file {0} is empty")]
    Empty(PathBuf),
    #[error("cache file {path}, line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cache file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl StoreError {
    /// Vrai pour les erreurs qui justifient un rafraîchissement du cache.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::Empty(_))
    }
}

pub trait ShiftStore {
    /// Charge tous les shifts persistés.
    fn load(&self) -> Result<Vec<Shift>, StoreError>;
    /// Sauvegarde de manière atomique.
    fn save(&self, shifts: &[Shift]) -> Result<(), StoreError>;
    /// Date de dernière écriture, `None` si jamais écrit.
    fn timestamp(&self) -> Option<DateTime<Utc>>;

    /// Âge du cache à l'instant `now`, `None` si inconnu.
    fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.timestamp().map(|ts| now - ts)
    }
}

/// Cache fichier : une ligne par shift, champs séparés par des tabulations.
///
/// `start  end  name  email  phone`, dates RFC3339, champs absents vides.
#[derive(Debug, Clone)]
pub struct TsvStore {
    path: PathBuf,
}

impl TsvStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Emplacement conventionnel `<dir>/<name>.cache`.
    pub fn for_roster<P: AsRef<Path>>(dir: P, name: &str) -> Self {
        Self::open(dir.as_ref().join(format!("{name}.cache")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_err(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    fn parse_err(&self, line: u64, reason: impl Into<String>) -> StoreError {
        StoreError::Parse {
            path: self.path.clone(),
            line,
            reason: reason.into(),
        }
    }

    fn parse_row(&self, line: u64, rec: &csv::StringRecord) -> Result<Shift, StoreError> {
        let field = |idx: usize| rec.get(idx).map(str::to_string);
        let start = rec
            .get(0)
            .ok_or_else(|| self.parse_err(line, "missing start"))?;
        let end = rec
            .get(1)
            .ok_or_else(|| self.parse_err(line, "missing end"))?;
        let start = DateTime::parse_from_rfc3339(start)
            .map_err(|e| self.parse_err(line, format!("start: {e}")))?
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339(end)
            .map_err(|e| self.parse_err(line, format!("end: {e}")))?
            .with_timezone(&Utc);
        Shift::new(start, end, field(2), Contact::new(field(3), field(4)))
            .map_err(|e| self.parse_err(line, e.to_string()))
    }
}

impl ShiftStore for TsvStore {
    fn load(&self) -> Result<Vec<Shift>, StoreError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(self.io_err(e)),
        };
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_reader(data.as_slice());

        let mut out = Vec::new();
        for (idx, rec) in rdr.records().enumerate() {
            let rec = rec.map_err(|e| self.csv_err(e))?;
            let line = rec.position().map_or(idx as u64 + 1, |p| p.line());
            out.push(self.parse_row(line, &rec)?);
        }
        if out.is_empty() {
            return Err(StoreError::Empty(self.path.clone()));
        }
        Ok(out)
    }

    fn save(&self, shifts: &[Shift]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_err(e))?;
        {
            let mut w = WriterBuilder::new()
                .delimiter(b'\t')
                .has_headers(false)
                .quote_style(QuoteStyle::Never)
                .from_writer(&mut tmp);
            for s in shifts {
                let start = s.start().to_rfc3339();
                let end = s.end().to_rfc3339();
                w.write_record([
                    start.as_str(),
                    end.as_str(),
                    s.name().unwrap_or_default(),
                    s.email().unwrap_or_default(),
                    s.phone().unwrap_or_default(),
                ])
                .map_err(|e| self.csv_err(e))?;
            }
            w.flush().map_err(|e| self.io_err(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        Ok(())
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    }
}
