use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShiftError {
    #[error("invalid shift: end {end} is before start {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Coordonnées d'une personne, telles que renvoyées par l'annuaire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Contact {
    pub fn new(email: Option<String>, phone: Option<String>) -> Self {
        Self {
            email: normalize(email),
            phone: normalize(phone),
        }
    }
}

/// Créneau d'astreinte (UTC), immuable une fois construit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

impl Shift {
    /// Crée un shift en validant que `end >= start`.
    ///
    /// Les champs texte vides sont ramenés à `None`.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        name: Option<String>,
        contact: Contact,
    ) -> Result<Self, ShiftError> {
        if end < start {
            return Err(ShiftError::EndBeforeStart { start, end });
        }
        Ok(Self {
            start,
            end,
            name: normalize(name),
            email: normalize(contact.email),
            phone: normalize(contact.phone),
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Recouvrement semi-ouvert avec `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.end > start && self.start < end
    }

    /// Vrai si `at` tombe dans le shift, bornes incluses.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Rendu d'un champ choisi par l'appelant.
    pub fn field(&self, field: ShiftField) -> Option<String> {
        match field {
            ShiftField::Start => Some(self.start.to_rfc3339()),
            ShiftField::End => Some(self.end.to_rfc3339()),
            ShiftField::Name => self.name.clone(),
            ShiftField::Email => self.email.clone(),
            ShiftField::Phone => self.phone.clone(),
        }
    }
}

/// Champs affichables d'un shift, dans l'ordre des colonnes du cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ShiftField {
    Start,
    End,
    Name,
    Email,
    Phone,
}

/// Ramène tabulations et retours à la ligne à une espace ; vide devient `None`.
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| {
            v.split(['\t', '\n', '\r'])
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|v| !v.is_empty())
}
