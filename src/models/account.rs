use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::PomoError;

pub const DEFAULT_TIMEZONE: &str = "Asia/Seoul";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn tz(&self) -> Result<Tz, PomoError> {
        parse_timezone(&self.timezone)
    }
}

/// Parse an IANA zone name such as `Europe/Berlin`.
pub fn parse_timezone(name: &str) -> Result<Tz, PomoError> {
    name.parse::<Tz>()
        .map_err(|_| PomoError::validation(format!("Unknown IANA timezone: {name}")))
}
