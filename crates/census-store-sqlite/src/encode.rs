//! Encoding and decoding helpers between [`Person`] and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with a fixed microsecond precision, so
//! they sort lexically. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use census_core::person::Person;
use uuid::Uuid;

use crate::Result;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Case-folded form of a name part, used by the `*_key` columns.
pub fn search_key(s: &str) -> String { s.to_lowercase() }

/// A `LIKE` pattern matching values that start with `prefix`. Wildcards in
/// the prefix are escaped with `\`.
pub fn prefix_pattern(prefix: &str) -> String {
  let mut pattern = String::with_capacity(prefix.len() + 1);
  for c in search_key(prefix).chars() {
    if matches!(c, '\\' | '%' | '_') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawPerson::from_row`].
pub const PERSON_COLUMNS: &str =
  "person_id, name, surname, patronymic, age, gender, nationality";

/// Raw values read directly from a `people` row.
pub struct RawPerson {
  pub person_id:   String,
  pub name:        String,
  pub surname:     String,
  pub patronymic:  Option<String>,
  pub age:         Option<i32>,
  pub gender:      Option<String>,
  pub nationality: Option<String>,
}

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:   row.get(0)?,
      name:        row.get(1)?,
      surname:     row.get(2)?,
      patronymic:  row.get(3)?,
      age:         row.get(4)?,
      gender:      row.get(5)?,
      nationality: row.get(6)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      id:          Some(decode_uuid(&self.person_id)?),
      name:        self.name,
      surname:     self.surname,
      patronymic:  self.patronymic,
      age:         self.age,
      gender:      self.gender,
      nationality: self.nationality,
    })
  }
}
