//! Person: the canonical record of the census store.
//!
//! A person enters the system as a [`NewPerson`] (name, surname and an
//! optional patronymic), is turned into a candidate [`Person`], enriched with
//! age, gender and nationality, and only then persisted. The store assigns
//! the `id`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// The gender values an enriched person may carry.
pub const GENDERS: [&str; 2] = ["male", "female"];

// ─── Person ──────────────────────────────────────────────────────────────────

/// A person record. Enrichment fields are `None` on a fresh candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  /// Assigned by the store; `None` until persisted.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:          Option<Uuid>,
  pub name:        String,
  pub surname:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub patronymic:  Option<String>,
  #[serde(default)]
  pub age:         Option<i32>,
  #[serde(default)]
  pub gender:      Option<String>,
  /// ISO 3166-1 alpha-2 country code, e.g. `"RU"`.
  #[serde(default)]
  pub nationality: Option<String>,
}

impl Person {
  /// True once age, gender and nationality all hold values within their
  /// domains. Only enriched records are persisted on the create path.
  pub fn is_enriched(&self) -> bool {
    self.age.is_some_and(|age| age > 0)
      && self
        .gender
        .as_deref()
        .is_some_and(|g| GENDERS.contains(&g))
      && self
        .nationality
        .as_deref()
        .is_some_and(crate::validate::is_country_code)
  }

  /// Compact JSON encoding, used for cache entries and emitted events.
  pub fn to_bytes(&self) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(self)?))
  }

  pub fn from_slice(data: &[u8]) -> Result<Self> {
    Ok(serde_json::from_slice(data)?)
  }
}

// ─── NewPerson ───────────────────────────────────────────────────────────────

/// Intake shape for the create path. Everything else is derived.
///
/// Missing name parts decode as empty so that validation, not decoding,
/// reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
  #[serde(default)]
  pub name:       String,
  #[serde(default)]
  pub surname:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub patronymic: Option<String>,
}

impl NewPerson {
  pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
    Self {
      name:       name.into(),
      surname:    surname.into(),
      patronymic: None,
    }
  }

  /// A candidate record: no id, no enrichment. An empty patronymic is
  /// treated as absent.
  pub fn into_candidate(self) -> Person {
    Person {
      id: None,
      name: self.name,
      surname: self.surname,
      patronymic: self.patronymic.filter(|p| !p.is_empty()),
      ..Person::default()
    }
  }
}

// ─── PersonPatch ─────────────────────────────────────────────────────────────

/// A partial update. Absent fields are left unchanged; unknown fields are
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonPatch {
  pub name:        Option<String>,
  pub surname:     Option<String>,
  pub patronymic:  Option<String>,
  pub age:         Option<i32>,
  pub gender:      Option<String>,
  pub nationality: Option<String>,
}

impl PersonPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// Overwrite the fields of `person` that this patch carries.
  pub fn apply(self, person: &mut Person) {
    if let Some(name) = self.name {
      person.name = name;
    }
    if let Some(surname) = self.surname {
      person.surname = surname;
    }
    if let Some(patronymic) = self.patronymic {
      person.patronymic = Some(patronymic).filter(|p| !p.is_empty());
    }
    if let Some(age) = self.age {
      person.age = Some(age);
    }
    if let Some(gender) = self.gender {
      person.gender = Some(gender);
    }
    if let Some(nationality) = self.nationality {
      person.nationality = Some(nationality);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ivan() -> Person {
    Person {
      id:          Some(Uuid::new_v4()),
      name:        "Ivan".into(),
      surname:     "Petrov".into(),
      patronymic:  Some("Sergeevich".into()),
      age:         Some(30),
      gender:      Some("male".into()),
      nationality: Some("RU".into()),
    }
  }

  #[test]
  fn json_roundtrip_preserves_every_field() {
    let person = ivan();
    let bytes = person.to_bytes().unwrap();
    assert_eq!(Person::from_slice(&bytes).unwrap(), person);
  }

  #[test]
  fn candidate_has_no_id_and_is_not_enriched() {
    let mut input = NewPerson::new("Ivan", "Petrov");
    input.patronymic = Some(String::new());
    let candidate = input.into_candidate();

    assert_eq!(candidate.id, None);
    assert_eq!(candidate.patronymic, None);
    assert!(!candidate.is_enriched());

    let json = serde_json::to_value(&candidate).unwrap();
    assert!(json.get("id").is_none());
  }

  #[test]
  fn enriched_requires_all_three_fields_in_domain() {
    let mut person = ivan();
    assert!(person.is_enriched());

    person.gender = Some("unknown".into());
    assert!(!person.is_enriched());

    person = ivan();
    person.nationality = Some("RUS".into());
    assert!(!person.is_enriched());

    person = ivan();
    person.age = Some(0);
    assert!(!person.is_enriched());
  }

  #[test]
  fn patch_only_touches_present_fields() {
    let mut person = ivan();
    PersonPatch {
      age: Some(31),
      patronymic: Some(String::new()),
      ..PersonPatch::default()
    }
    .apply(&mut person);

    assert_eq!(person.age, Some(31));
    assert_eq!(person.patronymic, None);
    assert_eq!(person.name, "Ivan");
    assert_eq!(person.nationality.as_deref(), Some("RU"));
  }

  #[test]
  fn missing_name_parts_decode_as_empty() {
    let input: NewPerson = serde_json::from_str(r#"{"name":"Ivan"}"#).unwrap();
    assert_eq!(input.name, "Ivan");
    assert_eq!(input.surname, "");
  }

  #[test]
  fn patch_rejects_unknown_fields() {
    let err = serde_json::from_str::<PersonPatch>(r#"{"nationalty":"RU"}"#)
      .unwrap_err();
    assert!(err.to_string().contains("nationalty"));
  }
}
