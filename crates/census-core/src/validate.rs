//! Field validation for people and person filters.
//!
//! Every function here is pure and reports *all* failing fields at once, so
//! callers can render a per-field error map.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use crate::{
  person::{GENDERS, NewPerson, Person},
  store::{ALLOWED_LIMITS, PersonFilter},
};

/// Exclusive upper bound for a person's age.
pub const MAX_AGE: i32 = 150;

// ─── Error map ───────────────────────────────────────────────────────────────

/// Field name → human-readable reason, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
  fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  pub fn len(&self) -> usize { self.fields.len() }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.fields.get(field).map(String::as_str)
  }

  pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
    self.fields.iter().map(|(k, v)| (*k, v.as_str()))
  }

  /// Record a failure for `field`. The first reason per field wins.
  pub fn add(&mut self, field: &'static str, reason: impl Into<String>) {
    self.fields.entry(field).or_insert_with(|| reason.into());
  }

  fn into_result(self) -> Result<(), Self> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("validation failed")?;
    for (i, (field, reason)) in self.fields.iter().enumerate() {
      let sep = if i == 0 { ": " } else { "; " };
      write!(f, "{sep}{field} {reason}")?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}

// ─── Predicates ──────────────────────────────────────────────────────────────

/// Non-empty and made only of alphabetic characters (any script).
pub fn is_alphabetic(s: &str) -> bool {
  !s.is_empty() && s.chars().all(char::is_alphabetic)
}

/// Two uppercase ASCII letters, the ISO 3166-1 alpha-2 shape.
pub fn is_country_code(s: &str) -> bool {
  s.len() == 2 && s.bytes().all(|b| b.is_ascii_uppercase())
}

fn check_required_alpha(
  errors: &mut ValidationErrors,
  field: &'static str,
  value: &str,
) {
  if value.is_empty() {
    errors.add(field, "is required");
  } else if !is_alphabetic(value) {
    errors.add(field, "must contain only letters");
  }
}

fn check_optional_alpha(
  errors: &mut ValidationErrors,
  field: &'static str,
  value: Option<&str>,
) {
  if let Some(value) = value.filter(|v| !v.is_empty())
    && !is_alphabetic(value)
  {
    errors.add(field, "must contain only letters");
  }
}

fn check_gender(errors: &mut ValidationErrors, value: &str) {
  if !GENDERS.contains(&value) {
    errors.add("gender", format!("must be one of {}", GENDERS.join(", ")));
  }
}

fn check_nationality(errors: &mut ValidationErrors, value: &str) {
  if !is_country_code(value) {
    errors.add("nationality", "must be a two-letter uppercase country code");
  }
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Structural check of create input, run before any network call.
pub fn validate_candidate(input: &NewPerson) -> Result<(), ValidationErrors> {
  let mut errors = ValidationErrors::default();
  check_required_alpha(&mut errors, "name", &input.name);
  check_required_alpha(&mut errors, "surname", &input.surname);
  check_optional_alpha(&mut errors, "patronymic", input.patronymic.as_deref());
  errors.into_result()
}

/// Full check of a record about to be persisted.
pub fn validate_person(person: &Person) -> Result<(), ValidationErrors> {
  let mut errors = ValidationErrors::default();
  check_required_alpha(&mut errors, "name", &person.name);
  check_required_alpha(&mut errors, "surname", &person.surname);
  check_optional_alpha(&mut errors, "patronymic", person.patronymic.as_deref());

  match person.age {
    None => errors.add("age", "is required"),
    Some(age) if age <= 0 || age >= MAX_AGE => {
      errors.add("age", format!("must be between 1 and {}", MAX_AGE - 1))
    }
    Some(_) => {}
  }

  match person.gender.as_deref() {
    None => errors.add("gender", "is required"),
    Some(gender) => check_gender(&mut errors, gender),
  }

  match person.nationality.as_deref() {
    None => errors.add("nationality", "is required"),
    Some(nationality) => check_nationality(&mut errors, nationality),
  }

  errors.into_result()
}

/// Check the values a list filter carries.
pub fn validate_filter(filter: &PersonFilter) -> Result<(), ValidationErrors> {
  let mut errors = ValidationErrors::default();
  check_optional_alpha(&mut errors, "name", filter.name.as_deref());
  check_optional_alpha(&mut errors, "surname", filter.surname.as_deref());
  check_optional_alpha(&mut errors, "patronymic", filter.patronymic.as_deref());

  if let Some(age) = filter.age
    && !(0..=MAX_AGE).contains(&age)
  {
    errors.add("age", format!("must be between 0 and {MAX_AGE}"));
  }
  if let Some(gender) = filter.gender.as_deref() {
    check_gender(&mut errors, gender);
  }
  if let Some(nationality) = filter.nationality.as_deref() {
    check_nationality(&mut errors, nationality);
  }
  if let Some(limit) = filter.limit
    && !ALLOWED_LIMITS.contains(&limit)
  {
    errors.add("limit", "must be one of 10, 30, 50, 100");
  }

  errors.into_result()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn enriched_ivan() -> Person {
    Person {
      id:          None,
      name:        "Ivan".into(),
      surname:     "Petrov".into(),
      patronymic:  None,
      age:         Some(30),
      gender:      Some("male".into()),
      nationality: Some("RU".into()),
    }
  }

  #[test]
  fn enriched_ivan_is_valid() {
    assert_eq!(validate_person(&enriched_ivan()), Ok(()));
  }

  #[test]
  fn every_failing_field_is_reported() {
    let person = Person {
      id:          None,
      name:        String::new(),
      surname:     "P3trov".into(),
      patronymic:  Some("S.".into()),
      age:         Some(150),
      gender:      Some("other".into()),
      nationality: Some("ru".into()),
    };

    let errors = validate_person(&person).unwrap_err();
    assert_eq!(errors.len(), 6);
    assert_eq!(errors.get("name"), Some("is required"));
    assert!(errors.get("surname").is_some());
    assert!(errors.get("patronymic").is_some());
    assert!(errors.get("age").is_some());
    assert!(errors.get("gender").is_some());
    assert!(errors.get("nationality").is_some());
  }

  #[test]
  fn unenriched_candidate_fails_full_validation() {
    let candidate = NewPerson::new("Ivan", "Petrov").into_candidate();
    let errors = validate_person(&candidate).unwrap_err();
    let fields: Vec<_> = errors.fields().map(|(f, _)| f).collect();
    assert_eq!(fields, ["age", "gender", "nationality"]);
  }

  #[test]
  fn validation_is_repeatable() {
    let mut person = enriched_ivan();
    person.age = Some(-1);
    person.gender = None;
    assert_eq!(validate_person(&person), validate_person(&person));
  }

  #[test]
  fn candidate_accepts_non_latin_letters() {
    let mut input = NewPerson::new("Иван", "Петров");
    input.patronymic = Some("Сергеевич".into());
    assert_eq!(validate_candidate(&input), Ok(()));
  }

  #[test]
  fn candidate_rejects_missing_surname() {
    let errors = validate_candidate(&NewPerson::new("Ivan", "")).unwrap_err();
    assert_eq!(errors.get("surname"), Some("is required"));
    assert_eq!(errors.len(), 1);
  }

  #[test]
  fn filter_checks_limit_and_values() {
    assert_eq!(validate_filter(&PersonFilter::default()), Ok(()));

    let filter = PersonFilter {
      limit: Some(20),
      gender: Some("female".into()),
      nationality: Some("Russia".into()),
      ..PersonFilter::default()
    };
    let errors = validate_filter(&filter).unwrap_err();
    assert!(errors.get("limit").is_some());
    assert!(errors.get("nationality").is_some());
    assert!(errors.get("gender").is_none());
  }

  #[test]
  fn errors_serialise_as_a_flat_map() {
    let errors = validate_candidate(&NewPerson::default()).unwrap_err();
    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(json["name"], "is required");
    assert_eq!(json["surname"], "is required");
  }
}
