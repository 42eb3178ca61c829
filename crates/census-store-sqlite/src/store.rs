//! [`SqliteStore`]: the SQLite implementation of [`PersonStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use census_core::{
  person::Person,
  store::{PersonFilter, PersonStore},
};

use crate::{
  Error, Result,
  encode::{
    PERSON_COLUMNS, RawPerson, encode_dt, encode_uuid, prefix_pattern,
    search_key,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A person store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── PersonStore impl ────────────────────────────────────────────────────────

impl PersonStore for SqliteStore {
  type Error = Error;

  async fn create(&self, mut person: Person) -> Result<Person> {
    let id = Uuid::new_v4();
    person.id = Some(id);

    let id_str = encode_uuid(id);
    let now = encode_dt(Utc::now());
    let row = person.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO people (
             person_id, name, surname, patronymic, age, gender, nationality,
             name_key, surname_key, patronymic_key, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
          rusqlite::params![
            id_str,
            row.name,
            row.surname,
            row.patronymic,
            row.age,
            row.gender,
            row.nationality,
            search_key(&row.name),
            search_key(&row.surname),
            row.patronymic.as_deref().map(search_key),
            now,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(%id, "person inserted");
    Ok(person)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Person>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {PERSON_COLUMNS} FROM people
               WHERE person_id = ?1 AND is_deleted = 0"
            ),
            rusqlite::params![id_str],
            RawPerson::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn list(&self, filter: &PersonFilter) -> Result<Vec<Person>> {
    let name = filter.name.as_deref().map(prefix_pattern);
    let surname = filter.surname.as_deref().map(prefix_pattern);
    let patronymic = filter.patronymic.as_deref().map(prefix_pattern);
    let age = filter.age;
    let gender = filter.gender.clone();
    let nationality = filter.nationality.clone();
    let limit_val = i64::try_from(filter.limit()).unwrap_or(i64::MAX);
    let offset_val = i64::try_from(filter.offset()).unwrap_or(i64::MAX);

    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        // Absent filter values bind as NULL and disable their condition.
        let sql = format!(
          "SELECT {PERSON_COLUMNS} FROM people
           WHERE is_deleted = 0
             AND (?1 IS NULL OR name_key       LIKE ?1 ESCAPE '\\')
             AND (?2 IS NULL OR surname_key    LIKE ?2 ESCAPE '\\')
             AND (?3 IS NULL OR patronymic_key LIKE ?3 ESCAPE '\\')
             AND (?4 IS NULL OR age = ?4)
             AND (?5 IS NULL OR gender = ?5)
             AND (?6 IS NULL OR nationality = ?6)
           ORDER BY created_at, rowid
           LIMIT ?7 OFFSET ?8"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              name,
              surname,
              patronymic,
              age,
              gender,
              nationality,
              limit_val,
              offset_val,
            ],
            RawPerson::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn update(&self, person: Person) -> Result<Option<Person>> {
    let Some(id) = person.id else {
      return Ok(None);
    };

    let id_str = encode_uuid(id);
    let now = encode_dt(Utc::now());
    let row = person.clone();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE people SET
             name = ?2, surname = ?3, patronymic = ?4,
             age = ?5, gender = ?6, nationality = ?7,
             name_key = ?8, surname_key = ?9, patronymic_key = ?10,
             updated_at = ?11
           WHERE person_id = ?1 AND is_deleted = 0",
          rusqlite::params![
            id_str,
            row.name,
            row.surname,
            row.patronymic,
            row.age,
            row.gender,
            row.nationality,
            search_key(&row.name),
            search_key(&row.surname),
            row.patronymic.as_deref().map(search_key),
            now,
          ],
        )?)
      })
      .await?;

    Ok((changed > 0).then_some(person))
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let now = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE people SET is_deleted = 1, updated_at = ?2
           WHERE person_id = ?1 AND is_deleted = 0",
          rusqlite::params![id_str, now],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }
}
