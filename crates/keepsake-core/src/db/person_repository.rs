//! Person repository implementation

use crate::error::{Error, Result};
use crate::models::{Person, PersonId, PhotoRef};
use libsql::{params, Connection, Row};

/// Trait for person storage operations (async)
#[allow(async_fn_in_trait)]
pub trait PersonRepository {
    /// Insert or replace a person, keyed by id
    async fn upsert(&self, person: &Person) -> Result<()>;

    /// Get a person by ID
    async fn get(&self, id: &PersonId) -> Result<Option<Person>>;

    /// Remove a person
    async fn delete(&self, id: &PersonId) -> Result<()>;

    /// All people, sorted by name
    async fn list_all(&self) -> Result<Vec<Person>>;
}

/// libSQL implementation of `PersonRepository`
pub struct LibSqlPersonRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPersonRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn person_from_row(row: &Row) -> Result<Person> {
        let id: String = row.get(0)?;
        let photo: Option<String> = row.get(2)?;

        Ok(Person {
            id: id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid person id: {id}")))?,
            name: row.get(1)?,
            photo: photo.map(PhotoRef::new),
            notes: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl PersonRepository for LibSqlPersonRepository<'_> {
    async fn upsert(&self, person: &Person) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO people
                 (id, name, photo, notes, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    person.id.as_str(),
                    person.name.clone(),
                    person.photo.as_ref().map(|p| p.as_str().to_string()),
                    person.notes.clone(),
                    person.created_at,
                    person.updated_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &PersonId) -> Result<Option<Person>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, photo, notes, created_at, updated_at
                 FROM people WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::person_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &PersonId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM people WHERE id = ?", params![id.as_str()])
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Person>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, photo, notes, created_at, updated_at
                 FROM people ORDER BY name COLLATE NOCASE ASC",
                (),
            )
            .await?;

        let mut people = Vec::new();
        while let Some(row) = rows.next().await? {
            people.push(Self::person_from_row(&row)?);
        }
        Ok(people)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_and_get() {
        let db = setup().await;
        let repo = LibSqlPersonRepository::new(db.connection());

        let mut person = Person::new("Grace");
        person.notes = Some("met at the conference".to_string());
        person.photo = Some(PhotoRef::new("https://blobs.example.com/g.jpg"));

        repo.upsert(&person).await.unwrap();
        let fetched = repo.get(&person.id).await.unwrap().unwrap();
        assert_eq!(fetched, person);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_sorted_by_name() {
        let db = setup().await;
        let repo = LibSqlPersonRepository::new(db.connection());

        repo.upsert(&Person::new("zoe")).await.unwrap();
        repo.upsert(&Person::new("Ada")).await.unwrap();

        let people = repo.list_all().await.unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].name, "Ada");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete() {
        let db = setup().await;
        let repo = LibSqlPersonRepository::new(db.connection());

        let person = Person::new("Temp");
        repo.upsert(&person).await.unwrap();
        repo.delete(&person.id).await.unwrap();

        assert!(repo.get(&person.id).await.unwrap().is_none());
    }
}
