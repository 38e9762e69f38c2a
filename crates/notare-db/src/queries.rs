use crate::Database;
use crate::models::{NoteRow, TagRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, role) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, role),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT id, username, password, role, is_staff, created_at
                 FROM users WHERE username = ?1",
                username,
            )
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT id, username, password, role, is_staff, created_at
                 FROM users WHERE id = ?1",
                id,
            )
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, role, is_staff, created_at
                 FROM users ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Case-insensitive substring search on username.
    pub fn search_users(&self, fragment: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, role, is_staff, created_at
                 FROM users WHERE username LIKE '%' || ?1 || '%'
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([fragment], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Absent fields keep their current value.
    pub fn update_user(&self, id: &str, username: Option<&str>, role: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET username = COALESCE(?2, username), role = COALESCE(?3, role)
                 WHERE id = ?1",
                (id, username, role),
            )?;
            Ok(())
        })
    }

    pub fn delete_user(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Notes --

    pub fn create_note(&self, id: &str, author_id: &str, text: &str, private: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notes (id, author_id, text, private) VALUES (?1, ?2, ?3, ?4)",
                (id, author_id, text, private),
            )?;
            Ok(())
        })
    }

    pub fn get_note(&self, id: &str) -> Result<Option<NoteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, text, private, archived, created_at
                 FROM notes WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], note_from_row).optional()?;
            Ok(row)
        })
    }

    /// Exactly the notes whose author is `author_id`, in creation order.
    pub fn list_notes_by_author(&self, author_id: &str) -> Result<Vec<NoteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, text, private, archived, created_at
                 FROM notes WHERE author_id = ?1 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([author_id], note_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Non-private, non-archived notes from all users, optionally restricted
    /// to those carrying a tag with the given name.
    pub fn list_public_notes(&self, tag_name: Option<&str>) -> Result<Vec<NoteRow>> {
        self.with_conn(|conn| {
            let rows = match tag_name {
                Some(name) => {
                    let mut stmt = conn.prepare(
                        "SELECT n.id, n.author_id, n.text, n.private, n.archived, n.created_at
                         FROM notes n
                         JOIN note_tags nt ON nt.note_id = n.id
                         JOIN tags t ON t.id = nt.tag_id
                         WHERE n.private = 0 AND n.archived = 0 AND t.name = ?1
                         ORDER BY n.created_at, n.rowid",
                    )?;
                    stmt.query_map([name], note_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, author_id, text, private, archived, created_at
                         FROM notes WHERE private = 0 AND archived = 0
                         ORDER BY created_at, rowid",
                    )?;
                    stmt.query_map([], note_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    /// Absent fields keep their current value.
    pub fn update_note(&self, id: &str, text: Option<&str>, private: Option<bool>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notes SET text = COALESCE(?2, text), private = COALESCE(?3, private)
                 WHERE id = ?1",
                (id, text, private),
            )?;
            Ok(())
        })
    }

    pub fn set_note_archived(&self, id: &str, archived: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notes SET archived = ?2 WHERE id = ?1",
                (id, archived),
            )?;
            Ok(())
        })
    }

    pub fn delete_note(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Tag association --

    /// Associate tags with a note. Ids that don't resolve to a tag are
    /// silently skipped; already-associated tags are not duplicated.
    pub fn add_tags_to_note(&self, note_id: &str, tag_ids: &[String]) -> Result<()> {
        self.with_conn(|conn| {
            for tag_id in tag_ids {
                conn.execute(
                    "INSERT OR IGNORE INTO note_tags (note_id, tag_id)
                     SELECT ?1, id FROM tags WHERE id = ?2",
                    (note_id, tag_id),
                )?;
            }
            Ok(())
        })
    }

    /// Remove tags from a note. Removing a tag that isn't associated (or
    /// doesn't exist) is a no-op.
    pub fn remove_tags_from_note(&self, note_id: &str, tag_ids: &[String]) -> Result<()> {
        self.with_conn(|conn| {
            for tag_id in tag_ids {
                conn.execute(
                    "DELETE FROM note_tags WHERE note_id = ?1 AND tag_id = ?2",
                    (note_id, tag_id),
                )?;
            }
            Ok(())
        })
    }

    pub fn get_tags_for_note(&self, note_id: &str) -> Result<Vec<TagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.name, t.created_at
                 FROM tags t
                 JOIN note_tags nt ON nt.tag_id = t.id
                 WHERE nt.note_id = ?1
                 ORDER BY t.created_at, t.rowid",
            )?;
            let rows = stmt
                .query_map([note_id], tag_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Tags --

    pub fn create_tag(&self, id: &str, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO tags (id, name) VALUES (?1, ?2)", (id, name))?;
            Ok(())
        })
    }

    pub fn get_tag(&self, id: &str) -> Result<Option<TagRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, created_at FROM tags WHERE id = ?1")?;
            let row = stmt.query_row([id], tag_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_tag_by_name(&self, name: &str) -> Result<Option<TagRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, created_at FROM tags WHERE name = ?1")?;
            let row = stmt.query_row([name], tag_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_tags(&self) -> Result<Vec<TagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, created_at FROM tags ORDER BY created_at, rowid")?;
            let rows = stmt
                .query_map([], tag_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_tag(&self, id: &str, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE tags SET name = ?2 WHERE id = ?1", (id, name))?;
            Ok(())
        })
    }

    pub fn delete_tag(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM tags WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

// -- Row mappers --

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        role: row.get(3)?,
        is_staff: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn note_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        text: row.get(2)?,
        private: row.get(3)?,
        archived: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn tag_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TagRow> {
    Ok(TagRow {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn query_user(conn: &Connection, sql: &str, param: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row([param], user_from_row).optional()?;
    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
