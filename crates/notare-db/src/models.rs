/// Database row types — these map directly to SQLite rows.
/// Distinct from the notare-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub is_staff: bool,
    pub created_at: String,
}

pub struct NoteRow {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub private: bool,
    pub archived: bool,
    pub created_at: String,
}

pub struct TagRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
}
