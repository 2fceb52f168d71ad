use std::collections::{BTreeSet, HashMap};

use sqlx::sqlite::SqlitePool;

use crate::auth::{Identity, Role};
use crate::directory::{NewIdentity, StoredCredentials};

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    enabled: i32,
    locked: i32,
}

impl UserRow {
    fn into_identity(self, roles: BTreeSet<Role>) -> Identity {
        Identity {
            id: self.id,
            subject: self.email,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            roles,
            enabled: self.enabled != 0,
            locked: self.locked != 0,
        }
    }
}

/// Role names from storage. Names the application no longer knows are skipped.
fn parse_roles(names: impl IntoIterator<Item = String>) -> BTreeSet<Role> {
    names
        .into_iter()
        .filter_map(|name| {
            let role = Role::parse(&name);
            if role.is_none() {
                tracing::warn!(role = %name, "Ignoring unknown role name in storage");
            }
            role
        })
        .collect()
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user and its role in one transaction.
    pub async fn create(&self, new: &NewIdentity) -> Result<Identity, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO users (username, email, password, first_name, last_name, enabled)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.enabled)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        let granted = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) SELECT ?, id FROM roles WHERE name = ?",
        )
        .bind(id)
        .bind(new.role.as_str())
        .execute(&mut *tx)
        .await?;
        if granted.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;

        Ok(Identity {
            id,
            subject: new.email.clone(),
            username: new.username.clone(),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            roles: [new.role].into_iter().collect(),
            enabled: new.enabled,
            locked: false,
        })
    }

    /// Roles held by a user.
    pub async fn roles_of(&self, user_id: i64) -> Result<BTreeSet<Role>, sqlx::Error> {
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT r.name FROM roles r
             JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(parse_roles(names.into_iter().map(|(name,)| name)))
    }

    async fn row_by_email(&self, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, email, password, first_name, last_name, enabled, locked
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Identity>, sqlx::Error> {
        Ok(self
            .get_credentials_by_email(email)
            .await?
            .map(|stored| stored.identity))
    }

    /// Get a user by email together with the stored password hash.
    pub async fn get_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, sqlx::Error> {
        let Some(mut row) = self.row_by_email(email).await? else {
            return Ok(None);
        };
        let roles = self.roles_of(row.id).await?;
        let password_hash = std::mem::take(&mut row.password);
        Ok(Some(StoredCredentials {
            identity: row.into_identity(roles),
            password_hash,
        }))
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 > 0)
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 > 0)
    }

    /// Enable or disable an account. Returns false if no such user.
    pub async fn set_enabled(&self, email: &str, enabled: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET enabled = ? WHERE email = ?")
            .bind(enabled)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lock or unlock an account. Returns false if no such user.
    pub async fn set_locked(&self, email: &str, locked: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET locked = ? WHERE email = ?")
            .bind(locked)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All users, oldest first.
    pub async fn list(&self) -> Result<Vec<Identity>, sqlx::Error> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, username, email, password, first_name, last_name, enabled, locked
             FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let grants: Vec<(i64, String)> = sqlx::query_as(
            "SELECT ur.user_id, r.name FROM user_roles ur JOIN roles r ON r.id = ur.role_id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut names_by_user: HashMap<i64, Vec<String>> = HashMap::new();
        for (user_id, name) in grants {
            names_by_user.entry(user_id).or_default().push(name);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let roles = parse_roles(names_by_user.remove(&row.id).unwrap_or_default());
                row.into_identity(roles)
            })
            .collect())
    }
}
