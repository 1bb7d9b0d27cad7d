use axum::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, User, UserChanges};

const USER_COLUMNS: &str = "id, username, email, password, bio, image, demo";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique column collided; holds the column name.
    #[error("{0} has already been taken")]
    Conflict(&'static str),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

/// Column behind a unique constraint name, e.g. `users_email_key` -> `email`.
fn conflict_column(constraint: &str) -> Option<&'static str> {
    match constraint {
        "users_email_key" => Some("email"),
        "users_username_key" => Some("username"),
        _ => None,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                if let Some(column) = db_err.constraint().and_then(conflict_column) {
                    return StoreError::Conflict(column);
                }
            }
        }
        StoreError::Database(err)
    }
}

/// Single-row access to the `users` table.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// Returns `None` when no row has this id.
    async fn update(&self, id: i32, changes: UserChanges) -> Result<Option<User>, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password)
            .fetch_one(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn update(&self, id: i32, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
               SET username = COALESCE($2, username),
                   email    = COALESCE($3, email),
                   password = COALESCE($4, password),
                   bio      = COALESCE($5, bio),
                   image    = COALESCE($6, image)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.password)
            .bind(changes.bio)
            .bind(changes.image)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

/// In-process store used by the unit tests in place of Postgres.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryUserStore {
    users: std::sync::Mutex<Vec<User>>,
}

#[cfg(test)]
impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row as-is, e.g. to seed a demo account.
    pub fn insert(&self, user: User) {
        self.users.lock().expect("store lock").push(user);
    }

    fn check_unique(
        users: &[User],
        skip_id: i32,
        username: &str,
        email: &str,
    ) -> Result<(), StoreError> {
        for u in users.iter().filter(|u| u.id != skip_id) {
            if u.email == email {
                return Err(StoreError::Conflict("email"));
            }
            if u.username == username {
                return Err(StoreError::Conflict("username"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().expect("store lock");
        Self::check_unique(&users, 0, &user.username, &user.email)?;
        let row = User {
            id: users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            username: user.username,
            email: user.email,
            password: user.password,
            bio: None,
            image: None,
            demo: false,
        };
        users.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().expect("store lock");
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().expect("store lock");
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().expect("store lock");
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn update(&self, id: i32, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().expect("store lock");
        let Some(current) = users.iter().find(|u| u.id == id).cloned() else {
            return Ok(None);
        };
        let mut next = current;
        if let Some(v) = changes.username {
            next.username = v;
        }
        if let Some(v) = changes.email {
            next.email = v;
        }
        if let Some(v) = changes.password {
            next.password = v;
        }
        if let Some(v) = changes.bio {
            next.bio = Some(v);
        }
        if let Some(v) = changes.image {
            next.image = Some(v);
        }
        Self::check_unique(&users, id, &next.username, &next.email)?;
        if let Some(slot) = users.iter_mut().find(|u| u.id == id) {
            *slot = next.clone();
        }
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password: "hash".into(),
        }
    }

    #[tokio::test]
    async fn memory_store_assigns_increasing_ids() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a", "a@me")).await.unwrap();
        let b = store.create(new_user("b", "b@me")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(!a.demo);
    }

    #[tokio::test]
    async fn memory_store_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.create(new_user("a", "a@me")).await.unwrap();
        let err = store.create(new_user("b", "a@me")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));
    }

    #[tokio::test]
    async fn memory_store_update_keeps_untouched_columns() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a", "a@me")).await.unwrap();
        let changes = UserChanges {
            bio: Some("hello".into()),
            ..Default::default()
        };
        let updated = store.update(user.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.username, "a");
        assert_eq!(updated.email, "a@me");
        assert_eq!(updated.bio.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn memory_store_update_missing_row_is_none() {
        let store = MemoryUserStore::new();
        let res = store.update(42, UserChanges::default()).await.unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn unique_constraints_map_to_columns() {
        assert_eq!(conflict_column("users_email_key"), Some("email"));
        assert_eq!(conflict_column("users_username_key"), Some("username"));
        assert_eq!(conflict_column("users_pkey"), None);
    }

    #[test]
    fn non_database_errors_are_not_conflicts() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn memory_store_rejects_taken_username_on_update() {
        let store = MemoryUserStore::new();
        store.create(new_user("a", "a@me")).await.unwrap();
        let b = store.create(new_user("b", "b@me")).await.unwrap();
        let changes = UserChanges {
            username: Some("a".into()),
            ..Default::default()
        };
        let err = store.update(b.id, changes).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("username")));
    }

    #[test]
    fn user_json_hides_password() {
        let user = User {
            id: 1,
            username: "RealWorld".into(),
            email: "realworld@me".into(),
            password: "$2b$10$secret".into(),
            bio: None,
            image: None,
            demo: false,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("realworld@me"));
        assert!(!json.contains("secret"));
    }
}
