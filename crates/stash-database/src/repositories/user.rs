//! User repository implementation.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use stash_core::error::{AppError, ErrorKind};
use stash_core::result::AppResult;
use stash_core::types::UserId;
use stash_entity::node::Node;
use stash_entity::user::{NewUser, User, normalize_email};

use crate::connection::{Database, commit, query_failed};
use crate::rows;

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a user. Emails are unique after normalization.
    pub async fn create(&self, data: &NewUser) -> AppResult<User> {
        let mut tx = self.db.begin().await?;
        let user = insert_user(&mut tx, data).await?;
        commit(tx).await?;
        Ok(user)
    }

    /// Create a user together with their root folder, named after them.
    /// Either both rows are written or neither is.
    pub async fn register(&self, data: &NewUser) -> AppResult<(User, Node)> {
        let mut tx = self.db.begin().await?;
        let user = insert_user(&mut tx, data).await?;
        let root = rows::insert_root(&mut tx, user.id, &user.name, user.created_at).await?;
        commit(tx).await?;

        debug!(user_id = %user.id, root_id = %root.id, "User and root folder created");
        Ok((user, root))
    }

    /// Find a user by primary key.
    pub async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await
            .map_err(query_failed("Failed to find user"))?
            .as_ref()
            .map(rows::user_from_row)
            .transpose()
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(self.db.pool())
            .await
            .map_err(query_failed("Failed to find user by email"))?
            .as_ref()
            .map(rows::user_from_row)
            .transpose()
    }

    /// All users, oldest first.
    pub async fn find_all(&self) -> AppResult<Vec<User>> {
        let found = sqlx::query("SELECT * FROM users")
            .fetch_all(self.db.pool())
            .await
            .map_err(query_failed("Failed to list users"))?;
        let mut users = found
            .iter()
            .map(rows::user_from_row)
            .collect::<AppResult<Vec<_>>>()?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }
}

async fn insert_user(conn: &mut SqliteConnection, data: &NewUser) -> AppResult<User> {
    let email = normalize_email(&data.email);
    if email.is_empty() {
        return Err(AppError::validation("Email must not be empty"));
    }
    if data.name.trim().is_empty() {
        return Err(AppError::validation("Name must not be empty"));
    }

    let user = User {
        id: UserId::new(),
        email,
        name: data.name.trim().to_string(),
        created_at: Utc::now(),
    };
    sqlx::query("INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                AppError::conflict(format!(
                    "A user with email '{}' already exists",
                    user.email
                ))
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create user", e)
            }
        })?;

    debug!(user_id = %user.id, email = %user.email, "User created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::NodeRepository;

    fn alice() -> NewUser {
        NewUser {
            email: "Alice@Example.com".into(),
            name: "alice".into(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = UserRepository::new(Database::in_memory().await.unwrap());
        repo.create(&alice()).await.unwrap();

        let err = repo
            .create(&NewUser {
                email: " alice@example.com".into(),
                name: "other".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_creates_user_and_root() {
        let db = Database::in_memory().await.unwrap();
        let users = UserRepository::new(db.clone());
        let nodes = NodeRepository::new(db);

        let (user, root) = users.register(&alice()).await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(root.is_root);
        assert_eq!(root.name, "alice");
        assert_eq!(nodes.find_root(user.id).await.unwrap().unwrap().id, root.id);
    }

    #[tokio::test]
    async fn test_failed_register_leaves_no_user() {
        let db = Database::in_memory().await.unwrap();
        let users = UserRepository::new(db.clone());
        users.register(&alice()).await.unwrap();

        let err = users
            .register(&NewUser {
                email: "ALICE@example.com".into(),
                name: "again".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err = users
            .register(&NewUser {
                email: "bob@example.com".into(),
                name: "   ".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(users.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_rolls_back_user_when_root_fails() {
        let db = Database::in_memory().await.unwrap();
        sqlx::query(
            r#"
            CREATE TRIGGER reject_roots BEFORE INSERT ON nodes
            WHEN NEW.is_root = 1
            BEGIN SELECT RAISE(ABORT, 'roots are disabled'); END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();
        let users = UserRepository::new(db);

        let err = users.register(&alice()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);
        assert!(users.find_by_email("alice@example.com").await.unwrap().is_none());
        assert!(users.find_all().await.unwrap().is_empty());
    }
}
