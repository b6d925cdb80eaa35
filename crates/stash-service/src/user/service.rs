//! User registration and lookup.

use std::sync::Arc;

use tracing::info;

use stash_core::error::AppError;
use stash_core::result::AppResult;
use stash_database::repositories::UserRepository;
use stash_entity::node::Node;
use stash_entity::user::{NewUser, User};

/// Manages user accounts and their root folders.
#[derive(Debug, Clone)]
pub struct UserService {
    /// User repository.
    user_repo: Arc<UserRepository>,
}

impl UserService {
    /// Creates a new user service.
    pub fn new(user_repo: Arc<UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Creates a user and provisions their root folder, named after them,
    /// in one transaction.
    pub async fn register(&self, data: NewUser) -> AppResult<(User, Node)> {
        let (user, root) = self.user_repo.register(&data).await?;

        info!(user_id = %user.id, email = %user.email, root_id = %root.id, "User registered");
        Ok((user, root))
    }

    /// Finds a user by email, failing when absent.
    pub async fn get_by_email(&self, email: &str) -> AppResult<User> {
        self.user_repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No user with email '{email}'")))
    }

    /// Lists every user.
    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.user_repo.find_all().await
    }
}
