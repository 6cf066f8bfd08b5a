use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Error,
    repositories::UserRepository,
    user::{NewUser, User, UserId},
    validation::{normalize_email, validate_display_name, validate_email},
};

/// Identity lookups and updates with input validation and email
/// normalization applied at the boundary.
pub struct UserService<U: UserRepository> {
    users: Arc<U>,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }

    /// Create a minimal identity for the given address.
    pub async fn create_user(&self, email: &str, name: Option<String>) -> Result<User, Error> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if let Some(name) = &name {
            validate_display_name(name)?;
        }

        self.users.create(NewUser::new(email).with_name(name)).await
    }

    pub async fn get_user(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.users.find_by_id(id).await
    }

    /// Look up an identity by email, case-insensitively.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.users.find_by_email(&normalize_email(email)).await
    }

    pub async fn update_user(&self, user: &User) -> Result<User, Error> {
        self.users.update(user).await
    }

    pub async fn mark_email_confirmed(&self, id: &UserId) -> Result<(), Error> {
        self.users.mark_email_confirmed(id).await
    }

    pub async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), Error> {
        self.users.record_login(id, at).await
    }
}
