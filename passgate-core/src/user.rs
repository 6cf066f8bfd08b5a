//! Identity records
//!
//! This module contains the core identity struct and its builder. An identity
//! is the durable record of an end user:
//!
//! | Field                | Type               | Description                                         |
//! | -------------------- | ------------------ | --------------------------------------------------- |
//! | `id`                 | `UserId`           | The unique identifier for the user.                 |
//! | `email`              | `String`           | The email of the user (stored lowercase).           |
//! | `name`               | `Option<String>`   | The display name, set when registration completes.  |
//! | `is_active`          | `bool`             | Inactive accounts cannot log in.                    |
//! | `email_confirmed_at` | `Option<DateTime>` | When the email was confirmed, if it has been.       |
//! | `created_at`         | `DateTime`         | When the identity was created.                      |
//! | `last_login_at`      | `Option<DateTime>` | The most recent successful login.                   |
//!
//! The role set and the password credential are stored separately, keyed by
//! the identity id; the identity record carries no back-pointers to them.

use crate::{
    Error,
    error::ValidationError,
    id::{generate_prefixed_id, validate_prefixed_id},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unique, stable identifier for a specific user.
/// Treat the value as opaque; its only guaranteed structure is the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: &str) -> Self {
        UserId(id.to_string())
    }

    pub fn new_random() -> Self {
        UserId(generate_prefixed_id("usr"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this id has the correct format for a user id.
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "usr")
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identity record. Created minimal at registration step one; the display
/// name arrives when the profile is completed. Never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    pub email: String,

    pub name: Option<String>,

    pub is_active: bool,

    // None until the email confirmation code has been checked successfully.
    pub email_confirmed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn builder() -> UserBuilder {
        UserBuilder::default()
    }

    /// Check if the user's email has been confirmed.
    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

#[derive(Default)]
pub struct UserBuilder {
    id: Option<UserId>,
    email: Option<String>,
    name: Option<String>,
    is_active: Option<bool>,
    email_confirmed_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
}

impl UserBuilder {
    pub fn id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn email_confirmed_at(mut self, email_confirmed_at: Option<DateTime<Utc>>) -> Self {
        self.email_confirmed_at = email_confirmed_at;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn last_login_at(mut self, last_login_at: Option<DateTime<Utc>>) -> Self {
        self.last_login_at = last_login_at;
        self
    }

    pub fn build(self) -> Result<User, Error> {
        Ok(User {
            id: self.id.unwrap_or_default(),
            email: self.email.ok_or(ValidationError::MissingField(
                "Email is required".to_string(),
            ))?,
            name: self.name,
            is_active: self.is_active.unwrap_or(true),
            email_confirmed_at: self.email_confirmed_at,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            last_login_at: self.last_login_at,
        })
    }
}

/// Input for creating a new identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
}

impl NewUser {
    pub fn new(email: String) -> Self {
        Self {
            id: UserId::new_random(),
            email,
            name: None,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }
}
