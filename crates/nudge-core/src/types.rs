use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A GitHub account (user or organization) with the app installed.
///
/// Rows are never physically deleted by this service; an uninstall only
/// sets `uninstalled_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    /// GitHub account ID — primary key.
    pub id: i64,
    /// Account login (e.g. "acme-corp").
    pub login: String,
    /// When the app was installed on this account.
    pub installed_at: DateTime<Utc>,
    /// Set when the app is uninstalled; `None` while the install is live.
    pub uninstalled_at: Option<DateTime<Utc>>,
}

impl Owner {
    /// Whether the installation is currently live.
    pub fn is_active(&self) -> bool {
        self.uninstalled_at.is_none()
    }
}

/// A person who authenticated against the app, attached to one owner.
///
/// Created on first sign-in; immutable as far as this service is concerned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// GitHub user ID — primary key.
    pub id: i64,
    /// GitHub login, used as the display name in rendered messages.
    pub login: String,
    /// Delivery address. `None` when the user never shared an email.
    pub email: Option<String>,
    /// Owner this user belongs to.
    pub owner_id: i64,
}

/// One pull request produced by the app for an owner/user pair.
///
/// Append-only and written by collaborators outside this service; the drip
/// pipeline only reads it to classify dormancy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub owner_id: i64,
    pub user_id: i64,
    /// Pull request number within the owner's repository.
    pub pull_number: i64,
    pub created_at: DateTime<Utc>,
    /// Whether CI passed on the generated pull request.
    pub is_test_passed: bool,
}
