//! Authentication models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// User roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Dispatcher - manages operators
    Dispatcher,
    /// Operator - regular account
    #[default]
    Operator,
}

impl UserRole {
    pub const ALL: [UserRole; 2] = [UserRole::Dispatcher, UserRole::Operator];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Dispatcher => "dispatcher",
            UserRole::Operator => "operator",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| Error::UnknownRole(s.to_string()))
    }
}

/// Persisted user account
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// Username for login
    pub username: String,
    /// bcrypt hash; never leaves the service
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// User's role
    pub role: UserRole,
    /// Whether the account may log in
    pub is_active: bool,
    /// When the account was created
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new active user from an already hashed password
    pub fn new(username: String, password_hash: String, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    /// Active account holding the dispatcher role
    pub fn is_dispatcher(&self) -> bool {
        self.is_active && self.role == UserRole::Dispatcher
    }

    /// Active account holding the operator role
    pub fn is_operator(&self) -> bool {
        self.is_active && self.role == UserRole::Operator
    }
}

/// Validated registration data, ready to persist
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

/// Login credentials
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Refresh request; the token may instead arrive as a cookie
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// Body returned by login and refresh. Never carries the refresh token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessResponse {
    pub access: String,
}

/// Public profile, safe to return to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("admin".parse::<UserRole>().is_err());
        assert!("Dispatcher".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_defaults_to_operator() {
        assert_eq!(UserRole::default(), UserRole::Operator);
    }

    #[test]
    fn test_role_deserialization_is_closed() {
        let role: UserRole = serde_json::from_str("\"dispatcher\"").unwrap();
        assert_eq!(role, UserRole::Dispatcher);
        assert!(serde_json::from_str::<UserRole>("\"superuser\"").is_err());
    }

    #[test]
    fn test_role_checks_require_active() {
        let mut user = User::new("kate".to_string(), "hash".to_string(), UserRole::Dispatcher);
        assert!(user.is_dispatcher());
        assert!(!user.is_operator());

        user.is_active = false;
        assert!(!user.is_dispatcher());
    }

    #[test]
    fn test_user_info_omits_password() {
        let user = User::new("kate".to_string(), "$2b$04$secret".to_string(), UserRole::Operator);
        let json = serde_json::to_value(UserInfo::from(user)).unwrap();
        assert_eq!(json["username"], "kate");
        assert_eq!(json["role"], "operator");
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("secret"));
    }
}
