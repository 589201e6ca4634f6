//! Account registration

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::auth::models::{NewUser, User, UserRole};
use crate::auth::password::{PasswordHasher, MAX_PASSWORD_BYTES};
use crate::error::{Error, FieldErrors, Result};
use crate::store::UserStore;

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_NAME_LENGTH: usize = 150;
const MAX_EMAIL_LENGTH: usize = 254;

// Compile-time constant patterns; failure here is a bug in the codebase
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("Invalid username pattern"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("Invalid email pattern")
});

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

/// Raw registration payload. Every field is optional here so that missing
/// values surface as per-field errors instead of a parse failure.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

fn push(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(message.into());
}

fn max_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        push(
            errors,
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
    }
}

impl RegisterRequest {
    /// Check field constraints, collecting every failure
    pub fn validate(self) -> Result<NewUser> {
        let mut errors = FieldErrors::new();

        let username_missing = self.username.is_none();
        let username = self.username.unwrap_or_default();
        if username.is_empty() {
            push(&mut errors, "username", if username_missing { REQUIRED } else { BLANK });
        } else {
            max_length(&mut errors, "username", &username, MAX_NAME_LENGTH);
            if !USERNAME_RE.is_match(&username) {
                push(
                    &mut errors,
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }

        let password = match self.password {
            None => {
                push(&mut errors, "password", REQUIRED);
                String::new()
            }
            Some(password) if password.is_empty() => {
                push(&mut errors, "password", BLANK);
                password
            }
            Some(password) => {
                if password.chars().count() < MIN_PASSWORD_LENGTH {
                    push(
                        &mut errors,
                        "password",
                        format!("Ensure this field has at least {} characters.", MIN_PASSWORD_LENGTH),
                    );
                } else if password.len() > MAX_PASSWORD_BYTES {
                    push(
                        &mut errors,
                        "password",
                        format!("Ensure this field has no more than {} bytes.", MAX_PASSWORD_BYTES),
                    );
                }
                password
            }
        };

        let first_name = self.first_name.unwrap_or_default();
        max_length(&mut errors, "first_name", &first_name, MAX_NAME_LENGTH);
        let last_name = self.last_name.unwrap_or_default();
        max_length(&mut errors, "last_name", &last_name, MAX_NAME_LENGTH);

        let email = self.email.unwrap_or_default().trim().to_string();
        if !email.is_empty() {
            max_length(&mut errors, "email", &email, MAX_EMAIL_LENGTH);
            if !EMAIL_RE.is_match(&email) {
                push(&mut errors, "email", "Enter a valid email address.");
            }
        }

        let role = match self.role.as_deref() {
            None => UserRole::default(),
            Some(raw) => raw.parse::<UserRole>().unwrap_or_else(|_| {
                push(&mut errors, "role", format!("\"{}\" is not a valid choice.", raw));
                UserRole::default()
            }),
        };

        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        Ok(NewUser {
            username,
            password,
            email,
            first_name,
            last_name,
            role,
        })
    }
}

/// Validate, hash and persist a new account
pub async fn register(
    users: &dyn UserStore,
    hasher: &PasswordHasher,
    request: RegisterRequest,
) -> Result<User> {
    let username_taken = match request.username.as_deref() {
        Some(name) if !name.is_empty() => users.find_by_username(name).await?.is_some(),
        _ => false,
    };

    let new_user = match (request.validate(), username_taken) {
        (Ok(new_user), false) => new_user,
        (Ok(_), true) => return Err(Error::UsernameTaken),
        (Err(Error::Validation(mut errors)), true) => {
            push(&mut errors, "username", Error::UsernameTaken.to_string());
            return Err(Error::Validation(errors));
        }
        (Err(e), _) => return Err(e),
    };

    let password_hash = hasher.hash(&new_user.password).await?;
    let mut user = User::new(new_user.username, password_hash, new_user.role);
    user.email = new_user.email;
    user.first_name = new_user.first_name;
    user.last_name = new_user.last_name;

    let user = users.create_user(user).await?;
    tracing::info!(username = %user.username, role = %user.role, "Registered new user");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordConfig;
    use crate::store::MemoryStore;

    fn request(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..RegisterRequest::default()
        }
    }

    fn field_errors(result: Result<NewUser>) -> FieldErrors {
        match result {
            Err(Error::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_minimal_request_defaults_role() {
        let new_user = request("ivan", "longenough").validate().unwrap();
        assert_eq!(new_user.role, UserRole::Operator);
        assert_eq!(new_user.email, "");
    }

    #[test]
    fn test_short_password_rejected() {
        let errors = field_errors(request("ivan", "short").validate());
        assert_eq!(
            errors["password"],
            vec!["Ensure this field has at least 8 characters."]
        );
        assert!(!errors.contains_key("username"));
    }

    #[test]
    fn test_overlong_password_rejected() {
        let errors = field_errors(request("ivan", &"a".repeat(80)).validate());
        assert_eq!(
            errors["password"],
            vec!["Ensure this field has no more than 72 bytes."]
        );
        assert!(request("ivan", &"a".repeat(72)).validate().is_ok());
        // multi-byte characters count by their encoded length
        assert!(request("ivan", &"é".repeat(40)).validate().is_err());
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let errors = field_errors(RegisterRequest::default().validate());
        assert_eq!(errors["username"], vec![REQUIRED]);
        assert_eq!(errors["password"], vec![REQUIRED]);
    }

    #[test]
    fn test_blank_username() {
        let errors = field_errors(request("", "longenough").validate());
        assert_eq!(errors["username"], vec![BLANK]);
    }

    #[test]
    fn test_invalid_username_characters() {
        let errors = field_errors(request("bad name!", "longenough").validate());
        assert!(errors.contains_key("username"));
        assert!(request("mail.me+tag@host-1_x", "longenough").validate().is_ok());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let mut req = request("ivan", "longenough");
        req.role = Some("admin".to_string());
        let errors = field_errors(req.validate());
        assert_eq!(errors["role"], vec!["\"admin\" is not a valid choice."]);
    }

    #[test]
    fn test_email_validation() {
        let mut req = request("ivan", "longenough");
        req.email = Some("not-an-email".to_string());
        let errors = field_errors(req.validate());
        assert_eq!(errors["email"], vec!["Enter a valid email address."]);

        let mut req = request("ivan", "longenough");
        req.email = Some("ivan@example.com".to_string());
        assert_eq!(req.validate().unwrap().email, "ivan@example.com");
    }

    #[test]
    fn test_name_length_limit() {
        let mut req = request("ivan", "longenough");
        req.first_name = Some("x".repeat(151));
        let errors = field_errors(req.validate());
        assert!(errors.contains_key("first_name"));
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let store = MemoryStore::new();
        let hasher = PasswordHasher::new(&PasswordConfig {
            bcrypt_cost: crate::config::MIN_BCRYPT_COST,
        });
        let mut req = request("olga", "supersecret");
        req.role = Some("dispatcher".to_string());

        let user = register(&store, &hasher, req).await.unwrap();
        assert_eq!(user.role, UserRole::Dispatcher);
        assert_ne!(user.password_hash, "supersecret");
        assert!(hasher.verify("supersecret", &user.password_hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let store = MemoryStore::new();
        let hasher = PasswordHasher::new(&PasswordConfig {
            bcrypt_cost: crate::config::MIN_BCRYPT_COST,
        });

        register(&store, &hasher, request("olga", "supersecret")).await.unwrap();
        let result = register(&store, &hasher, request("olga", "anothersecret")).await;

        assert!(matches!(result, Err(Error::UsernameTaken)));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_register_duplicate_and_invalid_merges_errors() {
        let store = MemoryStore::new();
        let hasher = PasswordHasher::new(&PasswordConfig {
            bcrypt_cost: crate::config::MIN_BCRYPT_COST,
        });

        register(&store, &hasher, request("olga", "supersecret")).await.unwrap();
        let result = register(&store, &hasher, request("olga", "short")).await;

        match result {
            Err(Error::Validation(errors)) => {
                assert!(errors.contains_key("password"));
                assert_eq!(
                    errors["username"],
                    vec!["A user with that username already exists."]
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
