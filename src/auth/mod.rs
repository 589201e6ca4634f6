//! Authentication: users, tokens, cookies and registration

pub mod cookie;
pub mod jwt;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod password;
pub mod registration;

pub use cookie::CookiePolicy;
pub use jwt::{Claims, MintedToken, TokenIssuer, TokenType};
pub use lifecycle::{Revocation, TokenLifecycle, TokenPair};
pub use middleware::{bearer_token, AuthUser, Dispatcher, Operator};
pub use models::{User, UserInfo, UserRole};
pub use password::PasswordHasher;
pub use registration::{register, RegisterRequest};
