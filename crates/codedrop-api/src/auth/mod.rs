pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

pub use jwt::JwtKeys;
pub use models::{AuthUser, JwtClaims};
