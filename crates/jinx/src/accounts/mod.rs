//! Accounts: credentials, bearer tokens, and the user profile.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod token;

#[cfg(test)]
mod tests;

pub use domain::{Email, Gender, PasswordHash, User, Username};
pub use repository::{UserRepository, UserStats};
pub use service::{AccountError, AuthResponse, AuthService, ProfileService, ProfileView};
pub use token::{Claims, TokenKind, TokenManager};
