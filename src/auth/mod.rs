pub mod credentials;
pub mod password;
pub mod policy;
pub mod token;

pub use credentials::{CredentialError, CredentialVerifier};
pub use password::{PasswordError, PasswordHasher};
pub use policy::{Policy, PolicyError};
pub use token::{Claims, TokenError, TokenKind, TokenService};
