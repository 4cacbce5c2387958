pub mod auth;
pub mod errors;
pub mod extract;
pub mod response;
pub mod unauthorized;

pub use auth::{authenticate, AuthContext, AuthFailure};
pub use errors::attach_error_path;
pub use extract::{ValidPath, ValidQuery, ValidatedJson};
pub use response::{ApiResponse, ApiResult};
pub use unauthorized::UnauthorizedResponse;
