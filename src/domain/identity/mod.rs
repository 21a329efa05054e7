// ============================================================================
// Identity - users, roles, passwords and access tokens
// ============================================================================

pub mod errors;
pub mod model;
pub mod password;
pub mod service;
pub mod token;

pub use errors::*;
pub use model::*;
pub use service::*;
pub use token::{Claims, IssuedToken, TokenIssuer};
