//! Password hashing and bearer-token issuance.

mod password;
mod token;

pub use password::{hash_password, verify_password, verify_unknown_account};
pub use token::{Claims, TokenError, TokenManager};
