//! # Ticketbooth Authentication
//!
//! Credential primitives for the Ticketbooth API:
//!
//! - [`password`]: Argon2id hashing and verification (PHC strings)
//! - [`token`]: stateless HMAC-SHA256 signed bearer tokens
//!
//! Account storage and role checks live in `ticketbooth-core`; this crate only
//! knows about bytes, secrets and clocks.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod error;
pub mod password;
pub mod token;

pub use error::{AuthError, Result};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenSigner};
