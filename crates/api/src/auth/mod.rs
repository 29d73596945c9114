//! Authentication primitives.
//!
//! - [`jwt`] -- JWT access-token generation and validation.
//!
//! Tokens are issued by the portal's identity service; this crate validates
//! them and can mint them for tooling and tests.

pub mod jwt;
