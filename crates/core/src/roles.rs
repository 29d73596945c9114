//! Well-known role name constants.
//!
//! These must match the `role` CHECK constraint on the `users` table.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CLIENT: &str = "client";
