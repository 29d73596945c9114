//! Row structs and DTOs.
//!
//! Rows whose columns encode a richer core type (`demo_projects`,
//! `project_access`) convert into it with `TryFrom`, failing with
//! [`showcase_core::demo_store::StoreError::Corrupt`] on shape mismatches.

pub mod demo_access_log;
pub mod demo_project;
pub mod project;
pub mod project_access;
pub mod user;
