//! Domain logic for the demo hosting service.
//!
//! This crate has no database or HTTP dependencies. Persistence is reached
//! through the [`demo_store::DemoRecordStore`] trait, which the `db` crate
//! implements for PostgreSQL.

pub mod access;
pub mod demo;
pub mod demo_store;
pub mod deploy;
pub mod error;
pub mod roles;
pub mod serving;
pub mod slug;
pub mod staging;
pub mod types;
pub mod viewer;
