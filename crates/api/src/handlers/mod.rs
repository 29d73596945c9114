//! Request handlers, one module per resource.

pub mod access;
pub mod demo_files;
pub mod demos;
pub mod viewer;
