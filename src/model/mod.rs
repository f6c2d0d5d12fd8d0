//! Core data model.

pub mod post;
