//! # External Service Adapters
//!
//! Thin adapters over the two hosted collaborators: the object-storage bucket
//! ([`blob`]) and the file-search/generation service ([`search`]). Each is a
//! trait object so tests and the server can swap implementations.

pub mod blob;
pub mod search;
