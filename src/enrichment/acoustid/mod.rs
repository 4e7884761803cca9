//! AcoustID API integration
//!
//! AcoustID is a free service that identifies music by audio fingerprint.
//! API docs: https://acoustid.org/webservice

mod adapter;
mod client;
pub mod dto;

pub use adapter::{best_match, to_lookup};
pub use client::AcoustIdClient;
