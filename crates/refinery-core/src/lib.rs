//! Core types and the result refinement pipeline for Refinery.
//!
//! A session keeps an ordered history of executed searches, merges their
//! results up to the selected search, and refines the merged result with
//! object type, pruning, time, and retraction rules before anything is
//! displayed.
//!
//! Everything except [`session::Session`]'s search calls is synchronous and
//! pure. This crate has no HTTP dependencies; the platform client lives in
//! `refinery-cli` behind [`backend::SearchBackend`].

pub mod backend;
pub mod error;
pub mod export;
pub mod filters;
pub mod graph;
pub mod history;
pub mod model;
pub mod refine;
pub mod retraction;
pub mod search;
pub mod session;
pub mod timestamp;

pub use error::{Error, Result};
