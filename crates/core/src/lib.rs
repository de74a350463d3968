//! # Rally Bot Core
//!
//! Platform-independent pieces of the rally bot: the rally and countdown models,
//! the in-memory roster store and the roster export formats. Nothing in here
//! talks to Discord, so everything can be exercised from plain unit tests.

pub mod errors;
pub mod export;
pub mod models;
pub mod roster;
