//! # civitas-shared
//!
//! Types shared by every Civitas crate: identifiers, the closed enumerations
//! of the issue lifecycle, the per-request [`Actor`](types::Actor) capability
//! token and the storage-agnostic query descriptors.

pub mod constants;
pub mod error;
pub mod query;
pub mod types;

pub use error::ParseError;
pub use query::*;
pub use types::*;
