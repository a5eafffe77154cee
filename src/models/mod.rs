//! Data models for the clan standings backend.
//!
//! Wire shapes match the frontend TypeScript interfaces exactly for seamless interoperability.

mod snapshot;
mod views;

pub use snapshot::*;
pub use views::*;
