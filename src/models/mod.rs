//! Data models for the wardrobe backend.
//!
//! Field names serialize in camelCase to match the web client.

mod analysis;
mod item;
mod outfit;
mod requests;
mod session;
mod weather;

pub use analysis::*;
pub use item::*;
pub use outfit::*;
pub use requests::*;
pub use session::*;
pub use weather::*;
