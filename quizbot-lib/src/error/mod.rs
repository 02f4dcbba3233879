//! Error types

mod api;
mod bot;
mod callback;
mod registration;
mod store;

pub use api::*;
pub use bot::*;
pub use callback::*;
pub use registration::*;
pub use store::*;
