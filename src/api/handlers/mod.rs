//! API request handlers.

mod auth;
mod misc;
mod users;

pub use auth::*;
pub use misc::*;
pub use users::*;
