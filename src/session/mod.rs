//! Sessions that drive the ledger and the sign-in state.

mod rating;
mod user;

pub use rating::RatingSession;
pub use user::{UserProfile, UserSession, USER_KEY};
