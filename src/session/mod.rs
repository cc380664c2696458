//! Who is signed in, and the operations that change it.

mod slot;
mod store;
mod token;

pub use slot::{Generation, SessionSlot, SessionStatus};
pub use store::SessionStore;
pub use token::AuthToken;
