pub mod bitcode;
pub mod error;
pub mod party;
pub mod protocol;
pub mod shares;

pub use error::{Error, Result};
pub use party::PartyID;
