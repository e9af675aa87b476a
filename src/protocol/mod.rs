pub mod matching;
pub mod scheme;

pub use matching::{MaskedCodeMatcher, MatchOutcome};
pub use scheme::SecretSharing;
