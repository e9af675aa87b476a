pub mod ring;
pub mod share_set;

pub use ring::Ring2k;
pub use share_set::{ScalarShares, ShareSet, VectorShares};
