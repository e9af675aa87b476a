use crate::error::Error;
use serde::{Deserialize, Serialize};

/// An enum representing the party ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PartyID {
    /// Party 0
    ID0 = 0,
    /// Party 1
    ID1 = 1,
    /// Party 2
    ID2 = 2,
}

impl PartyID {
    pub const COUNT: usize = 3;

    pub fn all() -> [PartyID; 3] {
        [PartyID::ID0, PartyID::ID1, PartyID::ID2]
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// get next ID
    pub fn next_id(&self) -> Self {
        match *self {
            PartyID::ID0 => PartyID::ID1,
            PartyID::ID1 => PartyID::ID2,
            PartyID::ID2 => PartyID::ID0,
        }
    }

    /// get previous ID
    pub fn prev_id(&self) -> Self {
        match *self {
            PartyID::ID0 => PartyID::ID2,
            PartyID::ID1 => PartyID::ID0,
            PartyID::ID2 => PartyID::ID1,
        }
    }
}

impl TryFrom<usize> for PartyID {
    type Error = Error;

    fn try_from(other: usize) -> Result<Self, Self::Error> {
        match other {
            0 => Ok(PartyID::ID0),
            1 => Ok(PartyID::ID1),
            2 => Ok(PartyID::ID2),
            i => Err(Error::Id(i)),
        }
    }
}

impl std::fmt::Display for PartyID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "party {}", self.index())
    }
}
