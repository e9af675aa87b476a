use crate::error::{Error, Result};
use crate::party::PartyID;
use crate::shares::ring::Ring2k;
use itertools::izip;
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Number of replicated slots; equal to the number of parties.
pub const NUM_SLOTS: usize = 3;

/// One party's view of a single shared scalar.
///
/// Slot `s` holds `Some(residue)` when this party is one of the two holders
/// of that slot, `None` otherwise. For a well-formed sharing exactly one
/// slot is absent, and the secret is the mod-`order` sum of one held value
/// per slot across the three parties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarShares {
    ring: Ring2k,
    slots: [Option<u64>; NUM_SLOTS],
}

impl ScalarShares {
    pub fn new(ring: Ring2k, slots: [Option<u64>; NUM_SLOTS]) -> Self {
        Self { ring, slots }
    }

    pub fn ring(&self) -> Ring2k {
        self.ring
    }

    pub fn order(&self) -> u64 {
        self.ring.order()
    }

    pub fn slot(&self, index: usize) -> Option<u64> {
        self.slots[index]
    }

    pub fn slots(&self) -> &[Option<u64>; NUM_SLOTS] {
        &self.slots
    }

    /// Index of the single slot this party does not hold.
    pub fn absent_slot(&self) -> Result<usize> {
        let mut held = 0;
        let mut absent = None;
        for (index, slot) in self.slots.iter().enumerate() {
            match slot {
                Some(_) => held += 1,
                None => absent = Some(index),
            }
        }
        match (held, absent) {
            (2, Some(index)) => Ok(index),
            _ => Err(Error::MalformedShareSet(held)),
        }
    }

    /// The party this view belongs to; party `p` misses slot `(p + 1) % 3`.
    pub fn owner(&self) -> Result<PartyID> {
        PartyID::try_from((self.absent_slot()? + 2) % NUM_SLOTS)
    }

    fn check_order(&self, other: &Self) -> Result<()> {
        if self.order() != other.order() {
            return Err(Error::OrderMismatch(self.order(), other.order()));
        }
        Ok(())
    }

    /// Slot-wise sum. A slot is held in the result only when both operands
    /// hold it; reconstructing the result yields the sum of the secrets.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_order(other)?;
        let mut slots = [None; NUM_SLOTS];
        for (out, a, b) in izip!(slots.iter_mut(), &self.slots, &other.slots) {
            if let (Some(a), Some(b)) = (a, b) {
                *out = Some(self.ring.add(*a, *b));
            }
        }
        Ok(Self {
            ring: self.ring,
            slots,
        })
    }

    /// This is only one party's contribution to the product (so without the
    /// resharing round)! The returned value is not a valid share on its
    /// own; the three contributions must be recombined through resharing
    /// before reconstruction.
    ///
    /// `blind` is added to the contribution. The protocol drivers pass zero;
    /// a caller wanting the raw partials masked supplies a triple summing to
    /// zero across the three parties.
    pub fn mul_share(&self, other: &Self, blind: u64) -> Result<u64> {
        self.check_order(other)?;
        let absent = self.absent_slot()?;
        if other.absent_slot()? != absent {
            return Err(Error::PartyMismatch);
        }
        let i = (absent + 2) % NUM_SLOTS;
        let j = (absent + 1) % NUM_SLOTS;
        match (self.slots[i], self.slots[j], other.slots[i], other.slots[j]) {
            (Some(a_i), Some(a_j), Some(b_i), Some(b_j)) => {
                let ring = self.ring;
                let cross = ring.mul(ring.add(a_i, a_j), ring.add(b_i, b_j));
                Ok(ring.add(ring.sub(cross, ring.mul(a_j, b_j)), blind))
            }
            _ => Err(Error::PartyMismatch),
        }
    }
}

/// One party's view of a shared vector: one scalar sharing per coordinate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorShares {
    ring: Ring2k,
    elems: Vec<ScalarShares>,
}

impl VectorShares {
    pub fn new(ring: Ring2k, elems: Vec<ScalarShares>) -> Self {
        debug_assert!(elems.iter().all(|e| e.order() == ring.order()));
        Self { ring, elems }
    }

    pub fn ring(&self) -> Ring2k {
        self.ring
    }

    pub fn order(&self) -> u64 {
        self.ring.order()
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScalarShares> {
        self.elems.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ScalarShares> {
        self.elems.get(index)
    }

    /// One party's contribution to the dot product: coordinate-wise
    /// [`ScalarShares::mul_share`] with zero blind, summed in the ring. As
    /// with the scalar contribution, the three results must be reshared
    /// before they mean anything.
    pub fn dot_share(&self, other: &Self) -> Result<u64> {
        if self.order() != other.order() {
            return Err(Error::OrderMismatch(self.order(), other.order()));
        }
        if self.len() != other.len() {
            return Err(Error::LengthMismatch(self.len(), other.len()));
        }
        let mut acc = 0;
        for (a, b) in izip!(&self.elems, &other.elems) {
            acc = self.ring.add(acc, a.mul_share(b, 0)?);
        }
        Ok(acc)
    }
}

/// A party's full view of one shared value, scalar or vector.
///
/// The kind is fixed at construction and checked by every operation; it is
/// never inferred from the contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareSet {
    Scalar(ScalarShares),
    Vector(VectorShares),
}

impl ShareSet {
    pub fn ring(&self) -> Ring2k {
        match self {
            ShareSet::Scalar(s) => s.ring(),
            ShareSet::Vector(v) => v.ring(),
        }
    }

    pub fn order(&self) -> u64 {
        self.ring().order()
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, ShareSet::Vector(_))
    }

    pub fn as_scalar(&self) -> Result<&ScalarShares> {
        match self {
            ShareSet::Scalar(s) => Ok(s),
            ShareSet::Vector(_) => Err(Error::NotScalar),
        }
    }

    pub fn as_vector(&self) -> Result<&VectorShares> {
        match self {
            ShareSet::Vector(v) => Ok(v),
            ShareSet::Scalar(_) => Err(Error::NotVector),
        }
    }

    /// Local addition of two scalar share sets; see [`ScalarShares::add`].
    pub fn add(&self, other: &ShareSet) -> Result<ShareSet> {
        Ok(ShareSet::Scalar(self.as_scalar()?.add(other.as_scalar()?)?))
    }

    /// Local multiplication contribution; see [`ScalarShares::mul_share`].
    pub fn mul_share(&self, other: &ShareSet, blind: u64) -> Result<u64> {
        self.as_scalar()?.mul_share(other.as_scalar()?, blind)
    }

    /// Local dot-product contribution; see [`VectorShares::dot_share`].
    pub fn dot_share(&self, other: &ShareSet) -> Result<u64> {
        self.as_vector()?.dot_share(other.as_vector()?)
    }
}

impl From<ScalarShares> for ShareSet {
    fn from(shares: ScalarShares) -> Self {
        ShareSet::Scalar(shares)
    }
}

impl From<VectorShares> for ShareSet {
    fn from(shares: VectorShares) -> Self {
        ShareSet::Vector(shares)
    }
}

impl Add<&ShareSet> for &ShareSet {
    type Output = Result<ShareSet>;

    fn add(self, rhs: &ShareSet) -> Self::Output {
        ShareSet::add(self, rhs)
    }
}
