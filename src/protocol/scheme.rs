use crate::error::{Error, Result};
use crate::shares::{Ring2k, ScalarShares, ShareSet, VectorShares};
use itertools::izip;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 2-out-of-3 replicated additive sharing over `Z_{2^k}`.
///
/// The scheme is stateless beyond the ring: splitting draws fresh
/// randomness from the caller's generator, and every operation returns new
/// share sets. Slot `s` of a sharing is replicated between two parties
/// (slot 0 by parties 0 and 1, slot 1 by 1 and 2, slot 2 by 0 and 2), so
/// any two parties jointly hold all three slots and can reconstruct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSharing {
    ring: Ring2k,
}

impl SecretSharing {
    pub fn new(order: u64) -> Result<Self> {
        Ok(Self {
            ring: Ring2k::new(order)?,
        })
    }

    pub fn with_bits(k: u32) -> Result<Self> {
        Ok(Self {
            ring: Ring2k::with_bits(k)?,
        })
    }

    pub fn ring(&self) -> Ring2k {
        self.ring
    }

    pub fn order(&self) -> u64 {
        self.ring.order()
    }

    fn check_order(&self, order: u64) -> Result<()> {
        if order != self.order() {
            return Err(Error::OrderMismatch(self.order(), order));
        }
        Ok(())
    }

    fn assemble(&self, parts: [u64; 3]) -> [ScalarShares; 3] {
        let [r1, r2, r3] = parts;
        [
            ScalarShares::new(self.ring, [Some(r1), None, Some(r3)]),
            ScalarShares::new(self.ring, [Some(r1), Some(r2), None]),
            ScalarShares::new(self.ring, [None, Some(r2), Some(r3)]),
        ]
    }

    fn split_parts<R: Rng + CryptoRng>(&self, secret: u64, rng: &mut R) -> [ScalarShares; 3] {
        let r1 = self.ring.sample(rng);
        let r2 = self.ring.sample(rng);
        let r3 = self
            .ring
            .sub(self.ring.reduce(secret), self.ring.add(r1, r2));
        self.assemble([r1, r2, r3])
    }

    /// Split a secret into the three party views. The secret is reduced
    /// into the ring first.
    pub fn split<R: Rng + CryptoRng>(&self, secret: u64, rng: &mut R) -> [ShareSet; 3] {
        self.split_parts(secret, rng).map(ShareSet::from)
    }

    /// Re-encode three raw per-party values (e.g. multiplication
    /// contributions) as a fresh sharing of their sum. This is the single
    /// gather point of the two-round protocols: the three values are
    /// assumed to have been delivered by the parties already.
    pub fn reshare(&self, parts: [u64; 3]) -> [ShareSet; 3] {
        self.assemble(parts.map(|p| self.ring.reduce(p)))
            .map(ShareSet::from)
    }

    /// Reconstruct from any two of the three party views. Slots held by
    /// both inputs carry the same value, so `a` is preferred.
    pub fn reconstruct(&self, a: &ShareSet, b: &ShareSet) -> Result<u64> {
        let a = a.as_scalar()?;
        let b = b.as_scalar()?;
        self.check_order(a.order())?;
        self.check_order(b.order())?;
        self.reconstruct_scalar(a, b)
    }

    fn reconstruct_scalar(&self, a: &ScalarShares, b: &ScalarShares) -> Result<u64> {
        let mut secret = 0;
        for slot in 0..3 {
            let value = a
                .slot(slot)
                .or(b.slot(slot))
                .ok_or(Error::IncompleteReconstruction(slot))?;
            secret = self.ring.add(secret, value);
        }
        Ok(secret)
    }

    /// Coordinate-wise [`split`](Self::split) of a vector of secrets.
    pub fn split_vector<R: Rng + CryptoRng>(&self, secrets: &[u64], rng: &mut R) -> [ShareSet; 3] {
        let mut parties: [Vec<ScalarShares>; 3] =
            std::array::from_fn(|_| Vec::with_capacity(secrets.len()));
        for &secret in secrets {
            let [p0, p1, p2] = self.split_parts(secret, rng);
            parties[0].push(p0);
            parties[1].push(p1);
            parties[2].push(p2);
        }
        parties.map(|elems| VectorShares::new(self.ring, elems).into())
    }

    /// Coordinate-wise reconstruction, preserving index order.
    pub fn reconstruct_vector(&self, a: &ShareSet, b: &ShareSet) -> Result<Vec<u64>> {
        let a = a.as_vector()?;
        let b = b.as_vector()?;
        self.check_order(a.order())?;
        self.check_order(b.order())?;
        if a.len() != b.len() {
            return Err(Error::LengthMismatch(a.len(), b.len()));
        }
        izip!(a.iter(), b.iter())
            .map(|(a, b)| self.reconstruct_scalar(a, b))
            .collect()
    }

    /// A blinding triple summing to zero in the ring, one element per
    /// party, for [`multiply_blinded`](Self::multiply_blinded).
    pub fn zero_sum_blinds<R: Rng + CryptoRng>(&self, rng: &mut R) -> [u64; 3] {
        let b0 = self.ring.sample(rng);
        let b1 = self.ring.sample(rng);
        [b0, b1, self.ring.neg(self.ring.add(b0, b1))]
    }

    /// Two-round multiplication: round one, each party computes its local
    /// contribution from its own views of the factors; round two, the three
    /// raw contributions are reshared into a sharing of the product.
    ///
    /// Contributions are unblinded here, so the combiner sees the raw
    /// partial products before resharing. Use
    /// [`multiply_blinded`](Self::multiply_blinded) with
    /// [`zero_sum_blinds`](Self::zero_sum_blinds) to mask them.
    pub fn multiply(&self, x: &[ShareSet; 3], y: &[ShareSet; 3]) -> Result<[ShareSet; 3]> {
        self.multiply_blinded(x, y, [0; 3])
    }

    #[instrument(level = "trace", skip_all)]
    pub fn multiply_blinded(
        &self,
        x: &[ShareSet; 3],
        y: &[ShareSet; 3],
        blinds: [u64; 3],
    ) -> Result<[ShareSet; 3]> {
        let mut parts = [0u64; 3];
        for (part, xs, ys, blind) in izip!(parts.iter_mut(), x, y, blinds) {
            *part = xs.mul_share(ys, blind)?;
        }
        Ok(self.reshare(parts))
    }

    /// Two-round dot product over vector sharings; identical to
    /// multiplication with the local contribution replaced by
    /// [`ShareSet::dot_share`].
    #[instrument(level = "trace", skip_all)]
    pub fn dot_product(&self, x: &[ShareSet; 3], y: &[ShareSet; 3]) -> Result<[ShareSet; 3]> {
        let mut parts = [0u64; 3];
        for (part, xs, ys) in izip!(parts.iter_mut(), x, y) {
            *part = xs.dot_share(ys)?;
        }
        Ok(self.reshare(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xdeadbeef)
    }

    /// Every split/reshare output has exactly one absent slot, and the two
    /// holders of each slot agree on its value.
    fn assert_well_formed(shares: &[ShareSet; 3]) {
        for (p, share) in shares.iter().enumerate() {
            let share = share.as_scalar().unwrap();
            assert_eq!(share.absent_slot().unwrap(), (p + 1) % 3);
        }
        for slot in 0..3 {
            let held: Vec<u64> = shares
                .iter()
                .filter_map(|s| s.as_scalar().unwrap().slot(slot))
                .collect();
            assert_eq!(held.len(), 2);
            assert_eq!(held[0], held[1]);
        }
    }

    #[test]
    fn split_outputs_are_well_formed() {
        let scheme = SecretSharing::with_bits(16).unwrap();
        let mut rng = rng();
        for secret in [0, 1, 54, 0xFFFF] {
            assert_well_formed(&scheme.split(secret, &mut rng));
        }
        assert_well_formed(&scheme.reshare([17, 0, 0xFFFF_FFFF]));
    }

    #[test]
    fn round_trip_all_pairs() {
        let scheme = SecretSharing::with_bits(15).unwrap();
        let mut rng = rng();
        for secret in [0u64, 1, 54, 1000, (1 << 15) - 1] {
            let shares = scheme.split(secret, &mut rng);
            for (a, b) in [(0, 1), (0, 2), (1, 2)] {
                assert_eq!(scheme.reconstruct(&shares[a], &shares[b]).unwrap(), secret);
                assert_eq!(scheme.reconstruct(&shares[b], &shares[a]).unwrap(), secret);
            }
        }
    }

    #[test]
    fn one_share_set_never_suffices() {
        let scheme = SecretSharing::with_bits(16).unwrap();
        let shares = scheme.split(99, &mut rng());
        let err = scheme.reconstruct(&shares[0], &shares[0]).unwrap_err();
        assert_eq!(err, Error::IncompleteReconstruction(1));
    }

    #[test]
    fn addition_is_homomorphic() {
        let scheme = SecretSharing::with_bits(16).unwrap();
        let mut rng = rng();
        for (x, y) in [(0u64, 0u64), (1, 2), (40_000, 30_000), (0xFFFF, 0xFFFF)] {
            let xs = scheme.split(x, &mut rng);
            let ys = scheme.split(y, &mut rng);
            let sums = [
                xs[0].add(&ys[0]).unwrap(),
                xs[1].add(&ys[1]).unwrap(),
                xs[2].add(&ys[2]).unwrap(),
            ];
            let expected = scheme.ring().add(x, y);
            assert_eq!(scheme.reconstruct(&sums[0], &sums[1]).unwrap(), expected);
            assert_eq!(scheme.reconstruct(&sums[1], &sums[2]).unwrap(), expected);
        }
    }

    #[test]
    fn multiplication_protocol() {
        let scheme = SecretSharing::with_bits(16).unwrap();
        let mut rng = rng();
        for (x, y) in [(0u64, 17u64), (1, 1), (251, 13), (300, 400), (0xFFFF, 2)] {
            let xs = scheme.split(x, &mut rng);
            let ys = scheme.split(y, &mut rng);
            let product = scheme.multiply(&xs, &ys).unwrap();
            assert_well_formed(&product);
            assert_eq!(
                scheme.reconstruct(&product[0], &product[2]).unwrap(),
                scheme.ring().mul(x, y)
            );
        }
    }

    #[test]
    fn multiplication_with_zero_sum_blinds() {
        let scheme = SecretSharing::with_bits(16).unwrap();
        let mut rng = rng();
        for _ in 0..20 {
            let x = scheme.ring().sample(&mut rng);
            let y = scheme.ring().sample(&mut rng);
            let xs = scheme.split(x, &mut rng);
            let ys = scheme.split(y, &mut rng);
            let blinds = scheme.zero_sum_blinds(&mut rng);
            let ring = scheme.ring();
            assert_eq!(ring.add(ring.add(blinds[0], blinds[1]), blinds[2]), 0);
            let product = scheme.multiply_blinded(&xs, &ys, blinds).unwrap();
            assert_eq!(
                scheme.reconstruct(&product[1], &product[2]).unwrap(),
                ring.mul(x, y)
            );
        }
    }

    #[test]
    fn vector_round_trip() {
        let scheme = SecretSharing::with_bits(16).unwrap();
        let mut rng = rng();
        let secrets = [3u64, 0, 65_535, 1, 12_345];
        let shares = scheme.split_vector(&secrets, &mut rng);
        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            assert_eq!(
                scheme.reconstruct_vector(&shares[a], &shares[b]).unwrap(),
                secrets
            );
        }
    }

    #[test]
    fn dot_product_protocol() {
        let scheme = SecretSharing::with_bits(15).unwrap();
        let mut rng = rng();
        let u: Vec<u64> = (0..10).map(|_| rng.gen_range(1..=100)).collect();
        let v: Vec<u64> = (0..10).map(|_| rng.gen_range(1..=100)).collect();
        let us = scheme.split_vector(&u, &mut rng);
        let vs = scheme.split_vector(&v, &mut rng);
        let product = scheme.dot_product(&us, &vs).unwrap();

        let ring = scheme.ring();
        let mut expected = 0;
        for (a, b) in izip!(&u, &v) {
            expected = ring.add(expected, ring.mul(*a, *b));
        }
        assert_eq!(
            scheme.reconstruct(&product[0], &product[1]).unwrap(),
            expected
        );
    }

    #[test]
    fn resharing_reconstructs_the_sum() {
        let scheme = SecretSharing::with_bits(16).unwrap();
        let shares = scheme.reshare([100, 200, 300]);
        assert_eq!(scheme.reconstruct(&shares[0], &shares[2]).unwrap(), 600);
    }

    #[test]
    fn foreign_order_is_rejected() {
        let scheme = SecretSharing::with_bits(16).unwrap();
        let other = SecretSharing::with_bits(8).unwrap();
        let a = scheme.split(5, &mut rng());
        let b = other.split(5, &mut rng());
        assert_eq!(
            scheme.reconstruct(&a[0], &b[1]),
            Err(Error::OrderMismatch(1 << 16, 1 << 8))
        );
    }

    #[test]
    fn non_power_of_two_order_is_rejected() {
        assert_eq!(SecretSharing::new(1000), Err(Error::InvalidOrder(1000)));
    }
}
