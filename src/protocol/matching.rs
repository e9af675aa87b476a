use crate::bitcode::BitCode;
use crate::error::{Error, Result};
use crate::protocol::scheme::SecretSharing;
use crate::shares::ShareSet;
use rand::{rngs::StdRng, CryptoRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Result of matching one query/entry pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Signed dot product of the two masked codes.
    pub dot: i64,
    /// Number of positions unmasked in both codes.
    pub match_ones: u64,
    /// Similarity threshold the dot product was compared against.
    pub threshold: f64,
    pub is_match: bool,
}

/// Privately compares binary codes by running the shared dot-product
/// protocol over their masked-bit representations.
///
/// `match_ratio` is the largest fraction of differing bits, among the
/// positions both masks keep, still counted as a match. The ring order
/// must exceed twice the code length, so that the signed dot product
/// survives the centered reinterpretation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskedCodeMatcher {
    sharing: SecretSharing,
    match_ratio: f64,
}

impl MaskedCodeMatcher {
    pub fn new(order: u64, match_ratio: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&match_ratio) {
            return Err(Error::InvalidMatchRatio(match_ratio));
        }
        Ok(Self {
            sharing: SecretSharing::new(order)?,
            match_ratio,
        })
    }

    pub fn sharing(&self) -> &SecretSharing {
        &self.sharing
    }

    pub fn match_ratio(&self) -> f64 {
        self.match_ratio
    }

    /// Masked-bit transform: per position `mask - 2 * (bit AND mask)`, so a
    /// kept 0-bit becomes +1, a kept 1-bit becomes -1 and a masked-out
    /// position becomes 0. The plaintext dot product of two transformed
    /// codes then counts agreements minus disagreements over the positions
    /// both masks keep.
    pub fn mask_bits(code: &BitCode) -> Vec<i8> {
        (0..code.len())
            .map(|i| {
                let mask = code.mask_bit(i) as i8;
                mask - 2 * ((code.bit(i) && code.mask_bit(i)) as i8)
            })
            .collect()
    }

    /// Embed the masked bits of `code` into the ring and split them into
    /// the three party views.
    pub fn share_masked<R: Rng + CryptoRng>(&self, code: &BitCode, rng: &mut R) -> [ShareSet; 3] {
        debug_assert!((2 * code.len() as u64) < self.sharing.order());
        let ring = self.sharing.ring();
        let masked: Vec<u64> = Self::mask_bits(code)
            .into_iter()
            .map(|v| ring.from_signed(v as i64))
            .collect();
        self.sharing.split_vector(&masked, rng)
    }

    /// The size of the common unmasked region and the similarity threshold
    /// `(1 - 2 * match_ratio) * match_ones` for a pair of codes.
    pub fn threshold(&self, a: &BitCode, b: &BitCode) -> Result<(u64, f64)> {
        if a.len() != b.len() {
            return Err(Error::LengthMismatch(a.len(), b.len()));
        }
        let match_ones = a.mask().and(b.mask()).count_ones();
        Ok((match_ones, self.threshold_for(match_ones)))
    }

    fn threshold_for(&self, match_ones: u64) -> f64 {
        (1.0 - 2.0 * self.match_ratio) * match_ones as f64
    }

    /// One query/entry run over already-shared masked codes: three local
    /// dot-product contributions, resharing, reconstruction from two of the
    /// resulting views, signed reinterpretation and the threshold test.
    pub fn match_shared(
        &self,
        query: &[ShareSet; 3],
        entry: &[ShareSet; 3],
        match_ones: u64,
    ) -> Result<MatchOutcome> {
        let product = self.sharing.dot_product(query, entry)?;
        let raw = self.sharing.reconstruct(&product[0], &product[1])?;
        let dot = self.sharing.ring().to_signed(raw);
        let threshold = self.threshold_for(match_ones);
        Ok(MatchOutcome {
            dot,
            match_ones,
            threshold,
            is_match: (dot as f64) > threshold,
        })
    }

    /// Full pairwise protocol: mask both codes, share them, and run the
    /// shared dot product against the threshold.
    pub fn match_codes<R: Rng + CryptoRng>(
        &self,
        a: &BitCode,
        b: &BitCode,
        rng: &mut R,
    ) -> Result<MatchOutcome> {
        let (match_ones, _) = self.threshold(a, b)?;
        let shared_a = self.share_masked(a, rng);
        let shared_b = self.share_masked(b, rng);
        self.match_shared(&shared_a, &shared_b, match_ones)
    }

    /// Scan a database: the query is shared once, then each entry runs one
    /// independent pairwise protocol, in parallel. Per-entry generators are
    /// seeded from `rng` up front, so a seeded scan is reproducible
    /// regardless of scheduling. Any error aborts the whole scan.
    #[instrument(level = "debug", skip_all, fields(entries = db.len()))]
    pub fn scan<R: Rng + CryptoRng>(
        &self,
        query: &BitCode,
        db: &[BitCode],
        rng: &mut R,
    ) -> Result<Vec<MatchOutcome>> {
        let shared_query = self.share_masked(query, rng);
        let seeds: Vec<[u8; 32]> = (0..db.len()).map(|_| rng.gen()).collect();
        let outcomes = db
            .par_iter()
            .zip(seeds)
            .map(|(entry, seed)| {
                let mut rng = StdRng::from_seed(seed);
                let (match_ones, _) = self.threshold(query, entry)?;
                let shared_entry = self.share_masked(entry, &mut rng);
                self.match_shared(&shared_query, &shared_entry, match_ones)
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            matches = outcomes.iter().filter(|o| o.is_match).count(),
            "database scan finished"
        );
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcode::BitArray;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xbadc0de)
    }

    #[test]
    fn match_ratio_range_is_enforced() {
        assert!(MaskedCodeMatcher::new(1 << 16, 0.0).is_ok());
        assert!(MaskedCodeMatcher::new(1 << 16, 0.999).is_ok());
        assert_eq!(
            MaskedCodeMatcher::new(1 << 16, 1.0),
            Err(Error::InvalidMatchRatio(1.0))
        );
        assert_eq!(
            MaskedCodeMatcher::new(1 << 16, -0.1),
            Err(Error::InvalidMatchRatio(-0.1))
        );
    }

    #[test]
    fn mask_bits_values() {
        let code = BitCode::new(
            BitArray::from_bits(&[false, true, false, true]),
            BitArray::from_bits(&[true, true, false, false]),
        )
        .unwrap();
        assert_eq!(MaskedCodeMatcher::mask_bits(&code), vec![1, -1, 0, 0]);
    }

    /// The plaintext dot product of two masked-bit vectors equals the
    /// popcount-based reference over the jointly kept positions.
    #[test]
    fn plaintext_masked_dot_matches_popcount_reference() {
        let mut rng = rng();
        for _ in 0..100 {
            let a = BitCode::new(
                BitArray::random_rng(64, &mut rng),
                BitArray::random_rng(64, &mut rng),
            )
            .unwrap();
            let b = BitCode::new(
                BitArray::random_rng(64, &mut rng),
                BitArray::random_rng(64, &mut rng),
            )
            .unwrap();
            let dot: i64 = MaskedCodeMatcher::mask_bits(&a)
                .iter()
                .zip(MaskedCodeMatcher::mask_bits(&b).iter())
                .map(|(&x, &y)| x as i64 * y as i64)
                .sum();
            assert_eq!(dot, a.dot_distance(&b).unwrap().0);
        }
    }

    /// The shared dot product of two masked codes equals the popcount-based
    /// plaintext reference.
    #[test]
    fn masked_dot_matches_reference() {
        let matcher = MaskedCodeMatcher::new(1 << 16, 0.01).unwrap();
        let mut rng = rng();
        for _ in 0..100 {
            let a = BitCode::new(
                BitArray::random_rng(64, &mut rng),
                BitArray::random_rng(64, &mut rng),
            )
            .unwrap();
            let b = BitCode::new(
                BitArray::random_rng(64, &mut rng),
                BitArray::random_rng(64, &mut rng),
            )
            .unwrap();
            let outcome = matcher.match_codes(&a, &b, &mut rng).unwrap();
            let (expected_dot, expected_ones) = a.dot_distance(&b).unwrap();
            assert_eq!(outcome.dot, expected_dot);
            assert_eq!(outcome.match_ones, expected_ones);
        }
    }

    #[test]
    fn scan_aborts_on_length_mismatch() {
        let matcher = MaskedCodeMatcher::new(1 << 16, 0.01).unwrap();
        let mut rng = rng();
        let query = BitCode::random_rng(64, &mut rng);
        let db = vec![
            BitCode::random_rng(64, &mut rng),
            BitCode::random_rng(32, &mut rng),
        ];
        assert_eq!(
            matcher.scan(&query, &db, &mut rng),
            Err(Error::LengthMismatch(64, 32))
        );
    }

    #[test]
    fn scan_is_deterministic_under_a_seed() {
        let matcher = MaskedCodeMatcher::new(1 << 16, 0.05).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        let query = BitCode::random_rng(128, &mut rng);
        let db: Vec<BitCode> = (0..8).map(|_| BitCode::random_rng(128, &mut rng)).collect();

        let first = matcher
            .scan(&query, &db, &mut StdRng::seed_from_u64(5))
            .unwrap();
        let second = matcher
            .scan(&query, &db, &mut StdRng::seed_from_u64(5))
            .unwrap();
        assert_eq!(first, second);
    }
}
