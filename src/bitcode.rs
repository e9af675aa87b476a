use crate::error::{Error, Result};
use rand::{
    distributions::{Bernoulli, Distribution},
    Rng,
};
use serde::{Deserialize, Serialize};

/// Dynamically sized bit vector packed into `u64` limbs.
///
/// Bits past `len` in the last limb are kept zero, so popcounts over the
/// limbs are popcounts over the vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitArray {
    limbs: Vec<u64>,
    len: usize,
}

impl BitArray {
    pub fn zeros(len: usize) -> Self {
        Self {
            limbs: vec![0; len.div_ceil(64)],
            len,
        }
    }

    pub fn ones(len: usize) -> Self {
        let mut array = Self {
            limbs: vec![u64::MAX; len.div_ceil(64)],
            len,
        };
        array.clear_tail();
        array
    }

    pub fn from_bits(bits: &[bool]) -> Self {
        let mut array = Self::zeros(bits.len());
        for (i, bit) in bits.iter().enumerate() {
            array.set_bit(i, *bit);
        }
        array
    }

    #[inline]
    pub fn random_rng<R: Rng>(len: usize, rng: &mut R) -> Self {
        let mut array = Self::zeros(len);
        rng.fill(array.limbs.as_mut_slice());
        array.clear_tail();
        array
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get_bit(&self, i: usize) -> bool {
        assert!(i < self.len);
        (self.limbs[i / 64] >> (i % 64)) & 1 == 1
    }

    #[inline]
    pub fn set_bit(&mut self, i: usize, val: bool) {
        assert!(i < self.len);
        if val {
            self.limbs[i / 64] |= 1u64 << (i % 64);
        } else {
            self.limbs[i / 64] &= !(1u64 << (i % 64));
        }
    }

    #[inline]
    pub fn flip_bit(&mut self, i: usize) {
        assert!(i < self.len);
        self.limbs[i / 64] ^= 1u64 << (i % 64);
    }

    pub fn count_ones(&self) -> u64 {
        self.limbs.iter().map(|l| l.count_ones() as u64).sum()
    }

    /// Bitwise AND; both arrays must have the same length.
    pub fn and(&self, other: &Self) -> Self {
        assert_eq!(self.len, other.len);
        Self {
            limbs: self
                .limbs
                .iter()
                .zip(&other.limbs)
                .map(|(a, b)| a & b)
                .collect(),
            len: self.len,
        }
    }

    /// Bitwise XOR; both arrays must have the same length.
    pub fn xor(&self, other: &Self) -> Self {
        assert_eq!(self.len, other.len);
        Self {
            limbs: self
                .limbs
                .iter()
                .zip(&other.limbs)
                .map(|(a, b)| a ^ b)
                .collect(),
            len: self.len,
        }
    }

    pub fn bits(&self) -> Bits<'_> {
        Bits {
            array: self,
            index: 0,
        }
    }

    fn clear_tail(&mut self) {
        let used = self.len % 64;
        if used != 0 {
            if let Some(last) = self.limbs.last_mut() {
                *last &= (1u64 << used) - 1;
            }
        }
    }
}

impl std::ops::BitAnd for &BitArray {
    type Output = BitArray;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl std::ops::BitXor for &BitArray {
    type Output = BitArray;

    fn bitxor(self, rhs: Self) -> Self::Output {
        self.xor(rhs)
    }
}

pub struct Bits<'a> {
    array: &'a BitArray,
    index: usize,
}

impl Iterator for Bits<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.array.len() {
            None
        } else {
            let bit = self.array.get_bit(self.index);
            self.index += 1;
            Some(bit)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Bits<'_> {}

/// A binary code together with the validity mask marking which positions
/// carry information.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitCode {
    code: BitArray,
    mask: BitArray,
}

impl BitCode {
    pub fn new(code: BitArray, mask: BitArray) -> Result<Self> {
        if code.len() != mask.len() {
            return Err(Error::LengthMismatch(code.len(), mask.len()));
        }
        Ok(Self { code, mask })
    }

    /// Random code with a nearly full mask; about 10% of the positions are
    /// masked out.
    pub fn random_rng<R: Rng>(len: usize, rng: &mut R) -> Self {
        let code = BitArray::random_rng(len, rng);
        let mut mask = BitArray::ones(len);
        for _ in 0..len / 10 {
            mask.set_bit(rng.gen_range(0..len), false);
        }
        Self { code, mask }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn code(&self) -> &BitArray {
        &self.code
    }

    pub fn mask(&self) -> &BitArray {
        &self.mask
    }

    pub fn bit(&self, i: usize) -> bool {
        self.code.get_bit(i)
    }

    pub fn mask_bit(&self, i: usize) -> bool {
        self.mask.get_bit(i)
    }

    pub fn flip_code_bit(&mut self, i: usize) {
        self.code.flip_bit(i);
    }

    /// A copy whose code bits differ with probability `approx_diff_factor`;
    /// the mask is kept.
    pub fn get_similar<R: Rng>(&self, rng: &mut R, approx_diff_factor: f64) -> Self {
        let mut res = self.clone();
        let dist = Bernoulli::new(approx_diff_factor).unwrap();
        for i in 0..self.len() {
            if dist.sample(rng) {
                res.code.flip_bit(i);
            }
        }
        res
    }

    /// Plaintext counterpart of the shared masked dot product: the signed
    /// count of agreements minus disagreements over the positions both
    /// masks keep, plus the size of that common region.
    pub fn dot_distance(&self, other: &Self) -> Result<(i64, u64)> {
        if self.len() != other.len() {
            return Err(Error::LengthMismatch(self.len(), other.len()));
        }
        let common = self.mask.and(&other.mask);
        let match_ones = common.count_ones();
        let differing = self.code.xor(&other.code).and(&common).count_ones();
        Ok((match_ones as i64 - 2 * differing as i64, match_ones))
    }
}

/// A plain in-memory collection of codes, for tests, benches and database
/// scans.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct CodeDb {
    pub db: Vec<BitCode>,
}

impl CodeDb {
    pub fn new() -> Self {
        Self { db: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn add_code(&mut self, code: BitCode) {
        self.db.push(code);
    }

    pub fn new_random_rng<R: Rng>(size: usize, code_len: usize, rng: &mut R) -> Self {
        let mut db = Vec::with_capacity(size);
        for _ in 0..size {
            db.push(BitCode::random_rng(code_len, rng));
        }
        Self { db }
    }
}
