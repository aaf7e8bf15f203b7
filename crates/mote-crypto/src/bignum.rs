//! Unsigned big-number arithmetic for RSA.
//!
//! Little-endian `u64` limbs, zeroized on drop. Only the operations RSA
//! needs: byte conversion, comparison, multiply, divide-with-remainder,
//! and modular exponentiation.

use mote_types::CryptoError;
use zeroize::Zeroize;

type Limb = u64;
type DoubleLimb = u128;

const LIMB_BITS: usize = 64;

/// A heap-allocated unsigned big number, zeroized on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct BigNum {
    /// Little-endian limbs; normalized so only zero is a single 0 limb.
    limbs: Vec<Limb>,
}

impl BigNum {
    pub fn zero() -> Self {
        Self { limbs: vec![0] }
    }

    pub fn from_u64(value: u64) -> Self {
        Self { limbs: vec![value] }
    }

    /// Build from big-endian bytes (leading zeros allowed).
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::zero();
        }
        let mut limbs = vec![0u64; bytes.len().div_ceil(8)];
        for (i, &byte) in bytes.iter().rev().enumerate() {
            limbs[i / 8] |= (byte as u64) << ((i % 8) * 8);
        }
        let mut bn = Self { limbs };
        bn.normalize();
        bn
    }

    /// Export to minimal big-endian bytes (zero exports as one 0x00 byte).
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let bits = self.bit_len();
        if bits == 0 {
            return vec![0];
        }
        let num_bytes = bits.div_ceil(8);
        let mut bytes = vec![0u8; num_bytes];
        for i in 0..num_bytes {
            bytes[num_bytes - 1 - i] = (self.limbs[i / 8] >> ((i % 8) * 8)) as u8;
        }
        bytes
    }

    /// Export to exactly `len` big-endian bytes, left-padded with zeros.
    pub fn to_bytes_be_padded(&self, len: usize) -> Result<Vec<u8>, CryptoError> {
        let raw = self.to_bytes_be();
        let raw = if raw == [0] { &raw[..0] } else { &raw[..] };
        if raw.len() > len {
            return Err(CryptoError::InputOverflow);
        }
        let mut out = vec![0u8; len];
        out[len - raw.len()..].copy_from_slice(raw);
        Ok(out)
    }

    /// Number of significant bits.
    pub fn bit_len(&self) -> usize {
        for i in (0..self.limbs.len()).rev() {
            if self.limbs[i] != 0 {
                return i * LIMB_BITS + (LIMB_BITS - self.limbs[i].leading_zeros() as usize);
            }
        }
        0
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|&l| l == 0)
    }

    fn bit(&self, i: usize) -> bool {
        let limb = i / LIMB_BITS;
        limb < self.limbs.len() && (self.limbs[limb] >> (i % LIMB_BITS)) & 1 == 1
    }

    fn normalize(&mut self) {
        while self.limbs.len() > 1 && self.limbs[self.limbs.len() - 1] == 0 {
            self.limbs.pop();
        }
    }

    /// Schoolbook multiplication.
    pub fn mul(&self, other: &BigNum) -> BigNum {
        if self.is_zero() || other.is_zero() {
            return BigNum::zero();
        }
        let mut limbs = vec![0u64; self.limbs.len() + other.limbs.len()];
        for (i, &a) in self.limbs.iter().enumerate() {
            let mut carry: u64 = 0;
            for (j, &b) in other.limbs.iter().enumerate() {
                let prod =
                    a as DoubleLimb * b as DoubleLimb + limbs[i + j] as DoubleLimb + carry as DoubleLimb;
                limbs[i + j] = prod as Limb;
                carry = (prod >> LIMB_BITS) as u64;
            }
            limbs[i + other.limbs.len()] = carry;
        }
        let mut bn = BigNum { limbs };
        bn.normalize();
        bn
    }

    /// Unsigned subtraction; callers guarantee `self >= other`.
    fn sub(&self, other: &BigNum) -> BigNum {
        debug_assert!(self >= other);
        let mut limbs = vec![0u64; self.limbs.len()];
        let mut borrow = 0u64;
        for i in 0..self.limbs.len() {
            let rhs = other.limbs.get(i).copied().unwrap_or(0);
            let (diff, b1) = self.limbs[i].overflowing_sub(rhs);
            let (diff, b2) = diff.overflowing_sub(borrow);
            limbs[i] = diff;
            borrow = (b1 as u64) + (b2 as u64);
        }
        let mut bn = BigNum { limbs };
        bn.normalize();
        bn
    }

    /// Shift left by one bit.
    fn shl1(&mut self) {
        let mut carry = 0u64;
        for limb in &mut self.limbs {
            let next = *limb >> 63;
            *limb = (*limb << 1) | carry;
            carry = next;
        }
        if carry != 0 {
            self.limbs.push(carry);
        }
    }

    /// Binary long division: returns (quotient, remainder).
    pub fn div_rem(&self, divisor: &BigNum) -> Result<(BigNum, BigNum), CryptoError> {
        if divisor.is_zero() {
            return Err(CryptoError::DivisionByZero);
        }
        if self < divisor {
            return Ok((BigNum::zero(), self.clone()));
        }

        let bits = self.bit_len();
        let mut quotient = BigNum {
            limbs: vec![0u64; bits.div_ceil(LIMB_BITS)],
        };
        let mut remainder = BigNum::zero();

        for i in (0..bits).rev() {
            remainder.shl1();
            if self.bit(i) {
                remainder.limbs[0] |= 1;
            }
            if remainder >= *divisor {
                remainder = remainder.sub(divisor);
                quotient.limbs[i / LIMB_BITS] |= 1u64 << (i % LIMB_BITS);
            }
        }

        quotient.normalize();
        remainder.normalize();
        Ok((quotient, remainder))
    }

    /// self mod modulus.
    pub fn mod_reduce(&self, modulus: &BigNum) -> Result<BigNum, CryptoError> {
        Ok(self.div_rem(modulus)?.1)
    }

    /// Square-and-multiply modular exponentiation: self^exp mod modulus.
    pub fn mod_exp(&self, exp: &BigNum, modulus: &BigNum) -> Result<BigNum, CryptoError> {
        if modulus.is_zero() {
            return Err(CryptoError::DivisionByZero);
        }
        let mut result = BigNum::from_u64(1).mod_reduce(modulus)?;
        let mut base = self.mod_reduce(modulus)?;
        let exp_bits = exp.bit_len();

        for i in 0..exp_bits {
            if exp.bit(i) {
                result = result.mul(&base).mod_reduce(modulus)?;
            }
            if i + 1 < exp_bits {
                base = base.mul(&base).mod_reduce(modulus)?;
            }
        }
        Ok(result)
    }
}

impl PartialEq for BigNum {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for BigNum {}

impl PartialOrd for BigNum {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigNum {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let (a, b) = (self.bit_len(), other.bit_len());
        if a != b {
            return a.cmp(&b);
        }
        for i in (0..self.limbs.len().max(other.limbs.len())).rev() {
            let x = self.limbs.get(i).copied().unwrap_or(0);
            let y = other.limbs.get(i).copied().unwrap_or(0);
            if x != y {
                return x.cmp(&y);
            }
        }
        std::cmp::Ordering::Equal
    }
}

impl std::fmt::Debug for BigNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex: String = self.to_bytes_be().iter().map(|b| format!("{b:02x}")).collect();
        write!(f, "BigNum(0x{hex})")
    }
}
