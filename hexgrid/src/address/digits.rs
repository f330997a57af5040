//! Fixed-capacity digit strings.
//!
//! A [`Digits`] value is the position of a cell relative to the origin of
//! its face or vertex: a most-significant-first sequence of base-7 digits.
//! Storage is an inline array sized for the maximum resolution, so digit
//! strings are `Copy` and never alias.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::error::AddressError;
use super::MAX_RESOLUTION;

/// An owned, fixed-capacity string of hexagon digits (each 0..=6).
#[derive(Clone, Copy)]
pub struct Digits {
    buf: [u8; MAX_RESOLUTION],
    len: u8,
}

impl Digits {
    /// The empty digit string (the origin at resolution 0).
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_RESOLUTION],
            len: 0,
        }
    }

    /// Build from a slice of digit values.
    ///
    /// # Errors
    ///
    /// `InvalidDigit` for values above 6, `ResolutionOverflow` for more than
    /// [`MAX_RESOLUTION`] digits.
    pub fn from_slice(digits: &[u8]) -> Result<Self, AddressError> {
        if digits.len() > MAX_RESOLUTION {
            return Err(AddressError::ResolutionOverflow {
                resolution: digits.len(),
                max: MAX_RESOLUTION,
            });
        }
        let mut out = Self::new();
        for &digit in digits {
            if digit > 6 {
                return Err(AddressError::InvalidDigit(digit));
            }
            out.buf[out.len as usize] = digit;
            out.len += 1;
        }
        Ok(out)
    }

    /// `count` zero digits.
    pub fn zeros(count: usize) -> Result<Self, AddressError> {
        if count > MAX_RESOLUTION {
            return Err(AddressError::ResolutionOverflow {
                resolution: count,
                max: MAX_RESOLUTION,
            });
        }
        let mut out = Self::new();
        out.len = count as u8;
        Ok(out)
    }

    /// The digits as a slice, most significant first.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    /// Number of digits.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True when there are no digits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Digit at `position` counted from the most significant end.
    pub fn get(&self, position: usize) -> Option<u8> {
        self.as_slice().get(position).copied()
    }

    /// Last (least significant) digit.
    pub fn last(&self) -> Option<u8> {
        self.as_slice().last().copied()
    }

    /// Append a digit on the least significant end.
    pub fn push(&mut self, digit: u8) -> Result<(), AddressError> {
        if digit > 6 {
            return Err(AddressError::InvalidDigit(digit));
        }
        if self.len() >= MAX_RESOLUTION {
            return Err(AddressError::ResolutionOverflow {
                resolution: self.len() + 1,
                max: MAX_RESOLUTION,
            });
        }
        self.buf[self.len as usize] = digit;
        self.len += 1;
        Ok(())
    }

    /// Remove and return the least significant digit.
    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let digit = self.buf[self.len as usize];
        self.buf[self.len as usize] = 0;
        Some(digit)
    }

    /// Shorten to the first `len` digits. Longer lengths are ignored.
    pub fn truncate(&mut self, len: usize) {
        while self.len() > len {
            self.pop();
        }
    }

    /// Overwrite the digit at `position`.
    pub(crate) fn set(&mut self, position: usize, digit: u8) {
        if position < self.len() && digit <= 6 {
            self.buf[position] = digit;
        }
    }

    /// Most significant non-zero digit and its position counted from the
    /// least significant end, or `None` at the origin.
    pub fn most_significant(&self) -> Option<(u8, usize)> {
        let len = self.len();
        self.as_slice()
            .iter()
            .enumerate()
            .find(|(_, &d)| d != 0)
            .map(|(i, &d)| (d, len - 1 - i))
    }

    /// True when every digit is zero (including the empty string).
    pub fn is_all_zero(&self) -> bool {
        self.as_slice().iter().all(|&d| d == 0)
    }

    /// True when `self` is a prefix of `other`.
    pub fn is_prefix_of(&self, other: &Digits) -> bool {
        other.as_slice().starts_with(self.as_slice())
    }

    /// True when no two adjacent digits are both non-zero.
    ///
    /// A vertex child (non-zero digit) only has a centroid child, so a
    /// non-zero digit must be followed by a zero.
    pub fn is_well_formed(&self) -> bool {
        self.as_slice().windows(2).all(|w| w[0] == 0 || w[1] == 0)
    }
}

impl Default for Digits {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Digits {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Digits {}

impl Hash for Digits {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl PartialOrd for Digits {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Digits {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl fmt::Display for Digits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in self.as_slice() {
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digits(\"{}\")", self)
    }
}

impl FromStr for Digits {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut values = Vec::with_capacity(s.len());
        for c in s.chars() {
            match c.to_digit(10) {
                Some(d) if d <= 6 => values.push(d as u8),
                _ => return Err(AddressError::InvalidAddress(s.to_string())),
            }
        }
        Self::from_slice(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_parse_and_display() {
        let d: Digits = "010203".parse().unwrap();
        assert_eq!(d.len(), 6);
        assert_eq!(d.to_string(), "010203");
        assert_eq!(d.get(1), Some(1));
        assert!("0107".parse::<Digits>().is_err());
    }

    #[test]
    fn test_digits_capacity() {
        assert!(Digits::zeros(MAX_RESOLUTION).is_ok());
        assert!(matches!(
            Digits::zeros(MAX_RESOLUTION + 1),
            Err(AddressError::ResolutionOverflow { .. })
        ));

        let mut d = Digits::zeros(MAX_RESOLUTION).unwrap();
        assert!(d.push(0).is_err());
    }

    #[test]
    fn test_digits_push_pop() {
        let mut d = Digits::new();
        d.push(1).unwrap();
        d.push(0).unwrap();
        assert_eq!(d.to_string(), "10");
        assert_eq!(d.pop(), Some(0));
        assert_eq!(d.pop(), Some(1));
        assert_eq!(d.pop(), None);
        assert!(d.push(7).is_err());
    }

    #[test]
    fn test_most_significant() {
        let d: Digits = "000103".parse().unwrap();
        assert_eq!(d.most_significant(), Some((1, 2)));

        let origin: Digits = "000".parse().unwrap();
        assert_eq!(origin.most_significant(), None);
    }

    #[test]
    fn test_equality_ignores_spare_capacity() {
        let mut a: Digits = "0102".parse().unwrap();
        a.pop();
        let b: Digits = "010".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_well_formed() {
        assert!("010203".parse::<Digits>().unwrap().is_well_formed());
        assert!("1020".parse::<Digits>().unwrap().is_well_formed());
        assert!(!"0120".parse::<Digits>().unwrap().is_well_formed());
    }
}
