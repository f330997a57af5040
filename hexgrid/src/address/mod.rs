//! Hexagonal cell addressing.
//!
//! A [`CellAddress`] names one cell of the icosahedral hexagon grid: a
//! prefix selecting one of 20 faces (`A`..`T`) or 12 vertices (`01`..`12`)
//! followed by a digit string, one digit per resolution.
//!
//! ```text
//!   A-0102         face A, resolution 4
//!   01-0300        vertex 1, resolution 4 (a pentagon when all digits are 0)
//! ```
//!
//! Digit 0 selects the centred child; digits 1-6 select one of the six
//! children on the parent's vertices. A cell reached through a non-zero digit
//! has a single, centred child, so a well-formed address never has two
//! non-zero digits in a row.
//!
//! Arithmetic lives in [`math`] and [`polar`] and works on bare [`Digits`];
//! the methods on [`CellAddress`] add the prefix checks.
//!
//! # Example
//!
//! ```
//! use hexgrid::address::{CellAddress, Direction};
//!
//! let a: CellAddress = "A-0102".parse().unwrap();
//! let b = a.move_to(Direction::Five).unwrap();
//! assert_eq!(b.prefix(), a.prefix());
//! assert_eq!(b.to_string(), "A-0100");
//! ```

mod constants;
mod digits;
mod direction;
mod error;
pub mod math;
pub mod polar;

pub use constants::GridConstants;
pub use digits::Digits;
pub use direction::{hex_sector_of_angle, Direction, HexClass, RotateDir, HEX_SIDES};
pub use error::AddressError;
pub use math::{Factors, MAX_FACTOR};
pub use polar::PolarCoord;

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Maximum number of digits in an address.
pub const MAX_RESOLUTION: usize = 40;

/// Maximum depth of a tile relative to its root. Deeper tiles hold more
/// cells than a `u32` offset can address.
pub const MAX_RELATIVE_DEPTH: usize = 18;

/// Number of icosahedron faces.
pub const FACE_COUNT: u8 = 20;

/// Number of icosahedron vertices.
pub const VERTEX_COUNT: u8 = 12;

/// The face or vertex an address is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prefix {
    /// Face `A` (0) to `T` (19).
    Face(u8),
    /// Vertex 1 to 12.
    Vertex(u8),
}

impl Prefix {
    /// Face from its letter.
    pub fn face(letter: char) -> Result<Self, AddressError> {
        let upper = letter.to_ascii_uppercase();
        if ('A'..='T').contains(&upper) {
            Ok(Prefix::Face(upper as u8 - b'A'))
        } else {
            Err(AddressError::InvalidAddress(letter.to_string()))
        }
    }

    /// Vertex from its number (1..=12).
    pub fn vertex(number: u8) -> Result<Self, AddressError> {
        if (1..=VERTEX_COUNT).contains(&number) {
            Ok(Prefix::Vertex(number))
        } else {
            Err(AddressError::InvalidAddress(format!("{:02}", number)))
        }
    }

    pub fn is_vertex(self) -> bool {
        matches!(self, Prefix::Vertex(_))
    }

    /// True for the northern hemisphere faces and vertices.
    pub fn is_northern(self) -> bool {
        match self {
            Prefix::Face(index) => index < FACE_COUNT / 2,
            Prefix::Vertex(number) => number <= VERTEX_COUNT / 2,
        }
    }

    /// The direction in which a vertex's pentagon has no neighbour.
    pub fn gap_direction(self) -> Option<Direction> {
        match self {
            Prefix::Vertex(number) if number <= VERTEX_COUNT / 2 => Some(Direction::One),
            Prefix::Vertex(_) => Some(Direction::Four),
            Prefix::Face(_) => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Face(index) => write!(f, "{}", (b'A' + index) as char),
            Prefix::Vertex(number) => write!(f, "{:02}", number),
        }
    }
}

/// A cell of the hexagon grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    prefix: Prefix,
    digits: Digits,
}

fn address_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^([A-Ta-t]|0[1-9]|1[0-2])(?:-([0-6]*))?$").ok())
        .as_ref()
}

impl CellAddress {
    pub fn new(prefix: Prefix, digits: Digits) -> Self {
        Self { prefix, digits }
    }

    /// The resolution-0 cell of a face or vertex.
    pub fn root(prefix: Prefix) -> Self {
        Self::new(prefix, Digits::new())
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn digits(&self) -> &Digits {
        &self.digits
    }

    /// Number of digits.
    pub fn resolution(&self) -> usize {
        self.digits.len()
    }

    /// True for a vertex-prefixed address whose digits are all zero.
    pub fn is_pentagon(&self) -> bool {
        self.prefix.is_vertex() && self.digits.is_all_zero()
    }

    /// True for centred cells, which have a child on each of their vertices.
    /// Cells reached through a non-zero digit, and face roots, only have a
    /// centred child.
    pub fn has_vertex_children(&self) -> bool {
        match self.digits.last() {
            Some(d) => d == 0,
            None => self.prefix.is_vertex(),
        }
    }

    pub fn gap_direction(&self) -> Option<Direction> {
        self.prefix.gap_direction()
    }

    pub fn is_northern(&self) -> bool {
        self.prefix.is_northern()
    }

    /// True when the digit string names a real cell.
    pub fn is_valid(&self) -> bool {
        if !self.digits.is_well_formed() {
            return false;
        }
        match self.prefix {
            Prefix::Face(_) => self.digits.get(0).map_or(true, |d| d == 0),
            Prefix::Vertex(_) => {
                let gap = self.gap_direction().map(Direction::digit);
                let first = self.digits.as_slice().iter().find(|&&d| d != 0).copied();
                first.is_none() || first != gap
            }
        }
    }

    /// The child digits that name real cells, in digit order.
    pub fn child_digits(&self) -> Vec<u8> {
        if !self.has_vertex_children() {
            return vec![0];
        }
        let gap = if self.is_pentagon() {
            self.gap_direction().map(Direction::digit)
        } else {
            None
        };
        (0..=HEX_SIDES).filter(|&d| Some(d) != gap).collect()
    }

    /// The address one resolution coarser, or `None` at resolution 0.
    pub fn parent(&self) -> Option<Self> {
        if self.digits.is_empty() {
            return None;
        }
        let mut digits = self.digits;
        digits.pop();
        Some(Self::new(self.prefix, digits))
    }

    /// The child in `direction`.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` when the child does not exist (a vertex child of a
    /// cell without vertex children, or a pentagon's gap).
    pub fn child(&self, direction: Direction) -> Result<Self, AddressError> {
        if !self.child_digits().contains(&direction.digit()) {
            return Err(AddressError::InvalidAddress(format!(
                "{} has no child in direction {}",
                self, direction
            )));
        }
        let mut digits = self.digits;
        digits.push(direction.digit())?;
        Ok(Self::new(self.prefix, digits))
    }

    /// All children in digit order.
    pub fn children(&self) -> Result<Vec<Self>, AddressError> {
        self.child_digits()
            .into_iter()
            .map(|d| {
                let mut digits = self.digits;
                digits.push(d)?;
                Ok(Self::new(self.prefix, digits))
            })
            .collect()
    }

    /// The first `resolution` digits of this address.
    pub fn truncated(&self, resolution: usize) -> Self {
        let mut digits = self.digits;
        digits.truncate(resolution);
        Self::new(self.prefix, digits)
    }

    fn same_prefix(&self, other: &CellAddress) -> Result<(), AddressError> {
        if self.prefix == other.prefix {
            Ok(())
        } else {
            Err(AddressError::CrossFaceOperation {
                left: self.to_string(),
                right: other.to_string(),
            })
        }
    }

    /// The neighbour one cell away in `direction`.
    pub fn move_to(&self, direction: Direction) -> Result<Self, AddressError> {
        Ok(Self::new(self.prefix, math::move_to(&self.digits, direction)?))
    }

    /// Sum of two addresses on the same face or vertex.
    pub fn add(
        &self,
        other: &CellAddress,
        resolution: usize,
        grow: bool,
    ) -> Result<Self, AddressError> {
        self.same_prefix(other)?;
        let sum = math::add(&self.digits, &other.digits, resolution, grow)?;
        Ok(Self::new(self.prefix, sum))
    }

    /// Difference of two addresses on the same face or vertex.
    pub fn subtract(&self, other: &CellAddress, resolution: usize) -> Result<Self, AddressError> {
        self.same_prefix(other)?;
        let diff = math::subtract(&self.digits, &other.digits, resolution)?;
        Ok(Self::new(self.prefix, diff))
    }

    /// The cell `factor` steps from the origin of `prefix` in `direction`.
    pub fn multiply(
        prefix: Prefix,
        factor: i64,
        direction: Direction,
        resolution: usize,
    ) -> Result<Self, AddressError> {
        Ok(Self::new(
            prefix,
            math::multiply(factor, direction, resolution)?,
        ))
    }

    /// The two main directions and move counts from the origin.
    pub fn factor(&self) -> Factors {
        math::factor(&self.digits)
    }

    /// Move counts along each of the six directions.
    pub fn factor_all(&self) -> Result<[u32; 6], AddressError> {
        math::factor_all(&self.digits)
    }

    /// Signed move counts along the direction-two and direction-six axes.
    pub fn factor_axes(&self) -> (i64, i64) {
        math::factor_axes(&self.digits)
    }

    /// Rotate about the origin by `steps` sixths of a turn.
    pub fn rotate(&self, steps: u32, sense: RotateDir) -> Self {
        Self::new(self.prefix, math::rotate(&self.digits, steps, sense))
    }

    pub fn to_polar(&self, constants: &GridConstants) -> PolarCoord {
        polar::to_polar(constants, &self.digits)
    }

    /// The cell of `prefix` at `resolution` containing `coord`.
    pub fn from_polar(
        prefix: Prefix,
        constants: &GridConstants,
        coord: PolarCoord,
        resolution: usize,
        grow: bool,
    ) -> Result<Self, AddressError> {
        Ok(Self::new(
            prefix,
            polar::from_polar(constants, coord, resolution, grow)?,
        ))
    }

    /// The deepest common ancestor of two addresses on the same prefix.
    pub fn ancestor_of(&self, other: &CellAddress) -> Result<Self, AddressError> {
        self.same_prefix(other)?;
        Ok(Self::new(
            self.prefix,
            math::ancestor(&self.digits, &other.digits),
        ))
    }

    /// Digits of `child` below this address.
    ///
    /// # Errors
    ///
    /// `NotADescendant` unless `child` is strictly below `self`.
    pub fn descendant_path(&self, child: &CellAddress) -> Result<Digits, AddressError> {
        let not_descendant = || AddressError::NotADescendant {
            parent: self.to_string(),
            child: child.to_string(),
        };
        if self.prefix != child.prefix {
            return Err(not_descendant());
        }
        math::descendant(&self.digits, &child.digits).ok_or_else(not_descendant)
    }

    /// True when `self` is `other` or one of its ancestors.
    pub fn is_ancestor_of(&self, other: &CellAddress) -> bool {
        self.prefix == other.prefix && self.digits.is_prefix_of(&other.digits)
    }

    /// The sector of the face, relative to its origin, holding this cell.
    pub fn hex_sector(&self) -> Direction {
        math::hex_sector(&self.digits)
    }

    pub fn is_in_line(&self) -> bool {
        math::is_in_line(&self.digits)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.digits.is_empty() {
            write!(f, "{}", self.prefix)
        } else {
            write!(f, "{}-{}", self.prefix, self.digits)
        }
    }
}

impl fmt::Debug for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellAddress({})", self)
    }
}

impl FromStr for CellAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError::InvalidAddress(s.to_string());
        let captures = address_pattern()
            .and_then(|p| p.captures(s))
            .ok_or_else(invalid)?;

        let head = captures.get(1).map(|m| m.as_str()).ok_or_else(invalid)?;
        let prefix = match head.parse::<u8>() {
            Ok(number) => Prefix::vertex(number)?,
            Err(_) => Prefix::face(head.chars().next().ok_or_else(invalid)?)?,
        };
        let digits = match captures.get(2) {
            Some(m) => m.as_str().parse()?,
            None => Digits::new(),
        };
        Ok(Self::new(prefix, digits))
    }
}

impl Serialize for CellAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
