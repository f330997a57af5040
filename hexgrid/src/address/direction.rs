//! Hexagon directions, hexagon classes and rotation sense.
//!
//! Directions are numbered 1 to 6 counter-clockwise, with 0 standing for the
//! centroid (no movement). The geometric meaning of a direction alternates
//! between two hexagon orientations from one resolution to the next:
//!
//! ```text
//!   direction   Class II angle   Class I angle
//!   1              0°              -30°
//!   2             60°               30°
//!   3            120°               90°
//!   4            180°              150°
//!   5            240°              210°
//!   6            300°              270°
//! ```

use std::fmt;

use super::error::AddressError;

/// Number of sides of a hexagon.
pub const HEX_SIDES: u8 = 6;

/// One of the six neighbour directions, or the centroid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Direction {
    Zero = 0,
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
}

impl Direction {
    /// The six non-zero directions in counter-clockwise order.
    pub const VERTICES: [Direction; 6] = [
        Direction::One,
        Direction::Two,
        Direction::Three,
        Direction::Four,
        Direction::Five,
        Direction::Six,
    ];

    /// Build a direction from a digit value.
    pub fn from_digit(digit: u8) -> Result<Self, AddressError> {
        match digit {
            0 => Ok(Direction::Zero),
            1 => Ok(Direction::One),
            2 => Ok(Direction::Two),
            3 => Ok(Direction::Three),
            4 => Ok(Direction::Four),
            5 => Ok(Direction::Five),
            6 => Ok(Direction::Six),
            other => Err(AddressError::InvalidDirection(other)),
        }
    }

    /// The digit value of this direction.
    pub fn digit(self) -> u8 {
        self as u8
    }

    /// True for the centroid direction.
    pub fn is_zero(self) -> bool {
        self == Direction::Zero
    }

    /// The opposite direction (1↔4, 2↔5, 3↔6). Zero maps to itself.
    pub fn negate(self) -> Self {
        Self::from_index(negate_digit(self.digit()))
    }

    /// Rotate by `steps` sixths of a turn. Positive steps rotate
    /// counter-clockwise, negative steps clockwise.
    pub fn rotate(self, steps: i32) -> Self {
        if self.is_zero() {
            return self;
        }
        let sides = HEX_SIDES as i32;
        let steps = steps.rem_euclid(sides);
        let rotated = (self.digit() as i32 - 1 + steps).rem_euclid(sides) + 1;
        Self::from_index(rotated as u8)
    }

    // Callers guarantee 0..=6.
    fn from_index(digit: u8) -> Self {
        match digit {
            1 => Direction::One,
            2 => Direction::Two,
            3 => Direction::Three,
            4 => Direction::Four,
            5 => Direction::Five,
            6 => Direction::Six,
            _ => Direction::Zero,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digit())
    }
}

/// Negate a single digit (1↔4, 2↔5, 3↔6, 0 fixed).
pub(crate) fn negate_digit(digit: u8) -> u8 {
    const NEGATE: [u8; 7] = [0, 4, 5, 6, 1, 2, 3];
    NEGATE.get(digit as usize).copied().unwrap_or(digit)
}

/// The two alternating hexagon orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HexClass {
    /// Class I: resolutions whose digit strings have odd length.
    One,
    /// Class II: resolutions whose digit strings have even length.
    Two,
}

impl HexClass {
    /// Class of the grid whose addresses carry `digit_count` digits.
    pub fn for_digit_count(digit_count: usize) -> Self {
        Self::for_grid_resolution(digit_count as i32 - 1)
    }

    /// Class for a zero-based grid resolution (digit count minus one).
    pub(crate) fn for_grid_resolution(grid_res: i32) -> Self {
        if grid_res % 2 == 0 {
            HexClass::One
        } else {
            HexClass::Two
        }
    }

    /// The other class.
    pub fn alternate(self) -> Self {
        match self {
            HexClass::One => HexClass::Two,
            HexClass::Two => HexClass::One,
        }
    }
}

/// Sense of a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDir {
    /// Counter-clockwise.
    Ccw,
    /// Clockwise.
    Cw,
}

/// The 60° sector (direction 1, 2 or 3 axis) that an angle falls into.
///
/// Angles within 30° of the positive x axis map to direction one; the
/// remaining sectors fold onto directions two and three.
pub fn hex_sector_of_angle(angle: f64) -> Direction {
    use std::f64::consts::PI;

    let abs_angle = angle.abs();
    if abs_angle <= PI / 6.0 {
        Direction::One
    } else if abs_angle <= PI / 2.0 {
        if angle >= 0.0 {
            Direction::Two
        } else {
            Direction::Three
        }
    } else if abs_angle <= 5.0 * PI / 6.0 {
        if angle >= 0.0 {
            Direction::Three
        } else {
            Direction::Two
        }
    } else {
        Direction::One
    }
}
