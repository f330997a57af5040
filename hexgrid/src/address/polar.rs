//! Conversion between digit strings and polar coordinates.
//!
//! Radius is in face units (see [`GridConstants`]); angle is in radians,
//! counter-clockwise from the direction-one axis of a Class II grid.

use std::f64::consts::{FRAC_PI_3, FRAC_PI_6};

use serde::{Deserialize, Serialize};

use super::constants::GridConstants;
use super::digits::Digits;
use super::direction::{Direction, HexClass};
use super::error::AddressError;
use super::math::{add, multiply};

/// A point relative to the origin of a face or vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolarCoord {
    pub radius: f64,
    pub angle: f64,
}

impl PolarCoord {
    pub fn new(radius: f64, angle: f64) -> Self {
        Self { radius, angle }
    }

    /// Cartesian form `(x, y)`.
    pub fn to_xy(self) -> (f64, f64) {
        (self.radius * self.angle.cos(), self.radius * self.angle.sin())
    }
}

/// The polar position of a cell centre.
pub fn to_polar(constants: &GridConstants, digits: &Digits) -> PolarCoord {
    // [0..6] Class II contributions, [6..12] Class I.
    let mut sums = [0.0f64; 12];
    let mut class = HexClass::One;

    for (position, &d) in digits.as_slice().iter().enumerate() {
        if d != 0 {
            let distance = constants.distance(position + 2);
            match class {
                HexClass::Two => sums[d as usize - 1] += distance,
                HexClass::One => sums[d as usize + 5] += distance,
            }
        }
        class = class.alternate();
    }

    let d1 = sums[0] - sums[3];
    let d2 = sums[1] - sums[4];
    let d3 = sums[2] - sums[5];
    let mut x = d1 + (d2 - d3) * 0.5;
    let mut y = (d2 + d3) * FRAC_PI_3.sin();

    let d1 = sums[6] - sums[9];
    let d2 = sums[7] - sums[10];
    let d3 = sums[8] - sums[11];
    x += (d1 + d2) * FRAC_PI_6.cos();
    y += d3 + (d2 - d1) * 0.5;

    PolarCoord {
        radius: x.hypot(y),
        angle: y.atan2(x),
    }
}

/// Snap a point, in units of the target grid spacing, to lattice
/// coordinates `(u, v)` along directions one and two.
fn polar_to_lattice(radius: f64, angle: f64) -> (i64, i64) {
    let x = radius * angle.cos();
    let y = radius * angle.sin();

    let row_y = 2.0 * 3.0_f64.sqrt() / 3.0 * y;
    let mut row = row_y.round();
    let row_delta = row_y - row;
    let row_delta_abs = row_delta.abs();

    let odd_row = (row as i64) % 2 != 0;
    let column_x = if odd_row { x - 0.5 } else { x };
    let mut column = column_x.round();
    let column_delta = column_x - column;

    // Near the sloped cell edges the nearest row is not the nearest cell.
    if row_delta_abs > 1.0 / 3.0 {
        let column_delta_abs = column_delta.abs();
        if column_delta_abs > 0.25
            && (0.5 - row_delta_abs) / (column_delta_abs - 0.25) < 2.0 / 3.0
        {
            if odd_row {
                if column_delta > 0.0 {
                    column += 1.0;
                }
            } else if column_delta < 0.0 {
                column -= 1.0;
            }
            row = if row_delta < 0.0 { row - 1.0 } else { row + 1.0 };
        }
    }

    let row_int = row as i64;
    let v = row_int;
    let u = column as i64 - (if row_int < 0 { row_int - 1 } else { row_int }) / 2;
    (u, v)
}

/// The cell at `resolution` digits containing a polar point.
///
/// # Errors
///
/// `ResolutionOverflow` when the point lies beyond the grid and `grow` is
/// false, or when the lattice coordinates need too many digits.
pub fn from_polar(
    constants: &GridConstants,
    polar: PolarCoord,
    resolution: usize,
    grow: bool,
) -> Result<Digits, AddressError> {
    let grid_res = resolution as i32 - 1;
    let mut angle = polar.angle;
    if HexClass::for_grid_resolution(grid_res) == HexClass::One {
        angle += FRAC_PI_6;
    }
    let radius = polar.radius / constants.distance((grid_res + 2).max(0) as usize);

    let (u, v) = polar_to_lattice(radius, angle);
    let along_one = multiply(u, Direction::One, resolution)?;
    let along_two = multiply(v, Direction::Two, resolution)?;
    add(&along_one, &along_two, resolution, grow)
}
