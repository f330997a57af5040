//! Arithmetic over hexagon digit strings.
//!
//! Digit strings encode positions on a skewed, non-orthogonal lattice whose
//! basis rotates by 30° at every resolution. Addition therefore works on
//! *pairs* of digits: each pair maps to a pair of signed lattice integers,
//! sums are accumulated and re-encoded with a base-3 carry into the next
//! pair.
//!
//! ```text
//!   "50601" + "10203"
//!
//!   pairs (right to left)   01 | 06 | 5      01 | 02 | 1
//!   lattice                 (2,0) (1,-1) ..   (2,0) (1,1) ..
//!   sum with carry          ──────────────────────────────▶ "60102"
//! ```
//!
//! All functions take digit strings by reference and return new values.
//! Resolutions in this module's public API are digit counts; internally the
//! zero-based grid resolution (digit count minus one) selects the hexagon
//! class that decides pair alignment.

use super::digits::Digits;
use super::direction::{negate_digit, Direction, HexClass, RotateDir, HEX_SIDES};
use super::error::AddressError;
use super::MAX_RESOLUTION;

/// Base digit patterns for multiplication, one per direction.
///
/// The high nibble is the digit used for the first step of each base-3
/// place, the low nibble the digit used for the second step.
const MULTIPLICATION_KEYS: [u16; 7] = [0x000, 0x104, 0x205, 0x306, 0x401, 0x502, 0x603];

/// Largest factor whose base-3 expansion fits the multiplier arithmetic
/// (3^0 + 3^1 + ... + 3^19).
pub const MAX_FACTOR: i64 = 1_743_392_200;

/// The result of factoring a digit string into its two main directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Factors {
    /// Direction with the most moves (lowest direction on a tie).
    pub primary: Direction,
    /// Moves along `primary`.
    pub primary_moves: u32,
    /// The other direction.
    pub secondary: Direction,
    /// Moves along `secondary`.
    pub secondary_moves: u32,
}

fn grid_res(len: usize) -> i32 {
    len as i32 - 1
}

fn invalid_pair(pair: u8) -> AddressError {
    AddressError::InvalidAddress(format!(
        "digit pair {}{} has two non-zero digits",
        pair >> 4,
        pair & 0xF
    ))
}

/// Map a digit pair (high nibble = more significant digit) to lattice
/// integers.
fn pair_to_lattice(pair: u8) -> Result<(i32, i32), AddressError> {
    let lattice = match pair {
        0x00 => (0, 0),
        0x01 => (2, 0),
        0x02 => (1, 1),
        0x03 => (-1, 1),
        0x04 => (-2, 0),
        0x05 => (-1, -1),
        0x06 => (1, -1),
        0x10 => (3, 1),
        0x20 => (0, 2),
        0x30 => (-3, 1),
        0x40 => (-3, -1),
        0x50 => (0, -2),
        0x60 => (3, -1),
        other => return Err(invalid_pair(other)),
    };
    Ok(lattice)
}

/// Inverse of [`pair_to_lattice`].
fn lattice_to_pair(a: i32, b: i32) -> Result<u8, AddressError> {
    let pair = match (a, b) {
        (0, 0) => 0x00,
        (2, 0) => 0x01,
        (1, 1) => 0x02,
        (-1, 1) => 0x03,
        (-2, 0) => 0x04,
        (-1, -1) => 0x05,
        (1, -1) => 0x06,
        (3, 1) => 0x10,
        (0, 2) => 0x20,
        (-3, 1) => 0x30,
        (-3, -1) => 0x40,
        (0, -2) => 0x50,
        (3, -1) => 0x60,
        _ => {
            return Err(AddressError::InvalidAddress(format!(
                "lattice point ({}, {}) has no digit pair",
                a, b
            )))
        }
    };
    Ok(pair)
}

/// Divide a lattice point by three in place and return the remainder,
/// normalised so that it is itself encodable as a digit pair.
fn divide_by_three(a: &mut i32, b: &mut i32) -> (i32, i32) {
    let qa = (if *a >= 0 { *a } else { *a - 2 }) / 3;
    let qb = (if *b >= 0 { *b } else { *b - 2 }) / 3;
    let mut r = *a - qa * 3;
    let mut s = *b - qb * 3;
    *a = qa;
    *b = qb;

    if s == r + 1 {
        s -= 3;
        *b += 1;
    } else if s == r - 1 {
        r -= 3;
        *a += 1;
    } else if r == 2 && s == 2 {
        r = -1;
        s = -1;
        *a += 1;
        *b += 1;
    }
    (r, s)
}

/// Remove the two least significant digits and return them as a pair.
/// Missing digits count as zero.
fn strip_right_pair(digits: &mut Vec<u8>) -> u8 {
    let low = digits.pop().unwrap_or(0);
    let high = digits.pop().unwrap_or(0);
    (high << 4) | low
}

/// Pad with zeros on the left, or strip leading zeros, to approach the
/// target grid resolution. Non-zero leading digits are never removed.
fn adjust_left(digits: &mut Vec<u8>, target: i32) {
    let current = grid_res(digits.len());
    if current < target {
        let pad = (target - current) as usize;
        digits.splice(0..0, std::iter::repeat(0).take(pad));
    } else if current > target {
        let excess = (current - target) as usize;
        let zeros = digits.iter().take(excess).take_while(|&&d| d == 0).count();
        digits.drain(..zeros);
    }
}

fn to_digits(digits: &[u8]) -> Result<Digits, AddressError> {
    Digits::from_slice(digits)
}

/// Add two digit strings on a grid of the given class.
///
/// The result keeps the larger operand's resolution unless the sum moves
/// off that grid, in which case it is longer.
fn add_with_class(
    first: &[u8],
    second: &[u8],
    class: HexClass,
) -> Result<Vec<u8>, AddressError> {
    let max_res = grid_res(first.len()).max(grid_res(second.len()));
    let mut first = first.to_vec();
    let mut second = second.to_vec();

    if class == HexClass::Two {
        first.push(0);
        second.push(0);
    }

    let (mut a1, mut b1) = pair_to_lattice(strip_right_pair(&mut first))?;
    let (ta, tb) = pair_to_lattice(strip_right_pair(&mut second))?;
    a1 += ta;
    b1 += tb;

    // Pairs are produced least significant first.
    let mut reversed: Vec<u8> = Vec::with_capacity(MAX_RESOLUTION + 2);
    let mut prefix: Vec<u8> = Vec::new();

    let pair_count = max_res / 2;
    let mut k = 0;
    while k <= pair_count || a1 != 0 || b1 != 0 {
        if a1 == 0 && b1 == 0 {
            // Nothing left to carry: the longer operand's remaining digits
            // pass through unchanged.
            if first.is_empty() {
                second.extend_from_slice(&[0, 0]);
                prefix = std::mem::take(&mut second);
                break;
            }
            if second.is_empty() {
                first.extend_from_slice(&[0, 0]);
                prefix = std::mem::take(&mut first);
                break;
            }
        }

        k += 1;
        if reversed.len() > MAX_RESOLUTION * 2 {
            return Err(AddressError::ResolutionOverflow {
                resolution: reversed.len(),
                max: MAX_RESOLUTION,
            });
        }

        let (r1, s1) = divide_by_three(&mut a1, &mut b1);

        let (a2, b2) = pair_to_lattice(strip_right_pair(&mut first))?;
        let (ta, tb) = pair_to_lattice(strip_right_pair(&mut second))?;
        a1 += a2 + ta;
        b1 += b2 + tb;

        let (mut ca, mut cb) = (a1, b1);
        let (r2, _) = divide_by_three(&mut ca, &mut cb);

        let (low, high) = match (s1, r2) {
            (2, 1) | (2, -2) => {
                a1 -= 1;
                b1 += 1;
                (0, 6)
            }
            (2, 2) | (2, -1) => {
                a1 += 1;
                b1 += 1;
                (0, 4)
            }
            (-2, 1) | (-2, -2) => {
                a1 -= 1;
                b1 -= 1;
                (0, 1)
            }
            (-2, 2) | (-2, -1) => {
                a1 += 1;
                b1 -= 1;
                (0, 3)
            }
            _ => {
                let pair = lattice_to_pair(r1, s1)?;
                (pair & 0xF, pair >> 4)
            }
        };
        reversed.push(low);
        reversed.push(high);
    }

    let mut sum = prefix;
    sum.extend(reversed.iter().rev());

    if class == HexClass::Two {
        sum.pop();
    }

    adjust_left(&mut sum, max_res);
    Ok(sum)
}

/// Add two digit strings.
///
/// # Arguments
///
/// * `a` - The augend
/// * `b` - The addend
/// * `resolution` - Digit count of the grid the addition happens on
/// * `grow` - Whether the sum may carry more digits than `resolution`
///
/// # Errors
///
/// `ResolutionOverflow` when the sum leaves the grid and `grow` is false,
/// or when it would exceed [`MAX_RESOLUTION`] digits.
pub fn add(a: &Digits, b: &Digits, resolution: usize, grow: bool) -> Result<Digits, AddressError> {
    let target = grid_res(resolution);
    let class = HexClass::for_grid_resolution(target);
    let mut sum = add_with_class(a.as_slice(), b.as_slice(), class)?;

    while grid_res(sum.len()) > target {
        if sum.first() == Some(&0) {
            sum.remove(0);
        } else if !grow {
            return Err(AddressError::ResolutionOverflow {
                resolution: sum.len(),
                max: resolution,
            });
        } else {
            break;
        }
    }

    to_digits(&sum)
}

/// Negate every direction digit (1↔4, 2↔5, 3↔6).
pub fn negate(digits: &Digits) -> Digits {
    let mut out = *digits;
    for (i, &d) in digits.as_slice().iter().enumerate() {
        out.set(i, negate_digit(d));
    }
    out
}

/// Subtract `b` from `a` on a grid of `resolution` digits. The difference
/// may not grow.
pub fn subtract(a: &Digits, b: &Digits, resolution: usize) -> Result<Digits, AddressError> {
    add(a, &negate(b), resolution, false)
}

/// Move one cell in `direction` at the resolution of `digits`.
pub fn move_to(digits: &Digits, direction: Direction) -> Result<Digits, AddressError> {
    let step = Digits::from_slice(&[direction.digit()])?;
    add(digits, &step, digits.len(), true)
}

/// The digit string reached by moving `factor` cells in `direction` from
/// the origin, built directly from the base-3 expansion of `factor`.
///
/// Negative factors move in the opposite direction. The result is padded
/// on the left to `resolution` digits when shorter.
///
/// # Errors
///
/// `ResolutionOverflow` when more than [`MAX_RESOLUTION`] digits are needed
/// or `factor` exceeds [`MAX_FACTOR`].
pub fn multiply(factor: i64, direction: Direction, resolution: usize) -> Result<Digits, AddressError> {
    let (mut factor, direction) = if factor < 0 {
        (-factor, direction.negate())
    } else {
        (factor, direction)
    };
    if factor > MAX_FACTOR {
        return Err(AddressError::ResolutionOverflow {
            resolution: MAX_RESOLUTION + 1,
            max: MAX_RESOLUTION,
        });
    }

    let key = MULTIPLICATION_KEYS[direction.digit() as usize];
    let pattern = [((key >> 8) & 0xF) as u8, (key & 0xF) as u8, 0];

    let mut reversed: Vec<u8> = Vec::with_capacity(MAX_RESOLUTION);
    let mut multiplier: i64 = 1;
    while factor > 0 {
        if reversed.len() >= MAX_RESOLUTION {
            return Err(AddressError::ResolutionOverflow {
                resolution: reversed.len() + 1,
                max: MAX_RESOLUTION,
            });
        }
        if reversed.len() % 2 == 1 {
            reversed.push(0);
        } else {
            let slot = (((factor - 1) / multiplier) % 3) as usize;
            reversed.push(pattern[slot]);
            factor -= multiplier;
            multiplier *= 3;
        }
    }

    let mut product: Vec<u8> = reversed.into_iter().rev().collect();
    let target = grid_res(resolution);
    if target > grid_res(product.len()) {
        adjust_left(&mut product, target);
    }
    to_digits(&product)
}

/// Decompose a digit string into step counts along each of the six
/// directions, by repeatedly removing the largest multiple reachable from
/// its most significant digit.
pub fn factor_all(digits: &Digits) -> Result<[u32; 6], AddressError> {
    let mut counts = [0u32; 6];
    let mut working = *digits;
    let len = digits.len();

    while let Some((digit, position)) = working.most_significant() {
        let mut multiple: i64 = 1;
        let mut power: i64 = 1;
        for _ in 0..position / 2 {
            multiple += power;
            power *= 3;
        }

        let direction = Direction::from_digit(digit)?;
        let guess = multiply(multiple, direction, len)?;
        working = subtract(&working, &guess, len)?;
        counts[digit as usize - 1] += multiple as u32;
    }

    Ok(counts)
}

/// Reduce three axis counts so that at least one is zero, keeping the
/// represented position. The smallest magnitude is folded away.
fn reduce_axes(d1: &mut i64, d2: &mut i64, d3: &mut i64) {
    if d1.abs() <= d2.abs() && d1.abs() <= d3.abs() {
        *d2 += *d1;
        *d3 -= *d1;
        *d1 = 0;
    } else if d2.abs() <= d1.abs() && d2.abs() <= d3.abs() {
        *d1 += *d2;
        *d3 += *d2;
        *d2 = 0;
    } else {
        *d1 -= *d3;
        *d2 += *d3;
        *d3 = 0;
    }
}

/// Factor a digit string into its two main directions and the number of
/// moves along each at the string's own resolution.
///
/// Move counts are never negative; the primary direction carries the most
/// moves and ties go to the lower-numbered direction.
pub fn factor(digits: &Digits) -> Factors {
    // [0..6] same-class counts, [6..12] alternate-class counts.
    let mut counts = [0i64; 12];
    let mut alternate = false;
    let mut distance: i64 = 1;

    for &d in digits.as_slice().iter().rev() {
        if alternate {
            if d != 0 {
                counts[d as usize - 1 + 6] += distance;
            }
            distance *= 3;
        } else if d != 0 {
            counts[d as usize - 1] += distance;
        }
        alternate = !alternate;
    }

    let mut d1 = counts[0] - counts[3];
    let mut d2 = counts[1] - counts[4];
    let mut d3 = counts[2] - counts[5];
    let a1 = counts[6] - counts[9];
    let a2 = counts[7] - counts[10];
    let a3 = counts[8] - counts[11];

    match HexClass::for_digit_count(digits.len()) {
        HexClass::One => {
            d1 += a1 - a3;
            d2 += a1 + a2;
            d3 += a2 + a3;
        }
        HexClass::Two => {
            d3 += a3 - a1;
            d1 += a1 + a2;
            d2 += a2 + a3;
        }
    }

    reduce_axes(&mut d1, &mut d2, &mut d3);

    let (mut dir1, mut dir2) = (1u8, 2u8);
    if d3 != 0 {
        if d2 != 0 {
            d1 = d3;
            dir1 = 3;
        } else {
            d2 = d3;
            dir2 = 3;
        }
    }
    if d1 < 0 {
        d1 = -d1;
        dir1 += 3;
    }
    if d2 < 0 {
        d2 = -d2;
        dir2 += 3;
    }
    if d1 < d2 || (d1 == d2 && dir2 < dir1) {
        std::mem::swap(&mut d1, &mut d2);
        std::mem::swap(&mut dir1, &mut dir2);
    }

    Factors {
        primary: Direction::from_digit(dir1).unwrap_or(Direction::Zero),
        primary_moves: d1 as u32,
        secondary: Direction::from_digit(dir2).unwrap_or(Direction::Zero),
        secondary_moves: d2 as u32,
    }
}

/// Factor into signed move counts along the direction-two and
/// direction-six axes.
pub fn factor_axes(digits: &Digits) -> (i64, i64) {
    let factors = factor(digits);
    let mut move2 = 0i64;
    let mut move6 = 0i64;
    for (direction, moves) in [
        (factors.primary, factors.primary_moves as i64),
        (factors.secondary, factors.secondary_moves as i64),
    ] {
        match direction {
            Direction::One => {
                move2 += moves;
                move6 += moves;
            }
            Direction::Two => move2 += moves,
            Direction::Three => move6 -= moves,
            Direction::Four => {
                move2 -= moves;
                move6 -= moves;
            }
            Direction::Five => move2 -= moves,
            Direction::Six => move6 += moves,
            Direction::Zero => {}
        }
    }
    (move2, move6)
}

/// Rotate a digit string about the origin by `steps` sixths of a turn.
/// Zero digits are fixed points.
pub fn rotate(digits: &Digits, steps: u32, sense: RotateDir) -> Digits {
    let sides = HEX_SIDES as u32;
    let mut steps = steps % sides;
    if steps == 0 {
        return *digits;
    }
    if sense == RotateDir::Cw {
        steps = sides - steps;
    }

    let mut out = *digits;
    for (i, &d) in digits.as_slice().iter().enumerate() {
        if d != 0 {
            out.set(i, ((d as u32 - 1 + steps) % sides) as u8 + 1);
        }
    }
    out
}

/// Longest common prefix of two digit strings.
pub fn ancestor(a: &Digits, b: &Digits) -> Digits {
    let common = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .take_while(|(x, y)| x == y)
        .count();
    let mut out = *a;
    out.truncate(common);
    out
}

/// Digits of `child` beyond `parent`, or `None` when `parent` is not a
/// strict prefix of `child`.
pub fn descendant(parent: &Digits, child: &Digits) -> Option<Digits> {
    if parent.len() >= child.len() || !parent.is_prefix_of(child) {
        return None;
    }
    Digits::from_slice(&child.as_slice()[parent.len()..]).ok()
}

/// Sector (most significant direction) of a digit string relative to the
/// origin. `Zero` at the origin.
pub fn hex_sector(digits: &Digits) -> Direction {
    digits
        .most_significant()
        .and_then(|(d, _)| Direction::from_digit(d).ok())
        .unwrap_or(Direction::Zero)
}

/// True when every non-zero digit repeats the most significant one, so the
/// cell lies on a straight run of same-direction steps from the origin.
/// The origin itself is not in line.
pub fn is_in_line(digits: &Digits) -> bool {
    match digits.most_significant() {
        Some((leading, _)) => digits.as_slice().iter().all(|&d| d == 0 || d == leading),
        None => false,
    }
}
