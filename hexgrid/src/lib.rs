//! hexgrid - hexagonal discrete global grid
//!
//! Cells of a hexagon hierarchy laid over an icosahedron, addressed by a
//! face letter or vertex number followed by one digit per resolution.
//!
//! # Modules
//!
//! - [`address`]: cell addresses and their arithmetic (neighbours,
//!   parents, children, planar and polar coordinates)
//! - [`geometry`]: tiles of cells below a root and their enumeration order
//! - [`value`]: typed per-cell field storage and its binary format
//! - [`cache`]: the layered tile cache
//! - [`logging`]: subscriber setup for applications

pub mod address;
pub mod cache;
pub mod geometry;
pub mod logging;
pub mod value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
