//! Shared primitives for the roomtrace acoustic simulator.
//!
//! This crate holds the math building blocks (vectors, rays, bounding
//! boxes, the quaternion point rotation, piecewise-linear curves) and the
//! handful of acoustic unit helpers everything else is written against.
//! It performs no I/O.

pub mod math;
pub mod units;
