//! Magnetic Roads
//!
//! Procedural 3D road networks with lane-following traffic.

pub mod simulation;
