//! Orbitclock - two-body satellite propagation on a controllable clock
//!
//! Loads Keplerian element sets (CelesTrak OMM JSON or TLE text), propagates
//! them to Cartesian positions at a simulated instant, samples static orbit
//! paths and decides per-body visibility from an active/inactive status feed.

pub mod data;
pub mod ephemeris;
pub mod propagation;
pub mod render;
pub mod sim;
