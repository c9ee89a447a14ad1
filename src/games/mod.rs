//! Board games the engine knows how to follow.

pub mod chess;
