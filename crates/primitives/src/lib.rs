//! Small fixed-size byte primitives shared across the consensus-side crates.

pub mod buf;
