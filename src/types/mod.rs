//! Typed ESI payloads.

pub mod character;
pub mod entity;

pub use character::*;
pub use entity::*;
