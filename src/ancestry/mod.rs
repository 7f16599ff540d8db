//! Code for genetic ancestry inference from ancestry-informative markers.

pub mod adjust;
pub mod aims;
pub mod infer;
pub mod validate;
