//! Code for polygenic risk score computation.

pub mod compare;
pub mod model;
pub mod score;
pub mod validate;
