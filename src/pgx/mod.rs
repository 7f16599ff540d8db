//! Code for pharmacogenomic star allele calling.

pub mod call;
pub mod caller;
pub mod cnv;
pub mod cpic;
pub mod definitions;
