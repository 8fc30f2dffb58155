#![forbid(unsafe_code)]

pub mod case;
pub mod common;
pub mod completion;
pub mod quarter;
pub mod roster;
pub mod selection;
pub mod verification;

pub use common::{ContractViolation, ReasonCodeId, Validate};
