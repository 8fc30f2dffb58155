#![forbid(unsafe_code)]

pub mod ports;
pub mod selection_wiring;
pub mod session;
pub mod verification_wiring;
