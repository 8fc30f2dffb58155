#![forbid(unsafe_code)]

pub mod access;
pub mod lifecycle;
pub mod quarter;
pub mod selection;
