#![forbid(unsafe_code)]

pub mod remote;
pub mod repository;
