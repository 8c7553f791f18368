//! Adapters: concrete implementations of the ports.

pub mod ai;
pub mod extract;
pub mod storage;
pub mod trace;
