//! Postsmith - Iterative Social Post Drafting
//!
//! This crate turns arbitrary source material into a polished short-form
//! social post through a bounded generate-critique-refine loop, steered by
//! a conversational front-end.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
