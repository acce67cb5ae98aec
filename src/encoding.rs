//! Exposition format implementations.
//!
//! Only the Prometheus text format is supported, see [`text`].

pub mod text;
