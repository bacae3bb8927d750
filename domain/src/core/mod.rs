//! Core utilities shared across the domain layer

pub mod string;
