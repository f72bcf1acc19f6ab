// src/services/mod.rs

pub mod facts;
pub mod generator;
pub mod grading;
pub mod quiz_generation;
