// src/models/mod.rs

pub mod question;
pub mod quiz;
pub mod student_result;
pub mod user;
