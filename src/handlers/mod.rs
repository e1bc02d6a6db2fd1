// src/handlers/mod.rs

pub mod admin;
pub mod attempt;
pub mod quiz;
pub mod reward;
