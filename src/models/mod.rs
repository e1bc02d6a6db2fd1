// src/models/mod.rs

pub mod attempt;
pub mod badge;
pub mod quiz;
pub mod reward;
pub mod user;
