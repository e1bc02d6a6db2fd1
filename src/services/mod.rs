// src/services/mod.rs

pub mod attempts;
pub mod badges;
pub mod rewards;
pub mod scoring;
