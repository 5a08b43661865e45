// src/handlers/mod.rs

pub mod comments;
pub mod preferences;
