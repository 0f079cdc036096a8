// src/models.rs

pub mod milestone;
pub mod project;
pub mod repository;
