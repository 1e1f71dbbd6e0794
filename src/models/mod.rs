//! Model management module
//! Handles Hugging Face downloads and the local model directory

pub mod manager;
