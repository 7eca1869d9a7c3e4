//! Building a closed, validated component from builder-side entities.

pub mod create_component;
