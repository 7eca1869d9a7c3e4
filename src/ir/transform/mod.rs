//! Rewrites over built components.

pub mod backsub;
pub mod substitute;
