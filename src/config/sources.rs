//! Configuration sources, in increasing precedence.

pub mod env;
pub mod file;
pub mod global_file;
