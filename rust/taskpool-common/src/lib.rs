//! Core definitions (error taxonomy and result helpers), relied upon by all taskpool-* crates.

pub mod error;
pub mod result;

pub use result::Result;
