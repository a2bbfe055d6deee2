//! Result rendering
//!
//! - `text`: the line-oriented outcome protocol shared by the direct backend and
//!   the helper process
//! - `json`: machine-readable run report for the CLI

pub mod json;
pub mod text;
