//! Low-level helpers shared by the backends

pub mod buffer;
pub mod fast_time;
