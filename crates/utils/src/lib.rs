pub mod assets;
pub mod log_tail;
