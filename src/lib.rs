pub mod config;
pub mod logging;
pub mod piece;
pub mod sync;
