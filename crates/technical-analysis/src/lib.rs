pub mod context;
pub mod indicators;
pub mod signal;


pub use context::*;
pub use indicators::*;
pub use signal::*;
