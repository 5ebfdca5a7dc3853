//! Configuration object shared by the engine, modules and the runtime

mod types;

pub use types::*;
