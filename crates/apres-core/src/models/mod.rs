//! Documents exchanged with the device

mod burst;
mod data;
mod radar;
mod system;

pub use burst::*;
pub use data::*;
pub use radar::*;
pub use system::*;
