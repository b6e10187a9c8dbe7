//! Command implementations for apres-cli

pub mod data;
pub mod radar;
pub mod system;

pub use data::{download, ls};
pub use radar::{burst, config, set_config, trial, SetConfigArgs};
pub use system::{download_hk_config, reset, show_hk_config, status, upload_hk_config};
