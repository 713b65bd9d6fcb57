pub mod gas;
pub mod nonce_manager;

pub use gas::*;
pub use nonce_manager::*;
