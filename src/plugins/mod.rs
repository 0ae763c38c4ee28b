pub mod registry;
pub mod wallet;

pub use registry::ActionRegistry;
pub use wallet::{WalletContextProvider, WalletPlugin};
