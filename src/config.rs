pub mod store;
pub mod structure;

pub use store::GatewayConfig;
