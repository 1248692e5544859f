pub mod provider;

pub use provider::{StripeConfig, StripeProvider};
