pub mod client;
pub mod credits;

pub use client::ConwayClient;
pub use credits::CreditBalance;
