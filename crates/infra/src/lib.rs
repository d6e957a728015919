//! Infrastructure layer: persistence, outbound notifications and the
//! ledger engines that tie them to the domain crates.

pub mod notify;
pub mod services;
pub mod store;
