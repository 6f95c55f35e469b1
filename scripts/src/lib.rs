//! Script deploying an upgradeable contract behind a transparent proxy on a
//! confidential EVM chain, upgrading it with a shielded transaction.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
pub mod client;
pub mod commands;
pub mod constants;
pub mod errors;
pub mod persist;
pub mod shielded;
mod solidity;
pub mod types;
pub mod verify;

#[cfg(test)]
mod test_helpers;
