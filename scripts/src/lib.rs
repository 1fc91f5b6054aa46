//! Scripts for compiling, deploying and verifying the realm contracts.

pub mod abi;
pub mod artifacts;
pub mod cli;
mod commands;
pub mod compile;
pub mod config;
pub mod constants;
pub mod deploy;
pub mod deployments;
pub mod errors;
pub mod plans;
pub mod verify;

pub use commands::deploy_and_verify;
