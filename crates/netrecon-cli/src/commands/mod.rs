//! Subcommands of the `netrecon` binary

pub mod migrate;
pub mod sync;
