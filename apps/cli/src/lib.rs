//! Library surface of the quizdrill CLI, split out so integration tests can
//! exercise the configuration and gateway backends.

pub mod config;
pub mod gateway;
pub mod repl;
