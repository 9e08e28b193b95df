// secpipe - Operator tooling for the security event pipeline
//
// The deployed function lives in `secpipe-lambda`. This crate carries what an
// operator runs from a workstation: the end-to-end validation harness, a
// synthetic event producer and an offline `process` command that drives the
// same batch pipeline against local storage.

pub mod harness;
pub mod init;
pub mod process;
pub mod produce;

pub use init::{init_tracing, load_config};
