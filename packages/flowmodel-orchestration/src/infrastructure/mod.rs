//! Infrastructure layer - engine and decoder adapters

pub mod codeql_cli;

pub use codeql_cli::CodeQlCli;
