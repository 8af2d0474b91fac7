//! # CLI Module
//!
//! Command line interface of the `oasgate` binary.
//!
//! ## Commands
//!
//! ### `serve` (default)
//!
//! Run the gateway. Configuration comes from the environment (see
//! [`crate::runtime_config`]); flags override it:
//!
//! ```bash
//! oasgate serve --spec openapi.yaml --upstream http://backend:9000 --addr 0.0.0.0:8000
//! ```
//!
//! ### `validate`
//!
//! Load and structurally validate a specification, listing every issue:
//!
//! ```bash
//! oasgate validate --spec openapi.yaml
//! ```
//!
//! ### `routes`
//!
//! Print the dispatch entries in the order requests are matched against them:
//!
//! ```bash
//! oasgate routes --spec openapi.yaml
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run_cli, serve, Cli, Commands};
