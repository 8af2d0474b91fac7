//! Unit tests for CLI parsing

use crate::cli::{Cli, Commands};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_no_subcommand_defaults_to_serve() {
    let cli = Cli::try_parse_from(["oasgate"]).unwrap();
    assert!(cli.command.is_none());
}

#[test]
fn test_serve_overrides() {
    let cli = Cli::try_parse_from([
        "oasgate",
        "serve",
        "--spec",
        "api.yaml",
        "--upstream",
        "http://backend:9000",
        "--addr",
        "127.0.0.1:8080",
    ])
    .unwrap();

    assert_eq!(
        cli.command,
        Some(Commands::Serve {
            spec: Some(PathBuf::from("api.yaml")),
            upstream: Some("http://backend:9000".to_string()),
            addr: Some("127.0.0.1:8080".to_string()),
        })
    );
}

#[test]
fn test_validate_and_routes_take_optional_spec() {
    let cli = Cli::try_parse_from(["oasgate", "validate", "-s", "x.json"]).unwrap();
    assert_eq!(
        cli.command,
        Some(Commands::Validate {
            spec: Some(PathBuf::from("x.json"))
        })
    );

    let cli = Cli::try_parse_from(["oasgate", "routes"]).unwrap();
    assert_eq!(cli.command, Some(Commands::Routes { spec: None }));
}

#[test]
fn test_unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["oasgate", "generate"]).is_err());
}
