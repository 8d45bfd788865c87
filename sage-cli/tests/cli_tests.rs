use std::path::PathBuf;

use clap::Parser;
use sage_cli::chat::{WRAP_WIDTH, wrap};
use sage_cli::doctor::port_warning;
use sage_cli::ingest::collect_files;
use sage_cli::{Cli, Command, LogFormat, env_file_problem, resolve_api_key};

#[test]
fn bare_invocation_chats() {
    let cli = Cli::try_parse_from(["sage"]).unwrap();
    assert_eq!(cli.command(), Command::Chat);
    assert_eq!(cli.global.top_k, 3);
}

#[test]
fn ingest_defaults_to_the_knowledge_file() {
    let cli = Cli::try_parse_from(["sage", "ingest"]).unwrap();
    assert_eq!(
        cli.command(),
        Command::Ingest { paths: vec![PathBuf::from("./data/oracle_knowledge.txt")], recreate: false }
    );
}

#[test]
fn global_flags_work_after_the_subcommand() {
    let cli = Cli::try_parse_from([
        "sage",
        "ingest",
        "manuals",
        "notes.txt",
        "--recreate",
        "--collection",
        "ap_kb",
        "--log-format",
        "json",
    ])
    .unwrap();
    assert_eq!(
        cli.command(),
        Command::Ingest {
            paths: vec![PathBuf::from("manuals"), PathBuf::from("notes.txt")],
            recreate: true
        }
    );
    assert_eq!(cli.global.collection, "ap_kb");
    assert_eq!(cli.global.log_format, LogFormat::Json);
}

#[test]
fn serve_parses_the_address() {
    let cli = Cli::try_parse_from(["sage", "serve", "--addr", "0.0.0.0:9000"]).unwrap();
    assert_eq!(cli.command(), Command::Serve { addr: "0.0.0.0:9000".parse().unwrap() });
    assert!(Cli::try_parse_from(["sage", "serve", "--addr", "not-an-address"]).is_err());
}

#[test]
fn api_key_prefers_the_flag_and_trims() {
    assert_eq!(resolve_api_key(Some("  primary \n"), Some("fallback")).unwrap(), "primary");
    assert_eq!(resolve_api_key(Some("   "), Some("fallback")).unwrap(), "fallback");
    assert_eq!(resolve_api_key(None, Some("fallback")).unwrap(), "fallback");

    let err = resolve_api_key(None, Some("  ")).unwrap_err();
    assert_eq!(err.kind(), "configuration");
    assert!(err.to_string().contains("GOOGLE_API_KEY"));
}

#[test]
fn answers_wrap_at_eighty_columns() {
    let answer = "Sage: To close the AP period, resolve unaccounted transactions, sweep or \
                  account open invoices and payments, then run the Unaccounted Transactions report.";
    let wrapped = wrap(answer, WRAP_WIDTH);
    assert!(wrapped.starts_with("Sage: To close"));
    assert!(wrapped.lines().count() >= 2);
    assert!(wrapped.lines().all(|line| line.chars().count() <= WRAP_WIDTH));
}

#[test]
fn rest_port_is_flagged() {
    assert!(port_warning("http://localhost:6333").is_some());
    assert!(port_warning(" https://cluster.cloud.qdrant.io:6333/ ").is_some());
    assert!(port_warning("http://localhost:6334").is_none());
}

#[test]
fn directories_expand_sorted_without_hidden_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("gl")).unwrap();
    std::fs::create_dir_all(root.join(".cache")).unwrap();
    std::fs::write(root.join("ap.txt"), "AP").unwrap();
    std::fs::write(root.join("gl/close.txt"), "GL").unwrap();
    std::fs::write(root.join(".hidden.txt"), "x").unwrap();
    std::fs::write(root.join(".cache/skip.txt"), "x").unwrap();

    let files = collect_files(&[root.to_path_buf(), root.join("ap.txt")]).unwrap();
    assert_eq!(files, vec![root.join("ap.txt"), root.join("gl/close.txt")]);
}

#[test]
fn missing_directory_entries_pass_through() {
    let files = collect_files(&[PathBuf::from("does/not/exist.pdf")]).unwrap();
    assert_eq!(files, vec![PathBuf::from("does/not/exist.pdf")]);
}

#[test]
fn missing_env_file_is_quiet_but_a_malformed_one_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    assert!(env_file_problem(dotenvy::from_path(dir.path().join(".env"))).is_none());

    let malformed = dir.path().join("malformed.env");
    std::fs::write(&malformed, "GOOGLE_API_KEY sk-missing-equals\n").unwrap();
    let problem = env_file_problem(dotenvy::from_path(&malformed));
    assert!(matches!(problem, Some(dotenvy::Error::LineParse(..))), "{problem:?}");
}
