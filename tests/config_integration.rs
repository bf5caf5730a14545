//! Configuration loading from files and environment

mod common;

use clap::Parser;
use common::temp_config_file;
use parley::cli::Cli;
use parley::config::Config;
use serial_test::serial;

fn cli() -> Cli {
    Cli::parse_from(["parley", "serve"])
}

#[test]
#[serial]
fn test_full_config_file_round_trip() {
    std::env::remove_var("PARLEY_BIND");
    std::env::remove_var("PARLEY_PROVIDER");
    std::env::remove_var("PARLEY_STORAGE_PATH");

    let (_dir, path) = temp_config_file(
        r#"
server:
  bind: "0.0.0.0:8080"
  identity_header: "x-forwarded-user"
provider:
  type: ollama
  ollama:
    host: "http://ollama.internal:11434"
    model: "qwen2.5:7b"
search:
  max_results: 3
extraction:
  max_chars: 2000
  csv_max_rows: 20
storage:
  path: "/var/lib/parley/chats.db"
logging:
  json: true
"#,
    );

    let config = Config::load(path.to_str().unwrap(), &cli()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert_eq!(config.server.identity_header, "x-forwarded-user");
    assert_eq!(config.provider.provider_type, "ollama");
    assert_eq!(config.provider.ollama.model, "qwen2.5:7b");
    assert_eq!(config.search.max_results, 3);
    assert_eq!(config.search.api_base, "https://google.serper.dev");
    assert_eq!(config.extraction.max_chars, 2000);
    assert_eq!(config.extraction.csv_max_rows, 20);
    assert!(config.logging.json);
    assert_eq!(
        config.storage.resolve_path().unwrap(),
        std::path::PathBuf::from("/var/lib/parley/chats.db")
    );
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    let (_dir, path) = temp_config_file("provider:\n  type: openai\nserver:\n  bind: \"127.0.0.1:4000\"\n");

    std::env::set_var("PARLEY_PROVIDER", "ollama");
    std::env::set_var("PARLEY_BIND", "127.0.0.1:5000");
    std::env::set_var("SERPER_API_KEY", "serper-from-env");

    let config = Config::load(path.to_str().unwrap(), &cli()).unwrap();

    std::env::remove_var("PARLEY_PROVIDER");
    std::env::remove_var("PARLEY_BIND");
    std::env::remove_var("SERPER_API_KEY");

    assert_eq!(config.provider.provider_type, "ollama");
    assert_eq!(config.server.bind, "127.0.0.1:5000");
    assert_eq!(config.search.api_key.as_deref(), Some("serper-from-env"));
}

#[test]
#[serial]
fn test_malformed_yaml_is_config_error() {
    let (_dir, path) = temp_config_file("server: [not, a, map");
    let err = Config::load(path.to_str().unwrap(), &cli()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}
