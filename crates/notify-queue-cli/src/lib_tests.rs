//! Tests for the notify-queue-cli library module.

use super::*;
use notify_queue::{ConfigurationError, MessageRecord, Timestamp};
use serial_test::serial;
use tempfile::TempDir;

fn scratch_backend(dir: &TempDir, id: &str) -> SysVQueueBackend {
    let config = SysVQueueConfig::new(id)
        .with_key_path(dir.path())
        .with_permissions(0o600);
    open_backend(&config, Some("cli-test")).unwrap()
}

// ============================================================================
// Argument Parsing
// ============================================================================

mod parsing {
    use super::*;

    #[test]
    fn test_send_parsing() {
        let cli = Cli::try_parse_from(["notify-queue", "send", "hello", "--category", "alerts"])
            .unwrap();
        match cli.command {
            Commands::Send { body, category } => {
                assert_eq!(body, "hello");
                assert_eq!(category.as_deref(), Some("alerts"));
            }
            other => panic!("Expected Send command, got {:?}", other),
        }
    }

    #[test]
    fn test_receive_limit_defaults_to_one() {
        let cli = Cli::try_parse_from(["notify-queue", "receive"]).unwrap();
        assert!(matches!(cli.command, Commands::Receive { limit: 1 }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "notify-queue",
            "drain",
            "--queue-id",
            "z",
            "--key-path",
            "/tmp",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(cli.queue_id.as_deref(), Some("z"));
        assert_eq!(cli.key_path, Some(PathBuf::from("/tmp")));
        assert!(cli.json_logs);
    }

    #[test]
    fn test_stats_format_rejects_unknown_values() {
        assert!(Cli::try_parse_from(["notify-queue", "stats", "--format", "json"]).is_ok());
        assert!(Cli::try_parse_from(["notify-queue", "stats", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_drain_limit_parses() {
        let cli = Cli::try_parse_from(["notify-queue", "receive", "--limit", "-1"]).unwrap();
        assert!(matches!(cli.command, Commands::Receive { limit: -1 }));
    }

    #[test]
    fn test_limit_maps_to_receive_mode() {
        assert_eq!(receive_limit(-1).unwrap(), ReceiveLimit::Drain);
        assert_eq!(receive_limit(4).unwrap(), ReceiveLimit::UpTo(4));
        assert_eq!(receive_limit(0).unwrap(), ReceiveLimit::UpTo(0));

        let err = receive_limit(-3).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
        assert_eq!(err.exit_code(), 3);
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.queue.id, "n");
        assert_eq!(config.queue.permissions, 0o666);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    #[serial]
    fn test_load_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notify.toml");
        std::fs::write(
            &path,
            "[queue]\nid = \"q\"\nname = \"alerts\"\npermissions = 0o640\n\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = load_configuration(Some(&path)).unwrap();

        assert_eq!(config.queue.id, "q");
        assert_eq!(config.queue.name, "alerts");
        assert_eq!(config.queue.permissions, 0o640);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    #[serial]
    fn test_missing_config_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = load_configuration(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_environment_overrides_defaults() {
        std::env::set_var("NOTIFY_QUEUE__QUEUE__NAME", "from-env");
        let config = load_configuration(None);
        std::env::remove_var("NOTIFY_QUEUE__QUEUE__NAME");

        assert_eq!(config.unwrap().queue.name, "from-env");
    }

    #[test]
    fn test_flags_override_loaded_settings() {
        let cli = Cli::try_parse_from([
            "notify-queue",
            "--queue-id",
            "x",
            "--log-level",
            "debug",
            "key",
        ])
        .unwrap();

        let config = CliConfig::default().with_overrides(&cli);

        assert_eq!(config.queue.id, "x");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.queue.name, "notifications");
    }
}

// ============================================================================
// Errors and Exit Codes
// ============================================================================

mod exit_codes {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        let config = CliError::Configuration(ConfigError::Logging {
            message: "bad".to_string(),
        });
        let invalid_id = CliError::Queue(QueueError::Configuration(
            ConfigurationError::InvalidQueueId {
                id: "ab".to_string(),
                length: 2,
            },
        ));
        let queue = CliError::Queue(QueueError::CapacityExceeded {
            queue: "n".to_string(),
        });
        let argument = CliError::InvalidArgument {
            arg: "--yes".to_string(),
            message: "missing".to_string(),
        };
        let io = CliError::Io(io::Error::other("closed"));

        assert_eq!(config.exit_code(), 1);
        assert_eq!(invalid_id.exit_code(), 1);
        assert_eq!(queue.exit_code(), 2);
        assert_eq!(argument.exit_code(), 3);
        assert_eq!(io.exit_code(), 4);
    }
}

// ============================================================================
// Commands
// ============================================================================

mod commands {
    use super::*;

    #[test]
    fn test_records_are_printed_one_per_line() {
        let records = vec![
            MessageRecord::new("one", Timestamp::now()),
            MessageRecord::new("two", Timestamp::now()).with_category(Some("ops".to_string())),
        ];
        let mut out = Vec::new();

        write_records(&mut out, &records).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: MessageRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.body, "two");
        assert_eq!(second.category.as_deref(), Some("ops"));
    }

    #[test]
    fn test_send_then_receive_through_commands() {
        let dir = TempDir::new().unwrap();
        let backend = scratch_backend(&dir, "s");
        let mut sent = Vec::new();
        let mut received = Vec::new();

        execute_send_command(&backend, "ping", None, &mut sent).unwrap();
        execute_receive_command(&backend, ReceiveLimit::UpTo(5), &mut received).unwrap();
        backend.remove().unwrap();

        assert_eq!(String::from_utf8(sent).unwrap(), "sent\n");
        let record: MessageRecord =
            serde_json::from_str(String::from_utf8(received).unwrap().trim()).unwrap();
        assert_eq!(record.body, "ping");
        assert_eq!(record.sender_id.as_deref(), Some("cli-test"));
    }

    #[test]
    fn test_stats_json_report() {
        let dir = TempDir::new().unwrap();
        let backend = scratch_backend(&dir, "t");
        backend.send("counted", None).unwrap();
        let mut out = Vec::new();

        execute_stats_command(&backend, OutputFormat::Json, &mut out).unwrap();
        backend.remove().unwrap();

        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["messages"], 1);
        assert_eq!(report["queue"], "notifications");
    }

    #[test]
    fn test_remove_requires_confirmation() {
        let dir = TempDir::new().unwrap();
        let backend = scratch_backend(&dir, "u");

        let err = execute_remove_command(backend, false).unwrap_err();

        assert!(matches!(err, CliError::InvalidArgument { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_completions_generation() {
        let mut out = Vec::new();
        execute_completions_command(clap_complete::Shell::Bash, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("notify-queue"));
    }

    #[tokio::test]
    async fn test_wait_returns_after_timeout_on_empty_queue() {
        let dir = TempDir::new().unwrap();
        let backend = scratch_backend(&dir, "w");
        backend.resource_id().unwrap();
        let cleanup = scratch_backend(&dir, "w");
        let mut out = Vec::new();

        execute_wait_command(backend, Some(Duration::from_millis(100)), &mut out)
            .await
            .unwrap();

        // The abandoned receiver wakes with an error once the queue is gone.
        cleanup.remove().unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_wait_prints_waiting_message() {
        let dir = TempDir::new().unwrap();
        let backend = scratch_backend(&dir, "v");
        backend.send("already here", None).unwrap();
        let cleanup = scratch_backend(&dir, "v");
        let mut out = Vec::new();

        execute_wait_command(backend, Some(Duration::from_secs(10)), &mut out)
            .await
            .unwrap();
        cleanup.remove().unwrap();

        let record: MessageRecord = serde_json::from_slice(&out).unwrap();
        assert_eq!(record.body, "already here");
    }
}
