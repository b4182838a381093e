//! Configuration layering: defaults, TOML file, environment, command line.
use clap::Parser;
use figment::Jail;
use squatwatch::cli::Cli;
use squatwatch::config::{Config, PatternSource};
use squatwatch::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["squatwatch"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn test_load_full_config_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "squatwatch.toml",
            r#"
            log_level = "debug"

            [network]
            certstream_url = "ws://127.0.0.1:4000/"
            reconnect_delay_seconds = 2

            [matching]
            mutate = ["paypal", "stripe"]
            min_padding = 40
            mutations_dir = "generated"
            persist_mutations = false

            [output]
            path = "found.txt"
            queue_capacity = 128
            echo_stdout = false
            discord_webhooks = ["https://discord.example/hook"]
            slack_webhooks = ["https://hooks.slack.example/a", "https://hooks.slack.example/b"]
            webhook_timeout_seconds = 3
            "#,
        )?;

        let config = Config::load(&cli(&["--config", "squatwatch.toml"])).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.network.certstream_url, "ws://127.0.0.1:4000/");
        assert_eq!(config.network.reconnect_delay(), Duration::from_secs(2));
        assert_eq!(config.matching.min_padding, 40);
        assert_eq!(config.matching.mutations_dir, PathBuf::from("generated"));
        assert!(!config.matching.persist_mutations);
        assert_eq!(config.output.path, PathBuf::from("found.txt"));
        assert_eq!(config.output.queue_capacity, 128);
        assert!(!config.output.echo_stdout);
        assert_eq!(config.output.discord_webhooks.len(), 1);
        assert_eq!(config.output.slack_webhooks.len(), 2);
        assert_eq!(config.output.webhook_timeout(), Duration::from_secs(3));
        assert_eq!(
            config.validate().unwrap(),
            PatternSource::Mutate(vec!["paypal".to_string(), "stripe".to_string()])
        );
        Ok(())
    });
}

#[test]
fn test_partial_file_keeps_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file("squatwatch.toml", "[output]\npath = \"x.txt\"\n")?;

        let config = Config::load(&cli(&["-c", "squatwatch.toml", "-f", "patterns.txt"])).unwrap();
        assert_eq!(config.output.path, PathBuf::from("x.txt"));
        assert_eq!(config.output.queue_capacity, 10_000);
        assert_eq!(config.network.certstream_url, "wss://certstream.calidog.io/");
        assert_eq!(config.network.reconnect_delay_seconds, 5);
        Ok(())
    });
}

#[test]
fn test_env_overrides_file_and_cli_overrides_env() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "squatwatch.toml",
            r#"
            log_level = "warn"
            [output]
            path = "from-file.txt"
            queue_capacity = 10
            "#,
        )?;
        jail.set_env("SQUATWATCH_LOG_LEVEL", "trace");
        jail.set_env("SQUATWATCH_OUTPUT__PATH", "from-env.txt");
        jail.set_env("SQUATWATCH_OUTPUT__QUEUE_CAPACITY", "20");

        let config = Config::load(&cli(&["-c", "squatwatch.toml", "-m", "brand"])).unwrap();
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.output.path, PathBuf::from("from-env.txt"));
        assert_eq!(config.output.queue_capacity, 20);

        let config = Config::load(&cli(&[
            "-c",
            "squatwatch.toml",
            "-m",
            "brand",
            "-o",
            "from-cli.txt",
            "--log-level",
            "debug",
        ]))
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.output.path, PathBuf::from("from-cli.txt"));
        assert_eq!(config.matching.mutate, vec!["brand".to_string()]);
        Ok(())
    });
}

#[test]
fn test_cli_webhooks_replace_configured_ones() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "squatwatch.toml",
            "[output]\nslack_webhooks = [\"https://hooks.slack.example/file\"]\n",
        )?;

        let config = Config::load(&cli(&[
            "-c",
            "squatwatch.toml",
            "-f",
            "patterns.txt",
            "--slack-webhook",
            "https://hooks.slack.example/cli",
        ]))
        .unwrap();
        assert_eq!(
            config.output.slack_webhooks,
            vec!["https://hooks.slack.example/cli".to_string()]
        );
        Ok(())
    });
}

#[test]
fn test_file_and_mutate_from_different_layers_conflict() {
    Jail::expect_with(|jail| {
        jail.create_file("squatwatch.toml", "[matching]\npattern_file = \"patterns.txt\"\n")?;

        let config = Config::load(&cli(&["-c", "squatwatch.toml", "-m", "brand"])).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConflictingPatternSources)
        ));
        Ok(())
    });
}

#[test]
fn test_missing_config_file() {
    Jail::expect_with(|_jail| {
        let result = Config::load(&cli(&["-c", "does-not-exist.toml"]));
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
        Ok(())
    });
}

#[test]
fn test_malformed_value_is_a_load_error() {
    Jail::expect_with(|jail| {
        jail.create_file("squatwatch.toml", "[output]\nqueue_capacity = \"lots\"\n")?;

        let result = Config::load(&cli(&["-c", "squatwatch.toml"]));
        assert!(matches!(result, Err(ConfigError::Load(_))));
        Ok(())
    });
}
