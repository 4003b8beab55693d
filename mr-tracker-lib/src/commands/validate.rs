use super::Host;
use super::config::Config;
use crate::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file (default is `mr-tracker.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,
}

/// Validates a configuration file by loading it and checking every value
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded, parsed, or holds out-of-range values
pub fn validate_config<H: Host>(host: &mut H, args: &ValidateArgs) -> Result<()> {
    let base_dir = Utf8PathBuf::from(".");
    let config_path = args.config.as_ref();

    match Config::load(&base_dir, config_path) {
        Ok(config) => {
            let _ = writeln!(host.output(), "Configuration file is valid");
            if let Some(path) = config_path {
                let _ = writeln!(host.output(), "Config file: {path}");
            } else {
                let _ = writeln!(host.output(), "Using configuration from the current directory or built-in defaults");
            }
            let _ = writeln!(
                host.output(),
                "Tracking {} → {} via {}",
                config.source_branch,
                config.target_branch,
                config.base_url
            );
            Ok(())
        }
        Err(e) => {
            let _ = writeln!(host.error(), "❌ Configuration validation failed: {e}");
            host.exit(1);
            Err(e)
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::commands::TestHost;
    use crate::commands::init::{InitArgs, init_config};

    fn write_config(dir: &tempfile::TempDir, name: &str, text: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from(dir.path().to_string_lossy().to_string()).join(name);
        std::fs::write(&path, text).expect("Failed to write test config");
        path
    }

    fn validate(path: Utf8PathBuf) -> (TestHost, Result<()>) {
        let mut host = TestHost::new();
        let result = validate_config(&mut host, &ValidateArgs { config: Some(path) });
        (host, result)
    }

    #[test]
    fn test_generated_config_is_valid() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = Utf8PathBuf::from(temp_dir.path().to_string_lossy().to_string()).join("generated.toml");

        let mut init_host = TestHost::new();
        init_config(&mut init_host, &InitArgs { output: Some(config_path.clone()), force: false }).expect("init_config should succeed");

        let (host, result) = validate(config_path);
        assert!(result.is_ok(), "Default configuration should validate successfully: {result:?}");
        assert!(host.output_text().contains("develop → testing1.1"));
    }

    #[test]
    fn test_invalid_toml_syntax() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_config(&temp_dir, "invalid_syntax.toml", "source_branch = \"develop\n");

        let (host, result) = validate(path);
        assert!(result.is_err(), "Invalid TOML syntax should fail validation");
        assert_eq!(host.exit_code, Some(1));
        assert!(host.error_text().contains("Configuration validation failed"));
    }

    #[test]
    fn test_unknown_field() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_config(&temp_dir, "unknown_field.toml", "unknown_field = \"value\"\n");

        let (_, result) = validate(path);
        assert!(result.is_err(), "Unknown field should fail validation");
    }

    #[test]
    fn test_invalid_duration_format() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_config(&temp_dir, "invalid_duration.toml", "cache_ttl = \"not a valid duration\"\n");

        let (_, result) = validate(path);
        assert!(result.is_err(), "Invalid duration format should fail validation");
    }

    #[test]
    fn test_out_of_range_value() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_config(&temp_dir, "page_size.toml", "page_size = 500\n");

        let (host, result) = validate(path);
        assert!(result.is_err());
        assert!(host.error_text().contains("page_size"));
    }

    #[test]
    fn test_empty_config_is_valid() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_config(&temp_dir, "empty.toml", "# Empty config file\n");

        let (_, result) = validate(path);
        assert!(result.is_ok(), "Empty config should be valid (uses defaults)");
    }

    #[test]
    fn test_config_with_only_durations() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = write_config(
            &temp_dir,
            "only_durations.toml",
            r#"
cache_ttl = "1m"
request_timeout = "10s"
run_timeout = "2m"
retry_base_delay = "250ms"
"#,
        );

        let (_, result) = validate(path);
        assert!(result.is_ok(), "Config with only durations should be valid");
    }
}
