use anyhow::Result;
use gsheets_kit::{ExecutorConfig, KitConfig, PARALLEL_CONCURRENCY_ENV, ResolverConfig};
use serial_test::serial;
use std::io::Write;
use std::time::Duration;

fn set_concurrency_env(value: Option<&str>) {
    // SAFETY: tests touching process env are serialized via #[serial].
    unsafe {
        match value {
            Some(value) => std::env::set_var(PARALLEL_CONCURRENCY_ENV, value),
            None => std::env::remove_var(PARALLEL_CONCURRENCY_ENV),
        }
    }
}

#[test]
fn resolver_defaults() {
    let config = ResolverConfig::default();
    assert_eq!(config.cache_capacity, 500);
    assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    assert!(config.fuzzy_matching);
    assert_eq!(config.fuzzy_threshold, 0.7);
}

#[test]
#[serial]
fn executor_defaults() {
    set_concurrency_env(None);
    let config = ExecutorConfig::from_env();
    assert_eq!(config.concurrency, 20);
    assert!(config.retry_on_error);
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.retry_delay(), Duration::from_millis(1000));
}

#[test]
#[serial]
fn env_overrides_concurrency() {
    set_concurrency_env(Some("7"));
    assert_eq!(ExecutorConfig::from_env().concurrency, 7);
    set_concurrency_env(None);
}

#[test]
#[serial]
fn env_concurrency_is_clamped() {
    set_concurrency_env(Some("0"));
    assert_eq!(ExecutorConfig::from_env().concurrency, 1);

    set_concurrency_env(Some("1000"));
    assert_eq!(ExecutorConfig::from_env().concurrency, 100);

    set_concurrency_env(None);
}

#[test]
#[serial]
fn unparseable_env_falls_back_to_default() {
    set_concurrency_env(Some("lots"));
    assert_eq!(ExecutorConfig::from_env().concurrency, 20);
    set_concurrency_env(None);
}

#[test]
#[serial]
fn yaml_config_merges_over_defaults() -> Result<()> {
    set_concurrency_env(None);

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    writeln!(file, "cache_capacity: 50")?;
    writeln!(file, "fuzzy_threshold: 0.85")?;
    writeln!(file, "max_retries: 5")?;

    let config = KitConfig::load(file.path())?;
    assert_eq!(config.resolver.cache_capacity, 50);
    assert_eq!(config.resolver.fuzzy_threshold, 0.85);
    assert_eq!(config.resolver.cache_ttl_secs, 300);
    assert_eq!(config.executor.max_retries, 5);
    assert_eq!(config.executor.concurrency, 20);
    Ok(())
}

#[test]
#[serial]
fn json_config_and_env_precedence() -> Result<()> {
    set_concurrency_env(Some("9"));

    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    write!(file, "{{\"concurrency\": 33, \"retry_delay_ms\": 250}}")?;

    // The environment wins over the file, matching the CLI/env layering of
    // the server that embeds this crate.
    let config = KitConfig::load(file.path())?;
    assert_eq!(config.executor.concurrency, 9);
    assert_eq!(config.executor.retry_delay(), Duration::from_millis(250));

    set_concurrency_env(None);
    Ok(())
}

#[test]
fn unknown_extension_is_rejected() {
    let file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tempfile");
    assert!(KitConfig::load(file.path()).is_err());
}

#[test]
#[serial]
fn file_values_are_clamped() -> Result<()> {
    set_concurrency_env(None);

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    writeln!(file, "cache_capacity: 0")?;
    writeln!(file, "concurrency: 500")?;
    writeln!(file, "fuzzy_threshold: 1.5")?;

    let config = KitConfig::load(file.path())?;
    assert_eq!(config.resolver.cache_capacity, 1);
    assert_eq!(config.executor.concurrency, 100);
    assert_eq!(config.resolver.fuzzy_threshold, 1.0);
    Ok(())
}
