use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use wirehttp::config::Config;

#[test]
fn test_config_directory_flag() {
    let cfg = Config::parse_from(["wirehttp", "--directory", "/tmp/served"]);
    assert_eq!(cfg.directory, PathBuf::from("/tmp/served"));
}

#[test]
fn test_config_custom_listen_address() {
    let cfg = Config::parse_from(["wirehttp", "--listen", "0.0.0.0:3000"]);
    assert_eq!(cfg.listen_addr, "0.0.0.0:3000");
}

#[test]
fn test_config_default_limits() {
    let cfg = Config::parse_from(["wirehttp"]);
    let limits = cfg.limits();

    assert_eq!(limits.max_head_bytes, 8 * 1024);
    assert_eq!(limits.max_body_bytes, 16 * 1024 * 1024);
    assert_eq!(cfg.directory, PathBuf::from("."));
}

#[test]
fn test_config_custom_limits() {
    let cfg = Config::parse_from([
        "wirehttp",
        "--max-head-bytes",
        "1024",
        "--max-body-bytes",
        "10",
    ]);

    assert_eq!(cfg.limits().max_head_bytes, 1024);
    assert_eq!(cfg.limits().max_body_bytes, 10);
}

#[test]
fn test_config_idle_timeout() {
    let cfg = Config::parse_from(["wirehttp", "--idle-timeout", "30"]);
    assert_eq!(cfg.idle_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(cfg.connection_settings().idle_timeout, Some(Duration::from_secs(30)));
}

#[test]
fn test_config_idle_timeout_disabled() {
    assert_eq!(Config::parse_from(["wirehttp"]).idle_timeout(), None);
    assert_eq!(
        Config::parse_from(["wirehttp", "--idle-timeout", "0"]).idle_timeout(),
        None
    );
}

#[test]
fn test_config_rejects_bad_number() {
    assert!(Config::try_parse_from(["wirehttp", "--max-body-bytes", "lots"]).is_err());
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::parse_from(["wirehttp", "--listen", "127.0.0.1:9000"]);
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.listen_addr, cfg2.listen_addr);
}
