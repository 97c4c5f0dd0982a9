// Configuration layering tests
//
// file < environment < command line

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use fencekv_server::model::config::{Cli, Configuration};
use fencekv_storage::StorageType;

fn config_file(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("fencekv-")
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const YAML: &str = r#"
server:
  address: 127.0.0.1
  port: 7000
storage:
  type: memory
redis:
  addr: redis.internal:6379
lock:
  ttl_ms: 1500
  verify_ownership: true
"#;

#[test]
fn test_values_from_yaml_file() {
    let file = config_file(YAML, ".yml");
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    let configuration = Configuration::from_sources(cli, Some(HashMap::new())).unwrap();

    assert_eq!(configuration.server_address(), "127.0.0.1");
    assert_eq!(configuration.server_port(), 7000);
    assert_eq!(configuration.storage_type().unwrap(), StorageType::Memory);
    assert_eq!(configuration.redis_url(), "redis://redis.internal:6379/0");
    assert_eq!(configuration.lock_ttl(), Duration::from_millis(1500));
    assert!(configuration.lock_verify_ownership());
    // Unset keys keep their defaults
    assert_eq!(configuration.lock_acquire_timeout(), Duration::from_secs(30));
}

#[test]
fn test_toml_file_is_supported() {
    let file = config_file(
        "[server]\nport = 7100\n\n[storage]\ntype = \"memory\"\n",
        ".toml",
    );
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    let configuration = Configuration::from_sources(cli, Some(HashMap::new())).unwrap();

    assert_eq!(configuration.server_port(), 7100);
    assert_eq!(configuration.storage_type().unwrap(), StorageType::Memory);
}

#[test]
fn test_environment_overrides_file() {
    let file = config_file(YAML, ".yml");
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let env = HashMap::from([
        ("FENCEKV_SERVER__PORT".to_string(), "7001".to_string()),
        ("FENCEKV_LOCK__TTL_MS".to_string(), "900".to_string()),
    ]);

    let configuration = Configuration::from_sources(cli, Some(env)).unwrap();

    assert_eq!(configuration.server_port(), 7001);
    assert_eq!(configuration.lock_ttl(), Duration::from_millis(900));
    assert_eq!(configuration.server_address(), "127.0.0.1");
}

#[test]
fn test_command_line_overrides_environment_and_file() {
    let file = config_file(YAML, ".yml");
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        port: Some(7002),
        storage: Some(StorageType::Redis),
    };
    let env = HashMap::from([("FENCEKV_SERVER__PORT".to_string(), "7001".to_string())]);

    let configuration = Configuration::from_sources(cli, Some(env)).unwrap();

    assert_eq!(configuration.server_port(), 7002);
    assert_eq!(configuration.storage_type().unwrap(), StorageType::Redis);
}
