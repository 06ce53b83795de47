use std::fs;
use std::path::PathBuf;

use dockyard_exec::ConnectionInfo;
use dockyard_host::{AuthOptions, EngineOptions, HostRecord};
use dockyard_persist::{Filestore, HostStore, StoreError};
use tempfile::TempDir;

fn full_record(name: &str) -> HostRecord {
    let mut record = HostRecord::new(name, "virtualbox").with_connection(
        ConnectionInfo::new("192.168.99.101", "docker")
            .with_port(2222)
            .with_ssh_key("/home/op/.dockyard/machines/dev/id_rsa"),
    );
    record.driver = serde_json::json!({
        "cpu": 2,
        "boot2docker_url": "",
        "host_only_cidr": "192.168.99.1/24",
        "no_share": false,
    });
    record.host_options.driver = "virtualbox".to_string();
    record.host_options.memory = 1024;
    record.host_options.disk = 20000;
    record.host_options.engine_options = EngineOptions {
        storage_driver: "overlay".to_string(),
        arbitrary_flags: vec!["experimental".to_string()],
        dns: vec!["8.8.8.8".to_string()],
        env: vec!["HTTP_PROXY=http://proxy:3128".to_string()],
        insecure_registry: vec!["registry.local:5000".to_string()],
        labels: vec!["tier=dev".to_string()],
        registry_mirror: vec!["https://mirror.local".to_string()],
        log_level: "debug".to_string(),
        tls_verify: false,
        ..EngineOptions::default()
    }
    .with_install_url("https://test.docker.com");
    record.host_options.auth_options = AuthOptions {
        cert_dir: PathBuf::from("/home/op/.dockyard/certs"),
        ca_cert_path: PathBuf::from("/home/op/.dockyard/certs/ca.pem"),
        ca_private_key_path: PathBuf::from("/home/op/.dockyard/certs/ca-key.pem"),
        client_cert_path: PathBuf::from("/home/op/.dockyard/certs/cert.pem"),
        client_key_path: PathBuf::from("/home/op/.dockyard/certs/key.pem"),
        server_cert_path: PathBuf::from("/home/op/.dockyard/machines/dev/server.pem"),
        server_key_path: PathBuf::from("/home/op/.dockyard/machines/dev/server-key.pem"),
        store_path: PathBuf::from("/home/op/.dockyard/machines/dev"),
    };
    record
}

#[test]
fn test_save_then_load_preserves_every_field() {
    let dir = TempDir::new().unwrap();
    let store = Filestore::new(dir.path());

    let record = full_record("dev");
    store.save(&record).unwrap();

    assert_eq!(store.load("dev").unwrap(), record);
}

#[test]
fn test_load_returns_last_completed_save() {
    let dir = TempDir::new().unwrap();
    let store = Filestore::new(dir.path());

    let mut record = full_record("dev");
    for memory in [512, 1024, 8192] {
        record.host_options.memory = memory;
        store.save(&record).unwrap();
        assert_eq!(store.load("dev").unwrap(), record);
    }
}

#[test]
fn test_interrupted_temp_write_is_never_observed() {
    let dir = TempDir::new().unwrap();
    let store = Filestore::new(dir.path());

    let record = full_record("dev");
    store.save(&record).unwrap();

    // what a crash halfway through writing the next version leaves behind
    let host_dir = store.machines_dir().join("dev");
    fs::write(host_dir.join("config.json.tmp123456"), "{\"name\": \"dev\", \"dri").unwrap();

    assert_eq!(store.load("dev").unwrap(), record);
    assert_eq!(store.list().unwrap(), vec!["dev".to_string()]);

    let mut next = record.clone();
    next.host_options.memory = 4096;
    store.save(&next).unwrap();
    assert_eq!(store.load("dev").unwrap(), next);
}

#[test]
fn test_exists_follows_save_and_remove() {
    let dir = TempDir::new().unwrap();
    let store = Filestore::new(dir.path());

    assert!(!store.exists("m1").unwrap());
    store.save(&HostRecord::new("m1", "none")).unwrap();
    assert!(store.exists("m1").unwrap());
    store.remove("m1").unwrap();
    assert!(!store.exists("m1").unwrap());
}

#[test]
fn test_remove_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = Filestore::new(dir.path());

    store.remove("never-created").unwrap();
    store.save(&HostRecord::new("m1", "none")).unwrap();
    fs::write(store.machines_dir().join("m1").join("id_rsa"), "key").unwrap();
    store.remove("m1").unwrap();
    store.remove("m1").unwrap();
    assert!(!store.machines_dir().join("m1").exists());
}

#[test]
fn test_list_without_root_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = Filestore::new(dir.path().join("does-not-exist-yet"));

    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_list_skips_hidden_entries_and_files() {
    let dir = TempDir::new().unwrap();
    let store = Filestore::new(dir.path());

    store.save(&HostRecord::new("beta", "none")).unwrap();
    store.save(&HostRecord::new("alpha", "none")).unwrap();
    fs::create_dir_all(store.machines_dir().join(".trash")).unwrap();
    fs::write(store.machines_dir().join("stray-file"), "").unwrap();
    fs::write(store.machines_dir().join(".DS_Store"), "").unwrap();

    assert_eq!(
        store.list().unwrap(),
        vec!["alpha".to_string(), "beta".to_string()]
    );
}

#[test]
fn test_load_absent_host_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = Filestore::new(dir.path());

    let err = store.load("absent").unwrap_err();
    assert!(matches!(err, StoreError::NotFound { ref name } if name == "absent"));
    assert!(err.is_not_found());
}

#[test]
fn test_machine_lifecycle() {
    let dir = TempDir::new().unwrap();
    let store = Filestore::new(dir.path());

    let record = HostRecord::new("m1", "none");
    store.save(&record).unwrap();
    assert_eq!(store.list().unwrap(), vec!["m1".to_string()]);
    assert_eq!(store.load("m1").unwrap(), record);

    store.remove("m1").unwrap();
    assert!(store.list().unwrap().is_empty());
}
