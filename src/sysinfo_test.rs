//! Tests for the diagnostic snapshot

use super::*;
use crate::config::Config;

const MEMINFO: &str = "MemTotal:       16384000 kB\nMemFree:         1000000 kB\nMemAvailable:    8192000 kB\n";
const STATUS: &str = "Name:\trandom-generator\nVmRSS:\t   51200 kB\n";

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_memory_stats_without_cgroup_limit() {
    let stats = MemoryStats::from_sources(MEMINFO, STATUS, Some("max\n"));

    assert_eq!(stats.max, 16_000);
    assert_eq!(stats.used, 50);
    assert_eq!(stats.free, 8_000);
}

#[test]
fn test_memory_stats_with_cgroup_limit() {
    let stats = MemoryStats::from_sources(MEMINFO, STATUS, Some("268435456\n"));
    assert_eq!(stats.max, 256);
}

#[test]
fn test_memory_stats_unreadable_sources() {
    assert_eq!(MemoryStats::from_sources("", "", None), MemoryStats::default());
}

#[test]
fn test_snapshot_omits_unset_optional_keys() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_tests(dir.path());

    let info = snapshot(&config, ProcessId::generate(), MemoryStats::default(), 4, &env(&[])).unwrap();

    for key in ["seed", "logFile", "logUrl", "build-type", "POD_IP", "NODE_NAME", "labels", "annotations"] {
        assert!(!info.contains_key(key), "{key} should be omitted");
    }
    assert_eq!(info["pattern"], "None");
    assert_eq!(info["version"], "test");
    assert_eq!(info["cpu.procs"], 4);
}

#[test]
fn test_snapshot_includes_set_optional_keys() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::for_tests(dir.path());
    config.seed = 42;
    config.log_file = Some("/tmp/random.log".into());
    config.log_url = Some("http://collector/".to_string());
    config.build_type = Some("native".to_string());
    let id = ProcessId::generate();

    let info = snapshot(&config, id, MemoryStats { max: 1, used: 2, free: 3 }, 2, &env(&[])).unwrap();

    assert_eq!(info["seed"], 42);
    assert_eq!(info["logFile"], "/tmp/random.log");
    assert_eq!(info["logUrl"], "http://collector/");
    assert_eq!(info["build-type"], "native");
    assert_eq!(info["id"], id.to_string());
    assert_eq!(info["memory.max"], 1);
    assert_eq!(info["memory.used"], 2);
    assert_eq!(info["memory.free"], 3);
}

#[test]
fn test_snapshot_includes_downward_env_and_full_env() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_tests(dir.path());
    let vars = env(&[("POD_IP", "10.0.0.7"), ("NODE_NAME", "node-1"), ("HOME", "/root")]);

    let info = snapshot(&config, ProcessId::generate(), MemoryStats::default(), 1, &vars).unwrap();

    assert_eq!(info["POD_IP"], "10.0.0.7");
    assert_eq!(info["NODE_NAME"], "node-1");
    assert_eq!(info["env"]["HOME"], "/root");
    assert_eq!(info["env"]["POD_IP"], "10.0.0.7");
}

#[test]
fn test_snapshot_reads_pod_info_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_tests(dir.path());
    std::fs::create_dir(&config.pod_info_dir).unwrap();
    std::fs::write(config.pod_info_dir.join("labels"), "app=\"random-generator\"").unwrap();

    let info = snapshot(&config, ProcessId::generate(), MemoryStats::default(), 1, &env(&[])).unwrap();

    assert_eq!(info["labels"], "app=\"random-generator\"");
    assert!(!info.contains_key("annotations"));
}

#[cfg(unix)]
#[test]
fn test_snapshot_propagates_unreadable_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_tests(dir.path());
    std::fs::create_dir(&config.pod_info_dir).unwrap();
    // A directory in place of the file exists but can't be read as one
    std::fs::create_dir(config.pod_info_dir.join("annotations")).unwrap();

    let result = snapshot(&config, ProcessId::generate(), MemoryStats::default(), 1, &env(&[]));

    assert!(matches!(result, Err(SysInfoError::Metadata { .. })));
}
