//! Config store integration tests
//!
//! Exercise the public API end to end against real files in temp
//! directories: precedence, typed round-trips, multivars, enumeration and
//! discovery.

use std::fs;
use std::path::PathBuf;

use cfgstack::{
    ConfigError, ConfigLevel, ConfigStore, ConfigValue, ErrorKind, MemoryBackend, SearchPaths,
    TypedValue,
};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// A global file and a local file both defining `core.editor`.
fn two_level_store(dir: &TempDir) -> ConfigStore {
    let global = write_config(
        dir,
        "global",
        "[core]\n\teditor = nano\n[alias]\n\tco = checkout\n",
    );
    let local = write_config(dir, "local", "[core]\n\teditor = vim\n");

    let mut store = ConfigStore::new();
    store.add_file(&global, ConfigLevel::Global, false).unwrap();
    store.add_file(&local, ConfigLevel::Local, false).unwrap();
    store
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_contains_agrees_with_get() {
    let dir = TempDir::new().unwrap();
    let store = two_level_store(&dir);

    for key in ["core.editor", "alias.co", "core.missing", "other.key"] {
        assert_eq!(
            store.contains(key).unwrap(),
            store.get(key).is_ok(),
            "contains/get disagree for {}",
            key
        );
    }
}

#[test]
fn test_higher_level_shadows_lower() {
    let dir = TempDir::new().unwrap();
    let store = two_level_store(&dir);

    assert_eq!(store.get("core.editor").unwrap(), TypedValue::String("vim".into()));

    // The shadowed value is still visible when enumerating the raw stack.
    let editors = store.get_multivar("core.editor", None).unwrap();
    assert_eq!(editors, vec!["nano", "vim"]);

    let mut seen = Vec::new();
    store
        .foreach(|name, value| {
            if name == "core.editor" {
                seen.push(value.to_string());
            }
            Ok::<_, ConfigError>(0)
        })
        .unwrap();
    assert_eq!(seen, vec!["nano", "vim"]);
}

#[test]
fn test_keys_are_case_normalized_across_backends() {
    let dir = TempDir::new().unwrap();
    let store = two_level_store(&dir);
    assert_eq!(store.get_raw("CORE.Editor").unwrap(), "vim");
}

// =============================================================================
// Typed access
// =============================================================================

#[test]
fn test_round_trip_each_type() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config", "");
    let mut store = ConfigStore::open(&path).unwrap();

    store.set("test.string", "hello").unwrap();
    store.set("test.integer", 1234i64).unwrap();
    store.set("test.boolean", false).unwrap();

    // Re-open to make sure the values went to disk.
    let store = ConfigStore::open(&path).unwrap();
    assert_eq!(store.get("test.string").unwrap(), TypedValue::String("hello".into()));
    assert_eq!(store.get("test.integer").unwrap(), TypedValue::Integer(1234));
    assert_eq!(store.get("test.boolean").unwrap(), TypedValue::Boolean(false));
}

#[test]
fn test_integer_parsed_before_boolean() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config", "[test]\n\tone = 1\n\tyes = yes\n");
    let store = ConfigStore::open(&path).unwrap();

    assert_eq!(store.get("test.one").unwrap(), TypedValue::Integer(1));
    assert_eq!(store.get("test.yes").unwrap(), TypedValue::Boolean(true));
}

#[test]
fn test_delete_then_delete_again() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config", "[core]\n\tbare = false\n");
    let mut store = ConfigStore::open(&path).unwrap();

    store.set("core.bare", ConfigValue::Delete).unwrap();
    assert!(!store.contains("core.bare").unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "[core]\n");

    let err = store.set("core.bare", None::<bool>).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// =============================================================================
// Multivars
// =============================================================================

#[test]
fn test_set_multivar_replace_and_append() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config", "[a]\n\tb = x1\n\tb = x2\n\tb = z\n");
    let mut store = ConfigStore::open(&path).unwrap();

    store.set_multivar("a.b", "^x", "y").unwrap();
    assert_eq!(store.get_multivar("a.b", None).unwrap(), vec!["y", "y", "z"]);

    store.set_multivar("a.b", "^nothing", "w").unwrap();
    assert_eq!(store.get_multivar("a.b", None).unwrap(), vec!["y", "y", "z", "w"]);

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "[a]\n\tb = y\n\tb = y\n\tb = z\n\tb = w\n"
    );
}

#[test]
fn test_set_on_multivar_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config", "[a]\n\tb = 1\n\tb = 2\n");
    let mut store = ConfigStore::open(&path).unwrap();

    let err = store.set("a.b", "3").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(store.get_multivar("a.b", None).unwrap(), vec!["1", "2"]);
}

// =============================================================================
// Enumeration
// =============================================================================

#[test]
fn test_foreach_short_circuit_on_second_of_five() {
    let mut store = ConfigStore::new();
    store
        .add_backend(
            Box::new(MemoryBackend::from_text("[e]\n\ta = 1\n\tb = 2\n\tc = 3\n\td = 4\n\te = 5\n").unwrap()),
            ConfigLevel::Local,
            false,
        )
        .unwrap();

    let mut visited = Vec::new();
    let result = store.foreach(|name, _| {
        visited.push(name.to_string());
        Ok::<_, ConfigError>(if visited.len() == 2 { 3 } else { 0 })
    });

    assert_eq!(result.unwrap(), 3);
    assert_eq!(visited, vec!["e.a", "e.b"]);
}

#[test]
fn test_foreach_with_payload_counts_entries() {
    let dir = TempDir::new().unwrap();
    let store = two_level_store(&dir);

    let mut counter = 0;
    let result = store.foreach_with(&mut counter, |_, _, counter: &mut i32| {
        *counter += 1;
        Ok::<_, ConfigError>(0)
    });
    assert_eq!(result.unwrap(), 0);
    assert_eq!(counter, 3);
}

// =============================================================================
// Lifecycle and discovery
// =============================================================================

#[test]
fn test_add_file_level_conflict() {
    let dir = TempDir::new().unwrap();
    let mut store = two_level_store(&dir);
    let other = write_config(&dir, "other", "[core]\n\teditor = ed\n");

    let err = store.add_file(&other, ConfigLevel::Local, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(store.get_raw("core.editor").unwrap(), "vim");

    store.add_file(&other, ConfigLevel::Local, true).unwrap();
    assert_eq!(store.get_raw("core.editor").unwrap(), "ed");
}

#[test]
fn test_add_file_new_level_takes_effect_immediately() {
    let dir = TempDir::new().unwrap();
    let mut store = two_level_store(&dir);
    let app = write_config(&dir, "app", "[core]\n\teditor = code\n");

    store.add_file(&app, ConfigLevel::App, false).unwrap();
    assert_eq!(store.get_raw("core.editor").unwrap(), "code");
}

#[test]
fn test_missing_global_config_is_not_found() {
    let dir = TempDir::new().unwrap();
    let paths = SearchPaths {
        global: Some(dir.path().join("absent-gitconfig")),
        xdg: None,
        system: None,
    };

    let err = ConfigStore::open_global(&paths).unwrap_err();
    assert!(matches!(err, ConfigError::DiscoveryNotFound(ConfigLevel::Global)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = ConfigStore::open_system(&paths).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_open_global_and_default_stack() {
    let dir = TempDir::new().unwrap();
    let global = write_config(&dir, "gitconfig", "[user]\n\tname = Global\n");
    let system = write_config(&dir, "system", "[user]\n\tname = System\n\temail = sys@example.com\n");
    let paths = SearchPaths {
        global: Some(global),
        xdg: Some(dir.path().join("no-xdg")),
        system: Some(system),
    };

    let store = ConfigStore::open_global(&paths).unwrap();
    assert_eq!(store.get_raw("user.name").unwrap(), "Global");
    assert!(!store.contains("user.email").unwrap());

    let store = ConfigStore::open_default(&paths).unwrap();
    assert_eq!(store.levels(), vec![ConfigLevel::System, ConfigLevel::Global]);
    assert_eq!(store.get_raw("user.name").unwrap(), "Global");
    assert_eq!(store.get_raw("user.email").unwrap(), "sys@example.com");
}

#[test]
fn test_closed_store_rejects_use() {
    let dir = TempDir::new().unwrap();
    let mut store = two_level_store(&dir);
    store.close();
    store.close();

    assert_eq!(store.get("core.editor").unwrap_err().kind(), ErrorKind::Closed);
    assert_eq!(store.contains("core.editor").unwrap_err().kind(), ErrorKind::Closed);
    assert!(store.entries().is_err());
}
