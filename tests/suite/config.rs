//! Config files driving a real dispatcher.

use std::thread;

use offload_config::{ConfigError, OffloadConfig};
use offload_engine::{Dispatcher, Outcome, WorkError, WorkUnit};
use tempfile::tempdir;

use crate::common::{settle, write_config};

fn current_thread_name(_: ()) -> Result<String, WorkError> {
    Ok(thread::current().name().unwrap_or_default().to_string())
}

#[tokio::test]
async fn configured_prefix_names_worker_threads() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[dispatcher]
thread_name_prefix = "crunch"
stack_size_bytes = 1048576
"#,
    );

    let config = OffloadConfig::load_from(&path).unwrap().unwrap();
    let dispatcher = Dispatcher::from_config(&config.dispatcher());
    assert_eq!(dispatcher.spawner().stack_size(), Some(1_048_576));

    let handle = dispatcher
        .run(WorkUnit::new(current_thread_name, ()))
        .unwrap();
    let id = handle.id();
    assert_eq!(
        settle(handle).await,
        Outcome::Success(format!("crunch-{id}"))
    );
}

#[tokio::test]
async fn missing_file_falls_back_to_default_dispatcher() {
    let dir = tempdir().unwrap();
    let loaded = OffloadConfig::load_from(&dir.path().join("absent.toml")).unwrap();
    assert!(loaded.is_none());

    let config = loaded.unwrap_or_default();
    let dispatcher = Dispatcher::from_config(&config.dispatcher());
    let handle = dispatcher
        .run(WorkUnit::new(current_thread_name, ()))
        .unwrap();
    let id = handle.id();
    assert_eq!(
        settle(handle).await,
        Outcome::Success(format!("offload-worker-{id}"))
    );
}

#[test]
fn invalid_dispatcher_section_is_rejected_with_its_path() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r"
[dispatcher]
stack_size_bytes = 1
",
    );

    let err = OffloadConfig::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "{err}");
    assert_eq!(err.path(), path.as_path());
}
