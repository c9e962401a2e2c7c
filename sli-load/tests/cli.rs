use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

#[test]
fn help_lists_all_commands() {
    let mut cmd = Command::cargo_bin("sli-load").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert().success().stdout(
        predicate::str::contains("projects")
            .and(predicate::str::contains("datasets"))
            .and(predicate::str::contains("describe"))
            .and(predicate::str::contains("load"))
            .and(predicate::str::contains("--config")),
    );
}

#[test]
fn missing_config_file_fails() {
    let mut cmd = Command::cargo_bin("sli-load").expect("Binary exists");
    cmd.arg("--config")
        .arg("/nonexistent/sli-load.yaml")
        .arg("projects")
        .env("GDC_USERNAME", "user")
        .env("GDC_PASSWORD", "secret");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn load_without_load_section_fails_before_network() {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(config.path(), b"project: p1\n").expect("Writing temp config failed");

    let mut cmd = Command::cargo_bin("sli-load").expect("Binary exists");
    cmd.arg("--config")
        .arg(config.path())
        .arg("load")
        .env("GDC_USERNAME", "user")
        .env("GDC_PASSWORD", "secret");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no `load` section"));
}

/// Collects formatted events.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use sli_load::cli::{run, Cli, Commands};

    let cli = Cli {
        config: std::path::PathBuf::from("dummy.yaml"),
        command: Commands::Projects,
    };
    assert!(run(cli).await.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
