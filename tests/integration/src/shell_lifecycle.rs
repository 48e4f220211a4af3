//! End-to-end shell lifecycle
//!
//! Configuration on disk -> startup (home window + extension install) ->
//! window traffic through the coordinator service -> negotiated shutdown.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use shell_core::{Shell, ShellConfig};
use shell_extensions::{
    DirectoryPackageStore, InstallReport, InstallStatus, InstrumentLedger, InstrumentProvision,
    InstrumentRegistry,
};
use shell_test_utils::{HostEvent, PackageDir, RecordingHost};
use shell_window::{ContentMessage, OutboundMessage, WindowOptions};
use tempfile::TempDir;

/// Write a `studio-shell.toml` pointing at `packages`, with extra
/// `[extensions]` keys.
fn write_config(workspace: &Path, packages: &Path, extra: &str) -> PathBuf {
    let path = workspace.join("studio-shell.toml");
    fs::write(
        &path,
        format!(
            "[window]\nhome_locator = \"index.html\"\n\n[extensions]\npackages_dir = '{}'\n{extra}",
            packages.display()
        ),
    )
    .unwrap();
    path
}

async fn start(config_path: &Path) -> (Shell, Arc<RecordingHost>, InstallReport) {
    let config = ShellConfig::load(config_path).unwrap();
    let host = RecordingHost::new();
    let shell = Shell::from_config(config, host.clone());
    let store = DirectoryPackageStore::new(&shell.config().extensions.packages_dir);
    let startup = shell
        .startup(&store, &shell.config().conflict_policy())
        .await
        .unwrap();
    assert_eq!(startup.home.locator, "index.html");
    (shell, host, startup.extensions.unwrap())
}

#[tokio::test]
async fn test_full_session_closes_every_window_and_quits_once() {
    let packages = PackageDir::new();
    packages.add("drv.x", "1.0", "instrument");
    let workspace = TempDir::new().unwrap();
    let config_path = write_config(workspace.path(), packages.root(), "");

    let (shell, host, report) = start(&config_path).await;
    assert_eq!(report.get("drv.x").unwrap().status, InstallStatus::Installed);

    let (service, tx) = shell.service();
    let task = tokio::spawn(service.run());

    let home = shell.coordinator().find("index.html").unwrap();
    let settings = tx
        .open_window("settings.html", WindowOptions::default())
        .await
        .unwrap();
    assert!(settings.focused);
    tx.content(settings.id, ContentMessage::PreventAppSuspension { on: true })
        .await
        .unwrap();

    // Close the home window; settings keeps the process alive.
    tx.host_close(home.id).await.unwrap();
    tx.content(home.id, ContentMessage::ReadyToClose).await.unwrap();
    let remaining = tx.snapshot().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, settings.id);
    assert_eq!(host.quit_count(), 0);
    assert_eq!(host.sent_to(1), vec![OutboundMessage::BeforeClose]);

    tx.host_close(settings.id).await.unwrap();
    tx.content(settings.id, ContentMessage::ReadyToClose)
        .await
        .unwrap();
    task.await.unwrap();

    let events = host.events();
    let stopped = events
        .iter()
        .position(|e| matches!(e, HostEvent::PowerSaveStopped(_)))
        .unwrap();
    let quit = events.iter().position(|e| matches!(e, HostEvent::Quit)).unwrap();
    assert!(stopped < quit);
    assert_eq!(host.quit_count(), 1);
    assert_eq!(host.live_handles(), 0);
    assert!(shell.coordinator().is_terminated());

    // The service is gone; later commands are refused.
    assert!(tx.snapshot().await.is_err());
}

#[tokio::test]
async fn test_upgrade_across_restarts_reuses_instrument() {
    let workspace = TempDir::new().unwrap();

    let v1 = PackageDir::new();
    v1.add("drv.x", "1.0", "instrument");
    let (_shell, _host, first) = start(&write_config(workspace.path(), v1.root(), "")).await;
    let created = match &first.get("drv.x").unwrap().instrument {
        Some(InstrumentProvision::Created(id)) => id.clone(),
        other => panic!("expected a created instrument, got {other:?}"),
    };

    let v2 = PackageDir::new();
    v2.add("drv.x", "1.2", "instrument");
    let (_shell, _host, second) = start(&write_config(workspace.path(), v2.root(), "")).await;
    let outcome = second.get("drv.x").unwrap();
    assert_eq!(
        outcome.status,
        InstallStatus::Replaced {
            previous: "1.0".to_string()
        }
    );
    assert_eq!(outcome.instrument, Some(InstrumentProvision::Existing(created)));

    let ledger = InstrumentLedger::new(workspace.path().join("instruments.toml"));
    assert_eq!(ledger.list().await.unwrap().len(), 1);

    // With downgrades disabled the old package is left alone.
    let config = write_config(workspace.path(), v1.root(), "replace_older = false\n");
    let (_shell, _host, third) = start(&config).await;
    assert_eq!(
        third.get("drv.x").unwrap().status,
        InstallStatus::SkippedOlder {
            installed: "1.2".to_string()
        }
    );
}

#[tokio::test]
async fn test_broken_packages_do_not_block_startup() {
    let packages = PackageDir::new();
    packages.add("good.ext", "3", "theme");
    packages.add_raw("no-version", "extension.toml", "[extension]\nid = \"x\"\ntype = \"theme\"\n");
    packages.add_raw("empty", "readme.txt", "nothing here");
    let workspace = TempDir::new().unwrap();

    let (shell, _host, report) = start(&write_config(workspace.path(), packages.root(), "")).await;

    assert_eq!(report.installed().count(), 1);
    assert_eq!(report.failed().count(), 2);
    assert_eq!(shell.coordinator().len(), 1);
    assert!(workspace.path().join("extensions/good.ext").is_dir());
}
