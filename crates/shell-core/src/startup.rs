//! Shell startup: install extensions while the home window opens.

use std::sync::Arc;

use shell_extensions::{
    ConflictPolicy, DirectoryInstallTarget, InstallEngine, InstallReport, InstallTarget,
    InstrumentLedger, InstrumentRegistry, PackageStore,
};
use shell_window::{
    CoordinatorSender, CoordinatorService, WindowCoordinator, WindowHost, WindowOptions,
    WindowSnapshot,
};

use crate::Result;
use crate::config::ShellConfig;

/// What [`Shell::startup`] produced.
#[derive(Debug)]
pub struct Startup {
    pub home: WindowSnapshot,
    /// Extension installation is reported, never fatal for startup.
    pub extensions: shell_extensions::Result<InstallReport>,
}

/// The assembled shell: window coordinator plus installation engine.
pub struct Shell {
    config: ShellConfig,
    coordinator: Arc<WindowCoordinator>,
    engine: InstallEngine,
}

impl Shell {
    pub fn new(
        config: ShellConfig,
        host: Arc<dyn WindowHost>,
        target: Arc<dyn InstallTarget>,
        instruments: Arc<dyn InstrumentRegistry>,
    ) -> Self {
        let coordinator = Arc::new(WindowCoordinator::new(host, config.coordinator_config()));
        let engine = InstallEngine::new(target, instruments)
            .with_max_concurrency(config.extensions.max_concurrency);
        Self {
            config,
            coordinator,
            engine,
        }
    }

    /// Shell with on-disk install target and instrument ledger at the
    /// configured locations.
    pub fn from_config(config: ShellConfig, host: Arc<dyn WindowHost>) -> Self {
        let target = Arc::new(DirectoryInstallTarget::new(&config.extensions.install_dir));
        let ledger = Arc::new(InstrumentLedger::new(&config.extensions.instruments_file));
        Self::new(config, host, target, ledger)
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn coordinator(&self) -> Arc<WindowCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn engine(&self) -> &InstallEngine {
        &self.engine
    }

    /// Command loop for host events and content messages.
    pub fn service(&self) -> (CoordinatorService, CoordinatorSender) {
        CoordinatorService::new(self.coordinator())
    }

    /// Options of the home window.
    pub fn home_options(&self) -> WindowOptions {
        WindowOptions {
            width: Some(self.config.window.width),
            height: Some(self.config.window.height),
            hide_on_close: true,
            show_menu: self.config.development,
        }
    }

    /// Install extensions from `store` and open the home window
    /// concurrently.
    ///
    /// Fails only when the home window cannot be created.
    pub async fn startup(
        &self,
        store: &dyn PackageStore,
        policy: &dyn ConflictPolicy,
    ) -> Result<Startup> {
        tracing::info!(
            home = %self.config.window.home_locator,
            packages = %self.config.extensions.packages_dir.display(),
            "starting shell"
        );

        let install = self.engine.install_from_store(store, policy);
        let open_home = async {
            self.coordinator
                .open(&self.config.window.home_locator, self.home_options())
        };
        let (extensions, home) = tokio::join!(install, open_home);

        if let Err(error) = &extensions {
            tracing::warn!(%error, "extension installation did not run");
        }
        Ok(Startup {
            home: home?,
            extensions,
        })
    }
}
