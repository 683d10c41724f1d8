use crate::plan::{script_command, LaunchPlanner};
use crate::CoreError;
use std::path::Path;
use tacpho_runtime::{
    scan_devices, select_backend, ContainerRuntime, GroupLookup, ProcessHandle, SystemGroups,
};
use tacpho_schema::{ImageRef, LaunchConfig, LauncherConfig, ResolvedDeviceMap};
use tracing::{debug, error, info};

/// What a dispatched command left behind.
#[derive(Debug)]
pub enum Outcome {
    /// Nothing to stream (e.g. an image pull).
    Completed,
    /// A container was started; its output can be streamed.
    Started(ProcessHandle),
}

impl Outcome {
    pub fn into_handle(self) -> Option<ProcessHandle> {
        match self {
            Self::Completed => None,
            Self::Started(handle) => Some(handle),
        }
    }
}

/// Entry point for `pull` and `run`.
///
/// Holds the read-only launcher configuration and the collaborators every
/// command needs. Device presence is rescanned on each plan.
pub struct Launcher {
    config: LauncherConfig,
    runtime: Box<dyn ContainerRuntime>,
    groups: Box<dyn GroupLookup>,
}

impl Launcher {
    /// Use the configured runtime backend and the host group database.
    pub fn new(config: LauncherConfig) -> Result<Self, CoreError> {
        let runtime = select_backend(&config.runtime.backend)?;
        Ok(Self::with_parts(config, runtime, Box::new(SystemGroups)))
    }

    pub fn with_parts(
        config: LauncherConfig,
        runtime: Box<dyn ContainerRuntime>,
        groups: Box<dyn GroupLookup>,
    ) -> Self {
        Self {
            config,
            runtime,
            groups,
        }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    /// Which configured devices exist right now.
    pub fn scan(&self) -> ResolvedDeviceMap {
        scan_devices(&self.config.devices)
    }

    pub fn group_id(&self, name: &str) -> Result<u32, CoreError> {
        Ok(self.groups.group_id(name)?)
    }

    /// Plan a launch against a fresh device scan.
    pub fn plan(
        &self,
        image: &ImageRef,
        script: Option<&Path>,
    ) -> Result<LaunchConfig, CoreError> {
        let resolved = self.scan();
        LaunchPlanner::new(self.groups.as_ref(), &self.config.container.userdata_dir)
            .plan(&resolved, image, script)
    }

    pub fn pull(&self, image: &ImageRef) -> Result<Outcome, CoreError> {
        debug!("pulling {image}");
        self.runtime.pull_image(image).map_err(|e| {
            error!("failed to pull {image}: {e}");
            CoreError::from(e)
        })?;
        debug!("pulled {image}");
        Ok(Outcome::Completed)
    }

    /// Start a container running `script`, with its directory mounted and
    /// the present devices exposed.
    pub fn run(&self, image: &ImageRef, script: &Path) -> Result<Outcome, CoreError> {
        let command = script_command(script)?;
        let config = self.plan(image, Some(script))?;
        if let Some(volume) = &config.volume {
            info!(
                "will mount directory {} into the container",
                volume.host_dir.display()
            );
        }

        info!("running container {image}...");
        let handle = self
            .runtime
            .start_container(Some(&command), config)
            .map_err(|e| {
                error!("failed to run container {image}: {e}");
                CoreError::from(e)
            })?;
        Ok(Outcome::Started(handle))
    }
}
