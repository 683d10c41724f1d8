use crate::backend::{ContainerRuntime, ProcessHandle};
use crate::groups::GroupLookup;
use crate::RuntimeError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};
use tacpho_schema::{ImageRef, LaunchConfig, DEFAULT_IMAGE_NAME};

#[derive(Default)]
struct MockState {
    pulled: Vec<ImageRef>,
    launched: Vec<(Option<String>, LaunchConfig)>,
}

/// In-process runtime that knows a fixed set of image names.
///
/// Clones share state, so a test can keep one clone and hand the other to a
/// launcher.
#[derive(Clone)]
pub struct MockRuntime {
    known_images: BTreeSet<String>,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::with_images([DEFAULT_IMAGE_NAME])
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_images: names.into_iter().map(Into::into).collect(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|e| RuntimeError::Api(format!("mutex poisoned: {e}")))
    }

    fn check_known(&self, image: &ImageRef) -> Result<(), RuntimeError> {
        if self.known_images.contains(&image.name) {
            Ok(())
        } else {
            Err(RuntimeError::ImageNotFound(format!(
                "manifest for {image} not found: manifest unknown"
            )))
        }
    }

    pub fn pulled(&self) -> Vec<ImageRef> {
        self.state().map(|s| s.pulled.clone()).unwrap_or_default()
    }

    /// Every successful `start_container` call, oldest first.
    pub fn launched(&self) -> Vec<(Option<String>, LaunchConfig)> {
        self.state().map(|s| s.launched.clone()).unwrap_or_default()
    }
}

impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn pull_image(&self, image: &ImageRef) -> Result<(), RuntimeError> {
        self.check_known(image)?;
        self.state()?.pulled.push(image.clone());
        Ok(())
    }

    fn start_container(
        &self,
        command: Option<&str>,
        config: LaunchConfig,
    ) -> Result<ProcessHandle, RuntimeError> {
        self.check_known(&config.image)?;

        let mut output = format!(
            "mock-run: {} {}\n",
            config.image,
            command.unwrap_or("<default>")
        );
        for device in config.devices.iter().flatten() {
            let _ = writeln!(output, "mock-device: {device}");
        }
        if let Some(volume) = &config.volume {
            let _ = writeln!(output, "mock-volume: {volume}");
        }

        let mut state = self.state()?;
        let container_id = format!("mock-{:012}", state.launched.len());
        state.launched.push((command.map(str::to_owned), config));

        Ok(ProcessHandle::new(container_id).with_logs(Cursor::new(output.into_bytes())))
    }
}

/// Group database backed by a fixed name-to-gid table.
#[derive(Debug, Clone, Default)]
pub struct MockGroups {
    groups: BTreeMap<String, u32>,
}

impl MockGroups {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            groups: entries.into_iter().map(|(n, g)| (n.into(), g)).collect(),
        }
    }
}

impl GroupLookup for MockGroups {
    fn group_id(&self, name: &str) -> Result<u32, RuntimeError> {
        self.groups
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::GroupNotFound(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn config(name: &str) -> LaunchConfig {
        LaunchConfig {
            image: ImageRef::new(name, "latest"),
            detach: true,
            devices: None,
            group_add: None,
            volume: None,
            tty: true,
            auto_remove: true,
        }
    }

    #[test]
    fn pull_known_image() {
        let runtime = MockRuntime::new();
        runtime
            .pull_image(&ImageRef::new(DEFAULT_IMAGE_NAME, "latest"))
            .unwrap();
        assert_eq!(runtime.pulled().len(), 1);
    }

    #[test]
    fn pull_unknown_image_is_not_found() {
        let runtime = MockRuntime::new();
        let err = runtime
            .pull_image(&ImageRef::new("does-not/exist", "latest"))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ImageNotFound(_)));
        assert!(runtime.pulled().is_empty());
    }

    #[test]
    fn start_records_launch_and_yields_logs() {
        let runtime = MockRuntime::new();
        let observer = runtime.clone();
        let mut handle = runtime
            .start_container(Some("s.py"), config(DEFAULT_IMAGE_NAME))
            .unwrap();
        assert_eq!(handle.container_id(), "mock-000000000000");

        let mut text = String::new();
        handle
            .logs
            .as_mut()
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert!(text.starts_with("mock-run: kmdouglass/rpi-micromanager:latest s.py"));

        let launched = observer.launched();
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].0.as_deref(), Some("s.py"));
    }

    #[test]
    fn start_unknown_image_launches_nothing() {
        let runtime = MockRuntime::new();
        assert!(runtime
            .start_container(None, config("does-not/exist"))
            .is_err());
        assert!(runtime.launched().is_empty());
    }

    #[test]
    fn mock_groups_lookup() {
        let groups = MockGroups::new([("gpio", 997), ("video", 44)]);
        assert_eq!(groups.group_id("gpio").unwrap(), 997);
        assert!(matches!(
            groups.group_id("i2c"),
            Err(RuntimeError::GroupNotFound(g)) if g == "i2c"
        ));
    }
}
