use crate::CoreError;
use std::path::{Component, Path, PathBuf};
use tacpho_runtime::GroupLookup;
use tacpho_schema::{
    AccessMode, DeviceBinding, ImageRef, LaunchConfig, ResolvedDeviceMap, VolumeBinding,
};
use tracing::debug;

/// Turns a device snapshot and user arguments into a `LaunchConfig`.
pub struct LaunchPlanner<'a> {
    groups: &'a dyn GroupLookup,
    userdata_dir: &'a Path,
}

impl<'a> LaunchPlanner<'a> {
    /// `userdata_dir` is the fixed container mount point for the script
    /// directory.
    pub fn new(groups: &'a dyn GroupLookup, userdata_dir: &'a Path) -> Self {
        Self {
            groups,
            userdata_dir,
        }
    }

    /// Build the launch plan. The device bindings and the supplementary
    /// groups both come from `resolved`, so a device is exposed exactly when
    /// its group is granted.
    pub fn plan(
        &self,
        resolved: &ResolvedDeviceMap,
        image: &ImageRef,
        script: Option<&Path>,
    ) -> Result<LaunchConfig, CoreError> {
        if !image.is_complete() {
            return Err(CoreError::Configuration(format!(
                "image name and tag must not be empty (got '{image}')"
            )));
        }

        let volume = match script {
            Some(script) => Some(VolumeBinding {
                host_dir: script_dir(script)?,
                container_dir: self.userdata_dir.to_path_buf(),
                mode: AccessMode::ReadWrite,
            }),
            None => None,
        };

        let mut group_add = Vec::new();
        for group in resolved.groups() {
            let gid = self.groups.group_id(group)?;
            if !group_add.contains(&gid) {
                group_add.push(gid);
            }
        }

        let devices: Vec<DeviceBinding> =
            resolved.devices().map(DeviceBinding::identity).collect();
        debug!(
            "planned {} device bindings and {} groups for {image}",
            devices.len(),
            group_add.len()
        );

        Ok(LaunchConfig {
            image: image.clone(),
            detach: true,
            devices: non_empty(devices),
            group_add: non_empty(group_add),
            volume,
            tty: true,
            auto_remove: true,
        })
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

/// Absolute directory containing `script`. The directory must exist.
pub fn script_dir(script: &Path) -> Result<PathBuf, CoreError> {
    let absolute = if script.is_absolute() {
        script.to_path_buf()
    } else {
        std::env::current_dir()?.join(script)
    };
    let absolute = normalize_lexically(&absolute);
    let dir = absolute.parent().ok_or_else(|| {
        CoreError::Configuration(format!(
            "script path '{}' has no containing directory",
            script.display()
        ))
    })?;
    if !dir.is_dir() {
        return Err(CoreError::Configuration(format!(
            "script directory '{}' does not exist",
            dir.display()
        )));
    }
    Ok(dir.to_path_buf())
}

/// The command run inside the container: the script's file name.
pub fn script_command(script: &Path) -> Result<String, CoreError> {
    script
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| {
            CoreError::Configuration(format!(
                "script path '{}' does not name a file",
                script.display()
            ))
        })
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tacpho_runtime::mock::MockGroups;
    use tacpho_schema::DEFAULT_USERDATA_DIR;

    fn groups() -> MockGroups {
        MockGroups::new([("gpio", 997), ("video", 44)])
    }

    fn image() -> ImageRef {
        ImageRef::new("kmdouglass/rpi-micromanager", "latest")
    }

    fn gpio_and_camera() -> ResolvedDeviceMap {
        let mut resolved = ResolvedDeviceMap::new();
        resolved.insert("gpio", vec![PathBuf::from("/dev/gpiomem")]);
        resolved.insert("video", vec![PathBuf::from("/dev/video0")]);
        resolved
    }

    #[test]
    fn plan_exposes_devices_and_groups() {
        let groups = groups();
        let planner = LaunchPlanner::new(&groups, Path::new(DEFAULT_USERDATA_DIR));
        let config = planner.plan(&gpio_and_camera(), &image(), None).unwrap();

        let devices: Vec<String> = config
            .devices
            .as_ref()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            devices,
            ["/dev/gpiomem:/dev/gpiomem:rw", "/dev/video0:/dev/video0:rw"]
        );
        assert_eq!(config.group_add, Some(vec![997, 44]));
        assert!(config.detach);
        assert!(config.tty);
        assert!(config.auto_remove);
        assert!(config.volume.is_none());
    }

    #[test]
    fn empty_snapshot_leaves_devices_and_groups_unset() {
        let groups = groups();
        let planner = LaunchPlanner::new(&groups, Path::new(DEFAULT_USERDATA_DIR));
        let config = planner
            .plan(&ResolvedDeviceMap::new(), &image(), None)
            .unwrap();
        assert_eq!(config.devices, None);
        assert_eq!(config.group_add, None);
    }

    #[test]
    fn duplicate_gids_are_collapsed() {
        let groups = MockGroups::new([("gpio", 997), ("spi", 997)]);
        let mut resolved = ResolvedDeviceMap::new();
        resolved.insert("gpio", vec![PathBuf::from("/dev/gpiomem")]);
        resolved.insert("spi", vec![PathBuf::from("/dev/spidev0.0")]);
        let planner = LaunchPlanner::new(&groups, Path::new(DEFAULT_USERDATA_DIR));
        let config = planner.plan(&resolved, &image(), None).unwrap();
        assert_eq!(config.group_add, Some(vec![997]));
        assert_eq!(config.devices.unwrap().len(), 2);
    }

    #[test]
    fn unknown_group_fails_plan() {
        let groups = MockGroups::new([("gpio", 997)]);
        let planner = LaunchPlanner::new(&groups, Path::new(DEFAULT_USERDATA_DIR));
        let err = planner.plan(&gpio_and_camera(), &image(), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GroupNotFound);
        assert!(matches!(err, CoreError::GroupNotFound { ref group, .. } if group == "video"));
    }

    #[test]
    fn script_directory_becomes_volume() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("scripts");
        std::fs::create_dir(&scripts).unwrap();
        let script = scripts.join("s.py");

        let groups = groups();
        let planner = LaunchPlanner::new(&groups, Path::new(DEFAULT_USERDATA_DIR));
        let config = planner
            .plan(&ResolvedDeviceMap::new(), &image(), Some(&script))
            .unwrap();
        let volume = config.volume.unwrap();
        assert_eq!(volume.host_dir, scripts);
        assert_eq!(volume.container_dir, PathBuf::from(DEFAULT_USERDATA_DIR));
        assert_eq!(volume.mode, AccessMode::ReadWrite);
    }

    #[test]
    fn missing_script_directory_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("absent").join("s.py");

        let groups = groups();
        let planner = LaunchPlanner::new(&groups, Path::new(DEFAULT_USERDATA_DIR));
        let err = planner
            .plan(&gpio_and_camera(), &image(), Some(&script))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn empty_image_tag_is_configuration_error() {
        let groups = groups();
        let planner = LaunchPlanner::new(&groups, Path::new(DEFAULT_USERDATA_DIR));
        let err = planner
            .plan(
                &ResolvedDeviceMap::new(),
                &ImageRef::new("kmdouglass/rpi-micromanager", ""),
                None,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn plan_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("s.py");
        let groups = groups();
        let planner = LaunchPlanner::new(&groups, Path::new(DEFAULT_USERDATA_DIR));
        let resolved = gpio_and_camera();
        let first = planner.plan(&resolved, &image(), Some(&script)).unwrap();
        let second = planner.plan(&resolved, &image(), Some(&script)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn script_dir_normalizes_dot_segments() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let script = sub.join("..").join("sub").join(".").join("s.py");
        assert_eq!(script_dir(&script).unwrap(), sub);
    }

    #[test]
    fn relative_script_is_made_absolute() {
        let dir = script_dir(Path::new("s.py")).unwrap();
        assert!(dir.is_absolute());
        assert_eq!(dir, std::env::current_dir().unwrap());
    }

    #[test]
    fn script_command_is_file_name() {
        assert_eq!(
            script_command(Path::new("/data/scripts/s.py")).unwrap(),
            "s.py"
        );
        assert!(script_command(Path::new("/data/scripts/..")).is_err());
    }

    #[test]
    fn root_has_no_containing_directory() {
        let err = script_dir(Path::new("/")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
