use std::path::PathBuf;
use tacpho_schema::{DeviceGroupMap, ResolvedDeviceMap};
use tracing::debug;

/// Keep only the device files that exist right now.
///
/// Groups with no surviving path are left out of the result.
pub fn scan_devices(map: &DeviceGroupMap) -> ResolvedDeviceMap {
    let mut resolved = ResolvedDeviceMap::new();
    for (group, candidates) in map.iter() {
        let present: Vec<PathBuf> = candidates
            .iter()
            .filter(|path| path.exists())
            .cloned()
            .collect();
        if present.is_empty() {
            debug!("no devices present for group '{group}'");
            continue;
        }
        debug!(
            "group '{group}': {} of {} devices present",
            present.len(),
            candidates.len()
        );
        resolved.insert(group, present);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn scan_keeps_only_existing_devices() {
        let dir = tempfile::tempdir().unwrap();
        let gpiomem = dir.path().join("gpiomem");
        let video0 = dir.path().join("video0");
        let video1 = dir.path().join("video1");
        touch(&gpiomem);
        touch(&video0);

        let mut map = DeviceGroupMap::new();
        map.insert("gpio", [&gpiomem]);
        map.insert("video", [&video0, &video1]);

        let resolved = scan_devices(&map);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.get("gpio").unwrap(), [gpiomem]);
        assert_eq!(resolved.get("video").unwrap(), [video0]);
    }

    #[test]
    fn scan_omits_groups_without_devices() {
        let dir = tempfile::tempdir().unwrap();
        let gpiomem = dir.path().join("gpiomem");
        touch(&gpiomem);

        let mut map = DeviceGroupMap::new();
        map.insert("gpio", [&gpiomem]);
        map.insert("hdd", [dir.path().join("hdd1")]);

        let resolved = scan_devices(&map);
        assert!(resolved.get("hdd").is_none());
        assert!(resolved.groups().all(|g| map.get(g).is_some()));
    }

    #[test]
    fn scan_empty_map() {
        assert!(scan_devices(&DeviceGroupMap::new()).is_empty());
    }

    #[test]
    fn scan_with_no_devices_on_system() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = DeviceGroupMap::new();
        map.insert("gpio", [dir.path().join("gpiomem")]);
        map.insert(
            "video",
            [dir.path().join("video0"), dir.path().join("video1")],
        );
        assert!(scan_devices(&map).is_empty());
    }

    #[test]
    fn scan_preserves_candidate_order() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["video2", "video0", "video1"];
        for name in names {
            touch(&dir.path().join(name));
        }
        let mut map = DeviceGroupMap::new();
        map.insert("video", names.iter().map(|n| dir.path().join(n)));

        let resolved = scan_devices(&map);
        let found: Vec<_> = resolved
            .get("video")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, names);
    }
}
