//! sysfs walk from hidraw / input-event class entries to their USB device.
//!
//! `/sys/class/hidraw/hidrawN/device` is a symlink into the device tree. The
//! owning USB device is the closest ancestor directory that exposes both
//! `busnum` and `devnum`.

use super::PathResolver;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Directories checked when walking up from a class entry
const MAX_WALK_DEPTH: usize = 6;

/// [`PathResolver`] backed by sysfs.
#[derive(Debug, Clone)]
pub struct SysfsResolver {
    sys_root: PathBuf,
    dev_root: PathBuf,
}

impl Default for SysfsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsResolver {
    /// Resolver over `/sys` and `/dev`.
    pub fn new() -> Self {
        Self::with_roots("/sys", "/dev")
    }

    /// Resolver over alternate roots (used by tests with a fake tree).
    pub fn with_roots(sys_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>) -> Self {
        Self {
            sys_root: sys_root.into(),
            dev_root: dev_root.into(),
        }
    }

    /// Finds the first entry of `class` whose name starts with `prefix` and
    /// whose device belongs to `bus`/`address`.
    fn find_node(&self, class: &str, prefix: &str, bus: u8, address: u8) -> Option<String> {
        let base = self.sys_root.join("class").join(class);
        let entries = match fs::read_dir(&base) {
            Ok(entries) => entries,
            Err(e) => {
                trace!("Cannot read {}: {}", base.display(), e);
                return None;
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(prefix))
            .collect();
        names.sort();

        names
            .into_iter()
            .find(|name| belongs_to(&base.join(name).join("device"), bus, address))
    }
}

impl PathResolver for SysfsResolver {
    fn hidraw_path(&self, bus: u8, address: u8) -> Option<PathBuf> {
        self.find_node("hidraw", "hidraw", bus, address)
            .map(|name| self.dev_root.join(name))
    }

    fn event_path(&self, bus: u8, address: u8) -> Option<PathBuf> {
        self.find_node("input", "event", bus, address)
            .map(|name| self.dev_root.join("input").join(name))
    }
}

/// Walks up from `start` to the first directory with `busnum` and `devnum`
/// and compares them against the target.
///
/// Only the first such directory is considered: a mismatch there is final.
fn belongs_to(start: &Path, bus: u8, address: u8) -> bool {
    let Ok(real) = fs::canonicalize(start) else {
        return false;
    };

    let mut dir = Some(real.as_path());
    for _ in 0..MAX_WALK_DEPTH {
        let Some(current) = dir else {
            break;
        };

        let busnum = current.join("busnum");
        let devnum = current.join("devnum");
        if busnum.is_file() && devnum.is_file() {
            return read_number(&busnum) == Some(u32::from(bus))
                && read_number(&devnum) == Some(u32::from(address));
        }

        dir = current.parent();
    }
    false
}

fn read_number(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    /// Builds a fake sysfs tree with one USB device per `(bus, address)`.
    ///
    /// Each device gets an interface directory holding hidrawN and eventN
    /// nodes `extra_depth` levels below the USB device directory.
    fn fake_sysfs(devices: &[(u8, u8)], extra_depth: usize) -> TempDir {
        let root = tempfile::tempdir().unwrap();
        let sys = root.path();
        fs::create_dir_all(sys.join("class/hidraw")).unwrap();
        fs::create_dir_all(sys.join("class/input")).unwrap();

        for (index, (bus, address)) in devices.iter().enumerate() {
            let usb_dev = sys.join(format!("devices/pci0000:00/usb{}/{}-{}", bus, bus, index + 1));
            fs::create_dir_all(&usb_dev).unwrap();
            fs::write(usb_dev.join("busnum"), format!("{}\n", bus)).unwrap();
            fs::write(usb_dev.join("devnum"), format!("{}\n", address)).unwrap();

            let mut leaf = usb_dev.clone();
            for level in 0..extra_depth {
                leaf = leaf.join(format!("level{}", level));
            }
            let hid_leaf = leaf.join(format!("hidraw/hidraw{}", index));
            let event_leaf = leaf.join(format!("input/event{}", index + 10));
            fs::create_dir_all(&hid_leaf).unwrap();
            fs::create_dir_all(&event_leaf).unwrap();

            let hid_class = sys.join(format!("class/hidraw/hidraw{}", index));
            fs::create_dir_all(&hid_class).unwrap();
            symlink(&hid_leaf, hid_class.join("device")).unwrap();

            let event_class = sys.join(format!("class/input/event{}", index + 10));
            fs::create_dir_all(&event_class).unwrap();
            symlink(&event_leaf, event_class.join("device")).unwrap();
        }
        root
    }

    #[test]
    fn test_resolves_hidraw_for_matching_device() {
        let root = fake_sysfs(&[(1, 5), (3, 12)], 2);
        let resolver = SysfsResolver::with_roots(root.path(), "/dev");

        assert_eq!(resolver.hidraw_path(1, 5), Some(PathBuf::from("/dev/hidraw0")));
        assert_eq!(resolver.hidraw_path(3, 12), Some(PathBuf::from("/dev/hidraw1")));
    }

    #[test]
    fn test_resolves_event_node() {
        let root = fake_sysfs(&[(2, 4)], 1);
        let resolver = SysfsResolver::with_roots(root.path(), "/dev");

        assert_eq!(
            resolver.event_path(2, 4),
            Some(PathBuf::from("/dev/input/event10"))
        );
    }

    #[test]
    fn test_unknown_device_not_found() {
        let root = fake_sysfs(&[(1, 5)], 2);
        let resolver = SysfsResolver::with_roots(root.path(), "/dev");

        assert_eq!(resolver.hidraw_path(1, 6), None);
        assert_eq!(resolver.hidraw_path(2, 5), None);
        assert_eq!(resolver.event_path(9, 9), None);
    }

    #[test]
    fn test_walk_depth_is_bounded() {
        // hidraw leaf sits 2 (hidraw/hidrawN) + 5 levels below the USB device
        let root = fake_sysfs(&[(1, 5)], 5);
        let resolver = SysfsResolver::with_roots(root.path(), "/dev");
        assert_eq!(resolver.hidraw_path(1, 5), None);

        // 2 + 3 levels: the USB device is the 6th directory checked
        let root = fake_sysfs(&[(1, 5)], 3);
        let resolver = SysfsResolver::with_roots(root.path(), "/dev");
        assert_eq!(resolver.hidraw_path(1, 5), Some(PathBuf::from("/dev/hidraw0")));
    }

    #[test]
    fn test_nearest_usb_ancestor_decides() {
        let root = fake_sysfs(&[(1, 5)], 1);
        // A closer directory with different numbers shadows the real device
        let shadow = root
            .path()
            .join("devices/pci0000:00/usb1/1-1/level0");
        fs::write(shadow.join("busnum"), "7").unwrap();
        fs::write(shadow.join("devnum"), "7").unwrap();

        let resolver = SysfsResolver::with_roots(root.path(), "/dev");
        assert_eq!(resolver.hidraw_path(1, 5), None);
        assert_eq!(resolver.hidraw_path(7, 7), Some(PathBuf::from("/dev/hidraw0")));
    }

    #[test]
    fn test_missing_class_directory() {
        let root = tempfile::tempdir().unwrap();
        let resolver = SysfsResolver::with_roots(root.path(), "/dev");
        assert_eq!(resolver.hidraw_path(1, 1), None);
    }

    #[test]
    fn test_custom_dev_root() {
        let root = fake_sysfs(&[(1, 5)], 0);
        let resolver = SysfsResolver::with_roots(root.path(), "/tmp/devtest");
        assert_eq!(
            resolver.hidraw_path(1, 5),
            Some(PathBuf::from("/tmp/devtest/hidraw0"))
        );
    }
}
