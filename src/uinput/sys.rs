//! Raw uinput ioctls not exposed by `evdev`.

use nix::errno::Errno;
use std::os::unix::io::RawFd;

const UINPUT_IOCTL_BASE: u8 = b'U';
const UI_DEV_DESTROY_NR: u8 = 2;

nix::ioctl_none!(ui_dev_destroy, UINPUT_IOCTL_BASE, UI_DEV_DESTROY_NR);

/// Issues `UI_DEV_DESTROY` on an open uinput descriptor.
///
/// The caller must pass a descriptor that refers to `/dev/uinput` and stays
/// open for the duration of the call. `EINVAL` (device already destroyed) is
/// treated as success.
pub fn destroy_device(fd: RawFd) -> nix::Result<()> {
    // SAFETY: UI_DEV_DESTROY takes no argument and only acts on `fd`.
    match unsafe { ui_dev_destroy(fd) } {
        Ok(_) | Err(Errno::EINVAL) => Ok(()),
        Err(e) => Err(e),
    }
}
