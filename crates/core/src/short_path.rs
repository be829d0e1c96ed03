use std::path::{Path, PathBuf};

/// Translates a path into its short (8.3) form for display.
pub trait PathShortener {
    fn shorten(&self, path: &Path) -> PathBuf;
}

/// Leaves paths untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl PathShortener for Identity {
    fn shorten(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

/// Asks the operating system for the short name and falls back to the
/// original path when there is none (non-Windows, missing file, 8.3 names
/// disabled on the volume).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShortener;

impl PathShortener for SystemShortener {
    fn shorten(&self, path: &Path) -> PathBuf {
        system_short_path(path).unwrap_or_else(|| path.to_path_buf())
    }
}

#[cfg(windows)]
fn system_short_path(path: &Path) -> Option<PathBuf> {
    use std::ffi::OsString;
    use std::os::windows::ffi::{OsStrExt, OsStringExt};
    use windows_sys::Win32::Storage::FileSystem::GetShortPathNameW;

    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    let needed = unsafe { GetShortPathNameW(wide.as_ptr(), std::ptr::null_mut(), 0) };
    if needed == 0 {
        return None;
    }

    let mut buffer = vec![0u16; needed as usize];
    let written = unsafe { GetShortPathNameW(wide.as_ptr(), buffer.as_mut_ptr(), needed) };
    if written == 0 || written >= needed {
        return None;
    }
    buffer.truncate(written as usize);
    Some(PathBuf::from(OsString::from_wide(&buffer)))
}

#[cfg(not(windows))]
fn system_short_path(_path: &Path) -> Option<PathBuf> {
    None
}
