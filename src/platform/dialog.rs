//! Native open-file dialog.
//!
//! FileChooser::choose -> Selected(path) | Cancelled
//!
//! Backends: Windows common dialog, macOS `osascript`, other Unix `zenity`.
use std::path::PathBuf;

use thiserror::Error;

/// A single display-name/pattern filter entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    pub display_name: String,
    pub pattern: String,
}

/// Everything the dialog needs to know.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogRequest {
    pub title: String,
    pub file_name: String,
    pub default_extension: String,
    pub filter: FileFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Selected(PathBuf),
    Cancelled,
}

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("failed to launch file dialog: {0}")]
    Launch(#[source] std::io::Error),
    #[error("file dialog failed: {0}")]
    Failed(String),
}

pub trait FileChooser {
    fn choose(&self, request: &DialogRequest) -> Result<DialogOutcome, DialogError>;
}

/// The dialog backend for the current target platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFileChooser;

impl FileChooser for NativeFileChooser {
    fn choose(&self, request: &DialogRequest) -> Result<DialogOutcome, DialogError> {
        backend::choose(request)
    }
}

#[cfg(windows)]
mod backend {
    use super::{DialogError, DialogOutcome, DialogRequest};
    use std::ffi::OsString;
    use std::os::windows::ffi::{OsStrExt, OsStringExt};
    use std::path::PathBuf;
    use windows_sys::Win32::UI::Controls::Dialogs::{
        CommDlgExtendedError, GetOpenFileNameW, OFN_EXPLORER, OFN_FILEMUSTEXIST,
        OFN_NOCHANGEDIR, OFN_PATHMUSTEXIST, OPENFILENAMEW,
    };

    const MAX_PATH_CHARS: usize = 32_768;

    fn wide(s: &str) -> Vec<u16> {
        std::ffi::OsStr::new(s)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    /// "Display\0Pattern\0\0", or no filter at all when both are empty.
    fn filter_spec(request: &DialogRequest) -> Option<Vec<u16>> {
        let filter = &request.filter;
        if filter.display_name.is_empty() && filter.pattern.is_empty() {
            return None;
        }
        let display = if filter.display_name.is_empty() {
            &filter.pattern
        } else {
            &filter.display_name
        };
        let mut spec = wide(display);
        spec.extend(wide(&filter.pattern));
        spec.push(0);
        Some(spec)
    }

    pub(super) fn choose(request: &DialogRequest) -> Result<DialogOutcome, DialogError> {
        let mut file_buf = vec![0u16; MAX_PATH_CHARS];
        for (slot, unit) in file_buf
            .iter_mut()
            .zip(std::ffi::OsStr::new(&request.file_name).encode_wide())
            .take(MAX_PATH_CHARS - 1)
        {
            *slot = unit;
        }
        let title = wide(&request.title);
        let default_ext = wide(request.default_extension.trim_start_matches('.'));
        let filter = filter_spec(request);

        // SAFETY: OPENFILENAMEW is a plain C struct; every pointer stored in it
        // refers to a buffer that outlives the GetOpenFileNameW call below.
        let selected = unsafe {
            let mut ofn: OPENFILENAMEW = std::mem::zeroed();
            ofn.lStructSize = std::mem::size_of::<OPENFILENAMEW>() as u32;
            ofn.lpstrFile = file_buf.as_mut_ptr();
            ofn.nMaxFile = MAX_PATH_CHARS as u32;
            if !request.title.is_empty() {
                ofn.lpstrTitle = title.as_ptr();
            }
            if !request.default_extension.is_empty() {
                ofn.lpstrDefExt = default_ext.as_ptr();
            }
            if let Some(filter) = &filter {
                ofn.lpstrFilter = filter.as_ptr();
                ofn.nFilterIndex = 1;
            }
            ofn.Flags = OFN_EXPLORER | OFN_FILEMUSTEXIST | OFN_PATHMUSTEXIST | OFN_NOCHANGEDIR;
            GetOpenFileNameW(&mut ofn) != 0
        };

        if !selected {
            // SAFETY: no preconditions; reports the status of the last dialog call.
            let code = unsafe { CommDlgExtendedError() };
            if code == 0 {
                return Ok(DialogOutcome::Cancelled);
            }
            return Err(DialogError::Failed(format!(
                "common dialog error 0x{code:04x}"
            )));
        }

        let len = file_buf.iter().position(|&c| c == 0).unwrap_or(file_buf.len());
        let path = OsString::from_wide(&file_buf[..len]);
        Ok(DialogOutcome::Selected(PathBuf::from(path)))
    }
}

#[cfg(target_os = "macos")]
mod backend {
    use super::{DialogError, DialogOutcome, DialogRequest};
    use std::path::PathBuf;
    use std::process::Command;

    /// AppleScript's "User canceled." error number.
    const USER_CANCELED: &str = "-128";

    fn quote(s: &str) -> String {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    }

    fn script(request: &DialogRequest) -> String {
        let mut script = String::from("POSIX path of (choose file");
        if !request.title.is_empty() {
            script.push_str(&format!(" with prompt {}", quote(&request.title)));
        }
        let ext = request
            .filter
            .pattern
            .rsplit('.')
            .next()
            .filter(|e| !e.is_empty() && *e != "*" && request.filter.pattern.contains('.'));
        if let Some(ext) = ext {
            script.push_str(&format!(" of type {{{}}}", quote(ext)));
        }
        script.push(')');
        script
    }

    pub(super) fn choose(request: &DialogRequest) -> Result<DialogOutcome, DialogError> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script(request))
            .output()
            .map_err(DialogError::Launch)?;
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
            return Ok(DialogOutcome::Selected(PathBuf::from(path)));
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains(USER_CANCELED) {
            return Ok(DialogOutcome::Cancelled);
        }
        Err(DialogError::Failed(stderr.trim().to_string()))
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
mod backend {
    use super::{DialogError, DialogOutcome, DialogRequest};
    use std::path::PathBuf;
    use std::process::Command;

    pub(super) fn args(request: &DialogRequest) -> Vec<String> {
        let mut args = vec!["--file-selection".to_string()];
        if !request.title.is_empty() {
            args.push(format!("--title={}", request.title));
        }
        if !request.file_name.is_empty() {
            args.push(format!("--filename={}", request.file_name));
        }
        let filter = &request.filter;
        let pattern = if filter.pattern.is_empty() && !request.default_extension.is_empty() {
            format!("*.{}", request.default_extension.trim_start_matches('.'))
        } else {
            filter.pattern.clone()
        };
        if !pattern.is_empty() {
            let name = if filter.display_name.is_empty() {
                &pattern
            } else {
                &filter.display_name
            };
            args.push(format!("--file-filter={name} | {pattern}"));
        }
        args
    }

    pub(super) fn choose(request: &DialogRequest) -> Result<DialogOutcome, DialogError> {
        let output = Command::new("zenity")
            .args(args(request))
            .output()
            .map_err(DialogError::Launch)?;
        match output.status.code() {
            Some(0) => {
                let path = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
                Ok(DialogOutcome::Selected(PathBuf::from(path)))
            }
            // zenity exits 1 when the user presses Cancel or closes the window.
            Some(1) => Ok(DialogOutcome::Cancelled),
            _ => Err(DialogError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }

}

#[cfg(not(any(windows, unix)))]
mod backend {
    use super::{DialogError, DialogOutcome, DialogRequest};

    pub(super) fn choose(_request: &DialogRequest) -> Result<DialogOutcome, DialogError> {
        Err(DialogError::Failed(
            "no file dialog available on this platform".into(),
        ))
    }
}
