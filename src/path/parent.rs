//! Locating the directory of the process that launched this helper.
//!
//! One implementation over `sysinfo` serves every platform: read the process
//! table, find our parent pid, and take the directory of its executable. When
//! the executable path is not reported, the command name is resolved against
//! `PATH`.
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use sysinfo::{Pid, Process, System};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("parent process lookup failed: {0}")]
    LookupFailed(String),
}

/// Capability: "where does the process that started us live?"
pub trait ParentDirLocator {
    fn locate(&self) -> Result<PathBuf, LocateError>;
}

/// Process-table backed locator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoLocator;

impl ParentDirLocator for SysinfoLocator {
    fn locate(&self) -> Result<PathBuf, LocateError> {
        let current = sysinfo::get_current_pid().map_err(|e| LocateError::LookupFailed(e.into()))?;

        let mut system = System::new();
        system.refresh_processes();

        let me = system
            .process(current)
            .ok_or_else(|| LocateError::LookupFailed(format!("process {current} not listed")))?;
        let parent_pid = me
            .parent()
            .ok_or_else(|| LocateError::LookupFailed(format!("process {current} has no parent")))?;
        let parent = system.process(parent_pid).ok_or_else(|| {
            LocateError::LookupFailed(format!("parent process {parent_pid} has exited"))
        })?;

        // A parent that started after us is a recycled pid, not our launcher.
        if parent.start_time() > me.start_time() {
            return Err(LocateError::LookupFailed(format!(
                "parent pid {parent_pid} was reused by another process"
            )));
        }

        let executable = executable_of(parent_pid, parent)?;
        executable
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                LocateError::LookupFailed(format!(
                    "executable {} has no parent directory",
                    executable.display()
                ))
            })
    }
}

fn executable_of(pid: Pid, process: &Process) -> Result<PathBuf, LocateError> {
    if let Some(exe) = process.exe()
        && exe.is_absolute()
    {
        return Ok(exe.to_path_buf());
    }

    let command = process
        .cmd()
        .first()
        .map(String::as_str)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| process.name());
    if command.is_empty() {
        return Err(LocateError::LookupFailed(format!(
            "process {pid} reports no command name"
        )));
    }

    let command = Path::new(command);
    if command.is_absolute() {
        return Ok(command.to_path_buf());
    }
    search_path(command, std::env::var_os("PATH").as_deref()).ok_or_else(|| {
        LocateError::LookupFailed(format!(
            "command {} of process {pid} not found on PATH",
            command.display()
        ))
    })
}

/// Resolve a bare command name against a `PATH`-style list.
fn search_path(command: &Path, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let path_var = path_var?;
    std::env::split_paths(path_var)
        .map(|dir| dir.join(command))
        .find(|candidate| candidate.is_file())
}
