//! Centrally administered policy settings (Windows registry on Windows).
//!
//! A store opens a key path under a scope; an opened key answers typed value
//! lookups with `None` for "not found". Platforms without a policy store open
//! nothing, so every setting reads as absent.
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyScope {
    Machine,
    CurrentUser,
}

impl fmt::Display for PolicyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PolicyScope::Machine => "HKLM",
            PolicyScope::CurrentUser => "HKCU",
        })
    }
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy key {scope}\\{path} not available: {reason}")]
    KeyUnavailable {
        scope: PolicyScope,
        path: String,
        reason: String,
    },
}

/// An opened policy key.
pub trait PolicyKey {
    fn integer(&self, name: &str) -> Option<u64>;
    fn strings(&self, name: &str) -> Option<Vec<String>>;
}

pub trait PolicyStore {
    fn open(&self, scope: PolicyScope, key_path: &str) -> Result<Box<dyn PolicyKey + '_>, PolicyError>;
}

/// Store for platforms without centrally managed policies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPolicyStore;

impl PolicyStore for NoPolicyStore {
    fn open(&self, scope: PolicyScope, key_path: &str) -> Result<Box<dyn PolicyKey + '_>, PolicyError> {
        Err(PolicyError::KeyUnavailable {
            scope,
            path: key_path.to_string(),
            reason: "no policy store on this platform".into(),
        })
    }
}

#[cfg(windows)]
pub use registry::RegistryPolicyStore as NativePolicyStore;

#[cfg(not(windows))]
pub use self::NoPolicyStore as NativePolicyStore;

#[cfg(windows)]
mod registry {
    use super::{PolicyError, PolicyKey, PolicyScope, PolicyStore};
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Foundation::ERROR_SUCCESS;
    use windows_sys::Win32::System::Registry::{
        HKEY, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_QUERY_VALUE, REG_DWORD, REG_MULTI_SZ,
        REG_QWORD, REG_VALUE_TYPE, RegCloseKey, RegOpenKeyExW, RegQueryValueExW,
    };

    fn wide(s: &str) -> Vec<u16> {
        OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
    }

    #[derive(Debug, Default, Clone, Copy)]
    pub struct RegistryPolicyStore;

    impl PolicyStore for RegistryPolicyStore {
        fn open(
            &self,
            scope: PolicyScope,
            key_path: &str,
        ) -> Result<Box<dyn PolicyKey + '_>, PolicyError> {
            let base = match scope {
                PolicyScope::Machine => HKEY_LOCAL_MACHINE,
                PolicyScope::CurrentUser => HKEY_CURRENT_USER,
            };
            let sub_key = wide(key_path);
            let mut handle: HKEY = 0;
            // SAFETY: `sub_key` is NUL-terminated and `handle` is a valid out pointer.
            let status =
                unsafe { RegOpenKeyExW(base, sub_key.as_ptr(), 0, KEY_QUERY_VALUE, &mut handle) };
            if status != ERROR_SUCCESS {
                return Err(PolicyError::KeyUnavailable {
                    scope,
                    path: key_path.to_string(),
                    reason: format!("RegOpenKeyExW returned {status}"),
                });
            }
            Ok(Box::new(RegistryKey { handle }))
        }
    }

    struct RegistryKey {
        handle: HKEY,
    }

    impl RegistryKey {
        /// Raw value bytes and their registry type.
        fn query(&self, name: &str) -> Option<(REG_VALUE_TYPE, Vec<u8>)> {
            let name = wide(name);
            let mut kind: REG_VALUE_TYPE = 0;
            let mut size: u32 = 0;
            // SAFETY: size probe with a null data pointer.
            let status = unsafe {
                RegQueryValueExW(
                    self.handle,
                    name.as_ptr(),
                    std::ptr::null(),
                    &mut kind,
                    std::ptr::null_mut(),
                    &mut size,
                )
            };
            if status != ERROR_SUCCESS {
                return None;
            }
            let mut data = vec![0u8; size as usize];
            // SAFETY: `data` holds `size` writable bytes.
            let status = unsafe {
                RegQueryValueExW(
                    self.handle,
                    name.as_ptr(),
                    std::ptr::null(),
                    &mut kind,
                    data.as_mut_ptr(),
                    &mut size,
                )
            };
            if status != ERROR_SUCCESS {
                return None;
            }
            data.truncate(size as usize);
            Some((kind, data))
        }
    }

    impl PolicyKey for RegistryKey {
        fn integer(&self, name: &str) -> Option<u64> {
            let (kind, data) = self.query(name)?;
            match kind {
                REG_DWORD if data.len() >= 4 => {
                    Some(u64::from(u32::from_le_bytes(data[..4].try_into().ok()?)))
                }
                REG_QWORD if data.len() >= 8 => Some(u64::from_le_bytes(data[..8].try_into().ok()?)),
                _ => None,
            }
        }

        fn strings(&self, name: &str) -> Option<Vec<String>> {
            let (kind, data) = self.query(name)?;
            if kind != REG_MULTI_SZ {
                return None;
            }
            let units: Vec<u16> = data
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            Some(
                units
                    .split(|&u| u == 0)
                    .take_while(|s| !s.is_empty())
                    .map(String::from_utf16_lossy)
                    .collect(),
            )
        }
    }

    impl Drop for RegistryKey {
        fn drop(&mut self) {
            // SAFETY: the handle came from a successful RegOpenKeyExW.
            unsafe {
                RegCloseKey(self.handle);
            }
        }
    }
}
