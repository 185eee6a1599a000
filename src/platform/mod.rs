//! Operating-system capabilities consumed by the command handlers.
//!
//! Each concern is a trait with one native implementation chosen at build
//! time; handlers only see the trait.

pub mod dialog;
pub mod policy;

pub use dialog::{DialogOutcome, DialogRequest, FileChooser, FileFilter, NativeFileChooser};
pub use policy::{NativePolicyStore, PolicyKey, PolicyScope, PolicyStore};
