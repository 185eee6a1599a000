/*!
`choose-file` - show the native open-file dialog.

Cancellation is a normal outcome: `{"path":"","error":""}`. Only a dialog
that could not be shown (or failed) fills `error`.
*/

use serde::Serialize;

use super::request::CommandParams;
use crate::platform::{DialogOutcome, DialogRequest, FileChooser, FileFilter};
use crate::utils::LogContext;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ChooseFileResponse {
    pub path: String,
    pub error: String,
}

/// Map request parameters onto the dialog capability's input.
pub fn dialog_request(params: &CommandParams) -> DialogRequest {
    DialogRequest {
        title: params.title.clone(),
        file_name: params.file_name.clone(),
        default_extension: params.default_extension.clone(),
        filter: FileFilter {
            display_name: params.display_name.clone(),
            pattern: params.pattern.clone(),
        },
    }
}

pub fn execute_choose_file(
    params: &CommandParams,
    chooser: &dyn FileChooser,
    log: &LogContext,
) -> ChooseFileResponse {
    if !params.role.is_empty() {
        log.debug(format!("choose-file: role {}", params.role));
    }
    match chooser.choose(&dialog_request(params)) {
        Ok(DialogOutcome::Selected(path)) => {
            log.debug(format!("choose-file: selected {}", path.display()));
            ChooseFileResponse {
                path: path.to_string_lossy().into_owned(),
                error: String::new(),
            }
        }
        Ok(DialogOutcome::Cancelled) => {
            log.debug("choose-file: cancelled");
            ChooseFileResponse::default()
        }
        Err(err) => {
            log.error(format!("choose-file: {err}"));
            ChooseFileResponse {
                path: String::new(),
                error: err.to_string(),
            }
        }
    }
}
