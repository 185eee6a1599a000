/*!
Shared response type for every dispatched command.

  Response::to_json()  - the wire payload (stdio mode)
  Response::to_text()  - the payload printed by direct invocation
  Response::error()    - the command's `error` field ("" on success)
*/

use serde::Serialize;

use super::choose_file::ChooseFileResponse;
use super::fetch::FetchResponse;
use super::gpo::OutlookGpoConfigsResponse;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Response {
    Fetch(FetchResponse),
    ChooseFile(ChooseFileResponse),
    OutlookGpoConfigs(OutlookGpoConfigsResponse),
}

impl Response {
    pub fn error(&self) -> &str {
        match self {
            Response::Fetch(r) => &r.error,
            Response::ChooseFile(r) => &r.error,
            Response::OutlookGpoConfigs(r) => &r.error,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Direct mode prints the useful part only: file contents, the chosen
    /// path, or the policy document as single-line JSON.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        Ok(match self {
            Response::Fetch(r) => r.contents.clone(),
            Response::ChooseFile(r) => r.path.clone(),
            Response::OutlookGpoConfigs(r) => serde_json::to_string(r)?,
        })
    }
}
