/*!
Command dispatch.

`dispatch()` routes a recognised command to its handler with the platform
capabilities it needs. Unrecognised names never get here: the front-end
echoes those back untouched.
*/

use super::choose_file::execute_choose_file;
use super::fetch::execute_fetch;
use super::gpo::execute_outlook_gpo_configs;
use super::request::{Command, CommandParams};
use super::shared::Response;
use crate::path::{Environment, ParentDirLocator, PathResolver};
use crate::platform::{FileChooser, PolicyStore};
use crate::utils::LogContext;

/// Platform services injected by the front-end.
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    pub locator: &'a dyn ParentDirLocator,
    pub env: &'a dyn Environment,
    pub chooser: &'a dyn FileChooser,
    pub policy: &'a dyn PolicyStore,
}

pub fn dispatch(
    command: Command,
    params: &CommandParams,
    caps: &Capabilities<'_>,
    log: &LogContext,
) -> Response {
    match command {
        Command::Fetch => {
            let resolver = PathResolver::new(caps.locator, caps.env);
            Response::Fetch(execute_fetch(&params.path, &resolver, log))
        }
        Command::ChooseFile => Response::ChooseFile(execute_choose_file(params, caps.chooser, log)),
        Command::OutlookGpoConfigs => {
            Response::OutlookGpoConfigs(execute_outlook_gpo_configs(caps.policy, log))
        }
    }
}
