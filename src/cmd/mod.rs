/*!
Command layer: request model, handlers, and dispatch.

Layout:
  src/cmd/
    mod.rs          (this file)
    request.rs      (Request, CommandParams, Command + CLI param loading)
    fetch.rs        (fetch)
    choose_file.rs  (choose-file)
    gpo.rs          (outlook-gpo-configs)
    shared.rs       (Response, common to every handler)
    dispatch.rs     (Capabilities + dispatch)

Conventions:
  - Each command module exposes one public `execute_*` function returning
    its response struct. Failures are reported in the response's `error`
    field, never as a Rust error.
  - Platform services arrive as trait objects so handlers stay testable.
*/

pub mod choose_file;
pub mod dispatch;
pub mod fetch;
pub mod gpo;
pub mod request;
pub mod shared;

pub use dispatch::{Capabilities, dispatch};
pub use request::{Command, CommandParams, Request, params_from_cli};
pub use shared::Response;
