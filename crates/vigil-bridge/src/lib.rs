mod cleanup;
mod dispatch;
mod gates;
mod guard;
mod inject;
mod payload;

pub use dispatch::{hook_entrypoint, hook_entrypoint_in, Role};
pub use payload::{HookPayload, HookResult};
