//! Startup configuration resolution.
//!
//! Resolves the process configuration from exactly one of three mutually
//! exclusive sources, selected from two environment inputs:
//! 1. **Discovery service** — `CONFIG_URL` set: poll the remote config
//!    service with a bounded retry budget.
//! 2. **Environment** — `PORT` set without `CONFIG_URL`: build the
//!    configuration from environment variables, unvalidated.
//! 3. **File** — neither set: load a local YAML document.
//!
//! The result is published once through [`ConfigHandle`]; reads before
//! resolution completes fail rather than yield partial values.

mod discovery;
mod resolver;
mod types;

pub use discovery::{DISCOVERY_PATH, RetryPolicy, SETTINGS_LIST_REL};
pub use resolver::{
    CONFIG_URL_VAR, CONNECTION_STRING_VAR, ConfigHandle, PORT_VAR, ResolutionSource, Resolver,
    select_source,
};
pub use types::{AuthSettings, Configuration, FileSettings, has_hostname_segment};
