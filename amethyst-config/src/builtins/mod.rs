//! The `core` module: directives, blocks and events every session starts with

mod access;
mod blocks;
mod directives;
mod env;
mod include;
mod load_module;

use crate::events::CONNECTION;
use crate::module::{BlockDef, DirectiveDef, EventDef, Module};
use amethyst_core::CORE_MODULE;

/// Dispatch priority of the built-in `connection` handler
pub const CONNECTION_PRIORITY: i32 = 0x80;

pub(crate) struct CoreModule;

impl Module for CoreModule {
    fn name(&self) -> Option<&str> {
        Some(CORE_MODULE)
    }

    fn directives(&self) -> Vec<DirectiveDef> {
        vec![
            DirectiveDef::checked("PidFile", directives::pid_file),
            DirectiveDef::checked("Timeout", directives::timeout),
            DirectiveDef::checked("User", directives::user),
            DirectiveDef::checked("Group", directives::group),
            DirectiveDef::checked("ErrorLog", directives::error_log),
            DirectiveDef::checked("Listen", directives::listen),
            DirectiveDef::new("Include", include::include).global(),
            DirectiveDef::checked("Require", access::require),
            DirectiveDef::checked("ErrorDocument", directives::error_document),
            DirectiveDef::checked("ServerTokens", directives::server_tokens),
            DirectiveDef::checked("Header", directives::header),
            DirectiveDef::checked("RemoteHostMode", directives::remote_host_mode),
            DirectiveDef::checked("AccessLogFormat", directives::access_log_format),
            DirectiveDef::checked("TimeFormat", directives::time_format),
            DirectiveDef::checked("TimeZone", directives::time_zone),
            DirectiveDef::new("SetEnv", env::set_env),
            DirectiveDef::new("UnsetEnv", env::unset_env),
            DirectiveDef::new("LoadModule", load_module::load_module).global(),
        ]
    }

    fn blocks(&self) -> Vec<BlockDef> {
        vec![
            BlockDef::new("Endpoint", blocks::endpoint),
            BlockDef::new("IfEnvEq", blocks::if_env_eq),
            BlockDef::new("IfEnvNeq", blocks::if_env_neq),
            BlockDef::new("IfEnv", blocks::if_env),
            BlockDef::new("IfNotEnv", blocks::if_not_env),
            BlockDef::new("IfModule", blocks::if_module),
        ]
    }

    fn events(&self) -> Vec<EventDef> {
        vec![EventDef::new(CONNECTION, access::connection_gate)]
    }
}
