//! The closed catalog of queued and read-only configset operations.
//!
//! Uploads are not part of the catalog: they write to the store directly and
//! are routed by the dispatcher before catalog lookup.

use crate::action::ConfigSetAction;
use crate::errors::{ConfigSetError, Result};
use crate::params::{BASE_CONFIGSET, NAME, PROPERTY_PREFIX, Params};
use crate::store::ConfigStore;
use crate::trust::config_set_is_trusted;
use crate::types::{OperationIntent, Reply};
use serde_json::Value;

/// Base used by CREATE when the request names none.
pub const DEFAULT_CONFIGSET: &str = "_default";

pub const IMMUTABLE: &str = "immutable";

pub const CONFIG_SETS: &str = "configSets";

/// What an operation produced.
#[derive(Clone, Debug, PartialEq)]
pub enum OperationOutput {
    /// A mutation to be applied by a queue worker.
    Enqueue(OperationIntent),
    /// An answer computed locally.
    Respond(Reply),
}

/// Everything an operation may consult while building its output.
pub struct OperationContext<'a> {
    pub params: &'a Params,
    pub store: &'a dyn ConfigStore,
    pub request_trusted: bool,
    pub disable_create_auth_checks: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
    List,
}

impl Operation {
    /// `None` for actions that bypass the catalog.
    pub fn for_action(action: ConfigSetAction) -> Option<Self> {
        match action {
            ConfigSetAction::Create => Some(Operation::Create),
            ConfigSetAction::Delete => Some(Operation::Delete),
            ConfigSetAction::List => Some(Operation::List),
            ConfigSetAction::Upload => None,
        }
    }

    pub async fn call(&self, ctx: &OperationContext<'_>) -> Result<OperationOutput> {
        match self {
            Operation::Create => create(ctx).await.map(OperationOutput::Enqueue),
            Operation::Delete => delete(ctx).map(OperationOutput::Enqueue),
            Operation::List => list(ctx).await.map(OperationOutput::Respond),
        }
    }
}

async fn create(ctx: &OperationContext<'_>) -> Result<OperationIntent> {
    let params = ctx.params;
    let base = params.get_or(BASE_CONFIGSET, DEFAULT_CONFIGSET);
    let name = params
        .get(NAME)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ConfigSetError::bad_request("ConfigSet name not specified"))?;

    if ctx.store.exists(name).await? {
        return Err(ConfigSetError::bad_request(format!(
            "ConfigSet already exists: {name}"
        )));
    }

    if !ctx.store.exists(base).await? {
        return Err(ConfigSetError::bad_request(format!(
            "Base ConfigSet does not exist: {base}"
        )));
    }

    if !ctx.disable_create_auth_checks && !ctx.request_trusted {
        let base_metadata = ctx.store.get_metadata(base).await?;
        if config_set_is_trusted(base_metadata.as_ref()) {
            return Err(ConfigSetError::Unauthorized(format!(
                "Can't create a configset with an unauthenticated request from a trusted {BASE_CONFIGSET}"
            )));
        }
    }

    let prefix = format!("{PROPERTY_PREFIX}.");
    let intent = params
        .iter()
        .filter(|(key, _)| key.starts_with(&prefix))
        .fold(
            OperationIntent::new()
                .with(NAME, name)
                .with(BASE_CONFIGSET, base),
            |intent, (key, value)| intent.with_if_absent(key, value),
        );

    Ok(intent.with(IMMUTABLE, "false"))
}

fn delete(ctx: &OperationContext<'_>) -> Result<OperationIntent> {
    let name = ctx.params.required(NAME)?;
    Ok(OperationIntent::new().with(NAME, name))
}

async fn list(ctx: &OperationContext<'_>) -> Result<Reply> {
    let mut names = ctx.store.list_config_sets().await?;
    names.sort();

    let mut reply = Reply::new();
    reply.insert(
        CONFIG_SETS.to_string(),
        Value::Array(names.into_iter().map(Value::String).collect()),
    );
    Ok(reply)
}
