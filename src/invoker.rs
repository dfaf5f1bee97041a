//! Tool invocation pipeline
//!
//! One linear pass per call: validate arguments, resolve the path,
//! dispatch, normalize. Every taxonomy error is recovered here and
//! returned as a failure payload; nothing propagates to the transport
//! as a fault.

use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::dispatch::{Dispatcher, RequestDescriptor};
use crate::normalize::{NormalizedResult, normalize};
use crate::protocol::Tool;
use crate::registry::{ApiVersion, EndpointRegistry, placeholders, resolve_path};
use crate::{Error, Result};

/// Executes tool calls against the upstream CAMARA platform
pub struct Invoker {
    catalog: Catalog,
    registry: EndpointRegistry,
    dispatcher: Dispatcher,
    version: ApiVersion,
}

impl Invoker {
    /// Wire the pipeline together; fails if any catalog rule targets an
    /// operation the registry cannot serve under every version
    pub fn new(
        catalog: Catalog,
        registry: EndpointRegistry,
        dispatcher: Dispatcher,
        version: ApiVersion,
    ) -> Result<Self> {
        validate_coverage(&catalog, &registry)?;
        Ok(Self {
            catalog,
            registry,
            dispatcher,
            version,
        })
    }

    /// Tool descriptors for `tools/list`
    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.catalog.tools()
    }

    /// Execute one tool call and return its normalized result
    pub async fn invoke(&self, tool: &str, arguments: &Value) -> NormalizedResult {
        info!(tool = %tool, "Tool call");

        let Some(rule) = self.catalog.get(tool) else {
            return NormalizedResult::from_error(Error::UnknownOperation(tool.to_string()), tool);
        };

        let result = match self.run(rule, arguments).await {
            Ok(result) => result,
            Err(err) => NormalizedResult::from_error(err, rule.operation),
        };

        if let NormalizedResult::Failure {
            classification,
            http_status,
            ..
        } = &result
        {
            warn!(
                tool = %tool,
                operation = %rule.operation,
                classification = %classification,
                http_status = ?http_status,
                "Tool call failed"
            );
        }

        result
    }

    async fn run(
        &self,
        rule: &'static crate::catalog::ToolRule,
        arguments: &Value,
    ) -> Result<NormalizedResult> {
        let args = rule.validate(arguments)?;
        let template = self.registry.lookup(rule.operation, self.version)?;
        let path = resolve_path(template, &rule.build_path_params(&args))?;

        let body = match rule.body {
            Some(build) => Some(build(&args)?),
            None => None,
        };

        let descriptor = RequestDescriptor {
            verb: rule.verb,
            path,
            body,
            query: rule.build_query(&args),
        };

        let raw = self.dispatcher.send(&descriptor).await;
        Ok(normalize(raw, rule.operation))
    }
}

/// Startup check: every rule's operation resolves under both version
/// tags, and every placeholder in those templates is one the rule can
/// supply. Catches table/rule drift before the first request does.
pub fn validate_coverage(catalog: &Catalog, registry: &EndpointRegistry) -> Result<()> {
    for rule in crate::catalog::TOOL_RULES {
        if catalog.get(rule.name).is_none() {
            return Err(Error::Config(format!(
                "Tool '{}' missing from catalog index",
                rule.name
            )));
        }
        for version in ApiVersion::ALL {
            let template = registry.lookup(rule.operation, version)?;
            for placeholder in placeholders(template)? {
                let supplied = rule
                    .path_params
                    .iter()
                    .any(|&(name, _)| name == placeholder);
                if !supplied {
                    return Err(Error::Config(format!(
                        "Tool '{}' cannot supply placeholder '{{{placeholder}}}' of '{}' ({version})",
                        rule.name, rule.operation
                    )));
                }
            }
        }
    }
    Ok(())
}
