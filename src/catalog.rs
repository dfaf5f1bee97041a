//! Operation catalog: tool rules and argument handling
//!
//! Every MCP tool is one row in [`TOOL_RULES`]: target operation key,
//! verb, declared arguments, and the body/query/path construction for
//! that operation. Adding a tool means inserting a row, not a branch.

use std::collections::HashMap;

use serde_json::{Map, Value, json};

use crate::dispatch::Verb;
use crate::protocol::Tool;
use crate::{Error, Result};

/// JSON argument types accepted from the framing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// JSON string
    String,
    /// JSON integer
    Integer,
    /// Any JSON number
    Number,
    /// JSON boolean
    Boolean,
}

impl ArgKind {
    /// JSON Schema type name
    #[must_use]
    pub fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// Default value for an optional argument, surfaced in the schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgDefault {
    /// Integer default
    Int(i64),
    /// String default
    Str(&'static str),
}

impl ArgDefault {
    fn to_value(self) -> Value {
        match self {
            Self::Int(n) => json!(n),
            Self::Str(s) => json!(s),
        }
    }
}

/// One declared argument of a tool
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    /// Argument name as the client sends it
    pub name: &'static str,
    /// Expected JSON type
    pub kind: ArgKind,
    /// Whether absence is an `InvalidArgument` failure
    pub required: bool,
    /// Schema description ("" to omit)
    pub description: &'static str,
    /// Schema default ([`None`] to omit)
    pub default: Option<ArgDefault>,
}

/// Required argument, no default
const fn req(name: &'static str, kind: ArgKind, description: &'static str) -> ArgSpec {
    ArgSpec {
        name,
        kind,
        required: true,
        description,
        default: None,
    }
}

/// Optional argument with an optional schema default
const fn opt(
    name: &'static str,
    kind: ArgKind,
    description: &'static str,
    default: Option<ArgDefault>,
) -> ArgSpec {
    ArgSpec {
        name,
        kind,
        required: false,
        description,
        default,
    }
}

/// Validated argument mapping, keyed by declared argument names
///
/// Construction via [`ToolRule::validate`] guarantees every required
/// argument is present with the declared type, so builder functions can
/// use the typed accessors without re-checking.
#[derive(Debug, Clone, Default)]
pub struct ArgMap(Map<String, Value>);

impl ArgMap {
    fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Required string argument
    pub fn str(&self, name: &str) -> Result<&str> {
        self.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidArgument(format!("missing required argument '{name}'")))
    }

    /// Optional string argument
    #[must_use]
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Required numeric argument
    pub fn f64(&self, name: &str) -> Result<f64> {
        self.get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::InvalidArgument(format!("missing required argument '{name}'")))
    }

    /// Optional integer argument
    #[must_use]
    pub fn opt_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Optional integer with a fallback
    #[must_use]
    pub fn i64_or(&self, name: &str, default: i64) -> i64 {
        self.opt_i64(name).unwrap_or(default)
    }

    /// Optional string with a fallback
    #[must_use]
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.opt_str(name).unwrap_or(default)
    }
}

/// Body construction function: validated arguments to JSON body
pub type BodyFn = fn(&ArgMap) -> Result<Value>;

/// Declarative mapping of `(wire name, argument name)` pairs
pub type NameMap = &'static [(&'static str, &'static str)];

/// One tool's invocation rule
pub struct ToolRule {
    /// External tool name
    pub name: &'static str,
    /// Human-readable description for `tools/list`
    pub description: &'static str,
    /// Endpoint registry key this tool targets
    pub operation: &'static str,
    /// HTTP verb
    pub verb: Verb,
    /// Declared argument schema
    pub args: &'static [ArgSpec],
    /// JSON body builder (POST operations)
    pub body: Option<BodyFn>,
    /// Query parameters: `(query key, argument name)`, pair omitted when
    /// the argument is absent
    pub query: NameMap,
    /// Path placeholders: `(placeholder, argument name)`
    pub path_params: NameMap,
}

impl ToolRule {
    /// Validate a raw argument value against the declared schema
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when a required argument is missing or any
    /// supplied argument has the wrong JSON type. Undeclared keys are
    /// ignored; the rule only pays attention to the names it declares.
    pub fn validate(&self, raw: &Value) -> Result<ArgMap> {
        let empty = Map::new();
        let object = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(Error::InvalidArgument(
                    "arguments must be a JSON object".to_string(),
                ));
            }
        };

        let mut validated = Map::new();
        for spec in self.args {
            match object.get(spec.name) {
                Some(value) => {
                    if !spec.kind.matches(value) {
                        return Err(Error::InvalidArgument(format!(
                            "argument '{}' must be a {}",
                            spec.name,
                            spec.kind.json_type()
                        )));
                    }
                    validated.insert(spec.name.to_string(), value.clone());
                }
                None if spec.required => {
                    return Err(Error::InvalidArgument(format!(
                        "missing required argument '{}'",
                        spec.name
                    )));
                }
                None => {}
            }
        }

        Ok(ArgMap(validated))
    }

    /// Query parameters for this call; absent optional arguments are
    /// omitted entirely, never sent as empty placeholders
    #[must_use]
    pub fn build_query(&self, args: &ArgMap) -> Vec<(String, String)> {
        self.query
            .iter()
            .filter_map(|&(key, arg)| {
                args.get(arg)
                    .map(|value| (key.to_string(), scalar_to_string(value)))
            })
            .collect()
    }

    /// Path placeholder values for this call
    #[must_use]
    pub fn build_path_params(&self, args: &ArgMap) -> HashMap<String, String> {
        self.path_params
            .iter()
            .filter_map(|&(placeholder, arg)| {
                args.get(arg)
                    .map(|value| (placeholder.to_string(), scalar_to_string(value)))
            })
            .collect()
    }

    /// JSON Schema for the declared arguments
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in self.args {
            let mut property = Map::new();
            property.insert("type".to_string(), json!(spec.kind.json_type()));
            if !spec.description.is_empty() {
                property.insert("description".to_string(), json!(spec.description));
            }
            if let Some(default) = spec.default {
                property.insert("default".to_string(), default.to_value());
            }
            properties.insert(spec.name.to_string(), Value::Object(property));
            if spec.required {
                required.push(json!(spec.name));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }

    /// MCP tool descriptor for `tools/list`
    #[must_use]
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            description: Some(self.description.to_string()),
            input_schema: self.input_schema(),
        }
    }
}

/// Render a validated scalar argument for a query or path slot
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

// ── body builders ────────────────────────────────────────────────────────────

/// `{"device": {"phoneNumber": ...}}` — the shape shared by the
/// reachability, roaming, and number-verification retrieve calls
fn device_body(args: &ArgMap) -> Result<Value> {
    Ok(json!({"device": {"phoneNumber": args.str("phone_number")?}}))
}

fn reachability_subscription_body(args: &ArgMap) -> Result<Value> {
    Ok(json!({
        "sink": args.str("webhook_url")?,
        "protocol": "HTTP",
        "types": ["org.camaraproject.device-reachability-status-subscriptions.v0.reachability-data"],
        "config": {
            "subscriptionDetail": {"device": {"phoneNumber": args.str("phone_number")?}},
            "subscriptionMaxEvents": args.i64_or("max_events", 10),
            "initialEvent": true,
        },
    }))
}

fn roaming_subscription_body(args: &ArgMap) -> Result<Value> {
    Ok(json!({
        "sink": args.str("webhook_url")?,
        "protocol": "HTTP",
        "types": ["org.camaraproject.device-roaming-status-subscriptions.v0.roaming-status"],
        "config": {
            "subscriptionDetail": {"device": {"phoneNumber": args.str("phone_number")?}},
            "subscriptionMaxEvents": 10,
        },
    }))
}

fn location_verification_body(args: &ArgMap) -> Result<Value> {
    Ok(json!({
        "device": {"phoneNumber": args.str("phone_number")?},
        "area": {
            "areaType": "CIRCLE",
            "center": {
                "latitude": args.f64("latitude")?,
                "longitude": args.f64("longitude")?,
            },
            "radius": args.i64_or("radius", 5000),
        },
        "maxAge": 120,
    }))
}

fn location_retrieval_body(args: &ArgMap) -> Result<Value> {
    Ok(json!({
        "device": {"phoneNumber": args.str("phone_number")?},
        "maxAge": 0,
    }))
}

fn geofencing_subscription_body(args: &ArgMap) -> Result<Value> {
    Ok(json!({
        "protocol": "HTTP",
        "sink": args.str("webhook")?,
        "types": ["org.camaraproject.geofencing-subscriptions.v0.area-entered"],
        "config": {
            "subscriptionDetail": {
                "device": {"phoneNumber": args.str("phone_number")?},
                "area": {
                    "areaType": "CIRCLE",
                    "center": {
                        "latitude": args.f64("latitude")?,
                        "longitude": args.f64("longitude")?,
                    },
                    "radius": args.i64_or("radius", 2000),
                },
            },
            "initialEvent": true,
            "subscriptionMaxEvents": 10,
        },
    }))
}

fn otp_send_body(args: &ArgMap) -> Result<Value> {
    Ok(json!({
        "phoneNumber": args.str("phone_number")?,
        "message": args.str_or("message", "{{code}} is your code"),
    }))
}

fn otp_validate_body(args: &ArgMap) -> Result<Value> {
    Ok(json!({
        "phoneNumber": args.str("phone_number")?,
        "authCode": args.str("auth_code")?,
    }))
}

fn qos_session_body(args: &ArgMap) -> Result<Value> {
    Ok(json!({
        "device": {"phoneNumber": args.str("phone_number")?},
        "applicationServer": {"ipv4Address": args.str("app_server_ip")?},
        "qosProfile": args.str("qos_profile")?,
        "duration": args.i64_or("duration", 3600),
    }))
}

/// `{"phoneNumber": ...}` with `maxAge` only when supplied — shared by
/// the SIM-swap and device-swap check calls
fn swap_check_body(args: &ArgMap) -> Result<Value> {
    let mut body = json!({"phoneNumber": args.str("phone_number")?});
    if let Some(max_age) = args.opt_i64("max_age") {
        body["maxAge"] = json!(max_age);
    }
    Ok(body)
}

fn phone_number_body(args: &ArgMap) -> Result<Value> {
    Ok(json!({"phoneNumber": args.str("phone_number")?}))
}

// ── the rule table ───────────────────────────────────────────────────────────

const PHONE: ArgSpec = req(
    "phone_number",
    ArgKind::String,
    "Phone number in E.164 format (+33612345678)",
);

/// All 18 tool rules, one row per MCP tool
pub static TOOL_RULES: &[ToolRule] = &[
    ToolRule {
        name: "device_reachability_status",
        description: "Check if device is reachable via SMS/Data connectivity",
        operation: "device_reachability_retrieve",
        verb: Verb::Post,
        args: &[PHONE],
        body: Some(device_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "create_reachability_subscription",
        description: "Create subscription for device reachability status changes",
        operation: "device_reachability_subs_create",
        verb: Verb::Post,
        args: &[
            PHONE,
            req("webhook_url", ArgKind::String, "Webhook URL for notifications"),
            opt("max_events", ArgKind::Integer, "", Some(ArgDefault::Int(10))),
        ],
        body: Some(reachability_subscription_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "device_roaming_status",
        description: "Check if device is currently roaming",
        operation: "device_roaming_retrieve",
        verb: Verb::Post,
        args: &[PHONE],
        body: Some(device_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "create_roaming_subscription",
        description: "Create subscription for roaming status changes",
        operation: "device_roaming_subs_create",
        verb: Verb::Post,
        args: &[PHONE, req("webhook_url", ArgKind::String, "")],
        body: Some(roaming_subscription_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "location_verification",
        description: "Verify if device is within a geographic area (geofencing)",
        operation: "location_verification",
        verb: Verb::Post,
        args: &[
            PHONE,
            req("latitude", ArgKind::Number, ""),
            req("longitude", ArgKind::Number, ""),
            opt("radius", ArgKind::Integer, "Radius in meters", Some(ArgDefault::Int(5000))),
        ],
        body: Some(location_verification_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "location_retrieval",
        description: "Get device current coordinates",
        operation: "location_retrieval",
        verb: Verb::Post,
        args: &[PHONE],
        body: Some(location_retrieval_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "create_geofencing_subscription",
        description: "Create subscription for geofencing area entry/exit",
        operation: "geofencing_subs_create",
        verb: Verb::Post,
        args: &[
            PHONE,
            req("latitude", ArgKind::Number, ""),
            req("longitude", ArgKind::Number, ""),
            opt("radius", ArgKind::Integer, "", Some(ArgDefault::Int(2000))),
            req("webhook", ArgKind::String, ""),
        ],
        body: Some(geofencing_subscription_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "number_verification",
        description: "Verify if phone number matches the device",
        operation: "number_verification_verify",
        verb: Verb::Post,
        args: &[PHONE],
        body: Some(device_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "send_otp",
        description: "Send One-Time Password via SMS",
        operation: "otp_send",
        verb: Verb::Post,
        args: &[
            PHONE,
            opt(
                "message",
                ArgKind::String,
                "",
                Some(ArgDefault::Str("{{code}} is your code")),
            ),
        ],
        body: Some(otp_send_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "validate_otp",
        description: "Validate OTP code",
        operation: "otp_validate",
        verb: Verb::Post,
        args: &[PHONE, req("auth_code", ArgKind::String, "")],
        body: Some(otp_validate_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "list_qos_profiles",
        description: "List available Quality of Service profiles",
        operation: "qos_profiles_list",
        verb: Verb::Get,
        args: &[opt("profile_name", ArgKind::String, "Optional filter", None)],
        body: None,
        query: &[("name", "profile_name")],
        path_params: &[],
    },
    ToolRule {
        name: "get_qos_profile",
        description: "Get QoS profile details",
        operation: "qos_profiles_detail",
        verb: Verb::Get,
        args: &[req("profile_name", ArgKind::String, "")],
        body: None,
        query: &[],
        path_params: &[("name", "profile_name")],
    },
    ToolRule {
        name: "create_qos_session",
        description: "Create Quality on Demand session",
        operation: "qod_sessions_create",
        verb: Verb::Post,
        args: &[
            PHONE,
            req("app_server_ip", ArgKind::String, ""),
            req("qos_profile", ArgKind::String, ""),
            opt("duration", ArgKind::Integer, "", Some(ArgDefault::Int(3600))),
        ],
        body: Some(qos_session_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "get_qos_session",
        description: "Get QoS session details",
        operation: "qod_sessions_get",
        verb: Verb::Get,
        args: &[req("session_id", ArgKind::String, "")],
        body: None,
        query: &[],
        path_params: &[("id", "session_id")],
    },
    ToolRule {
        name: "delete_qos_session",
        description: "Delete QoS session",
        operation: "qod_sessions_delete",
        verb: Verb::Delete,
        args: &[req("session_id", ArgKind::String, "")],
        body: None,
        query: &[],
        path_params: &[("id", "session_id")],
    },
    ToolRule {
        name: "sim_swap_check",
        description: "Check if SIM was swapped recently (fraud detection)",
        operation: "sim_swap_check",
        verb: Verb::Post,
        args: &[PHONE, opt("max_age", ArgKind::Integer, "Hours", None)],
        body: Some(swap_check_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "sim_swap_retrieve_date",
        description: "Get last SIM swap date",
        operation: "sim_swap_date",
        verb: Verb::Post,
        args: &[PHONE],
        body: Some(phone_number_body),
        query: &[],
        path_params: &[],
    },
    ToolRule {
        name: "device_swap_check",
        description: "Check if device was swapped recently",
        operation: "device_swap_check",
        verb: Verb::Post,
        args: &[PHONE, opt("max_age", ArgKind::Integer, "", None)],
        body: Some(swap_check_body),
        query: &[],
        path_params: &[],
    },
];

/// Lookup over the static rule table
pub struct Catalog {
    by_name: HashMap<&'static str, &'static ToolRule>,
}

impl Catalog {
    /// Index the built-in rule table
    #[must_use]
    pub fn new() -> Self {
        let by_name = TOOL_RULES.iter().map(|rule| (rule.name, rule)).collect();
        Self { by_name }
    }

    /// Find the rule for an external tool name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static ToolRule> {
        self.by_name.get(name).copied()
    }

    /// Tool descriptors in declaration order, for `tools/list`
    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        TOOL_RULES.iter().map(ToolRule::to_tool).collect()
    }

    /// Number of declared tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True when no tools are declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_declares_all_tools() {
        let catalog = Catalog::new();
        assert_eq!(catalog.len(), 18);
        assert!(catalog.get("device_reachability_status").is_some());
        assert!(catalog.get("no_such_tool").is_none());
    }

    #[test]
    fn validate_rejects_missing_required_argument() {
        let rule = Catalog::new().get("create_qos_session").unwrap();
        let err = rule.validate(&json!({})).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("phone_number"));
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let rule = Catalog::new().get("location_verification").unwrap();
        let err = rule
            .validate(&json!({
                "phone_number": "+33612345678",
                "latitude": "not-a-number",
                "longitude": 2.35,
            }))
            .unwrap_err();
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn validate_ignores_undeclared_keys() {
        let rule = Catalog::new().get("device_reachability_status").unwrap();
        let args = rule
            .validate(&json!({"phone_number": "+33612345678", "extra": true}))
            .unwrap();
        assert_eq!(args.str("phone_number").unwrap(), "+33612345678");
        assert!(args.get("extra").is_none());
    }

    #[test]
    fn device_body_shape() {
        let rule = Catalog::new().get("device_reachability_status").unwrap();
        let args = rule.validate(&json!({"phone_number": "+33612345678"})).unwrap();
        let body = (rule.body.unwrap())(&args).unwrap();
        assert_eq!(body, json!({"device": {"phoneNumber": "+33612345678"}}));
    }

    #[test]
    fn subscription_body_applies_defaults() {
        let rule = Catalog::new().get("create_reachability_subscription").unwrap();
        let args = rule
            .validate(&json!({
                "phone_number": "+33612345678",
                "webhook_url": "https://hooks.example/cb",
            }))
            .unwrap();
        let body = (rule.body.unwrap())(&args).unwrap();
        assert_eq!(body["sink"], "https://hooks.example/cb");
        assert_eq!(body["config"]["subscriptionMaxEvents"], 10);
        assert_eq!(body["config"]["initialEvent"], true);
    }

    #[test]
    fn swap_check_omits_absent_max_age() {
        let rule = Catalog::new().get("sim_swap_check").unwrap();
        let args = rule.validate(&json!({"phone_number": "+33612345678"})).unwrap();
        let body = (rule.body.unwrap())(&args).unwrap();
        assert!(body.get("maxAge").is_none());

        let args = rule
            .validate(&json!({"phone_number": "+33612345678", "max_age": 48}))
            .unwrap();
        let body = (rule.body.unwrap())(&args).unwrap();
        assert_eq!(body["maxAge"], 48);
    }

    #[test]
    fn query_pairs_are_omitted_when_argument_absent() {
        let rule = Catalog::new().get("list_qos_profiles").unwrap();
        let args = rule.validate(&json!({})).unwrap();
        assert!(rule.build_query(&args).is_empty());

        let args = rule.validate(&json!({"profile_name": "gold"})).unwrap();
        assert_eq!(
            rule.build_query(&args),
            vec![("name".to_string(), "gold".to_string())]
        );
    }

    #[test]
    fn path_params_map_declared_arguments() {
        let rule = Catalog::new().get("delete_qos_session").unwrap();
        let args = rule.validate(&json!({"session_id": "abc-123"})).unwrap();
        let params = rule.build_path_params(&args);
        assert_eq!(params.get("id").map(String::as_str), Some("abc-123"));
    }

    #[test]
    fn input_schema_lists_required_and_defaults() {
        let rule = Catalog::new().get("create_qos_session").unwrap();
        let schema = rule.input_schema();
        assert_eq!(schema["type"], "object");
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required, vec!["phone_number", "app_server_ip", "qos_profile"]);
        assert_eq!(schema["properties"]["duration"]["default"], 3600);
    }

    #[test]
    fn tools_list_is_complete_and_ordered() {
        let tools = Catalog::new().tools();
        assert_eq!(tools.len(), 18);
        assert_eq!(tools[0].name, "device_reachability_status");
        assert_eq!(tools[17].name, "device_swap_check");
    }
}
