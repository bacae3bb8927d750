//! Input schemas and argument validation.
//!
//! An [`InputSchema`] is the machine-checkable contract an action declares for
//! its arguments. [`InputSchema::validate`] is the single point where untrusted
//! planner output becomes normalized JSON that a handler may deserialize:
//!
//! ```text
//! raw args ──▶ defaults ──▶ coercion ──▶ type check ──▶ refinements ──▶ normalized args
//!                                              │               │
//!                                              └──── issues ───┘
//! ```
//!
//! Validation is pure: it never touches the handler and never fails fast.
//! Every violated rule contributes one [`ValidationIssue`] carrying the field
//! path, so a planner can repair all mistakes in a single retry.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::LazyLock;

static EVM_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("EVM address pattern is a valid regex")
});

/// JSON type a field must have after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }

    /// Coerce a raw value into this type, or `None` if it cannot be.
    ///
    /// Numeric strings become numbers, `"true"`/`"false"` become booleans.
    /// Nothing is ever coerced into a string.
    fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (FieldType::String, Value::String(_))
            | (FieldType::Boolean, Value::Bool(_))
            | (FieldType::Object, Value::Object(_))
            | (FieldType::Array, Value::Array(_))
            | (FieldType::Number, Value::Number(_)) => Some(value.clone()),
            (FieldType::Number, Value::String(s)) => parse_number(s),
            (FieldType::Integer, Value::Number(n)) => integer_from_number(n),
            (FieldType::Integer, Value::String(s)) => {
                s.trim().parse::<i64>().ok().map(Value::from)
            }
            (FieldType::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f = s.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Number::from_f64(f).map(Value::Number)
}

fn integer_from_number(n: &Number) -> Option<Value> {
    if n.is_i64() || n.is_u64() {
        return Some(Value::Number(n.clone()));
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        None
    }
}

/// `0x` followed by 40 hex digits.
pub fn is_evm_address(s: &str) -> bool {
    EVM_ADDRESS.is_match(s)
}

/// Decimal literal strictly greater than zero (`"1"`, `"0.25"`).
///
/// Signs, exponents and bare dots are rejected.
pub fn is_positive_decimal(s: &str) -> bool {
    let (int, frac) = match s.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (s, None),
    };
    if int.is_empty() || !int.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if let Some(frac) = frac
        && (frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()))
    {
        return false;
    }
    s.bytes().any(|b| matches!(b, b'1'..=b'9'))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A rule a value must satisfy after it has the right type.
///
/// Refinements that do not apply to a value's type are ignored, so a
/// `MinLength` on a number field never fires.
#[derive(Debug, Clone)]
pub enum Refinement {
    /// String must match the regex.
    Pattern { regex: Regex, message: String },
    MinLength(usize),
    MaxLength(usize),
    /// Number must be `>=` the bound.
    Min(f64),
    /// Number must be `<=` the bound.
    Max(f64),
    /// Number must be `> 0`.
    Positive,
    /// String must be a decimal literal `> 0` (amounts are carried as strings).
    PositiveDecimal,
    OneOf(Vec<String>),
    MinItems(usize),
    MaxItems(usize),
}

impl Refinement {
    /// Build a pattern refinement, failing on an invalid regex.
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Refinement::Pattern {
            regex: Regex::new(pattern)?,
            message: message.into(),
        })
    }

    /// `0x`-prefixed 20-byte hex address.
    pub fn evm_address() -> Self {
        Refinement::Pattern {
            regex: EVM_ADDRESS.clone(),
            message: "Invalid EVM address".to_string(),
        }
    }

    pub fn one_of(options: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Refinement::OneOf(options.into_iter().map(Into::into).collect())
    }

    /// Check the value, returning the violation message if the rule fails.
    pub fn check(&self, value: &Value) -> Option<String> {
        match (self, value) {
            (Refinement::Pattern { regex, message }, Value::String(s)) => {
                (!regex.is_match(s)).then(|| message.clone())
            }
            (Refinement::MinLength(min), Value::String(s)) => (s.chars().count() < *min)
                .then(|| format!("Must contain at least {} character(s)", min)),
            (Refinement::MaxLength(max), Value::String(s)) => (s.chars().count() > *max)
                .then(|| format!("Must contain at most {} character(s)", max)),
            (Refinement::Min(min), Value::Number(n)) => n
                .as_f64()
                .filter(|v| v < min)
                .map(|_| format!("Must be greater than or equal to {}", min)),
            (Refinement::Max(max), Value::Number(n)) => n
                .as_f64()
                .filter(|v| v > max)
                .map(|_| format!("Must be less than or equal to {}", max)),
            (Refinement::Positive, Value::Number(n)) => n
                .as_f64()
                .filter(|v| *v <= 0.0)
                .map(|_| "Must be greater than 0".to_string()),
            (Refinement::PositiveDecimal, Value::String(s)) => (!is_positive_decimal(s))
                .then(|| "Must be a positive decimal number".to_string()),
            (Refinement::OneOf(options), Value::String(s)) => (!options.iter().any(|o| o == s))
                .then(|| format!("Must be one of: {}", options.join(", "))),
            (Refinement::MinItems(min), Value::Array(items)) => (items.len() < *min)
                .then(|| format!("Must contain at least {} item(s)", min)),
            (Refinement::MaxItems(max), Value::Array(items)) => (items.len() > *max)
                .then(|| format!("Must contain at most {} item(s)", max)),
            _ => None,
        }
    }
}

/// One field of an [`InputSchema`].
///
/// Fields are required unless marked [`optional`](Self::optional) or given a
/// [`default`](Self::with_default).
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub field_type: FieldType,
    pub required: bool,
    /// Substituted when the field is absent or `null`; validated like input.
    pub default: Option<Value>,
    pub refinements: Vec<Refinement>,
    /// Nested schema for `object` fields.
    pub properties: Option<InputSchema>,
    /// Element spec for `array` fields (its `name` is unused).
    pub items: Option<Box<FieldSpec>>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            field_type,
            required: true,
            default: None,
            refinements: Vec::new(),
            properties: None,
            items: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldType::String)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldType::Number)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldType::Integer)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldType::Boolean)
    }

    pub fn object(
        name: impl Into<String>,
        description: impl Into<String>,
        properties: InputSchema,
    ) -> Self {
        let mut field = Self::new(name, description, FieldType::Object);
        field.properties = Some(properties);
        field
    }

    pub fn array(name: impl Into<String>, description: impl Into<String>, items: FieldSpec) -> Self {
        let mut field = Self::new(name, description, FieldType::Array);
        field.items = Some(Box::new(items));
        field
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(default.into());
        self
    }

    pub fn with_refinement(mut self, refinement: Refinement) -> Self {
        self.refinements.push(refinement);
        self
    }

    fn check(
        &self,
        value: &Value,
        path: &[PathSegment],
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<Value> {
        let Some(coerced) = self.field_type.coerce(value) else {
            issues.push(ValidationIssue::new(
                path.to_vec(),
                format!("Expected {}, received {}", self.field_type, json_type_name(value)),
            ));
            return None;
        };

        let value = match coerced {
            Value::Object(map) => match &self.properties {
                Some(schema) => Value::Object(schema.validate_object(&map, path, issues)),
                None => Value::Object(map),
            },
            Value::Array(elements) => match &self.items {
                Some(item) => Value::Array(
                    elements
                        .iter()
                        .enumerate()
                        .filter_map(|(index, element)| {
                            let mut item_path = path.to_vec();
                            item_path.push(PathSegment::Index(index));
                            item.check(element, &item_path, issues)
                        })
                        .collect(),
                ),
                None => Value::Array(elements),
            },
            other => other,
        };

        for refinement in &self.refinements {
            if let Some(message) = refinement.check(&value) {
                issues.push(ValidationIssue::new(path.to_vec(), message));
            }
        }

        Some(value)
    }
}

/// Structural contract for an action's arguments (an object of fields).
#[derive(Debug, Clone, Default)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
    /// Reject keys the schema does not declare instead of dropping them.
    strict: bool,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Validate raw arguments, returning the normalized object.
    ///
    /// `null` is treated as an empty object so argument-less calls validate.
    pub fn validate(&self, raw: &Value) -> Result<Value, ValidationError> {
        let mut issues = Vec::new();
        let normalized = match raw {
            Value::Null => self.validate_object(&Map::new(), &[], &mut issues),
            Value::Object(map) => self.validate_object(map, &[], &mut issues),
            other => {
                issues.push(ValidationIssue::new(
                    Vec::new(),
                    format!("Expected object, received {}", json_type_name(other)),
                ));
                Map::new()
            }
        };

        if issues.is_empty() {
            Ok(Value::Object(normalized))
        } else {
            Err(ValidationError { issues })
        }
    }

    fn validate_object(
        &self,
        object: &Map<String, Value>,
        path: &[PathSegment],
        issues: &mut Vec<ValidationIssue>,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for field in &self.fields {
            let mut field_path = path.to_vec();
            field_path.push(PathSegment::Key(field.name.clone()));

            let provided = object.get(&field.name).filter(|v| !v.is_null());
            let candidate = match (provided, &field.default) {
                (Some(value), _) => value,
                (None, Some(default)) => default,
                (None, None) => {
                    if field.required {
                        issues.push(ValidationIssue::new(field_path, "Required"));
                    }
                    continue;
                }
            };

            if let Some(value) = field.check(candidate, &field_path, issues) {
                out.insert(field.name.clone(), value);
            }
        }

        if self.strict {
            for key in object.keys() {
                if self.field(key).is_none() {
                    let mut key_path = path.to_vec();
                    key_path.push(PathSegment::Key(key.clone()));
                    issues.push(ValidationIssue::new(
                        key_path,
                        format!("Unrecognized key '{}'", key),
                    ));
                }
            }
        }

        out
    }
}

/// One step in a field path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// A single violated rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Dotted path (`recipients.0.to`), or `(root)` for the arguments object.
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            return "(root)".to_string();
        }
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Arguments rejected by an [`InputSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", issue.path_string(), issue.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transfer_schema() -> InputSchema {
        InputSchema::new()
            .with_field(
                FieldSpec::string("to", "Recipient address").with_refinement(Refinement::evm_address()),
            )
            .with_field(
                FieldSpec::string("amount", "Amount in native units")
                    .with_refinement(Refinement::PositiveDecimal),
            )
    }

    const ADDRESS: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn test_valid_arguments_pass_through() {
        let args = transfer_schema()
            .validate(&json!({"to": ADDRESS, "amount": "1.5"}))
            .unwrap();
        assert_eq!(args, json!({"to": ADDRESS, "amount": "1.5"}));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = transfer_schema()
            .validate(&json!({"to": ADDRESS, "amount": "-1"}))
            .unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, vec![PathSegment::Key("amount".into())]);
        assert_eq!(err.issues[0].message, "Must be a positive decimal number");
    }

    #[test]
    fn test_one_issue_per_violated_field() {
        let err = transfer_schema()
            .validate(&json!({"to": "0xabc", "amount": "0"}))
            .unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert_eq!(err.issues[0].path_string(), "to");
        assert_eq!(err.issues[1].path_string(), "amount");
    }

    #[test]
    fn test_one_issue_per_violated_refinement() {
        let schema = InputSchema::new().with_field(
            FieldSpec::string("memo", "Memo")
                .with_refinement(Refinement::MinLength(10))
                .with_refinement(Refinement::one_of(["alpha", "beta"])),
        );
        let err = schema.validate(&json!({"memo": "gamma"})).unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert!(err.issues.iter().all(|i| i.path_string() == "memo"));
    }

    #[test]
    fn test_missing_required_field() {
        let err = transfer_schema().validate(&json!({"to": ADDRESS})).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path_string(), "amount");
        assert_eq!(err.issues[0].message, "Required");
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = transfer_schema()
            .validate(&json!({"to": ADDRESS, "amount": null}))
            .unwrap_err();
        assert_eq!(err.issues[0].message, "Required");
    }

    #[test]
    fn test_numeric_string_coerced_to_number() {
        let schema = InputSchema::new()
            .with_field(FieldSpec::number("slippage", "Slippage").with_refinement(Refinement::Max(50.0)))
            .with_field(FieldSpec::integer("limit", "Limit"));
        let args = schema
            .validate(&json!({"slippage": "0.5", "limit": "20"}))
            .unwrap();
        assert_eq!(args["slippage"], json!(0.5));
        assert_eq!(args["limit"], json!(20));
    }

    #[test]
    fn test_non_numeric_string_rejected_for_number() {
        let schema = InputSchema::new().with_field(FieldSpec::number("amount", "Amount"));
        let err = schema.validate(&json!({"amount": "lots"})).unwrap_err();
        assert_eq!(err.issues[0].message, "Expected number, received string");
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let schema = InputSchema::new().with_field(FieldSpec::integer("limit", "Limit"));
        assert!(schema.validate(&json!({"limit": 2.5})).is_err());
        assert_eq!(schema.validate(&json!({"limit": 3.0})).unwrap()["limit"], json!(3));
    }

    #[test]
    fn test_boolean_string_coerced() {
        let schema = InputSchema::new().with_field(FieldSpec::boolean("dry_run", "Dry run"));
        let args = schema.validate(&json!({"dry_run": "TRUE"})).unwrap();
        assert_eq!(args["dry_run"], json!(true));
    }

    #[test]
    fn test_default_applied_when_absent() {
        let schema = InputSchema::new()
            .with_field(FieldSpec::integer("limit", "Limit").with_default(10))
            .with_field(FieldSpec::string("sort", "Sort").optional());
        let args = schema.validate(&json!({})).unwrap();
        assert_eq!(args, json!({"limit": 10}));
    }

    #[test]
    fn test_range_refinements() {
        let schema = InputSchema::new().with_field(
            FieldSpec::number("pct", "Percent")
                .with_refinement(Refinement::Positive)
                .with_refinement(Refinement::Max(100.0)),
        );
        assert!(schema.validate(&json!({"pct": 50})).is_ok());
        assert_eq!(
            schema.validate(&json!({"pct": 0})).unwrap_err().issues[0].message,
            "Must be greater than 0"
        );
        assert!(schema.validate(&json!({"pct": 101})).is_err());
    }

    #[test]
    fn test_nested_object_and_array_paths() {
        let recipient = InputSchema::new()
            .with_field(FieldSpec::string("to", "Recipient").with_refinement(Refinement::evm_address()));
        let schema = InputSchema::new().with_field(
            FieldSpec::array(
                "recipients",
                "Recipients",
                FieldSpec::object("recipient", "Recipient", recipient),
            )
            .with_refinement(Refinement::MinItems(1)),
        );

        let err = schema
            .validate(&json!({"recipients": [{"to": ADDRESS}, {"to": "nope"}]}))
            .unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path_string(), "recipients.1.to");

        let err = schema.validate(&json!({"recipients": []})).unwrap_err();
        assert_eq!(err.issues[0].message, "Must contain at least 1 item(s)");
    }

    #[test]
    fn test_unknown_keys_dropped_unless_strict() {
        let lenient = InputSchema::new().with_field(FieldSpec::string("a", "A"));
        let args = lenient.validate(&json!({"a": "x", "b": 1})).unwrap();
        assert_eq!(args, json!({"a": "x"}));

        let strict = lenient.clone().strict();
        let err = strict.validate(&json!({"a": "x", "b": 1})).unwrap_err();
        assert_eq!(err.issues[0].message, "Unrecognized key 'b'");
    }

    #[test]
    fn test_non_object_input() {
        let err = transfer_schema().validate(&json!("send it")).unwrap_err();
        assert_eq!(err.issues[0].path_string(), "(root)");
        assert_eq!(err.issues[0].message, "Expected object, received string");
    }

    #[test]
    fn test_null_input_is_empty_object() {
        assert_eq!(InputSchema::new().validate(&Value::Null).unwrap(), json!({}));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(Refinement::pattern("(", "bad").is_err());
        let r = Refinement::pattern("^[a-z-]+$", "Lowercase network id").unwrap();
        assert!(r.check(&json!("sonic-mainnet")).is_none());
        assert_eq!(r.check(&json!("Sonic")), Some("Lowercase network id".to_string()));
    }

    #[test]
    fn test_positive_decimal() {
        for ok in ["1", "0.5", "10.000", "007"] {
            assert!(is_positive_decimal(ok), "{ok}");
        }
        for bad in ["-1", "0", "0.000", ".5", "5.", "1e3", "", "abc", "+1"] {
            assert!(!is_positive_decimal(bad), "{bad}");
        }
    }

    #[test]
    fn test_validation_error_display() {
        let err = transfer_schema().validate(&json!({})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: to: Required; amount: Required"
        );
    }

    #[test]
    fn test_issues_serialize_with_mixed_path() {
        let issue = ValidationIssue::new(
            vec![PathSegment::Key("recipients".into()), PathSegment::Index(2)],
            "bad",
        );
        assert_eq!(
            serde_json::to_value(&issue).unwrap(),
            json!({"path": ["recipients", 2], "message": "bad"})
        );
    }
}
