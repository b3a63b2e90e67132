// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::path::FormValues;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Cross-field predicate: receives the field's value and every form value,
/// returns an error message when the value is rejected.
pub type CustomRule = Arc<dyn Fn(&Value, &FormValues) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueKind {
    #[default]
    Text,
    Email,
    Number,
    File,
}

/// Metadata of a file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    #[serde(default)]
    pub name: String,
    pub size: u64,
    #[serde(rename = "type", alias = "mimeType")]
    pub mime_type: String,
}

/// Constraints declared for one form field.
#[derive(Clone, Default)]
pub struct FieldRules {
    label: Option<String>,
    required: bool,
    kind: ValueKind,
    min: Option<f64>,
    max: Option<f64>,
    integer: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<(Regex, String)>,
    max_size: Option<u64>,
    allowed_types: Vec<String>,
    custom: Option<CustomRule>,
}

impl fmt::Debug for FieldRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRules")
            .field("label", &self.label)
            .field("required", &self.required)
            .field("kind", &self.kind)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("integer", &self.integer)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(|(re, _)| re.as_str()))
            .field("max_size", &self.max_size)
            .field("allowed_types", &self.allowed_types)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl FieldRules {
    pub fn text() -> Self {
        Self::default()
    }

    pub fn email() -> Self {
        Self {
            kind: ValueKind::Email,
            ..Self::default()
        }
    }

    pub fn number() -> Self {
        Self {
            kind: ValueKind::Number,
            ..Self::default()
        }
    }

    pub fn file() -> Self {
        Self {
            kind: ValueKind::File,
            ..Self::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn min_length(mut self, chars: usize) -> Self {
        self.min_length = Some(chars);
        self
    }

    pub fn max_length(mut self, chars: usize) -> Self {
        self.max_length = Some(chars);
        self
    }

    pub fn pattern(mut self, pattern: Regex, message: impl Into<String>) -> Self {
        self.pattern = Some((pattern, message.into()));
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    pub fn allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn custom<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Value, &FormValues) -> Option<String> + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(rule));
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Evaluates the rules in declaration order and returns the first failure.
    /// An empty optional value passes without running anything else.
    pub fn check(&self, name: &str, value: Option<&Value>, all: &FormValues) -> Option<String> {
        let label = self.label.as_deref().unwrap_or(name);
        let value = match value {
            Some(value) if !is_empty(value) => value,
            _ => {
                return self.required.then(|| format!("{label} is required"));
            }
        };

        match self.kind {
            ValueKind::Text => {}
            ValueKind::Email => {
                let valid = value
                    .as_str()
                    .is_some_and(|text| EMAIL.is_match(text.trim()));
                if !valid {
                    return Some(format!("{label} must be a valid email address"));
                }
            }
            ValueKind::Number => {
                if let Some(message) = self.check_number(label, value) {
                    return Some(message);
                }
            }
            ValueKind::File => {}
        }

        if let Some(text) = value.as_str() {
            let chars = text.trim().chars().count();
            if let Some(min) = self.min_length
                && chars < min
            {
                return Some(format!("{label} must be at least {min} characters"));
            }
            if let Some(max) = self.max_length
                && chars > max
            {
                return Some(format!("{label} must be at most {max} characters"));
            }
            if let Some((pattern, message)) = &self.pattern
                && !pattern.is_match(text.trim())
            {
                return Some(format!("{label} {message}"));
            }
        }

        if self.kind == ValueKind::File
            && let Some(message) = self.check_file(label, value)
        {
            return Some(message);
        }

        self.custom.as_ref().and_then(|rule| rule(value, all))
    }

    fn check_number(&self, label: &str, value: &Value) -> Option<String> {
        let Some(number) = parse_number(value) else {
            return Some(format!("{label} must be a valid number"));
        };
        if self.integer && number.fract() != 0.0 {
            return Some(format!("{label} must be a whole number"));
        }
        if let Some(min) = self.min
            && number < min
        {
            return Some(format!("{label} must be at least {min}"));
        }
        if let Some(max) = self.max
            && number > max
        {
            return Some(format!("{label} must be at most {max}"));
        }
        None
    }

    fn check_file(&self, label: &str, value: &Value) -> Option<String> {
        // A string is the URL of an earlier upload; only fresh picks are checked.
        if value.is_string() {
            return None;
        }
        let Ok(file) = FileMeta::deserialize(value) else {
            return Some(format!("{label} must be a file"));
        };
        if let Some(max_size) = self.max_size
            && file.size > max_size
        {
            return Some(format!(
                "{label} must be smaller than {}",
                format_bytes(max_size)
            ));
        }
        if !self.allowed_types.is_empty()
            && !self
                .allowed_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&file.mime_type))
        {
            return Some(format!(
                "{label} must be one of: {}",
                self.allowed_types.join(", ")
            ));
        }
        None
    }
}

/// Field name to rule set, kept in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ValidationSchema {
    fields: Vec<(String, FieldRules)>,
}

impl ValidationSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the rules for `name` (a field name or dotted path).
    pub fn field(mut self, name: impl Into<String>, rules: FieldRules) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = rules,
            None => self.fields.push((name, rules)),
        }
        self
    }

    pub fn rules(&self, name: &str) -> Option<&FieldRules> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, rules)| rules)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Error for one field, or `None` when it passes or has no rules.
    pub fn validate_field(&self, name: &str, values: &FormValues) -> Option<String> {
        self.rules(name)?.check(name, values.lookup(name), values)
    }

    pub fn validate(&self, values: &FormValues) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter_map(|(name, rules)| {
                rules
                    .check(name, values.lookup(name), values)
                    .map(|message| (name.clone(), message))
            })
            .collect()
    }

    pub fn is_valid(&self, values: &FormValues) -> bool {
        self.fields
            .iter()
            .all(|(name, rules)| rules.check(name, values.lookup(name), values).is_none())
    }
}

pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => false,
    }
}

/// Parses JSON numbers and numeric strings; non-finite results are rejected.
pub fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldRules, ValidationSchema, format_bytes, parse_number};
    use crate::path::FormValues;
    use regex::Regex;
    use serde_json::{Value, json};

    fn values(raw: Value) -> FormValues {
        FormValues::from_value(raw).expect("object values")
    }

    fn check(rules: &FieldRules, value: Value) -> Option<String> {
        rules.check("field", Some(&value), &FormValues::new())
    }

    #[test]
    fn empty_optional_value_skips_every_rule() {
        let rules = FieldRules::number().min(10.0).custom(|_, _| Some("never".to_owned()));
        assert_eq!(check(&rules, json!("   ")), None);
        assert_eq!(rules.check("field", None, &FormValues::new()), None);
    }

    #[test]
    fn required_reports_label() {
        let rules = FieldRules::text().required().label("Name");
        assert_eq!(check(&rules, json!("  ")), Some("Name is required".to_owned()));
        assert_eq!(check(&rules, json!([])), Some("Name is required".to_owned()));
        assert_eq!(check(&rules, json!({})), None);
    }

    #[test]
    fn number_rules_reject_nan_and_enforce_bounds() {
        let rules = FieldRules::number().min(0.0).max(100.0);
        assert_eq!(
            check(&rules, json!("NaN")),
            Some("field must be a valid number".to_owned())
        );
        assert_eq!(
            check(&rules, json!("abc")),
            Some("field must be a valid number".to_owned())
        );
        assert_eq!(
            check(&rules, json!("-5")),
            Some("field must be at least 0".to_owned())
        );
        assert_eq!(
            check(&rules, json!(100.5)),
            Some("field must be at most 100".to_owned())
        );
        assert_eq!(check(&rules, json!(" 42.5 ")), None);
    }

    #[test]
    fn integer_rule_rejects_fractions() {
        let rules = FieldRules::number().integer();
        assert_eq!(
            check(&rules, json!("2.5")),
            Some("field must be a whole number".to_owned())
        );
        assert_eq!(check(&rules, json!(3)), None);
    }

    #[test]
    fn email_rule_uses_standard_shape() {
        let rules = FieldRules::email();
        assert_eq!(check(&rules, json!("ops@garage.example")), None);
        assert_eq!(
            check(&rules, json!("ops@garage")),
            Some("field must be a valid email address".to_owned())
        );
        assert!(check(&rules, json!(12)).is_some());
    }

    #[test]
    fn length_bounds_measure_trimmed_characters() {
        let rules = FieldRules::text().min_length(2).max_length(4);
        assert_eq!(
            check(&rules, json!(" a ")),
            Some("field must be at least 2 characters".to_owned())
        );
        assert_eq!(check(&rules, json!("  ñandú ")), Some("field must be at most 4 characters".to_owned()));
        assert_eq!(check(&rules, json!(" abcd ")), None);
    }

    #[test]
    fn pattern_failure_uses_caller_message() {
        let rules = FieldRules::text().pattern(
            Regex::new(r"^[0-9]+$").expect("digits pattern"),
            "must contain digits only",
        );
        assert_eq!(
            check(&rules, json!("12a")),
            Some("field must contain digits only".to_owned())
        );
    }

    #[test]
    fn file_rules_check_size_and_type() {
        let rules = FieldRules::file()
            .max_size(2 * 1024 * 1024)
            .allowed_types(["image/png", "image/jpeg"]);
        assert_eq!(
            check(&rules, json!({"name": "a.png", "size": 10, "type": "image/png"})),
            None
        );
        assert_eq!(
            check(&rules, json!({"name": "a.png", "size": 3_000_000, "type": "image/png"})),
            Some("field must be smaller than 2 MB".to_owned())
        );
        assert_eq!(
            check(&rules, json!({"name": "a.gif", "size": 10, "type": "image/gif"})),
            Some("field must be one of: image/png, image/jpeg".to_owned())
        );
        assert_eq!(
            check(&rules, json!({"name": "a.gif"})),
            Some("field must be a file".to_owned())
        );
        assert_eq!(check(&rules, json!("https://cdn.example/logo.png")), None);
    }

    #[test]
    fn first_failing_rule_wins() {
        let rules = FieldRules::text()
            .required()
            .min_length(5)
            .custom(|_, _| Some("custom failure".to_owned()));
        assert_eq!(
            check(&rules, json!("abc")),
            Some("field must be at least 5 characters".to_owned())
        );
        assert_eq!(check(&rules, json!("abcdef")), Some("custom failure".to_owned()));
        assert_eq!(check(&rules, json!("")), Some("field is required".to_owned()));
    }

    #[test]
    fn custom_rule_sees_all_values() {
        let schema = ValidationSchema::new()
            .field("price", FieldRules::number())
            .field(
                "discount",
                FieldRules::number().custom(|value, all| {
                    let price = all.lookup("price").and_then(parse_number)?;
                    let discount = parse_number(value)?;
                    (discount > price).then(|| "must not exceed price".to_owned())
                }),
            );
        let form = values(json!({"price": 10, "discount": "12"}));
        assert_eq!(
            schema.validate_field("discount", &form),
            Some("must not exceed price".to_owned())
        );
        assert!(!schema.is_valid(&form));
    }

    #[test]
    fn schema_resolves_dotted_fields() {
        let schema = ValidationSchema::new()
            .field("geo.lat", FieldRules::number().min(-90.0).max(90.0).label("Latitude"));
        let errors = schema.validate(&values(json!({"geo": {"lat": 91}})));
        assert_eq!(
            errors.get("geo.lat").map(String::as_str),
            Some("Latitude must be at most 90")
        );
    }

    #[test]
    fn field_replaces_existing_rules() {
        let schema = ValidationSchema::new()
            .field("name", FieldRules::text())
            .field("name", FieldRules::text().required());
        assert_eq!(schema.len(), 1);
        assert!(schema.rules("name").is_some_and(FieldRules::is_required));
    }

    #[test]
    fn bytes_format_prefers_whole_units() {
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_bytes(2048), "2 KB");
        assert_eq!(format_bytes(1500), "1500 bytes");
    }
}
