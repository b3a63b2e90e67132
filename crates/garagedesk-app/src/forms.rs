// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::path::{FieldPath, FormValues};
use crate::rules::ValidationSchema;
use crate::selection::IdSet;

/// Input binding for one field: current value plus the error to show, which
/// is only present once the field has been touched.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldProps {
    pub name: String,
    pub value: Value,
    pub error: Option<String>,
}

/// Schema-driven form: values, per-field errors, touched state, submission.
#[derive(Debug, Clone)]
pub struct FormState {
    schema: ValidationSchema,
    initial: FormValues,
    values: FormValues,
    errors: BTreeMap<String, String>,
    touched: BTreeSet<String>,
    is_submitting: bool,
}

impl FormState {
    pub fn new(schema: ValidationSchema, initial: FormValues) -> Self {
        Self {
            schema,
            values: initial.clone(),
            initial,
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
            is_submitting: false,
        }
    }

    pub fn schema(&self) -> &ValidationSchema {
        &self.schema
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.lookup(name)
    }

    /// Stored error, whether or not the field has been touched.
    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Error to render under the input; hidden until the field is touched.
    pub fn visible_error(&self, name: &str) -> Option<&str> {
        if !self.is_touched(name) {
            return None;
        }
        self.error(name)
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// True when every rule set passes against the current values, touched
    /// or not.
    pub fn is_valid(&self) -> bool {
        self.schema.is_valid(&self.values)
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }

    /// Writes `value` at the dotted `name`. A touched field is revalidated
    /// right away.
    pub fn set_value(&mut self, name: &str, value: Value) {
        let path = match FieldPath::parse(name) {
            Ok(path) => path,
            Err(error) => {
                warn!(field = name, %error, "ignoring write to malformed field name");
                return;
            }
        };
        self.values.set(&path, value);
        if self.is_touched(name) {
            self.revalidate(name);
        }
    }

    /// Stores a confirmed selector value as an array of id strings.
    pub fn set_selection(&mut self, name: &str, ids: &IdSet) {
        let value = Value::Array(
            ids.iter()
                .map(|id| Value::String(id.as_str().to_owned()))
                .collect(),
        );
        self.set_value(name, value);
    }

    pub fn blur(&mut self, name: &str) {
        self.touched.insert(name.to_owned());
        self.revalidate(name);
    }

    /// Recomputes every field's error without touching anything. Returns
    /// whether the form is free of errors.
    pub fn validate_all(&mut self) -> bool {
        self.errors = self.schema.validate(&self.values);
        self.errors.is_empty()
    }

    /// First half of a submit: touches every schema field and validates.
    /// When valid, raises `is_submitting` and returns the values to send.
    /// Returns `None` when validation fails or a submit is already running.
    pub fn begin_submit(&mut self) -> Option<FormValues> {
        if self.is_submitting {
            debug!("submit ignored while another is in flight");
            return None;
        }
        let names = self
            .schema
            .field_names()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        self.touched.extend(names);

        if !self.validate_all() {
            debug!(errors = self.errors.len(), "submit blocked by validation");
            return None;
        }
        self.is_submitting = true;
        Some(self.values.clone())
    }

    /// Second half of a submit: lowers `is_submitting` and reports whether
    /// the capability accepted the values. A rejection is logged; it never
    /// changes values or errors.
    pub fn finish_submit(&mut self, result: Result<()>) -> bool {
        self.is_submitting = false;
        match result {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %format!("{error:#}"), "form submission failed");
                false
            }
        }
    }

    /// [`begin_submit`](Self::begin_submit), `on_submit`, then
    /// [`finish_submit`](Self::finish_submit). The flag is lowered even if
    /// `on_submit` panics.
    pub fn submit<F>(&mut self, on_submit: F) -> bool
    where
        F: FnOnce(&FormValues) -> Result<()>,
    {
        let Some(values) = self.begin_submit() else {
            return false;
        };
        let guard = SubmittingGuard { form: self };
        let result = on_submit(&values);
        guard.finish(result)
    }

    /// Restores the initial values and clears errors, touched state and the
    /// submitting flag.
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();
        self.touched.clear();
        self.is_submitting = false;
    }

    pub fn field_props(&self, name: &str) -> FieldProps {
        FieldProps {
            name: name.to_owned(),
            value: self.value(name).cloned().unwrap_or(Value::Null),
            error: self.visible_error(name).map(str::to_owned),
        }
    }

    /// Mutable binding with change and blur handlers for one input.
    pub fn field(&mut self, name: &str) -> FieldBinding<'_> {
        FieldBinding {
            form: self,
            name: name.to_owned(),
        }
    }

    fn revalidate(&mut self, name: &str) {
        match self.schema.validate_field(name, &self.values) {
            Some(message) => {
                self.errors.insert(name.to_owned(), message);
            }
            None => {
                self.errors.remove(name);
            }
        }
    }
}

pub struct FieldBinding<'a> {
    form: &'a mut FormState,
    name: String,
}

impl FieldBinding<'_> {
    pub fn props(&self) -> FieldProps {
        self.form.field_props(&self.name)
    }

    pub fn on_change(&mut self, value: Value) {
        self.form.set_value(&self.name, value);
    }

    pub fn on_blur(&mut self) {
        self.form.blur(&self.name);
    }
}

struct SubmittingGuard<'a> {
    form: &'a mut FormState,
}

impl SubmittingGuard<'_> {
    fn finish(self, result: Result<()>) -> bool {
        self.form.finish_submit(result)
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.form.is_submitting = false;
    }
}
