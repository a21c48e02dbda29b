use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use chrono::NaiveDate;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::debug;

use crate::api::ApiError;
use crate::notify::Notifier;

use super::rules::{parse_number, Rule};

/// One choice of a select field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// An option whose label is its value.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Password,
    Number,
    /// Options may be filled in later, e.g. from a cached list.
    Select(Vec<SelectOption>),
    /// `YYYY-MM-DD`
    Date,
    /// Comma-separated input sent as an array of strings.
    List,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Payload path; dots build nested objects.
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            rules: Vec::new(),
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn password(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Password)
    }

    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Number)
    }

    pub fn date(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Date)
    }

    pub fn list(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::List)
    }

    pub fn select<I, S>(name: impl Into<String>, label: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = values.into_iter().map(SelectOption::plain).collect();
        Self::new(name, label, FieldKind::Select(options))
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    pub fn is_required(&self) -> bool {
        self.rules.contains(&Rule::Required)
    }

    pub fn is_secret(&self) -> bool {
        self.kind == FieldKind::Password
    }

    /// Checks implied by the field kind, run after the explicit rules.
    fn check_kind(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match &self.kind {
            FieldKind::Number if parse_number(value).is_none() => {
                Some(format!("{} must be a number", self.label))
            }
            FieldKind::Date if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() => {
                Some(format!("{} must be a date (YYYY-MM-DD)", self.label))
            }
            FieldKind::Select(options)
                if !options.is_empty() && !options.iter().any(|o| o.value == value) =>
            {
                Some(format!("{} has no option {:?}", self.label, value))
            }
            _ => None,
        }
    }

    fn to_json(&self, value: &str) -> Value {
        let value = value.trim();
        match self.kind {
            FieldKind::Number => number_value(value),
            FieldKind::List => Value::Array(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
            _ => Value::String(value.to_string()),
        }
    }
}

fn number_value(value: &str) -> Value {
    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    parse_number(value)
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

/// Fills `to` from the value of `from` whenever `from` changes.
#[derive(Clone)]
pub struct Derivation {
    pub from: String,
    pub to: String,
    pub map: fn(&str) -> Option<String>,
}

/// A rule spanning several fields. Reports against one field.
pub type CrossCheck = fn(&FormValues) -> Option<FieldError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Error, Debug, Clone)]
pub enum FormError {
    #[error("{} field(s) need attention", .0.len())]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Rejected(#[from] ApiError),
}

/// Current text of every field, keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct FormValues(BTreeMap<String, String>);

impl FormValues {
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(|s| s.trim()).unwrap_or("")
    }
}

/// Field state and validation for one create/edit form.
#[derive(Clone)]
pub struct Form {
    title: String,
    fields: Vec<FieldSpec>,
    values: FormValues,
    errors: BTreeMap<String, String>,
    derivations: Vec<Derivation>,
    checks: Vec<CrossCheck>,
    focus: usize,
    submitting: bool,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("title", &self.title)
            .field("fields", &self.fields.len())
            .field("errors", &self.errors)
            .finish()
    }
}

impl Form {
    pub fn new(title: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            title: title.into(),
            fields,
            values: FormValues::default(),
            errors: BTreeMap::new(),
            derivations: Vec::new(),
            checks: Vec::new(),
            focus: 0,
            submitting: false,
        }
    }

    pub fn derive(mut self, from: &str, to: &str, map: fn(&str) -> Option<String>) -> Self {
        self.derivations.push(Derivation {
            from: from.to_string(),
            to: to.to_string(),
            map,
        });
        self
    }

    pub fn check(mut self, check: CrossCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn value(&self, name: &str) -> &str {
        self.values.get(name)
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Set a field's text and run any derivation sourced from it.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let derived: Vec<(String, String)> = self
            .derivations
            .iter()
            .filter(|d| d.from == name)
            .filter_map(|d| (d.map)(value.trim()).map(|v| (d.to.clone(), v)))
            .collect();

        self.errors.remove(name);
        self.values.0.insert(name.to_string(), value);
        for (to, v) in derived {
            self.errors.remove(&to);
            self.values.0.insert(to, v);
        }
    }

    /// Replace the options of a select field.
    pub fn set_options(&mut self, name: &str, options: Vec<SelectOption>) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.kind = FieldKind::Select(options);
        }
    }

    /// Prefill from an existing record, following dotted names.
    pub fn fill_from(&mut self, record: &Value) {
        let names: Vec<String> = self.fields.iter().map(|f| f.name.clone()).collect();
        for name in names {
            let Some(found) = lookup(record, &name) else {
                continue;
            };
            let text = match found {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => continue,
            };
            self.values.0.insert(name, text);
        }
    }

    pub fn reset(&mut self) {
        self.values = FormValues::default();
        self.errors.clear();
        self.focus = 0;
        self.submitting = false;
    }

    // ===== Focus (keyboard navigation) =====

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focused(&self) -> Option<&FieldSpec> {
        self.fields.get(self.focus)
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Append a character to the focused field.
    pub fn push_char(&mut self, c: char) {
        if let Some(name) = self.focused().map(|f| f.name.clone()) {
            let mut text = self.values.0.get(&name).cloned().unwrap_or_default();
            text.push(c);
            self.set(&name, text);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(name) = self.focused().map(|f| f.name.clone()) {
            let mut text = self.values.0.get(&name).cloned().unwrap_or_default();
            text.pop();
            self.set(&name, text);
        }
    }

    /// Step a select field through its options.
    pub fn cycle_option(&mut self, forward: bool) {
        let Some(field) = self.focused() else {
            return;
        };
        let FieldKind::Select(ref options) = field.kind else {
            return;
        };
        if options.is_empty() {
            return;
        }
        let current = options.iter().position(|o| o.value == self.value(&field.name));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => options.len() - 1,
            (Some(i), true) => (i + 1) % options.len(),
            (Some(i), false) => (i + options.len() - 1) % options.len(),
        };
        let name = field.name.clone();
        let value = options[next].value.clone();
        self.set(&name, value);
    }

    // ===== Validation and submission =====

    /// Run every rule, replacing the inline errors.
    pub fn validate(&mut self) -> Result<(), FormError> {
        self.errors.clear();
        for field in &self.fields {
            let value = self.values.get(&field.name);
            let failure = field
                .rules
                .iter()
                .find_map(|rule| rule.check(&field.label, value))
                .or_else(|| field.check_kind(value));
            if let Some(message) = failure {
                self.errors.insert(field.name.clone(), message);
            }
        }
        for check in &self.checks {
            if let Some(err) = check(&self.values) {
                self.errors.entry(err.field).or_insert(err.message);
            }
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(FormError::Invalid(
                self.errors
                    .iter()
                    .map(|(field, message)| FieldError::new(field.clone(), message.clone()))
                    .collect(),
            ))
        }
    }

    /// The request body built from the current values.
    ///
    /// Empty fields are left out; dotted names nest.
    pub fn payload(&self) -> Value {
        let mut root = Map::new();
        for field in &self.fields {
            let value = self.values.get(&field.name);
            if value.is_empty() {
                continue;
            }
            insert_path(&mut root, &field.name, field.to_json(value));
        }
        Value::Object(root)
    }

    /// Validate, then hand the payload to `mutation`.
    ///
    /// The mutation is never called when validation fails. On success the
    /// `on_complete` callback runs (e.g. to close the modal) and a success
    /// notification is queued; a rejected request queues an error
    /// notification and leaves the form as it was.
    pub async fn submit<T, F, Fut, C>(
        &mut self,
        notifier: &Notifier,
        mutation: F,
        on_complete: C,
    ) -> Result<T, FormError>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
        C: FnOnce(&T),
    {
        if let Err(e) = self.validate() {
            debug!(form = %self.title, "Form has validation errors");
            return Err(e);
        }

        self.submitting = true;
        let result = mutation(self.payload()).await;
        self.submitting = false;

        match result {
            Ok(value) => {
                on_complete(&value);
                notifier.success(format!("{} saved", self.title));
                Ok(value)
            }
            Err(e) => {
                notifier.error(e.user_message());
                Err(FormError::Rejected(e))
            }
        }
    }
}

fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |node, part| node.get(part))
}

fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            root.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = root
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}
