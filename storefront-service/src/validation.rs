//! Declarative request-shape validation.
//!
//! A [`Schema`] lists fields by location and name, each with an ordered set of
//! rules. Validation collects every violation before failing so clients see
//! all problems in one 400 response. Handlers receive data through
//! [`Valid`] / [`ValidQuery`], which run the schema and only then deserialize.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request},
    http::request::Parts,
    Json,
};
use common_http_errors::ApiError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9_'+\-]+(?:\.[A-Za-z0-9_'+\-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
    )
    .expect("valid email regex")
});

static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid numeric regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Body,
    Params,
    Query,
}

#[derive(Debug, Clone)]
pub enum Rule {
    Required(String),
    String,
    MinLength(usize, String),
    Email(String),
    Numeric(String),
    Uuid(String),
    OneOf(&'static [&'static str], String),
}

#[derive(Debug, Clone)]
pub struct Field {
    location: Location,
    name: &'static str,
    trim: bool,
    rules: Vec<Rule>,
}

impl Field {
    fn new(location: Location, name: &'static str) -> Self {
        Self { location, name, trim: false, rules: vec![Rule::String] }
    }

    pub fn body(name: &'static str) -> Self {
        Self::new(Location::Body, name)
    }

    pub fn params(name: &'static str) -> Self {
        Self::new(Location::Params, name)
    }

    pub fn query(name: &'static str) -> Self {
        Self::new(Location::Query, name)
    }

    /// Strip surrounding whitespace before the rules run; the handler sees the trimmed value.
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    /// Reported only when the field is absent or null.
    pub fn required(mut self, message: impl Into<String>) -> Self {
        self.rules.push(Rule::Required(message.into()));
        self
    }

    pub fn min_length(mut self, len: usize, message: impl Into<String>) -> Self {
        self.rules.push(Rule::MinLength(len, message.into()));
        self
    }

    pub fn email(mut self, message: impl Into<String>) -> Self {
        self.rules.push(Rule::Email(message.into()));
        self
    }

    pub fn numeric(mut self, message: impl Into<String>) -> Self {
        self.rules.push(Rule::Numeric(message.into()));
        self
    }

    pub fn uuid(mut self, message: impl Into<String>) -> Self {
        self.rules.push(Rule::Uuid(message.into()));
        self
    }

    pub fn one_of(mut self, values: &'static [&'static str], message: impl Into<String>) -> Self {
        self.rules.push(Rule::OneOf(values, message.into()));
        self
    }

    fn required_message(&self) -> Option<&str> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::Required(msg) => Some(msg.as_str()),
            _ => None,
        })
    }

    /// A field with any content rule but no explicit `Required` is still
    /// mandatory; the first content rule's message stands in.
    fn missing_message(&self) -> Option<String> {
        if let Some(msg) = self.required_message() {
            return Some(msg.to_string());
        }
        self.rules.iter().find_map(|rule| match rule {
            Rule::Email(msg) | Rule::Numeric(msg) | Rule::Uuid(msg) | Rule::MinLength(_, msg) => {
                Some(msg.clone())
            }
            _ => None,
        })
    }

    fn check(&self, value: Option<&Value>, errors: &mut Vec<String>) {
        let text = match value {
            None | Some(Value::Null) => {
                if let Some(msg) = self.missing_message() {
                    errors.push(msg);
                }
                return;
            }
            Some(Value::String(text)) if self.trim => text.trim(),
            Some(Value::String(text)) => text.as_str(),
            Some(_) => {
                errors.push(format!("{} must be a string", self.name));
                return;
            }
        };
        for rule in &self.rules {
            let failed = match rule {
                Rule::String | Rule::Required(_) => false,
                Rule::MinLength(len, _) => text.chars().count() < *len,
                Rule::Email(_) => !EMAIL_RE.is_match(text),
                Rule::Numeric(_) => !NUMERIC_RE.is_match(text),
                Rule::Uuid(_) => uuid::Uuid::parse_str(text).is_err(),
                Rule::OneOf(values, _) => !values.contains(&text),
            };
            if failed {
                match rule {
                    Rule::MinLength(_, msg)
                    | Rule::Email(msg)
                    | Rule::Numeric(msg)
                    | Rule::Uuid(msg)
                    | Rule::OneOf(_, msg) => errors.push(msg.clone()),
                    Rule::String | Rule::Required(_) => {}
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

/// The raw request pieces a schema inspects.
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub body: Value,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

impl Candidate {
    fn lookup(&self, location: Location, name: &str) -> Option<Value> {
        match location {
            Location::Body => self.body.get(name).cloned(),
            Location::Params => self.params.get(name).cloned().map(Value::String),
            Location::Query => self.query.get(name).cloned().map(Value::String),
        }
    }
}

/// A candidate that passed its schema.
#[derive(Debug)]
pub struct Validated(Candidate);

impl Validated {
    pub fn body<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.0.body.clone())
            .map_err(|err| ApiError::bad_request("malformed_body", err.to_string()))
    }

    pub fn query<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let map: Map<String, Value> = self
            .0
            .query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        serde_json::from_value(Value::Object(map))
            .map_err(|err| ApiError::bad_request("malformed_query", err.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::validation(errors.0)
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Checks every field and returns all violations in field then rule order.
    pub fn check(&self, candidate: &Candidate) -> ValidationErrors {
        let mut messages = Vec::new();
        for field in &self.fields {
            let value = candidate.lookup(field.location, field.name);
            field.check(value.as_ref(), &mut messages);
        }
        ValidationErrors(messages)
    }

    fn normalize(&self, candidate: &mut Candidate) {
        for field in self.fields.iter().filter(|f| f.trim) {
            match field.location {
                Location::Body => {
                    if let Some(Value::String(text)) = candidate.body.get_mut(field.name) {
                        *text = text.trim().to_string();
                    }
                }
                Location::Params => {
                    if let Some(text) = candidate.params.get_mut(field.name) {
                        *text = text.trim().to_string();
                    }
                }
                Location::Query => {
                    if let Some(text) = candidate.query.get_mut(field.name) {
                        *text = text.trim().to_string();
                    }
                }
            }
        }
    }

    pub fn validate(&self, mut candidate: Candidate) -> Result<Validated, ValidationErrors> {
        self.normalize(&mut candidate);
        let errors = self.check(&candidate);
        if errors.is_empty() {
            Ok(Validated(candidate))
        } else {
            Err(errors)
        }
    }
}

/// Request types that carry a schema checked before deserialization.
pub trait RequestSchema {
    fn schema() -> &'static Schema;
}

/// JSON body extractor gated by `T::schema()`.
pub struct Valid<T>(pub T);

/// Query string extractor gated by `T::schema()`.
pub struct ValidQuery<T>(pub T);

fn query_map(parts: &Parts) -> Result<HashMap<String, String>, ApiError> {
    Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(map)| map)
        .map_err(|rej| ApiError::bad_request("malformed_query", rej.body_text()))
}

fn reject(errors: ValidationErrors) -> ApiError {
    tracing::debug!(violations = errors.messages().len(), "request rejected by schema");
    errors.into()
}

#[async_trait]
impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: RequestSchema + DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let query = query_map(&parts)?;
        let params = match Option::<RawPathParams>::from_request_parts(&mut parts, state).await {
            Ok(Some(raw)) => raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            _ => HashMap::new(),
        };
        let req = Request::from_parts(parts, body);
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rej| ApiError::bad_request("malformed_body", rej.body_text()))?;
        let validated = T::schema().validate(Candidate { body, params, query }).map_err(reject)?;
        validated.body().map(Valid)
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: RequestSchema + DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = query_map(parts)?;
        let candidate = Candidate { query, ..Candidate::default() };
        let validated = T::schema().validate(candidate).map_err(reject)?;
        validated.query().map(ValidQuery)
    }
}
