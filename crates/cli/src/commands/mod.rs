//! CLI command implementations.

pub mod carts;
pub mod migrate;
pub mod products;
pub mod users;

use serde::Serialize;
use serde_json::Value;
use trolley_core::{Document, Filter, Update};

/// A `key=value` pair given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: Value,
}

/// Parse `key=value`. The value is read as JSON when it parses as JSON,
/// otherwise it is kept as a string.
pub fn parse_field(raw: &str) -> Result<Field, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok(Field {
        key: key.to_owned(),
        value,
    })
}

/// Collect fields into a document.
pub fn to_document(fields: Vec<Field>) -> Document {
    fields
        .into_iter()
        .map(|field| (field.key, field.value))
        .collect()
}

/// Collect fields into an equality filter.
pub fn to_filter(fields: Vec<Field>) -> Filter {
    fields
        .into_iter()
        .fold(Filter::new(), |filter, field| filter.eq(field.key, field.value))
}

/// Collect fields into a `set` update.
pub fn to_update(fields: Vec<Field>) -> Update {
    fields
        .into_iter()
        .fold(Update::new(), |update, field| update.set(field.key, field.value))
}

/// Print a value as pretty JSON on stdout.
#[allow(clippy::print_stdout)]
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
