//! Column constraint validation.
//!
//! Runs before any mutation commits. Columns are checked in declaration
//! order and the first violation aborts the whole call. Columns absent from
//! the record are skipped; defaults must already have been applied.

use strata_common::error::{ErrorCode, StrataError, StrataResult};
use strata_common::types::{Record, Value};

use crate::schema::{ColumnDefinition, DataType, StringFormat, TableSchema};

/// Validates `record` against the table's column constraints.
///
/// `others` are the records a unique column must not collide with. Insert
/// passes every record already in the table (including earlier members of
/// the same batch); update passes every record except the one being
/// changed.
pub fn validate<'a, I>(record: &Record, table: &TableSchema, others: I) -> StrataResult<()>
where
    I: Iterator<Item = &'a Record> + Clone,
{
    for (column, def) in table.columns() {
        let Some(value) = record.get(column) else {
            continue;
        };

        if def.options.unique && others.clone().any(|other| other.get(column) == Some(value)) {
            return Err(StrataError::validation(
                ErrorCode::UniqueViolation,
                column,
                format!("Value '{value}' for column '{column}' must be unique."),
            ));
        }

        match (def.data_type, value) {
            (DataType::String, Value::String(text)) => check_string(column, def, text)?,
            (DataType::Number, Value::Number(n)) => check_number(column, def, *n)?,
            _ => {}
        }
    }
    Ok(())
}

/// Length bounds count UTF-16 code units, so a character outside the Basic
/// Multilingual Plane counts as two.
#[allow(clippy::cast_precision_loss)]
fn check_string(column: &str, def: &ColumnDefinition, text: &str) -> StrataResult<()> {
    let len = text.encode_utf16().count() as f64;

    if let Some(min) = def.options.min {
        if len < min {
            return Err(StrataError::validation(
                ErrorCode::StringTooShort,
                column,
                format!("String '{text}' for column '{column}' is too short (min: {min})."),
            ));
        }
    }

    if let Some(max) = def.options.max {
        if len > max {
            return Err(StrataError::validation(
                ErrorCode::StringTooLong,
                column,
                format!("String '{text}' for column '{column}' is too long (max: {max})."),
            ));
        }
    }

    if def.options.format == Some(StringFormat::Email) && !is_valid_email(text) {
        return Err(StrataError::validation(
            ErrorCode::InvalidEmail,
            column,
            format!("Value '{text}' for column '{column}' is not a valid email."),
        ));
    }

    Ok(())
}

fn check_number(column: &str, def: &ColumnDefinition, n: f64) -> StrataResult<()> {
    if let Some(min) = def.options.min {
        if n < min {
            return Err(StrataError::validation(
                ErrorCode::NumberTooSmall,
                column,
                format!("Number {n} for column '{column}' is too small (min: {min})."),
            ));
        }
    }

    if let Some(max) = def.options.max {
        if n > max {
            return Err(StrataError::validation(
                ErrorCode::NumberTooLarge,
                column,
                format!("Number {n} for column '{column}' is too large (max: {max})."),
            ));
        }
    }

    Ok(())
}

/// Accepts `local@domain.tld`: no whitespace, exactly one `@` with text
/// before it, and a `.` inside the domain with text on both sides.
pub fn is_valid_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
