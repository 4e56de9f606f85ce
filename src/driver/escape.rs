use std::fmt::Write;

use indexmap::IndexMap;

use crate::error::PrestoTxnError;
use crate::types::RowValues;

/// Statement parameters in `pyformat` style.
///
/// The statement protocol has no bind parameters, so values are escaped into SQL literals
/// and substituted into the statement text before it is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Substituted for `%(name)s` placeholders.
    Named(IndexMap<String, RowValues>),
    /// Substituted, in order, for `%s` placeholders.
    Positional(Vec<RowValues>),
}

impl Params {
    #[must_use]
    pub fn positional(values: Vec<RowValues>) -> Self {
        Params::Positional(values)
    }

    #[must_use]
    pub fn named<K, I>(values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, RowValues)>,
    {
        Params::Named(values.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Turns `RowValues` into SQL literals and splices them into a statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamEscaper;

impl ParamEscaper {
    /// Render one value as a SQL literal.
    ///
    /// # Errors
    /// Returns `PrestoTxnError::ParameterError` for non-finite floats, which have no literal form.
    pub fn escape_item(&self, value: &RowValues) -> Result<String, PrestoTxnError> {
        let literal = match value {
            RowValues::Null => "NULL".to_string(),
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) => {
                if !f.is_finite() {
                    return Err(PrestoTxnError::ParameterError(format!(
                        "cannot escape non-finite float {f}"
                    )));
                }
                format!("{f:?}")
            }
            RowValues::Bool(true) => "TRUE".to_string(),
            RowValues::Bool(false) => "FALSE".to_string(),
            RowValues::Text(s) => escape_string(s),
            RowValues::Timestamp(dt) => {
                escape_string(&dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
            }
            RowValues::JSON(json) => escape_string(&json.to_string()),
            RowValues::Blob(bytes) => {
                let mut out = String::with_capacity(bytes.len() * 2 + 3);
                out.push_str("X'");
                for b in bytes {
                    let _ = write!(out, "{b:02x}");
                }
                out.push('\'');
                out
            }
        };
        Ok(literal)
    }

    /// Substitute escaped parameters into `statement`.
    ///
    /// `%%` becomes a literal `%`. Only the `s` conversion is understood.
    ///
    /// # Errors
    /// Returns `PrestoTxnError::ParameterError` when a named key is missing, the number of
    /// positional values does not match the placeholders, placeholder style and parameter
    /// kind disagree, or an unsupported conversion appears.
    pub fn substitute(&self, statement: &str, params: &Params) -> Result<String, PrestoTxnError> {
        let mut out = String::with_capacity(statement.len() + 16);
        let mut chars = statement.char_indices().peekable();
        let mut next_positional = 0usize;

        while let Some((idx, c)) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some((_, '%')) => out.push('%'),
                Some((_, 's')) => {
                    let Params::Positional(values) = params else {
                        return Err(PrestoTxnError::ParameterError(
                            "positional placeholder %s used with named parameters".to_string(),
                        ));
                    };
                    let value = values.get(next_positional).ok_or_else(|| {
                        PrestoTxnError::ParameterError(
                            "not enough arguments for format string".to_string(),
                        )
                    })?;
                    out.push_str(&self.escape_item(value)?);
                    next_positional += 1;
                }
                Some((open, '(')) => {
                    let Params::Named(values) = params else {
                        return Err(PrestoTxnError::ParameterError(
                            "format requires a mapping".to_string(),
                        ));
                    };
                    let rest = &statement[open + 1..];
                    let close = rest.find(')').ok_or_else(|| {
                        PrestoTxnError::ParameterError(format!(
                            "unterminated placeholder at byte {idx}"
                        ))
                    })?;
                    let name = &rest[..close];
                    // skip the name and the closing paren
                    for _ in 0..=name.chars().count() {
                        chars.next();
                    }
                    match chars.next() {
                        Some((_, 's')) => {}
                        other => {
                            return Err(PrestoTxnError::ParameterError(format!(
                                "unsupported format character {:?} after %({name})",
                                other.map(|(_, ch)| ch)
                            )));
                        }
                    }
                    let value = values.get(name).ok_or_else(|| {
                        PrestoTxnError::ParameterError(format!("missing parameter '{name}'"))
                    })?;
                    out.push_str(&self.escape_item(value)?);
                }
                Some((_, other)) => {
                    return Err(PrestoTxnError::ParameterError(format!(
                        "unsupported format character '{other}' at byte {idx}"
                    )));
                }
                None => {
                    return Err(PrestoTxnError::ParameterError(
                        "incomplete format".to_string(),
                    ));
                }
            }
        }

        if let Params::Positional(values) = params
            && next_positional != values.len()
        {
            return Err(PrestoTxnError::ParameterError(
                "not all arguments converted during string formatting".to_string(),
            ));
        }

        Ok(out)
    }
}

fn escape_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
