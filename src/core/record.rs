//! Filepath: src/core/record.rs
//! One JSON object per corpus line. Decoding never fails loudly:
//! a bad line becomes `Decoded::Skip` and the stream carries on.

use serde_json::{Map, Value};

use crate::core::fields::{Field, split_tokens};

/// Why a raw line did not produce a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason
{
    /// Empty or whitespace-only line
    Blank,

    /// Bytes are not valid UTF-8
    Encoding,

    /// Not parseable as JSON (truncated line, garbage)
    Syntax,

    /// Valid JSON, but not an object
    NotAnObject,
}

/// Tagged outcome of decoding one raw line
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded
{
    Record(Record),
    Skip(SkipReason),
}

/// A decoded corpus entry (one work and its metadata)
#[derive(Debug, Clone, PartialEq)]
pub struct Record
{
    /// Top-level fields in their original order
    fields: Map<String, Value>,
}

impl Record
{
    /// Decode one raw line.
    pub fn decode(bytes: &[u8]) -> Decoded
    {
        // Whitespace-only lines carry nothing
        if bytes
            .iter()
            .all(u8::is_ascii_whitespace)
        {
            return Decoded::Skip(SkipReason::Blank);
        }

        // Reject invalid UTF-8 before JSON sees it
        let text = match std::str::from_utf8(bytes)
        {
            Ok(t) => t,
            Err(_) => return Decoded::Skip(SkipReason::Encoding),
        };

        match serde_json::from_str::<Value>(text)
        {
            Ok(Value::Object(fields)) => Decoded::Record(Record { fields }),
            Ok(_) => Decoded::Skip(SkipReason::NotAnObject),
            Err(_) => Decoded::Skip(SkipReason::Syntax),
        }
    }

    /// Wrap an already-built object
    pub fn from_map(fields: Map<String, Value>) -> Self
    {
        Self { fields }
    }

    /// The `metadata` mapping, if present and an object
    pub fn metadata(&self) -> Option<&Map<String, Value>>
    {
        self.fields
            .get("metadata")
            .and_then(Value::as_object)
    }

    /// Raw metadata value as a string; absent or non-string is ""
    pub fn meta_str(
        &self,
        key: &str,
    ) -> &str
    {
        self.metadata()
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Document body; absent is ""
    pub fn text(&self) -> &str
    {
        self.fields
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Tokens of a known metadata field
    pub fn tokens(
        &self,
        field: Field,
    ) -> Vec<&str>
    {
        self.tokens_for_key(field.key())
    }

    /// Tokens of an arbitrary metadata key.
    ///
    /// A string value is split on commas; an array of strings has each
    /// element split the same way. Anything else yields nothing.
    pub fn tokens_for_key(
        &self,
        key: &str,
    ) -> Vec<&str>
    {
        let Some(value) = self
            .metadata()
            .and_then(|m| m.get(key))
        else
        {
            return Vec::new();
        };

        match value
        {
            Value::String(s) => split_tokens(s).collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .flat_map(split_tokens)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True when `token` is one of the field's tokens
    pub fn has_token(
        &self,
        key: &str,
        token: &str,
    ) -> bool
    {
        self.tokens_for_key(key)
            .contains(&token)
    }

    /// Remove a top-level field, returning its value
    pub fn remove(
        &mut self,
        key: &str,
    ) -> Option<Value>
    {
        self.fields
            .shift_remove(key)
    }

    /// Top-level fields, original order
    pub fn fields(&self) -> &Map<String, Value>
    {
        &self.fields
    }

    /// Append the compact JSON line (with trailing '\n') to `out`
    pub fn encode_line(
        &self,
        out: &mut Vec<u8>,
    ) -> serde_json::Result<()>
    {
        serde_json::to_writer(&mut *out, &self.fields)?;
        out.push(b'\n');
        Ok(())
    }
}
