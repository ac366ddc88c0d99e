//! Blob codec for packet value sets.
//!
//! Blobs are JSON objects whose values may additionally be the bare tokens
//! `NaN`, `Infinity` and `-Infinity`. Plain `serde_json` rejects those tokens
//! (and silently writes `null` for non-finite floats), so encoding walks the
//! value tree itself while still delegating string escaping and finite float
//! formatting to `serde_json`.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::value::ItemValue;

/// Flat `key -> value` map as stored in one hash field.
pub type FlatMap = BTreeMap<String, ItemValue>;

/// Encode a flat map as a blob.
pub fn encode_map(map: &FlatMap) -> Result<Vec<u8>> {
    let mut out = String::with_capacity(map.len() * 24);
    write_object(&mut out, map)?;
    Ok(out.into_bytes())
}

/// Decode a blob into a flat map. The top level must be an object.
pub fn decode_map(blob: &[u8]) -> Result<FlatMap> {
    let text = std::str::from_utf8(blob)
        .map_err(|e| Error::Serialization(format!("blob is not UTF-8: {}", e)))?;
    match decode_value(text)? {
        ItemValue::Object(map) => Ok(map),
        other => Err(Error::Serialization(format!(
            "expected an object at the top level of a blob, found {}",
            type_name(&other)
        ))),
    }
}

/// Encode one value as text.
pub fn encode_value(value: &ItemValue) -> Result<String> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out)
}

/// Decode one value from text. Trailing non-whitespace is an error.
pub fn decode_value(text: &str) -> Result<ItemValue> {
    let mut parser = Parser::new(text);
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos != parser.src.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

fn type_name(value: &ItemValue) -> &'static str {
    match value {
        ItemValue::Null => "null",
        ItemValue::Bool(_) => "boolean",
        ItemValue::Int(_) | ItemValue::UInt(_) | ItemValue::Float(_) => "number",
        ItemValue::String(_) => "string",
        ItemValue::Array(_) => "array",
        ItemValue::Object(_) => "object",
    }
}

fn write_value(out: &mut String, value: &ItemValue) -> Result<()> {
    match value {
        ItemValue::Null => out.push_str("null"),
        ItemValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        ItemValue::Int(i) => out.push_str(&i.to_string()),
        ItemValue::UInt(u) => out.push_str(&u.to_string()),
        ItemValue::Float(f) if f.is_nan() => out.push_str("NaN"),
        ItemValue::Float(f) if f.is_infinite() => {
            out.push_str(if *f > 0.0 { "Infinity" } else { "-Infinity" })
        }
        ItemValue::Float(f) => out.push_str(&serde_json::to_string(f)?),
        ItemValue::String(s) => out.push_str(&serde_json::to_string(s)?),
        ItemValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
        }
        ItemValue::Object(map) => write_object(out, map)?,
    }
    Ok(())
}

fn write_object(out: &mut String, map: &FlatMap) -> Result<()> {
    out.push('{');
    for (i, (key, item)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&serde_json::to_string(key)?);
        out.push(':');
        write_value(out, item)?;
    }
    out.push('}');
    Ok(())
}

/// Deepest array/object nesting accepted when decoding, matching serde_json.
const MAX_DEPTH: usize = 128;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::Serialization(format!("{} at offset {}", message, self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn consume_literal(&mut self, literal: &str) -> bool {
        if self.src[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn parse_value(&mut self) -> Result<ItemValue> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.parse_nested(Self::parse_object),
            Some(b'[') => self.parse_nested(Self::parse_array),
            Some(b'"') => self.parse_string().map(ItemValue::String),
            Some(b't') if self.consume_literal("true") => Ok(ItemValue::Bool(true)),
            Some(b'f') if self.consume_literal("false") => Ok(ItemValue::Bool(false)),
            Some(b'n') if self.consume_literal("null") => Ok(ItemValue::Null),
            Some(b'N') if self.consume_literal("NaN") => Ok(ItemValue::Float(f64::NAN)),
            Some(b'I') if self.consume_literal("Infinity") => {
                Ok(ItemValue::Float(f64::INFINITY))
            }
            Some(b'-') if self.consume_literal("-Infinity") => {
                Ok(ItemValue::Float(f64::NEG_INFINITY))
            }
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_nested(&mut self, parse: fn(&mut Self) -> Result<ItemValue>) -> Result<ItemValue> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_object(&mut self) -> Result<ItemValue> {
        self.expect(b'{')?;
        let mut map = BTreeMap::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(ItemValue::Object(map));
        }
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return Err(self.error("expected an object key"));
            }
            let key = self.parse_string()?;
            self.expect(b':')?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(ItemValue::Object(map));
                }
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<ItemValue> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(ItemValue::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(ItemValue::Array(items));
                }
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    /// Locate the closing quote, then hand the literal to serde_json for unescaping.
    fn parse_string(&mut self) -> Result<String> {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut i = start + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => {
                    let literal = &self.src[start..=i];
                    self.pos = i + 1;
                    return serde_json::from_str(literal).map_err(Error::from);
                }
                _ => i += 1,
            }
        }
        Err(self.error("unterminated string"))
    }

    fn parse_number(&mut self) -> Result<ItemValue> {
        let start = self.pos;
        while let Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') = self.peek() {
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        let is_float = text.contains(['.', 'e', 'E']);
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(ItemValue::Int(i));
            }
            if let Ok(u) = text.parse::<u64>() {
                return Ok(ItemValue::UInt(u));
            }
        }
        text.parse::<f64>()
            .map(ItemValue::Float)
            .map_err(|_| Error::Serialization(format!("invalid number '{}' at offset {}", text, start)))
    }
}
