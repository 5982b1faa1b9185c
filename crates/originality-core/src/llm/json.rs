//! Locate a JSON payload inside free-form model output.
//!
//! Models wrap JSON in prose or Markdown fences. The payload is the first
//! balanced `{...}` or `[...]` span (string-aware) that parses as JSON of the
//! requested shape.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    fn open(self) -> u8 {
        match self {
            JsonShape::Object => b'{',
            JsonShape::Array => b'[',
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            JsonShape::Object => value.is_object(),
            JsonShape::Array => value.is_array(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JsonShape::Object => "object",
            JsonShape::Array => "array",
        }
    }
}

/// Find the first well-formed JSON value of `shape` in `text`.
pub fn extract_json(text: &str, shape: JsonShape) -> Option<Value> {
    let bytes = text.as_bytes();
    let open = shape.open();

    for (start, &b) in bytes.iter().enumerate() {
        if b != open {
            continue;
        }
        let Some(end) = balanced_end(bytes, start) else {
            continue;
        };
        match serde_json::from_str::<Value>(&text[start..=end]) {
            Ok(value) if shape.matches(&value) => return Some(value),
            _ => {}
        }
    }
    None
}

/// Index of the bracket closing the one at `start`, skipping string contents.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => stack.push(b),
            b'}' | b']' => {
                let expected = if b == b'}' { b'{' } else { b'[' };
                if stack.pop() != Some(expected) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
