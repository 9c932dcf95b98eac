// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser for one event file: a sequence of `NAME="value"` bindings.
//!
//! Grammar (spec §4.6):
//! ```text
//! payload   := (binding WS*)*
//! binding   := NAME '=' '"' VALUE '"'
//! NAME      := bytes not containing '=' or whitespace
//! VALUE     := sequence of: any byte except '"' and '\', OR '\' <any byte>
//! ```
//! `\X` always yields the literal byte `X` — there is no special handling of
//! `\n`, `\t`, etc. Parsing is all-or-nothing: a failure anywhere in the file
//! means none of its bindings are applied.

use thiserror::Error;

/// One `NAME="value"` binding. Value is raw bytes — quoting is undone but no
/// encoding is assumed.
pub type Binding = (String, Vec<u8>);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("unexpected end of file while searching for '=' after offset {offset}")]
    MissingEquals { offset: usize },

    #[error("expected opening '\"' after '=' for name '{name}' at offset {offset}")]
    MissingOpenQuote { name: String, offset: usize },

    #[error("expected closing '\"' for name '{name}', reached end of file")]
    MissingCloseQuote { name: String },
}

/// Parse the full contents of an event file. On any grammar violation, no
/// bindings are returned — the whole file is rejected (spec §4.6).
pub fn parse_event(data: &[u8]) -> Result<Vec<Binding>, EventParseError> {
    let mut bindings = Vec::new();
    let mut idx = 0usize;
    let len = data.len();

    loop {
        while idx < len && data[idx].is_ascii_whitespace() {
            idx += 1;
        }
        if idx >= len {
            break;
        }

        let name_start = idx;
        while idx < len && data[idx] != b'=' {
            idx += 1;
        }
        if idx >= len {
            return Err(EventParseError::MissingEquals { offset: name_start });
        }
        let name = String::from_utf8_lossy(&data[name_start..idx]).into_owned();
        idx += 1; // consume '='

        if idx >= len || data[idx] != b'"' {
            return Err(EventParseError::MissingOpenQuote {
                name,
                offset: idx,
            });
        }
        idx += 1; // consume opening quote

        let mut value = Vec::new();
        loop {
            if idx >= len {
                return Err(EventParseError::MissingCloseQuote { name });
            }
            match data[idx] {
                b'"' => {
                    idx += 1;
                    break;
                }
                b'\\' => {
                    idx += 1;
                    if idx >= len {
                        return Err(EventParseError::MissingCloseQuote { name });
                    }
                    value.push(data[idx]);
                    idx += 1;
                }
                b => {
                    value.push(b);
                    idx += 1;
                }
            }
        }

        bindings.push((name, value));
    }

    Ok(bindings)
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
