// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File classifier (spec §4.10): decides, from a regular file's leading
//! bytes, whether it names an interpreter to chase, is a candidate for
//! shared-library dependency extraction, or is inert data.

use object::{Object, ObjectSection};

const ELF_MAGIC: [u8; 4] = *b"\x7fELF";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// `#!<interpreter> ...`: the interpreter's own closure must be chased.
    Interpreter(String),
    /// ELF magic present; the caller should check `elf_has_dynamic_section`
    /// on the full file before invoking the dynamic linker.
    Elf,
    Inert,
}

/// Classify a regular file from its first `LINE_MAX` bytes (the caller
/// reads this prefix; this function never touches a file descriptor).
pub fn classify_regular_file(head: &[u8]) -> Classification {
    if head.len() >= 2 && &head[0..2] == b"#!" {
        return match extract_interpreter(&head[2..]) {
            Some(interp) => Classification::Interpreter(interp),
            None => Classification::Inert,
        };
    }
    if head.len() >= 4 && head[0..4] == ELF_MAGIC {
        return Classification::Elf;
    }
    Classification::Inert
}

/// First whitespace-delimited token after `#!`, skipping leading whitespace.
fn extract_interpreter(rest: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(rest);
    let trimmed = text.trim_start();
    let token = trimmed.split_whitespace().next()?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Whether a full ELF file has a `.dynamic` section, i.e. is a dynamic
/// executable or shared object whose dependencies should be resolved
/// (spec §4.10: "the ELF has a dynamic section").
pub fn elf_has_dynamic_section(contents: &[u8]) -> bool {
    match object::File::parse(contents) {
        Ok(file) => file.section_by_name(".dynamic").is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
