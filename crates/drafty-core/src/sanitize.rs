//! Log sanitizing for untrusted text.
//!
//! GitHub Actions treats lines containing `::command::` sequences as workflow
//! commands, so a crafted commit message could add annotations, mask values,
//! or set outputs just by being logged. Every commit message or rendered note
//! goes through [`for_log`] before reaching a tracing event.

use std::borrow::Cow;

const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Break every `::` by inserting a zero-width space between the colons.
pub fn for_log(input: &str) -> Cow<'_, str> {
    if !input.contains("::") {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 8);
    let mut prev = None;
    for ch in input.chars() {
        if ch == ':' && prev == Some(':') {
            out.push(ZERO_WIDTH_SPACE);
        }
        out.push(ch);
        prev = Some(ch);
    }
    Cow::Owned(out)
}
