//! `application/x-www-form-urlencoded` body construction.
//!
//! Values are quoted the way `quote_plus` does: spaces become `+`, unreserved
//! characters (alphanumerics, `-`, `_`, `.`, `~`) pass through, and
//! everything else is percent-encoded as UTF-8.

use std::fmt::Write as _;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Bytes left as-is besides ASCII alphanumerics.
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b' ');

/// Quote a single key or value.
pub(super) fn quote_plus(input: &str) -> String {
    utf8_percent_encode(input, FORM_VALUE)
        .to_string()
        .replace(' ', "+")
}

/// Accumulates `key=value` pairs joined by `&`.
#[derive(Default)]
pub(super) struct FormBody {
    body: String,
}

impl FormBody {
    pub(super) fn push(&mut self, key: &str, value: &str) {
        if !self.body.is_empty() {
            self.body.push('&');
        }
        let _ = write!(self.body, "{}={}", quote_plus(key), quote_plus(value));
    }

    pub(super) fn finish(self) -> String {
        self.body
    }
}
