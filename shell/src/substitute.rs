//! `$NAME` expansion applied to a raw line before tokenization.
//!
//! A name is a maximal run of ASCII letters, digits and `_`. Unset variables
//! expand to the empty string; a `$` with no name after it stays as is.
//! There is no way to escape `$`, and since this runs before the lexer,
//! quoting does not protect against expansion either.

use crate::env::Environment;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z0-9_]+)").expect("variable pattern is valid"));

/// Replace every `$NAME` in `line` with its value from `env`.
pub fn substitute(line: &str, env: &Environment) -> String {
    VARIABLE
        .replace_all(line, |caps: &Captures| {
            env.get_var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
