//! Pass-through checker options
//!
//! Submitters may forward a small, closed set of flags to the checker:
//! a constant override (`--const`/`-c`) and a module alias (`--module`/`-m`),
//! each taking exactly one `key=value` argument. Everything else is rejected
//! here, before any command line is built or any process is spawned.

use crate::{DrydockError, Result};

/// Validated pass-through options for one checker run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOptions {
    constant: Option<String>,
    module: Option<String>,
}

impl CheckOptions {
    /// Parse a raw options string into the closed option schema.
    ///
    /// Repeated occurrences of a flag keep the last value. Fails with
    /// [`DrydockError::InvalidOption`] naming the offending token for any
    /// unknown flag, bare positional, missing value, or value that is not
    /// `key=value` shaped.
    pub fn parse(options: &str) -> Result<Self> {
        let mut parsed = Self::default();
        let mut tokens = split_args(options).into_iter();

        while let Some(token) = tokens.next() {
            let (flag, inline_value) = match token.split_once('=') {
                Some((flag, value)) if flag.starts_with('-') => {
                    (flag.to_owned(), Some(value.to_owned()))
                }
                _ => (token.clone(), None),
            };

            let slot = match flag.as_str() {
                "--const" | "-c" => &mut parsed.constant,
                "--module" | "-m" => &mut parsed.module,
                _ => return Err(DrydockError::InvalidOption(flag)),
            };

            let value = match inline_value.or_else(|| tokens.next()) {
                Some(value) => value,
                None => {
                    return Err(DrydockError::InvalidOption(format!(
                        "{flag} requires a value"
                    )));
                }
            };
            if !is_assignment(&value) {
                return Err(DrydockError::InvalidOption(format!(
                    "{flag} expects key=value, got \"{value}\""
                )));
            }
            *slot = Some(value);
        }

        Ok(parsed)
    }

    /// Arguments to append to the checker invocation, in declaration order
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(constant) = &self.constant {
            args.push(String::from("--const"));
            args.push(constant.clone());
        }
        if let Some(module) = &self.module {
            args.push(String::from("--module"));
            args.push(module.clone());
        }
        args
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constant.is_none() && self.module.is_none()
    }
}

fn is_assignment(value: &str) -> bool {
    matches!(value.split_once('='), Some((key, _)) if !key.is_empty())
}

/// Split an options string into tokens, honoring single and double quotes
fn split_args(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}
