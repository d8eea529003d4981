//! Build-argument environment and variable substitution
//!
//! Binds ARG names to values (caller overrides, then Dockerfile defaults,
//! then the automatic platform args) and expands `$name` / `${name}`
//! references in FROM lines.

use crate::error::{WarmError, WarmResult};
use crate::platform::Platform;
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// Parse `NAME=VALUE` overrides in order; later entries win on collision
pub fn parse_build_args(args: &[String]) -> WarmResult<Vec<(String, String)>> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((name, value)) if is_valid_name(name) => {
                Ok((name.to_string(), value.to_string()))
            }
            _ => Err(WarmError::InvalidBuildArg(arg.clone())),
        })
        .collect()
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if is_name_start(c)) && chars.all(is_name_char)
}

/// Remove one pair of matching surrounding quotes
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Name → value bindings scoped to one Dockerfile parse
#[derive(Debug, Clone, Default)]
pub struct ArgEnv {
    overrides: HashMap<String, String>,
    declared: HashMap<String, Option<String>>,
    automatic: HashMap<String, String>,
}

impl ArgEnv {
    /// Empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment seeded with the automatic `TARGET*` / `BUILD*` platform args
    pub fn for_platform(platform: &Platform) -> Self {
        let automatic = platform
            .build_args("TARGET")
            .into_iter()
            .chain(platform.build_args("BUILD"))
            .collect();
        Self {
            automatic,
            ..Self::default()
        }
    }

    /// Apply caller overrides (`NAME=VALUE`), later entries winning
    pub fn with_overrides(mut self, args: &[String]) -> WarmResult<Self> {
        for (name, value) in parse_build_args(args)? {
            self.overrides.insert(name, value);
        }
        Ok(self)
    }

    /// Declare an `ARG`, expanding its default against earlier bindings
    pub fn declare(&mut self, name: &str, default: Option<&str>) -> WarmResult<()> {
        let value = match default {
            Some(raw) => Some(self.substitute(unquote(raw))?),
            None => None,
        };
        // A bare redeclaration keeps an earlier default
        if value.is_some() || !self.declared.contains_key(name) {
            self.declared.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Effective value: override, then declared default, then automatic arg
    pub fn get(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.overrides.get(name) {
            return Some(value.as_str());
        }
        if let Some(Some(value)) = self.declared.get(name) {
            return Some(value.as_str());
        }
        self.automatic.get(name).map(String::as_str)
    }

    /// Expand every variable reference in `text`.
    ///
    /// Fails on a reference with no binding and no fallback word.
    pub fn substitute(&self, text: &str) -> WarmResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'$') => {
                    chars.next();
                    out.push('$');
                }
                '$' => match chars.peek().copied() {
                    Some('{') => {
                        chars.next();
                        let body = read_braced(&mut chars, text)?;
                        out.push_str(&self.expand_braced(&body, text)?);
                    }
                    Some(next) if is_name_start(next) => {
                        let mut name = String::new();
                        while let Some(&c) = chars.peek() {
                            if !is_name_char(c) {
                                break;
                            }
                            name.push(c);
                            chars.next();
                        }
                        out.push_str(self.require(&name, text)?);
                    }
                    _ => out.push('$'),
                },
                other => out.push(other),
            }
        }

        Ok(out)
    }

    fn require(&self, name: &str, text: &str) -> WarmResult<&str> {
        self.get(name).ok_or_else(|| WarmError::UnresolvedVariable {
            name: name.to_string(),
            text: text.to_string(),
        })
    }

    fn expand_braced(&self, body: &str, text: &str) -> WarmResult<String> {
        let name_len = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
        let (name, modifier) = body.split_at(name_len);

        if !is_valid_name(name) {
            return Err(WarmError::BadSubstitution {
                text: text.to_string(),
                reason: format!("invalid variable name '{}'", name),
            });
        }

        let value = self.get(name);
        let (op, word) = if let Some(word) = modifier.strip_prefix(":-") {
            (":-", word)
        } else if let Some(word) = modifier.strip_prefix(":+") {
            (":+", word)
        } else if let Some(word) = modifier.strip_prefix('-') {
            ("-", word)
        } else if let Some(word) = modifier.strip_prefix('+') {
            ("+", word)
        } else if modifier.is_empty() {
            ("", "")
        } else {
            return Err(WarmError::BadSubstitution {
                text: text.to_string(),
                reason: format!("unsupported modifier '{}'", modifier),
            });
        };

        match op {
            ":-" => match value {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => self.substitute(word),
            },
            "-" => match value {
                Some(v) => Ok(v.to_string()),
                None => self.substitute(word),
            },
            ":+" => match value {
                Some(v) if !v.is_empty() => self.substitute(word),
                _ => Ok(String::new()),
            },
            "+" => match value {
                Some(_) => self.substitute(word),
                None => Ok(String::new()),
            },
            _ => self.require(name, text).map(str::to_string),
        }
    }
}

/// Read up to the `}` closing a `${`, allowing nested `${...}` in the word
fn read_braced(chars: &mut Peekable<Chars<'_>>, text: &str) -> WarmResult<String> {
    let mut body = String::new();
    let mut depth = 0usize;

    for c in chars.by_ref() {
        match c {
            '{' => {
                depth += 1;
                body.push(c);
            }
            '}' if depth == 0 => return Ok(body),
            '}' => {
                depth -= 1;
                body.push(c);
            }
            _ => body.push(c),
        }
    }

    Err(WarmError::BadSubstitution {
        text: text.to_string(),
        reason: "missing closing '}'".to_string(),
    })
}
