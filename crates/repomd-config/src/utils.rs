use std::{env, iter::Peekable, path::PathBuf, str::Chars};

use crate::error::{ConfigError, Result};

/// Returns the user's home directory from `HOME`, or `/` if it is unset.
pub fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Returns `$XDG_CONFIG_HOME`, defaulting to `$HOME/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Resolves a path that may contain `~`, `$VAR` or `${VAR}`.
///
/// A leading `~` expands to the home directory. Relative results are joined
/// onto the current working directory.
///
/// # Errors
///
/// Fails if the path is empty, a `${` expression is not closed, or a
/// referenced variable is not set.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ConfigError::EmptyPath);
    }

    let resolved = PathBuf::from(expand_variables(path)?);
    if resolved.is_absolute() {
        return Ok(resolved);
    }

    env::current_dir()
        .map(|cwd| cwd.join(resolved))
        .map_err(ConfigError::IoError)
}

fn expand_variables(path: &str) -> Result<String> {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let name = consume_braced(&mut chars)?;
                result.push_str(&lookup_var(&name, path)?);
            }
            '$' => {
                let name = consume_name(&mut chars);
                if name.is_empty() {
                    result.push('$');
                } else {
                    result.push_str(&lookup_var(&name, path)?);
                }
            }
            '~' if result.is_empty() => result.push_str(&home_dir().to_string_lossy()),
            _ => result.push(c),
        }
    }

    Ok(result)
}

fn consume_braced(chars: &mut Peekable<Chars>) -> Result<String> {
    let mut name = String::new();
    for c in chars.by_ref() {
        if c == '}' {
            return Ok(name);
        }
        name.push(c);
    }
    Err(ConfigError::UnclosedVariable(format!("${{{name}")))
}

fn consume_name(chars: &mut Peekable<Chars>) -> String {
    let mut name = String::new();
    while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
        name.push(c);
    }
    name
}

fn lookup_var(name: &str, input: &str) -> Result<String> {
    match name {
        "HOME" => Ok(home_dir().to_string_lossy().into_owned()),
        "XDG_CONFIG_HOME" => Ok(xdg_config_home().to_string_lossy().into_owned()),
        _ => {
            env::var(name).map_err(|_| {
                ConfigError::MissingEnvVar {
                    var: name.to_string(),
                    input: input.to_string(),
                }
            })
        }
    }
}

/// Parses a duration such as `30s`, `2m` or `1d2h3m4s` into milliseconds.
///
/// Returns `None` for unknown units, a trailing number without a unit, or
/// overflow.
pub fn parse_duration(input: &str) -> Option<u128> {
    let mut total: u128 = 0;
    let mut chars = input.chars().peekable();

    while chars.peek().is_some() {
        let mut digits = String::new();
        while let Some(c) = chars.next_if(char::is_ascii_digit) {
            digits.push(c);
        }
        if digits.is_empty() {
            return None;
        }

        let value: u128 = digits.parse().ok()?;
        let unit: u128 = match chars.next()? {
            's' => 1_000,
            'm' => 60_000,
            'h' => 3_600_000,
            'd' => 86_400_000,
            _ => return None,
        };

        total = total.checked_add(value.checked_mul(unit)?)?;
    }

    Some(total)
}
