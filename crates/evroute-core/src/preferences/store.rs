//! Settings persistence
//!
//! String-valued key/value storage for preferences. [`PropertiesSettings`]
//! keeps them in a `key=value` properties file:
//! - `#`/`!` comment lines are skipped
//! - `=` or `:` separates key and value
//! - backslash escapes (`\t`, `\n`, `\\`, `\=`, `\:`, `\uXXXX`) are honored

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::PreferenceError;

/// String-valued settings storage
pub trait SettingsStore: Send {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value and persist it
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Settings kept in memory only
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl MemorySettings {
    /// Create empty settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings with initial values
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted to a properties file, rewritten on every `set`
#[derive(Debug, Clone)]
pub struct PropertiesSettings {
    path: PathBuf,
    /// Entries in file order
    entries: Vec<(String, String)>,
}

impl PropertiesSettings {
    /// Open a properties file; a missing file starts empty
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PreferenceError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => parse_entries(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "Settings opened");
        Ok(Self { path, entries })
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> io::Result<()> {
        let mut content = String::new();
        for (key, value) in &self.entries {
            let _ = writeln!(content, "{}={}", escape(key, true), escape(value, false));
        }
        fs::write(&self.path, content)
    }
}

impl SettingsStore for PropertiesSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
        self.save()?;
        Ok(())
    }
}

/// Parse properties content; later duplicates replace earlier values
fn parse_entries(content: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let (key, value) = split_key_value(trimmed);
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => entries.push((key, value)),
        }
    }

    entries
}

/// Split at the first unescaped `=` or `:`
fn split_key_value(line: &str) -> (String, String) {
    let mut prev_backslash = false;

    for (i, c) in line.char_indices() {
        if !prev_backslash && (c == '=' || c == ':') {
            let key = unescape(line[..i].trim_end());
            let value = unescape(line[i + 1..].trim_start());
            return (key, value);
        }
        prev_backslash = c == '\\' && !prev_backslash;
    }

    (unescape(line), String::new())
}

fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => result.push('\t'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    result.push(ch);
                }
            }
            Some(other) => result.push(other),
            None => {}
        }
    }

    result
}

fn escape(s: &str, is_key: bool) -> String {
    let mut result = String::with_capacity(s.len());

    for (i, c) in s.chars().enumerate() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\t' => result.push_str("\\t"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '=' | ':' if is_key => {
                result.push('\\');
                result.push(c);
            }
            ' ' if is_key || i == 0 => result.push_str("\\ "),
            _ => result.push(c),
        }
    }

    result
}
