//! Ordered pattern matching over log lines

use crate::error::{Result, ScannerError};
use log::warn;
use regex::Regex;

/// Compiled patterns, applied in configuration order
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compile every pattern; the first failure aborts construction
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let re = Regex::new(pattern).map_err(|source| ScannerError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            // captures_len counts the implicit whole-match group
            if re.captures_len() < 2 {
                warn!("pattern '{}' has no capturing group and will never match", pattern);
            }
            compiled.push(re);
        }
        Ok(Self { patterns: compiled })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First capture group of every matching pattern, in pattern order
    ///
    /// Each pattern contributes at most one token, so the same address may
    /// appear more than once when several patterns match it.
    pub fn extract<'a>(&self, line: &'a str) -> Vec<&'a str> {
        self.patterns
            .iter()
            .filter_map(|re| re.captures(line))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect()
    }
}
