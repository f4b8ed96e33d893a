//! Path pattern matching.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{Result, RouterError};
use crate::request::PathParams;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder regex is valid"));
static UNFILLED_OPTIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/?\{[^}/]+\?\}").expect("optional regex is valid"));
static UNFILLED_REQUIRED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}/]+\}").expect("required regex is valid"));
static SLASH_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/{2,}").expect("slash regex is valid"));

/// A compiled path pattern for matching URLs.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Compiled regex for matching.
    regex: Regex,
    /// Parameter names in order.
    param_names: Vec<String>,
}

impl PathPattern {
    /// Compiles a path pattern.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/{id}` - Required parameter
    /// - `/users/{id?}` - Optional parameter; the preceding slash is optional too
    ///
    /// Parameters match a single segment. Literal text is matched verbatim
    /// and there is no implicit trailing slash.
    ///
    /// # Example
    ///
    /// ```
    /// use switchyard::PathPattern;
    ///
    /// let pattern = PathPattern::compile("/posts/{id}/comments/{comment_id?}").unwrap();
    /// let params = pattern.match_path("/posts/123/comments").unwrap();
    /// assert_eq!(params.get("id"), Some("123"));
    /// assert_eq!(params.get("comment_id"), None);
    /// ```
    pub fn compile(pattern: &str) -> Result<Self> {
        let mut regex_str = String::from("^");
        let mut param_names = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(pattern) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let literal = &pattern[last..whole.start()];
            last = whole.end();

            match inner.as_str().strip_suffix('?') {
                Some(name) => match literal.strip_suffix('/') {
                    Some(head) => {
                        regex_str.push_str(&regex::escape(head));
                        regex_str.push_str(&format!("(?:/(?P<{name}>[^/]+))?"));
                    }
                    None => {
                        regex_str.push_str(&regex::escape(literal));
                        regex_str.push_str(&format!("(?P<{name}>[^/]+)?"));
                    }
                },
                None => {
                    regex_str.push_str(&regex::escape(literal));
                    regex_str.push_str(&format!("(?P<{}>[^/]+)", inner.as_str()));
                }
            }

            param_names.push(inner.as_str().trim_end_matches('?').to_string());
        }

        regex_str.push_str(&regex::escape(&pattern[last..]));
        regex_str.push('$');

        let regex = Regex::new(&regex_str)
            .map_err(|e| RouterError::InvalidPattern(format!("{pattern}: {e}")))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            param_names,
        })
    }

    /// Attempts to match a path against this pattern.
    ///
    /// Returns extracted parameters if the path matches. Optional parameters
    /// absent from the path are left out.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;

        let mut params = PathParams::new();
        for name in &self.param_names {
            if let Some(value) = caps.name(name) {
                params.insert(name.clone(), value.as_str());
            }
        }

        Some(params)
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the parameter names in pattern order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Generates a path from parameters. See [`reverse`].
    pub fn reverse(&self, params: &HashMap<String, String>) -> Option<String> {
        reverse(&self.pattern, params)
    }
}

/// Generates a path from a raw pattern and parameters.
///
/// Unfilled optional placeholders are dropped together with their leading
/// slash, slash runs collapse, and a trailing slash is removed unless the
/// result is the root. Returns `None` when a required placeholder is left.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use switchyard::path::reverse;
///
/// let params: HashMap<String, String> =
///     [("id".to_string(), "42".to_string())].into_iter().collect();
/// assert_eq!(reverse("/base//{id}//{opt?}/", &params), Some("/base/42".to_string()));
/// ```
pub fn reverse(pattern: &str, params: &HashMap<String, String>) -> Option<String> {
    let filled = PLACEHOLDER.replace_all(pattern, |caps: &Captures<'_>| {
        let name = caps[1].trim_end_matches('?');
        match params.get(name) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    });

    let stripped = UNFILLED_OPTIONAL.replace_all(&filled, "");
    if UNFILLED_REQUIRED.is_match(&stripped) {
        return None;
    }

    let mut path = SLASH_RUNS.replace_all(&stripped, "/").into_owned();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    if path.is_empty() {
        path.push('/');
    }

    Some(path)
}
