use std::str::FromStr;

use crate::{errors::Error, Result};

/// Literal prefix a channel post must start with to be relayed.
pub const MARKER: &str = "[Alpha]";

/// One `pattern -> replacement` rewrite. Order in the table is priority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub pattern: String,
    pub replacement: String,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Built-in rules, highest priority first.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new("发布新推文", "posted a new tweet"),
        Rule::new("转发了推文", "retweeted a tweet"),
        Rule::new("引用了推文", "quoted a tweet"),
    ]
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransformMode {
    /// Keep the marker, rewrite the first matching rule, drop unmatched posts.
    #[default]
    Replace,
    /// Strip the marker and bracket the author name on the first line.
    /// Unmatched posts are forwarded with only the marker removed.
    Bracket,
}

impl FromStr for TransformMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "bracket" => Ok(Self::Bracket),
            other => Err(Error::Config(format!(
                "unknown TRANSFORM_MODE '{other}' (expected 'replace' or 'bracket')"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TransformEngine {
    marker: String,
    rules: Vec<Rule>,
    mode: TransformMode,
}

impl TransformEngine {
    pub fn new(marker: impl Into<String>, rules: Vec<Rule>, mode: TransformMode) -> Self {
        // An empty pattern would match everything and shadow later rules.
        let rules = rules.into_iter().filter(|r| !r.pattern.is_empty()).collect();
        Self {
            marker: marker.into(),
            rules,
            mode,
        }
    }

    pub fn with_default_rules(mode: TransformMode) -> Self {
        Self::new(MARKER, default_rules(), mode)
    }

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    /// Rewrite an eligible post. `None` means the post must not be relayed.
    pub fn transform(&self, text: &str) -> Option<String> {
        if !text.starts_with(&self.marker) {
            return None;
        }
        match self.mode {
            TransformMode::Replace => self.replace_first_rule(text),
            TransformMode::Bracket => self.bracket_first_line(&text[self.marker.len()..]),
        }
    }

    fn first_rule_in(&self, text: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| text.contains(&r.pattern))
    }

    fn replace_first_rule(&self, text: &str) -> Option<String> {
        let rule = self.first_rule_in(text)?;
        Some(text.replace(&rule.pattern, &rule.replacement))
    }

    fn bracket_first_line(&self, body: &str) -> Option<String> {
        let body = body.trim();
        let (first, rest) = match body.split_once('\n') {
            Some((first, rest)) => (first.trim(), Some(rest)),
            None => (body, None),
        };

        let mut out = match self.first_rule_in(first) {
            Some(rule) => {
                let start = first.find(&rule.pattern).unwrap_or(0);
                let name = first[..start].trim();
                let tail = first[start..].replace(&rule.pattern, &rule.replacement);
                format!("[{name}] {tail}")
            }
            None => first.to_string(),
        };

        if let Some(rest) = rest {
            out.push('\n');
            out.push_str(rest.trim());
        }

        if out.trim().is_empty() {
            return None;
        }
        Some(out)
    }
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::with_default_rules(TransformMode::default())
    }
}
