use crate::ConfigError;
use regex::Regex;
use url::Url;

/// A single exclusion rule from the configuration
///
/// Three syntaxes are accepted:
/// 1. `re:<regex>`: matched anywhere in the candidate
/// 2. A pattern containing `*`, `?` or `[`: shell-style glob over the whole candidate
/// 3. Anything else: a literal URL or path prefix in directory form
///
/// A rule excludes the URL it names and everything below it.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::ExclusionRule;
/// use url::Url;
///
/// let rule = ExclusionRule::parse("https://example.com/docs/private").unwrap();
/// let url = Url::parse("https://example.com/docs/private/keys.html").unwrap();
/// assert!(rule.matches(&url));
/// ```
#[derive(Debug, Clone)]
pub struct ExclusionRule {
    source: String,
    kind: RuleKind,
}

#[derive(Debug, Clone)]
enum RuleKind {
    Prefix(String),
    Pattern(Regex),
}

impl ExclusionRule {
    /// Compiles a rule string
    pub fn parse(rule: &str) -> Result<Self, ConfigError> {
        let trimmed = rule.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidPattern(
                "exclusion rule cannot be empty".to_string(),
            ));
        }

        let kind = if let Some(pattern) = trimmed.strip_prefix("re:") {
            let regex = Regex::new(pattern)
                .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", rule, e)))?;
            RuleKind::Pattern(regex)
        } else if is_glob(trimmed) {
            let regex = Regex::new(&glob_to_regex(trimmed))
                .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", rule, e)))?;
            RuleKind::Pattern(regex)
        } else {
            RuleKind::Prefix(directory_form(trimmed))
        };

        Ok(Self {
            source: rule.to_string(),
            kind,
        })
    }

    /// The rule as written in the configuration
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Resolves a relative literal rule against the crawl root
    ///
    /// Absolute URLs, absolute paths and patterns are returned unchanged.
    pub fn resolve_against(self, base: &Url) -> Self {
        match &self.kind {
            RuleKind::Prefix(prefix) if !prefix.starts_with('/') && !has_scheme(prefix) => {
                match base.join(prefix) {
                    Ok(joined) => Self {
                        kind: RuleKind::Prefix(directory_form(joined.as_str())),
                        source: self.source,
                    },
                    Err(_) => self,
                }
            }
            _ => self,
        }
    }

    /// Returns true if the rule excludes `url`
    pub fn matches(&self, url: &Url) -> bool {
        match &self.kind {
            RuleKind::Prefix(prefix) => {
                let candidate = if prefix.starts_with('/') {
                    url.path()
                } else {
                    url.as_str()
                };
                directory_form(candidate).starts_with(prefix.as_str())
            }
            RuleKind::Pattern(regex) => candidates(url).iter().any(|c| regex.is_match(c)),
        }
    }
}

/// The compiled exclusion list for one crawl
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    rules: Vec<ExclusionRule>,
}

impl ExclusionRules {
    /// Compiles every rule and resolves relative literals against `base`
    pub fn compile(rules: &[String], base: &Url) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(|r| ExclusionRule::parse(r).map(|rule| rule.resolve_against(base)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Returns the first rule that excludes `url`
    pub fn matching_rule(&self, url: &Url) -> Option<&ExclusionRule> {
        self.rules.iter().find(|rule| rule.matches(url))
    }

    pub fn is_excluded(&self, url: &Url) -> bool {
        self.matching_rule(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn is_glob(rule: &str) -> bool {
    rule.contains(['*', '?', '['])
}

fn has_scheme(rule: &str) -> bool {
    rule.starts_with("http://") || rule.starts_with("https://")
}

fn directory_form(value: &str) -> String {
    if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{}/", value)
    }
}

/// The full URL, its path, and every ancestor directory of both
fn candidates(url: &Url) -> Vec<String> {
    let path = url.path();
    let origin = url.origin().ascii_serialization();

    let mut out = vec![url.as_str().to_string(), path.to_string()];
    let mut end = path.len();
    while let Some(idx) = path[..end].rfind('/') {
        let ancestor = &path[..=idx];
        out.push(ancestor.to_string());
        out.push(format!("{}{}", origin, ancestor));
        if idx == 0 {
            break;
        }
        end = idx;
    }
    out
}

/// Translates a shell-style glob into an anchored regex
fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::with_capacity(glob.len() * 2);
    regex.push('^');

    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                // `**` is the same as `*`
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                regex.push_str(".*");
            }
            '?' => regex.push('.'),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    if inner == '\\' || inner == '[' {
                        class.push('\\');
                    }
                    class.push(inner);
                }
                if closed {
                    regex.push('[');
                    regex.push_str(&class);
                    regex.push(']');
                } else {
                    // Unterminated class is a literal bracket
                    regex.push_str(&regex::escape("["));
                    regex.push_str(&regex::escape(&class));
                }
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }

    regex.push('$');
    regex
}
