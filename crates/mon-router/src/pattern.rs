//! Route pattern compilation and reverse filling.
//!
//! Pattern syntax:
//!
//! - literal segments match themselves: `/users/list`
//! - `{name}` captures one path segment: `/users/{id}`
//! - `{name:regex}` constrains the capture: `/users/{id:\d+}`
//! - a trailing `[...]` group is optional: `/posts[/{page}]`
//! - the lone pattern `*` matches every path (the fallback route)
//!
//! Static patterns are matched by exact path comparison; parametric patterns
//! compile to a single anchored regex with one named capture per variable, so
//! a constraint regex carrying groups of its own cannot shift the variables
//! that follow it.

use std::collections::HashMap;

use regex::Regex;

use crate::RouterError;

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    kind: PatternKind,
    params: Vec<String>,
}

#[derive(Debug, Clone)]
enum PatternKind {
    /// Matches by exact path equality.
    Static,
    /// Matches via an anchored regex with one named capture per variable.
    Dynamic(Regex),
    /// The `*` fallback, matching every path.
    Wildcard,
}

/// One parsed piece of a pattern part.
enum Token {
    Literal(String),
    Param { name: String, regex: Option<String> },
}

impl Pattern {
    /// Compile a pattern string.
    pub fn compile(raw: &str) -> Result<Self, RouterError> {
        if raw == "*" {
            return Ok(Self {
                raw: raw.to_owned(),
                kind: PatternKind::Wildcard,
                params: Vec::new(),
            });
        }

        let (base, optional) =
            split_optional(raw).map_err(|reason| RouterError::Pattern {
                pattern: raw.to_owned(),
                reason,
            })?;

        let base_tokens = tokenize(base).map_err(|reason| RouterError::Pattern {
            pattern: raw.to_owned(),
            reason,
        })?;
        let optional_tokens = match optional {
            Some(inner) => Some(tokenize(inner).map_err(|reason| RouterError::Pattern {
                pattern: raw.to_owned(),
                reason,
            })?),
            None => None,
        };

        let is_static = optional_tokens.is_none()
            && base_tokens
                .iter()
                .all(|t| matches!(t, Token::Literal(_)));
        if is_static {
            return Ok(Self {
                raw: raw.to_owned(),
                kind: PatternKind::Static,
                params: Vec::new(),
            });
        }

        let mut source = String::from("^");
        let mut params = Vec::new();
        append_regex(&mut source, &mut params, &base_tokens);
        if let Some(tokens) = &optional_tokens {
            source.push_str("(?:");
            append_regex(&mut source, &mut params, tokens);
            source.push_str(")?");
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| RouterError::Pattern {
            pattern: raw.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            raw: raw.to_owned(),
            kind: PatternKind::Dynamic(regex),
            params,
        })
    }

    /// The original pattern string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether this pattern matches by exact path comparison.
    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self.kind, PatternKind::Static)
    }

    /// Whether this is the `*` fallback pattern.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, PatternKind::Wildcard)
    }

    /// The variable names captured by this pattern, in order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Match a request path, returning the extracted variables on success.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        match &self.kind {
            PatternKind::Static => (path == self.raw).then(HashMap::new),
            PatternKind::Wildcard => Some(HashMap::new()),
            PatternKind::Dynamic(regex) => {
                let captures = regex.captures(path)?;
                let mut vars = HashMap::new();
                for name in &self.params {
                    // Captures inside an unmatched optional group are absent.
                    if let Some(m) = captures.name(name) {
                        vars.insert(name.clone(), m.as_str().to_owned());
                    }
                }
                Some(vars)
            }
        }
    }

    /// Reverse-build a concrete path from this pattern and a variable map.
    ///
    /// The optional trailing group is included only when every variable it
    /// references is present in `vars`.
    pub fn fill(&self, vars: &HashMap<String, String>) -> Result<String, RouterError> {
        if self.is_wildcard() {
            return Ok(self.raw.clone());
        }

        let (base, optional) = split_optional(&self.raw).map_err(|reason| {
            RouterError::Pattern {
                pattern: self.raw.clone(),
                reason,
            }
        })?;

        let mut out = String::new();
        for token in tokenize(base).map_err(|reason| RouterError::Pattern {
            pattern: self.raw.clone(),
            reason,
        })? {
            match token {
                Token::Literal(lit) => out.push_str(&lit),
                Token::Param { name, .. } => match vars.get(&name) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(RouterError::MissingVar {
                            pattern: self.raw.clone(),
                            var: name,
                        });
                    }
                },
            }
        }

        if let Some(inner) = optional {
            let tokens = tokenize(inner).map_err(|reason| RouterError::Pattern {
                pattern: self.raw.clone(),
                reason,
            })?;
            let complete = tokens.iter().all(|t| match t {
                Token::Literal(_) => true,
                Token::Param { name, .. } => vars.contains_key(name),
            });
            if complete {
                for token in tokens {
                    match token {
                        Token::Literal(lit) => out.push_str(&lit),
                        Token::Param { name, .. } => {
                            out.push_str(vars.get(&name).map(String::as_str).unwrap_or(""));
                        }
                    }
                }
            }
        }

        Ok(out)
    }
}

/// Split a pattern into its base and an optional trailing `[...]` group.
fn split_optional(raw: &str) -> Result<(&str, Option<&str>), String> {
    let Some(open) = raw.find('[') else {
        return Ok((raw, None));
    };
    if !raw.ends_with(']') {
        return Err("optional group `[` is not closed at the end of the pattern".to_owned());
    }
    let inner = &raw[open + 1..raw.len() - 1];
    if inner.contains('[') {
        return Err("nested optional groups are not supported".to_owned());
    }
    Ok((&raw[..open], Some(inner)))
}

/// Split a pattern part into literal and `{name[:regex]}` tokens.
fn tokenize(part: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = part.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '{' {
            if c == '}' {
                return Err("unbalanced `}` in pattern".to_owned());
            }
            literal.push(c);
            continue;
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }

        // Collect up to the matching close brace; constraint regexes may
        // contain braces of their own (e.g. `\d{3}`).
        let mut body = String::new();
        let mut depth = 1usize;
        for c in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            body.push(c);
        }
        if depth != 0 {
            return Err("unbalanced `{` in pattern".to_owned());
        }

        let (name, regex) = match body.split_once(':') {
            Some((name, regex)) => (name.to_owned(), Some(regex.to_owned())),
            None => (body, None),
        };
        if name.is_empty() {
            return Err("empty variable name in pattern".to_owned());
        }
        tokens.push(Token::Param { name, regex });
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

/// Append the regex source for a token sequence, recording variable names.
fn append_regex(source: &mut String, params: &mut Vec<String>, tokens: &[Token]) {
    for token in tokens {
        match token {
            Token::Literal(lit) => source.push_str(&regex::escape(lit)),
            Token::Param { name, regex } => {
                params.push(name.clone());
                source.push_str("(?P<");
                source.push_str(name);
                source.push('>');
                source.push_str(regex.as_deref().unwrap_or("[^/]+"));
                source.push(')');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_should_compile_static_pattern() {
        let pattern = Pattern::compile("/users/list").expect("valid pattern");
        assert!(pattern.is_static());
        assert!(pattern.match_path("/users/list").is_some());
        assert!(pattern.match_path("/users/42").is_none());
    }

    #[test]
    fn test_should_capture_named_segment() {
        let pattern = Pattern::compile("/users/{id}").expect("valid pattern");
        let matched = pattern.match_path("/users/42").expect("should match");
        assert_eq!(matched.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_should_not_match_across_segments() {
        let pattern = Pattern::compile("/users/{id}").expect("valid pattern");
        assert!(pattern.match_path("/users/42/posts").is_none());
    }

    #[test]
    fn test_should_enforce_regex_constraint() {
        let pattern = Pattern::compile(r"/users/{id:\d+}").expect("valid pattern");
        assert!(pattern.match_path("/users/42").is_some());
        // A constrained variable must not come back as garbage.
        assert!(pattern.match_path("/users/abc").is_none());
    }

    #[test]
    fn test_should_allow_braces_inside_constraint() {
        let pattern = Pattern::compile(r"/codes/{code:\d{3}}").expect("valid pattern");
        assert!(pattern.match_path("/codes/123").is_some());
        assert!(pattern.match_path("/codes/1234").is_none());
    }

    #[test]
    fn test_should_keep_vars_aligned_past_grouped_constraint() {
        // A constraint regex with its own capture group must not shift the
        // variables registered after it onto the wrong capture.
        let pattern = Pattern::compile(r"/a/{x:(\d)}/{y}").expect("valid pattern");
        let matched = pattern.match_path("/a/7/hello").expect("should match");
        assert_eq!(matched.get("x").map(String::as_str), Some("7"));
        assert_eq!(matched.get("y").map(String::as_str), Some("hello"));
    }

    #[test]
    fn test_should_match_optional_trailing_group() {
        let pattern = Pattern::compile("/posts[/{page}]").expect("valid pattern");

        let without = pattern.match_path("/posts").expect("should match");
        assert!(without.is_empty());

        let with = pattern.match_path("/posts/3").expect("should match");
        assert_eq!(with.get("page").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_should_reject_unclosed_optional_group() {
        let err = Pattern::compile("/posts[/{page}").unwrap_err();
        assert!(matches!(err, RouterError::Pattern { .. }));
    }

    #[test]
    fn test_should_reject_unbalanced_braces() {
        assert!(Pattern::compile("/users/{id").is_err());
        assert!(Pattern::compile("/users/id}").is_err());
        assert!(Pattern::compile("/users/{}").is_err());
    }

    #[test]
    fn test_should_fill_pattern_from_vars() {
        let pattern = Pattern::compile(r"/users/{id:\d+}").expect("valid pattern");
        let url = pattern.fill(&vars(&[("id", "42")])).expect("should fill");
        assert_eq!(url, "/users/42");
    }

    #[test]
    fn test_should_fail_fill_on_missing_var() {
        let pattern = Pattern::compile("/users/{id}").expect("valid pattern");
        let err = pattern.fill(&HashMap::new()).unwrap_err();
        assert!(matches!(err, RouterError::MissingVar { var, .. } if var == "id"));
    }

    #[test]
    fn test_should_drop_optional_group_when_vars_absent() {
        let pattern = Pattern::compile("/posts[/{page}]").expect("valid pattern");
        assert_eq!(pattern.fill(&HashMap::new()).expect("fill"), "/posts");
        assert_eq!(
            pattern.fill(&vars(&[("page", "3")])).expect("fill"),
            "/posts/3",
        );
    }

    #[test]
    fn test_should_round_trip_build_and_match() {
        let pattern = Pattern::compile(r"/blog/{year:\d{4}}/{slug}").expect("valid pattern");
        let input = vars(&[("year", "2024"), ("slug", "hello-world")]);
        let url = pattern.fill(&input).expect("fill");
        let matched = pattern.match_path(&url).expect("should match");
        assert_eq!(matched, input);
    }

    #[test]
    fn test_should_match_everything_with_wildcard() {
        let pattern = Pattern::compile("*").expect("valid pattern");
        assert!(pattern.is_wildcard());
        assert!(pattern.match_path("/anything/at/all").is_some());
    }
}
