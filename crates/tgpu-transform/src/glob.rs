//! Glob patterns for include/exclude filters
//!
//! Supports `*`, `?`, `**` path segments, `[...]` classes and `{a,b}`
//! alternatives. Patterns that do not start with `/` or `**` may match any
//! trailing run of path segments, so `src/*.ts` matches `/home/app/src/a.ts`.

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Char(char),
    /// `?`
    Any,
    /// `*`
    Star,
    /// `**/`: zero or more whole segments
    GlobStarSlash,
    /// trailing `**`
    GlobStarEnd,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

#[derive(Debug, Clone)]
pub struct Glob {
    source: String,
    /// One token list per brace expansion
    alternatives: Vec<Vec<Token>>,
    anchored: bool,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let pattern = pattern.replace('\\', "/");
        let invalid = |reason: &str| ConfigError::InvalidGlob {
            pattern: pattern.clone(),
            reason: reason.to_string(),
        };
        if pattern.is_empty() {
            return Err(invalid("empty pattern"));
        }
        let expanded = expand_braces(&pattern).map_err(|reason| invalid(reason))?;
        let alternatives = expanded
            .iter()
            .map(|alt| tokenize(alt).map_err(|reason| invalid(reason)))
            .collect::<Result<Vec<_>, _>>()?;
        let anchored = pattern.starts_with('/') || pattern.starts_with("**");
        Ok(Self {
            source: pattern,
            alternatives,
            anchored,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, path: &str) -> bool {
        let path = path.replace('\\', "/");
        let chars: Vec<char> = path.chars().collect();
        self.alternatives.iter().any(|tokens| {
            if self.anchored {
                return match_tokens(tokens, &chars);
            }
            // Relative patterns match any suffix that starts a segment
            (0..chars.len())
                .filter(|&i| i == 0 || chars[i - 1] == '/')
                .any(|i| match_tokens(tokens, &chars[i..]))
        })
    }

    /// The file extensions this pattern selects, when it has the shape
    /// `**/*.ext`, `*.ext` or `**/*.{a,b}`
    pub fn extensions(&self) -> Option<Vec<String>> {
        let rest = self
            .source
            .strip_prefix("**/*.")
            .or_else(|| self.source.strip_prefix("*."))?;
        let names: Vec<&str> = match rest.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            Some(inner) => inner.split(',').collect(),
            None => vec![rest],
        };
        let simple = |name: &&str| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
        };
        if names.iter().all(simple) {
            Some(names.into_iter().map(str::to_string).collect())
        } else {
            None
        }
    }
}

/// Expand `{a,b}` groups into separate patterns
fn expand_braces(pattern: &str) -> Result<Vec<String>, &'static str> {
    let Some(open) = pattern.find('{') else {
        if pattern.contains('}') {
            return Err("unbalanced '}'");
        }
        return Ok(vec![pattern.to_string()]);
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(open + i),
            _ => {}
        }
    }
    let close = close.ok_or("unbalanced '{'")?;

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    let mut out = Vec::new();
    for pair in bounds.windows(2) {
        let option = &pattern[pair[0] + 1..pair[1]];
        for expanded in expand_braces(&format!("{}{}{}", prefix, option, suffix))? {
            out.push(expanded);
        }
    }
    Ok(out)
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, &'static str> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let at_segment_start = i == 0 || chars[i - 1] == '/';
                if at_segment_start && chars.get(i + 2) == Some(&'/') {
                    tokens.push(Token::GlobStarSlash);
                    i += 3;
                } else if at_segment_start && i + 2 == chars.len() {
                    tokens.push(Token::GlobStarEnd);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 2;
                }
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Any);
                i += 1;
            }
            '[' => {
                let mut j = i + 1;
                let negated = matches!(chars.get(j), Some('!') | Some('^'));
                if negated {
                    j += 1;
                }
                let mut ranges = Vec::new();
                loop {
                    let Some(&c) = chars.get(j) else {
                        return Err("unterminated character class");
                    };
                    if c == ']' && !ranges.is_empty() {
                        break;
                    }
                    if chars.get(j + 1) == Some(&'-') && chars.get(j + 2).is_some_and(|&e| e != ']') {
                        ranges.push((c, chars[j + 2]));
                        j += 3;
                    } else {
                        ranges.push((c, c));
                        j += 1;
                    }
                }
                tokens.push(Token::Class { negated, ranges });
                i = j + 1;
            }
            '\\' if i + 1 < chars.len() => {
                tokens.push(Token::Char(chars[i + 1]));
                i += 2;
            }
            c => {
                tokens.push(Token::Char(c));
                i += 1;
            }
        }
    }
    Ok(tokens)
}

fn match_tokens(tokens: &[Token], text: &[char]) -> bool {
    let Some((first, rest)) = tokens.split_first() else {
        return text.is_empty();
    };
    match first {
        Token::Char(c) => text.first() == Some(c) && match_tokens(rest, &text[1..]),
        Token::Any => text.first().is_some_and(|&c| c != '/') && match_tokens(rest, &text[1..]),
        Token::Class { negated, ranges } => match text.first() {
            Some(&c) if c != '/' => {
                let hit = ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
                hit != *negated && match_tokens(rest, &text[1..])
            }
            _ => false,
        },
        Token::Star => {
            let limit = text.iter().position(|&c| c == '/').unwrap_or(text.len());
            (0..=limit).any(|n| match_tokens(rest, &text[n..]))
        }
        Token::GlobStarSlash => {
            match_tokens(rest, text)
                || (1..=text.len())
                    .filter(|&n| text[n - 1] == '/')
                    .any(|n| match_tokens(rest, &text[n..]))
        }
        Token::GlobStarEnd => true,
    }
}

/// Include/exclude pair applied to module ids
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Vec<Glob>,
    exclude: Vec<Glob>,
}

impl FileFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ConfigError> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| Glob::new(p))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn include(&self) -> &[Glob] {
        &self.include
    }

    /// Whether the module `id` should be transformed. Query suffixes such
    /// as `?v=123` are ignored and virtual `\0` ids never match.
    pub fn matches(&self, id: &str) -> bool {
        if id.starts_with('\0') {
            return false;
        }
        let path = strip_query(id);
        let included = self.include.is_empty() || self.include.iter().any(|g| g.is_match(path));
        included && !self.exclude.iter().any(|g| g.is_match(path))
    }
}

pub fn strip_query(id: &str) -> &str {
    id.split_once('?').map_or(id, |(path, _)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DEFAULT_INCLUDE;

    fn glob(pattern: &str) -> Glob {
        Glob::new(pattern).unwrap()
    }

    #[test]
    fn test_default_include() {
        let g = glob(DEFAULT_INCLUDE);
        assert!(g.is_match("src/main.ts"));
        assert!(g.is_match("/abs/path/comp.tsx"));
        assert!(g.is_match("index.mjs"));
        assert!(!g.is_match("style.css"));
        assert!(!g.is_match("src/main.ts.map"));
    }

    #[test]
    fn test_star_stays_in_segment() {
        let g = glob("/src/*.ts");
        assert!(g.is_match("/src/a.ts"));
        assert!(!g.is_match("/src/nested/a.ts"));
    }

    #[test]
    fn test_relative_pattern_matches_suffix() {
        let g = glob("src/**/*.ts");
        assert!(g.is_match("/home/app/src/a.ts"));
        assert!(g.is_match("src/deep/er/b.ts"));
        assert!(!g.is_match("/home/app/lib/a.ts"));
        assert!(!g.is_match("/home/app/mysrc/a.ts"));
    }

    #[test]
    fn test_classes_and_question_mark() {
        let g = glob("**/file[0-9]?.js");
        assert!(g.is_match("a/file1x.js"));
        assert!(!g.is_match("a/filex1.js"));
        assert!(glob("**/[!_]*.js").is_match("a/b.js"));
        assert!(!glob("**/[!_]*.js").is_match("a/_b.js"));
    }

    #[test]
    fn test_trailing_globstar() {
        let g = glob("**/node_modules/**");
        assert!(g.is_match("/x/node_modules/pkg/index.js"));
        assert!(!g.is_match("/x/src/index.js"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(Glob::new("src/{a,b"), Err(ConfigError::InvalidGlob { .. })));
        assert!(matches!(Glob::new("src/[ab"), Err(ConfigError::InvalidGlob { .. })));
        assert!(matches!(Glob::new(""), Err(ConfigError::InvalidGlob { .. })));
    }

    #[test]
    fn test_extensions() {
        assert_eq!(
            glob("**/*.{ts,tsx}").extensions(),
            Some(vec!["ts".to_string(), "tsx".to_string()])
        );
        assert_eq!(glob("*.js").extensions(), Some(vec!["js".to_string()]));
        assert_eq!(glob("src/**/*.ts").extensions(), None);
        assert_eq!(glob("**/*.{ts,*}").extensions(), None);
    }

    #[test]
    fn test_filter_strips_query_and_virtual_ids() {
        let filter = FileFilter::new(
            &[DEFAULT_INCLUDE.to_string()],
            &["**/*.test.ts".to_string()],
        )
        .unwrap();
        assert!(filter.matches("/src/a.ts?v=123"));
        assert!(!filter.matches("/src/a.test.ts"));
        assert!(!filter.matches("\0virtual:a.ts"));
        assert!(!filter.matches("/src/a.css?inline"));
    }
}
