use std::{
    cell::RefCell,
    rc::Rc,
    sync::LazyLock,
};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{ParamFillError, PathCompileError},
    params::{ParamValue, Params},
};

/// Characters `encodeURI` leaves alone, minus `/ ? #`.
const PRETTY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Wildcard values span segments, so `/` stays readable.
const ASTERISK: &AsciiSet = &PRETTY.remove(b'/');

/// Escaped characters, named parameters with optional custom pattern, unnamed groups and bare
/// wildcards, each parameter optionally preceded by a `/` or `.` prefix.
static PATH_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\\.)|([/.])?(?:(?::([A-Za-z0-9_]+)(?:\(((?:\\.|[^\\()])+)\))?|\(((?:\\.|[^\\()])+)\))([+*?])?|(\*))",
    )
    .expect("path token grammar is a valid regex")
});

const DEFAULT_DELIMITER: &str = "/";

/// Options controlling how a path template matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOptions {
    /// A trailing slash in the template must be present in the path (and vice versa).
    pub strict: bool,
    /// Match case-sensitively.
    pub sensitive: bool,
    /// The template must match the whole path, not only a prefix ending at a segment boundary.
    pub end: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            strict: false,
            sensitive: false,
            end: true,
        }
    }
}

/// A dynamic part of a path template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    /// The parameter name. Unnamed groups are keyed by their ordinal; the first one is called
    /// `pathMatch`.
    pub name: String,
    pub prefix: String,
    pub delimiter: String,
    pub optional: bool,
    pub repeat: bool,
    /// The prefix is followed by static text, as in `/:file.:ext`.
    pub partial: bool,
    pub asterisk: bool,
    pub pattern: String,
}

#[derive(Clone, Debug)]
enum Token {
    Static(String),
    Key(usize),
}

/// A compiled path template.
///
/// ```rust
/// # use waypoint_router::route_definition::{PathOptions, PathPattern};
/// # use waypoint_router::params::params;
/// let pattern = PathPattern::compile("/user/:id/posts/:post?", PathOptions::default()).unwrap();
///
/// assert_eq!(pattern.exec("/user/1/posts"), Some(vec![Some("1"), None]));
/// assert_eq!(pattern.fill(&params([("id", "7")])).unwrap(), "/user/7/posts");
/// ```
#[derive(Debug)]
pub struct PathPattern {
    template: String,
    tokens: Vec<Token>,
    keys: Vec<Key>,
    checks: Vec<Regex>,
    regex: Regex,
}

thread_local! {
    static CACHE: RefCell<FxHashMap<(String, PathOptions), Rc<PathPattern>>> =
        RefCell::new(FxHashMap::default());
}

impl PathPattern {
    /// Compile `template`.
    pub fn compile(template: &str, options: PathOptions) -> Result<Self, PathCompileError> {
        let (tokens, keys) = parse(template);

        let build = |source: &str| {
            RegexBuilder::new(source)
                .case_insensitive(!options.sensitive)
                .build()
                .map_err(|source| PathCompileError::InvalidPattern {
                    template: template.to_string(),
                    source,
                })
        };

        let checks = keys
            .iter()
            .map(|key| build(&format!("^(?:{})$", key.pattern)))
            .collect::<Result<Vec<_>, _>>()?;
        let regex = build(&to_regex_source(&tokens, &keys, options))?;

        Ok(Self {
            template: template.to_string(),
            tokens,
            keys,
            checks,
            regex,
        })
    }

    /// Compile `template`, reusing an earlier compilation with the same options.
    pub fn cached(template: &str, options: PathOptions) -> Result<Rc<Self>, PathCompileError> {
        let key = (template.to_string(), options);
        if let Some(pattern) = CACHE.with_borrow(|cache| cache.get(&key).cloned()) {
            return Ok(pattern);
        }

        let pattern = Rc::new(Self::compile(template, options)?);
        CACHE.with_borrow_mut(|cache| cache.insert(key, pattern.clone()));
        Ok(pattern)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// The dynamic parts of the template, in order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Check whether `path` matches.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and return the raw (still encoded) captures, one per key. Optional keys that
    /// did not participate are [`None`].
    pub fn exec<'a>(&self, path: &'a str) -> Option<Vec<Option<&'a str>>> {
        let captures = self.regex.captures(path)?;
        Some(
            (1..=self.keys.len())
                .map(|index| captures.get(index).map(|capture| capture.as_str()))
                .collect(),
        )
    }

    /// Fill `params` into the template.
    pub fn fill(&self, params: &Params) -> Result<String, ParamFillError> {
        let mut path = String::new();

        for token in &self.tokens {
            let index = match token {
                Token::Static(text) => {
                    path.push_str(text);
                    continue;
                }
                Token::Key(index) => *index,
            };
            let key = &self.keys[index];
            let check = &self.checks[index];

            let Some(value) = params.get(&key.name) else {
                if key.optional {
                    if key.partial {
                        path.push_str(&key.prefix);
                    }
                    continue;
                }
                return Err(ParamFillError::Missing {
                    name: key.name.clone(),
                });
            };

            match value {
                ParamValue::Many(values) => {
                    if !key.repeat {
                        return Err(ParamFillError::Repeated {
                            name: key.name.clone(),
                            value: values.clone(),
                        });
                    }

                    if values.is_empty() {
                        if key.optional {
                            continue;
                        }
                        return Err(ParamFillError::Empty {
                            name: key.name.clone(),
                        });
                    }

                    for (position, value) in values.iter().enumerate() {
                        let segment = utf8_percent_encode(value, PRETTY).to_string();
                        check_segment(key, check, &segment)?;
                        path.push_str(match position {
                            0 => &key.prefix,
                            _ => &key.delimiter,
                        });
                        path.push_str(&segment);
                    }
                }
                ParamValue::One(value) => {
                    let set = match key.asterisk {
                        true => ASTERISK,
                        false => PRETTY,
                    };
                    let segment = utf8_percent_encode(value, set).to_string();
                    check_segment(key, check, &segment)?;
                    path.push_str(&key.prefix);
                    path.push_str(&segment);
                }
            }
        }

        Ok(path)
    }
}

fn check_segment(key: &Key, check: &Regex, segment: &str) -> Result<(), ParamFillError> {
    match check.is_match(segment) {
        true => Ok(()),
        false => Err(ParamFillError::Mismatch {
            name: key.name.clone(),
            pattern: key.pattern.clone(),
            value: segment.to_string(),
        }),
    }
}

/// Fill `params` into `template`, logging failures and returning an empty path instead.
///
/// `context` describes the caller in the log message.
pub fn fill_params(template: &str, params: &Params, context: &str) -> String {
    let result = PathPattern::cached(template, PathOptions::default())
        .map_err(|error| {
            warn!(%error, "could not compile path template");
            ParamFillError::Compile {
                template: template.to_string(),
            }
        })
        .and_then(|pattern| pattern.fill(params));

    result.unwrap_or_else(|error| {
        if !matches!(params.get("pathMatch"), Some(ParamValue::One(_))) {
            warn!(%error, "missing param for {context}");
        }
        String::new()
    })
}

fn parse(template: &str) -> (Vec<Token>, Vec<Key>) {
    let mut tokens = Vec::new();
    let mut keys = Vec::new();
    let mut ordinal = 0;
    let mut index = 0;
    let mut path = String::new();

    for captures in PATH_TOKEN.captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        path.push_str(&template[index..whole.start()]);
        index = whole.end();

        if let Some(escaped) = captures.get(1) {
            path.push_str(&escaped.as_str()[1..]);
            continue;
        }

        let next = template[index..].chars().next();
        let prefix = captures.get(2).map(|prefix| prefix.as_str());
        let pattern = captures.get(4).or_else(|| captures.get(5));
        let modifier = captures.get(6).map(|modifier| modifier.as_str());
        let asterisk = captures.get(7).is_some();

        let name = match captures.get(3) {
            Some(name) => name.as_str().to_string(),
            None => {
                ordinal += 1;
                match ordinal {
                    1 => String::from("pathMatch"),
                    ordinal => (ordinal - 1).to_string(),
                }
            }
        };

        if !path.is_empty() {
            tokens.push(Token::Static(std::mem::take(&mut path)));
        }

        let delimiter = prefix.unwrap_or(DEFAULT_DELIMITER);
        let pattern = match (pattern, asterisk) {
            (Some(pattern), _) => escape_group(pattern.as_str()),
            (None, true) => String::from(".*"),
            (None, false) => format!("[^{}]+?", regex::escape(delimiter)),
        };

        tokens.push(Token::Key(keys.len()));
        keys.push(Key {
            name,
            prefix: prefix.unwrap_or_default().to_string(),
            delimiter: delimiter.to_string(),
            optional: matches!(modifier, Some("?" | "*")),
            repeat: matches!(modifier, Some("+" | "*")),
            partial: match (prefix, next) {
                (Some(prefix), Some(next)) => !prefix.starts_with(next),
                _ => false,
            },
            asterisk,
            pattern,
        });
    }

    path.push_str(&template[index..]);
    if !path.is_empty() {
        tokens.push(Token::Static(path));
    }

    (tokens, keys)
}

/// Custom parameter patterns may not open capture groups of their own.
fn escape_group(group: &str) -> String {
    let mut escaped = String::with_capacity(group.len());
    for c in group.chars() {
        if matches!(c, '$' | '(' | ')') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_regex_source(tokens: &[Token], keys: &[Key], options: PathOptions) -> String {
    let mut route = String::new();

    for token in tokens {
        match token {
            Token::Static(text) => route.push_str(&regex::escape(text)),
            Token::Key(index) => {
                let key = &keys[*index];
                let prefix = regex::escape(&key.prefix);
                let mut capture = format!("(?:{})", key.pattern);
                if key.repeat {
                    capture = format!("{capture}(?:{prefix}{capture})*");
                }

                let capture = match (key.optional, key.partial) {
                    (true, false) => format!("(?:{prefix}({capture}))?"),
                    (true, true) => format!("{prefix}({capture})?"),
                    (false, _) => format!("{prefix}({capture})"),
                };
                route.push_str(&capture);
            }
        }
    }

    let delimiter = regex::escape(DEFAULT_DELIMITER);
    let ends_with_delimiter = route.ends_with(&delimiter);

    if !options.strict {
        if ends_with_delimiter {
            route.truncate(route.len() - delimiter.len());
        }
        route.push_str(&format!("(?:{delimiter})?"));
    }

    if options.end {
        route.push('$');
    } else if !(options.strict && ends_with_delimiter) {
        // a prefix match must stop at a segment boundary
        route.push_str(&format!("(?:{delimiter}.*)?$"));
    }

    format!("^{route}")
}
