// 🔤 Placeholder Engine - `${var}` in writeups, `{{var}}` in templates
// Scan once into segments, then replace from a lookup. No evaluation of any kind.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static DOLLAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}\s]+)\}").expect("valid regex"));
static BRACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("valid regex"));

/// Placeholder flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// `${name}` - writeup text
    Dollar,
    /// `{{name}}` / `{{ name }}` - template documents
    Braces,
}

impl Syntax {
    fn regex(&self) -> &'static Regex {
        match self {
            Syntax::Dollar => &DOLLAR_RE,
            Syntax::Braces => &BRACES_RE,
        }
    }
}

/// What to do when a placeholder names an unknown variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingVariablePolicy {
    /// Abort with a substitution error
    #[default]
    Fail,
    /// Keep the placeholder text verbatim
    Literal,
}

impl std::str::FromStr for MissingVariablePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(MissingVariablePolicy::Fail),
            "literal" => Ok(MissingVariablePolicy::Literal),
            other => Err(format!("unknown missing-variable policy: {}", other)),
        }
    }
}

/// Piece of scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Placeholder {
        /// Variable name, whitespace stripped
        name: &'a str,
        /// Full original marker, e.g. `${hours}`
        raw: &'a str,
    },
}

/// First pass: split text into literals and placeholders
pub fn scan(text: &str, syntax: Syntax) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for caps in syntax.regex().captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            segments.push(Segment::Literal(&text[cursor..whole.start()]));
        }
        segments.push(Segment::Placeholder {
            name: name.as_str(),
            raw: whole.as_str(),
        });
        cursor = whole.end();
    }

    if cursor < text.len() {
        segments.push(Segment::Literal(&text[cursor..]));
    }

    segments
}

/// Distinct placeholder names in order of first appearance
pub fn placeholder_names(text: &str, syntax: Syntax) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for segment in scan(text, syntax) {
        if let Segment::Placeholder { name, .. } = segment {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Placeholder that had no value under `MissingVariablePolicy::Fail`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub name: String,
}

/// Second pass: replace every placeholder via `lookup`
pub fn render<F, V>(
    text: &str,
    syntax: Syntax,
    policy: MissingVariablePolicy,
    mut lookup: F,
) -> Result<String, Unresolved>
where
    F: FnMut(&str) -> Option<V>,
    V: AsRef<str>,
{
    let mut out = String::with_capacity(text.len());

    for segment in scan(text, syntax) {
        match segment {
            Segment::Literal(literal) => out.push_str(literal),
            Segment::Placeholder { name, raw } => match lookup(name) {
                Some(value) => out.push_str(value.as_ref()),
                None => match policy {
                    MissingVariablePolicy::Fail => {
                        return Err(Unresolved {
                            name: name.to_string(),
                        })
                    }
                    MissingVariablePolicy::Literal => out.push_str(raw),
                },
            },
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([("name", "Alice"), ("hours", "40")])
    }

    #[test]
    fn test_scan_dollar_segments() {
        let segments = scan("Worked ${hours} hours.", Syntax::Dollar);

        assert_eq!(
            segments,
            vec![
                Segment::Literal("Worked "),
                Segment::Placeholder {
                    name: "hours",
                    raw: "${hours}"
                },
                Segment::Literal(" hours."),
            ]
        );
    }

    #[test]
    fn test_scan_braces_tolerates_inner_spaces() {
        let names = placeholder_names("Dear {{ name }}, {{transcript}} {{name}}", Syntax::Braces);
        assert_eq!(names, vec!["name", "transcript"]);
    }

    #[test]
    fn test_syntaxes_do_not_cross() {
        assert!(placeholder_names("{{name}}", Syntax::Dollar).is_empty());
        assert!(placeholder_names("${name}", Syntax::Braces).is_empty());
    }

    #[test]
    fn test_render_substitutes_all_occurrences() {
        let vars = vars();
        let out = render(
            "${name} worked ${hours}h; well done ${name}.",
            Syntax::Dollar,
            MissingVariablePolicy::Fail,
            |k| vars.get(k).copied(),
        )
        .unwrap();

        assert_eq!(out, "Alice worked 40h; well done Alice.");
    }

    #[test]
    fn test_render_missing_fails() {
        let vars = vars();
        let err = render(
            "Rank: ${rank}",
            Syntax::Dollar,
            MissingVariablePolicy::Fail,
            |k| vars.get(k).copied(),
        )
        .unwrap_err();

        assert_eq!(err.name, "rank");
    }

    #[test]
    fn test_render_missing_literal() {
        let vars = vars();
        let out = render(
            "Rank: ${rank}, name: ${name}",
            Syntax::Dollar,
            MissingVariablePolicy::Literal,
            |k| vars.get(k).copied(),
        )
        .unwrap();

        assert_eq!(out, "Rank: ${rank}, name: Alice");
    }

    #[test]
    fn test_text_without_placeholders_is_verbatim() {
        let text = "Costs $5 and {braces} or ${ unterminated";
        let out = render(text, Syntax::Dollar, MissingVariablePolicy::Fail, |_| None::<&str>)
            .unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let out = render(
            "${a}",
            Syntax::Dollar,
            MissingVariablePolicy::Fail,
            |_| Some("${b}"),
        )
        .unwrap();
        assert_eq!(out, "${b}");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("FAIL".parse::<MissingVariablePolicy>(), Ok(MissingVariablePolicy::Fail));
        assert_eq!(
            "literal".parse::<MissingVariablePolicy>(),
            Ok(MissingVariablePolicy::Literal)
        );
        assert!("skip".parse::<MissingVariablePolicy>().is_err());
    }
}
