//! Regex driven string rewriting in the style of an L-system
//!
//! A [`RuleTable`] maps regular expressions to replacements. Every match of any
//! rule in the input is replaced in a single left to right pass; when several
//! rules could match the same text the most recently added one wins.

use regex::Regex;
use std::fmt;

/// A captured group handed to a replacement function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleArg {
    Int(i64),
    Text(String),
}

impl RuleArg {
    fn parse(text: &str) -> Self {
        text.parse()
            .map(RuleArg::Int)
            .unwrap_or_else(|_| RuleArg::Text(text.to_string()))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RuleArg::Int(n) => Some(*n),
            RuleArg::Text(_) => None,
        }
    }
}

impl fmt::Display for RuleArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleArg::Int(n) => write!(f, "{}", n),
            RuleArg::Text(s) => write!(f, "{}", s),
        }
    }
}

type RuleFn = Box<dyn Fn(&[RuleArg]) -> String + Send + Sync>;

enum Replacement {
    Text(String),
    Func(RuleFn),
}

struct Rule {
    regex: Regex,
    replacement: Replacement,
}

#[derive(Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
    combined: Option<Regex>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace matches of `pattern` with fixed text
    pub fn text(self, pattern: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        self.push(pattern, Replacement::Text(replacement.into()))
    }

    /// Replace matches of `pattern` with the result of `f`.
    ///
    /// `f` receives the capture groups, or the whole match when the pattern
    /// has no groups. Numeric captures arrive as [`RuleArg::Int`].
    pub fn func<F>(self, pattern: &str, f: F) -> Result<Self, regex::Error>
    where
        F: Fn(&[RuleArg]) -> String + Send + Sync + 'static,
    {
        self.push(pattern, Replacement::Func(Box::new(f)))
    }

    fn push(mut self, pattern: &str, replacement: Replacement) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        self.rules.push(Rule { regex, replacement });
        let alternation = self
            .rules
            .iter()
            .rev()
            .map(|rule| format!("(?:{})", rule.regex.as_str()))
            .collect::<Vec<_>>()
            .join("|");
        self.combined = Some(Regex::new(&alternation)?);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn replace(&self, matched: &str) -> String {
        for rule in self.rules.iter().rev() {
            let Some(caps) = rule.regex.captures(matched) else {
                continue;
            };
            return match &rule.replacement {
                Replacement::Text(text) => text.clone(),
                Replacement::Func(f) => {
                    let args: Vec<RuleArg> = if caps.len() > 1 {
                        caps.iter()
                            .skip(1)
                            .map(|group| RuleArg::parse(group.map_or("", |g| g.as_str())))
                            .collect()
                    } else {
                        vec![RuleArg::parse(&caps[0])]
                    };
                    f(&args)
                }
            };
        }
        matched.to_string()
    }

    /// Apply every rule once across `input`
    pub fn rewrite(&self, input: &str) -> String {
        match &self.combined {
            Some(combined) => combined
                .replace_all(input, |caps: &regex::Captures<'_>| self.replace(&caps[0]))
                .into_owned(),
            None => input.to_string(),
        }
    }
}

impl fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| rule.regex.as_str()))
            .finish()
    }
}

/// Rewrite `axiom` with `rules` for `generations` passes
pub fn rsystem(axiom: &str, rules: &RuleTable, generations: usize) -> String {
    (0..generations).fold(axiom.to_string(), |text, _| rules.rewrite(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(args: &[RuleArg], i: usize) -> i64 {
        args[i].as_int().unwrap_or(0)
    }

    #[test]
    fn test_text_rules() {
        let rules = RuleTable::new().text("1", "2").unwrap();
        assert_eq!(rules.rewrite("1 2 3"), "2 2 3");

        let rules = RuleTable::new().text("1", "3").unwrap().text("2", "5").unwrap();
        assert_eq!(rules.rewrite("1 4 1 5"), "3 4 3 5");
    }

    #[test]
    fn test_later_rules_take_precedence() {
        let rules = RuleTable::new().text("[1-2]", "2").unwrap().text("2", "8").unwrap();
        assert_eq!(rules.rewrite("1 4 2 5"), "2 4 8 5");
    }

    #[test]
    fn test_function_rules() {
        let doubling = RuleTable::new()
            .func("[1-9]", |args| (int(args, 0) * 2).to_string())
            .unwrap();
        assert_eq!(rsystem("1", &doubling, 6), "424");

        let digits = RuleTable::new()
            .func("[0-9]+", |args| (int(args, 0) * 2).to_string())
            .unwrap();
        assert_eq!(rsystem("0 1 2 3", &digits, 4), "0 16 32 48");
    }

    #[test]
    fn test_capture_groups() {
        let pair = RuleTable::new()
            .func("(1) (1)", |args| (int(args, 0) + int(args, 1)).to_string())
            .unwrap();
        assert_eq!(rsystem("1 1 2 3", &pair, 1), "2 2 3");

        let triple = RuleTable::new()
            .func("(1) (1) (2)", |args| {
                format!("{} {}", int(args, 0) + int(args, 1), int(args, 2) - 1)
            })
            .unwrap();
        assert_eq!(rsystem("1 1 2 3", &triple, 1), "2 1 3");
    }

    #[test]
    fn test_text_captures() {
        let rules = RuleTable::new()
            .func("([a-z]+)", |args| args[0].to_string().to_uppercase())
            .unwrap();
        assert_eq!(rules.rewrite("bd 1 hh"), "BD 1 HH");
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(RuleTable::new().text("(", "x").is_err());
        assert_eq!(RuleTable::new().rewrite("1 2"), "1 2");
    }
}
