//! Query model and parsing.
//!
//! Queries arrive as engine-facing command lines (`pre app`, `sim apple 2`,
//! `complex pre:c suf:t len:3-4`, ...). Parsing is recoverable: malformed
//! values are reported as errors without touching engine state, and unknown
//! `complex` term kinds are collected for reporting and skipped.

use crate::index::types::WordId;
use anyhow::{bail, Context, Result};

/// A parsed query, ready for the executor.
#[derive(Debug, Clone)]
pub enum Query {
    /// Exact word lookup
    Exact(String),
    /// Words starting with a prefix
    Prefix(String),
    /// Words ending with a suffix
    Suffix(String),
    /// Words containing an arbitrary substring
    Substring(String),
    /// Bounded edit-distance search
    Similar {
        word: String,
        /// `None` means the configured default cutoff
        max_distance: Option<u32>,
        exhaustive: bool,
    },
    /// Words with length in `[min, max]`
    Length { min: usize, max: usize },
    /// Records with id in `[min, max]`
    IdRange { min: WordId, max: WordId },
    /// Words containing every keyword
    All(Vec<String>),
    /// Words containing at least one keyword
    Any(Vec<String>),
    /// Words not containing the keyword
    Without(String),
    /// AND-combined `kind:value` terms
    Complex {
        terms: Vec<Term>,
        /// Unknown term kinds, reported to the user and skipped
        skipped: Vec<String>,
    },
}

/// One term of a `complex` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Prefix(String),
    Suffix(String),
    Substring(String),
    Without(String),
    Length { min: usize, max: usize },
    IdRange { min: WordId, max: WordId },
    Similar { word: String, max_distance: Option<u32> },
}

/// Parse `N` or `N-M` into an inclusive range.
fn parse_range<T>(value: &str, allow_single: bool) -> Result<(T, T)>
where
    T: std::str::FromStr + PartialOrd + Copy,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value.split_once('-') {
        Some((lo, hi)) => {
            let min: T = lo.trim().parse().with_context(|| format!("invalid number {lo:?}"))?;
            let max: T = hi.trim().parse().with_context(|| format!("invalid number {hi:?}"))?;
            if min > max {
                bail!("inverted range {value:?}");
            }
            Ok((min, max))
        }
        None if allow_single => {
            let n: T = value
                .trim()
                .parse()
                .with_context(|| format!("invalid number {value:?}"))?;
            Ok((n, n))
        }
        None => bail!("expected a range N-M, got {value:?}"),
    }
}

fn parse_sim_value(value: &str) -> Result<(String, Option<u32>)> {
    match value.split_once(',') {
        Some((word, d)) => {
            if word.is_empty() {
                bail!("sim needs a word");
            }
            let max: u32 = d
                .trim()
                .parse()
                .with_context(|| format!("invalid distance {d:?}"))?;
            Ok((word.to_string(), Some(max)))
        }
        None => {
            if value.is_empty() {
                bail!("sim needs a word");
            }
            Ok((value.to_string(), None))
        }
    }
}

/// Parse the terms of a `complex` query. Malformed values are errors;
/// unknown kinds are returned in `skipped`.
pub fn parse_complex(input: &str) -> Result<(Vec<Term>, Vec<String>)> {
    let mut terms = Vec::new();
    let mut skipped = Vec::new();

    for raw in input.split_whitespace() {
        let Some((kind, value)) = raw.split_once(':') else {
            skipped.push(raw.to_string());
            continue;
        };
        if value.is_empty() {
            bail!("term {raw:?} has an empty value");
        }
        match kind {
            "pre" => terms.push(Term::Prefix(value.to_string())),
            "suf" => terms.push(Term::Suffix(value.to_string())),
            "sub" => terms.push(Term::Substring(value.to_string())),
            "not" => terms.push(Term::Without(value.to_string())),
            "len" => {
                let (min, max) = parse_range::<usize>(value, true)?;
                terms.push(Term::Length { min, max });
            }
            "id" => {
                let (min, max) = parse_range::<WordId>(value, false)?;
                terms.push(Term::IdRange { min, max });
            }
            "sim" => {
                let (word, max_distance) = parse_sim_value(value)?;
                terms.push(Term::Similar { word, max_distance });
            }
            _ => skipped.push(raw.to_string()),
        }
    }

    Ok((terms, skipped))
}

/// Parse an engine-facing query command line: `<kind> <args>`.
///
/// Returns an error for anything that is not a recognized query command;
/// the REPL layer owns the non-query commands.
pub fn parse_query(input: &str) -> Result<Query> {
    let input = input.trim();
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (input, ""),
    };

    if command.is_empty() {
        bail!("empty query");
    }

    let one_word = || -> Result<String> {
        if rest.is_empty() || rest.split_whitespace().count() != 1 {
            bail!("{command} takes exactly one word");
        }
        Ok(rest.to_string())
    };

    match command {
        "exact" => Ok(Query::Exact(one_word()?)),
        "pre" => Ok(Query::Prefix(one_word()?)),
        "suf" => Ok(Query::Suffix(one_word()?)),
        "sub" => Ok(Query::Substring(one_word()?)),
        "sim" | "sim+" => {
            let mut parts = rest.split_whitespace();
            let word = parts.next().context("sim takes a word and an optional distance")?;
            let max_distance = parts
                .next()
                .map(|d| d.parse::<u32>().with_context(|| format!("invalid distance {d:?}")))
                .transpose()?;
            if parts.next().is_some() {
                bail!("sim takes a word and an optional distance");
            }
            Ok(Query::Similar {
                word: word.to_string(),
                max_distance,
                exhaustive: command == "sim+",
            })
        }
        "and" | "or" => {
            let keys: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            if keys.is_empty() {
                bail!("{command} takes one or more keywords");
            }
            if command == "and" {
                Ok(Query::All(keys))
            } else {
                Ok(Query::Any(keys))
            }
        }
        "not" => Ok(Query::Without(one_word()?)),
        "len" => {
            let (min, max) = parse_range::<usize>(rest, true)?;
            Ok(Query::Length { min, max })
        }
        "id" => {
            let (min, max) = parse_range::<WordId>(rest, false)?;
            Ok(Query::IdRange { min, max })
        }
        "complex" => {
            let (terms, skipped) = parse_complex(rest)?;
            Ok(Query::Complex { terms, skipped })
        }
        _ => bail!("unknown query command {command:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert!(matches!(parse_query("exact apple"), Ok(Query::Exact(w)) if w == "apple"));
        assert!(matches!(parse_query("pre app"), Ok(Query::Prefix(p)) if p == "app"));
        assert!(matches!(parse_query("suf let"), Ok(Query::Suffix(s)) if s == "let"));
        assert!(matches!(parse_query("sub ppl"), Ok(Query::Substring(k)) if k == "ppl"));
        assert!(parse_query("exact").is_err());
        assert!(parse_query("exact two words").is_err());
    }

    #[test]
    fn test_sim_commands() {
        match parse_query("sim apple").unwrap() {
            Query::Similar {
                word,
                max_distance,
                exhaustive,
            } => {
                assert_eq!(word, "apple");
                assert_eq!(max_distance, None);
                assert!(!exhaustive);
            }
            other => panic!("unexpected {other:?}"),
        }

        match parse_query("sim+ apple 3").unwrap() {
            Query::Similar {
                max_distance,
                exhaustive,
                ..
            } => {
                assert_eq!(max_distance, Some(3));
                assert!(exhaustive);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(parse_query("sim apple x").is_err());
        assert!(parse_query("sim apple 2 3").is_err());
    }

    #[test]
    fn test_ranges() {
        assert!(matches!(
            parse_query("len 3"),
            Ok(Query::Length { min: 3, max: 3 })
        ));
        assert!(matches!(
            parse_query("len 3-5"),
            Ok(Query::Length { min: 3, max: 5 })
        ));
        assert!(parse_query("len 5-3").is_err()); // inverted
        assert!(matches!(
            parse_query("id 0-10"),
            Ok(Query::IdRange { min: 0, max: 10 })
        ));
        assert!(parse_query("id 5").is_err()); // id must be a range
    }

    #[test]
    fn test_boolean_commands() {
        assert!(matches!(parse_query("and ca rt"), Ok(Query::All(keys)) if keys.len() == 2));
        assert!(matches!(parse_query("or x"), Ok(Query::Any(keys)) if keys.len() == 1));
        assert!(matches!(parse_query("not x"), Ok(Query::Without(k)) if k == "x"));
        assert!(parse_query("and").is_err());
        assert!(parse_query("not a b").is_err());
    }

    #[test]
    fn test_complex_terms() {
        let (terms, skipped) = parse_complex("pre:c suf:t len:3-4 not:x id:0-9 sim:cat,2").unwrap();
        assert_eq!(terms.len(), 6);
        assert!(skipped.is_empty());
        assert_eq!(terms[0], Term::Prefix("c".into()));
        assert_eq!(terms[2], Term::Length { min: 3, max: 4 });
        assert_eq!(
            terms[5],
            Term::Similar {
                word: "cat".into(),
                max_distance: Some(2)
            }
        );
    }

    #[test]
    fn test_complex_unknown_kinds_skipped() {
        let (terms, skipped) = parse_complex("pre:c glob:*.rs bareword").unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(skipped, vec!["glob:*.rs".to_string(), "bareword".to_string()]);
    }

    #[test]
    fn test_complex_malformed_values_fail() {
        assert!(parse_complex("len:abc").is_err());
        assert!(parse_complex("len:9-2").is_err());
        assert!(parse_complex("id:7").is_err());
        assert!(parse_complex("pre:").is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse_query("frob x").is_err());
        assert!(parse_query("").is_err());
    }
}
