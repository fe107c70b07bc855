use aho_corasick::{AhoCorasick, MatchKind};
use thiserror::Error;

/// A predicate deciding whether a line belongs in a tail result.
///
/// Implementations must be pure: the tail reader calls them in reverse file
/// order and may call them more times than the number of lines it returns.
pub trait LineFilter {
    fn accepts(&self, line: &str) -> bool;
}

impl<F> LineFilter for F
where
    F: Fn(&str) -> bool,
{
    fn accepts(&self, line: &str) -> bool {
        self(line)
    }
}

#[derive(Debug, Error)]
#[error("could not build substring matcher for {needle:?}")]
pub struct FilterError {
    needle: String,
    #[source]
    source: aho_corasick::BuildError,
}

/// The filters exposed to callers of the tail endpoint and command.
#[derive(Debug, Clone, Default)]
pub enum Filter {
    /// Accept every line
    #[default]
    AcceptAll,
    /// Accept lines containing a literal, case-sensitive substring
    Contains {
        needle: String,
        automaton: AhoCorasick,
    },
}

impl Filter {
    /// Build a substring filter. An empty needle matches everything, so it
    /// collapses to `AcceptAll`.
    pub fn contains(needle: &str) -> Result<Self, FilterError> {
        if needle.is_empty() {
            return Ok(Filter::AcceptAll);
        }

        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .build([needle])
            .map_err(|source| FilterError {
                needle: needle.to_string(),
                source,
            })?;

        Ok(Filter::Contains {
            needle: needle.to_string(),
            automaton,
        })
    }

    /// Build a filter from an optional query text
    pub fn from_text(text: Option<&str>) -> Result<Self, FilterError> {
        match text {
            Some(needle) => Self::contains(needle),
            None => Ok(Filter::AcceptAll),
        }
    }

    pub fn needle(&self) -> Option<&str> {
        match self {
            Filter::AcceptAll => None,
            Filter::Contains { needle, .. } => Some(needle),
        }
    }
}

impl LineFilter for Filter {
    fn accepts(&self, line: &str) -> bool {
        match self {
            Filter::AcceptAll => true,
            Filter::Contains { automaton, .. } => automaton.is_match(line),
        }
    }
}
