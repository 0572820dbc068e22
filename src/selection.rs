use std::collections::HashSet;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("selection is empty")]
    Empty,
    #[error("empty entry at position {index} of the selection")]
    EmptyToken { index: usize },
    #[error("'{0}' is neither a chapter number nor a range")]
    InvalidToken(String),
    #[error("range {start}-{end} is inverted")]
    InvertedRange { start: usize, end: usize },
    #[error("chapter {position} does not exist, there are {available} chapters")]
    OutOfRange { position: usize, available: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Single(usize),
    Range(usize, usize),
}

/// Syntactically valid selection, not yet checked against a chapter list.
///
/// Accepts `-` for every chapter, otherwise a comma separated list of 1-based
/// positions (`3`) and inclusive ranges (`2-7`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSpec {
    tokens: Option<Vec<Token>>,
}

impl SelectionSpec {
    pub fn all() -> Self {
        Self { tokens: None }
    }

    pub fn is_all(&self) -> bool {
        self.tokens.is_none()
    }

    /// Pairs every selected position with its chapter.
    pub fn resolve<T: Clone>(&self, available: &[T]) -> Result<ChapterSelection<T>, ParseError> {
        let Some(tokens) = &self.tokens else {
            return Ok(ChapterSelection {
                entries: available
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(i, item)| (i + 1, item))
                    .collect(),
            });
        };

        let check = |position: usize| {
            if (1..=available.len()).contains(&position) {
                Ok(position)
            } else {
                Err(ParseError::OutOfRange {
                    position,
                    available: available.len(),
                })
            }
        };

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for token in tokens {
            let positions = match *token {
                Token::Single(p) => check(p)?..=p,
                Token::Range(start, end) => check(start)?..=check(end)?,
            };
            for position in positions {
                if seen.insert(position) {
                    entries.push((position, available[position - 1].clone()));
                }
            }
        }
        Ok(ChapterSelection { entries })
    }
}

impl FromStr for SelectionSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        if s == "-" {
            return Ok(Self::all());
        }

        let tokens = s
            .split(',')
            .enumerate()
            .map(|(index, token)| parse_token(index, token.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tokens: Some(tokens),
        })
    }
}

fn parse_token(index: usize, token: &str) -> Result<Token, ParseError> {
    let number = |s: &str| {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidToken(token.to_string()));
        }
        s.parse::<usize>()
            .map_err(|_| ParseError::InvalidToken(token.to_string()))
    };

    if token.is_empty() {
        return Err(ParseError::EmptyToken { index });
    }
    match token.split_once('-') {
        None => Ok(Token::Single(number(token)?)),
        Some((start, end)) => {
            let (start, end) = (number(start)?, number(end)?);
            if start > end {
                return Err(ParseError::InvertedRange { start, end });
            }
            Ok(Token::Range(start, end))
        }
    }
}

/// Ordered, duplicate free chapters picked by a selection, each with its
/// 1-based display position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSelection<T> {
    entries: Vec<(usize, T)>,
}

impl<T> ChapterSelection<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn positions(&self) -> Vec<usize> {
        self.entries.iter().map(|(p, _)| *p).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, item)| item)
    }
}

impl<T> IntoIterator for ChapterSelection<T> {
    type Item = T;
    type IntoIter = std::iter::Map<std::vec::IntoIter<(usize, T)>, fn((usize, T)) -> T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .into_iter()
            .map((|(_, item)| item) as fn((usize, T)) -> T)
    }
}

/// Parses `spec` and resolves it against the chapters of a manga.
pub fn parse_selection<T: Clone>(
    spec: &str,
    available: &[T],
) -> Result<ChapterSelection<T>, ParseError> {
    spec.parse::<SelectionSpec>()?.resolve(available)
}
