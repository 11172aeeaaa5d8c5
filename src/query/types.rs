use crate::index::types::{Trigram, trigram_to_bytes};
use ahash::AHashSet;
use std::fmt;

/// Boolean condition over trigram membership that every match of a
/// pattern satisfies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// No constraint could be derived: every file is a candidate
    All,
    /// The pattern cannot match anything
    None,
    /// The file must contain this trigram
    Trigram(Trigram),
    /// Every child must hold
    And(Vec<Query>),
    /// At least one child must hold
    Or(Vec<Query>),
}

impl Query {
    /// Conjunction with identities applied and nested ANDs flattened.
    pub fn and(self, other: Query) -> Query {
        match (self, other) {
            (Query::None, _) | (_, Query::None) => Query::None,
            (Query::All, q) | (q, Query::All) => q,
            (a, b) => {
                let mut subs = Vec::new();
                a.flatten_into(&mut subs, true);
                b.flatten_into(&mut subs, true);
                Query::from_subs(subs, true)
            }
        }
    }

    /// Disjunction with identities applied and nested ORs flattened.
    pub fn or(self, other: Query) -> Query {
        match (self, other) {
            (Query::All, _) | (_, Query::All) => Query::All,
            (Query::None, q) | (q, Query::None) => q,
            (a, b) => {
                let mut subs = Vec::new();
                a.flatten_into(&mut subs, false);
                b.flatten_into(&mut subs, false);
                Query::from_subs(subs, false)
            }
        }
    }

    /// AND of every trigram in `trigrams`; `All` for an empty list.
    pub fn all_of<I: IntoIterator<Item = Trigram>>(trigrams: I) -> Query {
        trigrams
            .into_iter()
            .fold(Query::All, |q, t| q.and(Query::Trigram(t)))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Query::All)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Query::None)
    }

    /// Every trigram mentioned anywhere in the tree, ascending.
    pub fn trigrams(&self) -> Vec<Trigram> {
        let mut seen = AHashSet::new();
        self.collect_trigrams(&mut seen);
        let mut out: Vec<_> = seen.into_iter().collect();
        out.sort_unstable();
        out
    }

    /// Lossy top-level view: the trigrams this query requires outright.
    ///
    /// Nested ORs are dropped, which only widens the condition, so the
    /// result is still satisfied by every match. Used for diagnostics.
    pub fn required_trigrams(&self) -> Query {
        match self {
            Query::Trigram(_) | Query::All | Query::None => self.clone(),
            Query::And(subs) => Query::all_of(subs.iter().filter_map(|q| match q {
                Query::Trigram(t) => Some(*t),
                _ => None,
            })),
            Query::Or(_) => Query::All,
        }
    }

    fn collect_trigrams(&self, seen: &mut AHashSet<Trigram>) {
        match self {
            Query::Trigram(t) => {
                seen.insert(*t);
            }
            Query::And(subs) | Query::Or(subs) => {
                for sub in subs {
                    sub.collect_trigrams(seen);
                }
            }
            Query::All | Query::None => {}
        }
    }

    fn flatten_into(self, subs: &mut Vec<Query>, is_and: bool) {
        match self {
            Query::And(children) if is_and => {
                for child in children {
                    push_unique(subs, child);
                }
            }
            Query::Or(children) if !is_and => {
                for child in children {
                    push_unique(subs, child);
                }
            }
            other => push_unique(subs, other),
        }
    }

    fn from_subs(mut subs: Vec<Query>, is_and: bool) -> Query {
        if subs.len() == 1 {
            return subs.pop().unwrap_or(Query::All);
        }
        if is_and { Query::And(subs) } else { Query::Or(subs) }
    }
}

fn push_unique(subs: &mut Vec<Query>, q: Query) {
    if !subs.contains(&q) {
        subs.push(q);
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::All => write!(f, "+"),
            Query::None => write!(f, "-"),
            Query::Trigram(t) => write!(f, "\"{}\"", trigram_to_bytes(*t).escape_ascii()),
            Query::And(subs) => {
                for (i, sub) in subs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match sub {
                        Query::Or(_) => write!(f, "({})", sub)?,
                        _ => write!(f, "{}", sub)?,
                    }
                }
                Ok(())
            }
            Query::Or(subs) => {
                for (i, sub) in subs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    match sub {
                        Query::And(_) => write!(f, "({})", sub)?,
                        _ => write!(f, "{}", sub)?,
                    }
                }
                Ok(())
            }
        }
    }
}
