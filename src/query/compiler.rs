//! Regex to trigram query compiler.
//!
//! Walks a `regex_syntax` HIR bottom-up, computing for every node a
//! [`RegexInfo`]: whether it can match the empty string, the exact set of
//! strings it matches (when small), or otherwise sets of possible prefixes
//! and suffixes, plus a [`Query`] every match satisfies. Concatenation
//! crosses the left suffixes with the right prefixes so that short
//! fragments on either side of a boundary still yield trigrams.
//!
//! The result over-approximates: a file excluded by the query cannot
//! contain a match.

use crate::query::Query;
use crate::utils::literal_trigrams;
use regex_syntax::hir::{Class, Hir, HirKind, Repetition};
use serde::{Deserialize, Serialize};

/// Size caps that trade query precision for compile cost.
///
/// Exceeding a cap never fails; it only widens the query toward `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerLimits {
    /// Largest exact string set tracked before switching to prefix/suffix form
    pub max_exact: usize,
    /// Largest prefix or suffix set before strings are shortened
    pub max_set: usize,
    /// Largest character class expanded into single characters
    pub max_class: usize,
    /// Alternations with more branches than this compile to `All`
    pub max_alternates: usize,
}

impl Default for CompilerLimits {
    fn default() -> Self {
        Self {
            max_exact: 7,
            max_set: 20,
            max_class: 100,
            max_alternates: 32,
        }
    }
}

type StringSet = Vec<Vec<u8>>;

/// What is known about the strings a sub-expression matches.
#[derive(Debug, Clone)]
struct RegexInfo {
    can_empty: bool,
    /// Exact set of matched strings, when known. Exact info is the
    /// compiler-internal "this node is fully described by literals" flag.
    exact: Option<StringSet>,
    /// Possible prefixes of a match (meaningful only when `exact` is None)
    prefix: StringSet,
    /// Possible suffixes of a match (meaningful only when `exact` is None)
    suffix: StringSet,
    /// Condition every match satisfies
    matches: Query,
}

impl RegexInfo {
    fn new(matches: Query) -> Self {
        Self {
            can_empty: false,
            exact: None,
            prefix: Vec::new(),
            suffix: Vec::new(),
            matches,
        }
    }

    /// Matches nothing
    fn no_match() -> Self {
        Self::new(Query::None)
    }

    /// Matches any single character
    fn any_char() -> Self {
        Self {
            prefix: vec![Vec::new()],
            suffix: vec![Vec::new()],
            ..Self::new(Query::All)
        }
    }

    /// Matches anything, including the empty string
    fn any_match() -> Self {
        Self {
            can_empty: true,
            ..Self::any_char()
        }
    }

    /// Matches exactly the strings in `set`
    fn exact(set: StringSet) -> Self {
        Self {
            can_empty: set.iter().any(|s| s.is_empty()),
            exact: Some(set),
            ..Self::new(Query::All)
        }
    }

    fn empty_string() -> Self {
        Self::exact(vec![Vec::new()])
    }
}

/// Compiles regex syntax trees into trigram queries.
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    limits: CompilerLimits,
}

impl QueryCompiler {
    pub fn new(limits: CompilerLimits) -> Self {
        Self { limits }
    }

    /// Derive the query every match of `hir` satisfies.
    pub fn compile(&self, hir: &Hir) -> Query {
        let mut info = self.analyze(hir);
        self.simplify(&mut info, true);
        add_exact(&mut info);
        info.matches
    }

    fn analyze(&self, hir: &Hir) -> RegexInfo {
        let mut info = match hir.kind() {
            // Anchors and word boundaries constrain position, not content.
            HirKind::Empty | HirKind::Look(_) => RegexInfo::empty_string(),
            HirKind::Literal(lit) => RegexInfo::exact(vec![lit.0.to_vec()]),
            HirKind::Class(class) => self.class(class),
            HirKind::Capture(cap) => self.analyze(&cap.sub),
            HirKind::Repetition(rep) => self.repetition(rep),
            HirKind::Concat(subs) => self.fold(subs, RegexInfo::empty_string(), |x, y| {
                self.concat(x, y)
            }),
            HirKind::Alternation(subs) => {
                if subs.len() > self.limits.max_alternates {
                    RegexInfo::any_match()
                } else {
                    self.fold(subs, RegexInfo::no_match(), |x, y| self.alternate(x, y))
                }
            }
        };
        self.simplify(&mut info, false);
        info
    }

    fn fold<F>(&self, subs: &[Hir], zero: RegexInfo, f: F) -> RegexInfo
    where
        F: Fn(RegexInfo, RegexInfo) -> RegexInfo,
    {
        let mut iter = subs.iter();
        let Some(first) = iter.next() else {
            return zero;
        };
        iter.fold(self.analyze(first), |acc, sub| f(acc, self.analyze(sub)))
    }

    fn class(&self, class: &Class) -> RegexInfo {
        let mut set = StringSet::new();
        match class {
            Class::Unicode(cls) => {
                let size: usize = cls
                    .ranges()
                    .iter()
                    .map(|r| (r.end() as usize) - (r.start() as usize) + 1)
                    .sum();
                if size == 0 {
                    return RegexInfo::no_match();
                }
                if size > self.limits.max_class {
                    return RegexInfo::any_char();
                }
                let mut buf = [0u8; 4];
                for range in cls.ranges() {
                    for c in range.start()..=range.end() {
                        set.push(c.encode_utf8(&mut buf).as_bytes().to_vec());
                    }
                }
            }
            Class::Bytes(cls) => {
                let size: usize = cls
                    .ranges()
                    .iter()
                    .map(|r| (r.end() as usize) - (r.start() as usize) + 1)
                    .sum();
                if size == 0 {
                    return RegexInfo::no_match();
                }
                if size > self.limits.max_class {
                    return RegexInfo::any_char();
                }
                for range in cls.ranges() {
                    for b in range.start()..=range.end() {
                        set.push(vec![b]);
                    }
                }
            }
        }
        RegexInfo::exact(set)
    }

    fn repetition(&self, rep: &Repetition) -> RegexInfo {
        match (rep.min, rep.max) {
            // x?
            (0, Some(1)) => self.alternate(self.analyze(&rep.sub), RegexInfo::empty_string()),
            // x*, x{0,n}: nothing is guaranteed
            (0, _) => RegexInfo::any_match(),
            // x+, x{n,m}: at least one x, so its prefixes and suffixes hold,
            // but the exact set no longer describes the whole match.
            _ => {
                let mut info = self.analyze(&rep.sub);
                if let Some(exact) = info.exact.take() {
                    info.prefix = exact.clone();
                    info.suffix = exact;
                }
                info
            }
        }
    }

    fn concat(&self, x: RegexInfo, y: RegexInfo) -> RegexInfo {
        let mut xy = RegexInfo::new(x.matches.clone().and(y.matches.clone()));
        xy.can_empty = x.can_empty && y.can_empty;

        match (&x.exact, &y.exact) {
            (Some(xe), Some(ye)) => xy.exact = Some(cross(xe, ye, false)),
            _ => {
                xy.prefix = match &x.exact {
                    Some(xe) => cross(xe, &y.prefix, false),
                    None if x.can_empty => {
                        union(&x.prefix, y.exact.as_ref().unwrap_or(&y.prefix), false)
                    }
                    None => x.prefix.clone(),
                };
                xy.suffix = match &y.exact {
                    Some(ye) => cross(&x.suffix, ye, true),
                    None if y.can_empty => {
                        union(&y.suffix, x.exact.as_ref().unwrap_or(&x.suffix), true)
                    }
                    None => y.suffix.clone(),
                };
            }
        }

        // Strings straddling the boundary: if every suffix of x joined with
        // every prefix of y is at least 3 bytes, one of them must appear.
        if x.exact.is_none()
            && y.exact.is_none()
            && x.suffix.len() <= self.limits.max_set
            && y.prefix.len() <= self.limits.max_set
            && min_len(&x.suffix) + min_len(&y.prefix) >= 3
        {
            let boundary = cross(&x.suffix, &y.prefix, false);
            xy.matches = xy.matches.and(trigram_query(&boundary));
        }

        self.simplify(&mut xy, false);
        xy
    }

    fn alternate(&self, mut x: RegexInfo, mut y: RegexInfo) -> RegexInfo {
        let mut xy = RegexInfo::new(Query::All);

        match (x.exact.clone(), y.exact.clone()) {
            (Some(xe), Some(ye)) => xy.exact = Some(union(&xe, &ye, false)),
            (Some(xe), None) => {
                xy.prefix = union(&xe, &y.prefix, false);
                xy.suffix = union(&xe, &y.suffix, true);
                add_exact(&mut x);
            }
            (None, Some(ye)) => {
                xy.prefix = union(&x.prefix, &ye, false);
                xy.suffix = union(&x.suffix, &ye, true);
                add_exact(&mut y);
            }
            (None, None) => {
                xy.prefix = union(&x.prefix, &y.prefix, false);
                xy.suffix = union(&x.suffix, &y.suffix, true);
            }
        }

        xy.can_empty = x.can_empty || y.can_empty;
        xy.matches = x.matches.or(y.matches);
        self.simplify(&mut xy, false);
        xy
    }

    /// Keep the info small: large or long exact sets are folded into the
    /// query and replaced by 2-byte prefixes/suffixes, and oversized
    /// prefix/suffix sets are shortened.
    fn simplify(&self, info: &mut RegexInfo, force: bool) {
        if let Some(exact) = info.exact.as_mut() {
            clean(exact, false);
        }

        let fold_exact = info.exact.as_ref().is_some_and(|exact| {
            let min = min_len(exact);
            exact.len() > self.limits.max_exact || (min >= 3 && force) || min >= 4
        });
        if fold_exact {
            add_exact(info);
            if let Some(exact) = info.exact.take() {
                for s in exact {
                    let n = s.len();
                    if n < 3 {
                        info.prefix.push(s.clone());
                        info.suffix.push(s);
                    } else {
                        info.prefix.push(s[..2].to_vec());
                        info.suffix.push(s[n - 2..].to_vec());
                    }
                }
            }
        }

        if info.exact.is_none() {
            self.simplify_set(info, false);
            self.simplify_set(info, true);
        }
    }

    fn simplify_set(&self, info: &mut RegexInfo, is_suffix: bool) {
        let mut set = std::mem::take(if is_suffix {
            &mut info.suffix
        } else {
            &mut info.prefix
        });
        clean(&mut set, is_suffix);

        // The OR of the current prefixes (or suffixes) is itself a condition.
        info.matches = std::mem::replace(&mut info.matches, Query::All).and(trigram_query(&set));

        // Shorten to length n-1 until the set is small enough.
        let mut n = 3;
        while n > 0 && (n == 3 || set.len() > self.limits.max_set) {
            let mut shortened: StringSet = Vec::with_capacity(set.len());
            for s in set {
                let s = if s.len() >= n {
                    if is_suffix {
                        s[s.len() - n + 1..].to_vec()
                    } else {
                        s[..n - 1].to_vec()
                    }
                } else {
                    s
                };
                if shortened.last() != Some(&s) {
                    shortened.push(s);
                }
            }
            set = shortened;
            clean(&mut set, is_suffix);
            n -= 1;
        }

        // "ab" as a possible prefix makes "abc" redundant.
        let mut pruned: StringSet = Vec::with_capacity(set.len());
        for s in set {
            let redundant = pruned.last().is_some_and(|prev| {
                if is_suffix {
                    s.ends_with(prev)
                } else {
                    s.starts_with(prev)
                }
            });
            if !redundant {
                pruned.push(s);
            }
        }

        if is_suffix {
            info.suffix = pruned;
        } else {
            info.prefix = pruned;
        }
    }
}

/// Fold the exact set's trigrams into the info's query.
fn add_exact(info: &mut RegexInfo) {
    if let Some(exact) = &info.exact {
        let q = trigram_query(exact);
        info.matches = std::mem::replace(&mut info.matches, Query::All).and(q);
    }
}

/// OR over the strings of the AND of each string's trigrams.
///
/// A string shorter than 3 bytes guarantees nothing, so the whole set
/// then yields `All`.
fn trigram_query(set: &[Vec<u8>]) -> Query {
    if min_len(set) < 3 {
        return Query::All;
    }
    set.iter().fold(Query::None, |q, s| {
        q.or(Query::all_of(literal_trigrams(s)))
    })
}

fn min_len(set: &[Vec<u8>]) -> usize {
    set.iter().map(|s| s.len()).min().unwrap_or(0)
}

/// Sort (by reversed bytes for suffix sets) and dedup.
fn clean(set: &mut StringSet, is_suffix: bool) {
    if is_suffix {
        set.sort_by(|a, b| a.iter().rev().cmp(b.iter().rev()));
    } else {
        set.sort();
    }
    set.dedup();
}

fn cross(xs: &[Vec<u8>], ys: &[Vec<u8>], is_suffix: bool) -> StringSet {
    let mut out = Vec::with_capacity(xs.len() * ys.len());
    for x in xs {
        for y in ys {
            let mut s = Vec::with_capacity(x.len() + y.len());
            s.extend_from_slice(x);
            s.extend_from_slice(y);
            out.push(s);
        }
    }
    clean(&mut out, is_suffix);
    out
}

fn union(xs: &[Vec<u8>], ys: &[Vec<u8>], is_suffix: bool) -> StringSet {
    let mut out = Vec::with_capacity(xs.len() + ys.len());
    out.extend_from_slice(xs);
    out.extend_from_slice(ys);
    clean(&mut out, is_suffix);
    out
}
