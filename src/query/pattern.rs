use crate::query::{CompilerLimits, Query, QueryCompiler};
use anyhow::{Context, Result};
use regex::bytes::{Regex, RegexBuilder};
use regex_syntax::ParserBuilder;
use regex_syntax::hir::Hir;

/// A search pattern parsed twice with the same flags: once into a matcher
/// for verification and once into a syntax tree for the query compiler.
///
/// Patterns are always multi-line, so `^` and `$` match at line boundaries.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    hir: Hir,
}

impl Pattern {
    pub fn new(pattern: &str, case_insensitive: bool) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .multi_line(true)
            .case_insensitive(case_insensitive)
            .build()
            .with_context(|| format!("invalid pattern {:?}", pattern))?;

        let hir = ParserBuilder::new()
            .multi_line(true)
            .case_insensitive(case_insensitive)
            .utf8(false)
            .build()
            .parse(pattern)
            .with_context(|| format!("invalid pattern {:?}", pattern))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
            hir,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn hir(&self) -> &Hir {
        &self.hir
    }

    /// Compile to a trigram query with the given limits
    pub fn query(&self, limits: CompilerLimits) -> Query {
        QueryCompiler::new(limits).compile(&self.hir)
    }
}
