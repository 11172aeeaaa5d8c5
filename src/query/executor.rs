use crate::index::posting;
use crate::index::reader::IndexReader;
use crate::index::types::FileId;
use crate::query::Query;
use anyhow::Result;

/// Evaluates a [`Query`] against an index, producing candidate file ids.
///
/// Candidates are a superset of the files that can match; the caller
/// verifies each one with the real regex.
pub struct QueryExecutor<'a> {
    reader: &'a IndexReader,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(reader: &'a IndexReader) -> Self {
        Self { reader }
    }

    /// Candidate file ids for `query`, ascending and duplicate-free
    pub fn execute(&self, query: &Query) -> Result<Vec<FileId>> {
        match query {
            Query::All => Ok(self.reader.all_files()),
            Query::None => Ok(Vec::new()),
            Query::Trigram(t) => self.reader.posting_list(*t),
            Query::And(subs) => self.execute_and(subs),
            Query::Or(subs) => self.execute_or(subs),
        }
    }

    fn execute_and(&self, subs: &[Query]) -> Result<Vec<FileId>> {
        let mut candidates: Option<Vec<FileId>> = None;

        // Plain trigrams first: they are cheap and usually narrow the set the most.
        for sub in subs {
            if let Query::Trigram(t) = sub {
                let next = match &candidates {
                    Some(list) => self.reader.posting_and(list, *t)?,
                    None => self.reader.posting_list(*t)?,
                };
                if next.is_empty() {
                    return Ok(next);
                }
                candidates = Some(next);
            }
        }

        for sub in subs {
            if matches!(sub, Query::Trigram(_) | Query::All) {
                continue;
            }
            let sub_list = self.execute(sub)?;
            let next = match &candidates {
                Some(list) => posting::intersect(list, &sub_list),
                None => sub_list,
            };
            if next.is_empty() {
                return Ok(next);
            }
            candidates = Some(next);
        }

        Ok(candidates.unwrap_or_else(|| self.reader.all_files()))
    }

    fn execute_or(&self, subs: &[Query]) -> Result<Vec<FileId>> {
        if subs.iter().any(Query::is_all) {
            return Ok(self.reader.all_files());
        }

        let mut result = Vec::new();
        for sub in subs {
            result = match sub {
                Query::Trigram(t) => self.reader.posting_or(&result, *t)?,
                _ => posting::union(&result, &self.execute(sub)?),
            };
        }
        Ok(result)
    }
}
