//! Ordered record store with a derived filtered view.
//!
//! Records keep scan order. The view is a list of positions into the record
//! vector and is rebuilt from scratch whenever the records or the query
//! change; nothing patches it in place.

use crate::record::Record;
use crate::search::{Query, filter_indices};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct Catalog {
    root: Option<PathBuf>,
    records: Vec<Record>,
    query: Option<Query>,
    view: Vec<usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole record set in one step, keeping the active query.
    ///
    /// Later duplicates of an identity are dropped so the primary key stays
    /// unique even if a caller hands over a sloppy list.
    pub fn install(&mut self, root: PathBuf, records: Vec<Record>) {
        let mut seen = BTreeSet::new();
        self.records = records
            .into_iter()
            .filter(|record| seen.insert(record.identity.clone()))
            .collect();
        self.root = Some(root);
        self.refresh_view();
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, identity: &Path) -> Option<&Record> {
        self.records.iter().find(|r| r.identity == identity)
    }

    pub fn find_by_name(&self, relative_name: &Path) -> Option<&Record> {
        self.records.iter().find(|r| r.relative_name == relative_name)
    }

    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// Swap the predicate and rebuild the view.
    pub fn set_query(&mut self, query: Option<Query>) {
        self.query = query;
        self.refresh_view();
    }

    pub fn view_len(&self) -> usize {
        self.view.len()
    }

    pub fn view(&self) -> impl Iterator<Item = &Record> {
        self.view.iter().map(|&idx| &self.records[idx])
    }

    /// Records of the view between `start` and `end` (view positions).
    pub fn view_slice(&self, start: usize, end: usize) -> Vec<&Record> {
        let end = end.min(self.view.len());
        let start = start.min(end);
        self.view[start..end]
            .iter()
            .map(|&idx| &self.records[idx])
            .collect()
    }

    pub(crate) fn push(&mut self, record: Record) {
        self.records.push(record);
        self.refresh_view();
    }

    /// Replace the record sharing `record.identity`. Returns false when no
    /// such record exists.
    pub(crate) fn replace(&mut self, record: Record) -> bool {
        let Some(slot) = self
            .records
            .iter_mut()
            .find(|existing| existing.identity == record.identity)
        else {
            return false;
        };
        *slot = record;
        self.refresh_view();
        true
    }

    pub(crate) fn remove(&mut self, identity: &Path) -> Option<Record> {
        let pos = self.records.iter().position(|r| r.identity == identity)?;
        let removed = self.records.remove(pos);
        self.refresh_view();
        Some(removed)
    }

    fn refresh_view(&mut self) {
        self.view = filter_indices(&self.records, self.query.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Definition;

    fn record(name: &str, tag: &str) -> Record {
        let text = format!("id: {name}\ninfo:\n  tags: {tag}\n");
        let def = Definition::parse(&text, name).expect("fixture parses");
        Record::new(
            def,
            PathBuf::from(format!("/defs/{name}.yaml")),
            PathBuf::from(format!("{name}.yaml")),
        )
    }

    #[test]
    fn view_tracks_query_after_mutations() {
        let mut catalog = Catalog::new();
        catalog.install(PathBuf::from("/defs"), vec![record("a", "rce"), record("b", "xss")]);
        catalog.set_query(Query::parse("rce"));
        assert_eq!(catalog.view_len(), 1);

        // A new record that does not match must not leak into the view.
        catalog.push(record("c", "lfi"));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.view_len(), 1);

        catalog.push(record("d", "rce"));
        let names: Vec<_> = catalog.view().map(|r| r.display_name()).collect();
        assert_eq!(names, vec!["a.yaml", "d.yaml"]);

        assert!(catalog.replace(record("a", "sqli")));
        assert_eq!(catalog.view_len(), 1);

        catalog.remove(Path::new("/defs/d.yaml"));
        assert_eq!(catalog.view_len(), 0);

        catalog.set_query(None);
        assert_eq!(catalog.view_len(), catalog.len());
    }

    #[test]
    fn install_drops_duplicate_identities() {
        let mut catalog = Catalog::new();
        catalog.install(PathBuf::from("/defs"), vec![record("a", "x"), record("a", "y")]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.records()[0].info().tags, vec!["x".to_string()]);
    }

    #[test]
    fn replace_of_unknown_identity_is_rejected() {
        let mut catalog = Catalog::new();
        catalog.install(PathBuf::from("/defs"), vec![record("a", "x")]);
        assert!(!catalog.replace(record("z", "x")));
        assert_eq!(catalog.len(), 1);
    }
}
