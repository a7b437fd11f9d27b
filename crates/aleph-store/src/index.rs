//! In-memory statement index.
//!
//! [`StatementIndex`] holds the primary records together with the WKI and
//! namespace reverse indices. Every statement is assigned an arrival number
//! the first time its id is seen; all query results are ordered by it. An
//! overwrite keeps the original arrival number, so re-putting a statement
//! never moves it.
//!
//! The index itself is not synchronized. The owner wraps it in a lock and
//! applies each upsert as a single mutation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use aleph_types::{Statement, StatementId};

use crate::namespace::NamespacePattern;

/// Outcome of an upsert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// Primary table plus WKI and namespace indices.
#[derive(Debug, Default)]
pub struct StatementIndex {
    next_arrival: u64,
    /// Primary records in arrival order.
    records: BTreeMap<u64, Statement>,
    /// Statement id to arrival number.
    ids: HashMap<StatementId, u64>,
    /// WKI to arrival numbers of statements referencing it.
    wki: HashMap<String, BTreeSet<u64>>,
    /// Namespace to arrival numbers. Ordered so prefix queries are range scans.
    namespaces: BTreeMap<String, BTreeSet<u64>>,
}

impl StatementIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or replace a statement, keeping all three structures consistent.
    pub fn upsert(&mut self, statement: Statement) -> Upsert {
        let (arrival, outcome) = match self.ids.get(&statement.id).copied() {
            Some(arrival) => {
                if let Some(previous) = self.records.remove(&arrival) {
                    self.unlink(arrival, &previous);
                }
                (arrival, Upsert::Replaced)
            }
            None => {
                let arrival = self.next_arrival;
                self.next_arrival += 1;
                self.ids.insert(statement.id.clone(), arrival);
                (arrival, Upsert::Inserted)
            }
        };

        self.link(arrival, &statement);
        self.records.insert(arrival, statement);
        outcome
    }

    pub fn get(&self, id: &StatementId) -> Option<&Statement> {
        self.ids.get(id).and_then(|arrival| self.records.get(arrival))
    }

    pub fn contains(&self, id: &StatementId) -> bool {
        self.ids.contains_key(id)
    }

    /// Statements whose refs include `wki`, in arrival order.
    pub fn by_wki(&self, wki: &str) -> Vec<&Statement> {
        match self.wki.get(wki) {
            Some(arrivals) => self.resolve(arrivals.iter().copied()),
            None => Vec::new(),
        }
    }

    /// Statements whose namespace matches `pattern`, in arrival order.
    pub fn by_namespace(&self, pattern: &str) -> Vec<&Statement> {
        match NamespacePattern::parse(pattern) {
            NamespacePattern::Any => self.records.values().collect(),
            NamespacePattern::Exact(namespace) => match self.namespaces.get(namespace) {
                Some(arrivals) => self.resolve(arrivals.iter().copied()),
                None => Vec::new(),
            },
            NamespacePattern::Prefix(prefix) => {
                let arrivals: BTreeSet<u64> = self
                    .namespaces
                    .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
                    .take_while(|(namespace, _)| namespace.starts_with(prefix))
                    .flat_map(|(_, arrivals)| arrivals.iter().copied())
                    .collect();
                self.resolve(arrivals.into_iter())
            }
        }
    }

    /// All statements in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.records.values()
    }

    fn resolve(&self, arrivals: impl Iterator<Item = u64>) -> Vec<&Statement> {
        arrivals
            .filter_map(|arrival| self.records.get(&arrival))
            .collect()
    }

    fn link(&mut self, arrival: u64, statement: &Statement) {
        for wki in statement.refs() {
            self.wki.entry(wki.clone()).or_default().insert(arrival);
        }
        self.namespaces
            .entry(statement.namespace.clone())
            .or_default()
            .insert(arrival);
    }

    fn unlink(&mut self, arrival: u64, statement: &Statement) {
        for wki in statement.refs() {
            if let Some(arrivals) = self.wki.get_mut(wki) {
                arrivals.remove(&arrival);
                if arrivals.is_empty() {
                    self.wki.remove(wki);
                }
            }
        }
        if let Some(arrivals) = self.namespaces.get_mut(&statement.namespace) {
            arrivals.remove(&arrival);
            if arrivals.is_empty() {
                self.namespaces.remove(&statement.namespace);
            }
        }
    }
}
