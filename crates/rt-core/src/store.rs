//! Session record store and reconciliation engine.
//!
//! Holds the deduplicated working set of (host, identity, privileged)
//! tuples seen so far and merges freshly polled records into it. Records
//! are append-only within a run: a host that stops being reported is not
//! evicted, because absence is not a signal with a relay pivot (traffic
//! comes and goes as captures happen).
//!
//! Matching is keyed on the (host, identity) pair; a host may carry many
//! identities and the privileged subset can only grow.

use rt_common::{HostAddr, Identity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// One relayed session as reported by a source poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionRecord {
    pub host: HostAddr,
    pub identity: Identity,
    pub privileged: bool,
}

impl SessionRecord {
    pub fn new(host: HostAddr, identity: Identity, privileged: bool) -> Self {
        SessionRecord {
            host,
            identity,
            privileged,
        }
    }
}

/// What one `ingest` call actually added.
///
/// `new_identities` counts identities attached to hosts that were already
/// known before the call; identities arriving with a brand-new host are
/// covered by `new_hosts`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestDiff {
    /// Hosts never seen before this call.
    pub new_hosts: usize,
    /// Hosts that gained their first privileged identity in this call
    /// (includes privileged hosts that are new outright).
    pub new_privileged_hosts: usize,
    /// New identities on already-known hosts.
    pub new_identities: usize,
}

impl IngestDiff {
    /// True when the call added nothing.
    pub fn is_empty(&self) -> bool {
        self.new_hosts == 0 && self.new_privileged_hosts == 0 && self.new_identities == 0
    }
}

impl std::fmt::Display for IngestDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} new hosts ({} privileged), {} new identities on known hosts",
            self.new_hosts, self.new_privileged_hosts, self.new_identities
        )
    }
}

/// In-memory working set of relayed sessions.
///
/// Insertion ordered: `identity_for` picks the first-discovered identity
/// so repeated batches against the same host are reproducible.
#[derive(Debug, Default)]
pub struct SessionStore {
    records: Vec<SessionRecord>,
    seen: HashSet<(HostAddr, Identity)>,
    by_host: HashMap<HostAddr, Vec<usize>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge freshly polled records into the store.
    ///
    /// Only records whose (host, identity) key is unseen are added;
    /// duplicates within one poll and across polls are both collapsed.
    /// Re-ingesting an identical set yields an all-zero diff.
    pub fn ingest(&mut self, records: impl IntoIterator<Item = SessionRecord>) -> IngestDiff {
        let mut diff = IngestDiff::default();

        for record in records {
            let key = (record.host.clone(), record.identity.clone());
            if self.seen.contains(&key) {
                continue;
            }

            let host_known = self.by_host.contains_key(&record.host);
            let host_was_privileged = host_known && self.host_is_privileged(&record.host);

            let idx = self.records.len();
            self.seen.insert(key);
            self.by_host
                .entry(record.host.clone())
                .or_default()
                .push(idx);

            if host_known {
                diff.new_identities += 1;
                if record.privileged && !host_was_privileged {
                    diff.new_privileged_hosts += 1;
                }
            } else {
                diff.new_hosts += 1;
                if record.privileged {
                    diff.new_privileged_hosts += 1;
                }
            }

            self.records.push(record);
        }

        diff
    }

    /// All hosts with at least one privileged identity, computed live.
    ///
    /// Never cached: the privileged set can only grow between polls and
    /// completion status must always be derived against the current set.
    pub fn privileged_hosts(&self) -> BTreeSet<HostAddr> {
        self.by_host
            .iter()
            .filter(|(host, _)| self.host_is_privileged(host))
            .map(|(host, _)| host.clone())
            .collect()
    }

    /// Deterministic identity pick for a host: first discovered, optionally
    /// restricted to privileged identities.
    pub fn identity_for(&self, host: &HostAddr, require_privileged: bool) -> Option<&Identity> {
        let indices = self.by_host.get(host)?;
        indices
            .iter()
            .map(|&i| &self.records[i])
            .find(|r| !require_privileged || r.privileged)
            .map(|r| &r.identity)
    }

    /// Whether a host is known at all (privileged or not).
    pub fn knows_host(&self, host: &HostAddr) -> bool {
        self.by_host.contains_key(host)
    }

    /// Count of unique hosts seen so far.
    pub fn host_count(&self) -> usize {
        self.by_host.len()
    }

    /// Count of unique (host, identity) pairs seen so far.
    pub fn identity_count(&self) -> usize {
        self.records.len()
    }

    /// All records in discovery order.
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    fn host_is_privileged(&self, host: &HostAddr) -> bool {
        self.by_host
            .get(host)
            .map(|indices| indices.iter().any(|&i| self.records[i].privileged))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(host: &str, identity: &str, privileged: bool) -> SessionRecord {
        SessionRecord::new(
            HostAddr(host.to_string()),
            Identity(identity.to_string()),
            privileged,
        )
    }

    #[test]
    fn test_empty_ingest_zero_diff() {
        let mut store = SessionStore::new();
        let diff = store.ingest(Vec::new());
        assert!(diff.is_empty());
        assert_eq!(store.host_count(), 0);
    }

    #[test]
    fn test_first_privileged_record() {
        let mut store = SessionStore::new();
        let diff = store.ingest(vec![record("10.0.0.5", "CORP/alice", true)]);
        assert_eq!(diff.new_hosts, 1);
        assert_eq!(diff.new_privileged_hosts, 1);
        assert_eq!(diff.new_identities, 0);
    }

    #[test]
    fn test_second_identical_poll_zero_diff() {
        let mut store = SessionStore::new();
        let records = vec![
            record("10.0.0.5", "CORP/alice", true),
            record("10.0.0.6", "CORP/bob", false),
        ];
        let first = store.ingest(records.clone());
        assert!(!first.is_empty());
        let second = store.ingest(records);
        assert!(second.is_empty());
        assert_eq!(store.identity_count(), 2);
    }

    #[test]
    fn test_duplicate_within_one_poll() {
        let mut store = SessionStore::new();
        let diff = store.ingest(vec![
            record("10.0.0.5", "CORP/alice", true),
            record("10.0.0.5", "CORP/alice", true),
        ]);
        assert_eq!(diff.new_hosts, 1);
        assert_eq!(store.identity_count(), 1);
    }

    #[test]
    fn test_new_identity_on_known_host() {
        let mut store = SessionStore::new();
        store.ingest(vec![record("10.0.0.5", "CORP/alice", true)]);
        let diff = store.ingest(vec![record("10.0.0.5", "CORP/bob", true)]);
        assert_eq!(diff.new_hosts, 0);
        assert_eq!(diff.new_identities, 1);
        // Host was already privileged, so no new privileged host.
        assert_eq!(diff.new_privileged_hosts, 0);
    }

    #[test]
    fn test_host_gains_privilege_counts_as_new_privileged() {
        let mut store = SessionStore::new();
        store.ingest(vec![record("10.0.0.5", "CORP/alice", false)]);
        assert!(store.privileged_hosts().is_empty());

        let diff = store.ingest(vec![record("10.0.0.5", "CORP/admin", true)]);
        assert_eq!(diff.new_hosts, 0);
        assert_eq!(diff.new_identities, 1);
        assert_eq!(diff.new_privileged_hosts, 1);
        assert_eq!(store.privileged_hosts().len(), 1);
    }

    #[test]
    fn test_privileged_hosts_live() {
        let mut store = SessionStore::new();
        store.ingest(vec![
            record("10.0.0.5", "CORP/alice", true),
            record("10.0.0.6", "CORP/bob", false),
        ]);
        let privileged = store.privileged_hosts();
        assert!(privileged.contains(&HostAddr("10.0.0.5".into())));
        assert!(!privileged.contains(&HostAddr("10.0.0.6".into())));
    }

    #[test]
    fn test_identity_for_first_discovered() {
        let mut store = SessionStore::new();
        store.ingest(vec![
            record("10.0.0.5", "CORP/alice", false),
            record("10.0.0.5", "CORP/admin", true),
            record("10.0.0.5", "CORP/root2", true),
        ]);
        let any = store.identity_for(&HostAddr("10.0.0.5".into()), false);
        assert_eq!(any.map(|i| i.as_str()), Some("CORP/alice"));
        let privileged = store.identity_for(&HostAddr("10.0.0.5".into()), true);
        assert_eq!(privileged.map(|i| i.as_str()), Some("CORP/admin"));
    }

    #[test]
    fn test_identity_for_unknown_host() {
        let store = SessionStore::new();
        assert!(store.identity_for(&HostAddr("1.2.3.4".into()), false).is_none());
    }

    proptest! {
        /// Re-ingesting any record set is a no-op the second time.
        #[test]
        fn prop_ingest_idempotent(
            hosts in proptest::collection::vec("[0-9]{1,3}\\.0\\.0\\.[0-9]{1,3}", 0..8),
            flags in proptest::collection::vec(any::<bool>(), 0..8),
        ) {
            let records: Vec<SessionRecord> = hosts
                .iter()
                .zip(flags.iter().chain(std::iter::repeat(&false)))
                .map(|(h, p)| record(h, "CORP/user", *p))
                .collect();

            let mut store = SessionStore::new();
            store.ingest(records.clone());
            let hosts_before = store.host_count();
            let ids_before = store.identity_count();

            let second = store.ingest(records);
            prop_assert!(second.is_empty());
            prop_assert_eq!(store.host_count(), hosts_before);
            prop_assert_eq!(store.identity_count(), ids_before);
        }

        /// The privileged set is a subset of all known hosts.
        #[test]
        fn prop_privileged_subset_of_known(
            hosts in proptest::collection::vec("[0-9]{1,3}\\.1\\.1\\.[0-9]{1,3}", 0..8),
            flags in proptest::collection::vec(any::<bool>(), 8),
        ) {
            let records: Vec<SessionRecord> = hosts
                .iter()
                .zip(flags.iter())
                .map(|(h, p)| record(h, "CORP/user", *p))
                .collect();

            let mut store = SessionStore::new();
            store.ingest(records);
            for host in store.privileged_hosts() {
                prop_assert!(store.knows_host(&host));
            }
        }
    }
}
