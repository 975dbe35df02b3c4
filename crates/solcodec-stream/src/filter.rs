//! Subscription filter and the subscribe request built from it.

use std::collections::{BTreeSet, HashMap};
use yellowstone_grpc_proto::geyser::{
    SubscribeRequest, SubscribeRequestFilterAccounts, SubscribeRequestFilterTransactions,
    SubscribeRequestPing,
};

use crate::config::Commitment;

/// What a connection subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Transactions,
    Accounts,
}

/// Watched addresses and owners. Every effective mutation bumps `revision`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    addresses: BTreeSet<String>,
    owners: BTreeSet<String>,
    revision: u64,
}

impl SubscriptionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(String::as_str)
    }

    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.owners.iter().map(String::as_str)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns `true` if the filter changed.
    pub fn add_addresses<I, S>(&mut self, items: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let changed = extend(&mut self.addresses, items);
        self.bump(changed)
    }

    pub fn remove_addresses<I, S>(&mut self, items: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let changed = retain_without(&mut self.addresses, items);
        self.bump(changed)
    }

    pub fn add_owners<I, S>(&mut self, items: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let changed = extend(&mut self.owners, items);
        self.bump(changed)
    }

    pub fn remove_owners<I, S>(&mut self, items: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let changed = retain_without(&mut self.owners, items);
        self.bump(changed)
    }

    fn bump(&mut self, changed: bool) -> bool {
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Full subscribe request for this filter. Each request replaces the
    /// server-side filter set, so it always carries everything.
    pub fn to_request(&self, kind: StreamKind, filter_name: &str, commitment: Commitment) -> SubscribeRequest {
        let mut request = SubscribeRequest {
            commitment: Some(commitment.to_proto() as i32),
            ..Default::default()
        };
        match kind {
            StreamKind::Transactions => {
                let filter = SubscribeRequestFilterTransactions {
                    vote: Some(false),
                    failed: Some(false),
                    account_include: self.addresses.iter().cloned().collect(),
                    account_exclude: vec![],
                    account_required: vec![],
                    ..Default::default()
                };
                request.transactions = HashMap::from([(filter_name.to_string(), filter)]);
            }
            StreamKind::Accounts => {
                let filter = SubscribeRequestFilterAccounts {
                    account: self.addresses.iter().cloned().collect(),
                    owner: self.owners.iter().cloned().collect(),
                    filters: vec![],
                    ..Default::default()
                };
                request.accounts = HashMap::from([(filter_name.to_string(), filter)]);
            }
        }
        request
    }
}

/// Keep-alive reply to a server ping. Carries no filters, so the server
/// leaves the current subscription untouched.
pub fn ping_request(id: i32) -> SubscribeRequest {
    SubscribeRequest {
        ping: Some(SubscribeRequestPing { id }),
        ..Default::default()
    }
}

fn extend<I, S>(set: &mut BTreeSet<String>, items: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().fold(false, |changed, s| set.insert(s.into()) | changed)
}

fn retain_without<I, S>(set: &mut BTreeSet<String>, items: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().fold(false, |changed, s| set.remove(s.as_ref()) | changed)
}
