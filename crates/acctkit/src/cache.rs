//! Per-pass snapshot of every observed account.
//!
//! The cache reads the account, group and shadow databases once and keeps
//! the result until [`InstanceCache::refresh`] is called. Lookups never
//! trigger a read, so every resource in a pass sees the same snapshot even
//! if earlier commands changed the files.

use crate::command::date_from_days;
use crate::directory::{Directory, memberships};
use crate::error::{Error, Result};
use crate::shadow::ShadowAccessor;
use crate::types::{Account, DesiredAccount, Ensure, Property, RawValue, ShadowEntry};
use std::collections::{BTreeMap, HashMap};

/// Everything observed about one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    /// The account database record
    pub account: Account,
    /// Groups listing the account as a member, in file order
    pub groups: Vec<String>,
    /// Shadow data, when the capability is available
    pub shadow: Option<ShadowEntry>,
}

impl Instance {
    /// Login name.
    pub fn name(&self) -> &str {
        &self.account.name
    }

    /// Observed accounts always exist.
    pub fn ensure(&self) -> Ensure {
        Ensure::Present
    }

    /// Supplementary groups, comma-joined.
    pub fn groups_string(&self) -> String {
        self.groups.join(",")
    }

    /// Observed value of a property rendered like a desired value.
    ///
    /// Shadow-backed properties are `None` when shadow data is absent.
    pub fn value(&self, property: Property) -> Option<String> {
        let shadow = self.shadow.as_ref();
        match property {
            Property::Home => Some(self.account.home.clone()),
            Property::Uid => Some(self.account.uid.to_string()),
            Property::Gid => Some(self.account.gid.to_string()),
            Property::Comment => Some(self.account.gecos.clone()),
            Property::Shell => Some(self.account.shell.clone()),
            Property::Password => shadow?.password.clone(),
            Property::PasswordMinAge => shadow?.min_age.map(|d| d.to_string()),
            Property::PasswordMaxAge => shadow?.max_age.map(|d| d.to_string()),
            Property::Groups => Some(self.groups_string()),
            Property::Expiry => shadow?
                .expiry
                .and_then(date_from_days)
                .map(|d| d.format(crate::command::EXPIRY_FORMAT).to_string()),
        }
    }

    /// The presence record describing this account as it is now.
    pub fn to_desired(&self) -> DesiredAccount {
        let shadow = self.shadow.as_ref();
        DesiredAccount {
            name: self.account.name.clone(),
            ensure: Ensure::Present,
            uid: Some(RawValue::Int(i64::from(self.account.uid))),
            gid: Some(RawValue::Int(i64::from(self.account.gid))),
            comment: Some(self.account.gecos.clone()),
            home: Some(self.account.home.clone()),
            shell: Some(self.account.shell.clone()),
            password: shadow.and_then(|s| s.password.clone()),
            groups: Some(self.groups_string()),
            password_min_age: shadow.and_then(|s| s.min_age).map(RawValue::Int),
            password_max_age: shadow.and_then(|s| s.max_age).map(RawValue::Int),
            expiry: self.value(Property::Expiry),
            ..Default::default()
        }
    }
}

/// A resource that can take its observed state from the cache.
pub trait Prefetch {
    /// Receive the cached record for this resource's account.
    fn prefetch(&mut self, instance: &Instance);
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    instances: Vec<Instance>,
    index: HashMap<String, usize>,
    skipped: usize,
}

/// Load-once cache of observed accounts.
#[derive(Debug, Clone)]
pub struct InstanceCache {
    directory: Directory,
    shadow: ShadowAccessor,
    snapshot: Option<Snapshot>,
}

impl InstanceCache {
    /// Create an empty cache over a directory and shadow accessor.
    pub fn new(directory: Directory, shadow: ShadowAccessor) -> Self {
        Self {
            directory,
            shadow,
            snapshot: None,
        }
    }

    /// The directory this cache reads.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// The shadow accessor this cache reads.
    pub fn shadow(&self) -> &ShadowAccessor {
        &self.shadow
    }

    /// Whether a snapshot is held.
    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Read the databases if no snapshot is held, and return every instance.
    pub fn load(&mut self) -> Result<&[Instance]> {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.read_snapshot()?);
        }
        Ok(self
            .snapshot
            .as_ref()
            .map(|s| s.instances.as_slice())
            .unwrap_or_default())
    }

    /// Look up an account in the current snapshot.
    ///
    /// Returns `None` when the account is unknown or nothing is loaded yet.
    pub fn get(&self, name: &str) -> Option<&Instance> {
        let snapshot = self.snapshot.as_ref()?;
        snapshot.index.get(name).map(|&i| &snapshot.instances[i])
    }

    /// Drop the snapshot so the next [`InstanceCache::load`] re-reads.
    pub fn refresh(&mut self) {
        log::debug!("instance cache refreshed");
        self.snapshot = None;
    }

    /// Malformed lines dropped while building the current snapshot.
    pub fn skipped(&self) -> usize {
        self.snapshot.as_ref().map_or(0, |s| s.skipped)
    }

    /// Hand each resource keyed by account name its cached instance.
    ///
    /// Accounts without a matching resource are ignored. Returns how many
    /// resources were bound.
    pub fn bind<R: Prefetch>(&self, resources: &mut BTreeMap<String, R>) -> Result<usize> {
        let snapshot = self.snapshot.as_ref().ok_or(Error::CacheNotLoaded)?;
        let mut bound = 0;
        for instance in &snapshot.instances {
            if let Some(resource) = resources.get_mut(instance.name()) {
                resource.prefetch(instance);
                bound += 1;
            }
        }
        Ok(bound)
    }

    fn read_snapshot(&self) -> Result<Snapshot> {
        let accounts = self.directory.read_accounts()?;
        let groups = self.directory.read_groups()?;
        let mut member_of = memberships(&groups.records);
        let mut shadow: HashMap<String, ShadowEntry> = self
            .shadow
            .read_all()
            .into_iter()
            .map(|e| (e.name.clone(), e))
            .collect();

        let mut snapshot = Snapshot {
            skipped: accounts.skipped + groups.skipped,
            ..Default::default()
        };
        for account in accounts.records {
            if snapshot.index.contains_key(&account.name) {
                log::warn!("duplicate account '{}' ignored", account.name);
                continue;
            }
            let instance = Instance {
                groups: member_of.remove(&account.name).unwrap_or_default(),
                shadow: shadow.remove(&account.name),
                account,
            };
            snapshot
                .index
                .insert(instance.name().to_string(), snapshot.instances.len());
            snapshot.instances.push(instance);
        }

        log::debug!(
            "loaded {} accounts ({} malformed lines skipped)",
            snapshot.instances.len(),
            snapshot.skipped
        );
        Ok(snapshot)
    }
}
