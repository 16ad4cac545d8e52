//! # acctkit
//!
//! Pure Rust library for reconciling local user accounts.
//!
//! Given the accounts you want and the host's `/etc/passwd`, `/etc/group`
//! and (when readable) `/etc/shadow`, acctkit decides which of `useradd`,
//! `usermod`, `userdel` and `chage` to run and with which arguments. It
//! never runs them itself.
//!
//! ## Example
//!
//! ```no_run
//! use acctkit::{Compat, DesiredAccount, Pass, Platform};
//!
//! let mut pass = Pass::system(Platform::from_identity("CentOS"), Compat::default());
//! let desired = vec![DesiredAccount::new("bob").with_comment("Bob S.")];
//!
//! for (name, plan) in pass.plan(&desired).expect("account databases readable") {
//!     match plan {
//!         Ok(plan) => {
//!             for cmd in &plan.commands {
//!                 println!("{name}: {cmd}");
//!             }
//!         }
//!         Err(e) => eprintln!("{name}: {e}"),
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod command;
pub mod directory;
pub mod error;
pub mod platform;
pub mod policy;
pub mod reconcile;
pub mod shadow;
pub mod types;

pub use cache::{Instance, InstanceCache, Prefetch};
pub use command::{Builder, CommandLine, CommandSet, validate};
pub use directory::{Directory, Scan};
pub use error::{Error, ErrorScope, Result};
pub use platform::Platform;
pub use policy::{Compat, PolicyResolver};
pub use reconcile::{Action, Plan, Reconciler, changed_properties};
pub use shadow::{ShadowAccessor, ShadowCapability};
pub use types::{
    Account, DesiredAccount, Ensure, Group, Membership, Property, RawValue, ShadowEntry,
};

/// One reconciliation pass: a cache snapshot plus the reconciler using it.
pub struct Pass {
    cache: InstanceCache,
    reconciler: Reconciler,
}

impl Pass {
    /// Build a pass over the given databases.
    pub fn new(
        directory: Directory,
        shadow: ShadowAccessor,
        platform: Platform,
        compat: Compat,
        commands: CommandSet,
    ) -> Self {
        let builder = Builder::new(commands, PolicyResolver::new(platform, compat));
        let reconciler = Reconciler::new(builder, shadow.capability());
        Self {
            cache: InstanceCache::new(directory, shadow),
            reconciler,
        }
    }

    /// Build a pass over the host's databases with the default tools.
    pub fn system(platform: Platform, compat: Compat) -> Self {
        Self::new(
            Directory::system(),
            ShadowAccessor::system(),
            platform,
            compat,
            CommandSet::default(),
        )
    }

    /// The instance cache for this pass.
    pub fn cache(&self) -> &InstanceCache {
        &self.cache
    }

    /// Mutable access to the cache (for `load`, `refresh`, `bind`).
    pub fn cache_mut(&mut self) -> &mut InstanceCache {
        &mut self.cache
    }

    /// The reconciler for this pass.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Plan every desired account against one snapshot.
    pub fn plan(&mut self, desired: &[DesiredAccount]) -> Result<Vec<(String, Result<Plan>)>> {
        self.reconciler.plan_all(&mut self.cache, desired)
    }

    /// Every observed account as a presence record.
    pub fn observed(&mut self) -> Result<Vec<DesiredAccount>> {
        Ok(self
            .cache
            .load()?
            .iter()
            .map(Instance::to_desired)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn pass(dir: &TempDir, platform: Platform) -> Pass {
        Pass::new(
            Directory::new(dir.path().join("passwd"), dir.path().join("group")),
            ShadowAccessor::unavailable(),
            platform,
            Compat::default(),
            CommandSet::default(),
        )
    }

    #[test]
    fn test_pass_scenario() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("passwd"),
            "bob:x:1001:1001:Bob Smith:/home/bob:/bin/bash\n",
        )
        .unwrap();
        fs::write(dir.path().join("group"), "").unwrap();

        let mut pass = pass(&dir, Platform::RedHat);
        let desired = vec![
            DesiredAccount::new("bob").with_comment("Bob S."),
            DesiredAccount::new("alice"),
        ];
        let plans = pass.plan(&desired).unwrap();

        let bob = plans[0].1.as_ref().unwrap();
        assert_eq!(bob.commands[0].argv(), vec!["usermod", "-c", "Bob S.", "bob"]);

        let alice = plans[1].1.as_ref().unwrap();
        assert_eq!(alice.commands[0].argv(), vec!["useradd", "-M", "alice"]);
    }

    #[test]
    fn test_observed_lists_presence_records() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("passwd"),
            "root:x:0:0:root:/root:/bin/bash\nbob:x:1001:1001::/home/bob:/bin/sh\n",
        )
        .unwrap();
        fs::write(dir.path().join("group"), "wheel:x:10:bob\n").unwrap();

        let observed = pass(&dir, Platform::Debian).observed().unwrap();
        assert_eq!(observed.len(), 2);
        assert!(observed.iter().all(DesiredAccount::is_present));
        assert_eq!(observed[1].groups.as_deref(), Some("wheel"));
    }
}
