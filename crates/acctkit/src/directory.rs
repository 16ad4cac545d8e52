//! Reader for the flat-file account and group databases.
//!
//! Both files are colon-delimited, one record per line:
//! ```text
//! bob:x:1001:1001:Bob Smith:/home/bob:/bin/bash      # passwd
//! wheel:x:10:alice,bob                               # group
//! ```
//!
//! The password placeholder column is ignored; password data lives in the
//! shadow facility. Malformed lines are dropped and counted rather than
//! failing the scan.

use crate::error::{Error, Result};
use crate::types::{Account, Group, split_groups};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Default location of the account database.
pub const PASSWD_PATH: &str = "/etc/passwd";

/// Default location of the group database.
pub const GROUP_PATH: &str = "/etc/group";

const PASSWD_FIELDS: usize = 7;
const GROUP_FIELDS: usize = 3;

/// Records read from one database, plus how many lines were dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan<T> {
    /// Well-formed records in file order
    pub records: Vec<T>,
    /// Non-blank lines that could not be parsed
    pub skipped: usize,
}

impl<T> Default for Scan<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// Paths of the account and group databases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    passwd: PathBuf,
    group: PathBuf,
}

impl Directory {
    /// Read from custom database paths (useful for testing).
    pub fn new(passwd: impl Into<PathBuf>, group: impl Into<PathBuf>) -> Self {
        Self {
            passwd: passwd.into(),
            group: group.into(),
        }
    }

    /// Read from the host's well-known database paths.
    pub fn system() -> Self {
        Self::new(PASSWD_PATH, GROUP_PATH)
    }

    /// Path of the account database.
    pub fn passwd_path(&self) -> &Path {
        &self.passwd
    }

    /// Path of the group database.
    pub fn group_path(&self) -> &Path {
        &self.group
    }

    /// Read every account.
    pub fn read_accounts(&self) -> Result<Scan<Account>> {
        scan(&self.passwd, parse_passwd_line)
    }

    /// Read every group.
    pub fn read_groups(&self) -> Result<Scan<Group>> {
        scan(&self.group, parse_group_line)
    }

    /// Groups listing `account` as a member, comma-joined in file order.
    ///
    /// Returns an empty string when the account belongs to no group.
    pub fn groups_of(&self, account: &str) -> Result<String> {
        let groups = self.read_groups()?;
        let names: Vec<&str> = groups
            .records
            .iter()
            .filter(|g| g.has_member(account))
            .map(|g| g.name.as_str())
            .collect();
        Ok(names.join(","))
    }
}

/// Map every account name to the groups listing it, from one group scan.
pub fn memberships(groups: &[Group]) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for group in groups {
        for member in &group.members {
            let entry = index.entry(member.clone()).or_default();
            if !entry.contains(&group.name) {
                entry.push(group.name.clone());
            }
        }
    }
    index
}

/// Stream a database file through a line parser.
fn scan<T>(path: &Path, parse: fn(&str) -> Option<T>) -> Result<Scan<T>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = BufReader::new(file);
    let mut result = Scan::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(path, e))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match parse(line) {
            Some(record) => result.records.push(record),
            None => {
                log::warn!("{}:{}: skipping malformed line", path.display(), index + 1);
                result.skipped += 1;
            }
        }
    }

    log::debug!(
        "read {} records from {} ({} skipped)",
        result.records.len(),
        path.display(),
        result.skipped
    );
    Ok(result)
}

/// Parse one account database line.
pub fn parse_passwd_line(line: &str) -> Option<Account> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < PASSWD_FIELDS || fields[0].is_empty() {
        return None;
    }

    Some(Account {
        name: fields[0].to_string(),
        uid: fields[2].parse().ok()?,
        gid: fields[3].parse().ok()?,
        gecos: fields[4].to_string(),
        home: fields[5].to_string(),
        shell: fields[6].trim_end().to_string(),
    })
}

/// Parse one group database line.
pub fn parse_group_line(line: &str) -> Option<Group> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < GROUP_FIELDS || fields[0].is_empty() {
        return None;
    }

    Some(Group {
        name: fields[0].to_string(),
        gid: fields[2].trim().parse().ok()?,
        members: fields
            .get(3)
            .map(|m| split_groups(m.trim()))
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PASSWD: &str = "root:x:0:0:root:/root:/bin/bash\n\
                          bob:x:1001:1001:Bob Smith:/home/bob:/bin/bash\n";
    const GROUP: &str = "wheel:x:10:root\n\
                         g1:x:100:alice,bob\n\
                         g2:x:101:bob\n\
                         empty:x:102:\n";

    fn fixture(passwd: &str, group: &str) -> (TempDir, Directory) {
        let dir = TempDir::new().unwrap();
        let passwd_path = dir.path().join("passwd");
        let group_path = dir.path().join("group");
        fs::write(&passwd_path, passwd).unwrap();
        fs::write(&group_path, group).unwrap();
        let directory = Directory::new(passwd_path, group_path);
        (dir, directory)
    }

    #[test]
    fn test_parse_passwd_line_round_trip() {
        let account = parse_passwd_line("bob:x:1001:1002:Bob Smith:/home/bob:/bin/bash\n").unwrap();
        assert_eq!(
            account,
            Account {
                name: "bob".into(),
                uid: 1001,
                gid: 1002,
                gecos: "Bob Smith".into(),
                home: "/home/bob".into(),
                shell: "/bin/bash".into(),
            }
        );
    }

    #[test]
    fn test_parse_passwd_line_rejects_short_lines() {
        assert!(parse_passwd_line("bob:x:1001:1001").is_none());
        assert!(parse_passwd_line("bob:x:abc:1001:Bob:/home/bob:/bin/sh").is_none());
        assert!(parse_passwd_line(":x:1:1:::").is_none());
    }

    #[test]
    fn test_parse_group_line_without_members() {
        let group = parse_group_line("empty:x:102:").unwrap();
        assert!(group.members.is_empty());
        let bare = parse_group_line("bare:x:103").unwrap();
        assert!(bare.members.is_empty());
    }

    #[test]
    fn test_read_accounts() {
        let (_dir, directory) = fixture(PASSWD, GROUP);
        let scan = directory.read_accounts().unwrap();
        assert_eq!(scan.records.len(), 2);
        assert_eq!(scan.skipped, 0);
        assert_eq!(scan.records[1].name, "bob");
        assert_eq!(scan.records[1].uid, 1001);
    }

    #[test]
    fn test_malformed_lines_are_counted_not_fatal() {
        let passwd = format!("{PASSWD}garbage\n\nshort:x:1\n");
        let (_dir, directory) = fixture(&passwd, GROUP);
        let scan = directory.read_accounts().unwrap();
        assert_eq!(scan.records.len(), 2);
        // blank line is not counted
        assert_eq!(scan.skipped, 2);
    }

    #[test]
    fn test_missing_database_is_io_error() {
        let directory = Directory::new("/nonexistent/passwd", "/nonexistent/group");
        let err = directory.read_accounts().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/nonexistent/passwd"));
    }

    #[test]
    fn test_groups_of() {
        let (_dir, directory) = fixture(PASSWD, GROUP);
        let groups = directory.groups_of("bob").unwrap();
        let mut set: Vec<&str> = groups.split(',').collect();
        set.sort_unstable();
        assert_eq!(set, vec!["g1", "g2"]);
        assert_eq!(directory.groups_of("carol").unwrap(), "");
    }

    #[test]
    fn test_memberships_index() {
        let (_dir, directory) = fixture(PASSWD, GROUP);
        let groups = directory.read_groups().unwrap();
        let index = memberships(&groups.records);
        assert_eq!(index["bob"], vec!["g1", "g2"]);
        assert_eq!(index["root"], vec!["wheel"]);
        assert!(!index.contains_key("carol"));
    }
}
