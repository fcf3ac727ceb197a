//! On-disk verification of node storage state.
//!
//! Each node keeps one subdirectory per participating domain, named
//! `rdomain-<DOMAINHEX>`. Inside it, values above the external-store
//! threshold live as individual `value…` files and packed small values as
//! fixed-size `iblock<n>` files. I/O errors here are surfaced, never
//! swallowed: a missing directory can mean real data loss.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use rand::seq::SliceRandom;

use ring_types::DomainId;

/// Directory-name tag prefixing a domain's hex id.
pub const DOMAIN_DIR_TAG: &str = "rdomain-";

/// File-name prefix of large external values.
pub const EXTERNAL_FILE_PREFIX: &str = "value";

/// File-name prefix of fixed-size content blocks.
pub const BLOCK_FILE_PREFIX: &str = "iblock";

/// The domain directory inside a node's private working directory.
pub fn domain_dir(node_dir: &Path, domain: &DomainId) -> PathBuf {
    node_dir.join(format!("{DOMAIN_DIR_TAG}{domain}"))
}

/// Count the external value files in a domain directory.
pub fn count_external_files(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry
            .file_name()
            .to_string_lossy()
            .starts_with(EXTERNAL_FILE_PREFIX)
        {
            count += 1;
        }
    }
    Ok(count)
}

/// SHA-256 of every block file in a domain directory, keyed by file name.
///
/// Comparing two maps proves bit-for-bit block equality, e.g. before and
/// after a replica regenerates deleted state.
pub fn block_checksums(dir: &Path) -> io::Result<BTreeMap<String, String>> {
    let mut sums = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(BLOCK_FILE_PREFIX) {
            continue;
        }
        let bytes = fs::read(entry.path())?;
        sums.insert(name, hex::encode(Sha256::digest(&bytes)));
    }
    Ok(sums)
}

/// Simulate local corruption: delete `k` randomly chosen external value
/// files from a domain directory. Returns the deleted paths.
pub fn delete_random_external(dir: &Path, k: usize) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry
            .file_name()
            .to_string_lossy()
            .starts_with(EXTERNAL_FILE_PREFIX)
        {
            files.push(entry.path());
        }
    }

    let mut rng = rand::thread_rng();
    let victims: Vec<PathBuf> = files.choose_multiple(&mut rng, k).cloned().collect();
    for path in &victims {
        fs::remove_file(path)?;
    }
    Ok(victims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_domain_dir(dir: &Path) {
        for i in 0..4 {
            fs::write(dir.join(format!("value-entry-{i}")), format!("v{i}")).unwrap();
        }
        for i in 0..3 {
            fs::write(dir.join(format!("iblock-{i}")), format!("block{i}")).unwrap();
        }
        fs::write(dir.join("index"), "unrelated").unwrap();
    }

    #[test]
    fn domain_dir_uses_the_fixed_tag() {
        let id = DomainId::derive("accounts", 0);
        let dir = domain_dir(Path::new("/work/node"), &id);
        assert_eq!(dir, PathBuf::from(format!("/work/node/rdomain-{id}")));
    }

    #[test]
    fn counts_only_external_files() {
        let dir = tempfile::tempdir().unwrap();
        seed_domain_dir(dir.path());
        assert_eq!(count_external_files(dir.path()).unwrap(), 4);
    }

    #[test]
    fn missing_dir_is_an_error_not_zero() {
        let err = count_external_files(Path::new("/nonexistent/rdomain-AB")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn checksums_cover_blocks_only_and_detect_change() {
        let dir = tempfile::tempdir().unwrap();
        seed_domain_dir(dir.path());

        let before = block_checksums(dir.path()).unwrap();
        assert_eq!(before.len(), 3);
        assert!(before.keys().all(|name| name.starts_with("iblock")));

        let unchanged = block_checksums(dir.path()).unwrap();
        assert_eq!(before, unchanged);

        fs::write(dir.path().join("iblock-1"), "tampered").unwrap();
        let after = block_checksums(dir.path()).unwrap();
        assert_ne!(before, after);
        assert_eq!(before.get("iblock-0"), after.get("iblock-0"));
    }

    #[test]
    fn deletes_exactly_k_external_files() {
        let dir = tempfile::tempdir().unwrap();
        seed_domain_dir(dir.path());

        let deleted = delete_random_external(dir.path(), 2).unwrap();
        assert_eq!(deleted.len(), 2);
        for path in &deleted {
            assert!(!path.exists());
        }
        assert_eq!(count_external_files(dir.path()).unwrap(), 2);
        // blocks and unrelated files untouched
        assert_eq!(block_checksums(dir.path()).unwrap().len(), 3);
    }
}
