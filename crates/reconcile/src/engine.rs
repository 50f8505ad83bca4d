//! The reconciliation engine - converge one file to match a batch.
//!
//! Each `apply` is a full read-modify-write cycle under an exclusive
//! advisory lock; the file on disk is the only state that survives calls.
//! Writes go through a temp file in the target directory followed by a
//! rename, so a failed apply leaves the previous content intact.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::batch::Batch;
use crate::document::{IniDocument, SetOutcome};
use crate::error::{Error, Result};
use crate::report::{Change, ChangeReport};

/// Applies batches to files. Construct one per call site; the engine
/// itself holds no per-file state.
#[derive(Debug, Clone)]
pub struct Engine {
    lock: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with advisory locking enabled.
    pub fn new() -> Self {
        Self { lock: true }
    }

    /// Disable the advisory lock (single-writer environments, tests).
    pub fn without_lock() -> Self {
        Self { lock: false }
    }

    /// Converge the batch's file to match the batch, returning what
    /// changed. The file is rewritten only when its content actually
    /// differs; a second apply of the same batch reports no changes and
    /// performs no write.
    pub fn apply(&self, batch: &Batch) -> Result<ChangeReport> {
        let path = batch.path();
        log::debug!("applying {} settings to {}", batch.len(), path.display());

        // Open (or create) the target so the lock covers the whole
        // read-modify-write cycle. Released when `file` drops.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::file_access(path, e))?;
        if self.lock {
            file.lock_exclusive()
                .map_err(|e| Error::file_access(path, e))?;
        }

        let original = fs::read_to_string(path).map_err(|e| Error::file_access(path, e))?;
        let mut doc = IniDocument::parse(path, &original)?;

        let changes = converge(&mut doc, batch);
        let mut report = ChangeReport::new(path.to_path_buf());
        report.changes = changes;

        let rendered = doc.render();
        if !report.changes.is_empty() && rendered != original {
            write_atomic(path, &rendered)?;
            report.written = true;
            for change in &report.changes {
                log::info!("{}: {change}", path.display());
            }
        } else {
            log::debug!("{} already in sync", path.display());
        }

        Ok(report)
    }

    /// Compute the changes `apply` would make, without touching the file.
    /// A missing file plans as empty.
    pub fn plan(&self, batch: &Batch) -> Result<ChangeReport> {
        Ok(self.preview(batch)?.0)
    }

    /// Like [`plan`](Self::plan), but also returns the text the file
    /// would hold after the apply, for rendering full diffs.
    pub fn preview(&self, batch: &Batch) -> Result<(ChangeReport, String)> {
        let path = batch.path();
        let original = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::file_access(path, e)),
        };
        let mut doc = IniDocument::parse(path, &original)?;

        let mut report = ChangeReport::new(path.to_path_buf());
        report.changes = converge(&mut doc, batch);
        Ok((report, doc.render()))
    }
}

/// Apply every setting to the document, then purge when requested.
fn converge(doc: &mut IniDocument, batch: &Batch) -> Vec<Change> {
    let mut changes = Vec::new();

    for setting in batch.settings() {
        let section = setting.section();
        let key = setting.key();

        if setting.effectively_absent() {
            // Removing an already-absent key is a no-op.
            if let Some(old) = doc.remove(section, key) {
                changes.push(Change::removed(section, key, old, setting.is_secret()));
            }
            continue;
        }

        let Some(value) = setting.literal() else {
            continue;
        };
        match doc.set(section, key, value) {
            SetOutcome::Added => {
                changes.push(Change::added(section, key, value, setting.is_secret()));
            }
            SetOutcome::Changed { old } => {
                changes.push(Change::changed(section, key, old, value, setting.is_secret()));
            }
            SetOutcome::Unchanged => {}
        }
    }

    if batch.is_purge() {
        let keep: HashSet<(String, String)> = batch.managed_ids();
        for (section, key, old) in doc.retain_keys(&keep) {
            changes.push(Change::removed(&section, &key, old, false));
        }
        doc.prune_empty_sections();
    }

    changes
}

/// Replace-or-fail: write to a temp file in the target directory, then
/// rename over the destination, carrying the original permissions over.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path).ok().map(|m| m.permissions());

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::file_access(path, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| Error::file_access(path, e))?;
    tmp.persist(path)
        .map_err(|e| Error::file_access(path, e.error))?;

    if let Some(permissions) = permissions {
        fs::set_permissions(path, permissions).map_err(|e| Error::file_access(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::{SERVICE_DEFAULT, Setting};
    use tempfile::TempDir;

    fn batch_with(path: &Path, settings: &[Setting]) -> Batch {
        let mut batch = Batch::new(path);
        for setting in settings {
            batch.push(setting.clone()).unwrap();
        }
        batch
    }

    #[test]
    fn apply_writes_value_and_reads_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ml2_conf.ini");

        let batch = batch_with(&path, &[Setting::new("ml2", "path_mtu", "9000").unwrap()]);
        let report = Engine::new().apply(&batch).unwrap();

        assert!(report.written);
        assert_eq!(report.changes.len(), 1);

        let text = fs::read_to_string(&path).unwrap();
        let doc = IniDocument::parse(&path, &text).unwrap();
        assert_eq!(doc.get("ml2", "path_mtu"), Some("9000"));
    }

    #[test]
    fn second_apply_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ml2_conf.ini");

        let batch = batch_with(
            &path,
            &[
                Setting::new("ml2", "type_drivers", "local,flat,vlan").unwrap(),
                Setting::new("securitygroup", "enable_security_group", "true").unwrap(),
            ],
        );

        let first = Engine::new().apply(&batch).unwrap();
        assert!(first.written);

        let before = fs::read_to_string(&path).unwrap();
        let second = Engine::new().apply(&batch).unwrap();
        assert!(second.is_in_sync());
        assert!(!second.written);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn boolean_case_converges_without_rewrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("agent.ini");
        fs::write(&path, "[securitygroup]\nenable_security_group=True\n").unwrap();

        for raw in ["true", "True", "TRUE"] {
            let batch = batch_with(
                &path,
                &[Setting::new("securitygroup", "enable_security_group", raw).unwrap()],
            );
            let report = Engine::new().apply(&batch).unwrap();
            assert!(report.is_in_sync(), "{raw:?} should already be in sync");
        }
    }

    #[test]
    fn ensure_absent_removes_key() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ml2_conf.ini");
        fs::write(&path, "[ml2]\nphysical_network_mtus = physnet1:9000\n").unwrap();

        let batch = batch_with(
            &path,
            &[Setting::absent("ml2", "physical_network_mtus").unwrap()],
        );
        let report = Engine::new().apply(&batch).unwrap();
        assert_eq!(report.changes.len(), 1);

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("physical_network_mtus"));

        // Removing again is a no-op.
        let report = Engine::new().apply(&batch).unwrap();
        assert!(report.is_in_sync());
    }

    #[test]
    fn service_default_sentinel_unsets() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ml2_conf.ini");
        fs::write(&path, "[ml2]\nextension_drivers = qos\n").unwrap();

        let batch = batch_with(
            &path,
            &[Setting::new("ml2", "extension_drivers", SERVICE_DEFAULT).unwrap()],
        );
        Engine::new().apply(&batch).unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("extension_drivers"));
    }

    #[test]
    fn purge_removes_unmanaged_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ml2_conf.ini");
        fs::write(&path, "[ml2]\nfoo = bar\npath_mtu = 9000\n").unwrap();

        let batch = batch_with(&path, &[Setting::new("ml2", "path_mtu", "9000").unwrap()])
            .purge(true);
        let report = Engine::new().apply(&batch).unwrap();

        assert_eq!(report.changes.len(), 1);
        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("foo"));
        assert!(text.contains("path_mtu"));
    }

    #[test]
    fn without_purge_unmanaged_keys_survive() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ml2_conf.ini");
        fs::write(&path, "[ml2]\nfoo = bar\n").unwrap();

        let batch = batch_with(&path, &[Setting::new("ml2", "path_mtu", "9000").unwrap()]);
        Engine::new().apply(&batch).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("foo = bar"));
    }

    #[test]
    fn purge_drops_emptied_sections() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ml2_conf.ini");
        fs::write(&path, "[stale]\nold = 1\n[ml2]\npath_mtu = 9000\n").unwrap();

        let batch = batch_with(&path, &[Setting::new("ml2", "path_mtu", "9000").unwrap()])
            .purge(true);
        Engine::new().apply(&batch).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("[stale]"));
    }

    #[test]
    fn comments_survive_an_apply() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ml2_conf.ini");
        fs::write(
            &path,
            "# managed below this line\n[ml2]\n; mtu for overlay\npath_mtu = 0\n",
        )
        .unwrap();

        let batch = batch_with(&path, &[Setting::new("ml2", "path_mtu", "9000").unwrap()]);
        Engine::new().apply(&batch).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("# managed below this line"));
        assert!(text.contains("; mtu for overlay"));
        assert!(text.contains("path_mtu=9000"));
    }

    #[test]
    fn secret_values_never_reach_rendered_report() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("l3_agent.ini");
        fs::write(&path, "[DEFAULT]\nha_vrrp_auth_password = old\n").unwrap();

        let batch = batch_with(
            &path,
            &[Setting::new("DEFAULT", "ha_vrrp_auth_password", "secrete")
                .unwrap()
                .secret(true)],
        );
        let report = Engine::new().apply(&batch).unwrap();

        for change in &report.changes {
            let rendered = change.to_string();
            assert!(!rendered.contains("secrete"));
            assert!(!rendered.contains("old"));
        }

        // The real value still reaches the file.
        assert!(fs::read_to_string(&path).unwrap().contains("secrete"));
    }

    #[test]
    fn parse_failure_rejects_batch_and_leaves_file_alone() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.ini");
        fs::write(&path, "[ml2]\nthis is not a pair\n").unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let batch = batch_with(&path, &[Setting::new("ml2", "path_mtu", "9000").unwrap()]);
        let err = Engine::new().apply(&batch).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn missing_parent_directory_is_a_file_access_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("no-such-dir").join("x.ini");

        let batch = batch_with(&path, &[Setting::new("ml2", "path_mtu", "9000").unwrap()]);
        let err = Engine::new().apply(&batch).unwrap_err();
        assert!(matches!(err, Error::FileAccess { .. }));
    }

    #[test]
    fn plan_reports_without_writing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ml2_conf.ini");

        let batch = batch_with(&path, &[Setting::new("ml2", "path_mtu", "9000").unwrap()]);
        let report = Engine::new().plan(&batch).unwrap();

        assert_eq!(report.changes.len(), 1);
        assert!(!report.written);
        assert!(!path.exists());
    }
}
