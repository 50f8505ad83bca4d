//! # Reconcile
//!
//! Declarative INI settings reconciliation.
//!
//! Callers declare desired (section, key) -> value assertions; the engine
//! converges an on-disk INI file to match, detecting drift, applying
//! minimal edits, and redacting secrets from everything it reports.
//!
//! ## Core Concepts
//!
//! - **Setting**: one desired assertion - section, key, value, ensure
//!   (present/absent), secret flag, ensure-absent sentinel
//! - **Batch**: ordered settings targeting one file, plus the purge flag
//! - **Engine**: full read-modify-write convergence under an advisory lock
//! - **ChangeReport**: what changed (or would change), secrets masked
//!
//! ## Example
//!
//! ```no_run
//! use reconcile::{Batch, Engine, Setting};
//!
//! let mut batch = Batch::new("/etc/neutron/plugins/ml2/ml2_conf.ini").purge(false);
//! batch.push(Setting::new("ml2", "path_mtu", "9000")?)?;
//! batch.push(Setting::new("ml2", "extension_drivers", reconcile::SERVICE_DEFAULT)?)?;
//!
//! let report = Engine::new().apply(&batch)?;
//! for change in &report.changes {
//!     println!("{change}");
//! }
//! # Ok::<(), reconcile::Error>(())
//! ```
//!
//! Unmanaged lines - comments, blanks, keys the batch does not name -
//! round-trip verbatim unless `purge` is set. A file already matching the
//! desired state is never rewritten.

pub mod batch;
pub mod document;
pub mod engine;
pub mod error;
pub mod report;
pub mod setting;

// Re-export main types at crate root
pub use batch::Batch;
pub use document::{DEFAULT_SECTION, IniDocument, SetOutcome};
pub use engine::Engine;
pub use error::{Error, Result};
pub use report::{Change, ChangeKind, ChangeReport, NEW_SECRET, OLD_SECRET};
pub use setting::{Ensure, SERVICE_DEFAULT, Setting, Value, normalize_value};
