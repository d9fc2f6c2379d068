//! Writability probe for the storage mount.
//!
//! A verdict is cached for a short TTL and re-probed after it expires, so a
//! mount that changes state mid-process is noticed without probing on every
//! request.

use deck_core::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a probe verdict stays valid.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct Verdict {
    at: Instant,
    failure: Option<String>,
}

/// Capability check for "can we write to the storage mount".
#[derive(Debug)]
pub struct StorageProbe {
    root: PathBuf,
    ttl: Duration,
    last: Mutex<Option<Verdict>>,
}

impl StorageProbe {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
            last: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cached verdict if still fresh, otherwise a new probe.
    pub fn check(&self) -> Result<()> {
        let mut last = self.lock();
        let fresh = last
            .as_ref()
            .filter(|verdict| verdict.at.elapsed() < self.ttl)
            .cloned();

        let verdict = match fresh {
            Some(verdict) => verdict,
            None => {
                let verdict = self.probe();
                *last = Some(verdict.clone());
                verdict
            }
        };
        self.to_result(&verdict)
    }

    /// Probe now, regardless of the cached verdict.
    pub fn recheck(&self) -> Result<()> {
        let verdict = self.probe();
        *self.lock() = Some(verdict.clone());
        self.to_result(&verdict)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Verdict>> {
        match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn probe(&self) -> Verdict {
        let failure = match write_probe_file(&self.root) {
            Ok(()) => {
                log::debug!("Storage at {} is writable", self.root.display());
                None
            }
            Err(e) => {
                log::warn!("Storage at {} is not writable: {}", self.root.display(), e);
                Some(e.to_string())
            }
        };
        Verdict {
            at: Instant::now(),
            failure,
        }
    }

    fn to_result(&self, verdict: &Verdict) -> Result<()> {
        match &verdict.failure {
            None => Ok(()),
            Some(reason) => Err(Error::StorageNotWritable {
                path: self.root.display().to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

fn write_probe_file(root: &Path) -> std::io::Result<()> {
    fs::create_dir_all(root)?;
    let probe = root.join(format!(".write-probe-{}", std::process::id()));
    fs::write(&probe, b"ok")?;
    fs::remove_file(&probe)
}
