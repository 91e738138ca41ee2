use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{info, warn};
use tokio::process::Command;
use tokio::sync::OnceCell;

/// Availability of the embed helper program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperStatus {
    Ready { version: String },
    Unavailable { reason: String },
}

impl HelperStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, HelperStatus::Ready { .. })
    }
}

/// Loads the embed helper at most once.
///
/// Concurrent callers of [`SdkLoader::ensure_loaded`] share a single probe;
/// the outcome, success or not, is kept for the life of the loader.
#[derive(Debug)]
pub struct SdkLoader {
    helper: String,
    status: OnceCell<HelperStatus>,
    probes: AtomicUsize,
}

impl SdkLoader {
    pub fn new(helper: impl Into<String>) -> Self {
        Self {
            helper: helper.into(),
            status: OnceCell::new(),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn helper(&self) -> &str {
        &self.helper
    }

    /// Status if a probe already finished
    pub fn status(&self) -> Option<&HelperStatus> {
        self.status.get()
    }

    /// Number of probes actually run
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }

    pub async fn ensure_loaded(&self) -> &HelperStatus {
        self.status
            .get_or_init(|| async {
                self.probes.fetch_add(1, Ordering::Relaxed);
                probe(&self.helper).await
            })
            .await
    }
}

/// Process-wide loader. The helper named by the first caller wins.
pub fn global_sdk_loader(helper: &str) -> &'static SdkLoader {
    static LOADER: once_cell::sync::OnceCell<SdkLoader> = once_cell::sync::OnceCell::new();
    LOADER.get_or_init(|| SdkLoader::new(helper))
}

async fn probe(helper: &str) -> HelperStatus {
    let output = Command::new(helper)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
            info!("Embed helper {} ready ({})", helper, version);
            HelperStatus::Ready { version }
        }
        Ok(out) => {
            warn!("Embed helper {} exited with {}", helper, out.status);
            HelperStatus::Unavailable {
                reason: format!("{helper} exited with {}", out.status),
            }
        }
        Err(e) => {
            warn!("Embed helper {} not available: {}", helper, e);
            HelperStatus::Unavailable {
                reason: format!("{helper} not found: {e}"),
            }
        }
    }
}
