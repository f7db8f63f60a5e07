//! Output sink: exposes a result artifact as a revocable download handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::error::SinkError;
use crate::models::ResultArtifact;

/// Host environment that can hand out URLs for blobs.
pub trait UrlHost {
    /// Create a URL under which `bytes` can be retrieved.
    fn create_url(&self, bytes: &Arc<[u8]>, mime: &str) -> Result<String, SinkError>;

    /// Release the resource behind `url`.
    fn revoke_url(&self, url: &str);
}

/// A live download handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadHandle {
    pub url: String,
    pub filename: String,
    pub mime: String,
}

/// Keeps at most one published artifact alive.
#[derive(Debug)]
pub struct OutputSink<H: UrlHost> {
    host: H,
    current: Option<DownloadHandle>,
}

impl<H: UrlHost> OutputSink<H> {
    pub fn new(host: H) -> Self {
        Self { host, current: None }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// The live handle, if any.
    pub fn current(&self) -> Option<&DownloadHandle> {
        self.current.as_ref()
    }

    /// Publish an artifact, superseding (and revoking) the previous one.
    pub fn publish(&mut self, artifact: &ResultArtifact) -> Result<DownloadHandle, SinkError> {
        self.revoke();

        let url = self.host.create_url(&artifact.bytes, &artifact.mime)?;
        debug!("Published {} as {}", artifact.filename, url);

        let handle = DownloadHandle {
            url,
            filename: artifact.filename.clone(),
            mime: artifact.mime.clone(),
        };
        self.current = Some(handle.clone());
        Ok(handle)
    }

    /// Fire a user-initiated download of the live handle, then revoke it.
    ///
    /// Returns `None` when nothing is published.
    pub fn download<R>(&mut self, trigger: impl FnOnce(&DownloadHandle, &H) -> R) -> Option<R> {
        let handle = self.current.take()?;
        let result = trigger(&handle, &self.host);
        self.host.revoke_url(&handle.url);
        debug!("Revoked {} after download", handle.url);
        Some(result)
    }

    /// Hand the live handle to the caller, who becomes responsible for revoking it.
    pub fn take(&mut self) -> Option<DownloadHandle> {
        self.current.take()
    }

    /// Revoke the live handle without downloading it.
    pub fn revoke(&mut self) {
        if let Some(handle) = self.current.take() {
            self.host.revoke_url(&handle.url);
            debug!("Revoked superseded {}", handle.url);
        }
    }
}

impl<H: UrlHost> Drop for OutputSink<H> {
    fn drop(&mut self) {
        self.revoke();
    }
}

/// In-process URL host storing blobs under `memory://<n>`.
#[derive(Debug, Default)]
pub struct MemoryHost {
    next: AtomicU64,
    blobs: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes behind a live URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    /// Number of URLs not yet revoked.
    pub fn live(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl UrlHost for MemoryHost {
    fn create_url(&self, bytes: &Arc<[u8]>, _mime: &str) -> Result<String, SinkError> {
        let url = format!("memory://{}", self.next.fetch_add(1, Ordering::Relaxed));
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.clone(), Arc::clone(bytes));
        Ok(url)
    }

    fn revoke_url(&self, url: &str) {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).remove(url);
    }
}

impl<H: UrlHost> UrlHost for Arc<H> {
    fn create_url(&self, bytes: &Arc<[u8]>, mime: &str) -> Result<String, SinkError> {
        (**self).create_url(bytes, mime)
    }

    fn revoke_url(&self, url: &str) {
        (**self).revoke_url(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str, bytes: &[u8]) -> ResultArtifact {
        ResultArtifact::new(bytes.to_vec(), name, "application/octet-stream")
    }

    #[test]
    fn test_publish_supersedes_previous() {
        let mut sink = OutputSink::new(MemoryHost::new());

        let first = sink.publish(&artifact("a.bin", b"one")).unwrap();
        let second = sink.publish(&artifact("b.bin", b"two")).unwrap();

        assert_ne!(first.url, second.url);
        assert!(sink.host().resolve(&first.url).is_none());
        assert_eq!(sink.host().resolve(&second.url).as_deref(), Some(&b"two"[..]));
        assert_eq!(sink.host().live(), 1);
    }

    #[test]
    fn test_download_revokes_after_trigger() {
        let mut sink = OutputSink::new(MemoryHost::new());
        sink.publish(&artifact("a.bin", b"payload")).unwrap();

        let downloaded = sink
            .download(|handle, host| {
                assert_eq!(handle.filename, "a.bin");
                host.resolve(&handle.url)
            })
            .flatten();

        assert_eq!(downloaded.as_deref(), Some(&b"payload"[..]));
        assert_eq!(sink.host().live(), 0);
        assert!(sink.current().is_none());
        assert!(sink.download(|_, _| ()).is_none());
    }

    #[test]
    fn test_drop_revokes() {
        let host = Arc::new(MemoryHost::new());
        {
            let mut sink = OutputSink::new(Arc::clone(&host));
            sink.publish(&artifact("a.bin", b"x")).unwrap();
            assert_eq!(host.live(), 1);
        }
        assert_eq!(host.live(), 0);
    }
}
