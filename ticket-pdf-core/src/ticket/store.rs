//! Storage of rendered ticket files
//!
//! Files are named after the SHA-256 of their content and published under a
//! base URL. A booking's `ticket_url` only changes once the file is on disk.

use super::model::Vorgang;
use crate::error::{PdfError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TicketStore {
    directory: PathBuf,
    base_url: String,
}

impl TicketStore {
    pub fn new(directory: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            directory: directory.into(),
            base_url,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Content-derived file name
    pub fn file_name(bytes: &[u8]) -> String {
        format!("{:x}.pdf", Sha256::digest(bytes))
    }

    /// Write `bytes` and point `vorgang` at them. A ticket file the booking
    /// pointed at before is removed afterwards.
    pub fn store(&self, vorgang: &mut Vorgang, bytes: &[u8]) -> Result<String> {
        let name = Self::file_name(bytes);
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(&name);
        let partial = self.directory.join(format!("{name}.part"));
        fs::write(&partial, bytes)?;
        if let Err(e) = fs::rename(&partial, &path) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }

        let url = format!("{}{}", self.base_url, name);
        let previous = vorgang.ticket_url.replace(url.clone());
        info!(vorgang = vorgang.nummer, url = %url, "ticket stored");

        if let Some(previous) = previous.filter(|p| *p != url) {
            if let Err(e) = self.delete(&previous) {
                warn!(url = %previous, error = %e, "previous ticket not removed");
            }
        }
        Ok(url)
    }

    /// File behind `url`, which must name a file directly inside the store
    pub fn path_for_url(&self, url: &str) -> Result<PathBuf> {
        let invalid = || PdfError::InvalidTicketUrl(url.to_string());
        let name = url.strip_prefix(&self.base_url).ok_or_else(invalid)?;
        let well_formed = name.ends_with(".pdf")
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !well_formed {
            return Err(invalid());
        }
        Ok(self.directory.join(name))
    }

    /// Remove the file behind `url`; `false` when it was already gone
    pub fn delete(&self, url: &str) -> Result<bool> {
        let path = self.path_for_url(url)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "ticket deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
