//! Certificate storage
//!
//! The certificate root is certbot's live directory. Each managed domain key
//! owns one subdirectory:
//!
//! ```text
//! /etc/letsencrypt/live/
//! ├── README
//! └── example.com/
//!     ├── fullchain.pem     # Certificate chain, leaf first
//!     └── privkey.pem       # Private key
//! ```
//!
//! Certbot normally places symlinks into `../../archive` here; the daemon
//! only reads through them and writes regular files when bootstrapping.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use super::error::{CertificateReadError, StorageError};
use super::inspect::{parse_certificate_pem, CertificateRecord};

/// Certificate chain file name
pub const CERT_FILE: &str = "fullchain.pem";

/// Private key file name
pub const KEY_FILE: &str = "privkey.pem";

/// Mode for certificate directories
#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Mode for certificate files, readable by a TLS process sharing the volume
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Mode for private keys
#[cfg(unix)]
const KEY_MODE: u32 = 0o600;

/// Access to the per-domain certificate directories.
#[derive(Debug, Clone)]
pub struct CertificateStorage {
    /// Certificate root
    base_path: PathBuf,
}

impl CertificateStorage {
    /// Create a storage handle for the given certificate root.
    ///
    /// The root is not created here; certbot owns it and it may not exist
    /// before the first issuance.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the certificate root
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Directory for a domain key
    pub fn domain_path(&self, domain: &str) -> PathBuf {
        self.base_path.join(domain)
    }

    /// Path to a domain's certificate chain
    pub fn cert_path(&self, domain: &str) -> PathBuf {
        self.domain_path(domain).join(CERT_FILE)
    }

    /// Path to a domain's private key
    pub fn key_path(&self, domain: &str) -> PathBuf {
        self.domain_path(domain).join(KEY_FILE)
    }

    /// Inspect the certificate for a domain.
    ///
    /// Returns `Ok(None)` when no certificate file exists.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn inspect(&self, domain: &str) -> Result<Option<CertificateRecord>, CertificateReadError> {
        let cert_path = self.cert_path(domain);

        let data = match fs::read(&cert_path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(domain = %domain, path = %cert_path.display(), "No certificate found");
                return Ok(None);
            }
            Err(source) => {
                return Err(CertificateReadError::Io {
                    path: cert_path,
                    source,
                })
            }
        };

        let record = parse_certificate_pem(&data)?;
        debug!(
            domain = %domain,
            expires = %record.not_valid_after,
            names = ?record.subject_alt_names,
            "Inspected certificate"
        );
        Ok(Some(record))
    }

    /// Write a certificate and key for a domain, creating its directory.
    ///
    /// # Errors
    ///
    /// Fails if the directory or either file cannot be written.
    pub fn save_certificate(&self, domain: &str, cert_pem: &str, key_pem: &str) -> Result<(), StorageError> {
        let domain_path = self.domain_path(domain);
        fs::create_dir_all(&domain_path).map_err(|e| StorageError::io(&domain_path, e))?;

        let cert_path = self.cert_path(domain);
        let key_path = self.key_path(domain);

        // Replace symlinks left by a previous certbot run instead of writing through them
        remove_if_symlink(&cert_path)?;
        remove_if_symlink(&key_path)?;

        fs::write(&cert_path, cert_pem).map_err(|e| StorageError::io(&cert_path, e))?;
        write_key(&key_path, key_pem)?;

        self.fix_permissions(domain)?;

        info!(domain = %domain, path = %domain_path.display(), "Saved certificate to storage");
        Ok(())
    }

    /// Normalise permissions of a domain's directory and files.
    ///
    /// The directory and its subdirectories become 0755, private keys 0600
    /// and other files 0644. Symlinks are left alone so modes in certbot's
    /// archive are never widened. A no-op on non-Unix platforms.
    ///
    /// # Errors
    ///
    /// Fails on the first entry whose permissions cannot be changed.
    pub fn fix_permissions(&self, domain: &str) -> Result<(), StorageError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let domain_path = self.domain_path(domain);
            fs::set_permissions(&domain_path, fs::Permissions::from_mode(DIR_MODE))
                .map_err(|e| StorageError::io(&domain_path, e))?;

            let entries = fs::read_dir(&domain_path).map_err(|e| StorageError::io(&domain_path, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| StorageError::io(&domain_path, e))?;
                let path = entry.path();
                let file_type = entry.file_type().map_err(|e| StorageError::io(&path, e))?;

                let mode = if file_type.is_symlink() {
                    trace!(path = %path.display(), "Leaving symlink permissions unchanged");
                    continue;
                } else if file_type.is_dir() {
                    DIR_MODE
                } else if entry.file_name() == KEY_FILE {
                    KEY_MODE
                } else {
                    FILE_MODE
                };
                fs::set_permissions(&path, fs::Permissions::from_mode(mode))
                    .map_err(|e| StorageError::io(&path, e))?;
            }
            trace!(domain = %domain, "Fixed certificate permissions");
        }
        #[cfg(not(unix))]
        let _ = domain;

        Ok(())
    }

    /// List all certificate directories under the root.
    ///
    /// Plain files (certbot's README) are skipped. A missing root yields an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Fails if the root exists but cannot be listed.
    pub fn list_domains(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.base_path, e)),
        };

        let mut domains = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.base_path, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| StorageError::io(entry.path(), e))?;
            if file_type.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    domains.push(name.to_string());
                } else {
                    warn!(path = %entry.path().display(), "Skipping non UTF-8 certificate directory");
                }
            }
        }

        domains.sort();
        Ok(domains)
    }

    /// Recursively delete a domain's certificate directory.
    ///
    /// Returns the removed path, or `None` if it did not exist.
    ///
    /// # Errors
    ///
    /// Fails if any part of the tree cannot be removed.
    pub fn delete_domain(&self, domain: &str) -> Result<Option<PathBuf>, StorageError> {
        let domain_path = self.domain_path(domain);

        match fs::remove_dir_all(&domain_path) {
            Ok(()) => {
                info!(domain = %domain, path = %domain_path.display(), "Deleted certificate directory");
                Ok(Some(domain_path))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(domain = %domain, "Certificate directory to delete not found");
                Ok(None)
            }
            Err(e) => Err(StorageError::io(&domain_path, e)),
        }
    }
}

/// Write a private key, never exposing it with a wider mode than 0600.
fn write_key(path: &Path, key_pem: &str) -> Result<(), StorageError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(KEY_MODE);
    }

    let mut file = options.open(path).map_err(|e| StorageError::io(path, e))?;
    file.write_all(key_pem.as_bytes())
        .map_err(|e| StorageError::io(path, e))
}

fn remove_if_symlink(path: &Path) -> Result<(), StorageError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::remove_file(path).map_err(|e| StorageError::io(path, e))
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renewal::inspect::test_support::certificate_pem;
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup_storage() -> (TempDir, CertificateStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = CertificateStorage::new(temp_dir.path());
        (temp_dir, storage)
    }

    #[test]
    fn test_paths() {
        let storage = CertificateStorage::new("/etc/letsencrypt/live");
        assert_eq!(
            storage.cert_path("a.com"),
            PathBuf::from("/etc/letsencrypt/live/a.com/fullchain.pem")
        );
        assert_eq!(
            storage.key_path("a.com"),
            PathBuf::from("/etc/letsencrypt/live/a.com/privkey.pem")
        );
    }

    #[test]
    fn test_inspect_missing_is_none() {
        let (_temp_dir, storage) = setup_storage();
        assert!(storage.inspect("nonexistent.com").unwrap().is_none());
    }

    #[test]
    fn test_save_and_inspect() {
        let (_temp_dir, storage) = setup_storage();
        let (cert_pem, key_pem) =
            certificate_pem(&["a.com", "www.a.com"], Utc::now() + chrono::Duration::days(90));

        storage.save_certificate("a.com", &cert_pem, &key_pem).unwrap();

        let record = storage.inspect("a.com").unwrap().unwrap();
        assert_eq!(record.subject_alt_names, vec!["a.com", "www.a.com"]);
        assert_eq!(fs::read_to_string(storage.key_path("a.com")).unwrap(), key_pem);
    }

    #[test]
    fn test_inspect_corrupt_is_error() {
        let (_temp_dir, storage) = setup_storage();
        fs::create_dir_all(storage.domain_path("bad.com")).unwrap();
        fs::write(storage.cert_path("bad.com"), "garbage").unwrap();

        assert!(storage.inspect("bad.com").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_key_is_private_and_cert_readable() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp_dir, storage) = setup_storage();
        storage.save_certificate("a.com", "cert", "key").unwrap();

        let mode = fs::metadata(storage.key_path("a.com")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let mode = fs::metadata(storage.cert_path("a.com")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        let mode = fs::metadata(storage.domain_path("a.com")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_replaces_symlinks() {
        let (temp_dir, storage) = setup_storage();
        let archive = temp_dir.path().join("archive.pem");
        fs::write(&archive, "archived").unwrap();
        fs::create_dir_all(storage.domain_path("a.com")).unwrap();
        std::os::unix::fs::symlink(&archive, storage.cert_path("a.com")).unwrap();

        storage.save_certificate("a.com", "new cert", "key").unwrap();

        assert_eq!(fs::read_to_string(&archive).unwrap(), "archived");
        assert_eq!(fs::read_to_string(storage.cert_path("a.com")).unwrap(), "new cert");
    }

    #[cfg(unix)]
    #[test]
    fn test_fix_permissions_leaves_archive_key_private() {
        use std::os::unix::fs::PermissionsExt;

        let (temp_dir, storage) = setup_storage();
        let archive = temp_dir.path().join("archive");
        fs::create_dir(&archive).unwrap();
        let archived_key = archive.join("privkey1.pem");
        fs::write(&archived_key, "key").unwrap();
        fs::set_permissions(&archived_key, fs::Permissions::from_mode(0o600)).unwrap();

        fs::create_dir_all(storage.domain_path("a.com")).unwrap();
        std::os::unix::fs::symlink(&archived_key, storage.key_path("a.com")).unwrap();
        fs::write(storage.cert_path("a.com"), "cert").unwrap();
        fs::set_permissions(storage.cert_path("a.com"), fs::Permissions::from_mode(0o600)).unwrap();

        storage.fix_permissions("a.com").unwrap();

        let mode = fs::metadata(&archived_key).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let mode = fs::metadata(storage.cert_path("a.com")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_list_domains_skips_files() {
        let (temp_dir, storage) = setup_storage();
        fs::create_dir(temp_dir.path().join("b.com")).unwrap();
        fs::create_dir(temp_dir.path().join("a.com")).unwrap();
        fs::write(temp_dir.path().join("README"), "certbot").unwrap();

        assert_eq!(storage.list_domains().unwrap(), vec!["a.com", "b.com"]);
    }

    #[test]
    fn test_list_domains_missing_root() {
        let storage = CertificateStorage::new("/nonexistent/certkeeper/live");
        assert!(storage.list_domains().unwrap().is_empty());
    }

    #[test]
    fn test_delete_domain() {
        let (_temp_dir, storage) = setup_storage();
        storage.save_certificate("delete.com", "cert", "key").unwrap();
        fs::create_dir_all(storage.domain_path("delete.com").join("nested/deeper")).unwrap();

        let removed = storage.delete_domain("delete.com").unwrap();
        assert_eq!(removed, Some(storage.domain_path("delete.com")));
        assert!(!storage.domain_path("delete.com").exists());

        assert_eq!(storage.delete_domain("delete.com").unwrap(), None);
    }
}
