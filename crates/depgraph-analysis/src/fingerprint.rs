//! Change detection for cached analysis results

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::SystemTime;

/// Opaque digest of whatever a cache entry depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Fingerprint of any hashable value, e.g. resolved project info.
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Fingerprint(hasher.finish())
    }
}

/// Computes the current fingerprint of an analyzed path.
///
/// `None` means the path could not be observed (for example it does not
/// exist). Two `None`s compare equal, so an unobservable source does not
/// invalidate its entry on its own; the TTL still applies.
pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, path: &str) -> Option<Fingerprint>;
}

impl<F> Fingerprinter for F
where
    F: Fn(&str) -> Option<Fingerprint> + Send + Sync,
{
    fn fingerprint(&self, path: &str) -> Option<Fingerprint> {
        self(path)
    }
}

/// Fingerprints a path by its modification time. For directories the
/// modification times of the direct entries are folded in as well, so
/// editing a project file inside a project directory is noticed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifiedTimeFingerprinter;

impl Fingerprinter for ModifiedTimeFingerprinter {
    fn fingerprint(&self, path: &str) -> Option<Fingerprint> {
        let path = Path::new(path);
        let metadata = fs::metadata(path).ok()?;

        let mut stamps: Vec<(String, Option<SystemTime>)> =
            vec![(String::new(), metadata.modified().ok())];

        if metadata.is_dir() {
            if let Ok(entries) = fs::read_dir(path) {
                for entry in entries.flatten() {
                    let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
                    stamps.push((entry.file_name().to_string_lossy().into_owned(), modified));
                }
            }
            stamps.sort();
        }

        Some(Fingerprint::of(&stamps))
    }
}
