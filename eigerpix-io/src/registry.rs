//! Profile registry used for format discovery.

use crate::format::EigerImageFormat;
use crate::nexus::NxmxFile;
use crate::{Error, Result};
use eigerpix_core::{DetectorProfile, EigerProfile};
use std::path::Path;
use std::sync::Arc;

/// Ordered set of detector profiles, looked up by plugin name or by file.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    profiles: Vec<Arc<dyn DetectorProfile>>,
}

impl FormatRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in ID7B2 profile.
    #[must_use]
    pub fn with_builtin() -> Self {
        Self {
            profiles: vec![Arc::new(EigerProfile::chess_id7b2())],
        }
    }

    /// Adds a profile. Profiles are tried in registration order.
    ///
    /// # Errors
    /// Returns [`Error::DuplicatePlugin`] if the name is already taken.
    pub fn register(&mut self, profile: Arc<dyn DetectorProfile>) -> Result<()> {
        if self.get(profile.name()).is_some() {
            return Err(Error::DuplicatePlugin(profile.name().to_string()));
        }
        log::debug!("registered format plugin {}", profile.name());
        self.profiles.push(profile);
        Ok(())
    }

    /// Registered plugin names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|profile| profile.name())
    }

    /// Number of registered profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if no profile is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profile registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn DetectorProfile>> {
        self.profiles.iter().find(|profile| profile.name() == name)
    }

    /// First profile that recognises the file at `path`.
    pub fn find<P: AsRef<Path>>(&self, path: P) -> Option<&Arc<dyn DetectorProfile>> {
        let file = match NxmxFile::open(&path) {
            Ok(file) => file,
            Err(e) => {
                log::debug!("{}: not readable as HDF5: {e}", path.as_ref().display());
                return None;
            }
        };
        self.profiles
            .iter()
            .find(|&profile| file.identifies(&**profile))
    }

    /// Opens `path` with the first profile that recognises it.
    ///
    /// Returns `Ok(None)` when no profile applies.
    ///
    /// # Errors
    /// Fails if a matching file cannot be reopened for reading.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<Option<EigerImageFormat>> {
        match self.find(&path) {
            Some(profile) => Ok(Some(EigerImageFormat::open(path, Arc::clone(profile))?)),
            None => Ok(None),
        }
    }
}
