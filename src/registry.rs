//! Resolution of the real driver behind a connection string.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::driver::Driver;
use crate::error::{DriverError, DriverResult};
use crate::options::DriverOptions;

/// Loads a driver named by an explicit `(class, path)` pair.
pub trait DriverLoader: Send + Sync {
    fn load(&self, class: &str, path: &Path) -> DriverResult<Arc<dyn Driver>>;
}

/// In-process loader: drivers registered up front under `(path, class)`.
#[derive(Default)]
pub struct StaticLoader {
    drivers: HashMap<(PathBuf, String), Arc<dyn Driver>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_driver(
        mut self,
        path: impl Into<PathBuf>,
        class: impl Into<String>,
        driver: Arc<dyn Driver>,
    ) -> Self {
        self.drivers.insert((path.into(), class.into()), driver);
        self
    }
}

impl DriverLoader for StaticLoader {
    fn load(&self, class: &str, path: &Path) -> DriverResult<Arc<dyn Driver>> {
        self.drivers
            .get(&(path.to_path_buf(), class.to_owned()))
            .cloned()
            .ok_or_else(|| DriverError::DriverLoad {
                class: class.to_owned(),
                path: path.display().to_string(),
                reason: "no such driver class at this path".into(),
            })
    }
}

impl fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticLoader")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Ambient drivers plus explicit loaders.
///
/// Ambient lookup returns the first registered driver that accepts the
/// connection string. An explicit `(path, class)` pair bypasses ambient
/// lookup entirely.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: Vec<Arc<dyn Driver>>,
    loaders: Vec<Arc<dyn DriverLoader>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.register(driver);
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn DriverLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    pub fn register(&mut self, driver: Arc<dyn Driver>) {
        tracing::debug!(driver = driver.name(), "registered driver");
        self.drivers.push(driver);
    }

    /// First registered driver accepting `url`.
    pub fn driver_for(&self, url: &str) -> Option<Arc<dyn Driver>> {
        self.drivers
            .iter()
            .find(|driver| driver.accepts_url(url))
            .cloned()
    }

    /// Load `class` from `path` with the first loader that knows it.
    pub fn load(&self, class: &str, path: &Path) -> DriverResult<Arc<dyn Driver>> {
        let mut last_error = None;
        for loader in &self.loaders {
            match loader.load(class, path) {
                Ok(driver) => return Ok(driver),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| DriverError::DriverLoad {
            class: class.to_owned(),
            path: path.display().to_string(),
            reason: "no driver loaders registered".into(),
        }))
    }

    /// Resolve the driver for `url`, honoring an explicit override.
    pub fn resolve(&self, url: &str, options: &DriverOptions) -> DriverResult<Arc<dyn Driver>> {
        if let Some((path, class)) = options.explicit_driver() {
            tracing::debug!(class, path = %path.display(), "resolving explicit driver");
            return self.load(class, path);
        }

        let driver = self
            .driver_for(url)
            .ok_or_else(|| DriverError::NoSuitableDriver { url: url.to_owned() })?;
        tracing::debug!(driver = driver.name(), "resolved driver by connection string");
        Ok(driver)
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field(
                "drivers",
                &self.drivers.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .field("loaders", &self.loaders.len())
            .finish()
    }
}
