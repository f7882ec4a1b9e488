//! Native engine configuration.

use std::env;

/// Environment variable naming an explicit HPIPM shared library path.
pub const HPIPM_LIB_ENV: &str = "HPIPM_LIB";

/// Environment variable enabling native dimension cross-checks.
pub const VERIFY_DIMS_ENV: &str = "QCQP_VERIFY_DIMS";

/// How the native engine locates and validates the HPIPM library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Library names or paths, tried in order.
    pub library_names: Vec<String>,

    /// After mirroring dimensions into the native descriptor, read them back
    /// through `d_ocp_qcqp_dim_get_*` and compare.
    pub verify_dims: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            library_names: default_library_names(),
            verify_dims: false,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `HPIPM_LIB` and `QCQP_VERIFY_DIMS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = env::var(HPIPM_LIB_ENV).ok().filter(|p| !p.is_empty()) {
            config.library_names.insert(0, path);
        }

        config.verify_dims = env::var(VERIFY_DIMS_ENV)
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(false);

        config
    }

    pub fn with_library(mut self, path: impl Into<String>) -> Self {
        self.library_names.insert(0, path.into());
        self
    }

    pub fn with_verify_dims(mut self, verify: bool) -> Self {
        self.verify_dims = verify;
        self
    }
}

fn default_library_names() -> Vec<String> {
    let names: &[&str] = if cfg!(target_os = "windows") {
        &["hpipm.dll", "libhpipm.dll"]
    } else if cfg!(target_os = "macos") {
        &["libhpipm.dylib"]
    } else {
        &["libhpipm.so"]
    };
    names.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_platform_library() {
        let config = EngineConfig::default();
        assert!(!config.library_names.is_empty());
        assert!(config.library_names[0].contains("hpipm"));
        assert!(!config.verify_dims);
    }

    #[test]
    fn explicit_library_is_tried_first() {
        let config = EngineConfig::default()
            .with_library("/opt/hpipm/lib/libhpipm.so")
            .with_verify_dims(true);
        assert_eq!(config.library_names[0], "/opt/hpipm/lib/libhpipm.so");
        assert!(config.verify_dims);
    }
}
