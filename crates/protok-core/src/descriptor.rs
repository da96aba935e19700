//! Descriptor variants consumed from the build configuration.
//!
//! A distribution or plugin is exactly one of its variants; the shorthand
//! string grammar maps onto them:
//!
//! - `"PATH"` looks `protoc` up on the host search path,
//! - anything containing `:` is a URI,
//! - anything else is a version of `com.google.protobuf:protoc`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use protok_util::errors::ProtokError;

use crate::coordinate::MavenCoordinate;

/// Where the `protoc` executable comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocDistribution {
    /// Look up a named executable on the host search path.
    Path { name: String },
    /// Fetch from a direct URI, optionally pinned to a content digest
    /// (textual `<algorithm>:<hex>` form).
    Uri {
        uri: String,
        #[serde(default)]
        digest: Option<String>,
    },
    /// Resolve from a package repository coordinate. The platform
    /// classifier is filled in at resolution time when absent.
    Coordinate { coordinate: MavenCoordinate },
}

impl ProtocDistribution {
    /// Parse the shorthand grammar of the build configuration.
    pub fn parse(input: &str) -> Result<Self, ProtokError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ProtokError::Configuration {
                message: "protoc descriptor must not be empty".to_string(),
            });
        }
        if trimmed == "PATH" {
            return Ok(Self::Path {
                name: "protoc".to_string(),
            });
        }
        if trimmed.contains(':') {
            return Ok(Self::Uri {
                uri: trimmed.to_string(),
                digest: None,
            });
        }
        Ok(Self::Coordinate {
            coordinate: MavenCoordinate::new("com.google.protobuf", "protoc", trimmed)
                .with_type("exe"),
        })
    }
}

impl std::str::FromStr for ProtocDistribution {
    type Err = ProtokError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The origin of a single code-generator plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginSource {
    /// A native binary resolved from a repository coordinate.
    Coordinate { coordinate: MavenCoordinate },
    /// A native binary looked up on the host search path by name.
    Path { name: String },
    /// A native binary fetched from a direct URI, optionally digest-pinned.
    Uri {
        uri: String,
        #[serde(default)]
        digest: Option<String>,
    },
    /// A JVM application resolved transitively and wrapped in a native
    /// launcher so protoc can exec it.
    Jvm {
        coordinate: MavenCoordinate,
        #[serde(default)]
        main_class: Option<String>,
        /// Application arguments, passed after the main class.
        #[serde(default)]
        jvm_args: Vec<String>,
        /// JVM configuration flags; a default set applies when empty.
        #[serde(default)]
        jvm_config_args: Vec<String>,
    },
}

/// One configured plugin: a source variant plus the settings shared by
/// all variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub source: PluginSource,
    /// A missing optional plugin is skipped with a warning instead of
    /// failing the build.
    #[serde(default)]
    pub optional: bool,
    /// Explicitly disabled plugins are silently omitted.
    #[serde(default)]
    pub skip: bool,
    /// Total-orders the plugin list; ties break on declaration index.
    #[serde(default)]
    pub order: i32,
    /// Generator options, passed as `--<name>_out=<options>:<dir>`.
    #[serde(default)]
    pub options: Option<String>,
    /// Overrides the goal's output directory for this plugin.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl PluginDescriptor {
    pub fn new(source: PluginSource) -> Self {
        Self {
            source,
            optional: false,
            skip: false,
            order: 0,
            options: None,
            output_dir: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// A stable textual identity for this descriptor, hashed into the
    /// on-disk id of JVM plugins.
    pub fn identity(&self) -> String {
        format!("{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_path() {
        let dist = ProtocDistribution::parse("PATH").unwrap();
        assert_eq!(
            dist,
            ProtocDistribution::Path {
                name: "protoc".into()
            }
        );
    }

    #[test]
    fn shorthand_uri() {
        let dist = ProtocDistribution::parse("https://example.com/protoc").unwrap();
        assert!(matches!(dist, ProtocDistribution::Uri { uri, .. } if uri.starts_with("https:")));
    }

    #[test]
    fn shorthand_version_becomes_coordinate() {
        let dist = ProtocDistribution::parse("25.0").unwrap();
        let ProtocDistribution::Coordinate { coordinate } = dist else {
            panic!("expected coordinate variant");
        };
        assert_eq!(coordinate.group_id, "com.google.protobuf");
        assert_eq!(coordinate.artifact_id, "protoc");
        assert_eq!(coordinate.version.as_deref(), Some("25.0"));
        assert_eq!(coordinate.type_or_jar(), "exe");
    }

    #[test]
    fn empty_shorthand_is_a_configuration_error() {
        assert!(ProtocDistribution::parse("  ").is_err());
    }

    #[test]
    fn identity_distinguishes_settings() {
        let a = PluginDescriptor::new(PluginSource::Path { name: "gen".into() });
        let b = a.clone().with_order(3);
        assert_ne!(a.identity(), b.identity());
        assert_eq!(a.identity(), a.clone().identity());
    }
}
