use serde::{Deserialize, Serialize};

/// A Maven artifact coordinate.
///
/// `version` may be absent for managed dependencies before resolution;
/// it must be present by the time the coordinate is handed to the
/// dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MavenCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Artifact type; `jar` when unset. Kept optional so resolvers can
    /// tell "defaulted" from "explicitly jar" and substitute `exe`.
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub classifier: Option<String>,
}

impl MavenCoordinate {
    /// Create a coordinate with no explicit type and no classifier.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: Some(version.into()),
            r#type: None,
            classifier: None,
        }
    }

    /// Override the artifact type (`jar`, `exe`, ...).
    pub fn with_type(mut self, r#type: impl Into<String>) -> Self {
        self.r#type = Some(r#type.into());
        self
    }

    /// The effective artifact type.
    pub fn type_or_jar(&self) -> &str {
        self.r#type.as_deref().unwrap_or("jar")
    }

    /// Override the platform classifier.
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Parse `"group:artifact:version"` shorthand.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [group, artifact, version]
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Some(Self::new(*group, *artifact, *version))
            }
            _ => None,
        }
    }

    /// Whether group and artifact are populated. Used to reject malformed
    /// configuration before resolution starts.
    pub fn is_well_formed(&self) -> bool {
        !self.group_id.is_empty() && !self.artifact_id.is_empty()
    }
}

impl std::fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        write!(f, ":{}", self.type_or_jar())?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}
