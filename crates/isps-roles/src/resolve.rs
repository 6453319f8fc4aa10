//! # Role Tags and Resolution
//!
//! The closed role enumeration and the single normalization path from
//! raw session claims into it.

use serde::{Deserialize, Serialize};

/// The closed set of normalized role tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTag {
    /// Training officer — proposes formations.
    Rso,
    /// Chef sûreté — validates, supervises, and grades formations.
    ChefSurete,
    /// DSM — safety-responsible peer of the chef sûreté.
    Dsm,
    /// Director-general — final sign-off and diploma issuance.
    Dg,
    /// Administrator.
    Admin,
    /// Super administrator.
    SuperAdmin,
    /// Unrecognized or absent role claim. Satisfies no capability.
    Unknown,
}

/// A raw role claim as supplied by the session layer: either a bare
/// string or an object carrying a `name` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRole {
    /// Bare string claim, e.g. `"chef_surete"`.
    Name(String),
    /// Object claim, e.g. `{"name": "DSM"}`.
    Object {
        /// The role name field.
        name: String,
    },
}

impl RawRole {
    fn name(&self) -> &str {
        match self {
            Self::Name(s) => s,
            Self::Object { name } => name,
        }
    }
}

impl RoleTag {
    /// Normalize a raw role claim into a tag.
    ///
    /// Lower-cases and trims the input, collapses legacy aliases
    /// (`rso_formateur` is the historical name of the RSO role), and
    /// maps anything unrecognized to [`RoleTag::Unknown`]. Pure; never
    /// fails.
    pub fn resolve(raw: &RawRole) -> Self {
        Self::from_name(raw.name())
    }

    /// Normalize a bare role name string. See [`RoleTag::resolve`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "rso" | "rso_formateur" => Self::Rso,
            "chef_surete" => Self::ChefSurete,
            "dsm" => Self::Dsm,
            "dg" => Self::Dg,
            "admin" => Self::Admin,
            "super_admin" => Self::SuperAdmin,
            _ => Self::Unknown,
        }
    }

    /// Whether this role may validate, supervise, and grade formations.
    pub fn is_safety_responsible(&self) -> bool {
        matches!(self, Self::ChefSurete | Self::Dsm)
    }

    /// Whether this role holds final sign-off authority.
    pub fn is_director(&self) -> bool {
        matches!(self, Self::Dg)
    }

    /// Whether this role is an administrator.
    pub fn is_administrator(&self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }

    /// Whether this role may drive the exam lifecycle.
    pub fn can_manage_formation(&self) -> bool {
        self.is_safety_responsible() || self.is_administrator()
    }

    /// The canonical tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rso => "rso",
            Self::ChefSurete => "chef_surete",
            Self::Dsm => "dsm",
            Self::Dg => "dg",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RoleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
