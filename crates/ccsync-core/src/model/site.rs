// ── Site hierarchy domain types ──

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of node in the site hierarchy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SiteKind {
    Area,
    Building,
    Floor,
}

impl SiteKind {
    /// Whether a node of this kind may sit under `parent` (`None` is the
    /// implicit Global root).
    pub fn allows_parent(self, parent: Option<SiteKind>) -> bool {
        matches!(
            (self, parent),
            (SiteKind::Area, None | Some(SiteKind::Area))
                | (SiteKind::Building, Some(SiteKind::Area))
                | (SiteKind::Floor, Some(SiteKind::Building))
        )
    }

    /// Guess a kind from hierarchy depth when the controller does not say.
    ///
    /// `Global/A` and `Global/A/B` are areas, the third level is a
    /// building, anything deeper a floor.
    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            0 => None,
            1 | 2 => Some(SiteKind::Area),
            3 => Some(SiteKind::Building),
            _ => Some(SiteKind::Floor),
        }
    }
}

// ── SitePath ─────────────────────────────────────────────────────────

/// Slash-separated hierarchy path rooted at `Global`, e.g.
/// `Global/United States/HQ`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SitePath(String);

impl SitePath {
    pub const ROOT: &'static str = "Global";

    pub fn root() -> Self {
        Self(Self::ROOT.to_owned())
    }

    /// Normalizes stray whitespace and slashes. A path not starting at
    /// `Global` is taken as relative to it.
    pub fn new(raw: &str) -> Self {
        let segments: Vec<&str> = raw
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        match segments.first() {
            None => Self::root(),
            Some(first) if *first == Self::ROOT => Self(segments.join("/")),
            Some(_) => Self(format!("{}/{}", Self::ROOT, segments.join("/"))),
        }
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}/{}", self.0, name.trim()))
    }

    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| Self(parent.to_owned()))
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Number of segments below `Global`.
    pub fn depth(&self) -> usize {
        self.0.matches('/').count()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SitePath {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for SitePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<SitePath> for String {
    fn from(value: SitePath) -> Self {
        value.0
    }
}

impl fmt::Display for SitePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SitePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SitePath({:?})", self.0)
    }
}

// ── SiteNode ─────────────────────────────────────────────────────────

/// Kind-specific attributes of a site node, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SiteAttrs {
    Area,
    Building(BuildingAttrs),
    Floor(FloorAttrs),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingAttrs {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorAttrs {
    #[serde(default)]
    pub floor_number: Option<i32>,
    #[serde(default = "default_rf_model")]
    pub rf_model: String,
    #[serde(default = "default_floor_side")]
    pub width: f64,
    #[serde(default = "default_floor_side")]
    pub length: f64,
    #[serde(default = "default_floor_height")]
    pub height: f64,
}

impl Default for FloorAttrs {
    fn default() -> Self {
        Self {
            floor_number: None,
            rf_model: default_rf_model(),
            width: default_floor_side(),
            length: default_floor_side(),
            height: default_floor_height(),
        }
    }
}

fn default_rf_model() -> String {
    "Cubes And Walled Offices".into()
}
fn default_floor_side() -> f64 {
    100.0
}
fn default_floor_height() -> f64 {
    10.0
}

/// A desired area, building, or floor.
///
/// The node names its parent by path; children are indexed by the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteNode {
    pub name: String,
    #[serde(default = "SitePath::root")]
    pub parent: SitePath,
    #[serde(flatten)]
    pub attrs: SiteAttrs,
}

impl SiteNode {
    pub fn area(name: &str, parent: &str) -> Self {
        Self {
            name: name.into(),
            parent: SitePath::new(parent),
            attrs: SiteAttrs::Area,
        }
    }

    pub fn building(name: &str, parent: &str, attrs: BuildingAttrs) -> Self {
        Self {
            name: name.into(),
            parent: SitePath::new(parent),
            attrs: SiteAttrs::Building(attrs),
        }
    }

    pub fn floor(name: &str, parent: &str, floor_number: i32) -> Self {
        Self {
            name: name.into(),
            parent: SitePath::new(parent),
            attrs: SiteAttrs::Floor(FloorAttrs {
                floor_number: Some(floor_number),
                ..FloorAttrs::default()
            }),
        }
    }

    pub fn kind(&self) -> SiteKind {
        match self.attrs {
            SiteAttrs::Area => SiteKind::Area,
            SiteAttrs::Building(_) => SiteKind::Building,
            SiteAttrs::Floor(_) => SiteKind::Floor,
        }
    }

    /// Full path of this node.
    pub fn path(&self) -> SitePath {
        self.parent.child(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_normalization() {
        assert_eq!(SitePath::new("Global/US/").as_str(), "Global/US");
        assert_eq!(SitePath::new(" US / HQ ").as_str(), "Global/US/HQ");
        assert!(SitePath::new("").is_root());
        assert!(SitePath::new("Global").is_root());
    }

    #[test]
    fn path_navigation() {
        let hq = SitePath::new("Global/US/HQ");
        assert_eq!(hq.name(), "HQ");
        assert_eq!(hq.depth(), 2);
        assert_eq!(hq.parent(), Some(SitePath::new("Global/US")));
        assert_eq!(SitePath::root().parent(), None);
        assert_eq!(SitePath::root().child("US"), SitePath::new("Global/US"));
    }

    #[test]
    fn parent_kind_constraints() {
        assert!(SiteKind::Area.allows_parent(None));
        assert!(SiteKind::Area.allows_parent(Some(SiteKind::Area)));
        assert!(!SiteKind::Building.allows_parent(None));
        assert!(SiteKind::Building.allows_parent(Some(SiteKind::Area)));
        assert!(!SiteKind::Floor.allows_parent(Some(SiteKind::Area)));
        assert!(SiteKind::Floor.allows_parent(Some(SiteKind::Building)));
    }

    #[test]
    fn floor_defaults_apply_when_omitted() {
        let yaml = "kind: floor\nname: FLOOR_1\nparent: Global/US/HQ\nfloor_number: 1\n";
        let node: SiteNode = serde_yaml::from_str(yaml).expect("valid floor");
        let SiteAttrs::Floor(attrs) = &node.attrs else {
            panic!("expected floor, got {:?}", node.attrs);
        };
        assert_eq!(attrs.rf_model, "Cubes And Walled Offices");
        assert!((attrs.width - 100.0).abs() < f64::EPSILON);
        assert_eq!(node.path().as_str(), "Global/US/HQ/FLOOR_1");
    }
}
