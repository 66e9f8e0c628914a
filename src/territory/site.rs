use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::geo::{is_valid_lonlat, LonLat};

/// Opaque site identifier (e.g. a team slug)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SiteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A competing entity claiming territory from its anchor point
#[derive(Clone, Debug, PartialEq)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    /// Home location (lon, lat)
    pub anchor: LonLat,
    /// Display color as `#rrggbb`
    pub color: Option<String>,
    /// Cleared when the site is eliminated
    pub active: bool,
}

impl Site {
    pub fn new(id: impl Into<SiteId>, name: &str, anchor: LonLat) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            anchor,
            color: None,
            active: true,
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }
}

/// Reject sites whose anchors cannot be measured against, or whose ids collide
pub fn validate_sites(sites: &[Site]) -> Result<(), EngineError> {
    let mut seen = HashSet::with_capacity(sites.len());
    for site in sites {
        if !is_valid_lonlat(site.anchor.0, site.anchor.1) {
            return Err(EngineError::MalformedSite {
                site: site.id.clone(),
                reason: "anchor is not a finite lon/lat pair",
            });
        }
        if !seen.insert(&site.id) {
            return Err(EngineError::DuplicateSite(site.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_anchor() {
        let sites = vec![Site::new("ok", "Ok", (-90.0, 35.0)), Site::new("bad", "Bad", (f64::NAN, 0.0))];
        assert!(matches!(
            validate_sites(&sites),
            Err(EngineError::MalformedSite { site, .. }) if site.as_str() == "bad"
        ));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let sites = vec![Site::new("a", "A", (0.0, 0.0)), Site::new("a", "Again", (1.0, 1.0))];
        assert_eq!(validate_sites(&sites), Err(EngineError::DuplicateSite(SiteId::from("a"))));
    }
}
