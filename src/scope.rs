//! Scope keys: the stable identity of every diagram the system can produce.
//!
//! A [`ScopeKey`] names one artifact/image pair. It is the unit of
//! deduplication in planning, the routing key for output paths and
//! cross-links, and the tag on every dispatch outcome.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Period, Vintage};

/// Which subdirectory of the output tree a diagram lands in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Directly under the output root.
    Root,
    /// `commodities/`
    Commodities,
    /// `processes/`
    Processes,
    /// `results/`
    Results,
}

impl Category {
    /// Subdirectory name, or `None` for the root.
    #[must_use]
    pub fn dir_name(self) -> Option<&'static str> {
        match self {
            Category::Root => None,
            Category::Commodities => Some("commodities"),
            Category::Processes => Some("processes"),
            Category::Results => Some("results"),
        }
    }
}

/// Identifies one diagram by kind and the model slice it covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKey {
    /// Whole-system topology, one node per technology.
    System,
    /// Whole-system topology with every (period, tech, vintage) explicit.
    SystemVintages,
    /// One carrier and its producers/consumers.
    Carrier { carrier: String },
    /// One technology across its periods and vintages.
    Technology { tech: String },
    /// Solved results for one period.
    PeriodResults { period: Period },
    /// Solved results for one technology in one period.
    TechResults { period: Period, tech: String },
    /// Per-time-slice flows of one process.
    Segments {
        period: Period,
        tech: String,
        vintage: Vintage,
    },
    /// Solved usage of one carrier in one period.
    CarrierUsage { carrier: String, period: Period },
}

impl ScopeKey {
    /// Output category for this scope.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            ScopeKey::System | ScopeKey::SystemVintages => Category::Root,
            ScopeKey::Carrier { .. } | ScopeKey::CarrierUsage { .. } => Category::Commodities,
            ScopeKey::Technology { .. } => Category::Processes,
            ScopeKey::PeriodResults { .. }
            | ScopeKey::TechResults { .. }
            | ScopeKey::Segments { .. } => Category::Results,
        }
    }

    /// File stem shared by the `.dot` artifact and its rendered image.
    #[must_use]
    pub fn file_stem(&self) -> String {
        match self {
            ScopeKey::System => "simple_model".to_owned(),
            ScopeKey::SystemVintages => "all_vintages_model".to_owned(),
            ScopeKey::Carrier { carrier } => format!("commodity_{carrier}"),
            ScopeKey::Technology { tech } => format!("process_{tech}"),
            ScopeKey::PeriodResults { period } => format!("results{period}"),
            ScopeKey::TechResults { period, tech } => format!("results_{tech}_{period}"),
            ScopeKey::Segments {
                period,
                tech,
                vintage,
            } => format!("results_{tech}_p{period}v{vintage}_segments"),
            ScopeKey::CarrierUsage { carrier, period } => format!("rc_{carrier}_{period}"),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::System => write!(f, "system"),
            ScopeKey::SystemVintages => write!(f, "system_vintages"),
            ScopeKey::Carrier { carrier } => write!(f, "carrier:{carrier}"),
            ScopeKey::Technology { tech } => write!(f, "technology:{tech}"),
            ScopeKey::PeriodResults { period } => write!(f, "period_results:{period}"),
            ScopeKey::TechResults { period, tech } => {
                write!(f, "tech_results:{tech}@{period}")
            }
            ScopeKey::Segments {
                period,
                tech,
                vintage,
            } => write!(f, "segments:{tech}@{period}/v{vintage}"),
            ScopeKey::CarrierUsage { carrier, period } => {
                write!(f, "carrier_usage:{carrier}@{period}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stems_match_artifact_naming() {
        assert_eq!(ScopeKey::System.file_stem(), "simple_model");
        assert_eq!(
            ScopeKey::Carrier {
                carrier: "coal".into()
            }
            .file_stem(),
            "commodity_coal"
        );
        assert_eq!(
            ScopeKey::Segments {
                period: 2025,
                tech: "coal_plant".into(),
                vintage: 2020
            }
            .file_stem(),
            "results_coal_plant_p2025v2020_segments"
        );
        assert_eq!(
            ScopeKey::CarrierUsage {
                carrier: "coal".into(),
                period: 2025
            }
            .file_stem(),
            "rc_coal_2025"
        );
    }

    #[test]
    fn categories_route_to_expected_subdirs() {
        assert_eq!(ScopeKey::System.category().dir_name(), None);
        assert_eq!(
            ScopeKey::Technology { tech: "x".into() }.category().dir_name(),
            Some("processes")
        );
        assert_eq!(
            ScopeKey::PeriodResults { period: 2025 }.category().dir_name(),
            Some("results")
        );
        // Usage diagrams live next to their structural carrier diagrams,
        // not under results/.
        assert_eq!(
            ScopeKey::CarrierUsage {
                carrier: "coal".into(),
                period: 2025
            }
            .category()
            .dir_name(),
            Some("commodities")
        );
    }
}
