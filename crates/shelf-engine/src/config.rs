//! Reconciliation configuration, validation, and error types.
//!
//! Every threshold the engine uses is a named field here. Defaults are the
//! production values; [`ReconcileConfig::validate()`] rejects settings that
//! would make a pass meaningless (negative lengths, zero iteration caps) or
//! non-terminating.

use std::error::Error;
use std::fmt;

// ── ToleranceConfig ────────────────────────────────────────────────

/// Geometric tolerances and membership thresholds. Lengths in metres.
#[derive(Clone, Debug, PartialEq)]
pub struct ToleranceConfig {
    /// Slack on both sides of a boundary when testing for a crossing. Default: 0.005.
    pub boundary: f64,
    /// Allowed overshoot of a split's left part past the boundary. Default: 0.001.
    pub split_verify: f64,
    /// Y distance under which a position sits on a given shelf. Default: 0.01.
    pub shelf_match: f64,
    /// Y distance under which a fixture in another segment is the same shelf. Default: 0.05.
    pub fixture_y_match: f64,
    /// Y distance for shelf-level membership in cross-zone inflation. Default: 0.05.
    pub level_match: f64,
    /// Quantization step for grouping positions into shelf levels. Default: 0.01.
    pub level_grouping: f64,
    /// Quantization step for shelf Y in snapshots and rosters. Default: 0.001.
    pub snapshot_grouping: f64,
    /// Percentage of a footprint that must lie in a segment to belong to it. Default: 80.
    pub membership_pct: f64,
    /// Left-of-boundary percentage at or above which an item is "attached left". Default: 50.
    pub attachment_pct: f64,
    /// Added before flooring when counting facings that fit left of a boundary. Default: 0.001.
    pub split_epsilon: f64,
    /// Minimum offset from a fixture's left edge for a placed item. Default: 0.005.
    pub leftmost_edge: f64,
    /// Gap left before the leftmost existing item when placing in front of it. Default: 0.010.
    pub leftmost_gap: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            boundary: 0.005,
            split_verify: 0.001,
            shelf_match: 0.01,
            fixture_y_match: 0.05,
            level_match: 0.05,
            level_grouping: 0.01,
            snapshot_grouping: 0.001,
            membership_pct: 80.0,
            attachment_pct: 50.0,
            split_epsilon: 0.001,
            leftmost_edge: 0.005,
            leftmost_gap: 0.010,
        }
    }
}

// ── InflationConfig ────────────────────────────────────────────────

/// Limits for cross-zone facing inflation and donor space checks.
#[derive(Clone, Debug, PartialEq)]
pub struct InflationConfig {
    /// Items at or above this days-of-supply are not inflated. Default: 3.5.
    pub dos_cutoff: f64,
    /// Free space below which inflation stops (metres). Default: 0.030.
    pub min_gap: f64,
    /// Free space the later zone must have before earlier-zone inflation. Default: 0.150.
    pub preflight: f64,
    /// Margin kept free beyond one facing (metres). Default: 0.075.
    pub width_margin: f64,
    /// Margin kept free beyond the projected cascade (metres). Default: 0.050.
    pub cascade_margin: f64,
    /// Share of the earlier zone's right-half width assumed to cascade. Default: 0.3.
    pub cascade_factor: f64,
    /// Inflations per shelf level across both phases. Default: 50.
    pub per_shelf_cap: u32,
    /// Earlier-zone attempts per shelf level. Default: 20.
    pub phase1_cap: u32,
    /// Later-zone attempts per shelf level. Default: 30.
    pub phase2_cap: u32,
}

impl Default for InflationConfig {
    fn default() -> Self {
        Self {
            dos_cutoff: 3.5,
            min_gap: 0.030,
            preflight: 0.150,
            width_margin: 0.075,
            cascade_margin: 0.050,
            cascade_factor: 0.3,
            per_shelf_cap: 50,
            phase1_cap: 20,
            phase2_cap: 30,
        }
    }
}

// ── FillConfig ─────────────────────────────────────────────────────

/// Limits for filling leftover width in the last segment.
#[derive(Clone, Debug, PartialEq)]
pub struct FillConfig {
    /// Residual width below which a shelf is considered full. Default: 0.020.
    pub residual: f64,
    /// Overshoot past the fixture edge that reverts an inflation. Default: 0.001.
    pub overflow_tolerance: f64,
    /// Inflation attempts per shelf. Default: 50.
    pub max_iterations: u32,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            residual: 0.020,
            overflow_tolerance: 0.001,
            max_iterations: 50,
        }
    }
}

// ── Policies ───────────────────────────────────────────────────────

/// How snapshot entries are keyed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SnapshotKey {
    /// One entry per product.
    #[default]
    Product,
    /// One entry per product per shelf level.
    ProductShelf,
}

/// What to do with a product split across two adjacent segments with a
/// single stray facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitPolicy {
    /// Keep the split; inflate a neighbour to tidy the gap side.
    Allow,
    /// Fold the stray facing back into the product's main placement.
    Prevent,
}

/// Where the effective [`SplitPolicy`] came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicySource {
    /// Set on the config; the descriptor was not read.
    Override,
    /// Descriptor absent or blank.
    Absent,
    /// Descriptor held `yes` or `no`.
    Descriptor,
    /// Descriptor held something else; treated as `no`.
    Unrecognized(String),
}

impl SplitPolicy {
    /// Interpret the raw descriptor value.
    ///
    /// Blank or missing allows splits. `yes`/`no` are matched trimmed and
    /// case-insensitively. Anything else prevents splits.
    pub fn from_descriptor(raw: Option<&str>) -> (Self, PolicySource) {
        match raw.map(str::trim) {
            None | Some("") => (Self::Allow, PolicySource::Absent),
            Some(v) if v.eq_ignore_ascii_case("yes") => (Self::Allow, PolicySource::Descriptor),
            Some(v) if v.eq_ignore_ascii_case("no") => (Self::Prevent, PolicySource::Descriptor),
            Some(v) => (Self::Prevent, PolicySource::Unrecognized(v.to_string())),
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`ReconcileConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A length is NaN, infinite, negative, or zero where it must be positive.
    InvalidLength {
        /// Dotted path of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A percentage is outside `(0, 100]`.
    InvalidPercentage {
        /// Dotted path of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A dimensionless factor is NaN, infinite, or negative.
    InvalidFactor {
        /// Dotted path of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// An iteration cap is zero.
    ZeroCap {
        /// Dotted path of the offending field.
        field: &'static str,
    },
    /// A phase cap exceeds the per-shelf cap it is bounded by.
    PhaseCapExceedsShelfCap {
        /// Dotted path of the offending field.
        field: &'static str,
        /// The configured phase cap.
        cap: u32,
        /// The per-shelf cap.
        shelf_cap: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength { field, value } => {
                write!(f, "{field} must be a finite non-negative length, got {value}")
            }
            Self::InvalidPercentage { field, value } => {
                write!(f, "{field} must be in (0, 100], got {value}")
            }
            Self::InvalidFactor { field, value } => {
                write!(f, "{field} must be finite and non-negative, got {value}")
            }
            Self::ZeroCap { field } => write!(f, "{field} must be at least 1"),
            Self::PhaseCapExceedsShelfCap {
                field,
                cap,
                shelf_cap,
            } => write!(
                f,
                "{field} ({cap}) exceeds inflation.per_shelf_cap ({shelf_cap})"
            ),
        }
    }
}

impl Error for ConfigError {}

// ── ReconcileConfig ────────────────────────────────────────────────

/// Complete configuration for one reconciliation run.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileConfig {
    /// Geometric tolerances.
    pub tolerances: ToleranceConfig,
    /// Cross-zone inflation limits.
    pub inflation: InflationConfig,
    /// Last-zone fill limits.
    pub fill: FillConfig,
    /// Detect/resolve rounds per boundary before the final check. Default: 3.
    pub max_overlap_rounds: u32,
    /// Compare/rescue passes per boundary. Later passes only handle
    /// products displaced by an earlier pass's own rescues. Default: 3.
    pub max_rescue_passes: u32,
    /// Snapshot keying. Default: [`SnapshotKey::Product`].
    pub snapshot_key: SnapshotKey,
    /// Forces a split policy. `None` reads the document descriptor.
    pub split_policy: Option<SplitPolicy>,
    /// Force left-to-right and combinable fixtures before processing. Default: true.
    pub normalize: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tolerances: ToleranceConfig::default(),
            inflation: InflationConfig::default(),
            fill: FillConfig::default(),
            max_overlap_rounds: 3,
            max_rescue_passes: 3,
            snapshot_key: SnapshotKey::Product,
            split_policy: None,
            normalize: true,
        }
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidLength { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidLength { field, value })
    }
}

fn percentage(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 100.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidPercentage { field, value })
    }
}

fn nonzero(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroCap { field })
    } else {
        Ok(())
    }
}

impl ReconcileConfig {
    /// Check every threshold. Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tolerances;
        non_negative("tolerances.boundary", t.boundary)?;
        non_negative("tolerances.split_verify", t.split_verify)?;
        positive("tolerances.shelf_match", t.shelf_match)?;
        positive("tolerances.fixture_y_match", t.fixture_y_match)?;
        positive("tolerances.level_match", t.level_match)?;
        positive("tolerances.level_grouping", t.level_grouping)?;
        positive("tolerances.snapshot_grouping", t.snapshot_grouping)?;
        percentage("tolerances.membership_pct", t.membership_pct)?;
        percentage("tolerances.attachment_pct", t.attachment_pct)?;
        non_negative("tolerances.split_epsilon", t.split_epsilon)?;
        non_negative("tolerances.leftmost_edge", t.leftmost_edge)?;
        non_negative("tolerances.leftmost_gap", t.leftmost_gap)?;

        let i = &self.inflation;
        if !(i.dos_cutoff.is_finite() && i.dos_cutoff > 0.0) {
            return Err(ConfigError::InvalidFactor {
                field: "inflation.dos_cutoff",
                value: i.dos_cutoff,
            });
        }
        non_negative("inflation.min_gap", i.min_gap)?;
        non_negative("inflation.preflight", i.preflight)?;
        non_negative("inflation.width_margin", i.width_margin)?;
        non_negative("inflation.cascade_margin", i.cascade_margin)?;
        if !(i.cascade_factor.is_finite() && i.cascade_factor >= 0.0) {
            return Err(ConfigError::InvalidFactor {
                field: "inflation.cascade_factor",
                value: i.cascade_factor,
            });
        }
        nonzero("inflation.per_shelf_cap", i.per_shelf_cap)?;
        nonzero("inflation.phase1_cap", i.phase1_cap)?;
        nonzero("inflation.phase2_cap", i.phase2_cap)?;
        for (field, cap) in [
            ("inflation.phase1_cap", i.phase1_cap),
            ("inflation.phase2_cap", i.phase2_cap),
        ] {
            if cap > i.per_shelf_cap {
                return Err(ConfigError::PhaseCapExceedsShelfCap {
                    field,
                    cap,
                    shelf_cap: i.per_shelf_cap,
                });
            }
        }

        non_negative("fill.residual", self.fill.residual)?;
        non_negative("fill.overflow_tolerance", self.fill.overflow_tolerance)?;
        nonzero("fill.max_iterations", self.fill.max_iterations)?;
        nonzero("max_overlap_rounds", self.max_overlap_rounds)?;
        nonzero("max_rescue_passes", self.max_rescue_passes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ReconcileConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_boundary_tolerance_rejected() {
        let mut cfg = ReconcileConfig::default();
        cfg.tolerances.boundary = -0.001;
        match cfg.validate() {
            Err(ConfigError::InvalidLength {
                field: "tolerances.boundary",
                ..
            }) => {}
            other => panic!("expected InvalidLength, got {other:?}"),
        }
    }

    #[test]
    fn nan_grouping_step_rejected() {
        let mut cfg = ReconcileConfig::default();
        cfg.tolerances.level_grouping = f64::NAN;
        match cfg.validate() {
            Err(ConfigError::InvalidLength { field, .. }) => {
                assert_eq!(field, "tolerances.level_grouping")
            }
            other => panic!("expected InvalidLength, got {other:?}"),
        }
    }

    #[test]
    fn membership_above_hundred_rejected() {
        let mut cfg = ReconcileConfig::default();
        cfg.tolerances.membership_pct = 120.0;
        match cfg.validate() {
            Err(ConfigError::InvalidPercentage { value, .. }) => assert_eq!(value, 120.0),
            other => panic!("expected InvalidPercentage, got {other:?}"),
        }
    }

    #[test]
    fn zero_rounds_rejected() {
        let cfg = ReconcileConfig {
            max_overlap_rounds: 0,
            ..Default::default()
        };
        match cfg.validate() {
            Err(ConfigError::ZeroCap {
                field: "max_overlap_rounds",
            }) => {}
            other => panic!("expected ZeroCap, got {other:?}"),
        }
    }

    #[test]
    fn zero_rescue_passes_rejected() {
        let cfg = ReconcileConfig {
            max_rescue_passes: 0,
            ..Default::default()
        };
        match cfg.validate() {
            Err(ConfigError::ZeroCap {
                field: "max_rescue_passes",
            }) => {}
            other => panic!("expected ZeroCap, got {other:?}"),
        }
    }

    #[test]
    fn phase_cap_bounded_by_shelf_cap() {
        let mut cfg = ReconcileConfig::default();
        cfg.inflation.per_shelf_cap = 10;
        let err = cfg.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::PhaseCapExceedsShelfCap {
                field: "inflation.phase1_cap",
                cap: 20,
                shelf_cap: 10,
            }
        );
        assert!(err.to_string().contains("per_shelf_cap"));
    }

    #[test]
    fn negative_cascade_factor_rejected() {
        let mut cfg = ReconcileConfig::default();
        cfg.inflation.cascade_factor = -0.1;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidFactor { .. })
        ));
    }

    #[test]
    fn descriptor_policy_parsing() {
        assert_eq!(
            SplitPolicy::from_descriptor(None),
            (SplitPolicy::Allow, PolicySource::Absent)
        );
        assert_eq!(
            SplitPolicy::from_descriptor(Some("   ")),
            (SplitPolicy::Allow, PolicySource::Absent)
        );
        assert_eq!(
            SplitPolicy::from_descriptor(Some(" YES ")),
            (SplitPolicy::Allow, PolicySource::Descriptor)
        );
        assert_eq!(
            SplitPolicy::from_descriptor(Some("No")),
            (SplitPolicy::Prevent, PolicySource::Descriptor)
        );
        assert_eq!(
            SplitPolicy::from_descriptor(Some("maybe")),
            (
                SplitPolicy::Prevent,
                PolicySource::Unrecognized("maybe".to_string())
            )
        );
    }
}
