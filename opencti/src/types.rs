//! Core types shared by the repository, the relationship editor and the STIX2 mapper.

use crate::error::ClientError as Error;
use jiff::{tz::TimeZone, Timestamp as JiffTimestamp};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// The kinds of knowledge-base objects the client knows how to address.
///
/// The string form of each kind is the `entity_type` used by the remote store (e.g. `Attack-Pattern`).
/// The abstract kinds (`Stix-Core-Object`, `Stix-Domain-Object`, `Identity`, `Location`) are polymorphic entry points
/// that return objects of any of their concrete sub-types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
pub enum EntityKind {
    #[strum(serialize = "Stix-Core-Object")]
    StixCoreObject,
    #[strum(serialize = "Stix-Domain-Object")]
    StixDomainObject,
    #[strum(serialize = "Attack-Pattern")]
    AttackPattern,
    #[strum(serialize = "Campaign")]
    Campaign,
    #[strum(serialize = "Course-Of-Action")]
    CourseOfAction,
    #[strum(serialize = "Identity")]
    Identity,
    #[strum(serialize = "Incident")]
    Incident,
    #[strum(serialize = "Indicator")]
    Indicator,
    #[strum(serialize = "Infrastructure")]
    Infrastructure,
    #[strum(serialize = "Intrusion-Set")]
    IntrusionSet,
    #[strum(serialize = "Location")]
    Location,
    #[strum(serialize = "Malware")]
    Malware,
    #[strum(serialize = "Note")]
    Note,
    #[strum(serialize = "Observed-Data")]
    ObservedData,
    #[strum(serialize = "Opinion")]
    Opinion,
    #[strum(serialize = "Report")]
    Report,
    #[strum(serialize = "Threat-Actor")]
    ThreatActor,
    #[strum(serialize = "Tool")]
    Tool,
    #[strum(serialize = "Vulnerability")]
    Vulnerability,
    #[strum(serialize = "Label")]
    Label,
    #[strum(serialize = "Marking-Definition")]
    MarkingDefinition,
    #[strum(serialize = "Kill-Chain-Phase")]
    KillChainPhase,
    #[strum(serialize = "External-Reference")]
    ExternalReference,
}

impl EntityKind {
    /// Find the kind addressing a given `entity_type`, including the concrete sub-types of `Identity` and `Location`
    pub fn from_entity_type(entity_type: &str) -> Option<Self> {
        match entity_type {
            "Organization" | "Individual" | "Sector" | "System" => Some(EntityKind::Identity),
            "City" | "Country" | "Region" | "Position" => Some(EntityKind::Location),
            _ => EntityKind::from_str(entity_type).ok(),
        }
    }

    /// Iterate over every kind known to the client
    pub fn all() -> impl Iterator<Item = EntityKind> {
        EntityKind::iter()
    }
}

/// How many targets an edge type may have for a given source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// The typed, directed meta relationships a source object owns.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EdgeType {
    CreatedBy,
    ObjectMarking,
    ObjectLabel,
    ExternalReference,
    KillChainPhase,
}

impl EdgeType {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            EdgeType::CreatedBy => Cardinality::One,
            _ => Cardinality::Many,
        }
    }

    /// The name of the field holding this edge on a source object
    pub fn field_name(&self) -> &'static str {
        match self {
            EdgeType::CreatedBy => "createdBy",
            EdgeType::ObjectMarking => "objectMarking",
            EdgeType::ObjectLabel => "objectLabel",
            EdgeType::ExternalReference => "externalReferences",
            EdgeType::KillChainPhase => "killChainPhases",
        }
    }
}

/// Sort direction of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderMode {
    Asc,
    Desc,
}

/// A point in time, displayed in the STIX 2.1 timestamp format with millisecond precision.
///
/// Parsing is lenient: any RFC 3339 timestamp is accepted, whatever its offset or precision,
/// and is normalized to UTC `YYYY-MM-DDTHH:mm:ss.sssZ` when displayed.
struct Timestamp(JiffTimestamp);

impl Timestamp {
    fn new(timestamp_str: &str) -> Result<Self, Error> {
        let timestamp = JiffTimestamp::from_str(timestamp_str)
            .map_err(|e| Error::InvalidParameter(format!("timestamp {timestamp_str}: {e}")))?;
        Ok(Self(timestamp))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zoned = self.0.to_zoned(TimeZone::UTC);
        write!(
            f,
            "{}.{:03}Z",
            zoned.strftime("%Y-%m-%dT%H:%M:%S"),
            zoned.millisecond()
        )
    }
}

/// Normalize a date string to the STIX 2.1 timestamp format.
///
/// Values that cannot be parsed are passed through untouched, with a warning.
pub fn format_date(raw: &str) -> String {
    match Timestamp::new(raw) {
        Ok(timestamp) => timestamp.to_string(),
        Err(e) => {
            log::warn!("Could not normalize date {raw}, exporting it as is: {e}");
            raw.to_string()
        }
    }
}
