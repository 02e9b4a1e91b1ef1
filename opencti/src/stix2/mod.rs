//! Conversion between knowledge-base entities and STIX 2.1 objects.
//!
//! Each exportable kind has a [`Profile`] listing the attributes it carries and their STIX names. The same profiles
//! drive [`export::to_stix2`] and [`import::from_stix2`], so that importing an exported object gives back the input it
//! was created from.

pub mod bundle;
pub mod export;
pub mod import;
pub mod marking;

pub use export::{to_stix2, ExportMode, ExportOptions, StixExport};
pub use import::{from_stix2, ImportExtras, StixImport};
pub use marking::MarkingCeiling;

use crate::types::EntityKind;
use serde_json::{Map, Value};

/// STIX version of every exported object
pub const SPEC_VERSION: &str = "2.1";

/// Id of the extension definition under which OpenCTI publishes its custom properties
pub const OPENCTI_EXTENSION_ID: &str = "extension-definition--ea279b3e-5c71-4632-ac08-831c66a786ba";

/// Prefix of the custom properties published at the top level of objects
pub const CUSTOM_PREFIX: &str = "x_opencti_";

/// Where an attribute lives in a STIX object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// A standard property, under its STIX name
    Standard(&'static str),
    /// A custom property, under `x_opencti_<name>` or `<name>` in the OpenCTI extension
    Custom(&'static str),
}

/// One attribute of a kind: its field name in the knowledge base and its place in STIX
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub field: &'static str,
    pub placement: Placement,
    /// Dates are normalized on export
    pub date: bool,
}

const fn standard(field: &'static str) -> Attribute {
    Attribute {
        field,
        placement: Placement::Standard(field),
        date: false,
    }
}

const fn renamed(field: &'static str, stix: &'static str) -> Attribute {
    Attribute {
        field,
        placement: Placement::Standard(stix),
        date: false,
    }
}

const fn date(field: &'static str) -> Attribute {
    Attribute {
        date: true,
        ..standard(field)
    }
}

/// A custom attribute; `field` must start with [`CUSTOM_PREFIX`]
const fn custom(field: &'static str, name: &'static str) -> Attribute {
    Attribute {
        field,
        placement: Placement::Custom(name),
        date: false,
    }
}

/// How a kind maps to STIX
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Profile {
    pub kind: EntityKind,
    pub stix_type: &'static str,
    pub attributes: &'static [Attribute],
    /// The field receiving aliases on import, if the kind has aliases
    pub alias_field: Option<&'static str>,
    /// Whether objects carry inline kill-chain phases
    pub kill_chain_phases: bool,
    /// Whether objects are containers with `object_refs`
    pub container: bool,
}

/// Attributes of a named object, followed by its own
macro_rules! named {
    ($($attribute:expr),* $(,)?) => {
        &[standard("name"), standard("description"), $($attribute),*]
    };
}

const CUSTOM_ALIASES: Attribute = custom("x_opencti_aliases", "aliases");

const ATTACK_PATTERN: &[Attribute] = named![
    standard("aliases"),
    standard("x_mitre_platforms"),
    standard("x_mitre_permissions_required"),
    standard("x_mitre_detection"),
    standard("x_mitre_id"),
];
const CAMPAIGN: &[Attribute] = named![
    standard("aliases"),
    date("first_seen"),
    date("last_seen"),
    standard("objective"),
];
const COURSE_OF_ACTION: &[Attribute] = named![CUSTOM_ALIASES, standard("x_mitre_id")];
const IDENTITY: &[Attribute] = named![
    standard("identity_class"),
    standard("roles"),
    standard("contact_information"),
    CUSTOM_ALIASES,
    custom("x_opencti_organization_type", "organization_type"),
    custom("x_opencti_reliability", "reliability"),
    custom("x_opencti_firstname", "firstname"),
    custom("x_opencti_lastname", "lastname"),
];
const INDICATOR: &[Attribute] = named![
    standard("pattern"),
    standard("pattern_type"),
    standard("pattern_version"),
    standard("indicator_types"),
    date("valid_from"),
    date("valid_until"),
    custom("x_opencti_score", "score"),
    custom("x_opencti_detection", "detection"),
    custom("x_opencti_main_observable_type", "main_observable_type"),
];
const INFRASTRUCTURE: &[Attribute] = named![
    standard("aliases"),
    standard("infrastructure_types"),
    date("first_seen"),
    date("last_seen"),
];
const INTRUSION_SET: &[Attribute] = named![
    standard("aliases"),
    date("first_seen"),
    date("last_seen"),
    standard("goals"),
    standard("resource_level"),
    standard("primary_motivation"),
    standard("secondary_motivations"),
];
const LOCATION: &[Attribute] = named![
    standard("latitude"),
    standard("longitude"),
    standard("precision"),
    standard("street_address"),
    standard("postal_code"),
    CUSTOM_ALIASES,
];
const MALWARE: &[Attribute] = named![
    standard("aliases"),
    standard("malware_types"),
    standard("is_family"),
    date("first_seen"),
    date("last_seen"),
    standard("architecture_execution_envs"),
    standard("implementation_languages"),
    standard("capabilities"),
];
const NOTE: &[Attribute] = &[
    renamed("attribute_abstract", "abstract"),
    standard("content"),
    standard("authors"),
];
const OBSERVED_DATA: &[Attribute] = &[
    date("first_observed"),
    date("last_observed"),
    standard("number_observed"),
];
const OPINION: &[Attribute] = &[standard("explanation"), standard("authors"), standard("opinion")];
const REPORT: &[Attribute] = named![standard("report_types"), date("published")];
const THREAT_ACTOR: &[Attribute] = named![
    standard("aliases"),
    standard("threat_actor_types"),
    date("first_seen"),
    date("last_seen"),
    standard("roles"),
    standard("goals"),
    standard("sophistication"),
    standard("resource_level"),
    standard("primary_motivation"),
    standard("secondary_motivations"),
    standard("personal_motivations"),
];
const TOOL: &[Attribute] = named![standard("aliases"), standard("tool_types"), standard("tool_version")];
const VULNERABILITY: &[Attribute] = named![
    custom("x_opencti_base_score", "base_score"),
    custom("x_opencti_base_severity", "base_severity"),
    custom("x_opencti_attack_vector", "attack_vector"),
    custom("x_opencti_integrity_impact", "integrity_impact"),
    custom("x_opencti_availability_impact", "availability_impact"),
];

const fn profile(kind: EntityKind, stix_type: &'static str, attributes: &'static [Attribute]) -> Profile {
    Profile {
        kind,
        stix_type,
        attributes,
        alias_field: Some("aliases"),
        kill_chain_phases: false,
        container: false,
    }
}

const fn container(kind: EntityKind, stix_type: &'static str, attributes: &'static [Attribute]) -> Profile {
    Profile {
        alias_field: None,
        container: true,
        ..profile(kind, stix_type, attributes)
    }
}

const fn with_kill_chain(profile: Profile) -> Profile {
    Profile {
        kill_chain_phases: true,
        ..profile
    }
}

const fn with_alias_field(profile: Profile, alias_field: Option<&'static str>) -> Profile {
    Profile {
        alias_field,
        ..profile
    }
}

/// The STIX profile of a concrete kind. Generic and meta kinds other than marking definitions have none.
pub fn profile_of(kind: EntityKind) -> Option<Profile> {
    let custom_aliases = Some("x_opencti_aliases");
    let profile = match kind {
        EntityKind::AttackPattern => with_kill_chain(profile(kind, "attack-pattern", ATTACK_PATTERN)),
        EntityKind::Campaign => profile(kind, "campaign", CAMPAIGN),
        EntityKind::CourseOfAction => {
            with_alias_field(profile(kind, "course-of-action", COURSE_OF_ACTION), custom_aliases)
        }
        EntityKind::Identity => with_alias_field(profile(kind, "identity", IDENTITY), custom_aliases),
        EntityKind::Incident => profile(kind, "incident", CAMPAIGN),
        EntityKind::Indicator => with_alias_field(profile(kind, "indicator", INDICATOR), None),
        EntityKind::Infrastructure => profile(kind, "infrastructure", INFRASTRUCTURE),
        EntityKind::IntrusionSet => profile(kind, "intrusion-set", INTRUSION_SET),
        EntityKind::Location => with_alias_field(profile(kind, "location", LOCATION), custom_aliases),
        EntityKind::Malware => with_kill_chain(profile(kind, "malware", MALWARE)),
        EntityKind::Note => container(kind, "note", NOTE),
        EntityKind::ObservedData => container(kind, "observed-data", OBSERVED_DATA),
        EntityKind::Opinion => container(kind, "opinion", OPINION),
        EntityKind::Report => container(kind, "report", REPORT),
        EntityKind::ThreatActor => profile(kind, "threat-actor", THREAT_ACTOR),
        EntityKind::Tool => with_kill_chain(profile(kind, "tool", TOOL)),
        EntityKind::Vulnerability => with_alias_field(profile(kind, "vulnerability", VULNERABILITY), None),
        EntityKind::MarkingDefinition => with_alias_field(profile(kind, "marking-definition", &[]), None),
        EntityKind::StixCoreObject
        | EntityKind::StixDomainObject
        | EntityKind::Label
        | EntityKind::KillChainPhase
        | EntityKind::ExternalReference => return None,
    };
    Some(profile)
}

/// The profile of a STIX object type
pub fn profile_for_stix_type(stix_type: &str) -> Option<Profile> {
    EntityKind::all()
        .filter_map(profile_of)
        .find(|profile| profile.stix_type == stix_type)
}

/// Replace HTML code tags with markdown backticks
pub fn convert_markdown(text: &str) -> String {
    text.replace("<code>", "`").replace("</code>", "`")
}

/// The aliases of a STIX object, from the first alias property present
pub fn pick_aliases(stix: &Map<String, Value>) -> Option<Value> {
    ["x_opencti_aliases", "x_mitre_aliases", "x_amitt_aliases", "aliases"]
        .iter()
        .find_map(|key| stix.get(*key).filter(|value| !value.is_null()))
        .cloned()
}

/// Read a custom property from the top level of an object, or else from its OpenCTI extension
pub fn custom_property<'a>(stix: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    stix.get(&format!("{CUSTOM_PREFIX}{name}"))
        .or_else(|| {
            stix.get("extensions")
                .and_then(|extensions| extensions.get(OPENCTI_EXTENSION_ID))
                .and_then(|extension| extension.get(name))
        })
        .filter(|value| !value.is_null())
}

#[cfg(test)]
mod tests;
