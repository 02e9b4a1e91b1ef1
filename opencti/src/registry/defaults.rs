//! Default projections requested for each kind when the caller does not supply one.

use crate::{registry::fields::FieldSpec, types::EntityKind};

/// Concrete GraphQL types that may be returned by a Stix-Domain-Object listing, with their specific fields.
const DOMAIN_TYPES: &[&str] = &[
    "AttackPattern",
    "Campaign",
    "Note",
    "ObservedData",
    "Opinion",
    "Report",
    "CourseOfAction",
    "Individual",
    "Organization",
    "Sector",
    "System",
    "Indicator",
    "Infrastructure",
    "IntrusionSet",
    "City",
    "Country",
    "Region",
    "Position",
    "Malware",
    "ThreatActor",
    "Tool",
    "Vulnerability",
    "Incident",
];

fn labels() -> FieldSpec {
    FieldSpec::new().fields(&["id", "value", "color"])
}

fn file_metadata() -> FieldSpec {
    FieldSpec::new().fields(&["id", "name", "size"]).object(
        "metaData",
        FieldSpec::new().fields(&["mimetype", "version"]),
    )
}

pub(crate) fn import_files() -> FieldSpec {
    FieldSpec::new().connection("importFiles", file_metadata())
}

fn marking_definition() -> FieldSpec {
    FieldSpec::new().fields(&[
        "id",
        "standard_id",
        "entity_type",
        "parent_types",
        "definition_type",
        "definition",
        "x_opencti_order",
        "x_opencti_color",
        "created",
        "modified",
        "created_at",
        "updated_at",
    ])
}

fn kill_chain_phase() -> FieldSpec {
    FieldSpec::new().fields(&[
        "id",
        "standard_id",
        "entity_type",
        "parent_types",
        "kill_chain_name",
        "phase_name",
        "x_opencti_order",
        "created",
        "modified",
        "created_at",
        "updated_at",
    ])
}

fn external_reference() -> FieldSpec {
    FieldSpec::new()
        .fields(&[
            "id",
            "standard_id",
            "entity_type",
            "parent_types",
            "created_at",
            "updated_at",
            "created",
            "modified",
            "source_name",
            "description",
            "url",
            "hash",
            "external_id",
        ])
        .merge(import_files())
}

fn label() -> FieldSpec {
    FieldSpec::new().fields(&[
        "id",
        "standard_id",
        "entity_type",
        "value",
        "color",
        "created_at",
        "updated_at",
    ])
}

/// The author of an object, embedded with enough fields to be exported as an identity
fn created_by() -> FieldSpec {
    FieldSpec::new()
        .on(
            "Identity",
            FieldSpec::new()
                .fields(&[
                    "id",
                    "standard_id",
                    "entity_type",
                    "parent_types",
                    "spec_version",
                    "identity_class",
                    "name",
                    "description",
                    "roles",
                    "contact_information",
                    "x_opencti_aliases",
                    "created",
                    "modified",
                ])
                .connection("objectLabel", labels()),
        )
        .on(
            "Organization",
            FieldSpec::new().fields(&["x_opencti_organization_type", "x_opencti_reliability"]),
        )
        .on(
            "Individual",
            FieldSpec::new().fields(&["x_opencti_firstname", "x_opencti_lastname"]),
        )
}

/// Meta edges shared by every STIX core object
fn meta_edges() -> FieldSpec {
    FieldSpec::new()
        .object("createdBy", created_by())
        .connection("objectMarking", marking_definition())
        .connection("objectLabel", labels())
        .connection("externalReferences", external_reference())
}

fn header() -> FieldSpec {
    FieldSpec::new().fields(&[
        "id",
        "standard_id",
        "entity_type",
        "parent_types",
        "spec_version",
        "created_at",
        "updated_at",
    ])
}

fn contained_objects() -> FieldSpec {
    let basic = FieldSpec::new().fields(&["id", "standard_id", "entity_type"]);
    FieldSpec::new().connection(
        "objects",
        FieldSpec::new()
            .on("BasicObject", basic.clone())
            .on("BasicRelationship", basic),
    )
}

fn kill_chain_phases() -> FieldSpec {
    FieldSpec::new().connection("killChainPhases", kill_chain_phase())
}

/// Fields specific to a concrete GraphQL type
fn type_fields(graphql_type: &str) -> FieldSpec {
    let named = FieldSpec::new().fields(&["name", "description"]);
    let place = named
        .clone()
        .fields(&["latitude", "longitude", "precision", "x_opencti_aliases"]);
    match graphql_type {
        "AttackPattern" => named
            .fields(&[
                "aliases",
                "x_mitre_platforms",
                "x_mitre_permissions_required",
                "x_mitre_detection",
                "x_mitre_id",
            ])
            .merge(kill_chain_phases()),
        "Campaign" | "Incident" => {
            named.fields(&["aliases", "first_seen", "last_seen", "objective"])
        }
        "Note" => FieldSpec::new()
            .fields(&["attribute_abstract", "content", "authors"])
            .merge(contained_objects()),
        "ObservedData" => FieldSpec::new()
            .fields(&["first_observed", "last_observed", "number_observed"])
            .merge(contained_objects()),
        "Opinion" => FieldSpec::new()
            .fields(&["explanation", "authors", "opinion"])
            .merge(contained_objects()),
        "Report" => named
            .fields(&["report_types", "published"])
            .merge(contained_objects()),
        "CourseOfAction" => named.fields(&["x_opencti_aliases", "x_mitre_id"]),
        "Individual" => named.fields(&[
            "x_opencti_aliases",
            "contact_information",
            "x_opencti_firstname",
            "x_opencti_lastname",
        ]),
        "Organization" => named.fields(&[
            "x_opencti_aliases",
            "contact_information",
            "x_opencti_organization_type",
            "x_opencti_reliability",
        ]),
        "Sector" => named.fields(&["x_opencti_aliases", "contact_information"]),
        "System" => named.fields(&["x_opencti_aliases"]),
        "Indicator" => named.fields(&[
            "pattern_type",
            "pattern_version",
            "pattern",
            "indicator_types",
            "valid_from",
            "valid_until",
            "x_opencti_score",
            "x_opencti_detection",
            "x_opencti_main_observable_type",
        ]),
        "Infrastructure" => named.fields(&[
            "aliases",
            "infrastructure_types",
            "first_seen",
            "last_seen",
        ]),
        "IntrusionSet" => named.fields(&[
            "aliases",
            "first_seen",
            "last_seen",
            "goals",
            "resource_level",
            "primary_motivation",
            "secondary_motivations",
        ]),
        "City" | "Country" | "Region" => place,
        "Position" => place.fields(&["street_address", "postal_code"]),
        "Malware" => named
            .fields(&[
                "aliases",
                "malware_types",
                "is_family",
                "first_seen",
                "last_seen",
                "architecture_execution_envs",
                "implementation_languages",
                "capabilities",
            ])
            .merge(kill_chain_phases()),
        "ThreatActor" => named.fields(&[
            "aliases",
            "threat_actor_types",
            "first_seen",
            "last_seen",
            "roles",
            "goals",
            "sophistication",
            "resource_level",
            "primary_motivation",
            "secondary_motivations",
            "personal_motivations",
        ]),
        "Tool" => named
            .fields(&["aliases", "tool_types", "tool_version"])
            .merge(kill_chain_phases()),
        "Vulnerability" => named.fields(&[
            "x_opencti_base_score",
            "x_opencti_base_severity",
            "x_opencti_attack_vector",
            "x_opencti_integrity_impact",
            "x_opencti_availability_impact",
        ]),
        _ => FieldSpec::new(),
    }
}

fn with_fragments(spec: FieldSpec, graphql_types: &[&str]) -> FieldSpec {
    graphql_types
        .iter()
        .fold(spec, |spec, graphql_type| {
            spec.on(graphql_type, type_fields(graphql_type))
        })
}

fn domain_object(graphql_types: &[&str]) -> FieldSpec {
    let spec = header()
        .merge(meta_edges())
        .fields(&["revoked", "confidence", "created", "modified"]);
    with_fragments(spec, graphql_types).merge(import_files())
}

/// The projection requested for a kind when the caller does not override it.
pub fn default_fields(kind: EntityKind) -> FieldSpec {
    match kind {
        EntityKind::Label => label(),
        EntityKind::MarkingDefinition => marking_definition(),
        EntityKind::KillChainPhase => kill_chain_phase(),
        EntityKind::ExternalReference => external_reference(),
        EntityKind::StixCoreObject => {
            let domain = FieldSpec::new().fields(&["revoked", "confidence", "created", "modified"]);
            with_fragments(
                header()
                    .merge(meta_edges())
                    .on("StixDomainObject", domain),
                DOMAIN_TYPES,
            )
            .merge(import_files())
        }
        EntityKind::StixDomainObject => domain_object(DOMAIN_TYPES),
        EntityKind::Identity => domain_object(&["Individual", "Organization", "Sector", "System"])
            .fields(&["identity_class", "roles"]),
        EntityKind::Location => domain_object(&["City", "Country", "Region", "Position"]),
        concrete => domain_object(&[graphql_type_name(concrete.as_ref()).as_str()]),
    }
}

/// The GraphQL type name of an entity type, e.g. `Attack-Pattern` -> `AttackPattern`
pub fn graphql_type_name(entity_type: &str) -> String {
    entity_type.replace('-', "")
}
