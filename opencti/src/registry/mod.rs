//! The field-set registry: per-kind projections and the policy records that drive the generic repository.
//!
//! Every kind the client addresses is described by a [`KindPolicy`]. The repository never holds kind-specific query
//! text: it renders its GraphQL documents from these records and from the projections in [`defaults`].

pub mod defaults;
pub mod fields;

pub use defaults::{default_fields, graphql_type_name};
pub use fields::{FieldSpec, Selection};

use crate::types::{EdgeType, EntityKind};

/// Page size used by listings of the generic Stix-Domain-Object and Stix-Core-Object kinds, and by their
/// full pagination.
pub const STIX_DOMAIN_OBJECT_PAGE_SIZE: u32 = 100;
/// Page size used by listings of every other kind, and by their full pagination.
pub const META_OBJECT_PAGE_SIZE: u32 = 500;

/// Fields returned by creation mutations that do not return the full projection
pub const MINIMAL_FIELDS: &[&str] = &["id", "standard_id", "entity_type", "parent_types"];

/// Kinds whose objects may carry kill-chain phases
pub const KILL_CHAIN_TYPES: &[&str] = &["Attack-Pattern", "Malware", "Tool"];

/// An attribute that must be present in a creation input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Field(&'static str),
    /// Must be set, but may be an empty string
    Present(&'static str),
    /// At least one of the attributes must be present
    AnyOf(&'static [&'static str]),
}

impl Requirement {
    pub fn describe(&self) -> String {
        match self {
            Requirement::Field(name) | Requirement::Present(name) => name.to_string(),
            Requirement::AnyOf(names) => names.join(" or "),
        }
    }
}

/// One of the mutations able to create objects of a kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreateVariant {
    /// The value of the `type` attribute selecting this variant. `None` matches any type.
    pub when_type: Option<&'static str>,
    pub mutation: &'static str,
    pub input_type: &'static str,
    /// Attributes removed from the input before it is sent
    pub drops: &'static [&'static str],
    /// Whether the mutation returns the full default projection rather than [`MINIMAL_FIELDS`]
    pub full_projection: bool,
}

/// How objects of a kind are created
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreatePolicy {
    pub required: &'static [Requirement],
    /// Tried in order; the first variant matching the `type` attribute is used
    pub variants: &'static [CreateVariant],
}

impl CreatePolicy {
    /// Pick the mutation used for a given `type` attribute
    pub fn variant(&self, type_: Option<&str>) -> Option<&CreateVariant> {
        self.variants
            .iter()
            .find(|variant| variant.when_type.is_none() || variant.when_type == type_)
    }
}

/// Everything the generic repository needs to know about a kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KindPolicy {
    pub kind: EntityKind,
    /// Name of the single-object query, e.g. `courseOfAction`
    pub read_query: &'static str,
    /// Name of the listing query, e.g. `coursesOfAction`
    pub list_query: &'static str,
    /// Prefix of the `<prefix>Filtering` and `<prefix>Ordering` input types
    pub type_prefix: &'static str,
    /// Whether listings accept a `types` argument
    pub accepts_types: bool,
    /// Whether listings accept a `search` argument
    pub accepts_search: bool,
    /// Name of the edit mutation, e.g. `stixDomainObjectEdit`
    pub edit_mutation: &'static str,
    /// Name of the edit mutation holding `delete`
    pub delete_mutation: &'static str,
    pub supports_field_patch: bool,
    pub supports_merge: bool,
    /// Whether files can be listed and uploaded on objects of this kind
    pub supports_files: bool,
    /// Whether exports can be pushed for this kind, and the reports and notes about its objects listed
    pub supports_exports: bool,
    pub create: Option<CreatePolicy>,
    pub page_size: u32,
    pub edges: &'static [EdgeType],
}

impl KindPolicy {
    pub fn filtering_type(&self) -> String {
        format!("{}Filtering", self.type_prefix)
    }

    pub fn ordering_type(&self) -> String {
        format!("{}Ordering", self.type_prefix)
    }

    pub fn supports_edge(&self, edge: EdgeType) -> bool {
        self.edges.contains(&edge)
    }

    /// Whether objects of this kind can hold a kill-chain phase.
    ///
    /// `None` means it depends on the concrete type of each object.
    pub fn holds_kill_chain_phases(&self) -> Option<bool> {
        match self.kind {
            EntityKind::StixCoreObject | EntityKind::StixDomainObject => None,
            kind => Some(KILL_CHAIN_TYPES.contains(&kind.as_ref())),
        }
    }
}

const DOMAIN_EDGES: &[EdgeType] = &[
    EdgeType::CreatedBy,
    EdgeType::ObjectMarking,
    EdgeType::ObjectLabel,
    EdgeType::ExternalReference,
    EdgeType::KillChainPhase,
];

const STIX_CORE_OBJECT_EDIT: &str = "stixCoreObjectEdit";
const STIX_DOMAIN_OBJECT_EDIT: &str = "stixDomainObjectEdit";

const fn creates_with(mutation: &'static str, input_type: &'static str) -> CreateVariant {
    CreateVariant {
        when_type: None,
        mutation,
        input_type,
        drops: &[],
        full_projection: false,
    }
}

const fn creates_fully_with(mutation: &'static str, input_type: &'static str) -> CreateVariant {
    CreateVariant {
        full_projection: true,
        ..creates_with(mutation, input_type)
    }
}

const NAME: &[Requirement] = &[Requirement::Field("name")];

const IDENTITY_CREATE: CreatePolicy = CreatePolicy {
    required: &[
        Requirement::Field("type"),
        Requirement::Field("name"),
        Requirement::Present("description"),
    ],
    variants: &[
        CreateVariant {
            when_type: Some("Organization"),
            drops: &["type", "x_opencti_firstname", "x_opencti_lastname"],
            ..creates_with("organizationAdd", "OrganizationAddInput")
        },
        CreateVariant {
            when_type: Some("Individual"),
            drops: &["type", "x_opencti_organization_type", "x_opencti_reliability"],
            ..creates_with("individualAdd", "IndividualAddInput")
        },
        CreateVariant {
            drops: &[
                "x_opencti_organization_type",
                "x_opencti_reliability",
                "x_opencti_firstname",
                "x_opencti_lastname",
            ],
            ..creates_with("identityAdd", "IdentityAddInput")
        },
    ],
};

/// Build the policy of a STIX domain kind
const fn domain(
    kind: EntityKind,
    read_query: &'static str,
    list_query: &'static str,
    type_prefix: &'static str,
    create: Option<CreatePolicy>,
) -> KindPolicy {
    KindPolicy {
        kind,
        read_query,
        list_query,
        type_prefix,
        accepts_types: false,
        accepts_search: true,
        edit_mutation: STIX_DOMAIN_OBJECT_EDIT,
        delete_mutation: STIX_DOMAIN_OBJECT_EDIT,
        supports_field_patch: true,
        supports_merge: true,
        supports_files: true,
        supports_exports: true,
        create,
        page_size: META_OBJECT_PAGE_SIZE,
        edges: DOMAIN_EDGES,
    }
}

/// Build the policy of a meta object kind
const fn meta(
    kind: EntityKind,
    read_query: &'static str,
    list_query: &'static str,
    type_prefix: &'static str,
    edit_mutation: &'static str,
    create: CreatePolicy,
) -> KindPolicy {
    KindPolicy {
        kind,
        read_query,
        list_query,
        type_prefix,
        accepts_types: false,
        accepts_search: false,
        edit_mutation,
        delete_mutation: edit_mutation,
        supports_field_patch: true,
        supports_merge: false,
        supports_files: false,
        supports_exports: false,
        create: Some(create),
        page_size: META_OBJECT_PAGE_SIZE,
        edges: &[],
    }
}

macro_rules! named_domain {
    ($kind:expr, $read:literal, $list:literal, $prefix:literal, $mutation:literal, $input:literal) => {{
        const CREATE: CreatePolicy = CreatePolicy {
            required: NAME,
            variants: &[creates_with($mutation, $input)],
        };
        domain($kind, $read, $list, $prefix, Some(CREATE))
    }};
    ($kind:expr, $read:literal, $list:literal, $prefix:literal, $mutation:literal, $input:literal, $required:expr) => {{
        const CREATE: CreatePolicy = CreatePolicy {
            required: $required,
            variants: &[creates_with($mutation, $input)],
        };
        domain($kind, $read, $list, $prefix, Some(CREATE))
    }};
}

/// The policy record of a kind
pub fn policy(kind: EntityKind) -> KindPolicy {
    match kind {
        EntityKind::StixCoreObject => KindPolicy {
            kind,
            read_query: "stixCoreObject",
            list_query: "stixCoreObjects",
            type_prefix: "StixCoreObjects",
            accepts_types: true,
            accepts_search: true,
            edit_mutation: STIX_CORE_OBJECT_EDIT,
            delete_mutation: "stixEdit",
            supports_field_patch: false,
            supports_merge: true,
            supports_files: true,
            supports_exports: false,
            create: None,
            page_size: STIX_DOMAIN_OBJECT_PAGE_SIZE,
            edges: DOMAIN_EDGES,
        },
        EntityKind::StixDomainObject => KindPolicy {
            accepts_types: true,
            page_size: STIX_DOMAIN_OBJECT_PAGE_SIZE,
            ..domain(
                kind,
                "stixDomainObject",
                "stixDomainObjects",
                "StixDomainObjects",
                None,
            )
        },
        EntityKind::Identity => KindPolicy {
            accepts_types: true,
            ..domain(
                kind,
                "identity",
                "identities",
                "Identities",
                Some(IDENTITY_CREATE),
            )
        },
        EntityKind::Location => {
            const CREATE: CreatePolicy = CreatePolicy {
                required: NAME,
                variants: &[creates_with("locationAdd", "LocationAddInput")],
            };
            KindPolicy {
                accepts_types: true,
                ..domain(kind, "location", "locations", "Locations", Some(CREATE))
            }
        }
        EntityKind::AttackPattern => named_domain!(
            kind,
            "attackPattern",
            "attackPatterns",
            "AttackPatterns",
            "attackPatternAdd",
            "AttackPatternAddInput"
        ),
        EntityKind::Campaign => named_domain!(
            kind,
            "campaign",
            "campaigns",
            "Campaigns",
            "campaignAdd",
            "CampaignAddInput"
        ),
        EntityKind::CourseOfAction => named_domain!(
            kind,
            "courseOfAction",
            "coursesOfAction",
            "CoursesOfAction",
            "courseOfActionAdd",
            "CourseOfActionAddInput"
        ),
        EntityKind::Incident => named_domain!(
            kind,
            "incident",
            "incidents",
            "Incidents",
            "incidentAdd",
            "IncidentAddInput"
        ),
        EntityKind::Indicator => named_domain!(
            kind,
            "indicator",
            "indicators",
            "Indicators",
            "indicatorAdd",
            "IndicatorAddInput",
            &[
                Requirement::Field("name"),
                Requirement::Field("pattern"),
                Requirement::Field("pattern_type"),
            ]
        ),
        EntityKind::Infrastructure => named_domain!(
            kind,
            "infrastructure",
            "infrastructures",
            "Infrastructures",
            "infrastructureAdd",
            "InfrastructureAddInput"
        ),
        EntityKind::IntrusionSet => named_domain!(
            kind,
            "intrusionSet",
            "intrusionSets",
            "IntrusionSets",
            "intrusionSetAdd",
            "IntrusionSetAddInput"
        ),
        EntityKind::Malware => named_domain!(
            kind,
            "malware",
            "malwares",
            "Malwares",
            "malwareAdd",
            "MalwareAddInput"
        ),
        EntityKind::Note => named_domain!(
            kind,
            "note",
            "notes",
            "Notes",
            "noteAdd",
            "NoteAddInput",
            &[Requirement::Field("content")]
        ),
        EntityKind::ObservedData => named_domain!(
            kind,
            "observedData",
            "observedDatas",
            "ObservedDatas",
            "observedDataAdd",
            "ObservedDataAddInput",
            &[
                Requirement::Field("first_observed"),
                Requirement::Field("last_observed"),
                Requirement::Field("number_observed"),
            ]
        ),
        EntityKind::Opinion => named_domain!(
            kind,
            "opinion",
            "opinions",
            "Opinions",
            "opinionAdd",
            "OpinionAddInput",
            &[Requirement::Field("opinion")]
        ),
        EntityKind::Report => named_domain!(
            kind,
            "report",
            "reports",
            "Reports",
            "reportAdd",
            "ReportAddInput",
            &[Requirement::Field("name"), Requirement::Field("published")]
        ),
        EntityKind::ThreatActor => named_domain!(
            kind,
            "threatActor",
            "threatActors",
            "ThreatActors",
            "threatActorAdd",
            "ThreatActorAddInput"
        ),
        EntityKind::Tool => named_domain!(
            kind,
            "tool",
            "tools",
            "Tools",
            "toolAdd",
            "ToolAddInput"
        ),
        EntityKind::Vulnerability => named_domain!(
            kind,
            "vulnerability",
            "vulnerabilities",
            "Vulnerabilities",
            "vulnerabilityAdd",
            "VulnerabilityAddInput"
        ),
        EntityKind::Label => {
            const CREATE: CreatePolicy = CreatePolicy {
                required: &[Requirement::Field("value")],
                variants: &[creates_fully_with("labelAdd", "LabelAddInput")],
            };
            meta(kind, "label", "labels", "Labels", "labelEdit", CREATE)
        }
        EntityKind::MarkingDefinition => {
            const CREATE: CreatePolicy = CreatePolicy {
                required: &[
                    Requirement::Field("definition"),
                    Requirement::Field("definition_type"),
                ],
                variants: &[creates_fully_with(
                    "markingDefinitionAdd",
                    "MarkingDefinitionAddInput",
                )],
            };
            meta(
                kind,
                "markingDefinition",
                "markingDefinitions",
                "MarkingDefinitions",
                "markingDefinitionEdit",
                CREATE,
            )
        }
        EntityKind::KillChainPhase => {
            const CREATE: CreatePolicy = CreatePolicy {
                required: &[
                    Requirement::Field("kill_chain_name"),
                    Requirement::Field("phase_name"),
                ],
                variants: &[creates_fully_with(
                    "killChainPhaseAdd",
                    "KillChainPhaseAddInput",
                )],
            };
            meta(
                kind,
                "killChainPhase",
                "killChainPhases",
                "KillChainPhases",
                "killChainPhaseEdit",
                CREATE,
            )
        }
        EntityKind::ExternalReference => {
            const CREATE: CreatePolicy = CreatePolicy {
                required: &[
                    Requirement::Field("source_name"),
                    Requirement::AnyOf(&["url", "external_id"]),
                ],
                variants: &[creates_fully_with(
                    "externalReferenceAdd",
                    "ExternalReferenceAddInput",
                )],
            };
            KindPolicy {
                supports_files: true,
                ..meta(
                    kind,
                    "externalReference",
                    "externalReferences",
                    "ExternalReferences",
                    "externalReferenceEdit",
                    CREATE,
                )
            }
        }
    }
}
