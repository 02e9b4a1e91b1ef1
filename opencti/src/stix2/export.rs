//! Export of knowledge-base entities as STIX 2.1 objects.

use crate::{
    entity::Entity,
    error::ClientError as Error,
    json::is_blank,
    stix2::{
        marking::{export_marking, MarkingCeiling},
        profile_of, Placement, Profile, CUSTOM_PREFIX, SPEC_VERSION,
    },
    types::{format_date, EdgeType, EntityKind},
};
use serde_json::{json, Map, Value};

/// What an export carries besides the object itself
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// The object alone, pointing at its author and markings by reference
    Simple,
    /// The object followed by its author and marking definitions, embedded one level deep
    #[default]
    Full,
}

/// Options of an export
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub mode: ExportMode,
    /// Suppress the export of objects marked above this ceiling
    pub max_marking_definition: Option<MarkingCeiling>,
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: ExportMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn max_marking_definition(mut self, ceiling: MarkingCeiling) -> Self {
        self.max_marking_definition = Some(ceiling);
        self
    }
}

/// An exported object with the objects embedded alongside it
#[derive(Clone, Debug, PartialEq)]
pub struct StixExport {
    pub object: Value,
    pub related: Vec<Value>,
}

impl StixExport {
    /// The STIX id of the exported object
    pub fn id(&self) -> &str {
        self.object.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    /// The exported object followed by the related objects
    pub fn objects(&self) -> Vec<Value> {
        std::iter::once(self.object.clone())
            .chain(self.related.iter().cloned())
            .collect()
    }
}

/// Export an entity as a STIX 2.1 object.
///
/// Returns `Ok(None)` when the markings of the entity exceed the ceiling of the options. Keys of the exported objects
/// are sorted and dates are normalized, so that exporting the same entity twice gives the same output.
pub fn to_stix2(entity: &Entity, options: &ExportOptions) -> Result<Option<StixExport>, Error> {
    let entity_type = entity
        .entity_type()
        .ok_or_else(|| Error::missing("to_stix2", "entity_type"))?;
    let kind = EntityKind::from_entity_type(entity_type).ok_or_else(|| {
        Error::InvalidParameter(format!("{entity_type} objects cannot be exported to STIX"))
    })?;
    let profile = profile_of(kind).ok_or_else(|| Error::unsupported(kind, "to_stix2"))?;

    let markings = entity.edge_targets(EdgeType::ObjectMarking);
    if let Some(ceiling) = &options.max_marking_definition {
        if !ceiling.allows(&markings) {
            log::info!(
                "{entity_type} {{{}}} is marked above {} {}, not exported",
                entity.id().unwrap_or_default(),
                ceiling.definition_type,
                ceiling.order
            );
            return Ok(None);
        }
    }

    if kind == EntityKind::MarkingDefinition {
        return Ok(Some(StixExport {
            object: Value::Object(export_marking(entity)?),
            related: Vec::new(),
        }));
    }

    let object = export_object(entity, &profile, entity_type)?;
    let mut related = Vec::new();
    if options.mode == ExportMode::Full {
        for author in entity.edge_targets(EdgeType::CreatedBy) {
            let author_type = author.entity_type().unwrap_or("Organization");
            let identity = profile_of(EntityKind::Identity)
                .ok_or_else(|| Error::unsupported(EntityKind::Identity, "to_stix2"))?;
            related.push(Value::Object(export_object(&author, &identity, author_type)?));
        }
        for marking in &markings {
            related.push(Value::Object(export_marking(marking)?));
        }
    }

    Ok(Some(StixExport {
        object: Value::Object(object),
        related,
    }))
}

/// Export the attributes and references of one object, without embedding anything
fn export_object(entity: &Entity, profile: &Profile, entity_type: &str) -> Result<Map<String, Value>, Error> {
    let standard_id = entity
        .get_str("standard_id")
        .ok_or_else(|| Error::missing(&format!("{entity_type}.to_stix2"), "standard_id"))?;

    let mut object = Map::new();
    object.insert("id".to_string(), json!(standard_id));
    object.insert("type".to_string(), json!(profile.stix_type));
    object.insert("spec_version".to_string(), json!(SPEC_VERSION));
    if let Some(id) = entity.id() {
        object.insert(format!("{CUSTOM_PREFIX}id"), json!(id));
    }
    for key in ["created", "modified"] {
        if let Some(date) = entity.get_str(key) {
            object.insert(key.to_string(), json!(format_date(date)));
        }
    }
    for key in ["revoked", "confidence", "lang"] {
        if let Some(value) = entity.non_null(key) {
            object.insert(key.to_string(), value.clone());
        }
    }

    for attribute in profile.attributes {
        let Some(value) = entity.get(attribute.field).filter(|value| !is_blank(value)) else {
            continue;
        };
        let value = match (attribute.date, value) {
            (true, Value::String(date)) => json!(format_date(date)),
            _ => value.clone(),
        };
        let key = match attribute.placement {
            Placement::Standard(name) => name.to_string(),
            Placement::Custom(name) => format!("{CUSTOM_PREFIX}{name}"),
        };
        object.insert(key, value);
    }

    match profile.kind {
        EntityKind::Identity if !object.contains_key("identity_class") => {
            object.insert("identity_class".to_string(), json!(identity_class(entity_type)));
        }
        EntityKind::Location => {
            object.insert(format!("{CUSTOM_PREFIX}location_type"), json!(entity_type));
            let key = match entity_type {
                "City" => Some("city"),
                "Country" => Some("country"),
                "Region" => Some("region"),
                _ => None,
            };
            if let (Some(key), Some(name)) = (key, entity.non_null("name")) {
                object.insert(key.to_string(), name.clone());
            }
        }
        _ => {}
    }

    let labels: Vec<Value> = entity
        .edge_targets(EdgeType::ObjectLabel)
        .iter()
        .filter_map(|label| label.non_null("value").cloned())
        .collect();
    let labels = if labels.is_empty() {
        vec![json!(profile.stix_type)]
    } else {
        labels
    };
    object.insert("labels".to_string(), Value::Array(labels));

    if let Some(author) = entity.edge_targets(EdgeType::CreatedBy).first() {
        if let Some(author_id) = author.standard_id() {
            object.insert("created_by_ref".to_string(), json!(author_id));
        }
    }
    insert_list(&mut object, "object_marking_refs", standard_ids(entity, "objectMarking"));
    insert_list(
        &mut object,
        "external_references",
        inline(entity, "externalReferences", &["source_name", "description", "url", "hash", "external_id"]),
    );
    if profile.kill_chain_phases {
        insert_list(
            &mut object,
            "kill_chain_phases",
            inline(entity, "killChainPhases", &["kill_chain_name", "phase_name", "x_opencti_order"]),
        );
    }
    if profile.container {
        insert_list(&mut object, "object_refs", standard_ids(entity, "objects"));
    }
    Ok(object)
}

/// The STIX identity class of an identity sub-type
pub fn identity_class(entity_type: &str) -> &'static str {
    match entity_type {
        "Individual" => "individual",
        "Sector" => "class",
        "System" => "system",
        _ => "organization",
    }
}

fn nodes<'a>(entity: &'a Entity, field: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    entity
        .get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn standard_ids(entity: &Entity, field: &str) -> Vec<Value> {
    nodes(entity, field)
        .filter_map(|node| node.get("standard_id").filter(|id| !id.is_null()).cloned())
        .collect()
}

/// Copy some attributes of the nodes of a list, skipping blank ones
fn inline(entity: &Entity, field: &str, keys: &[&str]) -> Vec<Value> {
    nodes(entity, field)
        .map(|node| {
            let inlined: Map<String, Value> = keys
                .iter()
                .filter_map(|key| {
                    node.get(*key)
                        .filter(|value| !is_blank(value))
                        .map(|value| (key.to_string(), value.clone()))
                })
                .collect();
            Value::Object(inlined)
        })
        .collect()
}

fn insert_list(object: &mut Map<String, Value>, key: &str, values: Vec<Value>) {
    if !values.is_empty() {
        object.insert(key.to_string(), Value::Array(values));
    }
}
