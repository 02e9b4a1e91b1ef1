//! Marking definitions in STIX: TLP canonicalization and the export ceiling.

use crate::{
    entity::Entity,
    error::ClientError as Error,
    json::get_str,
    repository::options::CreateInput,
    stix2::SPEC_VERSION,
    types::format_date,
};
use serde_json::{json, Map, Value};

/// The definition type of Traffic Light Protocol markings in the knowledge base
pub const TLP: &str = "TLP";

/// The most restrictive marking an export may disclose.
///
/// An object carrying markings of the ceiling's definition type is only exported when one of them has an order lower
/// than or equal to the ceiling's. Markings of other definition types do not restrict the export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkingCeiling {
    pub definition_type: String,
    pub order: i64,
}

impl MarkingCeiling {
    pub fn new(definition_type: &str, order: i64) -> Self {
        Self {
            definition_type: definition_type.to_string(),
            order,
        }
    }

    /// The ceiling set by a marking definition read from the knowledge base
    pub fn from_marking(marking: &Entity) -> Result<Self, Error> {
        let definition_type = marking
            .get_str("definition_type")
            .ok_or_else(|| Error::missing("MarkingCeiling.from_marking", "definition_type"))?;
        let order = marking
            .get("x_opencti_order")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::missing("MarkingCeiling.from_marking", "x_opencti_order"))?;
        Ok(Self::new(definition_type, order))
    }

    /// Whether an object with these markings may be exported
    pub fn allows(&self, markings: &[Entity]) -> bool {
        let orders: Vec<i64> = markings
            .iter()
            .filter(|marking| marking.get_str("definition_type") == Some(self.definition_type.as_str()))
            .map(|marking| marking.get("x_opencti_order").and_then(Value::as_i64).unwrap_or(0))
            .collect();
        orders.is_empty() || orders.iter().any(|order| *order <= self.order)
    }
}

/// Export a marking definition as a STIX object
pub(crate) fn export_marking(marking: &Entity) -> Result<Map<String, Value>, Error> {
    let standard_id = marking
        .get_str("standard_id")
        .ok_or_else(|| Error::missing("Marking-Definition.to_stix2", "standard_id"))?;
    let definition_type = marking.get_str("definition_type").unwrap_or_default();
    let definition = marking.get_str("definition").unwrap_or_default();

    let mut object = Map::new();
    object.insert("type".to_string(), json!("marking-definition"));
    object.insert("spec_version".to_string(), json!(SPEC_VERSION));
    object.insert("id".to_string(), json!(standard_id));
    object.insert("name".to_string(), json!(definition));
    if definition_type.eq_ignore_ascii_case(TLP) {
        let level = definition
            .split_once(':')
            .map_or(definition, |(_, level)| level)
            .to_lowercase();
        object.insert("definition_type".to_string(), json!("tlp"));
        object.insert("definition".to_string(), json!({ "tlp": level }));
    } else {
        object.insert("definition_type".to_string(), json!(definition_type));
        object.insert("definition".to_string(), json!({ definition_type: definition }));
    }
    if let Some(created) = marking.get_str("created") {
        object.insert("created".to_string(), json!(format_date(created)));
    }
    for key in ["x_opencti_order", "x_opencti_color"] {
        if let Some(value) = marking.non_null(key) {
            object.insert(key.to_string(), value.clone());
        }
    }
    if let Some(id) = marking.id() {
        object.insert("x_opencti_id".to_string(), json!(id));
    }
    Ok(object)
}

/// The creation input of a marking definition read from STIX.
///
/// TLP markings are canonicalized to the `TLP` definition type and a `TLP:<LEVEL>` definition. A missing order is
/// taken from the legacy `x_opencti_level` property, or else 0.
pub(crate) fn import_marking(stix: &Map<String, Value>) -> Result<CreateInput, Error> {
    let stix_type = get_str(stix, "definition_type")
        .ok_or_else(|| Error::missing("Marking-Definition.from_stix2", "definition_type"))?;
    let value = stix
        .get("definition")
        .and_then(|definition| definition.get(stix_type))
        .and_then(Value::as_str)
        .or_else(|| get_str(stix, "name"))
        .ok_or_else(|| Error::missing("Marking-Definition.from_stix2", "definition"))?;

    let (definition_type, definition) = if stix_type.eq_ignore_ascii_case(TLP) {
        let level = value.split_once(':').map_or(value, |(_, level)| level);
        (TLP.to_string(), format!("{TLP}:{}", level.to_uppercase()))
    } else {
        (stix_type.to_string(), value.to_string())
    };
    let order = stix
        .get("x_opencti_order")
        .or_else(|| stix.get("x_opencti_level"))
        .filter(|order| !order.is_null())
        .cloned()
        .unwrap_or(json!(0));

    let mut input = CreateInput::new()
        .with("definition_type", definition_type)
        .with("definition", definition)
        .with("x_opencti_order", order);
    for (key, field) in [
        ("id", "stix_id"),
        ("created", "created"),
        ("modified", "modified"),
        ("x_opencti_color", "x_opencti_color"),
        ("x_opencti_stix_ids", "x_opencti_stix_ids"),
    ] {
        if let Some(value) = stix.get(key).filter(|value| !value.is_null()) {
            input.set(field, value.clone());
        }
    }
    Ok(input)
}
