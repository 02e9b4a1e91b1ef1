//! Import of STIX 2.1 objects as creation inputs.

use crate::{
    error::ClientError as Error,
    json::get_str,
    repository::options::CreateInput,
    stix2::{
        convert_markdown, custom_property, marking::import_marking, pick_aliases, profile_for_stix_type, Placement,
        Profile,
    },
    types::EntityKind,
};
use serde_json::{Map, Value};

/// Ids of already imported objects, to link the imported object to
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportExtras {
    pub created_by_id: Option<String>,
    pub object_marking_ids: Vec<String>,
    pub object_label_ids: Vec<String>,
    pub external_references_ids: Vec<String>,
    pub kill_chain_phases_ids: Vec<String>,
    /// Objects contained in an imported report, note, opinion or observed data
    pub object_ids: Vec<String>,
}

impl ImportExtras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_by(mut self, identity_id: &str) -> Self {
        self.created_by_id = Some(identity_id.to_string());
        self
    }

    pub fn markings(mut self, ids: &[&str]) -> Self {
        self.object_marking_ids = to_strings(ids);
        self
    }

    pub fn labels(mut self, ids: &[&str]) -> Self {
        self.object_label_ids = to_strings(ids);
        self
    }

    pub fn external_references(mut self, ids: &[&str]) -> Self {
        self.external_references_ids = to_strings(ids);
        self
    }

    pub fn kill_chain_phases(mut self, ids: &[&str]) -> Self {
        self.kill_chain_phases_ids = to_strings(ids);
        self
    }

    pub fn objects(mut self, ids: &[&str]) -> Self {
        self.object_ids = to_strings(ids);
        self
    }
}

fn to_strings(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

/// The kind and creation input read from a STIX object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StixImport {
    pub kind: EntityKind,
    pub input: CreateInput,
}

/// Read a STIX object as the creation input of the matching kind.
///
/// Nothing is sent to the remote store: pass the input to
/// [`Repository::create`](crate::repository::Repository::create) to import it.
pub fn from_stix2(stix: &Value, extras: &ImportExtras) -> Result<StixImport, Error> {
    let stix = stix
        .as_object()
        .ok_or_else(|| Error::InvalidParameter("a STIX object must be a JSON object".to_string()))?;
    let stix_type = get_str(stix, "type").ok_or_else(|| Error::missing("from_stix2", "type"))?;
    let profile = profile_for_stix_type(stix_type)
        .ok_or_else(|| Error::InvalidParameter(format!("STIX objects of type {stix_type} cannot be imported")))?;

    let input = match profile.kind {
        EntityKind::MarkingDefinition => import_marking(stix)?,
        _ => import_object(stix, &profile, extras)?,
    };
    Ok(StixImport {
        kind: profile.kind,
        input,
    })
}

fn import_object(stix: &Map<String, Value>, profile: &Profile, extras: &ImportExtras) -> Result<CreateInput, Error> {
    let mut input = CreateInput::new();
    for (key, field) in [
        ("id", "stix_id"),
        ("created", "created"),
        ("modified", "modified"),
        ("revoked", "revoked"),
        ("confidence", "confidence"),
        ("lang", "lang"),
        ("x_opencti_stix_ids", "x_opencti_stix_ids"),
    ] {
        if let Some(value) = stix.get(key).filter(|value| !value.is_null()) {
            input.set(field, value.clone());
        }
    }

    for attribute in profile.attributes {
        // Derived from the identity type by the remote store
        if Some(attribute.field) == profile.alias_field || attribute.field == "identity_class" {
            continue;
        }
        let value = match attribute.placement {
            Placement::Standard(name) => stix.get(name).filter(|value| !value.is_null()),
            Placement::Custom(name) => custom_property(stix, name),
        };
        match value {
            Some(Value::String(text)) if matches!(attribute.field, "description" | "contact_information") => {
                input.set(attribute.field, convert_markdown(text))
            }
            Some(value) => input.set(attribute.field, value.clone()),
            None => {}
        }
    }
    if let Some(alias_field) = profile.alias_field {
        if let Some(aliases) = pick_aliases(stix).or_else(|| custom_property(stix, "aliases").cloned()) {
            input.set(alias_field, aliases);
        }
    }

    match profile.kind {
        EntityKind::Identity => {
            input.set("type", identity_type(get_str(stix, "identity_class")));
            if input.get("description").is_none() {
                input.set("description", "");
            }
        }
        EntityKind::Location => {
            let name = ["name", "city", "country", "region"]
                .iter()
                .find_map(|key| get_str(stix, key))
                .ok_or_else(|| Error::missing("Location.from_stix2", "name"))?;
            input.set("name", name);
            input.set("type", location_type(stix));
            if input.get("description").is_none() {
                input.set("description", "");
            }
        }
        _ => {}
    }

    if let Some(created_by_id) = &extras.created_by_id {
        input.set("createdBy", created_by_id.as_str());
    }
    set_ids(&mut input, "objectMarking", &extras.object_marking_ids);
    set_ids(&mut input, "objectLabel", &extras.object_label_ids);
    set_ids(&mut input, "externalReferences", &extras.external_references_ids);
    if profile.kill_chain_phases {
        set_ids(&mut input, "killChainPhases", &extras.kill_chain_phases_ids);
    }
    if profile.container {
        set_ids(&mut input, "objects", &extras.object_ids);
    }
    Ok(input)
}

fn set_ids(input: &mut CreateInput, key: &str, ids: &[String]) {
    if !ids.is_empty() {
        input.set(key, ids.to_vec());
    }
}

/// The identity sub-type of a STIX identity class
pub fn identity_type(identity_class: Option<&str>) -> &'static str {
    match identity_class {
        Some("individual") => "Individual",
        Some("class") => "Sector",
        Some("system") => "System",
        _ => "Organization",
    }
}

/// The location sub-type of a STIX location: the OpenCTI location type if present, else the first of `city`,
/// `country` and `region` present, else `Position`
pub fn location_type(stix: &Map<String, Value>) -> String {
    if let Some(location_type) = custom_property(stix, "location_type").and_then(Value::as_str) {
        return location_type.to_string();
    }
    let location_type = [("city", "City"), ("country", "Country"), ("region", "Region")]
        .iter()
        .find(|(key, _)| stix.get(*key).is_some_and(|value| !value.is_null()))
        .map_or("Position", |(_, location_type)| *location_type);
    location_type.to_string()
}
