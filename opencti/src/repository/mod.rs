//! The generic object repository.
//!
//! A single [`Repository`] serves every kind: it renders the GraphQL documents of each operation from the kind's
//! [`KindPolicy`](crate::registry::KindPolicy) and projection, sends them through its [`Transport`], and normalizes the
//! responses into [`Entity`] records.

pub mod filters;
pub mod options;

use crate::{
    entity::{Entity, ImportedFile, Page},
    error::ClientError as Error,
    json::{is_blank, take_field},
    registry::{
        default_fields, defaults::import_files, graphql_type_name, policy, FieldSpec, KindPolicy,
        Requirement, MINIMAL_FIELDS,
    },
    relationships::RelationshipEditor,
    transport::{GraphqlRequest, Transport, Upload},
    types::EntityKind,
};
use filters::Filter;
use options::{CreateInput, FieldEdit, ListOptions, ReadOptions};
use serde_json::{Map, Value};

const PAGE_INFO: &str = "pageInfo { startCursor endCursor hasNextPage hasPreviousPage globalCount }";

/// How to find an object by STIX id, name or alias
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameLookup {
    pub stix_id: Option<String>,
    pub name: Option<String>,
    pub aliases: Vec<String>,
    /// The field holding aliases for this kind, `aliases` by default
    pub alias_field: String,
    pub types: Option<Vec<String>>,
    pub field_spec: Option<FieldSpec>,
}

impl Default for NameLookup {
    fn default() -> Self {
        Self {
            stix_id: None,
            name: None,
            aliases: Vec::new(),
            alias_field: "aliases".to_string(),
            types: None,
            field_spec: None,
        }
    }
}

impl NameLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stix_id(mut self, stix_id: &str) -> Self {
        self.stix_id = Some(stix_id.to_string());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|alias| alias.to_string()).collect();
        self
    }

    pub fn alias_field(mut self, alias_field: &str) -> Self {
        self.alias_field = alias_field.to_string();
        self
    }
}

/// Operations shared by every kind of the knowledge base.
pub struct Repository<T: Transport> {
    transport: T,
}

impl<T: Transport> Repository<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The editor of the meta relationships of objects
    pub fn relationships(&self) -> RelationshipEditor<'_, T> {
        RelationshipEditor::new(self)
    }

    /// Send a request and return its `data` object
    pub(crate) fn execute(&self, request: GraphqlRequest) -> Result<Value, Error> {
        log::debug!("GraphQL document: {}", request.query);
        self.transport.execute(request)
    }

    /// List objects of a kind.
    ///
    /// With `fetch_all`, every page is requested in sequence using the page size of the kind, following
    /// `hasNextPage` and `endCursor`, and the pages are concatenated in the order the remote store returned them.
    pub fn list(&self, kind: EntityKind, options: &ListOptions) -> Result<Page, Error> {
        let policy = policy(kind);
        let first = match options.page_size {
            Some(0) => {
                return Err(Error::InvalidParameter(
                    "page_size must be positive".to_string(),
                ))
            }
            Some(_) if options.fetch_all => policy.page_size,
            Some(page_size) => page_size,
            None => policy.page_size,
        };
        if options.types.is_some() && !policy.accepts_types {
            return Err(Error::InvalidParameter(format!(
                "{kind} listings do not accept types"
            )));
        }
        if options.search.is_some() && !policy.accepts_search {
            return Err(Error::InvalidParameter(format!(
                "{kind} listings do not accept a search keyword"
            )));
        }

        let filters = match &options.filters {
            Some(filters) => {
                serde_json::to_value(filters).map_err(|e| Error::SerializationError(e.to_string()))?
            }
            None => Value::Null,
        };
        log::info!("Listing {kind} objects with filters {filters}");

        let query = list_document(&policy, options.field_spec.as_ref());
        let mut after = options.after.clone();
        let mut page = self.list_page(&policy, &query, options, &filters, first, after.clone())?;
        if !options.fetch_all {
            return Ok(page);
        }

        while page.page_info.has_next_page {
            let cursor = page.page_info.end_cursor.clone().ok_or_else(|| {
                Error::UnexpectedResponse("next page announced without an end cursor".to_string())
            })?;
            if after.as_deref() == Some(cursor.as_str()) {
                return Err(Error::UnexpectedResponse(format!(
                    "pagination did not advance past cursor {cursor}"
                )));
            }
            log::info!("Listing {kind} objects after {cursor}");
            let next = self.list_page(&policy, &query, options, &filters, first, Some(cursor.clone()))?;
            after = Some(cursor);
            page.entities.extend(next.entities);
            page.page_info = next.page_info;
        }
        Ok(page)
    }

    fn list_page(
        &self,
        policy: &KindPolicy,
        query: &str,
        options: &ListOptions,
        filters: &Value,
        first: u32,
        after: Option<String>,
    ) -> Result<Page, Error> {
        let mut request = GraphqlRequest::new(query)
            .variable("filters", filters.clone())
            .variable("first", first)
            .variable("after", after)
            .variable("orderBy", options.order_by.clone())
            .variable(
                "orderMode",
                options.order_mode.map(|mode| mode.as_ref().to_string()),
            );
        if policy.accepts_types {
            request = request.variable("types", options.types.clone());
        }
        if policy.accepts_search {
            request = request.variable("search", options.search.clone());
        }
        let data = self.execute(request)?;
        Page::from_graphql(take_field(data, policy.list_query)?)
    }

    /// Read a single object, by id or else as the first result of a filtered listing.
    ///
    /// An object that does not exist is `Ok(None)`. Without an id or filters, nothing is sent and the call fails with
    /// `MissingParameter`.
    pub fn read(&self, kind: EntityKind, options: &ReadOptions) -> Result<Option<Entity>, Error> {
        let policy = policy(kind);
        if let Some(id) = options.id.as_deref().filter(|id| !id.is_empty()) {
            log::info!("Reading {kind} {{{id}}}");
            let projection = options
                .field_spec
                .clone()
                .unwrap_or_else(|| default_fields(kind));
            let query = format!(
                "query {}($id: String!) {{ {}(id: $id) {{ {} }} }}",
                graphql_type_name(kind.as_ref()),
                policy.read_query,
                projection.render()
            );
            let data = self.execute(GraphqlRequest::new(query).variable("id", id))?;
            return Entity::from_optional(take_field(data, policy.read_query)?);
        }

        if let Some(filters) = &options.filters {
            let list_options = ListOptions {
                types: options.types.clone(),
                filters: Some(filters.clone()),
                page_size: Some(1),
                field_spec: options.field_spec.clone(),
                ..ListOptions::default()
            };
            let page = self.list(kind, &list_options)?;
            return Ok(page.entities.into_iter().next());
        }

        Err(Error::missing(&operation(kind, "read"), "id or filters"))
    }

    /// Create an object.
    ///
    /// Every required attribute of the kind is checked before anything is sent; all the missing ones are reported in
    /// a single `MissingParameter` error.
    pub fn create(&self, kind: EntityKind, input: CreateInput) -> Result<Entity, Error> {
        let policy = policy(kind);
        let create = policy
            .create
            .ok_or_else(|| Error::unsupported(kind, "create"))?;

        let missing: Vec<String> = create
            .required
            .iter()
            .filter(|requirement| !is_present(&input, requirement))
            .map(Requirement::describe)
            .collect();
        if !missing.is_empty() {
            return Err(Error::missing(
                &operation(kind, "create"),
                &missing.join(", "),
            ));
        }

        let type_ = input.get_str("type");
        let variant = create.variant(type_).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "no creation mutation for {kind} of type {}",
                type_.unwrap_or("none")
            ))
        })?;

        let mut attributes: Map<String, Value> = input
            .attributes
            .into_iter()
            .filter(|(key, value)| !value.is_null() && !variant.drops.contains(&key.as_str()))
            .collect();
        if input.update {
            attributes.insert("update".to_string(), Value::Bool(true));
        }

        let projection = if variant.full_projection {
            default_fields(kind)
        } else {
            FieldSpec::new().fields(MINIMAL_FIELDS)
        };
        let label = attributes
            .get("name")
            .or_else(|| attributes.get("value"))
            .or_else(|| attributes.get("definition"))
            .or_else(|| attributes.get("phase_name"))
            .or_else(|| attributes.get("source_name"))
            .map(|label| label.to_string())
            .unwrap_or_default();
        log::info!("Creating {kind} {label} with {}", variant.mutation);

        let query = format!(
            "mutation {}($input: {}) {{ {}(input: $input) {{ {} }} }}",
            operation_name(variant.mutation),
            variant.input_type,
            variant.mutation,
            projection.render()
        );
        let data = self.execute(GraphqlRequest::new(query).variable("input", attributes))?;
        match Entity::from_optional(take_field(data, variant.mutation)?)? {
            Some(entity) => Ok(entity),
            None => Err(Error::UnexpectedResponse(format!(
                "{} returned no object",
                variant.mutation
            ))),
        }
    }

    /// Apply an ordered list of field edits to an object
    pub fn update_field(&self, kind: EntityKind, id: &str, edits: &[FieldEdit]) -> Result<Entity, Error> {
        let policy = policy(kind);
        if !policy.supports_field_patch {
            return Err(Error::unsupported(kind, "update_field"));
        }
        check_ids(kind, "update_field", id, !edits.is_empty(), "id and input")?;
        log::info!("Updating {kind} {{{id}}}");

        let query = format!(
            "mutation {}($id: ID!, $input: [EditInput]!) {{ {}(id: $id) {{ fieldPatch(input: $input) {{ {} }} }} }}",
            operation_name(policy.edit_mutation),
            policy.edit_mutation,
            MINIMAL_FIELDS.join(" ")
        );
        let input = serde_json::to_value(edits).map_err(|e| Error::SerializationError(e.to_string()))?;
        let data = self.execute(
            GraphqlRequest::new(query)
                .variable("id", id)
                .variable("input", input),
        )?;
        let patched = take_field(take_field(data, policy.edit_mutation)?, "fieldPatch")?;
        Entity::from_optional(patched)?
            .ok_or_else(|| Error::UnexpectedResponse(format!("no object patched for {id}")))
    }

    /// Delete an object. Deletion is terminal.
    pub fn delete(&self, kind: EntityKind, id: &str) -> Result<(), Error> {
        let policy = policy(kind);
        check_ids(kind, "delete", id, true, "id")?;
        log::info!("Deleting {kind} {{{id}}}");
        let query = format!(
            "mutation {}($id: ID!) {{ {}(id: $id) {{ delete }} }}",
            operation_name(policy.delete_mutation),
            policy.delete_mutation
        );
        self.execute(GraphqlRequest::new(query).variable("id", id))?;
        Ok(())
    }

    /// Merge other objects into an object, which absorbs them
    pub fn merge(&self, kind: EntityKind, id: &str, absorbed_ids: &[&str]) -> Result<Entity, Error> {
        let policy = policy(kind);
        if !policy.supports_merge {
            return Err(Error::unsupported(kind, "merge"));
        }
        check_ids(kind, "merge", id, !absorbed_ids.is_empty(), "id and object_ids")?;
        log::info!("Merging {kind} {{{id}}} with {{{}}}", absorbed_ids.join(","));
        let query = "mutation StixCoreObjectEdit($id: ID!, $stixCoreObjectsIds: [String]!) { \
            stixCoreObjectEdit(id: $id) { merge(stixCoreObjectsIds: $stixCoreObjectsIds) { id standard_id entity_type } } }";
        let data = self.execute(
            GraphqlRequest::new(query)
                .variable("id", id)
                .variable("stixCoreObjectsIds", absorbed_ids.to_vec()),
        )?;
        let merged = take_field(take_field(data, "stixCoreObjectEdit")?, "merge")?;
        Entity::from_optional(merged)?
            .ok_or_else(|| Error::UnexpectedResponse(format!("no object merged into {id}")))
    }

    /// List the files imported into an object
    pub fn list_files(&self, kind: EntityKind, id: &str) -> Result<Vec<ImportedFile>, Error> {
        let policy = policy(kind);
        if !policy.supports_files {
            return Err(Error::unsupported(kind, "list_files"));
        }
        check_ids(kind, "list_files", id, true, "id")?;
        log::info!("Listing files of {kind} {{{id}}}");
        let query = format!(
            "query {}($id: String!) {{ {}(id: $id) {{ {} }} }}",
            graphql_type_name(kind.as_ref()),
            policy.read_query,
            import_files().render()
        );
        let data = self.execute(GraphqlRequest::new(query).variable("id", id))?;
        let Some(entity) = Entity::from_optional(take_field(data, policy.read_query)?)? else {
            log::warn!("Cannot list files, {kind} {{{id}}} not found");
            return Ok(Vec::new());
        };
        match entity.get("importFiles") {
            Some(Value::Array(files)) => files.iter().map(ImportedFile::from_node).collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// Upload a file into an object. The upload is consumed whether or not the call succeeds.
    pub fn add_file(&self, kind: EntityKind, id: &str, upload: Upload) -> Result<Entity, Error> {
        let policy = policy(kind);
        if !policy.supports_files {
            return Err(Error::unsupported(kind, "add_file"));
        }
        check_ids(kind, "add_file", id, !upload.file_name.is_empty(), "id and file_name")?;
        log::info!("Uploading a file {{{}}} in {kind} {{{id}}}", upload.file_name);
        let query = format!(
            "mutation {}($id: ID!, $file: Upload!) {{ {}(id: $id) {{ importPush(file: $file) {{ id name }} }} }}",
            operation_name(policy.edit_mutation),
            policy.edit_mutation
        );
        let data = self.execute(GraphqlRequest::new(query).variable("id", id).upload(upload))?;
        let pushed = take_field(take_field(data, policy.edit_mutation)?, "importPush")?;
        Entity::from_optional(pushed)?
            .ok_or_else(|| Error::UnexpectedResponse(format!("no file imported into {id}")))
    }

    /// Push the export of a listing of objects of `entity_type`, described by the serialized `list_filters`
    pub fn push_list_export(&self, entity_type: &str, upload: Upload, list_filters: Option<&str>) -> Result<(), Error> {
        if entity_type.is_empty() || upload.file_name.is_empty() {
            return Err(Error::missing(
                "Stix-Domain-Object.push_list_export",
                "entity_type and file_name",
            ));
        }
        let kind = EntityKind::from_entity_type(entity_type)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown entity type {entity_type}")))?;
        if !policy(kind).supports_exports {
            return Err(Error::unsupported(kind, "push_list_export"));
        }
        log::info!("Pushing the export {{{}}} of {entity_type} objects", upload.file_name);
        let query = "mutation StixDomainObjectsExportPush($type: String!, $file: Upload!, $listFilters: String) { \
            stixDomainObjectsExportPush(type: $type, file: $file, listFilters: $listFilters) }";
        let data = self.execute(
            GraphqlRequest::new(query)
                .variable("type", entity_type)
                .variable("listFilters", list_filters)
                .upload(upload),
        )?;
        take_field(data, "stixDomainObjectsExportPush")?;
        Ok(())
    }

    /// Push the export of a single object
    pub fn push_entity_export(&self, kind: EntityKind, id: &str, upload: Upload) -> Result<(), Error> {
        let policy = policy(kind);
        if !policy.supports_exports {
            return Err(Error::unsupported(kind, "push_entity_export"));
        }
        check_ids(kind, "push_entity_export", id, !upload.file_name.is_empty(), "id and file_name")?;
        log::info!("Pushing the export {{{}}} of {kind} {{{id}}}", upload.file_name);
        let query = format!(
            "mutation {}($id: ID!, $file: Upload!) {{ {}(id: $id) {{ exportPush(file: $file) }} }}",
            operation_name(policy.edit_mutation),
            policy.edit_mutation
        );
        let data = self.execute(GraphqlRequest::new(query).variable("id", id).upload(upload))?;
        take_field(take_field(data, policy.edit_mutation)?, "exportPush")?;
        Ok(())
    }

    /// The reports containing an object
    pub fn reports(&self, kind: EntityKind, id: &str) -> Result<Vec<Entity>, Error> {
        self.containers(kind, id, EntityKind::Report, "reports")
    }

    /// The notes about an object
    pub fn notes(&self, kind: EntityKind, id: &str) -> Result<Vec<Entity>, Error> {
        self.containers(kind, id, EntityKind::Note, "notes")
    }

    fn containers(&self, kind: EntityKind, id: &str, container: EntityKind, field: &str) -> Result<Vec<Entity>, Error> {
        let policy = policy(kind);
        if !policy.supports_exports {
            return Err(Error::unsupported(kind, field));
        }
        check_ids(kind, field, id, true, "id")?;
        log::info!("Getting the {field} of {kind} {{{id}}}");
        let query = format!(
            "query {}($id: String!) {{ {}(id: $id) {{ {} }} }}",
            graphql_type_name(kind.as_ref()),
            policy.read_query,
            FieldSpec::new()
                .connection(field, default_fields(container))
                .render()
        );
        let data = self.execute(GraphqlRequest::new(query).variable("id", id))?;
        let Some(entity) = Entity::from_optional(take_field(data, policy.read_query)?)? else {
            log::warn!("Cannot get the {field}, {kind} {{{id}}} not found");
            return Ok(Vec::new());
        };
        Ok(entity
            .get(field)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|node| node.as_object().cloned().map(Entity::from_map))
            .collect())
    }

    /// Find an object by STIX id, then by name, then by the alias field for the name and each alias in turn
    pub fn get_by_stix_id_or_name(&self, kind: EntityKind, lookup: &NameLookup) -> Result<Option<Entity>, Error> {
        if lookup.stix_id.is_none() && lookup.name.is_none() {
            return Err(Error::missing(
                &operation(kind, "get_by_stix_id_or_name"),
                "stix_id or name",
            ));
        }

        let read_filtered = |key: &str, value: &str| {
            let options = ReadOptions {
                types: lookup.types.clone(),
                filters: Some(vec![Filter::eq(key, value)]),
                field_spec: lookup.field_spec.clone(),
                ..ReadOptions::default()
            };
            self.read(kind, &options)
        };

        if let Some(stix_id) = &lookup.stix_id {
            let options = ReadOptions {
                field_spec: lookup.field_spec.clone(),
                ..ReadOptions::by_id(stix_id)
            };
            if let Some(found) = self.read(kind, &options)? {
                return Ok(Some(found));
            }
        }

        let Some(name) = &lookup.name else {
            return Ok(None);
        };
        if let Some(found) = read_filtered("name", name)? {
            return Ok(Some(found));
        }
        if let Some(found) = read_filtered(&lookup.alias_field, name)? {
            return Ok(Some(found));
        }
        for alias in &lookup.aliases {
            if let Some(found) = read_filtered(&lookup.alias_field, alias)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

/// Render the listing document of a kind
fn list_document(policy: &KindPolicy, field_spec: Option<&FieldSpec>) -> String {
    let mut declarations = Vec::new();
    let mut arguments = Vec::new();
    if policy.accepts_types {
        declarations.push("$types: [String]".to_string());
        arguments.push("types: $types");
    }
    declarations.push(format!("$filters: [{}]", policy.filtering_type()));
    arguments.push("filters: $filters");
    if policy.accepts_search {
        declarations.push("$search: String".to_string());
        arguments.push("search: $search");
    }
    declarations.push("$first: Int".to_string());
    declarations.push("$after: ID".to_string());
    declarations.push(format!("$orderBy: {}", policy.ordering_type()));
    declarations.push("$orderMode: OrderingMode".to_string());
    arguments.extend(["first: $first", "after: $after", "orderBy: $orderBy", "orderMode: $orderMode"]);

    let projection = field_spec
        .cloned()
        .unwrap_or_else(|| default_fields(policy.kind));
    format!(
        "query {}({}) {{ {}({}) {{ edges {{ node {{ {} }} }} {PAGE_INFO} }} }}",
        policy.type_prefix,
        declarations.join(", "),
        policy.list_query,
        arguments.join(", "),
        projection.render()
    )
}

fn is_present(input: &CreateInput, requirement: &Requirement) -> bool {
    match requirement {
        Requirement::Field(name) => input.get(name).is_some_and(|value| !is_blank(value)),
        Requirement::Present(name) => input.get(name).is_some_and(|value| !value.is_null()),
        Requirement::AnyOf(names) => names
            .iter()
            .any(|name| input.get(name).is_some_and(|value| !is_blank(value))),
    }
}

/// Fail with `MissingParameter` when the id is empty or another mandatory argument is absent
fn check_ids(kind: EntityKind, op: &str, id: &str, others_present: bool, parameters: &str) -> Result<(), Error> {
    if id.is_empty() || !others_present {
        return Err(Error::missing(&operation(kind, op), parameters));
    }
    Ok(())
}

fn operation(kind: EntityKind, op: &str) -> String {
    format!("{kind}.{op}")
}

/// The GraphQL operation name of a root field, e.g. `labelEdit` -> `LabelEdit`
fn operation_name(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
