//! Editing the meta relationships of objects: authors, markings, labels, external references and kill-chain phases.
//!
//! Edges are only changed through explicit add and remove calls. Adding a many-edge that already exists is a successful
//! no-op; removing is sent unconditionally. Replacing the author of an object takes two sequential calls, a removal then
//! an addition, and is not atomic: if the second call fails the object is left without an author.

use crate::{
    entity::Entity,
    error::ClientError as Error,
    registry::{graphql_type_name, policy, FieldSpec, KindPolicy, KILL_CHAIN_TYPES},
    repository::{
        filters::Filter,
        options::{CreateInput, ReadOptions},
        Repository,
    },
    transport::{GraphqlRequest, Transport},
    types::{Cardinality, EdgeType, EntityKind},
};

/// Adds and removes typed edges on the objects of a repository
pub struct RelationshipEditor<'r, T: Transport> {
    repository: &'r Repository<T>,
}

impl<'r, T: Transport> RelationshipEditor<'r, T> {
    pub fn new(repository: &'r Repository<T>) -> Self {
        Self { repository }
    }

    /// Link a source object to a target through an edge.
    ///
    /// Returns `false` without any change when the source does not exist, or when a kill-chain phase is added to an
    /// object that cannot hold one.
    pub fn add_edge(&self, kind: EntityKind, source_id: &str, edge: EdgeType, target_id: &str) -> Result<bool, Error> {
        let policy = self.edge_policy(kind, edge, source_id, target_id, "add_edge")?;
        if edge == EdgeType::KillChainPhase && policy.holds_kill_chain_phases() == Some(false) {
            log::warn!("{kind} objects cannot hold kill-chain phases, {{{target_id}}} not added to {{{source_id}}}");
            return Ok(false);
        }

        let Some(source) = self.read_edge(&policy, source_id, edge)? else {
            log::error!("Cannot add {edge} {{{target_id}}}, {kind} {{{source_id}}} not found");
            return Ok(false);
        };
        if edge == EdgeType::KillChainPhase {
            let entity_type = source.entity_type().unwrap_or_default();
            if !KILL_CHAIN_TYPES.contains(&entity_type) {
                log::warn!("{entity_type} objects cannot hold kill-chain phases, {{{target_id}}} not added to {{{source_id}}}");
                return Ok(false);
            }
        }

        let current = source.edge_ids(edge);
        if current.iter().any(|id| id == target_id) {
            log::debug!("{edge} {{{target_id}}} already set on {{{source_id}}}");
            return Ok(true);
        }
        if edge.cardinality() == Cardinality::One {
            for previous in &current {
                self.relation_delete(&policy, source_id, edge, previous)?;
            }
        }

        log::info!("Adding {edge} {{{target_id}}} to {kind} {{{source_id}}}");
        self.relation_add(&policy, source_id, edge, target_id)?;
        Ok(true)
    }

    /// Unlink a source object from a target. The removal is sent whether or not the edge exists.
    pub fn remove_edge(&self, kind: EntityKind, source_id: &str, edge: EdgeType, target_id: &str) -> Result<bool, Error> {
        let policy = self.edge_policy(kind, edge, source_id, target_id, "remove_edge")?;
        log::info!("Removing {edge} {{{target_id}}} from {kind} {{{source_id}}}");
        self.relation_delete(&policy, source_id, edge, target_id)?;
        Ok(true)
    }

    /// Replace the author of an object, or clear it with `None`
    pub fn update_created_by(&self, kind: EntityKind, source_id: &str, identity_id: Option<&str>) -> Result<bool, Error> {
        match identity_id {
            Some(identity_id) => self.add_edge(kind, source_id, EdgeType::CreatedBy, identity_id),
            None => {
                let policy = self.edge_policy(kind, EdgeType::CreatedBy, source_id, "none", "update_created_by")?;
                let Some(source) = self.read_edge(&policy, source_id, EdgeType::CreatedBy)? else {
                    log::error!("Cannot clear the author, {kind} {{{source_id}}} not found");
                    return Ok(false);
                };
                for previous in source.edge_ids(EdgeType::CreatedBy) {
                    log::info!("Removing author {{{previous}}} from {kind} {{{source_id}}}");
                    self.relation_delete(&policy, source_id, EdgeType::CreatedBy, &previous)?;
                }
                Ok(true)
            }
        }
    }

    /// Label an object by label value, creating the label if it does not exist yet
    pub fn add_label_by_name(&self, kind: EntityKind, source_id: &str, label_name: &str) -> Result<bool, Error> {
        let label = match self.find_label(label_name)? {
            Some(label) => label,
            None => self
                .repository
                .create(EntityKind::Label, CreateInput::new().with("value", label_name))?,
        };
        let label_id = label
            .id()
            .ok_or_else(|| Error::UnexpectedResponse(format!("label {label_name} has no id")))?;
        self.add_edge(kind, source_id, EdgeType::ObjectLabel, label_id)
    }

    /// Remove a label from an object by label value. Returns `false` if no such label exists.
    pub fn remove_label_by_name(&self, kind: EntityKind, source_id: &str, label_name: &str) -> Result<bool, Error> {
        let Some(label) = self.find_label(label_name)? else {
            log::warn!("Label {label_name} does not exist, nothing to remove from {{{source_id}}}");
            return Ok(false);
        };
        match label.id() {
            Some(label_id) => self.remove_edge(kind, source_id, EdgeType::ObjectLabel, label_id),
            None => Err(Error::UnexpectedResponse(format!("label {label_name} has no id"))),
        }
    }

    fn find_label(&self, label_name: &str) -> Result<Option<Entity>, Error> {
        if label_name.is_empty() {
            return Err(Error::missing("Label.read", "label_name"));
        }
        self.repository.read(
            EntityKind::Label,
            &ReadOptions::by_filters(vec![Filter::eq("value", label_name)]),
        )
    }

    fn edge_policy(
        &self,
        kind: EntityKind,
        edge: EdgeType,
        source_id: &str,
        target_id: &str,
        op: &str,
    ) -> Result<KindPolicy, Error> {
        let policy = policy(kind);
        if !policy.supports_edge(edge) {
            return Err(Error::unsupported(kind, &format!("{op} {edge}")));
        }
        if source_id.is_empty() || target_id.is_empty() {
            return Err(Error::missing(&format!("{kind}.{op}"), "id and target id"));
        }
        Ok(policy)
    }

    /// Read the source object with the current targets of an edge
    fn read_edge(&self, policy: &KindPolicy, source_id: &str, edge: EdgeType) -> Result<Option<Entity>, Error> {
        let id = FieldSpec::new().field("id");
        let targets = match edge.cardinality() {
            Cardinality::One => FieldSpec::new().object(edge.field_name(), id),
            Cardinality::Many => FieldSpec::new().connection(edge.field_name(), id),
        };
        let mut projection = FieldSpec::new().fields(&["id", "entity_type"]);
        projection = match (edge, policy.holds_kill_chain_phases()) {
            // Only some concrete types expose kill-chain phases
            (EdgeType::KillChainPhase, None) => KILL_CHAIN_TYPES.iter().fold(projection, |projection, entity_type| {
                projection.on(&graphql_type_name(entity_type), targets.clone())
            }),
            _ => projection.merge(targets),
        };
        self.repository
            .read(policy.kind, &ReadOptions::by_id(source_id).field_spec(projection))
    }

    fn relation_add(&self, policy: &KindPolicy, source_id: &str, edge: EdgeType, target_id: &str) -> Result<(), Error> {
        let query = format!(
            "mutation StixMetaRelationshipAdd($id: ID!, $input: StixMetaRelationshipAddInput) {{ {}(id: $id) {{ relationAdd(input: $input) {{ id }} }} }}",
            policy.edit_mutation
        );
        let input = serde_json::json!({"toId": target_id, "relationship_type": edge.as_ref()});
        self.repository.execute(
            GraphqlRequest::new(query)
                .variable("id", source_id)
                .variable("input", input),
        )?;
        Ok(())
    }

    fn relation_delete(&self, policy: &KindPolicy, source_id: &str, edge: EdgeType, target_id: &str) -> Result<(), Error> {
        let query = format!(
            "mutation StixMetaRelationshipDelete($id: ID!, $toId: String!, $relationship_type: String!) {{ {}(id: $id) {{ relationDelete(toId: $toId, relationship_type: $relationship_type) {{ id }} }} }}",
            policy.edit_mutation
        );
        self.repository.execute(
            GraphqlRequest::new(query)
                .variable("id", source_id)
                .variable("toId", target_id)
                .variable("relationship_type", edge.as_ref()),
        )?;
        Ok(())
    }
}
