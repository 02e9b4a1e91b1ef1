//! The client façade: one entry point per knowledge-base kind.
//!
//! ```no_run
//! use opencti::{client::OpenCtiClient, config::ClientConfig, repository::options::ListOptions};
//!
//! let client = OpenCtiClient::connect(&ClientConfig::new("https://opencti.example.com", "token"))?;
//! let labels = client.label().list(&ListOptions::new().fetch_all())?;
//! # Ok::<(), opencti::error::ClientError>(())
//! ```

use crate::{
    config::ClientConfig,
    entity::{Entity, ImportedFile, Page},
    error::ClientError as Error,
    relationships::RelationshipEditor,
    repository::{
        options::{CreateInput, FieldEdit, ListOptions, ReadOptions},
        NameLookup, Repository,
    },
    stix2::{self, ExportOptions, ImportExtras, StixExport},
    transport::{HttpTransport, Transport, Upload},
    types::{EdgeType, EntityKind},
};
use serde_json::Value;

/// A client of an OpenCTI knowledge base
pub struct OpenCtiClient<T: Transport> {
    repository: Repository<T>,
}

impl OpenCtiClient<HttpTransport> {
    /// Connect to the GraphQL API of a knowledge base over HTTP
    pub fn connect(config: &ClientConfig) -> Result<Self, Error> {
        let transport = HttpTransport::new(config)?;
        log::info!("OpenCTI client targeting {}", transport.endpoint());
        Ok(Self::new(transport))
    }

    /// Connect with the configuration found in the environment and in an optional `.env` file
    pub fn from_env() -> Result<Self, Error> {
        Self::connect(&ClientConfig::from_env()?)
    }
}

impl<T: Transport> OpenCtiClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            repository: Repository::new(transport),
        }
    }

    pub fn repository(&self) -> &Repository<T> {
        &self.repository
    }

    /// The operations on one kind
    pub fn entity(&self, kind: EntityKind) -> EntityApi<'_, T> {
        EntityApi {
            kind,
            repository: &self.repository,
        }
    }

    pub fn stix_core_object(&self) -> EntityApi<'_, T> {
        self.entity(EntityKind::StixCoreObject)
    }

    pub fn stix_domain_object(&self) -> EntityApi<'_, T> {
        self.entity(EntityKind::StixDomainObject)
    }

    pub fn course_of_action(&self) -> EntityApi<'_, T> {
        self.entity(EntityKind::CourseOfAction)
    }

    pub fn identity(&self) -> EntityApi<'_, T> {
        self.entity(EntityKind::Identity)
    }

    pub fn location(&self) -> EntityApi<'_, T> {
        self.entity(EntityKind::Location)
    }

    pub fn label(&self) -> EntityApi<'_, T> {
        self.entity(EntityKind::Label)
    }

    pub fn marking_definition(&self) -> EntityApi<'_, T> {
        self.entity(EntityKind::MarkingDefinition)
    }

    pub fn kill_chain_phase(&self) -> EntityApi<'_, T> {
        self.entity(EntityKind::KillChainPhase)
    }

    pub fn external_reference(&self) -> EntityApi<'_, T> {
        self.entity(EntityKind::ExternalReference)
    }
}

/// The operations of the repository, the relationship editor and the STIX mapper bound to one kind
pub struct EntityApi<'c, T: Transport> {
    kind: EntityKind,
    repository: &'c Repository<T>,
}

impl<'c, T: Transport> EntityApi<'c, T> {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    fn relationships(&self) -> RelationshipEditor<'c, T> {
        self.repository.relationships()
    }

    pub fn list(&self, options: &ListOptions) -> Result<Page, Error> {
        self.repository.list(self.kind, options)
    }

    pub fn read(&self, options: &ReadOptions) -> Result<Option<Entity>, Error> {
        self.repository.read(self.kind, options)
    }

    pub fn read_by_id(&self, id: &str) -> Result<Option<Entity>, Error> {
        self.read(&ReadOptions::by_id(id))
    }

    pub fn create(&self, input: CreateInput) -> Result<Entity, Error> {
        self.repository.create(self.kind, input)
    }

    pub fn update_field(&self, id: &str, edits: &[FieldEdit]) -> Result<Entity, Error> {
        self.repository.update_field(self.kind, id, edits)
    }

    pub fn delete(&self, id: &str) -> Result<(), Error> {
        self.repository.delete(self.kind, id)
    }

    pub fn merge(&self, id: &str, absorbed_ids: &[&str]) -> Result<Entity, Error> {
        self.repository.merge(self.kind, id, absorbed_ids)
    }

    pub fn list_files(&self, id: &str) -> Result<Vec<ImportedFile>, Error> {
        self.repository.list_files(self.kind, id)
    }

    pub fn add_file(&self, id: &str, upload: Upload) -> Result<Entity, Error> {
        self.repository.add_file(self.kind, id, upload)
    }

    /// Push the export of a listing of objects of this kind
    pub fn push_list_export(&self, upload: Upload, list_filters: Option<&str>) -> Result<(), Error> {
        self.repository
            .push_list_export(self.kind.as_ref(), upload, list_filters)
    }

    pub fn push_entity_export(&self, id: &str, upload: Upload) -> Result<(), Error> {
        self.repository.push_entity_export(self.kind, id, upload)
    }

    pub fn reports(&self, id: &str) -> Result<Vec<Entity>, Error> {
        self.repository.reports(self.kind, id)
    }

    pub fn notes(&self, id: &str) -> Result<Vec<Entity>, Error> {
        self.repository.notes(self.kind, id)
    }

    pub fn get_by_stix_id_or_name(&self, lookup: &NameLookup) -> Result<Option<Entity>, Error> {
        self.repository.get_by_stix_id_or_name(self.kind, lookup)
    }

    pub fn update_created_by(&self, id: &str, identity_id: Option<&str>) -> Result<bool, Error> {
        self.relationships().update_created_by(self.kind, id, identity_id)
    }

    pub fn add_label(&self, id: &str, label_id: &str) -> Result<bool, Error> {
        self.relationships()
            .add_edge(self.kind, id, EdgeType::ObjectLabel, label_id)
    }

    pub fn remove_label(&self, id: &str, label_id: &str) -> Result<bool, Error> {
        self.relationships()
            .remove_edge(self.kind, id, EdgeType::ObjectLabel, label_id)
    }

    pub fn add_label_by_name(&self, id: &str, label_name: &str) -> Result<bool, Error> {
        self.relationships().add_label_by_name(self.kind, id, label_name)
    }

    pub fn remove_label_by_name(&self, id: &str, label_name: &str) -> Result<bool, Error> {
        self.relationships()
            .remove_label_by_name(self.kind, id, label_name)
    }

    pub fn add_marking_definition(&self, id: &str, marking_id: &str) -> Result<bool, Error> {
        self.relationships()
            .add_edge(self.kind, id, EdgeType::ObjectMarking, marking_id)
    }

    pub fn remove_marking_definition(&self, id: &str, marking_id: &str) -> Result<bool, Error> {
        self.relationships()
            .remove_edge(self.kind, id, EdgeType::ObjectMarking, marking_id)
    }

    pub fn add_external_reference(&self, id: &str, reference_id: &str) -> Result<bool, Error> {
        self.relationships()
            .add_edge(self.kind, id, EdgeType::ExternalReference, reference_id)
    }

    pub fn remove_external_reference(&self, id: &str, reference_id: &str) -> Result<bool, Error> {
        self.relationships()
            .remove_edge(self.kind, id, EdgeType::ExternalReference, reference_id)
    }

    pub fn add_kill_chain_phase(&self, id: &str, phase_id: &str) -> Result<bool, Error> {
        self.relationships()
            .add_edge(self.kind, id, EdgeType::KillChainPhase, phase_id)
    }

    pub fn remove_kill_chain_phase(&self, id: &str, phase_id: &str) -> Result<bool, Error> {
        self.relationships()
            .remove_edge(self.kind, id, EdgeType::KillChainPhase, phase_id)
    }

    /// Create an object from a STIX object, or update the existing one when `update` is set.
    ///
    /// The generic kinds accept any importable STIX type; the others only their own.
    pub fn import_from_stix2(&self, stix: &Value, extras: &ImportExtras, update: bool) -> Result<Entity, Error> {
        let imported = stix2::from_stix2(stix, extras)?;
        let generic = matches!(self.kind, EntityKind::StixCoreObject | EntityKind::StixDomainObject);
        if !generic && imported.kind != self.kind {
            return Err(Error::InvalidParameter(format!(
                "cannot import a {} as {}",
                imported.kind, self.kind
            )));
        }
        self.repository
            .create(imported.kind, imported.input.update(update))
    }

    /// Read an object and export it in STIX. An object that does not exist exports as `None`.
    pub fn to_stix2(&self, id: &str, options: &ExportOptions) -> Result<Option<StixExport>, Error> {
        match self.read_by_id(id)? {
            Some(entity) => stix2::to_stix2(&entity, options),
            None => {
                log::warn!("Cannot export {} {{{id}}}, not found", self.kind);
                Ok(None)
            }
        }
    }
}
