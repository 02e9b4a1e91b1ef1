//! Nested GraphQL projections.

use std::fmt;

/// One item of a GraphQL selection set
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// A scalar field
    Field(String),
    /// A nested object: `name { ... }`
    Object { name: String, spec: FieldSpec },
    /// A relay connection, rendered as `name { edges { node { ... } } }`
    Connection { name: String, spec: FieldSpec },
    /// An inline fragment: `... on Type { ... }`
    Fragment { on: String, spec: FieldSpec },
    /// Selection text passed through verbatim
    Raw(String),
}

/// A projection: the set of fields requested for an object.
///
/// Projections are built by chaining, e.g.
/// `FieldSpec::new().fields(&["id", "name"]).object("createdBy", FieldSpec::new().field("id"))`,
/// and rendered to GraphQL selection text with [`FieldSpec::render`]. A caller may pass any projection, or raw text
/// through [`FieldSpec::raw`]; nothing is checked locally and unknown fields are reported by the remote store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSpec {
    selections: Vec<Selection>,
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A projection made of raw GraphQL selection text
    pub fn raw(text: &str) -> Self {
        Self::new().raw_selection(text)
    }

    pub fn field(mut self, name: &str) -> Self {
        self.selections.push(Selection::Field(name.to_string()));
        self
    }

    pub fn fields(mut self, names: &[&str]) -> Self {
        self.selections
            .extend(names.iter().map(|name| Selection::Field(name.to_string())));
        self
    }

    pub fn object(mut self, name: &str, spec: FieldSpec) -> Self {
        self.selections.push(Selection::Object {
            name: name.to_string(),
            spec,
        });
        self
    }

    pub fn connection(mut self, name: &str, spec: FieldSpec) -> Self {
        self.selections.push(Selection::Connection {
            name: name.to_string(),
            spec,
        });
        self
    }

    pub fn on(mut self, type_name: &str, spec: FieldSpec) -> Self {
        self.selections.push(Selection::Fragment {
            on: type_name.to_string(),
            spec,
        });
        self
    }

    pub fn raw_selection(mut self, text: &str) -> Self {
        self.selections.push(Selection::Raw(text.trim().to_string()));
        self
    }

    /// Append every selection of another projection
    pub fn merge(mut self, other: FieldSpec) -> Self {
        self.selections.extend(other.selections);
        self
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Whether the projection requests a top-level field or object with this name
    pub fn selects(&self, name: &str) -> bool {
        self.selections.iter().any(|selection| match selection {
            Selection::Field(field) => field == name,
            Selection::Object { name: field, .. } | Selection::Connection { name: field, .. } => {
                field == name
            }
            _ => false,
        })
    }

    /// Render the projection as GraphQL selection text, without the enclosing braces
    pub fn render(&self) -> String {
        self.selections
            .iter()
            .map(|selection| match selection {
                Selection::Field(name) => name.clone(),
                Selection::Object { name, spec } => format!("{name} {{ {} }}", spec.render()),
                Selection::Connection { name, spec } => {
                    format!("{name} {{ edges {{ node {{ {} }} }} }}", spec.render())
                }
                Selection::Fragment { on, spec } => format!("... on {on} {{ {} }}", spec.render()),
                Selection::Raw(text) => text.clone(),
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
