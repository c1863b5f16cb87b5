//! Resource descriptor types
//!
//! A resource is the REST analogue of a table: a named collection of
//! schema-less records with a designated primary-key field and, optionally,
//! a parent resource reached through a foreign-key field.
//!
//! The field list is descriptor metadata for the serving layer. The store
//! persists whatever well-formed properties it is given; it never validates
//! record fields against the declared types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declared field types.
///
/// Types are opaque to the store beyond identity: they describe the shape a
/// mock API advertises, not a constraint the store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// JSON number
    Number,
    /// Boolean
    Bool,
    /// Nested object
    Object,
    /// Array of values
    Array,
}

/// A declared field: name plus advertised type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Advertised field type
    pub field_type: FieldType,
}

impl FieldDef {
    /// Create a string field
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::String,
        }
    }

    /// Create a number field
    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Number,
        }
    }

    /// Create a boolean field
    pub fn bool(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Bool,
        }
    }

    /// Create a nested-object field
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Object,
        }
    }

    /// Create an array field
    pub fn array(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Array,
        }
    }
}

/// How generated primary keys are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Sequential integers starting at 1
    Int,
    /// Random v4 UUID strings
    Uuid,
}

/// Who supplies primary keys at create time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// The store assigns every key; a caller-supplied key is rejected
    Generated,
    /// The caller must supply a key unique among live records
    CallerSupplied,
}

/// A declared parent relationship.
///
/// Child records carry the parent record's primary key in `foreign_key`,
/// which is what nested routes (`/parents/:id/children`) enumerate by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    /// Name of the parent resource
    pub resource: String,
    /// Field on child records holding the parent's primary key
    pub foreign_key: String,
}

/// A resource descriptor.
///
/// Registered with the store before any record operation references it;
/// immutable once registered, except for removal via drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource name
    pub name: String,
    /// Ordered declared fields (metadata only)
    pub fields: Vec<FieldDef>,
    /// Name of the primary-key field
    pub primary_key: String,
    /// Kind of generated keys
    pub key_kind: KeyKind,
    /// Key supply policy
    pub key_policy: KeyPolicy,
    /// Optional parent relationship
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentLink>,
}

impl Resource {
    /// Create a descriptor with the conventional defaults: primary key `id`,
    /// generated sequential integer keys, no parent.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
            primary_key: "id".to_string(),
            key_kind: KeyKind::Int,
            key_policy: KeyPolicy::Generated,
            parent: None,
        }
    }

    /// Set the primary-key field name
    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Set the generated-key kind
    pub fn with_key_kind(mut self, kind: KeyKind) -> Self {
        self.key_kind = kind;
        self
    }

    /// Set the key supply policy
    pub fn with_key_policy(mut self, policy: KeyPolicy) -> Self {
        self.key_policy = policy;
        self
    }

    /// Declare a parent relationship
    pub fn with_parent(
        mut self,
        resource: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.parent = Some(ParentLink {
            resource: resource.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    /// Validates the descriptor structure itself (not any record).
    pub fn validate_structure(&self) -> Result<(), ResourceError> {
        if self.name.is_empty() {
            return Err(ResourceError::EmptyName);
        }

        if self.primary_key.is_empty() {
            return Err(ResourceError::EmptyPrimaryKey(self.name.clone()));
        }

        if let Some(link) = &self.parent {
            if link.resource.is_empty() {
                return Err(ResourceError::EmptyParentName(self.name.clone()));
            }
            if link.foreign_key.is_empty() {
                return Err(ResourceError::EmptyForeignKey(self.name.clone()));
            }
            if link.foreign_key == self.primary_key {
                return Err(ResourceError::ForeignKeyIsPrimaryKey {
                    resource: self.name.clone(),
                    field: link.foreign_key.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Structural errors in a resource descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Resource name is empty
    #[error("resource name must not be empty")]
    EmptyName,

    /// Primary-key field name is empty
    #[error("resource '{0}' must name a primary-key field")]
    EmptyPrimaryKey(String),

    /// Parent resource name is empty
    #[error("parent link on '{0}' must name a parent resource")]
    EmptyParentName(String),

    /// Foreign-key field name is empty
    #[error("parent link on '{0}' must name a foreign-key field")]
    EmptyForeignKey(String),

    /// Foreign key collides with the primary key
    #[error("foreign key '{field}' on '{resource}' collides with the primary key")]
    ForeignKeyIsPrimaryKey {
        /// Resource declaring the link
        resource: String,
        /// Offending field name
        field: String,
    },
}
