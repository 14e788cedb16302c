//! Declarative payload schemas for the books module.
//!
//! The two request shapes (create vs. update) are data, not code: a
//! [`Schema`] is a static table of field names and expected JSON types with
//! closed-world semantics. Validation is a pure function of the payload and
//! the schema; nothing here touches storage.

use serde_json::Value;

/// JSON type expected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
}

impl FieldType {
    /// Strict type check. A numeric string is not an integer, and neither
    /// is a float.
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.as_i64().is_some(),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }
}

/// A single required field in a payload shape.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

/// A closed payload shape: every listed field is required, and no field
/// outside the list is allowed.
#[derive(Debug)]
pub struct Schema {
    pub fields: &'static [FieldSpec],
}

/// Shape of a create payload: the full entity, key included.
pub const CREATE_BOOK: Schema = Schema {
    fields: &[
        FieldSpec {
            name: "isbn",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "amazon_url",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "author",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "language",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "pages",
            ty: FieldType::Integer,
        },
        FieldSpec {
            name: "publisher",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "title",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "year",
            ty: FieldType::Integer,
        },
    ],
};

/// Shape of an update payload: every mutable field, never the key.
pub const UPDATE_BOOK: Schema = Schema {
    fields: &[
        FieldSpec {
            name: "amazon_url",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "author",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "language",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "pages",
            ty: FieldType::Integer,
        },
        FieldSpec {
            name: "publisher",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "title",
            ty: FieldType::String,
        },
        FieldSpec {
            name: "year",
            ty: FieldType::Integer,
        },
    ],
};

/// One violated constraint, phrased for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub error: String,
}

impl Violation {
    fn new(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            error: error.into(),
        }
    }
}

impl Schema {
    fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Check a decoded payload against this schema, collecting one
    /// violation per missing field, mistyped field, and unknown field.
    pub fn validate(&self, payload: &Value) -> Result<(), Vec<Violation>> {
        let Some(object) = payload.as_object() else {
            return Err(vec![Violation::new("$", "payload must be a JSON object")]);
        };

        let mut violations = Vec::new();

        for spec in self.fields {
            match object.get(spec.name) {
                None => violations.push(Violation::new(spec.name, "is required")),
                Some(value) if !spec.ty.matches(value) => violations.push(Violation::new(
                    spec.name,
                    format!("must be of type {}", spec.ty.name()),
                )),
                Some(_) => {}
            }
        }

        for key in object.keys() {
            if self.field(key).is_none() {
                violations.push(Violation::new(key.as_str(), "is not a recognized field"));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Validate a create payload.
pub fn validate_create(payload: &Value) -> Result<(), Vec<Violation>> {
    CREATE_BOOK.validate(payload)
}

/// Validate an update payload. The identifier travels in the path; if the
/// body carries an `isbn` key at all, the request is rejected before any
/// schema check.
pub fn validate_update(payload: &Value) -> Result<(), Vec<Violation>> {
    if payload.get("isbn").is_some() {
        return Err(vec![Violation::new(
            "isbn",
            "cannot appear in the request body",
        )]);
    }

    UPDATE_BOOK.validate(payload)
}
