// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute layouts for the entity categories that edits touch
//!
//! STEP records are positional. Edits address fields by name, so the engine
//! needs the field order, and the writer needs to know which fields take a
//! type-wrapped value (`IFCREAL(1.0)`) and which take a bare one.

use crate::IfcType;

/// How a field's value is encoded in a record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Defined type or enumeration, written bare (`'Name'`, `.T.`)
    Plain,
    /// SELECT of defined types, written with its type tag (`IFCREAL(1.0)`)
    Select,
    /// Single entity reference (`#12`)
    Reference,
    /// Aggregate of entity references (`(#12,#13)`)
    ReferenceList,
}

/// One positional field of a category
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub optional: bool,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        optional: false,
    }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        optional: true,
    }
}

/// Field layout of an entity category
#[derive(Debug)]
pub struct CategorySchema {
    /// Fields in record order
    pub fields: &'static [FieldSpec],
    /// Whether new entities of this category can be instantiated from the layout
    pub creatable: bool,
    /// Unset optional fields of new entities must be written as `$`, not `*`
    pub explicit_nulls: bool,
}

use FieldKind::{Plain, Reference, ReferenceList, Select};

static PROPERTY_SINGLE_VALUE: CategorySchema = CategorySchema {
    fields: &[
        required("Name", Plain),
        optional("Description", Plain),
        optional("NominalValue", Select),
        optional("Unit", Reference),
    ],
    creatable: true,
    explicit_nulls: true,
};

static PROPERTY_SET: CategorySchema = CategorySchema {
    fields: &[
        required("GlobalId", Plain),
        optional("OwnerHistory", Reference),
        optional("Name", Plain),
        optional("Description", Plain),
        required("HasProperties", ReferenceList),
    ],
    creatable: true,
    explicit_nulls: true,
};

static ELEMENT_QUANTITY: CategorySchema = CategorySchema {
    fields: &[
        required("GlobalId", Plain),
        optional("OwnerHistory", Reference),
        optional("Name", Plain),
        optional("Description", Plain),
        optional("MethodOfMeasurement", Plain),
        required("Quantities", ReferenceList),
    ],
    creatable: true,
    explicit_nulls: true,
};

static REL_DEFINES_BY_PROPERTIES: CategorySchema = CategorySchema {
    fields: &[
        required("GlobalId", Plain),
        optional("OwnerHistory", Reference),
        optional("Name", Plain),
        optional("Description", Plain),
        required("RelatedObjects", ReferenceList),
        required("RelatingPropertyDefinition", Reference),
    ],
    creatable: true,
    explicit_nulls: true,
};

static OWNER_HISTORY: CategorySchema = CategorySchema {
    fields: &[
        required("OwningUser", Reference),
        required("OwningApplication", Reference),
        optional("State", Plain),
        optional("ChangeAction", Plain),
        optional("LastModifiedDate", Plain),
        optional("LastModifyingUser", Reference),
        optional("LastModifyingApplication", Reference),
        required("CreationDate", Plain),
    ],
    creatable: true,
    explicit_nulls: false,
};

// Shared IfcElement prefix. Subtypes append their own trailing fields, so the
// layout only supports updating existing elements.
static ELEMENT: CategorySchema = CategorySchema {
    fields: &[
        required("GlobalId", Plain),
        optional("OwnerHistory", Reference),
        optional("Name", Plain),
        optional("Description", Plain),
        optional("ObjectType", Plain),
        optional("ObjectPlacement", Reference),
        optional("Representation", Reference),
        optional("Tag", Plain),
    ],
    creatable: false,
    explicit_nulls: false,
};

impl CategorySchema {
    /// Look up the layout for a category
    pub fn for_type(ifc_type: &IfcType) -> Option<&'static CategorySchema> {
        match ifc_type {
            IfcType::IfcPropertySingleValue => Some(&PROPERTY_SINGLE_VALUE),
            IfcType::IfcPropertySet => Some(&PROPERTY_SET),
            IfcType::IfcElementQuantity => Some(&ELEMENT_QUANTITY),
            IfcType::IfcRelDefinesByProperties => Some(&REL_DEFINES_BY_PROPERTIES),
            IfcType::IfcOwnerHistory => Some(&OWNER_HISTORY),
            t if t.is_element() => Some(&ELEMENT),
            _ => None,
        }
    }

    /// Number of fields in a freshly created record
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Position of a field by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Position and spec of a field by name
    pub fn field(&self, name: &str) -> Option<(usize, &'static FieldSpec)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name.eq_ignore_ascii_case(name))
    }

    /// Name of the field at `index`
    pub fn field_name(&self, index: usize) -> Option<&'static str> {
        self.fields.get(index).map(|f| f.name)
    }
}
