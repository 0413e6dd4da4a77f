//! Struct layouts
//!
//! A struct value is the flat concatenation of its fields' cells. Field
//! offsets are fixed when the definition is registered.

use crate::error::{Error, Result};
use crate::lexer::Span;
use crate::parser::{StructDef, TypeName};
use std::collections::HashMap;
use std::sync::Arc;

/// Element type of a variable or field
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    /// One cell
    Int,
    /// A struct laid out field after field
    Struct(Arc<StructType>),
}

impl ElementType {
    /// Cells one element occupies
    pub fn size(&self) -> usize {
        match self {
            ElementType::Int => 1,
            ElementType::Struct(def) => def.size(),
        }
    }

    /// Resolves a type name against the registered structs
    pub fn resolve(
        name: &TypeName,
        structs: &HashMap<String, Arc<StructType>>,
        span: Span,
    ) -> Result<Self> {
        match name {
            TypeName::Int => Ok(ElementType::Int),
            TypeName::Struct(struct_name) => structs
                .get(struct_name)
                .cloned()
                .map(ElementType::Struct)
                .ok_or_else(|| {
                    Error::semantic(span, format!("Undefined struct '{}'", struct_name))
                }),
        }
    }
}

/// One laid-out field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Element type
    pub ty: ElementType,
    /// Array dimensions, empty for scalars
    pub dimensions: Vec<usize>,
    /// Cell offset from the start of the struct
    pub offset: usize,
}

impl Field {
    /// Cells the field occupies
    pub fn size(&self) -> usize {
        self.dimensions.iter().product::<usize>() * self.ty.size()
    }
}

/// Registered struct type
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    /// Type name
    pub name: String,
    /// Fields in layout order
    pub fields: Vec<Field>,
    size: usize,
}

impl StructType {
    /// Lays out `def`; field types may only name structs registered earlier
    pub fn from_def(def: &StructDef, structs: &HashMap<String, Arc<StructType>>) -> Result<Self> {
        let mut fields: Vec<Field> = Vec::with_capacity(def.fields.len());
        let mut offset = 0;

        for field in &def.fields {
            if fields.iter().any(|f| f.name == field.name) {
                return Err(Error::semantic(
                    field.span,
                    format!("Field '{}' is already defined in struct '{}'", field.name, def.name),
                ));
            }
            if field.ty == TypeName::Struct(def.name.clone()) {
                return Err(Error::semantic(
                    field.span,
                    format!("Struct '{}' cannot contain itself", def.name),
                ));
            }
            let ty = ElementType::resolve(&field.ty, structs, field.span)?;
            let laid_out = Field {
                name: field.name.clone(),
                ty,
                dimensions: field.dimensions.clone(),
                offset,
            };
            offset += laid_out.size();
            fields.push(laid_out);
        }

        Ok(StructType {
            name: def.name.clone(),
            fields,
            size: offset,
        })
    }

    /// Total cells of one value
    pub fn size(&self) -> usize {
        self.size
    }

    /// Looks up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}
