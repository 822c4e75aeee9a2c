use crate::expression::ExecutionError;
use crate::types::Type;
use crate::value::Value;

/// Instance of a record type. Fields are stored in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    ty: Type,
    fields: Vec<Value>,
}

impl Record {
    pub fn new(ty: Type, fields: Vec<Value>) -> Self {
        Self { ty, fields }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Field names paired with their values
    pub fn named_fields(&self) -> Vec<(&str, &Value)> {
        match self.ty.record_shape() {
            Some(shape) => shape
                .fields
                .iter()
                .map(|(name, _)| name.as_str())
                .zip(self.fields.iter())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        let index = self.ty.record_shape()?.field_index(name)?;
        self.fields.get(index)
    }

    pub fn with_field(&self, name: &str, value: Value) -> Result<Record, ExecutionError> {
        let index = self
            .ty
            .record_shape()
            .and_then(|shape| shape.field_index(name))
            .ok_or_else(|| ExecutionError::MissingMember {
                type_name: self.ty.name().to_string(),
                member: name.to_string(),
            })?;
        let mut fields = self.fields.clone();
        fields[index] = value;
        Ok(Record::new(self.ty.clone(), fields))
    }
}
