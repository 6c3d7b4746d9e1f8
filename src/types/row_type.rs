use crate::block::{Block, BlockBuilder, BlockBuilderStatus, RowBlockBuilder};
use crate::common::error::PrismResult;
use crate::types::logical_type::{
    delegate_base_type, null_aware_compare, null_aware_equal, null_aware_hash, require_comparable,
    require_orderable, unexpected_object, BaseType, ComparableType, NativeKind, ObjectValue,
    OrderableType, Type, TypeRef,
};
use crate::types::signature::{NamedTypeSignature, TypeSignature, TypeSignatureParameter};
use crate::{invalid_arg_err, unsupported_err};
use std::cmp::Ordering;

pub const ROW: &str = "row";

/// One field of a row, optionally named
#[derive(Debug, Clone)]
pub struct RowField {
    pub name: Option<String>,
    pub ty: TypeRef,
}

impl RowField {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }

    pub fn anonymous(ty: TypeRef) -> Self {
        Self { name: None, ty }
    }
}

/// Fixed-arity tuples; each value is a single-row block with one position per field
#[derive(Debug, Clone)]
pub struct RowType {
    base: BaseType,
    fields: Vec<RowField>,
}

impl RowType {
    pub fn new(fields: Vec<RowField>) -> PrismResult<Self> {
        if fields.is_empty() {
            return Err(invalid_arg_err!("row type must have at least one field"));
        }
        let parameters = fields
            .iter()
            .map(|field| match &field.name {
                Some(name) => TypeSignatureParameter::NamedType(NamedTypeSignature {
                    name: Some(name.clone()),
                    type_signature: field.ty.signature().clone(),
                }),
                None => TypeSignatureParameter::Type(field.ty.signature().clone()),
            })
            .collect();
        let display_name = format!(
            "{}({})",
            ROW,
            fields
                .iter()
                .map(|field| match &field.name {
                    Some(name) => format!("{} {}", name, field.ty.display_name()),
                    None => field.ty.display_name(),
                })
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self {
            base: BaseType::new(TypeSignature::new(ROW, parameters), NativeKind::Object)
                .with_display_name(display_name),
            fields,
        })
    }

    /// Row of unnamed fields
    pub fn anonymous(types: Vec<TypeRef>) -> PrismResult<Self> {
        Self::new(types.into_iter().map(RowField::anonymous).collect())
    }

    pub fn fields(&self) -> &[RowField] {
        &self.fields
    }

    pub fn field_types(&self) -> impl Iterator<Item = &TypeRef> + '_ {
        self.fields.iter().map(|field| &field.ty)
    }
}

impl Type for RowType {
    delegate_base_type!();

    fn type_parameters(&self) -> Vec<TypeRef> {
        self.field_types().cloned().collect()
    }

    fn as_comparable(&self) -> Option<&dyn ComparableType> {
        self.field_types()
            .all(|ty| ty.is_comparable())
            .then_some(self as &dyn ComparableType)
    }

    fn as_orderable(&self) -> Option<&dyn OrderableType> {
        self.field_types()
            .all(|ty| ty.is_orderable())
            .then_some(self as &dyn OrderableType)
    }

    fn create_block_builder(
        &self,
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
    ) -> PrismResult<Box<dyn BlockBuilder>> {
        let field_builders = self
            .field_types()
            .map(|ty| ty.create_block_builder(status.clone(), expected_entries))
            .collect::<PrismResult<Vec<_>>>()?;
        Ok(Box::new(RowBlockBuilder::new(
            field_builders,
            status,
            expected_entries,
        )?))
    }

    fn get_object(&self, block: &dyn Block, position: usize) -> PrismResult<ObjectValue> {
        Ok(ObjectValue::Block(block.get_object(position)?))
    }

    fn write_object(&self, builder: &mut dyn BlockBuilder, value: &ObjectValue) -> PrismResult<()> {
        let row = value
            .as_block()
            .ok_or_else(|| unexpected_object(self, value))?;
        if row.position_count() != self.fields.len() {
            return Err(unsupported_err!(
                "{} cannot write a row of {} fields",
                self.display_name(),
                row.position_count()
            ));
        }
        let entry = builder.begin_block_entry()?;
        for (index, ty) in self.field_types().enumerate() {
            ty.append_to(row.as_ref(), index, entry)?;
        }
        builder.close_entry()
    }

    fn format_value(&self, block: &dyn Block, position: usize) -> PrismResult<String> {
        if block.is_null(position)? {
            return Ok("NULL".to_string());
        }
        let row = block.get_object(position)?;
        let values = self
            .field_types()
            .enumerate()
            .map(|(index, ty)| ty.format_value(row.as_ref(), index))
            .collect::<PrismResult<Vec<_>>>()?;
        Ok(format!("({})", values.join(", ")))
    }
}

impl ComparableType for RowType {
    fn equal_to(
        &self,
        left: &dyn Block,
        left_position: usize,
        right: &dyn Block,
        right_position: usize,
    ) -> PrismResult<bool> {
        let left = left.get_object(left_position)?;
        let right = right.get_object(right_position)?;
        for (index, ty) in self.field_types().enumerate() {
            let ty = require_comparable(ty)?;
            if !null_aware_equal(ty, left.as_ref(), index, right.as_ref(), index)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn hash(&self, block: &dyn Block, position: usize) -> PrismResult<u64> {
        let row = block.get_object(position)?;
        let mut hash: u64 = 1;
        for (index, ty) in self.field_types().enumerate() {
            let ty = require_comparable(ty)?;
            hash = hash
                .wrapping_mul(31)
                .wrapping_add(null_aware_hash(ty, row.as_ref(), index)?);
        }
        Ok(hash)
    }
}

impl OrderableType for RowType {
    /// Field by field, first difference wins
    fn compare_to(
        &self,
        left: &dyn Block,
        left_position: usize,
        right: &dyn Block,
        right_position: usize,
    ) -> PrismResult<Ordering> {
        let left = left.get_object(left_position)?;
        let right = right.get_object(right_position)?;
        for (index, ty) in self.field_types().enumerate() {
            let ty = require_orderable(ty)?;
            let ordering = null_aware_compare(ty, left.as_ref(), index, right.as_ref(), index)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }
}
