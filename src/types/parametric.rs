//! Parametric type factories
//!
//! A [`ParametricType`] turns the parameters of a signature such as
//! `timestamp(6)` or `map(varchar,bigint)` into a concrete type. Nested type
//! parameters are resolved through the [`TypeManager`].

use crate::common::error::PrismResult;
use crate::invalid_arg_err;
use crate::types::array_type::{ArrayType, ARRAY};
use crate::types::logical_type::TypeRef;
use crate::types::map_type::{MapType, MAP};
use crate::types::registry::TypeManager;
use crate::types::row_type::{RowField, RowType, ROW};
use crate::types::signature::TypeSignatureParameter;
use crate::types::sketch::{QuantileDigestType, QDIGEST};
use crate::types::temporal::{
    TemporalTypeTables, TIME, TIMESTAMP, TIMESTAMP_WITH_TIME_ZONE, TIME_WITH_TIME_ZONE,
};
use crate::types::variable_width::{CharType, VarcharType, CHAR, VARCHAR};
use std::fmt;
use std::sync::Arc;

pub trait ParametricType: fmt::Debug + Send + Sync {
    /// Base name the factory is registered under
    fn name(&self) -> &str;

    fn create_type(
        &self,
        type_manager: &dyn TypeManager,
        parameters: &[TypeSignatureParameter],
    ) -> PrismResult<TypeRef>;
}

fn check_arity(name: &str, parameters: &[TypeSignatureParameter], expected: usize) -> PrismResult<()> {
    if parameters.len() != expected {
        return Err(invalid_arg_err!(
            "{} expects exactly {} parameter(s), got {}",
            name,
            expected,
            parameters.len()
        ));
    }
    Ok(())
}

/// The single numeric parameter of `name(n)`, as an unsigned length or precision
fn single_literal(name: &str, parameters: &[TypeSignatureParameter]) -> PrismResult<u32> {
    check_arity(name, parameters, 1)?;
    match &parameters[0] {
        TypeSignatureParameter::Long(value) => u32::try_from(*value)
            .map_err(|_| invalid_arg_err!("{} parameter out of range: {}", name, value)),
        other => Err(invalid_arg_err!(
            "{} expects a numeric parameter, got {}",
            name,
            other
        )),
    }
}

/// Resolves a nested type parameter; anonymous named types are accepted
fn nested_type(
    name: &str,
    type_manager: &dyn TypeManager,
    parameter: &TypeSignatureParameter,
) -> PrismResult<TypeRef> {
    match parameter {
        TypeSignatureParameter::Type(signature) => type_manager.get_type(signature),
        TypeSignatureParameter::NamedType(named) if named.name.is_none() => {
            type_manager.get_type(&named.type_signature)
        }
        other => Err(invalid_arg_err!(
            "{} expects a type parameter, got {}",
            name,
            other
        )),
    }
}

#[derive(Debug, Default)]
pub struct QuantileDigestParametricType;

impl ParametricType for QuantileDigestParametricType {
    fn name(&self) -> &str {
        QDIGEST
    }

    fn create_type(
        &self,
        type_manager: &dyn TypeManager,
        parameters: &[TypeSignatureParameter],
    ) -> PrismResult<TypeRef> {
        check_arity(QDIGEST, parameters, 1)?;
        let value_type = nested_type(QDIGEST, type_manager, &parameters[0])?;
        Ok(Arc::new(QuantileDigestType::new(value_type)))
    }
}

/// Which temporal family a [`TemporalParametricType`] resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalFamily {
    Time,
    TimeWithTimeZone,
    Timestamp,
    TimestampWithTimeZone,
}

impl TemporalFamily {
    pub fn name(self) -> &'static str {
        match self {
            TemporalFamily::Time => TIME,
            TemporalFamily::TimeWithTimeZone => TIME_WITH_TIME_ZONE,
            TemporalFamily::Timestamp => TIMESTAMP,
            TemporalFamily::TimestampWithTimeZone => TIMESTAMP_WITH_TIME_ZONE,
        }
    }
}

/// Precision lookup into the prebuilt temporal tables
#[derive(Debug)]
pub struct TemporalParametricType {
    family: TemporalFamily,
    tables: Arc<TemporalTypeTables>,
}

impl TemporalParametricType {
    pub fn new(family: TemporalFamily, tables: Arc<TemporalTypeTables>) -> Self {
        Self { family, tables }
    }
}

impl ParametricType for TemporalParametricType {
    fn name(&self) -> &str {
        self.family.name()
    }

    fn create_type(
        &self,
        _type_manager: &dyn TypeManager,
        parameters: &[TypeSignatureParameter],
    ) -> PrismResult<TypeRef> {
        let precision = single_literal(self.name(), parameters)?;
        match self.family {
            TemporalFamily::Time => self.tables.time(precision),
            TemporalFamily::TimeWithTimeZone => self.tables.time_with_time_zone(precision),
            TemporalFamily::Timestamp => self.tables.timestamp(precision),
            TemporalFamily::TimestampWithTimeZone => {
                self.tables.timestamp_with_time_zone(precision)
            }
        }
    }
}

#[derive(Debug)]
pub struct CharParametricType {
    default_expected_bytes_per_entry: usize,
}

impl CharParametricType {
    pub fn new(default_expected_bytes_per_entry: usize) -> Self {
        Self {
            default_expected_bytes_per_entry,
        }
    }
}

impl ParametricType for CharParametricType {
    fn name(&self) -> &str {
        CHAR
    }

    fn create_type(
        &self,
        _type_manager: &dyn TypeManager,
        parameters: &[TypeSignatureParameter],
    ) -> PrismResult<TypeRef> {
        let length = single_literal(CHAR, parameters)?;
        Ok(Arc::new(CharType::create(
            length,
            self.default_expected_bytes_per_entry,
        )?))
    }
}

/// `varchar` is unbounded, `varchar(n)` bounded
#[derive(Debug)]
pub struct VarcharParametricType {
    default_expected_bytes_per_entry: usize,
}

impl VarcharParametricType {
    pub fn new(default_expected_bytes_per_entry: usize) -> Self {
        Self {
            default_expected_bytes_per_entry,
        }
    }
}

impl ParametricType for VarcharParametricType {
    fn name(&self) -> &str {
        VARCHAR
    }

    fn create_type(
        &self,
        _type_manager: &dyn TypeManager,
        parameters: &[TypeSignatureParameter],
    ) -> PrismResult<TypeRef> {
        let length = if parameters.is_empty() {
            None
        } else {
            Some(single_literal(VARCHAR, parameters)?)
        };
        Ok(Arc::new(VarcharType::create(
            length,
            self.default_expected_bytes_per_entry,
        )?))
    }
}

#[derive(Debug, Default)]
pub struct ArrayParametricType;

impl ParametricType for ArrayParametricType {
    fn name(&self) -> &str {
        ARRAY
    }

    fn create_type(
        &self,
        type_manager: &dyn TypeManager,
        parameters: &[TypeSignatureParameter],
    ) -> PrismResult<TypeRef> {
        check_arity(ARRAY, parameters, 1)?;
        let element_type = nested_type(ARRAY, type_manager, &parameters[0])?;
        Ok(Arc::new(ArrayType::new(element_type)))
    }
}

#[derive(Debug, Default)]
pub struct MapParametricType;

impl ParametricType for MapParametricType {
    fn name(&self) -> &str {
        MAP
    }

    fn create_type(
        &self,
        type_manager: &dyn TypeManager,
        parameters: &[TypeSignatureParameter],
    ) -> PrismResult<TypeRef> {
        check_arity(MAP, parameters, 2)?;
        let key_type = nested_type(MAP, type_manager, &parameters[0])?;
        let value_type = nested_type(MAP, type_manager, &parameters[1])?;
        Ok(Arc::new(MapType::new(key_type, value_type)?))
    }
}

#[derive(Debug, Default)]
pub struct RowParametricType;

impl ParametricType for RowParametricType {
    fn name(&self) -> &str {
        ROW
    }

    fn create_type(
        &self,
        type_manager: &dyn TypeManager,
        parameters: &[TypeSignatureParameter],
    ) -> PrismResult<TypeRef> {
        let fields = parameters
            .iter()
            .map(|parameter| match parameter {
                TypeSignatureParameter::NamedType(named) => Ok(RowField {
                    name: named.name.clone(),
                    ty: type_manager.get_type(&named.type_signature)?,
                }),
                TypeSignatureParameter::Type(signature) => {
                    Ok(RowField::anonymous(type_manager.get_type(signature)?))
                }
                other => Err(invalid_arg_err!(
                    "{} expects field parameters, got {}",
                    ROW,
                    other
                )),
            })
            .collect::<PrismResult<Vec<_>>>()?;
        Ok(Arc::new(RowType::new(fields)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::PrismError;
    use crate::types::{BigintType, Type, TypeSignature, BIGINT};
    use TypeSignatureParameter::Long;

    /// Resolves `bigint` only
    struct BigintOnly;

    impl TypeManager for BigintOnly {
        fn get_type(&self, signature: &TypeSignature) -> PrismResult<TypeRef> {
            if signature == &TypeSignature::simple(BIGINT) {
                Ok(Arc::new(BigintType::new()))
            } else {
                Err(PrismError::TypeNotFound(signature.to_string()))
            }
        }
    }

    fn bigint_parameter() -> TypeSignatureParameter {
        TypeSignatureParameter::Type(TypeSignature::simple(BIGINT))
    }

    #[test]
    fn test_temporal_arity_and_kind() -> PrismResult<()> {
        let tables = Arc::new(TemporalTypeTables::new());
        let timestamp = TemporalParametricType::new(TemporalFamily::Timestamp, tables);
        let ty = timestamp.create_type(&BigintOnly, &[Long(6)])?;
        assert_eq!(ty.display_name(), "timestamp(6)");

        assert!(timestamp.create_type(&BigintOnly, &[]).is_err());
        assert!(timestamp
            .create_type(&BigintOnly, &[Long(6), Long(3)])
            .is_err());
        assert!(timestamp.create_type(&BigintOnly, &[bigint_parameter()]).is_err());
        assert!(timestamp.create_type(&BigintOnly, &[Long(13)]).is_err());
        assert!(timestamp.create_type(&BigintOnly, &[Long(-1)]).is_err());
        Ok(())
    }

    #[test]
    fn test_qdigest_needs_type_parameter() -> PrismResult<()> {
        let factory = QuantileDigestParametricType;
        let ty = factory.create_type(&BigintOnly, &[bigint_parameter()])?;
        assert_eq!(ty.display_name(), "qdigest(bigint)");
        assert!(factory.create_type(&BigintOnly, &[Long(3)]).is_err());
        let unknown = TypeSignatureParameter::Type(TypeSignature::simple("nope"));
        assert!(matches!(
            factory.create_type(&BigintOnly, &[unknown]),
            Err(PrismError::TypeNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_varchar_and_char() -> PrismResult<()> {
        let varchar = VarcharParametricType::new(16);
        assert_eq!(varchar.create_type(&BigintOnly, &[])?.display_name(), "varchar");
        let bounded = varchar.create_type(&BigintOnly, &[Long(4)])?;
        assert_eq!(
            bounded.as_variable_width().map(|ty| ty.expected_bytes_per_entry()),
            Some(4)
        );
        assert!(CharParametricType::new(16).create_type(&BigintOnly, &[]).is_err());
        Ok(())
    }

    #[test]
    fn test_composites() -> PrismResult<()> {
        let map = MapParametricType.create_type(&BigintOnly, &[bigint_parameter(), bigint_parameter()])?;
        assert_eq!(map.display_name(), "map(bigint, bigint)");
        assert!(MapParametricType.create_type(&BigintOnly, &[bigint_parameter()]).is_err());

        let row = RowParametricType.create_type(
            &BigintOnly,
            &[
                TypeSignatureParameter::NamedType(crate::types::NamedTypeSignature {
                    name: Some("a".to_string()),
                    type_signature: TypeSignature::simple(BIGINT),
                }),
                bigint_parameter(),
            ],
        )?;
        assert_eq!(row.display_name(), "row(a bigint, bigint)");
        assert!(RowParametricType.create_type(&BigintOnly, &[]).is_err());
        Ok(())
    }
}
