//! Type registry
//!
//! [`TypeRegistry`] is the concrete [`TypeManager`]: it owns the built-in
//! scalar types, the precision tables of the temporal families and the
//! parametric factories, and caches every type it resolves by signature.

use crate::common::config::BlockConfig;
use crate::common::error::{PrismError, PrismResult};
use crate::invalid_arg_err;
use crate::types::logical_type::TypeRef;
use crate::types::parametric::{
    ArrayParametricType, CharParametricType, MapParametricType, ParametricType,
    QuantileDigestParametricType, RowParametricType, TemporalFamily, TemporalParametricType,
    VarcharParametricType,
};
use crate::types::scalar::{BigintType, BooleanType, DoubleType, IntegerType};
use crate::types::signature::TypeSignature;
use crate::types::sketch::HyperLogLogType;
use crate::types::temporal::TemporalTypeTables;
use crate::types::variable_width::VarbinaryType;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Resolves signatures to types
pub trait TypeManager: Send + Sync {
    /// Fails with [`PrismError::TypeNotFound`] for an unknown signature
    fn get_type(&self, signature: &TypeSignature) -> PrismResult<TypeRef>;
}

#[derive(Debug)]
pub struct TypeRegistry {
    config: BlockConfig,
    temporal: Arc<TemporalTypeTables>,
    types: RwLock<AHashMap<TypeSignature, TypeRef>>,
    parametric_types: RwLock<AHashMap<String, Arc<dyn ParametricType>>>,
}

impl TypeRegistry {
    /// Registry of the built-in types with the default configuration
    pub fn new() -> Self {
        Self::with_builtins(BlockConfig::default())
    }

    /// Registry whose variable-width types pre-size builders per `config`
    pub fn with_config(config: BlockConfig) -> PrismResult<Self> {
        config.validate()?;
        Ok(Self::with_builtins(config))
    }

    fn with_builtins(config: BlockConfig) -> Self {
        let expected_bytes = config.default_expected_bytes_per_entry;
        let temporal = Arc::new(TemporalTypeTables::new());

        let scalars: Vec<TypeRef> = vec![
            Arc::new(BooleanType::new()),
            Arc::new(BigintType::new()),
            Arc::new(IntegerType::new()),
            Arc::new(DoubleType::new()),
            Arc::new(VarbinaryType::create(expected_bytes)),
            Arc::new(HyperLogLogType::new()),
        ];
        let factories: Vec<Arc<dyn ParametricType>> = vec![
            Arc::new(QuantileDigestParametricType),
            Arc::new(TemporalParametricType::new(TemporalFamily::Time, Arc::clone(&temporal))),
            Arc::new(TemporalParametricType::new(
                TemporalFamily::TimeWithTimeZone,
                Arc::clone(&temporal),
            )),
            Arc::new(TemporalParametricType::new(
                TemporalFamily::Timestamp,
                Arc::clone(&temporal),
            )),
            Arc::new(TemporalParametricType::new(
                TemporalFamily::TimestampWithTimeZone,
                Arc::clone(&temporal),
            )),
            Arc::new(CharParametricType::new(expected_bytes)),
            Arc::new(VarcharParametricType::new(expected_bytes)),
            Arc::new(ArrayParametricType),
            Arc::new(MapParametricType),
            Arc::new(RowParametricType),
        ];

        let types = scalars
            .into_iter()
            .map(|ty| (ty.signature().clone(), ty))
            .collect();
        let parametric_types = factories
            .into_iter()
            .map(|factory| (factory.name().to_ascii_lowercase(), factory))
            .collect();
        Self {
            config,
            temporal,
            types: RwLock::new(types),
            parametric_types: RwLock::new(parametric_types),
        }
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    /// Precision tables shared with the temporal factories
    pub fn temporal_types(&self) -> &Arc<TemporalTypeTables> {
        &self.temporal
    }

    /// Register a concrete type under its signature
    pub fn add_type(&self, ty: TypeRef) -> PrismResult<()> {
        let signature = ty.signature().clone();
        let mut types = self.types.write();
        if types.contains_key(&signature) {
            return Err(invalid_arg_err!("Type {} is already registered", signature));
        }
        debug!(%signature, "registered type");
        types.insert(signature, ty);
        Ok(())
    }

    /// Register a factory under its case-insensitive base name
    pub fn add_parametric_type(&self, factory: Arc<dyn ParametricType>) -> PrismResult<()> {
        let name = factory.name().to_ascii_lowercase();
        let mut parametric_types = self.parametric_types.write();
        if parametric_types.contains_key(&name) {
            return Err(invalid_arg_err!(
                "Parametric type {} is already registered",
                name
            ));
        }
        debug!(%name, "registered parametric type");
        parametric_types.insert(name, factory);
        Ok(())
    }

    /// Resolve a type from its textual signature, e.g. `map(varchar,array(bigint))`
    pub fn get_type_by_name(&self, name: &str) -> PrismResult<TypeRef> {
        self.get_type(&TypeSignature::parse(name)?)
    }

    /// Number of cached concrete types
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeManager for TypeRegistry {
    fn get_type(&self, signature: &TypeSignature) -> PrismResult<TypeRef> {
        if signature.is_calculated() {
            return Err(invalid_arg_err!(
                "Cannot resolve calculated signature {}",
                signature
            ));
        }
        if let Some(ty) = self.types.read().get(signature) {
            return Ok(Arc::clone(ty));
        }

        // Factories resolve nested parameters through this registry, so no
        // lock may be held while one runs.
        let factory = self
            .parametric_types
            .read()
            .get(&signature.base().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| PrismError::TypeNotFound(signature.to_string()))?;
        debug!(%signature, "resolving parametric type");
        let ty = factory.create_type(self, signature.parameters())?;

        let mut types = self.types.write();
        Ok(Arc::clone(types.entry(signature.clone()).or_insert(ty)))
    }
}
