//! Process-wide schema cache keyed by Rust type identity.
use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use super::{compile, SchemaError, TypeSchema};
use crate::codable::JsonCodable;

static SCHEMAS: Lazy<RwLock<HashMap<TypeId, Arc<TypeSchema>>>> = Lazy::new(Default::default);

thread_local! {
    // types whose schema is being compiled on this thread
    static COMPILING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// Schema of `T`, compiled on first use. Two threads racing on the same
/// type may both compile it; the first published schema wins and both get it.
pub fn schema_for<T: JsonCodable>() -> Result<Arc<TypeSchema>, SchemaError> {
    let id = TypeId::of::<T>();
    if let Some(schema) = lookup(id) {
        return Ok(schema);
    }

    let _guard = CompileGuard::enter(id, type_name::<T>())?;
    let compiled = Arc::new(compile(&T::describe())?);
    tracing::debug!(
        type_name = type_name::<T>(),
        fields = compiled.len(),
        "compiled schema"
    );

    let mut schemas = SCHEMAS.write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(schemas.entry(id).or_insert(compiled)))
}

fn lookup(id: TypeId) -> Option<Arc<TypeSchema>> {
    let schemas = SCHEMAS.read().unwrap_or_else(PoisonError::into_inner);
    schemas.get(&id).cloned()
}

/// Marks a type as in-flight so a default that needs the type's own schema
/// fails instead of recursing forever.
struct CompileGuard(TypeId);

impl CompileGuard {
    fn enter(id: TypeId, type_name: &str) -> Result<Self, SchemaError> {
        COMPILING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&id) {
                return Err(SchemaError::CyclicDefault { type_name: type_name.to_string() });
            }
            stack.push(id);
            Ok(CompileGuard(id))
        })
    }
}

impl Drop for CompileGuard {
    fn drop(&mut self) {
        COMPILING.with(|stack| stack.borrow_mut().retain(|id| *id != self.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawField, TypeDescription, TypeDescriptor};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Cached {
        id: i64,
    }

    impl JsonCodable for Cached {
        fn describe() -> TypeDescription {
            TypeDescription::new("Cached").field(RawField::new("id", TypeDescriptor::Integer))
        }
    }

    #[test]
    fn compiled_once_and_shared() {
        let a = schema_for::<Cached>().unwrap();
        let b = schema_for::<Cached>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_first_use_publishes_one_schema() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Raced {
            id: i64,
        }
        impl JsonCodable for Raced {
            fn describe() -> TypeDescription {
                TypeDescription::new("Raced").field(RawField::new("id", TypeDescriptor::Integer))
            }
        }

        let handles: Vec<_> = (0..8).map(|_| std::thread::spawn(schema_for::<Raced>)).collect();
        let schemas: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
        let published = schema_for::<Raced>().unwrap();
        assert!(schemas.iter().all(|s| Arc::ptr_eq(s, &published)));
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Ping {
        pong: Option<Box<Pong>>,
    }
    #[derive(Debug, Serialize, Deserialize)]
    struct Pong {
        ping: Option<Box<Ping>>,
    }

    impl JsonCodable for Ping {
        fn describe() -> TypeDescription {
            TypeDescription::new("Ping").field(
                RawField::new("pong", TypeDescriptor::object::<Pong>())
                    .optional()
                    .default_value(json!({})),
            )
        }
    }
    impl JsonCodable for Pong {
        fn describe() -> TypeDescription {
            TypeDescription::new("Pong").field(
                RawField::new("ping", TypeDescriptor::object::<Ping>())
                    .optional()
                    .default_value(json!({})),
            )
        }
    }

    #[test]
    fn mutually_dependent_defaults_fail_instead_of_recursing() {
        assert!(matches!(schema_for::<Ping>(), Err(SchemaError::CyclicDefault { .. })));
    }
}
