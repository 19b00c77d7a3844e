//! Registry of method-call transformers keyed by signature.

use std::collections::HashMap;
use std::sync::Arc;

use super::signature::MethodSignature;
use crate::error::{QuillError, QuillResult};
use crate::ir::{SqlExpr, SqlMethodCall};

/// Rewrites a method call (or scalar property access) into an IR expression.
pub trait MethodCallTransformer: Send + Sync {
    fn transform(&self, call: &SqlMethodCall) -> QuillResult<SqlExpr>;
}

impl<F> MethodCallTransformer for F
where
    F: Fn(&SqlMethodCall) -> QuillResult<SqlExpr> + Send + Sync,
{
    fn transform(&self, call: &SqlMethodCall) -> QuillResult<SqlExpr> {
        self(call)
    }
}

/// Maps method signatures to transformers.
///
/// Built once, then shared read-only between compiles. Registering a
/// signature twice replaces the earlier transformer.
#[derive(Clone, Default)]
pub struct MethodCallTransformerRegistry {
    transformers: HashMap<MethodSignature, Arc<dyn MethodCallTransformer>>,
}

impl MethodCallTransformerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in transformer registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        super::string::register(&mut registry);
        super::like::register(&mut registry);
        super::datetime::register(&mut registry);
        super::convert::register(&mut registry);
        super::fulltext::register(&mut registry);
        super::equality::register(&mut registry);
        registry
    }

    pub fn register(&mut self, signature: MethodSignature, transformer: impl MethodCallTransformer + 'static) {
        self.register_arc(signature, Arc::new(transformer));
    }

    /// Registers one transformer under several signatures.
    pub fn register_all(
        &mut self,
        signatures: impl IntoIterator<Item = MethodSignature>,
        transformer: impl MethodCallTransformer + 'static,
    ) {
        let transformer: Arc<dyn MethodCallTransformer> = Arc::new(transformer);
        for signature in signatures {
            self.register_arc(signature, transformer.clone());
        }
    }

    fn register_arc(&mut self, signature: MethodSignature, transformer: Arc<dyn MethodCallTransformer>) {
        if self.transformers.contains_key(&signature) {
            tracing::debug!(%signature, "overriding registered method-call transformer");
        }
        self.transformers.insert(signature, transformer);
    }

    pub fn get(&self, signature: &MethodSignature) -> Option<&dyn MethodCallTransformer> {
        self.transformers.get(signature).map(|t| t.as_ref())
    }

    pub fn contains(&self, signature: &MethodSignature) -> bool {
        self.transformers.contains_key(signature)
    }

    /// Registered signatures in sorted order.
    pub fn signatures(&self) -> Vec<&MethodSignature> {
        let mut signatures: Vec<_> = self.transformers.keys().collect();
        signatures.sort();
        signatures
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Looks up the call's signature and runs its transformer.
    pub fn transform(&self, call: &SqlMethodCall) -> QuillResult<SqlExpr> {
        let transformer = self
            .get(&call.signature)
            .ok_or_else(|| QuillError::UnsupportedMethod {
                method: call.signature.to_string(),
                call: call.source_text.clone(),
            })?;
        transformer.transform(call)
    }
}

impl std::fmt::Debug for MethodCallTransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodCallTransformerRegistry")
            .field("signatures", &self.signatures())
            .finish()
    }
}
