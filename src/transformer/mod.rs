//! Method-call transformation.
//!
//! Method calls and scalar property accesses in a query are looked up by
//! [`MethodSignature`] and rewritten into IR expressions.

pub mod convert;
pub mod datetime;
pub mod equality;
pub mod fulltext;
pub mod like;
pub mod registry;
pub mod signature;
pub mod string;

pub use like::escape_like_pattern;
pub use registry::{MethodCallTransformer, MethodCallTransformerRegistry};
pub use signature::MethodSignature;
