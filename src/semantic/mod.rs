//! Symbols, binding and constant evaluation over parsed trees.

mod compilation;
mod constant;
mod model;
pub mod prelude;
mod symbols;

pub use compilation::Compilation;
pub use constant::ConstantValue;
pub use model::SemanticModel;
pub use symbols::{
    Accessibility, DeclRef, FieldId, FieldSymbol, MethodId, MethodKind, MethodSymbol, ParameterSymbol,
    RefKind, TypeId, TypeKind, TypeRef, TypeSymbol,
};
