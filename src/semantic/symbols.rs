//! Declared symbols of a compilation.

use std::fmt;

use crate::syntax::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub(crate) u32);

/// Where a symbol was declared: tree index within the compilation plus node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    pub tree: usize,
    pub node: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Accessibility {
    Private,
    Protected,
    Internal,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Enum,
}

/// The static type of a declaration or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Unresolved or erroneous; converts to anything.
    Error,
    Void,
    Bool,
    Char,
    Int,
    Long,
    Double,
    String,
    Object,
    /// Type of the `null` literal.
    Null,
    Named(TypeId),
    Array(Box<TypeRef>),
    Nullable(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(&self) -> Option<TypeId> {
        match self {
            TypeRef::Named(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Error => write!(f, "?"),
            TypeRef::Void => write!(f, "void"),
            TypeRef::Bool => write!(f, "bool"),
            TypeRef::Char => write!(f, "char"),
            TypeRef::Int => write!(f, "int"),
            TypeRef::Long => write!(f, "long"),
            TypeRef::Double => write!(f, "double"),
            TypeRef::String => write!(f, "string"),
            TypeRef::Object => write!(f, "object"),
            TypeRef::Null => write!(f, "null"),
            TypeRef::Named(id) => write!(f, "type#{}", id.0),
            TypeRef::Array(element) => write!(f, "{element}[]"),
            TypeRef::Nullable(inner) => write!(f, "{inner}?"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeSymbol {
    pub name: String,
    /// Dotted namespace, empty for the global namespace.
    pub namespace: String,
    pub containing_type: Option<TypeId>,
    pub kind: TypeKind,
    pub accessibility: Accessibility,
    pub is_static: bool,
    /// All declarations; more than one for partial types.
    pub declarations: Vec<DeclRef>,
    pub methods: Vec<MethodId>,
    pub constructors: Vec<MethodId>,
    pub fields: Vec<FieldId>,
    pub nested: Vec<TypeId>,
}

impl TypeSymbol {
    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Ordinary,
    Constructor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    None,
    Ref,
    Out,
    In,
}

#[derive(Debug, Clone)]
pub struct ParameterSymbol {
    pub name: String,
    pub ty: TypeRef,
    pub ordinal: usize,
    pub ref_kind: RefKind,
    pub is_params: bool,
    /// Default value expression, when the parameter is optional.
    pub default: Option<NodeId>,
    pub declaration: Option<DeclRef>,
}

impl ParameterSymbol {
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub name: String,
    pub kind: MethodKind,
    pub containing_type: TypeId,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub return_type: TypeRef,
    pub parameters: Vec<ParameterSymbol>,
    /// `None` for the implicit parameterless constructor.
    pub declaration: Option<DeclRef>,
}

#[derive(Debug, Clone)]
pub struct FieldSymbol {
    pub name: String,
    pub containing_type: TypeId,
    pub ty: TypeRef,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_const: bool,
    /// Declarator or enum member node.
    pub declaration: DeclRef,
    pub initializer: Option<NodeId>,
    pub is_enum_member: bool,
    /// For enum members, the member declared just before this one.
    pub previous_enum_member: Option<FieldId>,
}
