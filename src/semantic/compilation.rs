//! A set of syntax trees and the symbols they declare.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::syntax::{NodeId, NodeKind, SyntaxError, SyntaxTree, TokenKind};

use super::model::SemanticModel;
use super::prelude::REGEX_PRELUDE;
use super::symbols::*;

/// Immutable snapshot of a program.
#[derive(Debug)]
pub struct Compilation {
    trees: Vec<Arc<SyntaxTree>>,
    types: Vec<TypeSymbol>,
    methods: Vec<MethodSymbol>,
    fields: Vec<FieldSymbol>,
    by_metadata_name: HashMap<String, TypeId>,
    /// Top-level types keyed by `(namespace, name)`.
    by_namespace: HashMap<(String, String), TypeId>,
    namespaces: HashSet<String>,
    type_decls: HashMap<(usize, NodeId), TypeId>,
    method_decls: HashMap<(usize, NodeId), MethodId>,
    type_lookups: AtomicUsize,
}

/// Dotted name of the namespace enclosing `node`, empty for the global namespace.
pub(crate) fn namespace_of(tree: &SyntaxTree, node: NodeId) -> String {
    let mut parts: Vec<String> = tree
        .ancestors(node)
        .filter(|&n| tree.kind(n) == NodeKind::NamespaceDeclaration)
        .filter_map(|n| tree.child_node_of_kind(n, NodeKind::QualifiedName))
        .map(|name| qualified_name_text(tree, name))
        .collect();
    parts.reverse();
    parts.join(".")
}

/// `A.B.C` from a `QualifiedName` node, trivia dropped.
pub(crate) fn qualified_name_text(tree: &SyntaxTree, name: NodeId) -> String {
    qualified_name_segments(tree, name).join(".")
}

pub(crate) fn qualified_name_segments(tree: &SyntaxTree, name: NodeId) -> Vec<&str> {
    tree.child_tokens(name)
        .filter(|&t| tree.token_kind(t) == TokenKind::Identifier)
        .map(|t| tree.identifier_text(t))
        .collect()
}

fn join(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

fn accessibility(tree: &SyntaxTree, decl: NodeId, default: Accessibility) -> Accessibility {
    if tree.has_modifier(decl, TokenKind::Public) {
        Accessibility::Public
    } else if tree.has_modifier(decl, TokenKind::Protected) {
        Accessibility::Protected
    } else if tree.has_modifier(decl, TokenKind::Internal) {
        Accessibility::Internal
    } else if tree.has_modifier(decl, TokenKind::Private) {
        Accessibility::Private
    } else {
        default
    }
}

/// Child nodes other than attribute lists.
fn content_nodes(tree: &SyntaxTree, node: NodeId) -> Vec<NodeId> {
    tree.child_nodes(node)
        .filter(|&n| tree.kind(n) != NodeKind::AttributeList)
        .collect()
}

pub(crate) fn predefined_type(kind: TokenKind) -> TypeRef {
    match kind {
        TokenKind::Bool => TypeRef::Bool,
        TokenKind::Char => TypeRef::Char,
        TokenKind::Double => TypeRef::Double,
        TokenKind::Int => TypeRef::Int,
        TokenKind::Long => TypeRef::Long,
        TokenKind::Object => TypeRef::Object,
        TokenKind::String => TypeRef::String,
        TokenKind::Void => TypeRef::Void,
        _ => TypeRef::Error,
    }
}

impl Compilation {
    pub fn new(trees: impl IntoIterator<Item = SyntaxTree>) -> Arc<Self> {
        let mut compilation = Self {
            trees: trees.into_iter().map(Arc::new).collect(),
            types: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            by_metadata_name: HashMap::new(),
            by_namespace: HashMap::new(),
            namespaces: HashSet::new(),
            type_decls: HashMap::new(),
            method_decls: HashMap::new(),
            type_lookups: AtomicUsize::new(0),
        };
        for index in 0..compilation.trees.len() {
            let tree = Arc::clone(&compilation.trees[index]);
            compilation.declare_container(index, &tree, tree.root(), "");
        }
        compilation.declare_members();
        debug!(
            trees = compilation.trees.len(),
            types = compilation.types.len(),
            methods = compilation.methods.len(),
            "compilation built"
        );
        Arc::new(compilation)
    }

    /// Like [`Compilation::new`], with the bundled regex declarations appended
    /// after the given trees.
    pub fn with_prelude(trees: impl IntoIterator<Item = SyntaxTree>) -> Result<Arc<Self>, SyntaxError> {
        let prelude = SyntaxTree::parse_with_path(Some("<prelude>".to_string()), REGEX_PRELUDE)?;
        Ok(Self::new(trees.into_iter().chain(std::iter::once(prelude))))
    }

    pub fn trees(&self) -> &[Arc<SyntaxTree>] {
        &self.trees
    }

    pub fn tree(&self, index: usize) -> &Arc<SyntaxTree> {
        &self.trees[index]
    }

    /// A fresh semantic model for the tree at `index`, with a new identity.
    pub fn semantic_model(self: &Arc<Self>, index: usize) -> Arc<SemanticModel> {
        debug_assert!(index < self.trees.len(), "tree index {index} out of range");
        Arc::new(SemanticModel::new(Arc::clone(self), index))
    }

    pub fn type_symbol(&self, id: TypeId) -> &TypeSymbol {
        &self.types[id.0 as usize]
    }

    pub fn method(&self, id: MethodId) -> &MethodSymbol {
        &self.methods[id.0 as usize]
    }

    pub fn field(&self, id: FieldId) -> &FieldSymbol {
        &self.fields[id.0 as usize]
    }

    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len() as u32).map(TypeId)
    }

    /// Look a type up by `Namespace.Name` (nested types use `Outer+Inner`).
    pub fn type_by_metadata_name(&self, name: &str) -> Option<TypeId> {
        self.type_lookups.fetch_add(1, Ordering::Relaxed);
        self.by_metadata_name.get(name).copied()
    }

    /// Number of [`Compilation::type_by_metadata_name`] calls so far.
    pub fn type_lookups(&self) -> usize {
        self.type_lookups.load(Ordering::Relaxed)
    }

    pub fn metadata_name(&self, id: TypeId) -> String {
        let ty = self.type_symbol(id);
        match ty.containing_type {
            Some(outer) => format!("{}+{}", self.metadata_name(outer), ty.name),
            None => join(&ty.namespace, &ty.name),
        }
    }

    pub fn type_for_declaration(&self, tree: usize, node: NodeId) -> Option<TypeId> {
        self.type_decls.get(&(tree, node)).copied()
    }

    pub fn method_for_declaration(&self, tree: usize, node: NodeId) -> Option<MethodId> {
        self.method_decls.get(&(tree, node)).copied()
    }

    pub fn is_namespace(&self, name: &str) -> bool {
        self.namespaces.contains(name)
    }

    pub fn type_in_namespace(&self, namespace: &str, name: &str) -> Option<TypeId> {
        self.by_namespace
            .get(&(namespace.to_string(), name.to_string()))
            .copied()
    }

    pub fn nested_type(&self, outer: TypeId, name: &str) -> Option<TypeId> {
        self.type_symbol(outer)
            .nested
            .iter()
            .copied()
            .find(|&t| self.type_symbol(t).name == name)
    }

    /// Fields (enum members included) of `ty` named `name`.
    pub fn field_named(&self, ty: TypeId, name: &str) -> Option<FieldId> {
        self.type_symbol(ty)
            .fields
            .iter()
            .copied()
            .find(|&f| self.field(f).name == name)
    }

    pub fn methods_named(&self, ty: TypeId, name: &str) -> Vec<MethodId> {
        self.type_symbol(ty)
            .methods
            .iter()
            .copied()
            .filter(|&m| self.method(m).name == name)
            .collect()
    }

    // --- Name resolution ---

    fn resolve_nested(&self, ty: TypeId, rest: &[&str]) -> Option<TypeId> {
        rest.iter()
            .try_fold(ty, |outer, name| self.nested_type(outer, name))
    }

    /// `namespace.rest[0]...` read as a namespace path ending in a type.
    fn resolve_qualified_in(&self, namespace: &str, rest: &[&str]) -> Option<TypeId> {
        if !self.is_namespace(namespace) {
            return None;
        }
        (0..rest.len()).find_map(|k| {
            let ns = rest[..k]
                .iter()
                .fold(namespace.to_string(), |acc, part| join(&acc, part));
            self.type_in_namespace(&ns, rest[k])
                .and_then(|t| self.resolve_nested(t, &rest[k + 1..]))
        })
    }

    fn lookup_in_namespace(&self, namespace: &str, segments: &[&str]) -> Option<TypeId> {
        let (first, rest) = segments.split_first()?;
        self.type_in_namespace(namespace, first)
            .and_then(|t| self.resolve_nested(t, rest))
            .or_else(|| self.resolve_qualified_in(&join(namespace, first), rest))
    }

    /// Resolve a possibly dotted type name as seen from `scope`.
    pub(crate) fn resolve_type_name(
        &self,
        tree_index: usize,
        scope: NodeId,
        segments: &[&str],
    ) -> Option<TypeId> {
        let tree = &self.trees[tree_index];
        let (first, rest) = segments.split_first()?;

        for ancestor in tree.ancestors(scope) {
            if tree.kind(ancestor).is_type_declaration()
                && let Some(ty) = self.type_for_declaration(tree_index, ancestor)
            {
                if let Some(nested) = self.nested_type(ty, first) {
                    return self.resolve_nested(nested, rest);
                }
                if self.type_symbol(ty).name == *first {
                    return self.resolve_nested(ty, rest);
                }
            }
        }

        for level in tree.ancestors(scope) {
            let kind = tree.kind(level);
            if kind != NodeKind::NamespaceDeclaration && kind != NodeKind::CompilationUnit {
                continue;
            }
            let namespace = if kind == NodeKind::CompilationUnit {
                String::new()
            } else {
                namespace_of(tree, level)
            };
            if let Some(ty) = self.lookup_in_namespace(&namespace, segments) {
                return Some(ty);
            }
            for using in tree
                .child_nodes(level)
                .filter(|&n| tree.kind(n) == NodeKind::UsingDirective)
            {
                let Some(target) = tree.child_node_of_kind(using, NodeKind::QualifiedName) else {
                    continue;
                };
                let target = qualified_name_text(tree, target);
                if let Some(ty) = self
                    .type_in_namespace(&target, first)
                    .and_then(|t| self.resolve_nested(t, rest))
                {
                    return Some(ty);
                }
            }
            // `namespace A.B` also puts `A` in scope.
            if kind == NodeKind::NamespaceDeclaration {
                let parent_namespace = tree
                    .parent(level)
                    .map(|p| namespace_of(tree, p))
                    .unwrap_or_default();
                let mut prefix = namespace.as_str();
                while let Some((head, _)) = prefix.rsplit_once('.') {
                    if head.len() <= parent_namespace.len() {
                        break;
                    }
                    if let Some(ty) = self.lookup_in_namespace(head, segments) {
                        return Some(ty);
                    }
                    prefix = head;
                }
            }
        }
        None
    }

    /// Resolve a type syntax node as seen from `scope`.
    pub(crate) fn resolve_type_syntax(&self, tree_index: usize, scope: NodeId, node: NodeId) -> TypeRef {
        let tree = &self.trees[tree_index];
        match tree.kind(node) {
            NodeKind::PredefinedType => tree
                .child_tokens(node)
                .next()
                .map_or(TypeRef::Error, |t| predefined_type(tree.token_kind(t))),
            NodeKind::QualifiedName => {
                let segments = qualified_name_segments(tree, node);
                self.resolve_type_name(tree_index, scope, &segments)
                    .map_or(TypeRef::Error, TypeRef::Named)
            }
            NodeKind::ArrayType => tree.child_nodes(node).next().map_or(TypeRef::Error, |inner| {
                TypeRef::Array(Box::new(self.resolve_type_syntax(tree_index, scope, inner)))
            }),
            NodeKind::NullableType => tree.child_nodes(node).next().map_or(TypeRef::Error, |inner| {
                TypeRef::Nullable(Box::new(self.resolve_type_syntax(tree_index, scope, inner)))
            }),
            _ => TypeRef::Error,
        }
    }

    // --- Declaration ---

    fn declare_container(&mut self, index: usize, tree: &SyntaxTree, node: NodeId, namespace: &str) {
        for child in tree.child_nodes(node).collect::<Vec<_>>() {
            match tree.kind(child) {
                NodeKind::NamespaceDeclaration => {
                    let Some(name) = tree.child_node_of_kind(child, NodeKind::QualifiedName) else {
                        continue;
                    };
                    let full = join(namespace, &qualified_name_text(tree, name));
                    let mut prefix = full.as_str();
                    self.namespaces.insert(prefix.to_string());
                    while let Some((head, _)) = prefix.rsplit_once('.') {
                        self.namespaces.insert(head.to_string());
                        prefix = head;
                    }
                    self.declare_container(index, tree, child, &full);
                }
                kind if kind.is_type_declaration() => {
                    self.declare_type(index, tree, child, namespace, None);
                }
                _ => {}
            }
        }
    }

    fn declare_type(
        &mut self,
        index: usize,
        tree: &SyntaxTree,
        node: NodeId,
        namespace: &str,
        containing: Option<TypeId>,
    ) {
        let Some(name_token) = tree.declared_name(node) else {
            return;
        };
        let name = tree.identifier_text(name_token).to_string();
        let metadata = match containing {
            Some(outer) => format!("{}+{}", self.metadata_name(outer), name),
            None => join(namespace, &name),
        };
        let id = match self.by_metadata_name.get(&metadata) {
            Some(&existing) => existing,
            None => {
                let id = TypeId(self.types.len() as u32);
                let kind = match tree.kind(node) {
                    NodeKind::EnumDeclaration => TypeKind::Enum,
                    NodeKind::StructDeclaration => TypeKind::Struct,
                    _ => TypeKind::Class,
                };
                let default_access = if containing.is_some() {
                    Accessibility::Private
                } else {
                    Accessibility::Internal
                };
                self.types.push(TypeSymbol {
                    name: name.clone(),
                    namespace: namespace.to_string(),
                    containing_type: containing,
                    kind,
                    accessibility: accessibility(tree, node, default_access),
                    is_static: tree.has_modifier(node, TokenKind::Static),
                    declarations: Vec::new(),
                    methods: Vec::new(),
                    constructors: Vec::new(),
                    fields: Vec::new(),
                    nested: Vec::new(),
                });
                self.by_metadata_name.insert(metadata, id);
                match containing {
                    Some(outer) => self.types[outer.0 as usize].nested.push(id),
                    None => {
                        self.by_namespace.insert((namespace.to_string(), name), id);
                    }
                }
                id
            }
        };
        self.types[id.0 as usize]
            .declarations
            .push(DeclRef { tree: index, node });
        self.type_decls.insert((index, node), id);

        for child in tree.child_nodes(node).collect::<Vec<_>>() {
            if tree.kind(child).is_type_declaration() {
                self.declare_type(index, tree, child, namespace, Some(id));
            }
        }
    }

    fn declare_members(&mut self) {
        let mut decls: Vec<((usize, NodeId), TypeId)> =
            self.type_decls.iter().map(|(k, v)| (*k, *v)).collect();
        decls.sort();
        for ((index, node), ty) in decls {
            let tree = Arc::clone(&self.trees[index]);
            if self.type_symbol(ty).is_enum() {
                self.declare_enum_members(index, &tree, node, ty);
            } else {
                self.declare_type_members(index, &tree, node, ty);
            }
        }

        // Classes and structs without constructors get a public parameterless one.
        for ty in self.types().collect::<Vec<_>>() {
            let symbol = self.type_symbol(ty);
            if symbol.is_enum() || symbol.is_static || !symbol.constructors.is_empty() {
                continue;
            }
            let name = symbol.name.clone();
            let id = MethodId(self.methods.len() as u32);
            self.methods.push(MethodSymbol {
                name,
                kind: MethodKind::Constructor,
                containing_type: ty,
                accessibility: Accessibility::Public,
                is_static: false,
                return_type: TypeRef::Void,
                parameters: Vec::new(),
                declaration: None,
            });
            self.types[ty.0 as usize].constructors.push(id);
        }
    }

    fn declare_enum_members(&mut self, index: usize, tree: &SyntaxTree, node: NodeId, ty: TypeId) {
        let mut previous = None;
        for member in tree
            .child_nodes(node)
            .filter(|&n| tree.kind(n) == NodeKind::EnumMemberDeclaration)
            .collect::<Vec<_>>()
        {
            let Some(name) = tree.declared_name(member) else {
                continue;
            };
            let id = FieldId(self.fields.len() as u32);
            self.fields.push(FieldSymbol {
                name: tree.identifier_text(name).to_string(),
                containing_type: ty,
                ty: TypeRef::Named(ty),
                accessibility: Accessibility::Public,
                is_static: true,
                is_const: true,
                declaration: DeclRef { tree: index, node: member },
                initializer: content_nodes(tree, member).first().copied(),
                is_enum_member: true,
                previous_enum_member: previous,
            });
            self.types[ty.0 as usize].fields.push(id);
            previous = Some(id);
        }
    }

    fn declare_type_members(&mut self, index: usize, tree: &SyntaxTree, node: NodeId, ty: TypeId) {
        for member in tree.child_nodes(node).collect::<Vec<_>>() {
            match tree.kind(member) {
                NodeKind::FieldDeclaration => self.declare_field(index, tree, member, ty),
                NodeKind::MethodDeclaration | NodeKind::ConstructorDeclaration => {
                    self.declare_method(index, tree, member, ty)
                }
                _ => {}
            }
        }
    }

    fn declare_field(&mut self, index: usize, tree: &SyntaxTree, member: NodeId, ty: TypeId) {
        let Some(&type_node) = content_nodes(tree, member).first() else {
            return;
        };
        let field_type = self.resolve_type_syntax(index, member, type_node);
        let is_const = tree.has_modifier(member, TokenKind::Const);
        let is_static = is_const || tree.has_modifier(member, TokenKind::Static);
        let access = accessibility(tree, member, Accessibility::Private);
        for declarator in tree
            .child_nodes(member)
            .filter(|&n| tree.kind(n) == NodeKind::VariableDeclarator)
            .collect::<Vec<_>>()
        {
            let Some(name) = tree.declared_name(declarator) else {
                continue;
            };
            let id = FieldId(self.fields.len() as u32);
            self.fields.push(FieldSymbol {
                name: tree.identifier_text(name).to_string(),
                containing_type: ty,
                ty: field_type.clone(),
                accessibility: access,
                is_static,
                is_const,
                declaration: DeclRef { tree: index, node: declarator },
                initializer: tree.child_nodes(declarator).next(),
                is_enum_member: false,
                previous_enum_member: None,
            });
            self.types[ty.0 as usize].fields.push(id);
        }
    }

    fn declare_method(&mut self, index: usize, tree: &SyntaxTree, member: NodeId, ty: TypeId) {
        let Some(name) = tree.declared_name(member) else {
            return;
        };
        let is_constructor = tree.kind(member) == NodeKind::ConstructorDeclaration;
        let return_type = if is_constructor {
            TypeRef::Void
        } else {
            content_nodes(tree, member)
                .first()
                .map_or(TypeRef::Error, |&t| self.resolve_type_syntax(index, member, t))
        };

        let mut parameters = Vec::new();
        if let Some(list) = tree.child_node_of_kind(member, NodeKind::ParameterList) {
            for (ordinal, parameter) in tree
                .child_nodes(list)
                .filter(|&n| tree.kind(n) == NodeKind::Parameter)
                .enumerate()
            {
                parameters.push(self.parameter_symbol(index, tree, member, parameter, ordinal));
            }
        }

        let id = MethodId(self.methods.len() as u32);
        self.methods.push(MethodSymbol {
            name: tree.identifier_text(name).to_string(),
            kind: if is_constructor {
                MethodKind::Constructor
            } else {
                MethodKind::Ordinary
            },
            containing_type: ty,
            accessibility: accessibility(tree, member, Accessibility::Private),
            is_static: tree.has_modifier(member, TokenKind::Static),
            return_type,
            parameters,
            declaration: Some(DeclRef { tree: index, node: member }),
        });
        let symbol = &mut self.types[ty.0 as usize];
        if is_constructor {
            symbol.constructors.push(id);
        } else {
            symbol.methods.push(id);
        }
        self.method_decls.insert((index, member), id);
    }

    fn parameter_symbol(
        &self,
        index: usize,
        tree: &SyntaxTree,
        method: NodeId,
        parameter: NodeId,
        ordinal: usize,
    ) -> ParameterSymbol {
        let content = content_nodes(tree, parameter);
        let ty = content
            .first()
            .map_or(TypeRef::Error, |&t| self.resolve_type_syntax(index, method, t));
        let ref_kind = if tree.has_modifier(parameter, TokenKind::Ref) {
            RefKind::Ref
        } else if tree.has_modifier(parameter, TokenKind::Out) {
            RefKind::Out
        } else if tree.has_modifier(parameter, TokenKind::In) {
            RefKind::In
        } else {
            RefKind::None
        };
        ParameterSymbol {
            name: tree
                .declared_name(parameter)
                .map(|t| tree.identifier_text(t).to_string())
                .unwrap_or_default(),
            ty,
            ordinal,
            ref_kind,
            is_params: tree.has_modifier(parameter, TokenKind::Params),
            default: content.get(1).copied(),
            declaration: Some(DeclRef { tree: index, node: parameter }),
        }
    }
}
