//! Per-tree semantic queries: name binding, overload resolution, expression
//! types and constant values.

use std::cmp::Reverse;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::syntax::{NodeId, NodeKind, SyntaxTree, TokenId, TokenKind};

use super::compilation::{Compilation, namespace_of, predefined_type};
use super::constant::{ConstantEvaluator, ConstantValue, integer_constant};
use super::symbols::*;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Semantic view of one syntax tree within a [`Compilation`].
///
/// Every model gets a process-unique [`SemanticModel::id`], so two models over
/// the same tree are distinct analysis contexts.
#[derive(Debug)]
pub struct SemanticModel {
    id: u64,
    compilation: Arc<Compilation>,
    tree_index: usize,
}

impl SemanticModel {
    pub(crate) fn new(compilation: Arc<Compilation>, tree_index: usize) -> Self {
        Self {
            id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
            compilation,
            tree_index,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn compilation(&self) -> &Arc<Compilation> {
        &self.compilation
    }

    pub fn tree_index(&self) -> usize {
        self.tree_index
    }

    pub fn tree(&self) -> &SyntaxTree {
        self.compilation.tree(self.tree_index)
    }

    fn binder(&self) -> Binder<'_> {
        Binder::new(&self.compilation, self.tree_index)
    }

    /// The method or constructor an invocation or object creation binds to.
    pub fn symbol_info(&self, call: NodeId) -> Option<MethodId> {
        self.binder().bind_call(call).map(|bound| bound.method)
    }

    /// The parameter an `Argument` node binds to in its enclosing call.
    pub fn parameter_for_argument(&self, argument: NodeId) -> Option<&ParameterSymbol> {
        let tree = self.tree();
        let list = tree.parent(argument)?;
        let call = tree.parent(list)?;
        let bound = self.binder().bind_call(call)?;
        let position = tree.arguments(list).iter().position(|&a| a == argument)?;
        let parameter = *bound.argument_to_parameter.get(position)?;
        self.compilation.method(bound.method).parameters.get(parameter)
    }

    /// Static type of an expression; [`TypeRef::Error`] when it cannot be determined.
    pub fn type_of(&self, expr: NodeId) -> TypeRef {
        self.binder().type_of(expr)
    }

    /// Compile-time value of an expression, if it has one.
    pub fn constant_value(&self, expr: NodeId) -> Option<ConstantValue> {
        ConstantEvaluator::new(&self.compilation).evaluate(self.tree_index, expr)
    }
}

/// What a name or member access refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExprSymbol {
    Local { declarator: NodeId, type_node: NodeId },
    Parameter { method: MethodId, ordinal: usize },
    Field(FieldId),
    Type(TypeId),
    Namespace(String),
    Methods(Vec<MethodId>),
}

pub(crate) struct BoundCall {
    pub method: MethodId,
    /// Parameter index for each argument, in argument order.
    pub argument_to_parameter: Vec<usize>,
}

struct ArgumentInfo<'t> {
    name: Option<&'t str>,
    ty: TypeRef,
    is_zero: bool,
}

pub(crate) struct Binder<'a> {
    compilation: &'a Compilation,
    tree_index: usize,
    tree: &'a SyntaxTree,
}

impl<'a> Binder<'a> {
    pub(crate) fn new(compilation: &'a Compilation, tree_index: usize) -> Self {
        Self {
            compilation,
            tree_index,
            tree: compilation.tree(tree_index),
        }
    }

    // --- Names ---

    fn identifier(&self, node: NodeId) -> Option<TokenId> {
        self.tree.child_token_of_kind(node, TokenKind::Identifier)
    }

    pub(crate) fn bind_symbol(&self, expr: NodeId) -> Option<ExprSymbol> {
        match self.tree.kind(expr) {
            NodeKind::IdentifierName => self.bind_name(expr),
            NodeKind::MemberAccessExpression => self.bind_member_access(expr),
            NodeKind::ParenthesizedExpression => {
                let inner = self.tree.child_nodes(expr).next()?;
                self.bind_symbol(inner)
            }
            _ => None,
        }
    }

    fn bind_name(&self, node: NodeId) -> Option<ExprSymbol> {
        let token = self.identifier(node)?;
        let name = self.tree.identifier_text(token);
        let reference = self.tree.token(token).span.start;

        for scope in self.tree.ancestors(node) {
            match self.tree.kind(scope) {
                NodeKind::Block => {
                    if let Some(local) = self.find_local(scope, name, reference) {
                        return Some(local);
                    }
                }
                NodeKind::MethodDeclaration | NodeKind::ConstructorDeclaration => {
                    let Some(method) = self.compilation.method_for_declaration(self.tree_index, scope)
                    else {
                        continue;
                    };
                    if let Some(ordinal) = self
                        .compilation
                        .method(method)
                        .parameters
                        .iter()
                        .position(|p| p.name == name)
                    {
                        return Some(ExprSymbol::Parameter { method, ordinal });
                    }
                }
                kind if kind.is_type_declaration() => {
                    if let Some(ty) = self.compilation.type_for_declaration(self.tree_index, scope)
                        && let Some(member) = self.member_of_type(ty, name, None)
                    {
                        return Some(member);
                    }
                }
                _ => {}
            }
        }

        if let Some(ty) = self
            .compilation
            .resolve_type_name(self.tree_index, node, &[name])
        {
            return Some(ExprSymbol::Type(ty));
        }

        let mut namespace = namespace_of(self.tree, node);
        loop {
            let candidate = if namespace.is_empty() {
                name.to_string()
            } else {
                format!("{namespace}.{name}")
            };
            if self.compilation.is_namespace(&candidate) {
                return Some(ExprSymbol::Namespace(candidate));
            }
            match namespace.rsplit_once('.') {
                Some((head, _)) => namespace = head.to_string(),
                None if !namespace.is_empty() => namespace.clear(),
                None => return None,
            }
        }
    }

    /// A local declared in `block` before `reference` whose declarator ends
    /// before it.
    fn find_local(&self, block: NodeId, name: &str, reference: usize) -> Option<ExprSymbol> {
        let tree = self.tree;
        tree.child_nodes(block)
            .filter(|&s| tree.kind(s) == NodeKind::LocalDeclarationStatement)
            .flat_map(|statement| {
                let type_node = tree.child_nodes(statement).find(|&n| tree.kind(n).is_type_syntax());
                tree.child_nodes(statement)
                    .filter(|&n| tree.kind(n) == NodeKind::VariableDeclarator)
                    .filter_map(move |declarator| Some((declarator, type_node?)))
            })
            .find(|&(declarator, _)| {
                tree.node_span(declarator).end <= reference
                    && tree
                        .declared_name(declarator)
                        .is_some_and(|t| tree.identifier_text(t) == name)
            })
            .map(|(declarator, type_node)| ExprSymbol::Local {
                declarator,
                type_node,
            })
    }

    /// Member `name` of `ty`. `receiver_is_type` filters methods by staticness
    /// when the access has an explicit receiver.
    fn member_of_type(&self, ty: TypeId, name: &str, receiver_is_type: Option<bool>) -> Option<ExprSymbol> {
        let c = self.compilation;
        if let Some(field) = c.field_named(ty, name) {
            return Some(ExprSymbol::Field(field));
        }
        let methods: Vec<MethodId> = c
            .methods_named(ty, name)
            .into_iter()
            .filter(|&m| receiver_is_type.is_none_or(|is_type| c.method(m).is_static == is_type))
            .collect();
        if !methods.is_empty() {
            return Some(ExprSymbol::Methods(methods));
        }
        c.nested_type(ty, name).map(ExprSymbol::Type)
    }

    fn bind_member_access(&self, node: NodeId) -> Option<ExprSymbol> {
        let mut children = self.tree.child_nodes(node);
        let left = children.next()?;
        let right = children.next()?;
        let name = self.tree.identifier_text(self.identifier(right)?);

        let left_symbol = self.bind_symbol(left);
        match left_symbol {
            Some(ExprSymbol::Namespace(namespace)) => {
                if let Some(ty) = self.compilation.type_in_namespace(&namespace, name) {
                    return Some(ExprSymbol::Type(ty));
                }
                let full = format!("{namespace}.{name}");
                self.compilation
                    .is_namespace(&full)
                    .then_some(ExprSymbol::Namespace(full))
            }
            Some(ExprSymbol::Type(ty)) => self.member_of_type(ty, name, Some(true)),
            Some(ExprSymbol::Methods(_)) => None,
            Some(symbol) => {
                let ty = self.type_of_symbol(&symbol).named()?;
                self.member_of_type(ty, name, Some(false))
            }
            None => {
                let ty = self.type_of(left).named()?;
                self.member_of_type(ty, name, Some(false))
            }
        }
    }

    // --- Types ---

    pub(crate) fn type_of_symbol(&self, symbol: &ExprSymbol) -> TypeRef {
        let c = self.compilation;
        match symbol {
            ExprSymbol::Local {
                declarator,
                type_node,
            } => {
                let declared = c.resolve_type_syntax(self.tree_index, *declarator, *type_node);
                let is_var = declared == TypeRef::Error
                    && self.tree.kind(*type_node) == NodeKind::QualifiedName
                    && self.tree.node_text(*type_node) == "var";
                if is_var {
                    self.tree
                        .child_nodes(*declarator)
                        .next()
                        .map_or(TypeRef::Error, |init| self.type_of(init))
                } else {
                    declared
                }
            }
            ExprSymbol::Parameter { method, ordinal } => c
                .method(*method)
                .parameters
                .get(*ordinal)
                .map_or(TypeRef::Error, |p| p.ty.clone()),
            ExprSymbol::Field(field) => c.field(*field).ty.clone(),
            ExprSymbol::Type(ty) => TypeRef::Named(*ty),
            ExprSymbol::Namespace(_) | ExprSymbol::Methods(_) => TypeRef::Error,
        }
    }

    fn literal_type(&self, token: TokenId) -> TypeRef {
        match self.tree.token_kind(token) {
            TokenKind::IntegerLiteral => {
                match integer_constant(self.tree.token_text(token)) {
                    Some(ConstantValue::Long(_)) => TypeRef::Long,
                    _ => TypeRef::Int,
                }
            }
            TokenKind::CharLiteral => TypeRef::Char,
            TokenKind::True | TokenKind::False => TypeRef::Bool,
            TokenKind::Null => TypeRef::Null,
            kind if kind.is_string_literal() => TypeRef::String,
            TokenKind::InterpolatedStringLiteral => TypeRef::String,
            _ => TypeRef::Error,
        }
    }

    pub(crate) fn type_of(&self, expr: NodeId) -> TypeRef {
        let tree = self.tree;
        let first_child = || tree.child_nodes(expr).next();
        match tree.kind(expr) {
            NodeKind::LiteralExpression => tree
                .child_tokens(expr)
                .next()
                .map_or(TypeRef::Error, |t| self.literal_type(t)),
            NodeKind::PredefinedType => tree
                .child_tokens(expr)
                .next()
                .map_or(TypeRef::Error, |t| predefined_type(tree.token_kind(t))),
            NodeKind::IdentifierName | NodeKind::MemberAccessExpression => self
                .bind_symbol(expr)
                .map_or(TypeRef::Error, |s| self.type_of_symbol(&s)),
            NodeKind::ParenthesizedExpression | NodeKind::AssignmentExpression => {
                first_child().map_or(TypeRef::Error, |e| self.type_of(e))
            }
            NodeKind::CastExpression => first_child().map_or(TypeRef::Error, |t| {
                self.compilation.resolve_type_syntax(self.tree_index, expr, t)
            }),
            NodeKind::ObjectCreationExpression => tree.call_target(expr).map_or(TypeRef::Error, |t| {
                self.compilation.resolve_type_syntax(self.tree_index, expr, t)
            }),
            NodeKind::InvocationExpression => self
                .bind_call(expr)
                .map_or(TypeRef::Error, |b| self.compilation.method(b.method).return_type.clone()),
            NodeKind::ElementAccessExpression => match first_child().map(|e| self.type_of(e)) {
                Some(TypeRef::Array(element)) => *element,
                Some(TypeRef::String) => TypeRef::Char,
                _ => TypeRef::Error,
            },
            NodeKind::ThisExpression => tree
                .ancestors(expr)
                .find_map(|n| self.compilation.type_for_declaration(self.tree_index, n))
                .map_or(TypeRef::Error, TypeRef::Named),
            NodeKind::PrefixUnaryExpression => {
                let op = tree.child_tokens(expr).next().map(|t| tree.token_kind(t));
                if op == Some(TokenKind::Exclamation) {
                    return TypeRef::Bool;
                }
                match first_child().map(|e| self.type_of(e)) {
                    Some(TypeRef::Char) => TypeRef::Int,
                    Some(ty) => ty,
                    None => TypeRef::Error,
                }
            }
            NodeKind::BinaryExpression => {
                let mut operands = tree.child_nodes(expr);
                let (Some(left), Some(right)) = (operands.next(), operands.next()) else {
                    return TypeRef::Error;
                };
                let Some(op) = tree.child_tokens(expr).next() else {
                    return TypeRef::Error;
                };
                binary_type(tree.token_kind(op), self.type_of(left), self.type_of(right))
            }
            _ => TypeRef::Error,
        }
    }

    // --- Calls ---

    pub(crate) fn bind_call(&self, call: NodeId) -> Option<BoundCall> {
        let tree = self.tree;
        let candidates = match tree.kind(call) {
            NodeKind::InvocationExpression => match self.bind_symbol(tree.call_target(call)?)? {
                ExprSymbol::Methods(methods) => methods,
                _ => return None,
            },
            NodeKind::ObjectCreationExpression => {
                let type_node = tree.call_target(call)?;
                let ty = self
                    .compilation
                    .resolve_type_syntax(self.tree_index, call, type_node)
                    .named()?;
                self.compilation.type_symbol(ty).constructors.clone()
            }
            _ => return None,
        };
        let list = tree.call_argument_list(call)?;
        let arguments: Vec<ArgumentInfo<'_>> = tree
            .arguments(list)
            .into_iter()
            .map(|argument| self.argument_info(argument))
            .collect();
        self.resolve_overload(&candidates, &arguments)
    }

    fn argument_info(&self, argument: NodeId) -> ArgumentInfo<'a> {
        let expr = self.tree.argument_expression(argument);
        let ty = expr.map_or(TypeRef::Error, |e| self.type_of(e));
        let is_zero = ty == TypeRef::Int
            && expr.is_some_and(|e| {
                ConstantEvaluator::new(self.compilation).evaluate(self.tree_index, e)
                    == Some(ConstantValue::Int(0))
            });
        ArgumentInfo {
            name: self.tree.argument_name(argument),
            ty,
            is_zero,
        }
    }

    /// Pick the best applicable candidate: more exact argument types first,
    /// then normal form over expanded `params` form, then fewer defaulted
    /// parameters, then declaration order.
    fn resolve_overload(&self, candidates: &[MethodId], arguments: &[ArgumentInfo<'_>]) -> Option<BoundCall> {
        let mut best: Option<((Reverse<usize>, bool, usize, usize), BoundCall)> = None;
        for (order, &method) in candidates.iter().enumerate() {
            let parameters = &self.compilation.method(method).parameters;
            for expanded in [false, true] {
                if expanded
                    && !parameters
                        .last()
                        .is_some_and(|p| p.is_params && matches!(p.ty, TypeRef::Array(_)))
                {
                    continue;
                }
                let Some(map) = map_arguments(parameters, arguments, expanded) else {
                    continue;
                };
                let Some(exact) = self.check_conversions(parameters, arguments, &map, expanded) else {
                    continue;
                };
                let mapped = |j: usize| map.contains(&j);
                let defaults = (0..parameters.len())
                    .filter(|&j| !mapped(j) && !(expanded && j + 1 == parameters.len()))
                    .count();
                let key = (Reverse(exact), expanded, defaults, order);
                if best.as_ref().is_none_or(|(k, _)| key < *k) {
                    best = Some((
                        key,
                        BoundCall {
                            method,
                            argument_to_parameter: map,
                        },
                    ));
                }
                // Expanded form is only considered when the normal form fails.
                break;
            }
        }
        best.map(|(_, bound)| bound)
    }

    /// Number of exact matches, or `None` if some argument does not convert.
    fn check_conversions(
        &self,
        parameters: &[ParameterSymbol],
        arguments: &[ArgumentInfo<'_>],
        map: &[usize],
        expanded: bool,
    ) -> Option<usize> {
        let mut exact = 0;
        for (argument, &j) in arguments.iter().zip(map) {
            let target = match (&parameters[j].ty, expanded && j + 1 == parameters.len()) {
                (TypeRef::Array(element), true) => element.as_ref(),
                (ty, _) => ty,
            };
            if !self.converts(&argument.ty, argument.is_zero, target) {
                return None;
            }
            if argument.ty == *target {
                exact += 1;
            }
        }
        Some(exact)
    }

    fn converts(&self, from: &TypeRef, is_zero: bool, to: &TypeRef) -> bool {
        if from == to {
            return true;
        }
        let is_reference_type = |ty: &TypeRef| match ty {
            TypeRef::String | TypeRef::Object | TypeRef::Array(_) | TypeRef::Nullable(_) => true,
            TypeRef::Named(id) => self.compilation.type_symbol(*id).kind == TypeKind::Class,
            _ => false,
        };
        match (from, to) {
            (TypeRef::Error, _) | (_, TypeRef::Error) => true,
            (TypeRef::Void, _) => false,
            (_, TypeRef::Object) => true,
            (TypeRef::Null, to) => is_reference_type(to),
            (TypeRef::Int, TypeRef::Long | TypeRef::Double) => true,
            (TypeRef::Long, TypeRef::Double) => true,
            (TypeRef::Char, TypeRef::Int | TypeRef::Long | TypeRef::Double) => true,
            (TypeRef::Int, TypeRef::Named(id)) => is_zero && self.compilation.type_symbol(*id).is_enum(),
            (from, TypeRef::Nullable(inner)) => self.converts(from, is_zero, inner),
            _ => false,
        }
    }
}

/// Map arguments to parameter indices, honoring names, defaults and, when
/// `expanded`, a trailing `params` array that absorbs extra positional arguments.
fn map_arguments(parameters: &[ParameterSymbol], arguments: &[ArgumentInfo<'_>], expanded: bool) -> Option<Vec<usize>> {
    let params_index = expanded.then(|| parameters.len() - 1);
    let mut used = vec![false; parameters.len()];
    let mut map = Vec::with_capacity(arguments.len());
    let mut seen_named = false;

    for (i, argument) in arguments.iter().enumerate() {
        let j = match argument.name {
            Some(name) => {
                seen_named = true;
                let j = parameters.iter().position(|p| p.name == name)?;
                if Some(j) == params_index {
                    return None;
                }
                j
            }
            None if seen_named => return None,
            None => match params_index {
                Some(p) if i >= p => p,
                _ if i < parameters.len() => i,
                _ => return None,
            },
        };
        if used[j] && Some(j) != params_index {
            return None;
        }
        used[j] = true;
        map.push(j);
    }

    let complete = parameters
        .iter()
        .enumerate()
        .all(|(j, p)| used[j] || Some(j) == params_index || p.is_optional());
    complete.then_some(map)
}

fn binary_type(op: TokenKind, left: TypeRef, right: TypeRef) -> TypeRef {
    let numeric = |l: &TypeRef, r: &TypeRef| {
        if *l == TypeRef::Error || *r == TypeRef::Error {
            TypeRef::Error
        } else if *l == TypeRef::Double || *r == TypeRef::Double {
            TypeRef::Double
        } else if *l == TypeRef::Long || *r == TypeRef::Long {
            TypeRef::Long
        } else {
            TypeRef::Int
        }
    };
    match op {
        TokenKind::AmpersandAmpersand
        | TokenKind::BarBar
        | TokenKind::EqualsEquals
        | TokenKind::ExclamationEquals
        | TokenKind::Less
        | TokenKind::Greater
        | TokenKind::LessEquals
        | TokenKind::GreaterEquals => TypeRef::Bool,
        TokenKind::Bar | TokenKind::Ampersand | TokenKind::Caret => match (&left, &right) {
            (TypeRef::Named(_), _) => left,
            (_, TypeRef::Named(_)) => right,
            (TypeRef::Bool, TypeRef::Bool) => TypeRef::Bool,
            _ => numeric(&left, &right),
        },
        TokenKind::Plus if left == TypeRef::String || right == TypeRef::String => TypeRef::String,
        TokenKind::LessLess | TokenKind::GreaterGreater => numeric(&left, &TypeRef::Int),
        _ => numeric(&left, &right),
    }
}
