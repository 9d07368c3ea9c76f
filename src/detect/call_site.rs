//! Recognizing literals passed as the pattern argument of an engine call.

use std::collections::HashSet;

use tracing::trace;

use crate::semantic::{Accessibility, MethodKind, SemanticModel, TypeId};
use crate::syntax::{NodeId, NodeKind, SyntaxTree, TokenId};

use super::config::EngineConfig;

/// The `Argument` whose expression is exactly the literal `token`, when that
/// argument belongs to an invocation or object creation.
pub(crate) fn literal_argument(tree: &SyntaxTree, token: TokenId) -> Option<NodeId> {
    let literal = tree.token_parent(token);
    if tree.kind(literal) != NodeKind::LiteralExpression {
        return None;
    }
    let argument = tree.parent(literal)?;
    if tree.kind(argument) != NodeKind::Argument || tree.argument_expression(argument) != Some(literal) {
        return None;
    }
    enclosing_call(tree, argument)?;
    Some(argument)
}

/// The invocation or object creation an `Argument` belongs to.
pub(crate) fn enclosing_call(tree: &SyntaxTree, argument: NodeId) -> Option<NodeId> {
    let list = tree.parent(argument)?;
    let call = tree.parent(list)?;
    matches!(
        tree.kind(call),
        NodeKind::InvocationExpression | NodeKind::ObjectCreationExpression
    )
    .then_some(call)
}

/// The engine type as seen from one compilation.
#[derive(Debug, Clone)]
pub(crate) struct EngineSymbols {
    pub engine_type: TypeId,
    pub simple_name: String,
    /// Public static methods of the engine with a pattern parameter.
    pub method_names: HashSet<String>,
}

impl EngineSymbols {
    /// `None` when the compilation does not declare the engine type.
    pub(crate) fn resolve(model: &SemanticModel, config: &EngineConfig) -> Option<Self> {
        let compilation = model.compilation();
        let engine_type = compilation.type_by_metadata_name(&config.engine_type)?;
        let symbol = compilation.type_symbol(engine_type);
        let method_names = symbol
            .methods
            .iter()
            .map(|&id| compilation.method(id))
            .filter(|method| {
                method.accessibility == Accessibility::Public
                    && method.is_static
                    && method
                        .parameters
                        .iter()
                        .any(|p| p.name == config.pattern_parameter)
            })
            .map(|method| method.name.clone())
            .collect();
        Some(Self {
            engine_type,
            simple_name: config.engine_simple_name().to_string(),
            method_names,
        })
    }

    /// Whether `argument` is bound to the pattern parameter of a public static
    /// engine method or of an engine constructor.
    pub(crate) fn is_pattern_argument(
        &self,
        model: &SemanticModel,
        config: &EngineConfig,
        argument: NodeId,
    ) -> bool {
        let tree = model.tree();
        let Some(call) = enclosing_call(tree, argument) else {
            return false;
        };
        let Some(name) = tree
            .call_target(call)
            .and_then(|target| tree.rightmost_identifier(target))
            .map(|token| tree.identifier_text(token))
        else {
            return false;
        };

        // Cheap textual checks come before any binding.
        let compilation = model.compilation();
        let target_matches = match tree.kind(call) {
            NodeKind::InvocationExpression => {
                if !self.method_names.contains(name) {
                    return false;
                }
                model.symbol_info(call).is_some_and(|id| {
                    let method = compilation.method(id);
                    method.kind == MethodKind::Ordinary
                        && method.accessibility == Accessibility::Public
                        && method.is_static
                        && method.containing_type == self.engine_type
                })
            }
            NodeKind::ObjectCreationExpression => {
                if name != self.simple_name {
                    return false;
                }
                model.symbol_info(call).is_some_and(|id| {
                    let method = compilation.method(id);
                    method.kind == MethodKind::Constructor && method.containing_type == self.engine_type
                })
            }
            _ => false,
        };
        if !target_matches {
            trace!(call = tree.node_text(call), "call does not bind to the engine");
            return false;
        }

        model
            .parameter_for_argument(argument)
            .is_some_and(|parameter| parameter.name == config.pattern_parameter)
    }
}
