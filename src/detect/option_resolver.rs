//! Constant option arguments next to a pattern argument.

use crate::semantic::{ConstantValue, SemanticModel};
use crate::syntax::NodeId;

use super::options::PatternOptions;

/// Options passed beside `argument` in the same argument list.
///
/// Siblings are scanned in list order; the first one whose type is named
/// `options_type` and that evaluates to a constant wins. Anything else
/// leaves the default.
pub(crate) fn resolve_options(model: &SemanticModel, options_type: &str, argument: NodeId) -> PatternOptions {
    let tree = model.tree();
    let Some(list) = tree.parent(argument) else {
        return PatternOptions::NONE;
    };
    let compilation = model.compilation();
    tree.arguments(list)
        .into_iter()
        .filter(|&sibling| sibling != argument)
        .filter_map(|sibling| tree.argument_expression(sibling))
        .filter(|&expr| {
            model
                .type_of(expr)
                .named()
                .is_some_and(|ty| compilation.type_symbol(ty).name == options_type)
        })
        .find_map(|expr| match model.constant_value(expr)? {
            // Enum constants hold their `int` underlying value.
            ConstantValue::Int(bits) => Some(PatternOptions::from_bits(bits as u32)),
            _ => None,
        })
        .unwrap_or(PatternOptions::NONE)
}
