//! Compile-time constant evaluation.

use crate::syntax::{NodeId, NodeKind, TokenKind};
use crate::virtual_chars;

use super::compilation::Compilation;
use super::model::{Binder, ExprSymbol};
use super::symbols::{FieldId, TypeRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantValue {
    Int(i32),
    Long(i64),
    Bool(bool),
    Char(char),
    String(String),
    Null,
}

impl ConstantValue {
    /// Integral value, chars included.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConstantValue::Int(v) => Some(i64::from(*v)),
            ConstantValue::Long(v) => Some(*v),
            ConstantValue::Char(c) => Some(*c as i64),
            _ => None,
        }
    }
}

/// Value of an integer literal: hex or decimal, `_` separators, `u`/`l` suffixes.
fn parse_integer(text: &str) -> Option<u64> {
    let digits: String = text
        .trim_end_matches(['u', 'U', 'l', 'L'])
        .chars()
        .filter(|&c| c != '_')
        .collect();
    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u64>().ok()?,
    };
    Some(value)
}

/// Typed value of an integer literal. Without an `l` suffix a literal is an
/// `int` when it fits in 32 bits; `ulong`-only values have no constant.
pub(crate) fn integer_constant(text: &str) -> Option<ConstantValue> {
    let value = parse_integer(text)?;
    let long_suffix = text.ends_with(['l', 'L']) || text.to_ascii_lowercase().ends_with("lu");
    match i32::try_from(value) {
        Ok(v) if !long_suffix => Some(ConstantValue::Int(v)),
        _ => i64::try_from(value).ok().map(ConstantValue::Long),
    }
}

/// Evaluates constant expressions across trees. Tracks the declarations being
/// evaluated so that `const int A = B; const int B = A;` yields no value.
pub(crate) struct ConstantEvaluator<'a> {
    compilation: &'a Compilation,
    visiting: Vec<(usize, NodeId)>,
}

impl<'a> ConstantEvaluator<'a> {
    pub(crate) fn new(compilation: &'a Compilation) -> Self {
        Self {
            compilation,
            visiting: Vec::new(),
        }
    }

    pub(crate) fn evaluate(&mut self, tree_index: usize, expr: NodeId) -> Option<ConstantValue> {
        let compilation = self.compilation;
        let tree = compilation.tree(tree_index);
        let binder = Binder::new(compilation, tree_index);
        match tree.kind(expr) {
            NodeKind::LiteralExpression => {
                let token = tree.child_tokens(expr).next()?;
                let kind = tree.token_kind(token);
                match kind {
                    TokenKind::IntegerLiteral => integer_constant(tree.token_text(token)),
                    TokenKind::True => Some(ConstantValue::Bool(true)),
                    TokenKind::False => Some(ConstantValue::Bool(false)),
                    TokenKind::Null => Some(ConstantValue::Null),
                    TokenKind::CharLiteral => {
                        // Same escapes as a regular string between the quotes.
                        let value = virtual_chars::convert_text(TokenKind::StringLiteral, tree.token_text(token), 0)
                            .ok()?;
                        match value.len() {
                            1 => Some(ConstantValue::Char(value[0].ch)),
                            _ => None,
                        }
                    }
                    k if k.is_string_literal() => virtual_chars::convert(tree, token)
                        .ok()
                        .map(|chars| ConstantValue::String(chars.text())),
                    _ => None,
                }
            }
            NodeKind::ParenthesizedExpression => {
                let inner = tree.child_nodes(expr).next()?;
                self.evaluate(tree_index, inner)
            }
            NodeKind::IdentifierName | NodeKind::MemberAccessExpression => match binder.bind_symbol(expr)? {
                ExprSymbol::Field(field) => self.field_value(field),
                ExprSymbol::Local { declarator, .. } => {
                    let statement = tree.parent(declarator)?;
                    if !tree.has_modifier(statement, TokenKind::Const) {
                        return None;
                    }
                    let init = tree.child_nodes(declarator).next()?;
                    self.guarded(tree_index, declarator, |this| this.evaluate(tree_index, init))
                }
                _ => None,
            },
            NodeKind::CastExpression => {
                let mut children = tree.child_nodes(expr);
                let type_node = children.next()?;
                let operand = children.next()?;
                let value = self.evaluate(tree_index, operand)?;
                let target = compilation.resolve_type_syntax(tree_index, expr, type_node);
                match target {
                    // Enums have an `int` underlying type.
                    TypeRef::Int => to_int(&value),
                    TypeRef::Named(ty) if compilation.type_symbol(ty).is_enum() => to_int(&value),
                    TypeRef::Long => value.as_int().map(ConstantValue::Long),
                    TypeRef::Char => value
                        .as_int()
                        .and_then(|v| u32::try_from(v).ok())
                        .and_then(char::from_u32)
                        .map(ConstantValue::Char),
                    TypeRef::Bool if matches!(value, ConstantValue::Bool(_)) => Some(value),
                    TypeRef::String if matches!(value, ConstantValue::String(_) | ConstantValue::Null) => {
                        Some(value)
                    }
                    _ => None,
                }
            }
            NodeKind::PrefixUnaryExpression => {
                let op = tree.token_kind(tree.child_tokens(expr).next()?);
                let operand = tree.child_nodes(expr).next()?;
                let value = self.evaluate(tree_index, operand)?;
                match (op, value) {
                    (TokenKind::Exclamation, ConstantValue::Bool(b)) => Some(ConstantValue::Bool(!b)),
                    (TokenKind::Minus, ConstantValue::Long(v)) => v.checked_neg().map(ConstantValue::Long),
                    (TokenKind::Minus, v) => to_int(&v)?.as_int()?.checked_neg().and_then(int_value),
                    (TokenKind::Plus, ConstantValue::Long(v)) => Some(ConstantValue::Long(v)),
                    (TokenKind::Plus, v) => to_int(&v),
                    (TokenKind::Tilde, ConstantValue::Long(v)) => Some(ConstantValue::Long(!v)),
                    (TokenKind::Tilde, v) => to_int(&v)?.as_int().and_then(|i| int_value(!i)),
                    _ => None,
                }
            }
            NodeKind::BinaryExpression => {
                let op = tree.token_kind(tree.child_tokens(expr).next()?);
                let mut operands = tree.child_nodes(expr);
                let (left, right) = (operands.next()?, operands.next()?);
                let left = self.evaluate(tree_index, left)?;
                let right = self.evaluate(tree_index, right)?;
                binary(op, left, right)
            }
            _ => None,
        }
    }

    fn guarded(
        &mut self,
        tree_index: usize,
        node: NodeId,
        f: impl FnOnce(&mut Self) -> Option<ConstantValue>,
    ) -> Option<ConstantValue> {
        let key = (tree_index, node);
        if self.visiting.contains(&key) {
            return None;
        }
        self.visiting.push(key);
        let value = f(self);
        self.visiting.pop();
        value
    }

    fn field_value(&mut self, id: FieldId) -> Option<ConstantValue> {
        let field = self.compilation.field(id);
        if !field.is_const {
            return None;
        }
        let declaration = field.declaration;
        let initializer = field.initializer;
        let is_enum_member = field.is_enum_member;
        let previous = field.previous_enum_member;
        self.guarded(declaration.tree, declaration.node, |this| {
            match (initializer, is_enum_member) {
                (Some(init), true) => to_int(&this.evaluate(declaration.tree, init)?),
                (Some(init), false) => this.evaluate(declaration.tree, init),
                (None, true) => match previous {
                    Some(previous) => this
                        .field_value(previous)?
                        .as_int()?
                        .checked_add(1)
                        .and_then(int_value),
                    None => Some(ConstantValue::Int(0)),
                },
                (None, false) => None,
            }
        })
    }
}

fn binary(op: TokenKind, left: ConstantValue, right: ConstantValue) -> Option<ConstantValue> {
    use ConstantValue::{Bool, Long, String as Str};

    match (left, right) {
        (Bool(l), Bool(r)) => Some(Bool(match op {
            TokenKind::AmpersandAmpersand | TokenKind::Ampersand => l && r,
            TokenKind::BarBar | TokenKind::Bar => l || r,
            TokenKind::Caret | TokenKind::ExclamationEquals => l != r,
            TokenKind::EqualsEquals => l == r,
            _ => return None,
        })),
        (Str(l), Str(r)) => match op {
            TokenKind::Plus => Some(Str(l + &r)),
            TokenKind::EqualsEquals => Some(Bool(l == r)),
            TokenKind::ExclamationEquals => Some(Bool(l != r)),
            _ => None,
        },
        (left, right) => {
            let (l, r) = (left.as_int()?, right.as_int()?);
            // Shifts take the left operand's type; other operators promote to
            // `long` when either side is one.
            let long = match op {
                TokenKind::LessLess | TokenKind::GreaterGreater => matches!(left, Long(_)),
                _ => matches!(left, Long(_)) || matches!(right, Long(_)),
            };
            let value = match op {
                TokenKind::Plus => l.checked_add(r)?,
                TokenKind::Minus => l.checked_sub(r)?,
                TokenKind::Asterisk => l.checked_mul(r)?,
                TokenKind::Slash => l.checked_div(r)?,
                TokenKind::Percent => l.checked_rem(r)?,
                TokenKind::LessLess if long => l.wrapping_shl((r & 63) as u32),
                TokenKind::GreaterGreater if long => l.wrapping_shr((r & 63) as u32),
                TokenKind::LessLess => i64::from((l as i32).wrapping_shl((r & 31) as u32)),
                TokenKind::GreaterGreater => i64::from((l as i32).wrapping_shr((r & 31) as u32)),
                TokenKind::Bar => l | r,
                TokenKind::Ampersand => l & r,
                TokenKind::Caret => l ^ r,
                TokenKind::EqualsEquals => return Some(Bool(l == r)),
                TokenKind::ExclamationEquals => return Some(Bool(l != r)),
                TokenKind::Less => return Some(Bool(l < r)),
                TokenKind::Greater => return Some(Bool(l > r)),
                TokenKind::LessEquals => return Some(Bool(l <= r)),
                TokenKind::GreaterEquals => return Some(Bool(l >= r)),
                _ => return None,
            };
            if long {
                Some(Long(value))
            } else {
                // Overflowing an `int` constant is a compile-time error.
                int_value(value)
            }
        }
    }
}

/// An `int` constant, or nothing when `value` does not fit.
fn int_value(value: i64) -> Option<ConstantValue> {
    i32::try_from(value).ok().map(ConstantValue::Int)
}

/// Explicit conversion to `int`. Out-of-range constants do not convert.
fn to_int(value: &ConstantValue) -> Option<ConstantValue> {
    int_value(value.as_int()?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::semantic::SemanticModel;
    use crate::syntax::SyntaxTree;
    use yare::parameterized;

    fn model(src: &str) -> Arc<SemanticModel> {
        Compilation::with_prelude([SyntaxTree::parse(src).unwrap()])
            .unwrap()
            .semantic_model(0)
    }

    /// Value of the initializer of the last field in `src`.
    fn last_field_value(src: &str) -> Option<ConstantValue> {
        let m = model(src);
        let tree = m.tree();
        let declarator = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|&n| tree.kind(n) == NodeKind::VariableDeclarator)
            .max_by_key(|&n| tree.node_span(n).start)
            .unwrap();
        let init = tree.child_nodes(declarator).next().unwrap();
        m.constant_value(init)
    }

    #[parameterized(
        integer = { "class C { object x = 42; }", Some(ConstantValue::Int(42)) },
        hex_with_separator = { "class C { object x = 0x1_0; }", Some(ConstantValue::Int(16)) },
        arithmetic = { "class C { object x = (1 + 2) * 3 - 4 / 2; }", Some(ConstantValue::Int(7)) },
        shift_or = { "class C { object x = 1 << 4 | 1; }", Some(ConstantValue::Int(17)) },
        negate = { "class C { object x = -~0; }", Some(ConstantValue::Int(1)) },
        division_by_zero = { "class C { object x = 1 / 0; }", None },
        boolean = { "class C { object x = !(1 < 2) || true; }", Some(ConstantValue::Bool(true)) },
        string_concat = { r#"class C { object x = "a" + "\n"; }"#, Some(ConstantValue::String("a\n".into())) },
        char_literal = { r"class C { object x = '\t'; }", Some(ConstantValue::Char('\t')) },
        const_field = { "class C { const int A = 2; object x = A * A; }", Some(ConstantValue::Int(4)) },
        readonly_field = { "class C { static readonly int A = 2; object x = A; }", None },
        cycle = { "class C { const int A = B; const int B = A; object x = A; }", None },
    )]
    fn test_constant_values(src: &str, expected: Option<ConstantValue>) {
        assert_eq!(last_field_value(src), expected);
    }

    #[parameterized(
        shift_count_masked = { "class C { object x = 1 << 40; }", Some(ConstantValue::Int(256)) },
        shift_into_sign_bit = { "class C { object x = 1 << 31; }", Some(ConstantValue::Int(i32::MIN)) },
        arithmetic_shift_right = { "class C { object x = -16 >> 2; }", Some(ConstantValue::Int(-4)) },
        add_overflow = { "class C { object x = 0x7FFFFFFF + 1; }", None },
        multiply_overflow = { "class C { object x = 65536 * 65536; }", None },
        negate_min = { "class C { const int M = -2147483647 - 1; object x = -M; }", None },
        min_over_minus_one = { "class C { const int M = -2147483647 - 1; object x = M / -1; }", None },
        large_literal_is_long = { "class C { object x = 2147483648; }", Some(ConstantValue::Long(2147483648)) },
        long_suffix = { "class C { object x = 1L; }", Some(ConstantValue::Long(1)) },
        long_shift = { "class C { object x = 1L << 40; }", Some(ConstantValue::Long(1 << 40)) },
        promoted_to_long = { "class C { object x = 0x7FFFFFFF + 1L; }", Some(ConstantValue::Long(0x8000_0000)) },
        long_to_int_out_of_range = { "class C { object x = (int)(1L << 40); }", None },
        long_to_int_in_range = { "class C { object x = (int)5L; }", Some(ConstantValue::Int(5)) },
    )]
    fn test_int_semantics(src: &str, expected: Option<ConstantValue>) {
        assert_eq!(last_field_value(src), expected);
    }

    #[parameterized(
        named_flags = {
            "using System.Text.RegularExpressions; class C { object x = RegexOptions.IgnoreCase | RegexOptions.Multiline; }",
            Some(ConstantValue::Int(3))
        },
        cast = {
            "using System.Text.RegularExpressions; class C { object x = (RegexOptions)(16 | 1); }",
            Some(ConstantValue::Int(17))
        },
        implicit_enum_values = {
            "enum E { A, B, C = 10, D } class C { object x = E.D + E.B; }",
            Some(ConstantValue::Int(12))
        },
        cast_masked_shift = {
            "using System.Text.RegularExpressions; class C { object x = (RegexOptions)(1 << 40); }",
            Some(ConstantValue::Int(256))
        },
        cast_overflow = {
            "using System.Text.RegularExpressions; class C { object x = (RegexOptions)(0x7FFFFFFF + 1); }",
            None
        },
        cast_long_out_of_range = {
            "using System.Text.RegularExpressions; class C { object x = (RegexOptions)0x100000000; }",
            None
        },
        enum_member_referencing_sibling = {
            "enum E { A = 1, B = A << 2 } class C { object x = E.B; }",
            Some(ConstantValue::Int(4))
        },
    )]
    fn test_enum_values(src: &str, expected: Option<ConstantValue>) {
        assert_eq!(last_field_value(src), expected);
    }

    #[test]
    fn test_const_local() {
        let m = model("class C { void M() { const int a = 5; int b = 6; F(a, b); } }");
        let tree = m.tree();
        let call = tree
            .descendants(tree.root())
            .into_iter()
            .find(|&n| tree.kind(n) == NodeKind::InvocationExpression)
            .unwrap();
        let args = tree.arguments(tree.call_argument_list(call).unwrap());
        let value = |a| m.constant_value(tree.argument_expression(a).unwrap());
        assert_eq!(value(args[0]), Some(ConstantValue::Int(5)));
        assert_eq!(value(args[1]), None);
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("10L"), Some(10));
        assert_eq!(parse_integer("0xFFu"), Some(255));
        assert_eq!(parse_integer("1_000"), Some(1000));
        assert_eq!(integer_constant("0x80000000"), Some(ConstantValue::Long(0x8000_0000)));
        assert_eq!(integer_constant("7ul"), Some(ConstantValue::Long(7)));
        assert_eq!(integer_constant("18446744073709551615"), None);
    }
}
