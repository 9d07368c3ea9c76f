//! Arena-backed syntax tree with parent links.
//!
//! Nodes and tokens are addressed by [`NodeId`] and [`TokenId`]. Tokens are
//! stored in source order, so the previous token of `t` is simply `t - 1`.

use crate::text::{SourceText, TextSpan};

use super::error::SyntaxError;
use super::kind::{NodeKind, TokenKind};
use super::lexer::Trivia;
use super::parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl TokenId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A child slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxElement {
    Node(NodeId),
    Token(TokenId),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: TextSpan,
    pub leading: Vec<Trivia>,
    pub trailing: Vec<Trivia>,
    pub(crate) parent: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub children: Vec<SyntaxElement>,
}

/// A parsed source file.
#[derive(Debug)]
pub struct SyntaxTree {
    path: Option<String>,
    text: SourceText,
    tokens: Vec<Token>,
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    /// Parse `text` as a compilation unit.
    pub fn parse(text: impl Into<String>) -> Result<Self, SyntaxError> {
        Self::parse_with_path(None, text)
    }

    /// Parse `text`, remembering the path it was read from for reporting.
    pub fn parse_with_path(
        path: Option<String>,
        text: impl Into<String>,
    ) -> Result<Self, SyntaxError> {
        let text = SourceText::new(text);
        let (tokens, nodes, root) = parser::parse(&text)?;
        Ok(Self {
            path,
            text,
            tokens,
            nodes,
            root,
        })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn text(&self) -> &SourceText {
        &self.text
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.index()]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// All tokens in source order, end-of-file included.
    pub fn tokens(&self) -> impl Iterator<Item = TokenId> + '_ {
        (0..self.tokens.len() as u32).map(TokenId)
    }

    pub fn contains_token(&self, id: TokenId) -> bool {
        id.index() < self.tokens.len()
    }

    pub fn token_kind(&self, id: TokenId) -> TokenKind {
        self.token(id).kind
    }

    pub fn token_text(&self, id: TokenId) -> &str {
        self.text.slice(self.token(id).span)
    }

    /// Identifier text without a leading `@`.
    pub fn identifier_text(&self, id: TokenId) -> &str {
        let text = self.token_text(id);
        text.strip_prefix('@').unwrap_or(text)
    }

    pub fn trivia_text(&self, trivia: &Trivia) -> &str {
        self.text.slice(trivia.span)
    }

    pub fn token_parent(&self, id: TokenId) -> NodeId {
        self.token(id).parent.unwrap_or(self.root)
    }

    pub fn previous_token(&self, id: TokenId) -> Option<TokenId> {
        id.0.checked_sub(1).map(TokenId)
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// `id` followed by its parent, grandparent and so on up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |&n| self.parent(n))
    }

    pub fn children(&self, id: NodeId) -> &[SyntaxElement] {
        &self.node(id).children
    }

    pub fn child_nodes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().filter_map(|c| match c {
            SyntaxElement::Node(n) => Some(*n),
            SyntaxElement::Token(_) => None,
        })
    }

    pub fn child_tokens(&self, id: NodeId) -> impl Iterator<Item = TokenId> + '_ {
        self.children(id).iter().filter_map(|c| match c {
            SyntaxElement::Token(t) => Some(*t),
            SyntaxElement::Node(_) => None,
        })
    }

    pub fn child_token_of_kind(&self, id: NodeId, kind: TokenKind) -> Option<TokenId> {
        self.child_tokens(id).find(|&t| self.token_kind(t) == kind)
    }

    pub fn child_node_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.child_nodes(id).find(|&n| self.kind(n) == kind)
    }

    pub fn first_token(&self, id: NodeId) -> Option<TokenId> {
        self.children(id).iter().find_map(|c| match c {
            SyntaxElement::Token(t) => Some(*t),
            SyntaxElement::Node(n) => self.first_token(*n),
        })
    }

    pub fn last_token(&self, id: NodeId) -> Option<TokenId> {
        self.children(id).iter().rev().find_map(|c| match c {
            SyntaxElement::Token(t) => Some(*t),
            SyntaxElement::Node(n) => self.last_token(*n),
        })
    }

    /// Leading trivia of the node's first token.
    pub fn leading_trivia(&self, id: NodeId) -> &[Trivia] {
        match self.first_token(id) {
            Some(t) => &self.token(t).leading,
            None => &[],
        }
    }

    /// Span of the node's tokens, trivia excluded.
    pub fn node_span(&self, id: NodeId) -> TextSpan {
        match (self.first_token(id), self.last_token(id)) {
            (Some(first), Some(last)) => self.token(first).span.cover(self.token(last).span),
            _ => TextSpan::default(),
        }
    }

    pub fn node_text(&self, id: NodeId) -> &str {
        self.text.slice(self.node_span(id))
    }

    /// Pre-order walk over `id` and all nodes below it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            let children: Vec<NodeId> = self.child_nodes(n).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// The token whose span contains `offset`, if any.
    pub fn token_at(&self, offset: usize) -> Option<TokenId> {
        let idx = self
            .tokens
            .partition_point(|t| t.span.end <= offset);
        self.tokens
            .get(idx)
            .filter(|t| t.span.contains(offset))
            .map(|_| TokenId(idx as u32))
    }

    // Shapes used by the detector and the binder.

    /// The `IdentifierName` inside a name-like node, rightmost for qualified
    /// names and member accesses.
    pub fn rightmost_identifier(&self, id: NodeId) -> Option<TokenId> {
        match self.kind(id) {
            NodeKind::IdentifierName | NodeKind::QualifiedName => self
                .child_tokens(id)
                .filter(|&t| self.token_kind(t) == TokenKind::Identifier)
                .last(),
            NodeKind::MemberAccessExpression => self
                .child_nodes(id)
                .last()
                .and_then(|n| self.rightmost_identifier(n)),
            NodeKind::ArrayType | NodeKind::NullableType => self
                .child_nodes(id)
                .next()
                .and_then(|n| self.rightmost_identifier(n)),
            _ => None,
        }
    }

    /// The expression of an `Argument` (its last child node).
    pub fn argument_expression(&self, argument: NodeId) -> Option<NodeId> {
        self.child_nodes(argument)
            .filter(|&n| self.kind(n) != NodeKind::NameColon)
            .last()
    }

    /// The `name` of a `name: value` argument.
    pub fn argument_name(&self, argument: NodeId) -> Option<&str> {
        let name_colon = self.child_node_of_kind(argument, NodeKind::NameColon)?;
        let ident = self.child_node_of_kind(name_colon, NodeKind::IdentifierName)?;
        let token = self.child_token_of_kind(ident, TokenKind::Identifier)?;
        Some(self.identifier_text(token))
    }

    /// `Argument` nodes of an `ArgumentList`, in textual order.
    pub fn arguments(&self, argument_list: NodeId) -> Vec<NodeId> {
        self.child_nodes(argument_list)
            .filter(|&n| self.kind(n) == NodeKind::Argument)
            .collect()
    }

    /// The invoked expression of an invocation, or the type of an object creation.
    pub fn call_target(&self, call: NodeId) -> Option<NodeId> {
        match self.kind(call) {
            NodeKind::InvocationExpression => self.child_nodes(call).next(),
            NodeKind::ObjectCreationExpression => self
                .child_nodes(call)
                .find(|&n| self.kind(n).is_type_syntax()),
            _ => None,
        }
    }

    pub fn call_argument_list(&self, call: NodeId) -> Option<NodeId> {
        self.child_node_of_kind(call, NodeKind::ArgumentList)
    }

    /// Declared name of a type, member, parameter, declarator or enum member.
    pub fn declared_name(&self, decl: NodeId) -> Option<TokenId> {
        // The name is the last identifier token directly under the node,
        // except for declarators and enum members where it is the first.
        match self.kind(decl) {
            NodeKind::VariableDeclarator | NodeKind::EnumMemberDeclaration => {
                self.child_token_of_kind(decl, TokenKind::Identifier)
            }
            _ => self
                .child_tokens(decl)
                .filter(|&t| self.token_kind(t) == TokenKind::Identifier)
                .last(),
        }
    }

    pub fn has_modifier(&self, decl: NodeId, modifier: TokenKind) -> bool {
        self.child_token_of_kind(decl, modifier).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_token(tree: &SyntaxTree, text: &str) -> TokenId {
        tree.tokens()
            .find(|&t| tree.token_text(t) == text)
            .unwrap_or_else(|| panic!("token {text:?} not found"))
    }

    #[test]
    fn test_literal_argument_shape() {
        let tree = SyntaxTree::parse(r#"class C { void M() { Regex.IsMatch(s, "a+"); } }"#).unwrap();
        let token = find_token(&tree, r#""a+""#);
        let literal = tree.token_parent(token);
        assert_eq!(tree.kind(literal), NodeKind::LiteralExpression);
        let argument = tree.parent(literal).unwrap();
        assert_eq!(tree.kind(argument), NodeKind::Argument);
        let list = tree.parent(argument).unwrap();
        assert_eq!(tree.arguments(list).len(), 2);
        let call = tree.parent(list).unwrap();
        assert_eq!(tree.kind(call), NodeKind::InvocationExpression);
        let target = tree.call_target(call).unwrap();
        let name = tree.rightmost_identifier(target).unwrap();
        assert_eq!(tree.token_text(name), "IsMatch");
    }

    #[test]
    fn test_named_argument() {
        let tree = SyntaxTree::parse(r#"class C { void M() { F(pattern: "x"); } }"#).unwrap();
        let token = find_token(&tree, r#""x""#);
        let argument = tree.parent(tree.token_parent(token)).unwrap();
        assert_eq!(tree.argument_name(argument), Some("pattern"));
        assert_eq!(
            tree.argument_expression(argument),
            Some(tree.token_parent(token))
        );
    }

    #[test]
    fn test_previous_token_and_ancestors() {
        let tree = SyntaxTree::parse("class C { int x = 1; }").unwrap();
        let one = find_token(&tree, "1");
        let eq = tree.previous_token(one).unwrap();
        assert_eq!(tree.token_text(eq), "=");
        let kinds: Vec<NodeKind> = tree
            .ancestors(tree.token_parent(one))
            .map(|n| tree.kind(n))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::LiteralExpression,
                NodeKind::VariableDeclarator,
                NodeKind::FieldDeclaration,
                NodeKind::ClassDeclaration,
                NodeKind::CompilationUnit
            ]
        );
    }

    #[test]
    fn test_first_token_has_no_previous() {
        let tree = SyntaxTree::parse("class C { }").unwrap();
        let first = tree.tokens().next().unwrap();
        assert_eq!(tree.previous_token(first), None);
    }

    #[test]
    fn test_token_at() {
        let tree = SyntaxTree::parse("class C { }").unwrap();
        let token = tree.token_at(6).unwrap();
        assert_eq!(tree.token_text(token), "C");
        assert_eq!(tree.token_at(5), None);
    }

    #[test]
    fn test_node_span_excludes_trivia() {
        let tree = SyntaxTree::parse("  // hi\nclass C { }  ").unwrap();
        let class = tree.child_nodes(tree.root()).next().unwrap();
        assert_eq!(tree.node_text(class), "class C { }");
    }
}
