//! Recursive descent parser for the host language.
//!
//! Nodes are built bottom-up: every `parse_*` method consumes its tokens and
//! returns the finished node, whose children get their parent link set at
//! construction time.

use crate::text::SourceText;

use super::error::{SyntaxError, SyntaxErrorKind};
use super::kind::{NodeKind, TokenKind};
use super::lexer::{self, LexedToken};
use super::tree::{Node, NodeId, SyntaxElement, Token, TokenId};

type PResult<T> = Result<T, SyntaxError>;

/// Parse `text` into the raw arena parts of a [`super::SyntaxTree`].
pub(crate) fn parse(text: &SourceText) -> PResult<(Vec<Token>, Vec<Node>, NodeId)> {
    let tokens = lexer::lex(text)?
        .into_iter()
        .map(|t: LexedToken| Token {
            kind: t.kind,
            span: t.span,
            leading: t.leading,
            trailing: t.trailing,
            parent: None,
        })
        .collect();
    let mut parser = Parser {
        text,
        tokens,
        nodes: Vec::new(),
        pos: 0,
    };
    let root = parser.parse_compilation_unit()?;
    Ok((parser.tokens, parser.nodes, root))
}

struct Parser<'a> {
    text: &'a SourceText,
    tokens: Vec<Token>,
    nodes: Vec<Node>,
    pos: usize,
}

fn binary_precedence(kind: TokenKind) -> Option<u8> {
    Some(match kind {
        TokenKind::BarBar => 1,
        TokenKind::AmpersandAmpersand => 2,
        TokenKind::Bar => 3,
        TokenKind::Caret => 4,
        TokenKind::Ampersand => 5,
        TokenKind::EqualsEquals | TokenKind::ExclamationEquals => 6,
        TokenKind::Less | TokenKind::Greater | TokenKind::LessEquals | TokenKind::GreaterEquals => 7,
        TokenKind::LessLess | TokenKind::GreaterGreater => 8,
        TokenKind::Plus | TokenKind::Minus => 9,
        TokenKind::Asterisk | TokenKind::Slash | TokenKind::Percent => 10,
        _ => return None,
    })
}

impl Parser<'_> {
    // --- Token cursor ---

    fn nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(TokenKind::EndOfFile, |t| t.kind)
    }

    fn current(&self) -> TokenKind {
        self.nth(0)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    fn kind_at(&self, index: usize) -> TokenKind {
        self.tokens
            .get(index)
            .map_or(TokenKind::EndOfFile, |t| t.kind)
    }

    fn bump(&mut self) -> SyntaxElement {
        let id = TokenId(self.pos as u32);
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        SyntaxElement::Token(id)
    }

    fn eat(&mut self, kind: TokenKind) -> Option<SyntaxElement> {
        self.at(kind).then(|| self.bump())
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<SyntaxElement> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.expected(what))
        }
    }

    fn expected(&self, what: &str) -> SyntaxError {
        let token = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        let found = if token.kind == TokenKind::EndOfFile {
            "end of file".to_string()
        } else {
            format!("'{}'", self.text.slice(token.span))
        };
        SyntaxError::new(
            SyntaxErrorKind::Expected {
                expected: what.to_string(),
                found,
            },
            self.text.line_position(token.span.start),
        )
    }

    fn node(&mut self, kind: NodeKind, children: Vec<SyntaxElement>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in &children {
            match *child {
                SyntaxElement::Node(n) => self.nodes[n.index()].parent = Some(id),
                SyntaxElement::Token(t) => self.tokens[t.index()].parent = Some(id),
            }
        }
        self.nodes.push(Node {
            kind,
            parent: None,
            children,
        });
        id
    }

    // --- Declarations ---

    fn parse_compilation_unit(&mut self) -> PResult<NodeId> {
        let mut children = Vec::new();
        while self.at(TokenKind::Using) {
            children.push(SyntaxElement::Node(self.parse_using_directive()?));
        }
        while !self.at(TokenKind::EndOfFile) {
            children.push(SyntaxElement::Node(self.parse_namespace_member()?));
        }
        children.push(self.bump());
        Ok(self.node(NodeKind::CompilationUnit, children))
    }

    fn parse_using_directive(&mut self) -> PResult<NodeId> {
        let using = self.bump();
        let name = self.parse_qualified_name()?;
        let semi = self.expect(TokenKind::Semicolon, "';'")?;
        Ok(self.node(
            NodeKind::UsingDirective,
            vec![using, SyntaxElement::Node(name), semi],
        ))
    }

    fn parse_namespace_member(&mut self) -> PResult<NodeId> {
        if self.at(TokenKind::Namespace) {
            return self.parse_namespace();
        }
        let prefix = self.parse_attributes_and_modifiers()?;
        match self.current() {
            TokenKind::Class | TokenKind::Struct | TokenKind::Enum => {
                self.parse_type_declaration(prefix)
            }
            _ => Err(self.expected("type declaration")),
        }
    }

    fn parse_namespace(&mut self) -> PResult<NodeId> {
        let mut children = vec![self.bump()];
        children.push(SyntaxElement::Node(self.parse_qualified_name()?));
        if let Some(semi) = self.eat(TokenKind::Semicolon) {
            // File-scoped: everything up to end of file belongs here.
            children.push(semi);
            while self.at(TokenKind::Using) {
                children.push(SyntaxElement::Node(self.parse_using_directive()?));
            }
            while !self.at(TokenKind::EndOfFile) {
                children.push(SyntaxElement::Node(self.parse_namespace_member()?));
            }
        } else {
            children.push(self.expect(TokenKind::OpenBrace, "'{'")?);
            while self.at(TokenKind::Using) {
                children.push(SyntaxElement::Node(self.parse_using_directive()?));
            }
            while !self.at(TokenKind::CloseBrace) {
                if self.at(TokenKind::EndOfFile) {
                    return Err(self.expected("'}'"));
                }
                children.push(SyntaxElement::Node(self.parse_namespace_member()?));
            }
            children.push(self.bump());
        }
        Ok(self.node(NodeKind::NamespaceDeclaration, children))
    }

    /// Attribute lists and modifier keywords preceding a declaration.
    fn parse_attributes_and_modifiers(&mut self) -> PResult<Vec<SyntaxElement>> {
        let mut out = Vec::new();
        while self.at(TokenKind::OpenBracket) {
            out.push(SyntaxElement::Node(self.parse_attribute_list()?));
        }
        while self.current().is_modifier() {
            out.push(self.bump());
        }
        Ok(out)
    }

    /// `[...]`, kept as a flat run of tokens.
    fn parse_attribute_list(&mut self) -> PResult<NodeId> {
        let mut children = vec![self.bump()];
        let mut depth = 1usize;
        while depth > 0 {
            match self.current() {
                TokenKind::EndOfFile => return Err(self.expected("']'")),
                TokenKind::OpenBracket => depth += 1,
                TokenKind::CloseBracket => depth -= 1,
                _ => {}
            }
            children.push(self.bump());
        }
        Ok(self.node(NodeKind::AttributeList, children))
    }

    fn parse_type_declaration(&mut self, mut children: Vec<SyntaxElement>) -> PResult<NodeId> {
        let keyword = self.current();
        children.push(self.bump());
        let name = self.pos;
        children.push(self.expect(TokenKind::Identifier, "identifier")?);
        let name = self.text.slice(self.tokens[name].span).to_string();

        if let Some(colon) = self.eat(TokenKind::Colon) {
            children.push(colon);
            children.push(SyntaxElement::Node(self.parse_type()?));
            while let Some(comma) = self.eat(TokenKind::Comma) {
                children.push(comma);
                children.push(SyntaxElement::Node(self.parse_type()?));
            }
        }
        children.push(self.expect(TokenKind::OpenBrace, "'{'")?);

        let kind = match keyword {
            TokenKind::Enum => {
                self.parse_enum_members(&mut children)?;
                NodeKind::EnumDeclaration
            }
            TokenKind::Struct => {
                self.parse_type_members(&name, &mut children)?;
                NodeKind::StructDeclaration
            }
            _ => {
                self.parse_type_members(&name, &mut children)?;
                NodeKind::ClassDeclaration
            }
        };
        children.push(self.expect(TokenKind::CloseBrace, "'}'")?);
        Ok(self.node(kind, children))
    }

    fn parse_enum_members(&mut self, children: &mut Vec<SyntaxElement>) -> PResult<()> {
        while !self.at(TokenKind::CloseBrace) {
            let mut member = Vec::new();
            while self.at(TokenKind::OpenBracket) {
                member.push(SyntaxElement::Node(self.parse_attribute_list()?));
            }
            member.push(self.expect(TokenKind::Identifier, "enum member name")?);
            if let Some(eq) = self.eat(TokenKind::Equals) {
                member.push(eq);
                member.push(SyntaxElement::Node(self.parse_expression()?));
            }
            children.push(SyntaxElement::Node(
                self.node(NodeKind::EnumMemberDeclaration, member),
            ));
            match self.eat(TokenKind::Comma) {
                Some(comma) => children.push(comma),
                None => break,
            }
        }
        Ok(())
    }

    fn parse_type_members(&mut self, type_name: &str, children: &mut Vec<SyntaxElement>) -> PResult<()> {
        while !self.at(TokenKind::CloseBrace) {
            if self.at(TokenKind::EndOfFile) {
                return Err(self.expected("'}'"));
            }
            children.push(SyntaxElement::Node(self.parse_member(type_name)?));
        }
        Ok(())
    }

    fn parse_member(&mut self, type_name: &str) -> PResult<NodeId> {
        let mut children = self.parse_attributes_and_modifiers()?;
        match self.current() {
            TokenKind::Class | TokenKind::Struct | TokenKind::Enum => {
                return self.parse_type_declaration(children);
            }
            _ => {}
        }

        if self.at(TokenKind::Identifier)
            && self.nth(1) == TokenKind::OpenParen
            && self.text.slice(self.tokens[self.pos].span) == type_name
        {
            children.push(self.bump());
            children.push(SyntaxElement::Node(self.parse_parameter_list()?));
            self.parse_body(&mut children)?;
            return Ok(self.node(NodeKind::ConstructorDeclaration, children));
        }

        children.push(SyntaxElement::Node(self.parse_type()?));
        if self.nth(1) == TokenKind::OpenParen {
            children.push(self.expect(TokenKind::Identifier, "method name")?);
            children.push(SyntaxElement::Node(self.parse_parameter_list()?));
            self.parse_body(&mut children)?;
            return Ok(self.node(NodeKind::MethodDeclaration, children));
        }

        self.parse_declarators(&mut children)?;
        children.push(self.expect(TokenKind::Semicolon, "';'")?);
        Ok(self.node(NodeKind::FieldDeclaration, children))
    }

    /// Block body, `=> expr;`, or `;`.
    fn parse_body(&mut self, children: &mut Vec<SyntaxElement>) -> PResult<()> {
        match self.current() {
            TokenKind::OpenBrace => children.push(SyntaxElement::Node(self.parse_block()?)),
            TokenKind::EqualsGreater => {
                let arrow = self.bump();
                let expr = self.parse_expression()?;
                children.push(SyntaxElement::Node(self.node(
                    NodeKind::ArrowExpressionClause,
                    vec![arrow, SyntaxElement::Node(expr)],
                )));
                children.push(self.expect(TokenKind::Semicolon, "';'")?);
            }
            _ => children.push(self.expect(TokenKind::Semicolon, "'{' or ';'")?),
        }
        Ok(())
    }

    fn parse_declarators(&mut self, children: &mut Vec<SyntaxElement>) -> PResult<()> {
        loop {
            let mut declarator = vec![self.expect(TokenKind::Identifier, "identifier")?];
            if let Some(eq) = self.eat(TokenKind::Equals) {
                declarator.push(eq);
                declarator.push(SyntaxElement::Node(self.parse_expression()?));
            }
            children.push(SyntaxElement::Node(
                self.node(NodeKind::VariableDeclarator, declarator),
            ));
            match self.eat(TokenKind::Comma) {
                Some(comma) => children.push(comma),
                None => return Ok(()),
            }
        }
    }

    fn parse_parameter_list(&mut self) -> PResult<NodeId> {
        let mut children = vec![self.expect(TokenKind::OpenParen, "'('")?];
        if !self.at(TokenKind::CloseParen) {
            loop {
                children.push(SyntaxElement::Node(self.parse_parameter()?));
                match self.eat(TokenKind::Comma) {
                    Some(comma) => children.push(comma),
                    None => break,
                }
            }
        }
        children.push(self.expect(TokenKind::CloseParen, "')'")?);
        Ok(self.node(NodeKind::ParameterList, children))
    }

    fn parse_parameter(&mut self) -> PResult<NodeId> {
        let mut children = Vec::new();
        while self.at(TokenKind::OpenBracket) {
            children.push(SyntaxElement::Node(self.parse_attribute_list()?));
        }
        while matches!(
            self.current(),
            TokenKind::Params | TokenKind::Ref | TokenKind::Out | TokenKind::In | TokenKind::This
        ) {
            children.push(self.bump());
        }
        children.push(SyntaxElement::Node(self.parse_type()?));
        children.push(self.expect(TokenKind::Identifier, "parameter name")?);
        if let Some(eq) = self.eat(TokenKind::Equals) {
            children.push(eq);
            children.push(SyntaxElement::Node(self.parse_expression()?));
        }
        Ok(self.node(NodeKind::Parameter, children))
    }

    // --- Types ---

    fn parse_qualified_name(&mut self) -> PResult<NodeId> {
        let mut children = vec![self.expect(TokenKind::Identifier, "identifier")?];
        while self.at(TokenKind::Dot) && self.nth(1) == TokenKind::Identifier {
            children.push(self.bump());
            children.push(self.bump());
        }
        Ok(self.node(NodeKind::QualifiedName, children))
    }

    fn parse_type(&mut self) -> PResult<NodeId> {
        let mut ty = if self.current().is_predefined_type() {
            let keyword = self.bump();
            self.node(NodeKind::PredefinedType, vec![keyword])
        } else if self.at(TokenKind::Identifier) {
            self.parse_qualified_name()?
        } else {
            return Err(self.expected("type"));
        };
        while self.at(TokenKind::OpenBracket) && self.nth(1) == TokenKind::CloseBracket {
            let open = self.bump();
            let close = self.bump();
            ty = self.node(NodeKind::ArrayType, vec![SyntaxElement::Node(ty), open, close]);
        }
        if self.at(TokenKind::Question) {
            let question = self.bump();
            ty = self.node(NodeKind::NullableType, vec![SyntaxElement::Node(ty), question]);
        }
        Ok(ty)
    }

    /// Token index just past a type starting at `index`, without consuming.
    fn scan_type(&self, mut index: usize) -> Option<usize> {
        let kind = self.kind_at(index);
        if kind.is_predefined_type() {
            index += 1;
        } else if kind == TokenKind::Identifier {
            index += 1;
            while self.kind_at(index) == TokenKind::Dot
                && self.kind_at(index + 1) == TokenKind::Identifier
            {
                index += 2;
            }
        } else {
            return None;
        }
        while self.kind_at(index) == TokenKind::OpenBracket
            && self.kind_at(index + 1) == TokenKind::CloseBracket
        {
            index += 2;
        }
        if self.kind_at(index) == TokenKind::Question {
            index += 1;
        }
        Some(index)
    }

    // --- Statements ---

    fn parse_block(&mut self) -> PResult<NodeId> {
        let mut children = vec![self.expect(TokenKind::OpenBrace, "'{'")?];
        while !self.at(TokenKind::CloseBrace) {
            if self.at(TokenKind::EndOfFile) {
                return Err(self.expected("'}'"));
            }
            children.push(SyntaxElement::Node(self.parse_statement()?));
        }
        children.push(self.bump());
        Ok(self.node(NodeKind::Block, children))
    }

    fn parse_statement(&mut self) -> PResult<NodeId> {
        match self.current() {
            TokenKind::OpenBrace => self.parse_block(),
            TokenKind::Semicolon => {
                let semi = self.bump();
                Ok(self.node(NodeKind::EmptyStatement, vec![semi]))
            }
            TokenKind::Return => {
                let mut children = vec![self.bump()];
                if !self.at(TokenKind::Semicolon) {
                    children.push(SyntaxElement::Node(self.parse_expression()?));
                }
                children.push(self.expect(TokenKind::Semicolon, "';'")?);
                Ok(self.node(NodeKind::ReturnStatement, children))
            }
            TokenKind::If => {
                let mut children = vec![self.bump()];
                children.push(self.expect(TokenKind::OpenParen, "'('")?);
                children.push(SyntaxElement::Node(self.parse_expression()?));
                children.push(self.expect(TokenKind::CloseParen, "')'")?);
                children.push(SyntaxElement::Node(self.parse_statement()?));
                if let Some(else_kw) = self.eat(TokenKind::Else) {
                    children.push(else_kw);
                    children.push(SyntaxElement::Node(self.parse_statement()?));
                }
                Ok(self.node(NodeKind::IfStatement, children))
            }
            TokenKind::While => {
                let mut children = vec![self.bump()];
                children.push(self.expect(TokenKind::OpenParen, "'('")?);
                children.push(SyntaxElement::Node(self.parse_expression()?));
                children.push(self.expect(TokenKind::CloseParen, "')'")?);
                children.push(SyntaxElement::Node(self.parse_statement()?));
                Ok(self.node(NodeKind::WhileStatement, children))
            }
            TokenKind::Const => self.parse_local_declaration(),
            _ if self.is_local_declaration() => self.parse_local_declaration(),
            _ => {
                let expr = self.parse_expression()?;
                let semi = self.expect(TokenKind::Semicolon, "';'")?;
                Ok(self.node(
                    NodeKind::ExpressionStatement,
                    vec![SyntaxElement::Node(expr), semi],
                ))
            }
        }
    }

    /// `Type name =`, `Type name;` or `Type name,` ahead.
    fn is_local_declaration(&self) -> bool {
        let Some(end) = self.scan_type(self.pos) else {
            return false;
        };
        self.kind_at(end) == TokenKind::Identifier
            && matches!(
                self.kind_at(end + 1),
                TokenKind::Equals | TokenKind::Semicolon | TokenKind::Comma
            )
    }

    fn parse_local_declaration(&mut self) -> PResult<NodeId> {
        let mut children = Vec::new();
        if let Some(const_kw) = self.eat(TokenKind::Const) {
            children.push(const_kw);
        }
        children.push(SyntaxElement::Node(self.parse_type()?));
        self.parse_declarators(&mut children)?;
        children.push(self.expect(TokenKind::Semicolon, "';'")?);
        Ok(self.node(NodeKind::LocalDeclarationStatement, children))
    }

    // --- Expressions ---

    fn parse_expression(&mut self) -> PResult<NodeId> {
        let left = self.parse_binary(1)?;
        if self.current().is_assignment() {
            let op = self.bump();
            let right = self.parse_expression()?;
            return Ok(self.node(
                NodeKind::AssignmentExpression,
                vec![SyntaxElement::Node(left), op, SyntaxElement::Node(right)],
            ));
        }
        Ok(left)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> PResult<NodeId> {
        let mut left = self.parse_unary()?;
        while let Some(precedence) = binary_precedence(self.current())
            && precedence >= min_precedence
        {
            let op = self.bump();
            let right = self.parse_binary(precedence + 1)?;
            left = self.node(
                NodeKind::BinaryExpression,
                vec![SyntaxElement::Node(left), op, SyntaxElement::Node(right)],
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<NodeId> {
        match self.current() {
            TokenKind::Minus | TokenKind::Plus | TokenKind::Exclamation | TokenKind::Tilde => {
                let op = self.bump();
                let operand = self.parse_unary()?;
                Ok(self.node(
                    NodeKind::PrefixUnaryExpression,
                    vec![op, SyntaxElement::Node(operand)],
                ))
            }
            TokenKind::OpenParen if self.is_cast() => {
                let open = self.bump();
                let ty = self.parse_type()?;
                let close = self.expect(TokenKind::CloseParen, "')'")?;
                let operand = self.parse_unary()?;
                Ok(self.node(
                    NodeKind::CastExpression,
                    vec![open, SyntaxElement::Node(ty), close, SyntaxElement::Node(operand)],
                ))
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    /// `(Type)` followed by something that can start an operand.
    fn is_cast(&self) -> bool {
        let Some(end) = self.scan_type(self.pos + 1) else {
            return false;
        };
        if self.kind_at(end) != TokenKind::CloseParen {
            return false;
        }
        if self.nth(1).is_predefined_type() {
            return true;
        }
        let next = self.kind_at(end + 1);
        next.is_literal()
            || matches!(
                next,
                TokenKind::Identifier
                    | TokenKind::OpenParen
                    | TokenKind::Tilde
                    | TokenKind::Exclamation
                    | TokenKind::This
                    | TokenKind::New
            )
    }

    fn parse_primary(&mut self) -> PResult<NodeId> {
        let kind = self.current();
        if kind.is_literal() {
            let token = self.bump();
            return Ok(self.node(NodeKind::LiteralExpression, vec![token]));
        }
        match kind {
            TokenKind::Identifier => {
                let token = self.bump();
                Ok(self.node(NodeKind::IdentifierName, vec![token]))
            }
            TokenKind::This => {
                let token = self.bump();
                Ok(self.node(NodeKind::ThisExpression, vec![token]))
            }
            k if k.is_predefined_type() => {
                let token = self.bump();
                Ok(self.node(NodeKind::PredefinedType, vec![token]))
            }
            TokenKind::OpenParen => {
                let open = self.bump();
                let expr = self.parse_expression()?;
                let close = self.expect(TokenKind::CloseParen, "')'")?;
                Ok(self.node(
                    NodeKind::ParenthesizedExpression,
                    vec![open, SyntaxElement::Node(expr), close],
                ))
            }
            TokenKind::New => {
                let new_kw = self.bump();
                let ty = self.parse_type()?;
                let args = self.parse_argument_list(TokenKind::OpenParen, TokenKind::CloseParen)?;
                Ok(self.node(
                    NodeKind::ObjectCreationExpression,
                    vec![new_kw, SyntaxElement::Node(ty), SyntaxElement::Node(args)],
                ))
            }
            _ => Err(self.expected("expression")),
        }
    }

    fn parse_postfix(&mut self, mut expr: NodeId) -> PResult<NodeId> {
        loop {
            match self.current() {
                TokenKind::Dot => {
                    let dot = self.bump();
                    let name_token = self.expect(TokenKind::Identifier, "member name")?;
                    let name = self.node(NodeKind::IdentifierName, vec![name_token]);
                    expr = self.node(
                        NodeKind::MemberAccessExpression,
                        vec![SyntaxElement::Node(expr), dot, SyntaxElement::Node(name)],
                    );
                }
                TokenKind::OpenParen => {
                    let args = self.parse_argument_list(TokenKind::OpenParen, TokenKind::CloseParen)?;
                    expr = self.node(
                        NodeKind::InvocationExpression,
                        vec![SyntaxElement::Node(expr), SyntaxElement::Node(args)],
                    );
                }
                TokenKind::OpenBracket => {
                    let args =
                        self.parse_argument_list(TokenKind::OpenBracket, TokenKind::CloseBracket)?;
                    expr = self.node(
                        NodeKind::ElementAccessExpression,
                        vec![SyntaxElement::Node(expr), SyntaxElement::Node(args)],
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_argument_list(&mut self, open: TokenKind, close: TokenKind) -> PResult<NodeId> {
        let open_text = if open == TokenKind::OpenParen { "'('" } else { "'['" };
        let close_text = if close == TokenKind::CloseParen { "')'" } else { "']'" };
        let mut children = vec![self.expect(open, open_text)?];
        if !self.at(close) {
            loop {
                children.push(SyntaxElement::Node(self.parse_argument()?));
                match self.eat(TokenKind::Comma) {
                    Some(comma) => children.push(comma),
                    None => break,
                }
            }
        }
        children.push(self.expect(close, close_text)?);
        Ok(self.node(NodeKind::ArgumentList, children))
    }

    fn parse_argument(&mut self) -> PResult<NodeId> {
        let mut children = Vec::new();
        if self.at(TokenKind::Identifier) && self.nth(1) == TokenKind::Colon {
            let name_token = self.bump();
            let name = self.node(NodeKind::IdentifierName, vec![name_token]);
            let colon = self.bump();
            children.push(SyntaxElement::Node(
                self.node(NodeKind::NameColon, vec![SyntaxElement::Node(name), colon]),
            ));
        }
        if matches!(
            self.current(),
            TokenKind::Ref | TokenKind::Out | TokenKind::In
        ) {
            children.push(self.bump());
        }
        children.push(SyntaxElement::Node(self.parse_expression()?));
        Ok(self.node(NodeKind::Argument, children))
    }
}
