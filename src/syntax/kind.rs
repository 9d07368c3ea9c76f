//! Token, trivia and node kinds of the host language.

use phf::{Map, phf_map};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    EndOfFile,

    // Literals and names
    Identifier,
    IntegerLiteral,
    CharLiteral,
    /// `"..."` or `@"..."`.
    StringLiteral,
    /// `"""..."""` on one line.
    SingleLineRawStringLiteral,
    /// `"""` newline ... newline `"""`.
    MultiLineRawStringLiteral,
    /// `$"..."` and friends. Never a pattern.
    InterpolatedStringLiteral,

    // Keywords
    Abstract,
    Bool,
    Char,
    Class,
    Const,
    Double,
    Else,
    Enum,
    False,
    If,
    In,
    Int,
    Internal,
    Long,
    Namespace,
    New,
    Null,
    Object,
    Out,
    Override,
    Params,
    Partial,
    Private,
    Protected,
    Public,
    Readonly,
    Ref,
    Return,
    Sealed,
    Static,
    String,
    Struct,
    This,
    True,
    Using,
    Virtual,
    Void,
    While,

    // Punctuation
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,
    Question,

    // Operators
    Equals,
    EqualsEquals,
    EqualsGreater,
    Exclamation,
    ExclamationEquals,
    Less,
    LessEquals,
    LessLess,
    Greater,
    GreaterEquals,
    GreaterGreater,
    Plus,
    PlusEquals,
    Minus,
    MinusEquals,
    Asterisk,
    Slash,
    Percent,
    Ampersand,
    AmpersandAmpersand,
    AmpersandEquals,
    Bar,
    BarBar,
    BarEquals,
    Caret,
    CaretEquals,
    Tilde,
}

impl TokenKind {
    /// Kinds whose text is a plain string literal. Interpolated strings are excluded.
    pub fn is_string_literal(self) -> bool {
        matches!(
            self,
            TokenKind::StringLiteral
                | TokenKind::SingleLineRawStringLiteral
                | TokenKind::MultiLineRawStringLiteral
        )
    }

    pub fn is_predefined_type(self) -> bool {
        matches!(
            self,
            TokenKind::Bool
                | TokenKind::Char
                | TokenKind::Double
                | TokenKind::Int
                | TokenKind::Long
                | TokenKind::Object
                | TokenKind::String
                | TokenKind::Void
        )
    }

    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            TokenKind::Abstract
                | TokenKind::Const
                | TokenKind::Internal
                | TokenKind::New
                | TokenKind::Override
                | TokenKind::Partial
                | TokenKind::Private
                | TokenKind::Protected
                | TokenKind::Public
                | TokenKind::Readonly
                | TokenKind::Sealed
                | TokenKind::Static
                | TokenKind::Virtual
        )
    }

    pub fn is_literal(self) -> bool {
        self.is_string_literal()
            || matches!(
                self,
                TokenKind::IntegerLiteral
                    | TokenKind::CharLiteral
                    | TokenKind::InterpolatedStringLiteral
                    | TokenKind::True
                    | TokenKind::False
                    | TokenKind::Null
            )
    }

    /// Compound assignment operators plus `=`.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            TokenKind::Equals
                | TokenKind::PlusEquals
                | TokenKind::MinusEquals
                | TokenKind::BarEquals
                | TokenKind::AmpersandEquals
                | TokenKind::CaretEquals
        )
    }
}

/// Reserved words. Contextual keywords such as `var` stay identifiers.
pub(crate) static KEYWORDS: Map<&'static str, TokenKind> = phf_map! {
    "abstract" => TokenKind::Abstract,
    "bool" => TokenKind::Bool,
    "char" => TokenKind::Char,
    "class" => TokenKind::Class,
    "const" => TokenKind::Const,
    "double" => TokenKind::Double,
    "else" => TokenKind::Else,
    "enum" => TokenKind::Enum,
    "false" => TokenKind::False,
    "if" => TokenKind::If,
    "in" => TokenKind::In,
    "int" => TokenKind::Int,
    "internal" => TokenKind::Internal,
    "long" => TokenKind::Long,
    "namespace" => TokenKind::Namespace,
    "new" => TokenKind::New,
    "null" => TokenKind::Null,
    "object" => TokenKind::Object,
    "out" => TokenKind::Out,
    "override" => TokenKind::Override,
    "params" => TokenKind::Params,
    "partial" => TokenKind::Partial,
    "private" => TokenKind::Private,
    "protected" => TokenKind::Protected,
    "public" => TokenKind::Public,
    "readonly" => TokenKind::Readonly,
    "ref" => TokenKind::Ref,
    "return" => TokenKind::Return,
    "sealed" => TokenKind::Sealed,
    "static" => TokenKind::Static,
    "string" => TokenKind::String,
    "struct" => TokenKind::Struct,
    "this" => TokenKind::This,
    "true" => TokenKind::True,
    "using" => TokenKind::Using,
    "virtual" => TokenKind::Virtual,
    "void" => TokenKind::Void,
    "while" => TokenKind::While,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriviaKind {
    Whitespace,
    EndOfLine,
    SingleLineComment,
    MultiLineComment,
}

impl TriviaKind {
    pub fn is_comment(self) -> bool {
        matches!(self, TriviaKind::SingleLineComment | TriviaKind::MultiLineComment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    CompilationUnit,
    UsingDirective,
    NamespaceDeclaration,
    ClassDeclaration,
    StructDeclaration,
    EnumDeclaration,
    EnumMemberDeclaration,
    AttributeList,
    FieldDeclaration,
    VariableDeclarator,
    ConstructorDeclaration,
    MethodDeclaration,
    ParameterList,
    Parameter,
    ArrowExpressionClause,

    // Types
    PredefinedType,
    QualifiedName,
    ArrayType,
    NullableType,

    // Statements
    Block,
    LocalDeclarationStatement,
    ExpressionStatement,
    ReturnStatement,
    IfStatement,
    WhileStatement,
    EmptyStatement,

    // Expressions
    LiteralExpression,
    IdentifierName,
    ThisExpression,
    MemberAccessExpression,
    InvocationExpression,
    ObjectCreationExpression,
    ElementAccessExpression,
    ArgumentList,
    Argument,
    NameColon,
    ParenthesizedExpression,
    CastExpression,
    PrefixUnaryExpression,
    BinaryExpression,
    AssignmentExpression,
}

impl NodeKind {
    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::ClassDeclaration | NodeKind::StructDeclaration | NodeKind::EnumDeclaration
        )
    }

    pub fn is_type_syntax(self) -> bool {
        matches!(
            self,
            NodeKind::PredefinedType
                | NodeKind::QualifiedName
                | NodeKind::ArrayType
                | NodeKind::NullableType
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(KEYWORDS.get("class"), Some(&TokenKind::Class));
        assert_eq!(KEYWORDS.get("var"), None);
        assert_eq!(KEYWORDS.get("Class"), None);
    }

    #[test]
    fn test_interpolated_string_is_not_string_literal() {
        assert!(TokenKind::StringLiteral.is_string_literal());
        assert!(TokenKind::MultiLineRawStringLiteral.is_string_literal());
        assert!(!TokenKind::InterpolatedStringLiteral.is_string_literal());
        assert!(!TokenKind::CharLiteral.is_string_literal());
    }
}
