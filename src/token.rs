//! Token model: the closed set of token kinds and the keyword table.

use crate::source::Span;

/// Every token kind the lexer can emit. Closed set; the parser matches
/// exhaustively and unknown input surfaces as [`TokenKind::Error`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TokenKind {
    // Import / module
    KwImport,
    KwFrom,
    KwAs,
    KwInclude,
    // Archetype declarations
    KwObj,
    KwClass,
    KwEnum,
    KwNode,
    KwEdge,
    KwWalker,
    // Member / ability declarations
    KwHas,
    KwCan,
    KwDef,
    KwStatic,
    KwOverride,
    KwImpl,
    KwSem,
    KwTest,
    // Scope
    KwGlob,
    GlobalOp,
    NonlocalOp,
    // Modifiers
    KwAbstract,
    // Control flow
    KwIf,
    KwElif,
    KwElse,
    KwFor,
    KwTo,
    KwBy,
    KwWhile,
    KwMatch,
    KwCase,
    KwTry,
    KwExcept,
    KwFinally,
    KwWith,
    KwReturn,
    KwYield,
    KwBreak,
    KwContinue,
    KwRaise,
    KwDelete,
    KwAssert,
    KwSkip,
    // Module-code / walker control
    KwEntry,
    KwExit,
    KwVisit,
    KwSpawn,
    KwDisengage,
    KwHere,
    KwRoot,
    // Async
    KwAsync,
    KwAwait,
    // Boolean / logical (keyword form; `&&`/`||` alias these)
    KwAnd,
    KwOr,
    Not,
    KwIn,
    KwIs,
    KwNin,
    KwIsn,
    KwLambda,
    // Access modifiers
    KwPub,
    KwPriv,
    KwProt,
    // Special references
    KwSelf,
    KwInit,
    KwSuper,
    KwPostInit,
    // Literal keywords
    Bool,
    Null,
    // Built-in type keywords
    TypString,
    TypInt,
    TypFloat,
    TypList,
    TypTuple,
    TypSet,
    TypDict,
    TypBool,
    TypBytes,
    TypAny,
    TypType,
    // Names and literals
    Name,
    KwescName,
    Int,
    Float,
    HexInt,
    BinInt,
    OctInt,
    Str,
    // F-string delimiters and fragments
    FDqStart,
    FSqStart,
    FTdqStart,
    FTsqStart,
    RfDqStart,
    RfSqStart,
    RfTdqStart,
    RfTsqStart,
    FDqEnd,
    FSqEnd,
    FTdqEnd,
    FTsqEnd,
    FTextDq,
    FTextSq,
    FTextTdq,
    FTextTsq,
    RfTextDq,
    RfTextSq,
    RfTextTdq,
    RfTextTsq,
    DLbrace,
    DRbrace,
    Conv,
    FFormatText,
    // Operators
    Plus,
    Minus,
    StarMul,
    Div,
    Mod,
    FloorDiv,
    StarPow,
    Lshift,
    Rshift,
    BwAnd,
    BwOr,
    BwXor,
    BwNot,
    Lt,
    Gt,
    Lte,
    Gte,
    Ee,
    Ne,
    Eq,
    WalrusEq,
    AddEq,
    SubEq,
    MulEq,
    DivEq,
    ModEq,
    FloorDivEq,
    StarPowEq,
    LshiftEq,
    RshiftEq,
    BwAndEq,
    BwOrEq,
    BwXorEq,
    MatmulEq,
    ReturnHint,
    // Graph-edge operators (lexed; walker semantics live elsewhere)
    ArrowL,
    ArrowR,
    ArrowBi,
    CarrowL,
    CarrowR,
    CarrowBi,
    // Pipes
    PipeFwd,
    PipeBkwd,
    DotFwd,
    DotBkwd,
    // Delimiters
    Dot,
    NullOk,
    Comma,
    Colon,
    Semi,
    Lparen,
    Rparen,
    Lbrace,
    Rbrace,
    Lsquare,
    Rsquare,
    Ellipsis,
    Decor,
    TypeOp,
    // Sentinels
    Error,
    Eof,
}

impl TokenKind {
    /// Keyword table: identifier text to keyword kind.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match ident {
            "import" => KwImport,
            "from" => KwFrom,
            "as" => KwAs,
            "include" => KwInclude,
            "obj" => KwObj,
            "class" => KwClass,
            "enum" => KwEnum,
            "node" => KwNode,
            "edge" => KwEdge,
            "walker" => KwWalker,
            "has" => KwHas,
            "can" => KwCan,
            "def" => KwDef,
            "static" => KwStatic,
            "override" => KwOverride,
            "impl" => KwImpl,
            "sem" => KwSem,
            "test" => KwTest,
            "glob" => KwGlob,
            "global" => GlobalOp,
            "nonlocal" => NonlocalOp,
            "abs" => KwAbstract,
            "if" => KwIf,
            "elif" => KwElif,
            "else" => KwElse,
            "for" => KwFor,
            "to" => KwTo,
            "by" => KwBy,
            "while" => KwWhile,
            "match" => KwMatch,
            "case" => KwCase,
            "try" => KwTry,
            "except" => KwExcept,
            "finally" => KwFinally,
            "with" => KwWith,
            "return" => KwReturn,
            "yield" => KwYield,
            "break" => KwBreak,
            "continue" => KwContinue,
            "raise" => KwRaise,
            "del" => KwDelete,
            "assert" => KwAssert,
            "skip" => KwSkip,
            "entry" => KwEntry,
            "exit" => KwExit,
            "visit" => KwVisit,
            "spawn" => KwSpawn,
            "disengage" => KwDisengage,
            "here" => KwHere,
            "root" => KwRoot,
            "async" => KwAsync,
            "await" => KwAwait,
            "and" => KwAnd,
            "or" => KwOr,
            "not" => Not,
            "in" => KwIn,
            "is" => KwIs,
            "lambda" => KwLambda,
            "pub" => KwPub,
            "priv" => KwPriv,
            "protect" => KwProt,
            "self" => KwSelf,
            "init" => KwInit,
            "super" => KwSuper,
            "postinit" => KwPostInit,
            "True" | "False" => Bool,
            "None" => Null,
            "str" => TypString,
            "int" => TypInt,
            "float" => TypFloat,
            "list" => TypList,
            "tuple" => TypTuple,
            "set" => TypSet,
            "dict" => TypDict,
            "bool" => TypBool,
            "bytes" => TypBytes,
            "any" => TypAny,
            "type" => TypType,
            _ => return None,
        })
    }

    /// True for the kinds that open an interpolated string.
    pub fn is_fstring_start(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            FDqStart
                | FSqStart
                | FTdqStart
                | FTsqStart
                | RfDqStart
                | RfSqStart
                | RfTdqStart
                | RfTsqStart
        )
    }

    /// True for the kinds that close an interpolated string.
    pub fn is_fstring_end(self) -> bool {
        use TokenKind::*;
        matches!(self, FDqEnd | FSqEnd | FTdqEnd | FTsqEnd)
    }

    /// True for literal-text fragments inside an interpolated string,
    /// including the escaped-brace kinds.
    pub fn is_fstring_text(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            FTextDq
                | FTextSq
                | FTextTdq
                | FTextTsq
                | RfTextDq
                | RfTextSq
                | RfTextTdq
                | RfTextTsq
                | DLbrace
                | DRbrace
        )
    }

    /// True for built-in type keywords usable as atoms.
    pub fn is_builtin_type(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            TypString
                | TypInt
                | TypFloat
                | TypList
                | TypTuple
                | TypSet
                | TypDict
                | TypBool
                | TypBytes
                | TypAny
                | TypType
        )
    }

    /// True for augmented-assignment operators.
    pub fn is_aug_assign(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            AddEq
                | SubEq
                | MulEq
                | DivEq
                | ModEq
                | FloorDivEq
                | StarPowEq
                | LshiftEq
                | RshiftEq
                | BwAndEq
                | BwOrEq
                | BwXorEq
                | MatmulEq
        )
    }

    /// True for comparison operators (including membership/identity).
    pub fn is_comparison(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Ee | Ne | Lt | Gt | Lte | Gte | KwIn | KwNin | KwIs | KwIsn
        )
    }
}

/// One lexed token: kind, raw source text, span.
#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            text: text.into(),
            span,
        }
    }
}

/// A comment captured by the lexer, for re-injection by the formatter.
#[derive(Clone, PartialEq, Debug)]
pub struct Comment {
    pub text: String,
    pub span: Span,
    pub is_block: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_hits_known_words() {
        assert_eq!(TokenKind::keyword("obj"), Some(TokenKind::KwObj));
        assert_eq!(TokenKind::keyword("impl"), Some(TokenKind::KwImpl));
        assert_eq!(TokenKind::keyword("True"), Some(TokenKind::Bool));
        assert_eq!(TokenKind::keyword("None"), Some(TokenKind::Null));
    }

    #[test]
    fn keyword_lookup_misses_identifiers() {
        assert_eq!(TokenKind::keyword("foo"), None);
        assert_eq!(TokenKind::keyword("Object"), None);
        assert_eq!(TokenKind::keyword(""), None);
    }

    #[test]
    fn builtin_types_are_keywords_and_atoms() {
        let kind = TokenKind::keyword("dict").unwrap();
        assert!(kind.is_builtin_type());
    }

    #[test]
    fn fstring_kind_classification() {
        assert!(TokenKind::FTdqStart.is_fstring_start());
        assert!(TokenKind::RfSqStart.is_fstring_start());
        assert!(TokenKind::FDqEnd.is_fstring_end());
        assert!(TokenKind::FTextTsq.is_fstring_text());
        assert!(TokenKind::DLbrace.is_fstring_text());
        assert!(!TokenKind::Str.is_fstring_text());
    }
}
