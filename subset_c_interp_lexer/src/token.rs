//! Token definitions for the C99-subset lexer.

use logos::Logos;

/// C tokens.
///
/// Literal payloads are not stored in the token itself; the lexer hands back
/// the matched source text alongside each token and `literals` decodes it.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f\x0b]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
#[logos(skip r"\\\n")]
pub enum Token {
    // ==================== Keywords ====================
    #[token("auto")]
    KwAuto,
    #[token("break")]
    KwBreak,
    #[token("case")]
    KwCase,
    #[token("char")]
    KwChar,
    #[token("const")]
    KwConst,
    #[token("continue")]
    KwContinue,
    #[token("default")]
    KwDefault,
    #[token("do")]
    KwDo,
    #[token("double")]
    KwDouble,
    #[token("else")]
    KwElse,
    #[token("enum")]
    KwEnum,
    #[token("extern")]
    KwExtern,
    #[token("float")]
    KwFloat,
    #[token("for")]
    KwFor,
    #[token("goto")]
    KwGoto,
    #[token("if")]
    KwIf,
    #[token("int")]
    KwInt,
    #[token("long")]
    KwLong,
    #[token("register")]
    KwRegister,
    #[token("return")]
    KwReturn,
    #[token("short")]
    KwShort,
    #[token("signed")]
    KwSigned,
    #[token("sizeof")]
    KwSizeof,
    #[token("static")]
    KwStatic,
    #[token("struct")]
    KwStruct,
    #[token("switch")]
    KwSwitch,
    #[token("typedef")]
    KwTypedef,
    #[token("union")]
    KwUnion,
    #[token("unsigned")]
    KwUnsigned,
    #[token("void")]
    KwVoid,
    #[token("while")]
    KwWhile,

    // ==================== Operators ====================
    #[token(",")]
    Comma,
    #[token("=")]
    Assign,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token("%=")]
    ModAssign,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("||")]
    LogicalOr,
    #[token("&&")]
    LogicalAnd,
    #[token("|")]
    BitOr,
    #[token("^")]
    BitXor,
    #[token("&")]
    Ampersand,
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token("<")]
    LessThan,
    #[token(">")]
    GreaterThan,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,
    #[token("!")]
    Not,
    #[token("~")]
    Tilde,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    // ==================== Punctuation ====================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token("...")]
    Ellipsis,

    // ==================== Preprocessor ====================
    /// `#include <name>` or `#include "name"`; the target is in the text.
    #[regex(r#"#[ \t]*include[ \t]*(<[^>\n]*>|"[^"\n]*")"#)]
    HashInclude,
    #[regex(r"#[ \t]*define")]
    HashDefine,

    // ==================== Literals ====================
    #[regex(r"0[xX][0-9a-fA-F]+[uUlL]*|0[0-7]*[uUlL]*|[1-9][0-9]*[uUlL]*")]
    IntLit,
    #[regex(r"([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?[fF]?|[0-9]+[eE][+-]?[0-9]+[fF]?")]
    FloatLit,
    #[regex(r"'(\\[^\n]|[^\\'\n])+'")]
    CharLit,
    #[regex(r#""(\\[^\n]|[^\\"\n])*""#)]
    StrLit,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // ==================== Synthetic ====================
    // Never produced by the lexer; used by the interpreter's expression
    // machinery (cast operator node, macro-body terminator, end of stream).
    Cast,
    EndOfMacro,
    Eof,
}

impl Token {
    /// Printable operator name, for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Token::Comma => ",",
            Token::Assign => "=",
            Token::AddAssign => "+=",
            Token::SubAssign => "-=",
            Token::MulAssign => "*=",
            Token::DivAssign => "/=",
            Token::ModAssign => "%=",
            Token::ShlAssign => "<<=",
            Token::ShrAssign => ">>=",
            Token::AndAssign => "&=",
            Token::OrAssign => "|=",
            Token::XorAssign => "^=",
            Token::Question => "?",
            Token::Colon => ":",
            Token::LogicalOr => "||",
            Token::LogicalAnd => "&&",
            Token::BitOr => "|",
            Token::BitXor => "^",
            Token::Ampersand => "&",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::LessThan => "<",
            Token::GreaterThan => ">",
            Token::LessEqual => "<=",
            Token::GreaterEqual => ">=",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Increment => "++",
            Token::Decrement => "--",
            Token::Not => "!",
            Token::Tilde => "~",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Dot => ".",
            Token::Arrow => "->",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Semicolon => ";",
            Token::Ellipsis => "...",
            Token::Cast => "cast",
            Token::KwSizeof => "sizeof",
            Token::Eof => "end of input",
            _ => "token",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<Token> {
        Token::lexer(src).map(|t| t.unwrap()).collect()
    }

    #[test]
    fn lexes_operators_with_maximal_munch() {
        assert_eq!(
            kinds("a <<= b >> c->d"),
            vec![
                Token::Ident,
                Token::ShlAssign,
                Token::Ident,
                Token::Shr,
                Token::Ident,
                Token::Arrow,
                Token::Ident,
            ]
        );
        assert_eq!(kinds("x---y"), vec![Token::Ident, Token::Decrement, Token::Minus, Token::Ident]);
    }

    #[test]
    fn lexes_number_shapes() {
        assert_eq!(kinds("0 12 0x1F 017 42UL 1.5 1e3 2.f"), vec![Token::IntLit; 5].into_iter().chain(vec![Token::FloatLit; 3]).collect::<Vec<_>>());
    }

    #[test]
    fn skips_comments() {
        assert_eq!(kinds("a // line\n/* block\n * more */ b"), vec![Token::Ident, Token::Ident]);
        assert_eq!(kinds("/* tricky **/ x"), vec![Token::Ident]);
    }

    #[test]
    fn lexes_include_directive_as_one_token() {
        assert_eq!(kinds("#include <stdio.h>\nint"), vec![Token::HashInclude, Token::KwInt]);
        assert_eq!(kinds("#include \"local.h\""), vec![Token::HashInclude]);
    }

    #[test]
    fn lexes_string_and_char_literals() {
        assert_eq!(kinds(r#""hi \"there\"" 'a' '\n'"#), vec![Token::StrLit, Token::CharLit, Token::CharLit]);
    }
}
