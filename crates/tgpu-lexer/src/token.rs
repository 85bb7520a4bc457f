//! Token definitions for the JS/TS surface syntax

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")] // Skip whitespace
#[logos(skip r"//[^\n]*")] // Skip line comments
pub enum TokenKind {
    // === Reserved words ===
    #[token("break")]
    Break,
    #[token("case")]
    Case,
    #[token("catch")]
    Catch,
    #[token("class")]
    Class,
    #[token("const")]
    Const,
    #[token("continue")]
    Continue,
    #[token("debugger")]
    Debugger,
    #[token("default")]
    Default,
    #[token("delete")]
    Delete,
    #[token("do")]
    Do,
    #[token("else")]
    Else,
    #[token("export")]
    Export,
    #[token("extends")]
    Extends,
    #[token("finally")]
    Finally,
    #[token("for")]
    For,
    #[token("function")]
    Function,
    #[token("if")]
    If,
    #[token("import")]
    Import,
    #[token("in")]
    In,
    #[token("instanceof")]
    InstanceOf,
    #[token("let")]
    Let,
    #[token("new")]
    New,
    #[token("return")]
    Return,
    #[token("super")]
    Super,
    #[token("switch")]
    Switch,
    #[token("this")]
    This,
    #[token("throw")]
    Throw,
    #[token("try")]
    Try,
    #[token("typeof")]
    Typeof,
    #[token("var")]
    Var,
    #[token("void")]
    Void,
    #[token("while")]
    While,
    #[token("with")]
    With,

    // Literals
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // === Operators ===
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    Ne,
    #[token("!==")]
    NeEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    /// Division or the start of a regex literal; the parser decides
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,

    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token(">>>")]
    UShr,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,

    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("??")]
    QuestionQuestion,
    #[token("!")]
    Bang,

    // Assignment forms
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("**=")]
    StarStarEq,
    /// `/=` or the start of a regex literal beginning with `=`
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("<<=")]
    ShlEq,
    #[token(">>=")]
    ShrEq,
    #[token(">>>=")]
    UShrEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,
    #[token("&&=")]
    AndAndEq,
    #[token("||=")]
    OrOrEq,
    #[token("??=")]
    QuestionQuestionEq,

    #[token("=>")]
    FatArrow,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // === Punctuation ===
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("?")]
    Question,
    #[token("?.")]
    QuestionDot,
    #[token("@")]
    At,

    // === Literals ===
    #[regex(r"[0-9][0-9_]*n?")]
    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9_]+)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9_]+")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?")]
    #[regex(r"0[xX][0-9a-fA-F_]+n?")]
    #[regex(r"0[oO][0-7_]+n?")]
    #[regex(r"0[bB][01_]+n?")]
    Number,

    #[regex(r#""([^"\\\n]|\\[^\r\n]|\\\r?\n)*""#)]
    #[regex(r#"'([^'\\\n]|\\[^\r\n]|\\\r?\n)*'"#)]
    String,

    /// A whole template literal, including every `${...}` substitution
    #[token("`", lex_template)]
    Template,

    // === Identifiers ===
    #[regex(r"[a-zA-Z_$\u{80}-\u{10FFFF}][a-zA-Z0-9_$\u{80}-\u{10FFFF}]*")]
    Ident,

    #[regex(r"#[a-zA-Z_$][a-zA-Z0-9_$]*")]
    PrivateName,

    // === Special ===
    /// Never emitted: the callback skips the comment or reports it unterminated
    #[token("/*", skip_block_comment)]
    BlockComment,

    /// A regex literal; produced by re-lexing after the parser asks for one
    Regex,
    Error,
    Eof,
}

fn skip_block_comment(lex: &mut logos::Lexer<TokenKind>) -> logos::FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            logos::FilterResult::Skip
        }
        None => {
            let rest = lex.remainder().len();
            lex.bump(rest);
            logos::FilterResult::Error(())
        }
    }
}

fn lex_template(lex: &mut logos::Lexer<TokenKind>) -> bool {
    match scan_template(lex.remainder()) {
        Some(len) => {
            lex.bump(len);
            true
        }
        None => {
            let rest = lex.remainder().len();
            lex.bump(rest);
            false
        }
    }
}

/// Length of the rest of a template literal after its opening backtick,
/// including the closing backtick
pub fn scan_template(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Some(i + 1),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i += 2 + scan_substitution(&rest[i + 2..])?;
            }
            _ => i += 1,
        }
    }
    None
}

/// Length of a `${ ... }` substitution body after the `${`, including the
/// closing brace. Skips nested strings, templates and comments.
pub fn scan_substitution(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                if depth == 0 {
                    return Some(i + 1);
                }
                depth -= 1;
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'`' => {
                i += scan_template(&rest[i + 1..])?;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = rest[i + 2..].find("*/")?;
                i += end + 3;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Length of a regex literal body starting right after its opening `/`,
/// including the closing `/` and any flags
pub fn scan_regex(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut i = 0;
    let mut in_class = false;
    loop {
        match *bytes.get(i)? {
            b'\\' => i += 2,
            b'\n' => return None,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'$' || bytes[i] == b'_') {
                    i += 1;
                }
                return Some(i);
            }
            _ => i += 1,
        }
    }
}

impl TokenKind {
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Break
                | TokenKind::Case
                | TokenKind::Catch
                | TokenKind::Class
                | TokenKind::Const
                | TokenKind::Continue
                | TokenKind::Debugger
                | TokenKind::Default
                | TokenKind::Delete
                | TokenKind::Do
                | TokenKind::Else
                | TokenKind::Export
                | TokenKind::Extends
                | TokenKind::Finally
                | TokenKind::For
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::Import
                | TokenKind::In
                | TokenKind::InstanceOf
                | TokenKind::Let
                | TokenKind::New
                | TokenKind::Return
                | TokenKind::Super
                | TokenKind::Switch
                | TokenKind::This
                | TokenKind::Throw
                | TokenKind::Try
                | TokenKind::Typeof
                | TokenKind::Var
                | TokenKind::Void
                | TokenKind::While
                | TokenKind::With
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }

    /// Tokens that may be used as a property name after `.` or as an object key
    pub fn is_identifier_name(&self) -> bool {
        *self == TokenKind::Ident || self.is_keyword()
    }

    /// Compound or plain assignment operator text
    pub fn assign_op(&self) -> Option<&'static str> {
        Some(match self {
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::StarStarEq => "**=",
            TokenKind::SlashEq => "/=",
            TokenKind::PercentEq => "%=",
            TokenKind::ShlEq => "<<=",
            TokenKind::ShrEq => ">>=",
            TokenKind::UShrEq => ">>>=",
            TokenKind::AmpEq => "&=",
            TokenKind::PipeEq => "|=",
            TokenKind::CaretEq => "^=",
            TokenKind::AndAndEq => "&&=",
            TokenKind::OrOrEq => "||=",
            TokenKind::QuestionQuestionEq => "??=",
            _ => return None,
        })
    }

    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Break => "'break'",
            TokenKind::Case => "'case'",
            TokenKind::Catch => "'catch'",
            TokenKind::Class => "'class'",
            TokenKind::Const => "'const'",
            TokenKind::Continue => "'continue'",
            TokenKind::Debugger => "'debugger'",
            TokenKind::Default => "'default'",
            TokenKind::Delete => "'delete'",
            TokenKind::Do => "'do'",
            TokenKind::Else => "'else'",
            TokenKind::Export => "'export'",
            TokenKind::Extends => "'extends'",
            TokenKind::Finally => "'finally'",
            TokenKind::For => "'for'",
            TokenKind::Function => "'function'",
            TokenKind::If => "'if'",
            TokenKind::Import => "'import'",
            TokenKind::In => "'in'",
            TokenKind::InstanceOf => "'instanceof'",
            TokenKind::Let => "'let'",
            TokenKind::New => "'new'",
            TokenKind::Return => "'return'",
            TokenKind::Super => "'super'",
            TokenKind::Switch => "'switch'",
            TokenKind::This => "'this'",
            TokenKind::Throw => "'throw'",
            TokenKind::Try => "'try'",
            TokenKind::Typeof => "'typeof'",
            TokenKind::Var => "'var'",
            TokenKind::Void => "'void'",
            TokenKind::While => "'while'",
            TokenKind::With => "'with'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Null => "'null'",
            TokenKind::Eq => "'='",
            TokenKind::EqEq => "'=='",
            TokenKind::EqEqEq => "'==='",
            TokenKind::Ne => "'!='",
            TokenKind::NeEq => "'!=='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::StarStar => "'**'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::Shl => "'<<'",
            TokenKind::Shr => "'>>'",
            TokenKind::UShr => "'>>>'",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Caret => "'^'",
            TokenKind::Tilde => "'~'",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::QuestionQuestion => "'??'",
            TokenKind::Bang => "'!'",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::StarStarEq => "'**='",
            TokenKind::SlashEq => "'/='",
            TokenKind::PercentEq => "'%='",
            TokenKind::ShlEq => "'<<='",
            TokenKind::ShrEq => "'>>='",
            TokenKind::UShrEq => "'>>>='",
            TokenKind::AmpEq => "'&='",
            TokenKind::PipeEq => "'|='",
            TokenKind::CaretEq => "'^='",
            TokenKind::AndAndEq => "'&&='",
            TokenKind::OrOrEq => "'||='",
            TokenKind::QuestionQuestionEq => "'??='",
            TokenKind::FatArrow => "'=>'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Dot => "'.'",
            TokenKind::Ellipsis => "'...'",
            TokenKind::Question => "'?'",
            TokenKind::QuestionDot => "'?.'",
            TokenKind::At => "'@'",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Template => "template literal",
            TokenKind::Ident => "identifier",
            TokenKind::PrivateName => "private name",
            TokenKind::BlockComment => "comment",
            TokenKind::Regex => "regular expression",
            TokenKind::Error => "error",
            TokenKind::Eof => "end of file",
        }
    }
}
