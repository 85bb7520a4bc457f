//! The closed tag table and its version history

use std::fmt;

/// Newest IR format version this crate emits
pub const CURRENT_VERSION: u32 = 2;

/// Oldest IR format version; its vocabulary is the base tag set
pub const BASE_VERSION: u32 = 1;

pub fn is_known_version(version: u32) -> bool {
    (BASE_VERSION..=CURRENT_VERSION).contains(&version)
}

/// Node tags. Statements occupy `0..100`, expressions `100..`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Block,
    Return,
    If,
    Let,
    Const,
    Var,
    For,
    While,
    Continue,
    Break,
    ForOf,

    Binary,
    Assignment,
    Logical,
    Unary,
    MemberAccess,
    IndexAccess,
    Call,
    ArrayExpr,
    ObjectExpr,
    PostUpdate,
    PreUpdate,
    StringLiteral,
    NumericLiteral,
    Conditional,
    Deref,
    AddressOf,
}

impl NodeTag {
    pub const ALL: [NodeTag; 27] = [
        NodeTag::Block,
        NodeTag::Return,
        NodeTag::If,
        NodeTag::Let,
        NodeTag::Const,
        NodeTag::Var,
        NodeTag::For,
        NodeTag::While,
        NodeTag::Continue,
        NodeTag::Break,
        NodeTag::ForOf,
        NodeTag::Binary,
        NodeTag::Assignment,
        NodeTag::Logical,
        NodeTag::Unary,
        NodeTag::MemberAccess,
        NodeTag::IndexAccess,
        NodeTag::Call,
        NodeTag::ArrayExpr,
        NodeTag::ObjectExpr,
        NodeTag::PostUpdate,
        NodeTag::PreUpdate,
        NodeTag::StringLiteral,
        NodeTag::NumericLiteral,
        NodeTag::Conditional,
        NodeTag::Deref,
        NodeTag::AddressOf,
    ];

    /// Numeric wire code
    pub fn code(self) -> u16 {
        match self {
            NodeTag::Block => 0,
            NodeTag::Return => 1,
            NodeTag::If => 2,
            NodeTag::Let => 3,
            NodeTag::Const => 4,
            NodeTag::Var => 5,
            NodeTag::For => 6,
            NodeTag::While => 7,
            NodeTag::Continue => 8,
            NodeTag::Break => 9,
            NodeTag::ForOf => 10,
            NodeTag::Binary => 100,
            NodeTag::Assignment => 101,
            NodeTag::Logical => 102,
            NodeTag::Unary => 103,
            NodeTag::MemberAccess => 104,
            NodeTag::IndexAccess => 105,
            NodeTag::Call => 106,
            NodeTag::ArrayExpr => 107,
            NodeTag::ObjectExpr => 108,
            NodeTag::PostUpdate => 109,
            NodeTag::PreUpdate => 110,
            NodeTag::StringLiteral => 111,
            NodeTag::NumericLiteral => 112,
            NodeTag::Conditional => 113,
            NodeTag::Deref => 114,
            NodeTag::AddressOf => 115,
        }
    }

    pub fn from_code(code: u64) -> Option<NodeTag> {
        NodeTag::ALL.into_iter().find(|tag| u64::from(tag.code()) == code)
    }

    /// First format version that contains this tag
    pub fn since(self) -> u32 {
        match self {
            NodeTag::ForOf | NodeTag::Conditional | NodeTag::Deref | NodeTag::AddressOf => 2,
            _ => BASE_VERSION,
        }
    }

    pub fn is_statement(self) -> bool {
        self.code() < 100
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeTag::Block => "Block",
            NodeTag::Return => "Return",
            NodeTag::If => "If",
            NodeTag::Let => "Let",
            NodeTag::Const => "Const",
            NodeTag::Var => "Var",
            NodeTag::For => "For",
            NodeTag::While => "While",
            NodeTag::Continue => "Continue",
            NodeTag::Break => "Break",
            NodeTag::ForOf => "ForOf",
            NodeTag::Binary => "BinaryExpr",
            NodeTag::Assignment => "AssignmentExpr",
            NodeTag::Logical => "LogicalExpr",
            NodeTag::Unary => "UnaryExpr",
            NodeTag::MemberAccess => "MemberAccess",
            NodeTag::IndexAccess => "IndexAccess",
            NodeTag::Call => "Call",
            NodeTag::ArrayExpr => "ArrayExpr",
            NodeTag::ObjectExpr => "ObjectExpr",
            NodeTag::PostUpdate => "PostUpdate",
            NodeTag::PreUpdate => "PreUpdate",
            NodeTag::StringLiteral => "StringLiteral",
            NodeTag::NumericLiteral => "NumericLiteral",
            NodeTag::Conditional => "ConditionalExpr",
            NodeTag::Deref => "Deref",
            NodeTag::AddressOf => "AddressOf",
        }
    }

    /// Whether `version` has this tag
    pub fn available_in(self, version: u32) -> bool {
        is_known_version(version) && self.since() <= version
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_round_trip() {
        for tag in NodeTag::ALL {
            assert_eq!(NodeTag::from_code(u64::from(tag.code())), Some(tag));
        }
        assert_eq!(NodeTag::from_code(11), None);
        assert_eq!(NodeTag::from_code(116), None);
    }

    #[test]
    fn test_version_availability() {
        assert!(NodeTag::Binary.available_in(1));
        assert!(!NodeTag::Conditional.available_in(1));
        assert!(NodeTag::Conditional.available_in(2));
        assert!(!NodeTag::Block.available_in(3));
        assert!(!is_known_version(0));
    }

    #[test]
    fn test_statement_range() {
        assert!(NodeTag::ForOf.is_statement());
        assert!(!NodeTag::Binary.is_statement());
    }
}
