//the closed set of wich types and the promotion lattice between them

use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WichType {
    Int,
    Float,
    String,
    Boolean,
    Vector,
    Void,
    Error,
}

impl WichType {
    pub fn name(self) -> &'static str {
        match self {
            WichType::Int => "int",
            WichType::Float => "float",
            WichType::String => "string",
            WichType::Boolean => "boolean",
            WichType::Vector => "[]",
            WichType::Void => "void",
            WichType::Error => "<error>",
        }
    }

    pub fn from_name(name: &str) -> Option<WichType> {
        match name {
            "int" => Some(WichType::Int),
            "float" => Some(WichType::Float),
            "string" => Some(WichType::String),
            "boolean" => Some(WichType::Boolean),
            "[]" => Some(WichType::Vector),
            _ => None,
        }
    }

    //the builtin types, in the order they are defined in the predefined scope
    pub fn builtins() -> [WichType; 5] {
        [
            WichType::Int,
            WichType::Float,
            WichType::String,
            WichType::Vector,
            WichType::Boolean,
        ]
    }

    //strings and vectors live on the heap and are reference counted
    pub fn is_heap(self) -> bool {
        matches!(self, WichType::String | WichType::Vector)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, WichType::Int | WichType::Float)
    }

    fn numeric_rank(self) -> Option<u8> {
        match self {
            WichType::Int => Some(0),
            WichType::Float => Some(1),
            WichType::Vector => Some(2),
            _ => None,
        }
    }
}

impl Display for WichType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//result of arithmetic between int, float and vector operands: the wider of the two
pub fn arithmetic_result(left: WichType, right: WichType) -> Option<WichType> {
    let l = left.numeric_rank()?;
    let r = right.numeric_rank()?;
    Some(if l >= r { left } else { right })
}

//identity, or int widened to float
pub fn can_assign(from: WichType, to: WichType) -> bool {
    from == to || (from == WichType::Int && to == WichType::Float)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_widens_to_the_larger_operand() {
        assert_eq!(arithmetic_result(WichType::Int, WichType::Int), Some(WichType::Int));
        assert_eq!(arithmetic_result(WichType::Int, WichType::Float), Some(WichType::Float));
        assert_eq!(arithmetic_result(WichType::Vector, WichType::Int), Some(WichType::Vector));
        assert_eq!(arithmetic_result(WichType::Float, WichType::Vector), Some(WichType::Vector));
        assert_eq!(arithmetic_result(WichType::String, WichType::String), None);
        assert_eq!(arithmetic_result(WichType::Boolean, WichType::Int), None);
    }

    #[test]
    fn assignment_only_widens_int_to_float() {
        assert!(can_assign(WichType::Int, WichType::Float));
        assert!(can_assign(WichType::String, WichType::String));
        assert!(!can_assign(WichType::Float, WichType::Int));
        assert!(!can_assign(WichType::Int, WichType::Vector));
    }
}
