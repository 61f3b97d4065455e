use crate::interpreter::errors::RuntimeError;
use crate::interpreter::isa::Operation;

impl Operation {
    /// Apply a binary operation to `(second, top)`, where `second` is the
    /// word just below the top of stack.
    ///
    /// Returns `None` for [`Operation::Rtn`], which is not arithmetic.
    /// Relational operations yield 0 or 1.
    pub fn apply(self, second: i32, top: i32, pc: i32) -> Option<Result<i32, RuntimeError>> {
        let overflow = |symbol: &str| RuntimeError::IntegerOverflow {
            operation: format!("{} {} {}", second, symbol, top),
            pc,
        };

        Some(match self {
            Operation::Rtn => return None,
            Operation::Add => second.checked_add(top).ok_or_else(|| overflow("+")),
            Operation::Sub => second.checked_sub(top).ok_or_else(|| overflow("-")),
            Operation::Mul => second.checked_mul(top).ok_or_else(|| overflow("*")),
            Operation::Div => {
                if top == 0 {
                    Err(RuntimeError::DivisionByZero { pc })
                } else {
                    second.checked_div(top).ok_or_else(|| overflow("/"))
                }
            }
            Operation::Eql => Ok((second == top) as i32),
            Operation::Neq => Ok((second != top) as i32),
            Operation::Lss => Ok((second < top) as i32),
            Operation::Leq => Ok((second <= top) as i32),
            Operation::Gtr => Ok((second > top) as i32),
            Operation::Geq => Ok((second >= top) as i32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(operation: Operation, second: i32, top: i32) -> i32 {
        operation.apply(second, top, 10).unwrap().unwrap()
    }

    #[test]
    fn test_subtraction_and_division_order() {
        assert_eq!(eval(Operation::Sub, 10, 3), 7);
        assert_eq!(eval(Operation::Div, 10, 3), 3);
        assert_eq!(eval(Operation::Div, -7, 2), -3);
    }

    #[test]
    fn test_relational_results() {
        assert_eq!(eval(Operation::Lss, 2, 3), 1);
        assert_eq!(eval(Operation::Geq, 2, 3), 0);
        assert_eq!(eval(Operation::Eql, 4, 4), 1);
        assert_eq!(eval(Operation::Neq, 4, 4), 0);
    }

    #[test]
    fn test_division_by_zero() {
        let result = Operation::Div.apply(1, 0, 22).unwrap();
        assert!(matches!(result, Err(RuntimeError::DivisionByZero { pc: 22 })));
    }

    #[test]
    fn test_overflow() {
        let result = Operation::Add.apply(i32::MAX, 1, 13).unwrap();
        assert!(matches!(result, Err(RuntimeError::IntegerOverflow { .. })));
        let result = Operation::Div.apply(i32::MIN, -1, 13).unwrap();
        assert!(matches!(result, Err(RuntimeError::IntegerOverflow { .. })));
    }

    #[test]
    fn test_return_is_not_arithmetic() {
        assert!(Operation::Rtn.apply(1, 2, 10).is_none());
    }
}
