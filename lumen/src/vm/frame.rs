//! Call frames.

/// One activation record. Locals (arguments first, then persistent scope
/// expressions) live on the operand stack starting at `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallFrame {
    /// Operand-stack index at call entry; the first argument's slot
    pub base: usize,
    /// Number of arguments the call consumed
    pub arity: usize,
    /// Instruction pointer to resume at after `RETURN`
    pub return_ip: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_fields() {
        let frame = CallFrame {
            base: 3,
            arity: 2,
            return_ip: 17,
        };
        assert_eq!(frame.base, 3);
        assert_eq!(frame.arity, 2);
        assert_eq!(frame.return_ip, 17);
    }
}
