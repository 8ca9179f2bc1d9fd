//! API to control the interpreter.

use std::error::Error;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::rc::Rc;

use crate::ctx::Context;
use crate::diag::{Diagnostics, FullParseError};
use crate::eval::{Evaluator, RuntimeError};
use crate::parser::{Parser, ParserError};

/// Tree-walk interpreter.
///
/// One interpreter owns one global scope, so definitions persist across
/// `eval` calls.
///
/// # Example
///
/// Invoke the interpreter a first time to define a function then additional
/// times to call this function:
///
/// ```
/// # use tlox::interpreter::{Interpreter, TloxError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// let func_def = r#"
///     fun max(x, y) {
///         if (x > y) {
///             return x;
///         } else {
///             return y;
///         }
///     }
/// "#;
/// interp.eval(func_def.as_bytes())?;
///
/// interp.eval("print max(10, 20);".as_bytes()).expect("interpreter error");
/// interp.eval("print max(5, 4);".as_bytes()).expect("interpreter error");
///
/// assert_eq!(output, b"20\n5\n");
/// # Ok::<(), TloxError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    ctx: Rc<Context>,
    evaluator: Evaluator<'t, W>,
}

/// Errors the interpreter can raise.
#[derive(Debug)]
pub enum TloxError {
    /// Lexical and syntactic errors collected over one source unit.  The
    /// program was not executed.
    Parse(Vec<FullParseError>),

    /// The source could not be read.
    Read(io::Error),

    /// Error occurring during evaluation.
    Runtime(RuntimeError),
}

impl fmt::Display for TloxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TloxError::Parse(errors) => {
                let mut sep = "";
                for e in errors {
                    write!(f, "{}{}", sep, e)?;
                    sep = "\n";
                }
                Ok(())
            }
            TloxError::Read(e) => write!(f, "read error: {}", e),
            TloxError::Runtime(e) => write!(f, "{}", e),
        }
    }
}

impl Error for TloxError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TloxError::Parse(_) => None,
            TloxError::Read(e) => Some(e),
            TloxError::Runtime(e) => Some(e),
        }
    }
}

impl From<RuntimeError> for TloxError {
    fn from(e: RuntimeError) -> TloxError {
        TloxError::Runtime(e)
    }
}

impl From<ParserError> for TloxError {
    fn from(e: ParserError) -> TloxError {
        match e {
            ParserError::Parse(e) => TloxError::Parse(vec![e]),
            ParserError::Read(e) => TloxError::Read(e),
        }
    }
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        let ctx = Context::new();
        Interpreter {
            ctx: ctx.clone(),
            evaluator: Evaluator::new(output, ctx),
        }
    }

    /// Parse and execute one source unit.
    ///
    /// If anything failed to scan or parse, all collected diagnostics are
    /// returned and nothing is executed.
    pub fn eval<R: BufRead>(&mut self, input: R) -> Result<(), TloxError> {
        let diags = Diagnostics::new();
        let mut parser = Parser::new(input, self.ctx.clone(), diags.clone());
        let prg = parser.parse_program()?;
        if diags.had_error() {
            return Err(TloxError::Parse(diags.take()));
        }
        self.evaluator.run(&prg)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpret(input: &str) -> Result<String, TloxError> {
        let mut raw_output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw_output);
        interp.eval(input.as_bytes())?;
        let output = String::from_utf8(raw_output).expect("cannot convert output to string");
        Ok(output)
    }

    fn interpret_collecting_output(input: &str) -> (String, Result<(), TloxError>) {
        let mut raw_output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw_output);
        let res = interp.eval(input.as_bytes());
        let output = String::from_utf8(raw_output).expect("cannot convert output to string");
        (output, res)
    }

    #[test]
    fn arithmetic_and_precedence() -> Result<(), TloxError> {
        assert_eq!(interpret("print (1 + 2) * 3 - 4 / 2;")?, "7\n");
        Ok(())
    }

    #[test]
    fn string_concatenation() -> Result<(), TloxError> {
        assert_eq!(
            interpret("var a = \"Hello \"; var b = \"World\"; print a + b;")?,
            "Hello World\n"
        );
        Ok(())
    }

    #[test]
    fn scoping_and_shadowing() -> Result<(), TloxError> {
        assert_eq!(
            interpret("var x = 1; { var x = 2; print x; } print x;")?,
            "2\n1\n"
        );
        Ok(())
    }

    #[test]
    fn while_loop() -> Result<(), TloxError> {
        assert_eq!(
            interpret("var i = 0; while (i < 3) { print i; i = i + 1; }")?,
            "0\n1\n2\n"
        );
        Ok(())
    }

    #[test]
    fn functions_and_return() -> Result<(), TloxError> {
        assert_eq!(
            interpret("fun add(a, b) { return a + b; } print add(3, 4);")?,
            "7\n"
        );
        Ok(())
    }

    #[test]
    fn for_loop() -> Result<(), TloxError> {
        assert_eq!(
            interpret("for (var i = 0; i < 3; i = i + 1) print i;")?,
            "0\n1\n2\n"
        );
        Ok(())
    }

    #[test]
    fn short_circuit_logical_operators() -> Result<(), TloxError> {
        assert_eq!(
            interpret("print nil or \"hi\"; print \"a\" and \"b\";")?,
            "hi\nb\n"
        );
        Ok(())
    }

    #[test]
    fn adding_string_and_number_is_a_runtime_error() {
        let (output, res) = interpret_collecting_output("print \"a\" + 1;");
        assert_eq!(output, "");
        match res {
            Err(TloxError::Runtime(RuntimeError::AddOperands(1))) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn runtime_errors_carry_the_operator_line() {
        let res = interpret("print 1;\nprint -\"a\";");
        match res {
            Err(TloxError::Runtime(RuntimeError::OperandMustBeNumber(2))) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn parse_errors_prevent_execution() {
        let (output, res) = interpret_collecting_output("print 1; print ;");
        assert_eq!(output, "");
        match res {
            Err(TloxError::Parse(errors)) => assert_eq!(errors.len(), 1),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn several_parse_errors_are_surfaced_together() {
        match interpret("var 1;\nvar 2;\nprint 3;") {
            Err(TloxError::Parse(errors)) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].pos, 1);
                assert_eq!(errors[1].pos, 2);
            }
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn parse_error_display_format() {
        match interpret("print ;") {
            Err(e @ TloxError::Parse(_)) => {
                assert_eq!(e.to_string(), "[line 1] Error at ';': Expect expression.");
            }
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn runtime_error_display_format() {
        match interpret("print \"a\" + 1;") {
            Err(e @ TloxError::Runtime(_)) => {
                assert_eq!(
                    e.to_string(),
                    "[line 1] Operands must be two numbers or two strings."
                );
            }
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn if_else() -> Result<(), TloxError> {
        assert_eq!(
            interpret("var foo; if (2 + 2 == 4) foo = 1; else foo = 2; print foo;")?,
            "1\n"
        );
        assert_eq!(
            interpret("var foo; if (2 + 2 != 4) foo = 1; else foo = 2; print foo;")?,
            "2\n"
        );
        Ok(())
    }

    #[test]
    fn truthiness_of_zero_and_empty_string() -> Result<(), TloxError> {
        assert_eq!(
            interpret("if (0) print \"zero\"; if (\"\") print \"empty\";")?,
            "zero\nempty\n"
        );
        Ok(())
    }

    #[test]
    fn division_by_zero_follows_ieee() -> Result<(), TloxError> {
        assert_eq!(interpret("print 1 / 0;")?, "inf\n");
        Ok(())
    }

    #[test]
    fn null_stmt() -> Result<(), TloxError> {
        assert_eq!(interpret(";")?, "");
        Ok(())
    }

    #[test]
    fn declare_and_call_fn_with_local_var() -> Result<(), TloxError> {
        let prg = r#"
            var v = 24;
            fun f() {
                var v = 42;
                print v;
            }
            f();
            print v;
        "#;
        assert_eq!(interpret(prg)?, "42\n24\n");
        Ok(())
    }

    #[test]
    fn return_unwinds_nested_constructs() -> Result<(), TloxError> {
        let prg = r#"
            fun f() {
                while (true) {
                    if (true) {
                        return 7;
                    }
                }
                print 666; // can't happen
            }
            print f();
        "#;
        assert_eq!(interpret(prg)?, "7\n");
        Ok(())
    }

    #[test]
    fn implicit_return_is_nil() -> Result<(), TloxError> {
        let prg = r#"
            fun f() {}
            print f();
        "#;
        assert_eq!(interpret(prg)?, "nil\n");
        Ok(())
    }

    #[test]
    fn recursion() -> Result<(), TloxError> {
        let prg = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        "#;
        assert_eq!(interpret(prg)?, "55\n");
        Ok(())
    }

    #[test]
    fn closures_capture_their_lexical_scope() -> Result<(), TloxError> {
        let prg = r#"
            fun make_counter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    print i;
                }
                return count;
            }
            var counter = make_counter();
            counter();
            counter();
        "#;
        assert_eq!(interpret(prg)?, "1\n2\n");
        Ok(())
    }

    #[test]
    fn top_level_return_stops_the_program() -> Result<(), TloxError> {
        assert_eq!(interpret("print 1; return; print 2;")?, "1\n");
        Ok(())
    }

    #[test]
    fn session_survives_a_top_level_return() -> Result<(), TloxError> {
        let mut raw_output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw_output);
        interp.eval("return;".as_bytes())?;
        interp.eval("print 1;".as_bytes())?;
        assert_eq!(raw_output, b"1\n");
        Ok(())
    }

    #[test]
    fn session_survives_a_runtime_error() {
        let mut raw_output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw_output);
        assert!(interp.eval("print -\"a\";".as_bytes()).is_err());
        assert!(interp.eval("print 2;".as_bytes()).is_ok());
        assert_eq!(raw_output, b"2\n");
    }

    #[test]
    fn arity_mismatch() {
        match interpret("fun f(a) {} f(1, 2);") {
            Err(TloxError::Runtime(RuntimeError::WrongArity(1, 1, 2))) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn calling_a_non_callable() {
        match interpret("\"not a function\"();") {
            Err(TloxError::Runtime(RuntimeError::NotCallable(1))) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn undefined_variable() {
        match interpret("print missing;") {
            Err(TloxError::Runtime(RuntimeError::UndefinedVariable(1, name))) => {
                assert_eq!(name, "missing");
            }
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn clock_is_predefined() -> Result<(), TloxError> {
        assert_eq!(interpret("print clock() > 0;")?, "true\n");
        Ok(())
    }
}
