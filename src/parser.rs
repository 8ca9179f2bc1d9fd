//! Recursive-descent parser.
//!
//! One token of lookahead, pulled on demand from the scanner.  Syntax errors
//! do not abort the parse: they are reported to the shared diagnostics sink
//! and the parser synchronizes to the next statement boundary, so one run
//! can surface several errors.

use std::error::Error;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::rc::Rc;

use crate::ast::{BinOp, BinOpKind, Expr, FunDef, LogicOp, Stmt};
use crate::ctx::Context;
use crate::diag::{Diagnostics, FullParseError, ParseError, Position};
use crate::interner::Symbol;
use crate::scanner::Scanner;
use crate::token::Token;

/// Arguments and parameters beyond this count are reported.
const MAX_ARGS: usize = 255;

#[derive(Debug)]
pub enum ParserError {
    /// A syntax error unwinding towards the recovery point in
    /// [`Parser::parse_program`].  Never escapes the parser.
    Parse(FullParseError),

    /// The input could not be read.  Fatal.
    Read(io::Error),
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::Parse(e) => write!(f, "{}", e),
            ParserError::Read(e) => write!(f, "read error: {}", e),
        }
    }
}

impl Error for ParserError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParserError::Parse(_) => None,
            ParserError::Read(e) => Some(e),
        }
    }
}

impl From<io::Error> for ParserError {
    fn from(e: io::Error) -> ParserError {
        ParserError::Read(e)
    }
}

#[derive(Debug)]
pub struct Parser<R: BufRead> {
    scanner: Scanner<R>,
    current_token: Token,
    current_pos: Position,
    diags: Rc<Diagnostics>,
}

impl<R: BufRead> Parser<R> {
    pub fn new(input: R, ctx: Rc<Context>, diags: Rc<Diagnostics>) -> Parser<R> {
        Parser {
            scanner: Scanner::new(input, ctx, diags.clone()),
            current_token: Token::Eof, // we haven't scanned anything yet
            current_pos: 1,
            diags,
        }
    }

    /// Parse a whole program.
    ///
    /// Returns the statements that parsed cleanly; whether any were broken
    /// is visible through the shared diagnostics sink.  Only an I/O failure
    /// aborts.
    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, ParserError> {
        let mut prg = vec![];
        self.advance()?;
        loop {
            match self.current_token {
                Token::Eof => break,
                _ => match self.declaration() {
                    Ok(stmt) => prg.push(stmt),
                    Err(ParserError::Parse(e)) => {
                        self.diags.report(e.pos, e.error);
                        self.synchronize()?;
                    }
                    Err(e) => return Err(e),
                },
            }
        }
        Ok(prg)
    }

    #[cfg(test)]
    fn parse_expression(&mut self) -> Result<Expr, ParserError> {
        self.advance()?;
        self.expression()
    }

    /// Discard tokens up to the next statement boundary: the offending
    /// token always goes, then everything up to and including a `;`, or up
    /// to a token that can begin a statement.
    fn synchronize(&mut self) -> Result<(), ParserError> {
        loop {
            if self.current_token == Token::Eof {
                break;
            }
            let was_semicolon = self.current_token == Token::Semicolon;
            self.advance()?;
            if was_semicolon {
                break;
            }
            match self.current_token {
                Token::Class
                | Token::Fun
                | Token::Var
                | Token::For
                | Token::If
                | Token::While
                | Token::Print
                | Token::Return => break,
                _ => (),
            }
        }
        Ok(())
    }

    fn declaration(&mut self) -> Result<Stmt, ParserError> {
        match self.current_token {
            Token::Var => self.var_decl(),
            Token::Fun => self.fun_decl(),
            _ => self.statement(),
        }
    }

    /// Parse a variable declaration.  Current token is `var`.
    fn var_decl(&mut self) -> Result<Stmt, ParserError> {
        self.advance()?;
        let name = self.identifier("variable name")?;
        let init = match self.current_token {
            Token::Equal => {
                self.advance()?;
                self.expression()?
            }
            _ => Expr::Nil,
        };
        self.consume(Token::Semicolon, "';' after variable declaration")?;
        Ok(Stmt::VarDecl(name, Box::new(init)))
    }

    fn fun_decl(&mut self) -> Result<Stmt, ParserError> {
        self.advance()?;
        let name = self.identifier("function name")?;
        self.consume(Token::LeftParen, "'(' after function name")?;
        let mut params = vec![];
        if Token::RightParen != self.current_token {
            loop {
                if params.len() == MAX_ARGS {
                    self.diags
                        .report(self.current_pos, ParseError::TooManyParameters);
                }
                params.push(self.identifier("parameter name")?);
                if Token::Comma != self.current_token {
                    break;
                }
                self.advance()?;
            }
        }
        self.consume(Token::RightParen, "')' after parameters")?;
        let body = self.block_stmts()?;
        Ok(Stmt::FunDecl(Rc::new(FunDef { name, params, body })))
    }

    fn identifier(&mut self, expected: &'static str) -> Result<Symbol, ParserError> {
        if let Token::Identifier(id) = self.current_token.clone() {
            self.advance()?;
            Ok(id)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn statement(&mut self) -> Result<Stmt, ParserError> {
        match self.current_token {
            Token::Print => {
                self.advance()?;
                let expr = Box::new(self.expression()?);
                self.consume(Token::Semicolon, "';' after value")?;
                Ok(Stmt::Print(expr))
            }
            Token::LeftCurly => self.block(),
            Token::If => {
                self.advance()?;
                self.consume(Token::LeftParen, "'(' after 'if'")?;
                let cond = Box::new(self.expression()?);
                self.consume(Token::RightParen, "')' after if condition")?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if let Token::Else = self.current_token {
                    self.advance()?;
                    Box::new(self.statement()?)
                } else {
                    Box::new(Stmt::Nop)
                };
                Ok(Stmt::If(cond, then_branch, else_branch))
            }
            Token::While => {
                self.advance()?;
                self.consume(Token::LeftParen, "'(' after 'while'")?;
                let cond = Box::new(self.expression()?);
                self.consume(Token::RightParen, "')' after while condition")?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While(cond, body))
            }
            Token::For => self.for_stmt(),
            Token::Semicolon => {
                self.advance()?;
                Ok(Stmt::Nop)
            }
            Token::Return => {
                self.advance()?;
                let ret_expr = if self.current_token == Token::Semicolon {
                    Expr::Nil
                } else {
                    self.expression()?
                };
                self.consume(Token::Semicolon, "';' after return value")?;
                Ok(Stmt::Return(Box::new(ret_expr)))
            }
            _ => {
                let expr = Box::new(self.expression()?);
                self.consume(Token::Semicolon, "';' after expression")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// `for` is surface syntax only: it parses into the equivalent
    /// `while` form, wrapped in blocks for the initializer and increment.
    fn for_stmt(&mut self) -> Result<Stmt, ParserError> {
        self.advance()?;
        self.consume(Token::LeftParen, "'(' after 'for'")?;

        let init = match self.current_token {
            Token::Semicolon => {
                self.advance()?;
                None
            }
            Token::Var => Some(self.var_decl()?),
            _ => {
                let expr = Box::new(self.expression()?);
                self.consume(Token::Semicolon, "';' after loop initializer")?;
                Some(Stmt::Expr(expr))
            }
        };

        let cond = match self.current_token {
            Token::Semicolon => Expr::Bool(true),
            _ => self.expression()?,
        };
        self.consume(Token::Semicolon, "';' after loop condition")?;

        let inc = match self.current_token {
            Token::RightParen => None,
            _ => Some(self.expression()?),
        };
        self.consume(Token::RightParen, "')' after for clauses")?;

        let mut body = self.statement()?;
        if let Some(inc) = inc {
            body = Stmt::Block(vec![body, Stmt::Expr(Box::new(inc))]);
        }
        let mut stmt = Stmt::While(Box::new(cond), Box::new(body));
        if let Some(init) = init {
            stmt = Stmt::Block(vec![init, stmt]);
        }
        Ok(stmt)
    }

    fn block(&mut self) -> Result<Stmt, ParserError> {
        Ok(Stmt::Block(self.block_stmts()?))
    }

    fn block_stmts(&mut self) -> Result<Vec<Stmt>, ParserError> {
        self.consume(Token::LeftCurly, "'{' before block")?;
        let mut stmts = vec![];
        loop {
            match self.current_token {
                Token::RightCurly => {
                    self.advance()?;
                    break;
                }
                Token::Eof => return Err(self.unexpected("'}' after block")),
                _ => stmts.push(self.declaration()?),
            }
        }
        Ok(stmts)
    }

    fn expression(&mut self) -> Result<Expr, ParserError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ParserError> {
        let lhs = self.logic_or()?;
        if Token::Equal == self.current_token {
            let pos = self.current_pos;
            self.advance()?;
            let rhs = self.assignment()?;
            if let Expr::Var(sym, _) = lhs {
                Ok(Expr::Assign(sym, Box::new(rhs), pos))
            } else {
                // Reported without unwinding: the expression to the left is
                // still well formed and parsing can continue from here.
                self.diags.report(pos, ParseError::InvalidAssignmentTarget);
                Ok(lhs)
            }
        } else {
            Ok(lhs)
        }
    }

    fn logic_or(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.logic_and()?;
        while Token::Or == self.current_token {
            self.advance()?;
            expr = Expr::Logical(Box::new(expr), LogicOp::Or, Box::new(self.logic_and()?));
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.equality()?;
        while Token::And == self.current_token {
            self.advance()?;
            expr = Expr::Logical(Box::new(expr), LogicOp::And, Box::new(self.equality()?));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.comparison()?;
        loop {
            let kind = match self.current_token {
                Token::EqualEqual => BinOpKind::Equal,
                Token::BangEqual => BinOpKind::NotEqual,
                _ => break,
            };
            let op = BinOp {
                kind,
                pos: self.current_pos,
            };
            self.advance()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.comparison()?));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.term()?;
        loop {
            let kind = match self.current_token {
                Token::Less => BinOpKind::Less,
                Token::LessEqual => BinOpKind::LessEqual,
                Token::Greater => BinOpKind::Greater,
                Token::GreaterEqual => BinOpKind::GreaterEqual,
                _ => break,
            };
            let op = BinOp {
                kind,
                pos: self.current_pos,
            };
            self.advance()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.term()?));
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.factor()?;
        loop {
            let kind = match self.current_token {
                Token::Plus => BinOpKind::Add,
                Token::Minus => BinOpKind::Sub,
                _ => break,
            };
            let op = BinOp {
                kind,
                pos: self.current_pos,
            };
            self.advance()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.factor()?));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.unary()?;
        loop {
            let kind = match self.current_token {
                Token::Star => BinOpKind::Mul,
                Token::Slash => BinOpKind::Div,
                _ => break,
            };
            let op = BinOp {
                kind,
                pos: self.current_pos,
            };
            self.advance()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.unary()?));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParserError> {
        match self.current_token {
            Token::Minus => {
                let pos = self.current_pos;
                self.advance()?;
                Ok(Expr::Neg(Box::new(self.unary()?), pos))
            }
            Token::Bang => {
                self.advance()?;
                Ok(Expr::Not(Box::new(self.unary()?)))
            }
            _ => self.call(),
        }
    }

    fn call(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.primary()?;
        while Token::LeftParen == self.current_token {
            self.advance()?;
            let mut args = vec![];
            if Token::RightParen != self.current_token {
                loop {
                    if args.len() == MAX_ARGS {
                        self.diags
                            .report(self.current_pos, ParseError::TooManyArguments);
                    }
                    args.push(self.expression()?);
                    if Token::Comma != self.current_token {
                        break;
                    }
                    self.advance()?;
                }
            }
            // Call errors are attributed to the closing parenthesis.
            let pos = self.current_pos;
            self.consume(Token::RightParen, "')' after arguments")?;
            expr = Expr::Call(Box::new(expr), args, pos);
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParserError> {
        match self.current_token.clone() {
            Token::Identifier(sym) => {
                let expr = Expr::Var(sym, self.current_pos);
                self.advance()?;
                Ok(expr)
            }
            Token::Nil => {
                self.advance()?;
                Ok(Expr::Nil)
            }
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::Str(s) => {
                self.advance()?;
                Ok(Expr::Str(s))
            }
            Token::True => {
                self.advance()?;
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.advance()?;
                Ok(Expr::Bool(false))
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.expression()?;
                self.consume(Token::RightParen, "')' after expression")?;
                Ok(Expr::Group(Box::new(expr)))
            }
            found => Err(ParserError::Parse(FullParseError {
                pos: self.current_pos,
                error: ParseError::ExpectedExpression(found),
            })),
        }
    }

    fn advance(&mut self) -> Result<&Token, ParserError> {
        let (pos, token) = self.scanner.get_token()?;
        self.current_token = token;
        self.current_pos = pos;
        Ok(&self.current_token)
    }

    fn consume(&mut self, expected: Token, what: &'static str) -> Result<(), ParserError> {
        if self.current_token == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParserError {
        ParserError::Parse(FullParseError {
            pos: self.current_pos,
            error: ParseError::UnexpectedToken {
                found: self.current_token.clone(),
                expected,
            },
        })
    }
}
