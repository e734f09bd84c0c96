use std::rc::Rc;

use thiserror::Error;

use crate::ast::{AssignOp, BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::diagnostic::Loc;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message} at {loc}")]
pub struct ParseError {
    pub message: String,
    pub loc: Loc,
}

impl ParseError {
    fn new(message: impl Into<String>, loc: Loc) -> Self {
        Self {
            message: message.into(),
            loc,
        }
    }
}

/// Recursive-descent parser over the lexer's token vector. Single-token
/// lookahead; no recovery, the first unexpected token is fatal.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn current(&self) -> &Token {
        // The token vector always ends with Eof
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with Eof"))
    }

    fn current_loc(&self) -> Loc {
        self.current().loc
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, ctx: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let current = self.current();
        let mut message = format!("expected {:?}", kind);
        if !ctx.is_empty() {
            message.push(' ');
            message.push_str(ctx);
        }
        message.push_str(&format!(", got {:?}", current.kind));
        if !current.lexeme.is_empty() {
            message.push_str(&format!(" '{}'", current.lexeme));
        }
        Err(ParseError::new(message, current.loc))
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    // ------------------------------------------------------------------
    // Blocks: Newline Indent statement+ Dedent
    // ------------------------------------------------------------------

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::Newline, "before indented block")?;
        self.skip_newlines();
        self.expect(TokenKind::Indent, "to start indented block")?;
        self.skip_newlines();

        let mut statements = Vec::new();
        while !self.check(TokenKind::Dedent) && !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.expect(TokenKind::Dedent, "to end indented block")?;
        Ok(statements)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        self.skip_newlines();
        match self.current().kind {
            TokenKind::Fn => self.parse_fn_def(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Ret => self.parse_return_stmt(),
            TokenKind::Imp => self.parse_import_stmt(),
            TokenKind::Try => self.parse_try_stmt(),
            TokenKind::Pass => self.parse_pass_stmt(),
            TokenKind::Class => self.parse_class_def(),
            _ => self.parse_assignment_or_expr_stmt(),
        }
    }

    // fn name(params): block
    fn parse_fn_def(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::Fn, "")?;
        let name = self.expect(TokenKind::Identifier, "as function name")?.lexeme;
        self.expect(TokenKind::LParen, "")?;
        let params = self.parse_param_list()?;
        self.expect(TokenKind::RParen, "")?;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::FnDef {
                name: Rc::from(name),
                params,
                body: Rc::new(body),
            },
            loc,
        ))
    }

    fn parse_param_list(&mut self) -> Result<Vec<Rc<str>>, ParseError> {
        let mut params = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok(params);
        }
        params.push(Rc::from(
            self.expect(TokenKind::Identifier, "as parameter name")?.lexeme,
        ));
        while self.matches(TokenKind::Comma) {
            params.push(Rc::from(
                self.expect(TokenKind::Identifier, "as parameter name")?.lexeme,
            ));
        }
        Ok(params)
    }

    // if cond: block [elif cond: block]* [else: block]
    fn parse_if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::If, "")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;

        let mut elifs = Vec::new();
        self.skip_newlines();
        while self.check(TokenKind::Elif) {
            self.advance();
            let elif_cond = self.parse_expression()?;
            self.expect(TokenKind::Colon, "")?;
            let elif_body = self.parse_block()?;
            elifs.push((elif_cond, elif_body));
            self.skip_newlines();
        }

        let else_body = if self.check(TokenKind::Else) {
            self.advance();
            self.expect(TokenKind::Colon, "")?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                body,
                elifs,
                else_body,
            },
            loc,
        ))
    }

    // for var in iterable: block
    fn parse_for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::For, "")?;
        let var = self.expect(TokenKind::Identifier, "as loop variable")?.lexeme;
        self.expect(TokenKind::In, "")?;
        let iterable = self.parse_expression()?;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::For {
                var: Rc::from(var),
                iterable,
                body,
            },
            loc,
        ))
    }

    // while cond: block
    fn parse_while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::While, "")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(StmtKind::While { condition, body }, loc))
    }

    // ret [expr]
    fn parse_return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::Ret, "")?;
        let value = if !self.check(TokenKind::Newline)
            && !self.check(TokenKind::Eof)
            && !self.check(TokenKind::Dedent)
        {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_end_of_stmt()?;
        Ok(Stmt::new(StmtKind::Return(value), loc))
    }

    // imp module [, module]*
    fn parse_import_stmt(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::Imp, "")?;
        let mut modules = Vec::new();
        modules.push(self.expect(TokenKind::Identifier, "as module name")?.lexeme);
        while self.matches(TokenKind::Comma) {
            modules.push(self.expect(TokenKind::Identifier, "as module name")?.lexeme);
        }
        self.expect_end_of_stmt()?;
        Ok(Stmt::new(StmtKind::Import(modules), loc))
    }

    // try: block except [var]: block [finally: block]
    fn parse_try_stmt(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::Try, "")?;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;

        let mut except_var = None;
        let mut except_body = None;
        self.skip_newlines();
        if self.check(TokenKind::Except) {
            self.advance();
            if self.check(TokenKind::Identifier) {
                except_var = Some(Rc::from(self.advance().lexeme));
            }
            self.expect(TokenKind::Colon, "")?;
            except_body = Some(self.parse_block()?);
        }

        self.skip_newlines();
        let finally_body = if self.check(TokenKind::Finally) {
            self.advance();
            self.expect(TokenKind::Colon, "")?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::Try {
                body,
                except_var,
                except_body,
                finally_body,
            },
            loc,
        ))
    }

    // pass
    fn parse_pass_stmt(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::Pass, "")?;
        self.expect_end_of_stmt()?;
        Ok(Stmt::new(StmtKind::Pass, loc))
    }

    // class Name: block
    fn parse_class_def(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::Class, "")?;
        let name = self.expect(TokenKind::Identifier, "as class name")?.lexeme;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::ClassDef {
                name: Rc::from(name),
                body,
            },
            loc,
        ))
    }

    fn parse_assignment_or_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_loc();
        let expr = self.parse_expression()?;

        if let Some(op) = assign_op(self.current().kind) {
            self.advance();
            let value = self.parse_expression()?;
            self.expect_end_of_stmt()?;
            return Ok(Stmt::new(
                StmtKind::Assign {
                    target: expr,
                    op,
                    value,
                },
                loc,
            ));
        }

        self.expect_end_of_stmt()?;
        Ok(Stmt::new(StmtKind::Expr(expr), loc))
    }

    /// Every non-compound statement ends at the first Newline, Dedent, or
    /// Eof. Only a Newline is consumed; Dedent stays for the block parser.
    fn expect_end_of_stmt(&mut self) -> Result<(), ParseError> {
        match self.current().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Dedent | TokenKind::Eof => Ok(()),
            kind => {
                let current = self.current();
                Err(ParseError::new(
                    format!(
                        "expected end of statement, got {:?} '{}'",
                        kind, current.lexeme
                    ),
                    current.loc,
                ))
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions (precedence climbing)
    //   or < and < not < comparison < add < mul < unary < power < postfix < atom
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;
        while self.check(TokenKind::Or) {
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_and_expr()?;
            left = binary(left, BinaryOp::Or, right, loc);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not_expr()?;
        while self.check(TokenKind::And) {
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_not_expr()?;
            left = binary(left, BinaryOp::And, right, loc);
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.check(TokenKind::Not) {
            let loc = self.current_loc();
            self.advance();
            let operand = self.parse_not_expr()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                loc,
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_addition()?;
        while let Some(op) = comparison_op(self.current().kind) {
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_addition()?;
            left = binary(left, op, right, loc);
        }
        Ok(left)
    }

    fn parse_addition(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplication()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_multiplication()?;
            left = binary(left, op, right, loc);
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let loc = self.current_loc();
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right, loc);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Pos),
            _ => None,
        };
        if let Some(op) = op {
            let loc = self.current_loc();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                loc,
            ));
        }
        self.parse_power()
    }

    // base ** exponent, right-associative
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if self.check(TokenKind::DoubleStar) {
            let loc = self.current_loc();
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(binary(base, BinaryOp::Pow, exponent, loc));
        }
        Ok(base)
    }

    // postfix: call, index, member access
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_atom()?;
        loop {
            match self.current().kind {
                TokenKind::LParen => {
                    let loc = self.current_loc();
                    self.advance();
                    let args = self.parse_arg_list()?;
                    self.expect(TokenKind::RParen, "to close function call")?;
                    node = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(node),
                            args,
                        },
                        loc,
                    );
                }
                TokenKind::LBracket => {
                    let loc = self.current_loc();
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "to close index expression")?;
                    node = Expr::new(
                        ExprKind::Index {
                            object: Box::new(node),
                            index: Box::new(index),
                        },
                        loc,
                    );
                }
                TokenKind::Dot => {
                    let loc = self.current_loc();
                    self.advance();
                    let member = self.expect(TokenKind::Identifier, "after '.'")?.lexeme;
                    node = Expr::new(
                        ExprKind::Member {
                            object: Box::new(node),
                            name: Rc::from(member),
                        },
                        loc,
                    );
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok(args);
        }
        args.push(self.parse_expression()?);
        while self.matches(TokenKind::Comma) {
            args.push(self.parse_expression()?);
        }
        Ok(args)
    }

    // ------------------------------------------------------------------
    // Atoms
    // ------------------------------------------------------------------

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_loc();
        match self.current().kind {
            TokenKind::Int | TokenKind::Float => {
                let token = self.advance();
                let value: f64 = token.lexeme.parse().map_err(|_| {
                    ParseError::new(
                        format!("invalid numeric literal '{}'", token.lexeme),
                        token.loc,
                    )
                })?;
                Ok(Expr::new(ExprKind::Number(value), loc))
            }
            TokenKind::Str => {
                let token = self.advance();
                Ok(Expr::new(ExprKind::Str(token.lexeme), loc))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(true), loc))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(false), loc))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::new(ExprKind::None, loc))
            }
            TokenKind::Identifier => {
                let token = self.advance();
                Ok(Expr::new(ExprKind::Identifier(Rc::from(token.lexeme)), loc))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "to close parenthesised expression")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => self.parse_dict_literal(),
            kind => {
                let current = self.current();
                let mut message = format!("unexpected token {:?}", kind);
                if !current.lexeme.is_empty() {
                    message.push_str(&format!(" '{}'", current.lexeme));
                }
                Err(ParseError::new(message, current.loc))
            }
        }
    }

    // [a, b, c] with optional trailing comma
    fn parse_list_literal(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::LBracket, "")?;
        let mut elements = Vec::new();
        if !self.check(TokenKind::RBracket) {
            elements.push(self.parse_expression()?);
            while self.matches(TokenKind::Comma) {
                if self.check(TokenKind::RBracket) {
                    break;
                }
                elements.push(self.parse_expression()?);
            }
        }
        self.expect(TokenKind::RBracket, "to close list literal")?;
        Ok(Expr::new(ExprKind::List(elements), loc))
    }

    // {k: v, ...} with optional trailing comma
    fn parse_dict_literal(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_loc();
        self.expect(TokenKind::LBrace, "")?;
        let mut entries = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                let key = self.parse_expression()?;
                self.expect(TokenKind::Colon, "in dict literal")?;
                let value = self.parse_expression()?;
                entries.push((key, value));
                if !self.matches(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::RBrace) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "to close dict literal")?;
        Ok(Expr::new(ExprKind::Dict(entries), loc))
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr, loc: Loc) -> Expr {
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        loc,
    )
}

fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    Some(match kind {
        TokenKind::Eq => AssignOp::Assign,
        TokenKind::PlusEq => AssignOp::AddAssign,
        TokenKind::MinusEq => AssignOp::SubAssign,
        TokenKind::StarEq => AssignOp::MulAssign,
        TokenKind::SlashEq => AssignOp::DivAssign,
        _ => return None,
    })
}

fn comparison_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::BangEq => BinaryOp::NotEq,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEq => BinaryOp::LessEq,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEq => BinaryOp::GreaterEq,
        _ => return None,
    })
}
