//! Recursive-descent parser for candidate scoring scripts.

use super::ast::{BinOp, Expr, Function, Program, Stmt, UnaryOp};
use super::lexer::{Token, TokenKind, tokenize};
use super::LangError;

/// Parse source text into a program.
pub fn parse(source: &str) -> Result<Program, LangError> {
    let tokens = tokenize(source)?;
    Parser { tokens, pos: 0 }.program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn program(&mut self) -> Result<Program, LangError> {
        let mut imports = Vec::new();
        let mut functions = Vec::new();

        while !self.at_end() {
            if self.check(&TokenKind::Use) {
                self.advance();
                let name = self.expect_ident("module name")?;
                self.expect(&TokenKind::Semi, "';' after use declaration")?;
                imports.push(name);
            } else if self.check(&TokenKind::Fn) {
                functions.push(self.function()?);
            } else {
                return Err(self.error("expected 'use' or 'fn' at top level"));
            }
        }

        if functions.is_empty() {
            return Err(LangError::Syntax {
                line: 1,
                message: "program defines no function".into(),
            });
        }

        Ok(Program { imports, functions })
    }

    fn function(&mut self) -> Result<Function, LangError> {
        self.expect(&TokenKind::Fn, "'fn'")?;
        let name = self.expect_ident("function name")?;
        self.expect(&TokenKind::LParen, "'(' after function name")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_ident("parameter name")?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' after parameters")?;
        let body = self.block()?;
        Ok(Function { name, params, body })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, LangError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.at_end() {
                return Err(self.error("unterminated block"));
            }
            stmts.push(self.statement()?);
        }
        self.advance(); // consume '}'
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, LangError> {
        if self.check(&TokenKind::Let) {
            self.advance();
            let name = self.expect_ident("binding name")?;
            self.expect(&TokenKind::Assign, "'=' in let binding")?;
            let value = self.expression()?;
            self.expect(&TokenKind::Semi, "';' after let binding")?;
            return Ok(Stmt::Let(name, value));
        }
        if self.check(&TokenKind::Return) {
            self.advance();
            let value = self.expression()?;
            self.expect(&TokenKind::Semi, "';' after return")?;
            return Ok(Stmt::Return(value));
        }
        if self.check(&TokenKind::If) {
            self.advance();
            let cond = self.expression()?;
            let then_body = self.block()?;
            let else_body = if self.check(&TokenKind::Else) {
                self.advance();
                if self.check(&TokenKind::If) {
                    // else-if chains desugar to a nested single-statement block
                    vec![self.statement()?]
                } else {
                    self.block()?
                }
            } else {
                Vec::new()
            };
            return Ok(Stmt::If {
                cond,
                then_body,
                else_body,
            });
        }
        if self.check(&TokenKind::While) {
            self.advance();
            let cond = self.expression()?;
            let body = self.block()?;
            return Ok(Stmt::While { cond, body });
        }

        // Assignment or bare expression.
        if let Some(TokenKind::Ident(name)) = self.peek_kind().cloned() {
            if self.peek_kind_at(1) == Some(&TokenKind::Assign) {
                self.advance();
                self.advance();
                let value = self.expression()?;
                self.expect(&TokenKind::Semi, "';' after assignment")?;
                return Ok(Stmt::Assign(name, value));
            }
        }
        let expr = self.expression()?;
        self.expect(&TokenKind::Semi, "';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    // Precedence (low to high): || , && , comparisons , + - , * / % , unary.
    fn expression(&mut self) -> Result<Expr, LangError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, LangError> {
        let mut left = self.and_expr()?;
        while self.check(&TokenKind::OrOr) {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, LangError> {
        let mut left = self.comparison()?;
        while self.check(&TokenKind::AndAnd) {
            self.advance();
            let right = self.comparison()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, LangError> {
        let left = self.additive()?;
        let op = match self.peek_kind() {
            Some(TokenKind::Lt) => BinOp::Lt,
            Some(TokenKind::Le) => BinOp::Le,
            Some(TokenKind::Gt) => BinOp::Gt,
            Some(TokenKind::Ge) => BinOp::Ge,
            Some(TokenKind::EqEq) => BinOp::Eq,
            Some(TokenKind::NotEq) => BinOp::Ne,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> Result<Expr, LangError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, LangError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::Percent) => BinOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, LangError> {
        if self.check(&TokenKind::Minus) {
            self.advance();
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        if self.check(&TokenKind::Bang) {
            self.advance();
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, LangError> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Num(value)) => {
                self.advance();
                Ok(Expr::Num(value))
            }
            Some(TokenKind::True) => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Some(TokenKind::False) => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Some(TokenKind::Ident(name)) => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if self.check(&TokenKind::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen, "')' after arguments")?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "')' after expression")?;
                Ok(inner)
            }
            _ => Err(self.error("expected expression")),
        }
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn current_line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn error(&self, message: &str) -> LangError {
        LangError::Syntax {
            line: self.current_line(),
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), LangError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, LangError> {
        if let Some(TokenKind::Ident(name)) = self.peek_kind().cloned() {
            self.advance();
            Ok(name)
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }
}
