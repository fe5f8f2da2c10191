use std::rc::Rc;

use thiserror::Error;

use crate::ast::{
    AssignOp, BinaryOp, ElifClause, ExceptClause, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp,
};
use crate::token::{SourceLoc, Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, loc: SourceLoc) -> Self {
        Self {
            message: message.into(),
            line: loc.line,
            column: loc.column,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser with one token of lookahead.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, "", SourceLoc::default()));
        }
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
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

    // NEWLINE INDENT statement+ DEDENT
    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
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

    // fn name(params): block
    fn parse_fn_def(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
        self.expect(TokenKind::Fn, "")?;
        let name = self.expect(TokenKind::Identifier, "as function name")?.lexeme;
        self.expect(TokenKind::LParen, "")?;
        let params = self.parse_param_list()?;
        self.expect(TokenKind::RParen, "")?;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::FnDef {
                name,
                params,
                body: Rc::new(body),
            },
            loc,
        ))
    }

    fn parse_param_list(&mut self) -> ParseResult<Vec<String>> {
        let mut params = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok(params);
        }
        params.push(
            self.expect(TokenKind::Identifier, "as parameter name")?
                .lexeme,
        );
        while self.matches(TokenKind::Comma) {
            params.push(
                self.expect(TokenKind::Identifier, "as parameter name")?
                    .lexeme,
            );
        }
        Ok(params)
    }

    // if cond: block [elif cond: block]* [else: block]
    fn parse_if_stmt(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
        self.expect(TokenKind::If, "")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;

        let mut elif_clauses = Vec::new();
        self.skip_newlines();
        while self.check(TokenKind::Elif) {
            self.advance();
            let condition = self.parse_expression()?;
            self.expect(TokenKind::Colon, "")?;
            let body = self.parse_block()?;
            elif_clauses.push(ElifClause { condition, body });
            self.skip_newlines();
        }

        let mut else_body = Vec::new();
        if self.check(TokenKind::Else) {
            self.advance();
            self.expect(TokenKind::Colon, "")?;
            else_body = self.parse_block()?;
        }

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                body,
                elif_clauses,
                else_body,
            },
            loc,
        ))
    }

    // for var in iterable: block
    fn parse_for_stmt(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
        self.expect(TokenKind::For, "")?;
        let var = self.expect(TokenKind::Identifier, "as loop variable")?.lexeme;
        self.expect(TokenKind::In, "")?;
        let iterable = self.parse_expression()?;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::For {
                var,
                iterable,
                body,
            },
            loc,
        ))
    }

    // while cond: block
    fn parse_while_stmt(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
        self.expect(TokenKind::While, "")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(StmtKind::While { condition, body }, loc))
    }

    // ret [expr]
    fn parse_return_stmt(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
        self.expect(TokenKind::Ret, "")?;
        let value = if self.check(TokenKind::Newline)
            || self.check(TokenKind::Eof)
            || self.check(TokenKind::Dedent)
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_end_of_stmt()?;
        Ok(Stmt::new(StmtKind::Return(value), loc))
    }

    // imp module [, module]*
    fn parse_import_stmt(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
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
    fn parse_try_stmt(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
        self.expect(TokenKind::Try, "")?;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;

        let mut except = None;
        self.skip_newlines();
        if self.check(TokenKind::Except) {
            self.advance();
            let var = if self.check(TokenKind::Identifier) {
                Some(self.advance().lexeme)
            } else {
                None
            };
            self.expect(TokenKind::Colon, "")?;
            let body = self.parse_block()?;
            except = Some(ExceptClause { var, body });
        }

        let mut finally_body = None;
        self.skip_newlines();
        if self.check(TokenKind::Finally) {
            self.advance();
            self.expect(TokenKind::Colon, "")?;
            finally_body = Some(self.parse_block()?);
        }

        Ok(Stmt::new(
            StmtKind::Try {
                body,
                except,
                finally_body,
            },
            loc,
        ))
    }

    fn parse_pass_stmt(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
        self.expect(TokenKind::Pass, "")?;
        self.expect_end_of_stmt()?;
        Ok(Stmt::new(StmtKind::Pass, loc))
    }

    // class Name: block
    fn parse_class_def(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
        self.expect(TokenKind::Class, "")?;
        let name = self.expect(TokenKind::Identifier, "as class name")?.lexeme;
        self.expect(TokenKind::Colon, "")?;
        let body = self.parse_block()?;
        Ok(Stmt::new(StmtKind::ClassDef { name, body }, loc))
    }

    // Assignment is only recognized at the statement level, never as a
    // subexpression.
    fn parse_assignment_or_expr_stmt(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
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

    fn expect_end_of_stmt(&mut self) -> ParseResult<()> {
        match self.current().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::Dedent => Ok(()),
            _ => {
                let token = self.current();
                Err(ParseError::new(
                    format!(
                        "expected end of statement, got {:?} '{}'",
                        token.kind, token.lexeme
                    ),
                    token.loc,
                ))
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions, lowest to highest precedence:
    //   or < and < not < comparison < add < mul < unary < power < postfix
    // ------------------------------------------------------------------
    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_expr()?;
        while self.check(TokenKind::Or) {
            let loc = self.loc();
            self.advance();
            let right = self.parse_and_expr()?;
            left = binary(BinaryOp::Or, left, right, loc);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not_expr()?;
        while self.check(TokenKind::And) {
            let loc = self.loc();
            self.advance();
            let right = self.parse_not_expr()?;
            left = binary(BinaryOp::And, left, right, loc);
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> ParseResult<Expr> {
        if self.check(TokenKind::Not) {
            let loc = self.loc();
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

    // Comparisons associate left: a < b < c is (a < b) < c.
    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_addition()?;
        while let Some(op) = comparison_op(self.current().kind) {
            let loc = self.loc();
            self.advance();
            let right = self.parse_addition()?;
            left = binary(op, left, right, loc);
        }
        Ok(left)
    }

    fn parse_addition(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplication()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_multiplication()?;
            left = binary(op, left, right, loc);
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right, loc);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Pos),
            _ => None,
        };
        if let Some(op) = op {
            let loc = self.loc();
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

    // base ** exponent, right-associative.
    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_postfix()?;
        if self.check(TokenKind::DoubleStar) {
            let loc = self.loc();
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(binary(BinaryOp::Pow, base, exponent, loc));
        }
        Ok(base)
    }

    // Calls, indexing and member access chain left to right.
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut node = self.parse_atom()?;
        loop {
            match self.current().kind {
                TokenKind::LParen => {
                    let loc = self.loc();
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
                    let loc = self.loc();
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
                    let loc = self.loc();
                    self.advance();
                    let member = self.expect(TokenKind::Identifier, "after '.'")?.lexeme;
                    node = Expr::new(
                        ExprKind::Member {
                            object: Box::new(node),
                            member,
                        },
                        loc,
                    );
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_arg_list(&mut self) -> ParseResult<Vec<Expr>> {
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

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        let loc = self.loc();
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
            TokenKind::String => {
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
                Ok(Expr::new(ExprKind::Identifier(token.lexeme), loc))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "to close parenthesized expression")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => self.parse_dict_literal(),
            _ => {
                let token = self.current();
                Err(ParseError::new(
                    format!("unexpected token {:?} '{}'", token.kind, token.lexeme),
                    token.loc,
                ))
            }
        }
    }

    fn parse_list_literal(&mut self) -> ParseResult<Expr> {
        let loc = self.loc();
        self.expect(TokenKind::LBracket, "")?;
        let mut elements = Vec::new();
        if !self.check(TokenKind::RBracket) {
            elements.push(self.parse_expression()?);
            while self.matches(TokenKind::Comma) {
                if self.check(TokenKind::RBracket) {
                    break; // trailing comma
                }
                elements.push(self.parse_expression()?);
            }
        }
        self.expect(TokenKind::RBracket, "to close list literal")?;
        Ok(Expr::new(ExprKind::List(elements), loc))
    }

    fn parse_dict_literal(&mut self) -> ParseResult<Expr> {
        let loc = self.loc();
        self.expect(TokenKind::LBrace, "")?;
        let mut entries = Vec::new();
        if !self.check(TokenKind::RBrace) {
            let key = self.parse_expression()?;
            self.expect(TokenKind::Colon, "in dict literal")?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            while self.matches(TokenKind::Comma) {
                if self.check(TokenKind::RBrace) {
                    break; // trailing comma
                }
                let key = self.parse_expression()?;
                self.expect(TokenKind::Colon, "in dict literal")?;
                let value = self.parse_expression()?;
                entries.push((key, value));
            }
        }
        self.expect(TokenKind::RBrace, "to close dict literal")?;
        Ok(Expr::new(ExprKind::Dict(entries), loc))
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------
    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| &self.tokens[self.tokens.len() - 1])
    }

    fn loc(&self) -> SourceLoc {
        self.current().loc
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let token = self.current();
        let mut message = format!("expected {kind:?}");
        if !context.is_empty() {
            message.push(' ');
            message.push_str(context);
        }
        message.push_str(&format!(", got {:?}", token.kind));
        if !token.lexeme.is_empty() {
            message.push_str(&format!(" '{}'", token.lexeme));
        }
        Err(ParseError::new(message, token.loc))
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr, loc: SourceLoc) -> Expr {
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        loc,
    )
}

fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Eq => Some(AssignOp::Set),
        TokenKind::PlusEq => Some(AssignOp::Add),
        TokenKind::MinusEq => Some(AssignOp::Sub),
        TokenKind::StarEq => Some(AssignOp::Mul),
        TokenKind::SlashEq => Some(AssignOp::Div),
        _ => None,
    }
}

fn comparison_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::EqEq => Some(BinaryOp::Eq),
        TokenKind::BangEq => Some(BinaryOp::NotEq),
        TokenKind::Less => Some(BinaryOp::Less),
        TokenKind::LessEq => Some(BinaryOp::LessEq),
        TokenKind::Greater => Some(BinaryOp::Greater),
        TokenKind::GreaterEq => Some(BinaryOp::GreaterEq),
        _ => None,
    }
}

pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult<Program> {
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use indoc::indoc;

    fn parse(source: &str) -> Program {
        let tokens = tokenize(source).expect("tokenize should succeed");
        parse_tokens(tokens).expect("parse should succeed")
    }

    fn parse_err(source: &str) -> ParseError {
        let tokens = tokenize(source).expect("tokenize should succeed");
        parse_tokens(tokens).expect_err("expected parse failure")
    }

    fn only_statement(program: &Program) -> &Stmt {
        assert_eq!(program.statements.len(), 1);
        &program.statements[0]
    }

    #[test]
    fn parses_assignment_statement() {
        let program = parse("x = 42\n");
        let stmt = only_statement(&program);
        match &stmt.kind {
            StmtKind::Assign { target, op, value } => {
                assert_eq!(target.kind, ExprKind::Identifier("x".to_string()));
                assert_eq!(*op, AssignOp::Set);
                assert_eq!(value.kind, ExprKind::Number(42.0));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn parses_compound_assignment_operators() {
        let program = parse("x += 1\nx -= 2\nx *= 3\nx /= 4\n");
        let ops: Vec<AssignOp> = program
            .statements
            .iter()
            .map(|stmt| match &stmt.kind {
                StmtKind::Assign { op, .. } => *op,
                other => panic!("expected assignment, got {other:?}"),
            })
            .collect();
        assert_eq!(
            ops,
            vec![AssignOp::Add, AssignOp::Sub, AssignOp::Mul, AssignOp::Div]
        );
    }

    #[test]
    fn parses_function_def_with_params() {
        let program = parse(indoc! {"
            fn add(a, b):
                ret a + b
        "});
        let stmt = only_statement(&program);
        match &stmt.kind {
            StmtKind::FnDef { name, params, body } => {
                assert_eq!(name, "add");
                assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
                assert_eq!(body.len(), 1);
                assert!(matches!(body[0].kind, StmtKind::Return(Some(_))));
            }
            other => panic!("expected fn def, got {other:?}"),
        }
    }

    #[test]
    fn parses_if_elif_else() {
        let program = parse(indoc! {"
            if a:
                1
            elif b:
                2
            elif c:
                3
            else:
                4
        "});
        let stmt = only_statement(&program);
        match &stmt.kind {
            StmtKind::If {
                elif_clauses,
                else_body,
                ..
            } => {
                assert_eq!(elif_clauses.len(), 2);
                assert_eq!(else_body.len(), 1);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn parses_for_and_while_loops() {
        let program = parse(indoc! {"
            for i in range(10):
                i
            while x < 3:
                x += 1
        "});
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].kind {
            StmtKind::For { var, .. } => assert_eq!(var, "i"),
            other => panic!("expected for, got {other:?}"),
        }
        assert!(matches!(program.statements[1].kind, StmtKind::While { .. }));
    }

    #[test]
    fn parses_try_except_finally() {
        let program = parse(indoc! {"
            try:
                risky()
            except e:
                handle()
            finally:
                cleanup()
        "});
        let stmt = only_statement(&program);
        match &stmt.kind {
            StmtKind::Try {
                body,
                except,
                finally_body,
            } => {
                assert_eq!(body.len(), 1);
                let except = except.as_ref().expect("except clause");
                assert_eq!(except.var.as_deref(), Some("e"));
                assert!(finally_body.is_some());
            }
            other => panic!("expected try, got {other:?}"),
        }
    }

    #[test]
    fn parses_except_without_binding() {
        let program = parse(indoc! {"
            try:
                risky()
            except:
                pass
        "});
        let stmt = only_statement(&program);
        match &stmt.kind {
            StmtKind::Try { except, .. } => {
                assert!(except.as_ref().expect("except clause").var.is_none());
            }
            other => panic!("expected try, got {other:?}"),
        }
    }

    #[test]
    fn parses_import_list() {
        let program = parse("imp io, fs, util\n");
        let stmt = only_statement(&program);
        match &stmt.kind {
            StmtKind::Import(modules) => {
                assert_eq!(
                    modules,
                    &vec!["io".to_string(), "fs".to_string(), "util".to_string()]
                );
            }
            other => panic!("expected import, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let program = parse("1 + 2 * 3\n");
        let stmt = only_statement(&program);
        let StmtKind::Expr(expr) = &stmt.kind else {
            panic!("expected expression statement");
        };
        match &expr.kind {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(*op, BinaryOp::Add);
                assert!(matches!(
                    right.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn comparisons_associate_left() {
        // a < b < c parses as (a < b) < c; no chained-comparison folding.
        let program = parse("a < b < c\n");
        let stmt = only_statement(&program);
        let StmtKind::Expr(expr) = &stmt.kind else {
            panic!("expected expression statement");
        };
        match &expr.kind {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(*op, BinaryOp::Less);
                assert!(matches!(
                    left.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Less,
                        ..
                    }
                ));
                assert_eq!(right.kind, ExprKind::Identifier("c".to_string()));
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn power_is_right_associative_and_tighter_than_unary() {
        let program = parse("2 ** 3 ** 2\n-2 ** 2\n");
        let StmtKind::Expr(expr) = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        match &expr.kind {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(*op, BinaryOp::Pow);
                assert!(matches!(
                    right.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Pow,
                        ..
                    }
                ));
            }
            other => panic!("expected binary, got {other:?}"),
        }
        let StmtKind::Expr(expr) = &program.statements[1].kind else {
            panic!("expected expression statement");
        };
        match &expr.kind {
            ExprKind::Unary { op, operand } => {
                assert_eq!(*op, UnaryOp::Neg);
                assert!(matches!(
                    operand.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Pow,
                        ..
                    }
                ));
            }
            other => panic!("expected unary, got {other:?}"),
        }
    }

    #[test]
    fn postfix_operations_chain_left_to_right() {
        let program = parse("obj.field[0](1, 2)\n");
        let stmt = only_statement(&program);
        let StmtKind::Expr(expr) = &stmt.kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Call { callee, args } = &expr.kind else {
            panic!("expected call at top");
        };
        assert_eq!(args.len(), 2);
        let ExprKind::Index { object, .. } = &callee.kind else {
            panic!("expected index under call");
        };
        let ExprKind::Member { object, member } = &object.kind else {
            panic!("expected member under index");
        };
        assert_eq!(member, "field");
        assert_eq!(object.kind, ExprKind::Identifier("obj".to_string()));
    }

    #[test]
    fn parses_collection_literals_with_trailing_commas() {
        let program = parse("[1, 2, 3,]\n{\"a\": 1, \"b\": 2,}\n{}\n[]\n");
        let kinds: Vec<usize> = program
            .statements
            .iter()
            .map(|stmt| match &stmt.kind {
                StmtKind::Expr(expr) => match &expr.kind {
                    ExprKind::List(elements) => elements.len(),
                    ExprKind::Dict(entries) => entries.len(),
                    other => panic!("expected collection literal, got {other:?}"),
                },
                other => panic!("expected expression statement, got {other:?}"),
            })
            .collect();
        assert_eq!(kinds, vec![3, 2, 0, 0]);
    }

    #[test]
    fn parses_class_def_as_plain_block() {
        let program = parse(indoc! {"
            class Counter:
                fn get(self):
                    ret 0
        "});
        let stmt = only_statement(&program);
        match &stmt.kind {
            StmtKind::ClassDef { name, body } => {
                assert_eq!(name, "Counter");
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected class def, got {other:?}"),
        }
    }

    #[test]
    fn parses_none_and_bool_atoms() {
        let program = parse("none\ntrue\nfalse\n");
        let kinds: Vec<&ExprKind> = program
            .statements
            .iter()
            .map(|stmt| match &stmt.kind {
                StmtKind::Expr(expr) => &expr.kind,
                other => panic!("expected expression statement, got {other:?}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                &ExprKind::None,
                &ExprKind::Bool(true),
                &ExprKind::Bool(false)
            ]
        );
    }

    #[test]
    fn reports_missing_block_indent() {
        let err = parse_err("if x:\ny\n");
        assert!(err.message.contains("expected Indent"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn reports_missing_colon() {
        let err = parse_err("fn f()\n    pass\n");
        assert!(err.message.contains("expected Colon"));
    }

    #[test]
    fn rejects_assignment_as_subexpression() {
        let err = parse_err("x = (y = 2)\n");
        assert!(err.message.contains("expected RParen"));
    }

    #[test]
    fn reports_unexpected_token_with_location() {
        let err = parse_err("x = )\n");
        assert!(err.message.contains("unexpected token RParen"));
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 5);
    }

    #[test]
    fn reports_trailing_garbage_after_statement() {
        let err = parse_err("1 2\n");
        assert!(err.message.contains("expected end of statement"));
    }
}
