//! Statement grammar.

use super::{ParseResult, Parser};
use crate::ast::*;
use crate::token::TokenKind;

impl Parser {
    /// `{ stmt* }`
    pub(crate) fn parse_code_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(TokenKind::Lbrace, "'{' opening block")?;
        let mut body = Vec::new();
        while !self.at(TokenKind::Rbrace) && !self.at(TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Rbrace, "'}' closing block")?;
        Ok(body)
    }

    /// A block whose first statement may be a doc string.
    pub(crate) fn parse_code_block_with_doc(
        &mut self,
    ) -> ParseResult<(Option<StringLit>, Vec<Stmt>)> {
        self.expect(TokenKind::Lbrace, "'{' opening block")?;
        let mut doc = None;
        if self.at(TokenKind::Str) && self.peek_kind(1) == TokenKind::Semi {
            doc = Some(self.parse_string_lit()?);
            self.eat(TokenKind::Semi);
        }
        let mut body = Vec::new();
        while !self.at(TokenKind::Rbrace) && !self.at(TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Rbrace, "'}' closing block")?;
        Ok((doc, body))
    }

    pub(crate) fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.cur_kind() {
            TokenKind::KwIf => Ok(Stmt::If(self.parse_if()?)),
            TokenKind::KwWhile => self.parse_while(),
            TokenKind::KwFor => self.parse_for(),
            TokenKind::KwTry => self.parse_try(),
            TokenKind::KwWith => self.parse_with(),
            TokenKind::KwRaise => self.parse_raise(),
            TokenKind::KwAssert => self.parse_assert(),
            TokenKind::KwDelete => self.parse_delete(),
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::KwYield => self.parse_yield(),
            TokenKind::KwBreak | TokenKind::KwContinue | TokenKind::KwSkip => self.parse_ctrl(),
            TokenKind::KwMatch => self.parse_match(),
            TokenKind::GlobalOp | TokenKind::NonlocalOp => self.parse_global_ref(),
            TokenKind::Semi => {
                // Stray semicolon: empty statement.
                let span = self.span_start();
                self.advance();
                Ok(Stmt::Expr(ExprStmt {
                    span,
                    expr: Expr::Null(NullLit { span }),
                }))
            }
            TokenKind::Error => {
                let tok = self.advance();
                Err(self.error_at(tok.span, format!("unknown character '{}'", tok.text)))
            }
            _ => self.parse_expr_or_assignment(),
        }
    }

    fn parse_if(&mut self) -> ParseResult<IfStmt> {
        let start = self.span_start();
        self.advance(); // if / elif
        let cond = self.parse_expression()?;
        let body = self.parse_code_block()?;
        let else_body = match self.cur_kind() {
            TokenKind::KwElif => Some(ElseBranch::Elif(Box::new(self.parse_if()?))),
            TokenKind::KwElse => {
                self.advance();
                Some(ElseBranch::Else(self.parse_code_block()?))
            }
            _ => None,
        };
        Ok(IfStmt {
            span: self.span_from(start),
            cond,
            body,
            else_body,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        self.advance();
        let cond = self.parse_expression()?;
        let body = self.parse_code_block()?;
        Ok(Stmt::While(WhileStmt {
            span: self.span_from(start),
            cond,
            body,
        }))
    }

    /// `for x in xs { }` or `for i = 0 to i < n by i += 1 { }`
    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        self.advance(); // for
        let is_async = self.eat(TokenKind::KwAsync);

        let target = self.parse_target_list()?;
        if self.eat(TokenKind::KwIn) {
            let iter = self.parse_expression()?;
            let body = self.parse_code_block()?;
            return Ok(Stmt::ForIn(ForInStmt {
                span: self.span_from(start),
                target,
                iter,
                body,
                is_async,
            }));
        }

        // Counted form: target = start to cond by step
        let init_start = target.span();
        let init_id = self.next_id();
        self.expect(TokenKind::Eq, "'in' or '=' in for statement")?;
        let init_value = self.parse_expression()?;
        let init = Stmt::Assignment(Assignment {
            span: self.span_from(init_start),
            id: init_id,
            targets: vec![target],
            ty: None,
            value: Some(init_value),
            aug_op: None,
        });
        self.expect(TokenKind::KwTo, "'to' in counted for")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::KwBy, "'by' in counted for")?;
        let step = self.parse_small_assignment()?;
        let body = self.parse_code_block()?;
        Ok(Stmt::ForTo(ForToStmt {
            span: self.span_from(start),
            init: Box::new(init),
            cond,
            step: Box::new(step),
            body,
        }))
    }

    /// One assignment without a trailing semicolon, as used by `by`.
    fn parse_small_assignment(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        let target = self.parse_expression()?;
        let kind = self.cur_kind();
        if kind == TokenKind::Eq {
            let id = self.next_id();
            self.advance();
            let value = self.parse_expression()?;
            return Ok(Stmt::Assignment(Assignment {
                span: self.span_from(start),
                id,
                targets: vec![target],
                ty: None,
                value: Some(value),
                aug_op: None,
            }));
        }
        if kind.is_aug_assign() {
            let id = self.next_id();
            self.advance();
            let value = self.parse_expression()?;
            return Ok(Stmt::Assignment(Assignment {
                span: self.span_from(start),
                id,
                targets: vec![target],
                ty: None,
                value: Some(value),
                aug_op: Some(kind),
            }));
        }
        Ok(Stmt::Expr(ExprStmt {
            span: self.span_from(start),
            expr: target,
        }))
    }

    /// Comma-joined assignment/loop targets collapse into a Tuple.
    fn parse_target_list(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        let first = self.parse_trailer_chain_expr()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            if matches!(self.cur_kind(), TokenKind::KwIn | TokenKind::Eq) {
                break;
            }
            items.push(self.parse_trailer_chain_expr()?);
        }
        Ok(Expr::Tuple(TupleVal {
            span: self.span_from(start),
            items,
        }))
    }

    fn parse_try(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        self.advance(); // try
        let body = self.parse_code_block()?;
        let mut excepts = Vec::new();
        while self.at(TokenKind::KwExcept) {
            let clause_start = self.span_start();
            self.advance();
            let ty = if !self.at(TokenKind::Lbrace) && !self.at(TokenKind::KwAs) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let alias = if self.eat(TokenKind::KwAs) {
                Some(self.parse_ident("exception alias")?)
            } else {
                None
            };
            let clause_body = self.parse_code_block()?;
            excepts.push(ExceptClause {
                span: self.span_from(clause_start),
                ty,
                alias,
                body: clause_body,
            });
        }
        let finally = if self.eat(TokenKind::KwFinally) {
            Some(self.parse_code_block()?)
        } else {
            None
        };
        if excepts.is_empty() && finally.is_none() {
            return Err(self.error_here(
                "try statement needs at least one except or finally clause".to_string(),
            ));
        }
        Ok(Stmt::Try(TryStmt {
            span: self.span_from(start),
            body,
            excepts,
            finally,
        }))
    }

    fn parse_with(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        self.advance(); // with
        let mut items = Vec::new();
        loop {
            let item_start = self.span_start();
            let expr = self.parse_expression()?;
            let alias = if self.eat(TokenKind::KwAs) {
                Some(self.parse_ident("context alias")?)
            } else {
                None
            };
            items.push(WithItem {
                span: self.span_from(item_start),
                expr,
                alias,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let body = self.parse_code_block()?;
        Ok(Stmt::With(WithStmt {
            span: self.span_from(start),
            items,
            body,
        }))
    }

    fn parse_raise(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        self.advance();
        let exc = if !self.at(TokenKind::Semi) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let from = if self.eat(TokenKind::KwFrom) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi, "';' after raise")?;
        Ok(Stmt::Raise(RaiseStmt {
            span: self.span_from(start),
            exc,
            from,
        }))
    }

    fn parse_assert(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        self.advance();
        let cond = self.parse_expression()?;
        let msg = if self.eat(TokenKind::Comma) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi, "';' after assert")?;
        Ok(Stmt::Assert(AssertStmt {
            span: self.span_from(start),
            cond,
            msg,
        }))
    }

    fn parse_delete(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        self.advance();
        let target = self.parse_expression()?;
        self.expect(TokenKind::Semi, "';' after del")?;
        Ok(Stmt::Delete(DeleteStmt {
            span: self.span_from(start),
            target,
        }))
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        self.advance();
        let value = if !self.at(TokenKind::Semi) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi, "';' after return")?;
        Ok(Stmt::Return(ReturnStmt {
            span: self.span_from(start),
            value,
        }))
    }

    fn parse_yield(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        self.advance(); // yield
        let is_from = self.eat(TokenKind::KwFrom);
        let value = if !self.at(TokenKind::Semi) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi, "';' after yield")?;
        Ok(Stmt::Yield(YieldStmt {
            span: self.span_from(start),
            value,
            is_from,
        }))
    }

    fn parse_ctrl(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        let kind = match self.cur_kind() {
            TokenKind::KwBreak => CtrlKind::Break,
            TokenKind::KwContinue => CtrlKind::Continue,
            _ => CtrlKind::Skip,
        };
        self.advance();
        self.expect(TokenKind::Semi, "';' after control statement")?;
        Ok(Stmt::Ctrl(CtrlStmt {
            span: self.span_from(start),
            kind,
        }))
    }

    fn parse_match(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        self.advance(); // match
        let subject = self.parse_expression()?;
        self.expect(TokenKind::Lbrace, "'{' opening match body")?;
        let mut cases = Vec::new();
        while self.at(TokenKind::KwCase) {
            let case_start = self.span_start();
            self.advance();
            let pattern = self.parse_pattern()?;
            let guard = if self.eat(TokenKind::KwIf) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let body = self.parse_code_block()?;
            cases.push(MatchCase {
                span: self.span_from(case_start),
                pattern,
                guard,
                body,
            });
        }
        self.expect(TokenKind::Rbrace, "'}' closing match body")?;
        Ok(Stmt::Match(MatchStmt {
            span: self.span_from(start),
            subject,
            cases,
        }))
    }

    fn parse_pattern(&mut self) -> ParseResult<Pattern> {
        let first = self.parse_single_pattern()?;
        if !self.at(TokenKind::BwOr) {
            return Ok(first);
        }
        let start = first.span();
        let mut options = vec![first];
        while self.eat(TokenKind::BwOr) {
            options.push(self.parse_single_pattern()?);
        }
        Ok(Pattern::Or(self.span_from(start), options))
    }

    fn parse_single_pattern(&mut self) -> ParseResult<Pattern> {
        match self.cur_kind() {
            TokenKind::Name if self.cur().text == "_" => {
                let tok = self.advance();
                Ok(Pattern::Wildcard(tok.span))
            }
            TokenKind::Name
                if !matches!(self.peek_kind(1), TokenKind::Dot | TokenKind::Lparen) =>
            {
                let ident = self.parse_ident("pattern name")?;
                Ok(Pattern::Capture(ident))
            }
            TokenKind::Lsquare => {
                let start = self.span_start();
                self.advance();
                let mut items = Vec::new();
                while !self.at(TokenKind::Rsquare) {
                    items.push(self.parse_pattern()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::Rsquare, "']' closing sequence pattern")?;
                Ok(Pattern::Sequence(self.span_from(start), items))
            }
            _ => {
                let expr = self.parse_expression()?;
                Ok(Pattern::Literal(expr))
            }
        }
    }

    fn parse_global_ref(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        let kind = if self.at(TokenKind::GlobalOp) {
            GlobalRefKind::Global
        } else {
            GlobalRefKind::Nonlocal
        };
        self.advance();
        let mut names = vec![self.parse_ident("name")?];
        while self.eat(TokenKind::Comma) {
            names.push(self.parse_ident("name")?);
        }
        self.expect(TokenKind::Semi, "';' after scope declaration")?;
        Ok(Stmt::GlobalRef(GlobalRefStmt {
            span: self.span_from(start),
            kind,
            names,
        }))
    }

    /// Expression statement, assignment chain, typed assignment, or
    /// augmented assignment; all end in ';'.
    fn parse_expr_or_assignment(&mut self) -> ParseResult<Stmt> {
        let start = self.span_start();
        let first = self.parse_expr_list()?;

        // Typed assignment: target : type [= value]
        if self.at(TokenKind::Colon) {
            let id = self.next_id();
            self.advance();
            let ty = self.parse_type_annotation()?;
            let value = if self.eat(TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.expect(TokenKind::Semi, "';' after assignment")?;
            return Ok(Stmt::Assignment(Assignment {
                span: self.span_from(start),
                id,
                targets: vec![first],
                ty: Some(ty),
                value,
                aug_op: None,
            }));
        }

        // Assignment chain: a = b = value
        if self.at(TokenKind::Eq) {
            let id = self.next_id();
            let mut targets = vec![first];
            let mut value = None;
            while self.eat(TokenKind::Eq) {
                let next = self.parse_expr_list()?;
                if self.at(TokenKind::Eq) {
                    targets.push(next);
                } else {
                    value = Some(next);
                    break;
                }
            }
            self.expect(TokenKind::Semi, "';' after assignment")?;
            return Ok(Stmt::Assignment(Assignment {
                span: self.span_from(start),
                id,
                targets,
                ty: None,
                value,
                aug_op: None,
            }));
        }

        // Augmented assignment.
        let kind = self.cur_kind();
        if kind.is_aug_assign() {
            let id = self.next_id();
            self.advance();
            let value = self.parse_expression()?;
            self.expect(TokenKind::Semi, "';' after assignment")?;
            return Ok(Stmt::Assignment(Assignment {
                span: self.span_from(start),
                id,
                targets: vec![first],
                ty: None,
                value: Some(value),
                aug_op: Some(kind),
            }));
        }

        self.expect(TokenKind::Semi, "';' after expression")?;
        Ok(Stmt::Expr(ExprStmt {
            span: self.span_from(start),
            expr: first,
        }))
    }

    /// `a, b, c` at statement level folds into a Tuple.
    fn parse_expr_list(&mut self) -> ParseResult<Expr> {
        let start = self.span_start();
        let first = self.parse_expression()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            if matches!(
                self.cur_kind(),
                TokenKind::Semi | TokenKind::Eq | TokenKind::Rbrace | TokenKind::Eof
            ) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        Ok(Expr::Tuple(TupleVal {
            span: self.span_from(start),
            items,
        }))
    }
}
