//! Declaration grammar: imports, archetypes, enums, abilities, impls,
//! globals, sem strings, tests, module-code blocks.

use super::{ParseResult, Parser};
use crate::ast::*;
use crate::token::TokenKind;

impl Parser {
    // ------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------

    pub(crate) fn parse_import(&mut self) -> ParseResult<Import> {
        let start = self.span_start();
        let id = self.next_id();
        let is_include = self.at(TokenKind::KwInclude);
        self.advance(); // import / include

        if !is_include && self.at(TokenKind::KwFrom) {
            self.advance();
            let from_path = self.parse_module_path(false)?;
            self.expect(TokenKind::Lbrace, "'{' after import source")?;
            let mut items = Vec::new();
            loop {
                if self.at(TokenKind::Rbrace) {
                    break;
                }
                let item_start = self.span_start();
                let name = self.parse_ident("imported name")?;
                let alias = if self.eat(TokenKind::KwAs) {
                    Some(self.parse_ident("alias")?)
                } else {
                    None
                };
                items.push(ModuleItem {
                    span: self.span_from(item_start),
                    name,
                    alias,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Rbrace, "'}' closing import list")?;
            self.expect(TokenKind::Semi, "';' after import")?;
            return Ok(Import {
                id,
                span: self.span_from(start),
                from_path: Some(from_path),
                paths: Vec::new(),
                items,
                is_include: false,
            });
        }

        let mut paths = vec![self.parse_module_path(true)?];
        while self.eat(TokenKind::Comma) {
            paths.push(self.parse_module_path(true)?);
        }
        self.expect(TokenKind::Semi, "';' after import")?;
        Ok(Import {
            id,
            span: self.span_from(start),
            from_path: None,
            paths,
            items: Vec::new(),
            is_include,
        })
    }

    fn parse_module_path(&mut self, allow_alias: bool) -> ParseResult<ModulePath> {
        let start = self.span_start();
        let mut dots: u16 = 0;
        loop {
            match self.cur_kind() {
                TokenKind::Dot => {
                    dots += 1;
                    self.advance();
                }
                TokenKind::Ellipsis => {
                    dots += 3;
                    self.advance();
                }
                _ => break,
            }
        }
        let mut segments = Vec::new();
        if self.at(TokenKind::Name) || self.at(TokenKind::KwescName) {
            segments.push(self.parse_ident("module name")?);
            while self.at(TokenKind::Dot)
                && matches!(self.peek_kind(1), TokenKind::Name | TokenKind::KwescName)
            {
                self.advance();
                segments.push(self.parse_ident("module segment")?);
            }
        }
        if dots == 0 && segments.is_empty() {
            return Err(self.error_here(format!(
                "expected module path, found '{}'",
                self.describe_cur()
            )));
        }
        let alias = if allow_alias && self.eat(TokenKind::KwAs) {
            Some(self.parse_ident("alias")?)
        } else {
            None
        };
        Ok(ModulePath {
            span: self.span_from(start),
            dots,
            segments,
            alias,
        })
    }

    // ------------------------------------------------------------------
    // Archetypes
    // ------------------------------------------------------------------

    pub(crate) fn parse_archetype(
        &mut self,
        decorators: Vec<Expr>,
        is_async: bool,
    ) -> ParseResult<Archetype> {
        let start = self.span_start();
        let id = self.next_id();
        let kind = match self.cur_kind() {
            TokenKind::KwObj => ArchKind::Obj,
            TokenKind::KwClass => ArchKind::Class,
            TokenKind::KwNode => ArchKind::Node,
            TokenKind::KwEdge => ArchKind::Edge,
            TokenKind::KwWalker => ArchKind::Walker,
            _ => {
                return Err(self.error_here(format!(
                    "expected archetype keyword, found '{}'",
                    self.describe_cur()
                )))
            }
        };
        self.advance();
        let access = self.parse_access_tag();
        let name = self.parse_ident("archetype name")?;

        let mut bases = Vec::new();
        if self.eat(TokenKind::Lparen) {
            while !self.at(TokenKind::Rparen) {
                bases.push(self.parse_expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Rparen, "')' closing base list")?;
        }

        if self.eat(TokenKind::Semi) {
            return Ok(Archetype {
                id,
                span: self.span_from(start),
                kind,
                name,
                access,
                is_async,
                is_abstract: false,
                bases,
                decorators,
                doc: None,
                body: None,
                semstr: None,
            });
        }

        self.expect(TokenKind::Lbrace, "'{' opening archetype body")?;
        let mut doc = None;
        if self.at(TokenKind::Str) {
            doc = Some(self.parse_string_lit()?);
            self.eat(TokenKind::Semi);
        }
        let mut items = Vec::new();
        while !self.at(TokenKind::Rbrace) && !self.at(TokenKind::Eof) {
            items.push(self.parse_arch_item()?);
        }
        self.expect(TokenKind::Rbrace, "'}' closing archetype body")?;

        Ok(Archetype {
            id,
            span: self.span_from(start),
            kind,
            name,
            access,
            is_async,
            is_abstract: false,
            bases,
            decorators,
            doc,
            body: Some(items),
            semstr: None,
        })
    }

    pub(crate) fn parse_arch_item(&mut self) -> ParseResult<ArchItem> {
        match self.cur_kind() {
            TokenKind::KwHas => Ok(ArchItem::Has(self.parse_has(false)?)),
            TokenKind::KwStatic => {
                self.advance();
                match self.cur_kind() {
                    TokenKind::KwHas => Ok(ArchItem::Has(self.parse_has(true)?)),
                    TokenKind::KwDef | TokenKind::KwCan => {
                        Ok(ArchItem::Ability(self.parse_ability(
                            Vec::new(),
                            false,
                            true,
                            false,
                        )?))
                    }
                    _ => Err(self.error_here(format!(
                        "expected 'has' or a method after 'static', found '{}'",
                        self.describe_cur()
                    ))),
                }
            }
            TokenKind::KwOverride => {
                self.advance();
                let mut ability = self.parse_ability(Vec::new(), false, false, false)?;
                ability.is_override = true;
                Ok(ArchItem::Ability(ability))
            }
            TokenKind::KwAsync => {
                self.advance();
                Ok(ArchItem::Ability(self.parse_ability(
                    Vec::new(),
                    true,
                    false,
                    false,
                )?))
            }
            TokenKind::KwAbstract => {
                self.advance();
                Ok(ArchItem::Ability(self.parse_ability(
                    Vec::new(),
                    false,
                    false,
                    true,
                )?))
            }
            TokenKind::KwDef | TokenKind::KwCan => Ok(ArchItem::Ability(self.parse_ability(
                Vec::new(),
                false,
                false,
                false,
            )?)),
            TokenKind::Decor => {
                let decorators = self.parse_decorators()?;
                Ok(ArchItem::Ability(self.parse_ability(
                    decorators, false, false, false,
                )?))
            }
            TokenKind::KwObj
            | TokenKind::KwClass
            | TokenKind::KwNode
            | TokenKind::KwEdge
            | TokenKind::KwWalker => Ok(ArchItem::Nested(self.parse_archetype(Vec::new(), false)?)),
            _ => Err(self.error_here(format!(
                "expected archetype member, found '{}'",
                self.describe_cur()
            ))),
        }
    }

    /// `has a: int = 1, b: str;` with a mandatory annotation.
    pub(crate) fn parse_has(&mut self, is_static: bool) -> ParseResult<ArchHas> {
        let start = self.span_start();
        let id = self.next_id();
        self.expect(TokenKind::KwHas, "'has'")?;
        let access = self.parse_access_tag();

        let mut vars = Vec::new();
        loop {
            let var_start = self.span_start();
            let var_id = self.next_id();
            let name = self.parse_ident("field name")?;
            self.expect(TokenKind::Colon, "':' before field type")?;
            let ty = self.parse_type_annotation()?;
            let value = if self.eat(TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            vars.push(HasVar {
                id: var_id,
                span: self.span_from(var_start),
                name,
                ty,
                value,
                computed_ty: None,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semi, "';' after has statement")?;
        Ok(ArchHas {
            id,
            span: self.span_from(start),
            is_static,
            access,
            vars,
        })
    }

    // ------------------------------------------------------------------
    // Abilities
    // ------------------------------------------------------------------

    pub(crate) fn parse_ability(
        &mut self,
        decorators: Vec<Expr>,
        is_async: bool,
        is_static: bool,
        is_abstract: bool,
    ) -> ParseResult<Ability> {
        let start = self.span_start();
        let id = self.next_id();
        let is_def = match self.cur_kind() {
            TokenKind::KwDef => true,
            TokenKind::KwCan => false,
            _ => {
                return Err(self.error_here(format!(
                    "expected 'def' or 'can', found '{}'",
                    self.describe_cur()
                )))
            }
        };
        self.advance();
        let access = self.parse_access_tag();
        let name = self.parse_ident("ability name")?;

        let mut signature = FuncSignature::default();
        if self.at(TokenKind::Lparen) {
            signature = self.parse_signature()?;
        }
        if self.eat(TokenKind::ReturnHint) {
            signature.return_ty = Some(Box::new(self.parse_type_annotation()?));
        }

        if self.eat(TokenKind::Semi) {
            return Ok(Ability {
                id,
                span: self.span_from(start),
                name,
                is_def,
                is_async,
                is_static,
                is_abstract,
                is_override: false,
                access,
                decorators,
                signature,
                doc: None,
                body: None,
                semstr: None,
            });
        }
        if self.at(TokenKind::KwAbstract) {
            self.advance();
            self.expect(TokenKind::Semi, "';' after 'abs'")?;
            return Ok(Ability {
                id,
                span: self.span_from(start),
                name,
                is_def,
                is_async,
                is_static,
                is_abstract: true,
                is_override: false,
                access,
                decorators,
                signature,
                doc: None,
                body: None,
                semstr: None,
            });
        }

        let (doc, body) = self.parse_code_block_with_doc()?;
        Ok(Ability {
            id,
            span: self.span_from(start),
            name,
            is_def,
            is_async,
            is_static,
            is_abstract,
            is_override: false,
            access,
            decorators,
            signature,
            doc,
            body: Some(body),
            semstr: None,
        })
    }

    pub(crate) fn parse_signature(&mut self) -> ParseResult<FuncSignature> {
        let start = self.span_start();
        self.expect(TokenKind::Lparen, "'('")?;
        let mut params = Vec::new();
        while !self.at(TokenKind::Rparen) {
            let param_start = self.span_start();
            let param_id = self.next_id();
            let star = if self.eat(TokenKind::StarMul) {
                ParamStar::Args
            } else if self.eat(TokenKind::StarPow) {
                ParamStar::Kwargs
            } else {
                ParamStar::None
            };
            let name = match self.cur_kind() {
                TokenKind::KwSelf => {
                    let tok = self.advance();
                    Ident::new("self", tok.span)
                }
                _ => self.parse_ident("parameter name")?,
            };
            let ty = if self.eat(TokenKind::Colon) {
                Some(self.parse_type_annotation()?)
            } else {
                None
            };
            let default = if self.eat(TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(ParamVar {
                id: param_id,
                span: self.span_from(param_start),
                name,
                ty,
                default,
                star,
                computed_ty: None,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Rparen, "')' closing parameter list")?;
        Ok(FuncSignature {
            span: self.span_from(start),
            params,
            return_ty: None,
        })
    }

    // ------------------------------------------------------------------
    // Enums
    // ------------------------------------------------------------------

    pub(crate) fn parse_enum(&mut self) -> ParseResult<EnumDef> {
        let start = self.span_start();
        let id = self.next_id();
        self.expect(TokenKind::KwEnum, "'enum'")?;
        let access = self.parse_access_tag();
        let name = self.parse_ident("enum name")?;

        let mut bases = Vec::new();
        if self.eat(TokenKind::Lparen) {
            while !self.at(TokenKind::Rparen) {
                bases.push(self.parse_expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Rparen, "')' closing base list")?;
        }

        self.expect(TokenKind::Lbrace, "'{' opening enum body")?;
        let mut doc = None;
        if self.at(TokenKind::Str) && self.peek_kind(1) != TokenKind::Comma {
            doc = Some(self.parse_string_lit()?);
            self.eat(TokenKind::Semi);
        }
        let mut members = Vec::new();
        while !self.at(TokenKind::Rbrace) && !self.at(TokenKind::Eof) {
            let member_start = self.span_start();
            let member_id = self.next_id();
            let member_name = self.parse_ident("enum member")?;
            let value = if self.eat(TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            members.push(EnumMember {
                id: member_id,
                span: self.span_from(member_start),
                name: member_name,
                value,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Rbrace, "'}' closing enum body")?;

        Ok(EnumDef {
            id,
            span: self.span_from(start),
            name,
            access,
            bases,
            doc,
            members,
            semstr: None,
        })
    }

    // ------------------------------------------------------------------
    // Impls
    // ------------------------------------------------------------------

    pub(crate) fn parse_impl(&mut self) -> ParseResult<ImplDef> {
        let start = self.span_start();
        let id = self.next_id();
        self.expect(TokenKind::KwImpl, "'impl'")?;

        let mut target = vec![self.parse_ident("impl target")?];
        while self.at(TokenKind::Dot) {
            self.advance();
            target.push(self.parse_ident("impl target segment")?);
        }

        if self.at(TokenKind::Lparen) || self.at(TokenKind::ReturnHint) {
            // Single-method form: impl Target.member(sig) -> ret { body }
            let mut signature = FuncSignature::default();
            if self.at(TokenKind::Lparen) {
                signature = self.parse_signature()?;
            }
            if self.eat(TokenKind::ReturnHint) {
                signature.return_ty = Some(Box::new(self.parse_type_annotation()?));
            }
            let (doc, body) = self.parse_code_block_with_doc()?;
            return Ok(ImplDef {
                id,
                span: self.span_from(start),
                target,
                kind: ImplKind::Method,
                signature: Some(signature),
                members: Vec::new(),
                body,
                doc,
                origin: self.cur().span.src,
            });
        }

        self.expect(TokenKind::Lbrace, "'{' opening impl body")?;
        let mut doc = None;
        if self.at(TokenKind::Str) {
            doc = Some(self.parse_string_lit()?);
            self.eat(TokenKind::Semi);
        }
        let mut members = Vec::new();
        while !self.at(TokenKind::Rbrace) && !self.at(TokenKind::Eof) {
            members.push(self.parse_arch_item()?);
        }
        self.expect(TokenKind::Rbrace, "'}' closing impl body")?;
        Ok(ImplDef {
            id,
            span: self.span_from(start),
            target,
            kind: ImplKind::Obj,
            signature: None,
            members,
            body: Vec::new(),
            doc,
            origin: self.cur().span.src,
        })
    }

    // ------------------------------------------------------------------
    // Globals, sem, tests, module code
    // ------------------------------------------------------------------

    pub(crate) fn parse_glob(&mut self) -> ParseResult<GlobalVars> {
        let start = self.span_start();
        let id = self.next_id();
        self.expect(TokenKind::KwGlob, "'glob'")?;
        let access = self.parse_access_tag();

        let mut vars = Vec::new();
        loop {
            let var_start = self.span_start();
            let var_id = self.next_id();
            let name = self.parse_ident("global name")?;
            let ty = if self.eat(TokenKind::Colon) {
                Some(self.parse_type_annotation()?)
            } else {
                None
            };
            let value = if self.eat(TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            vars.push(GlobVar {
                id: var_id,
                span: self.span_from(var_start),
                name,
                ty,
                value,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semi, "';' after glob")?;
        Ok(GlobalVars {
            id,
            span: self.span_from(start),
            access,
            is_frozen: false,
            vars,
        })
    }

    pub(crate) fn parse_sem(&mut self) -> ParseResult<SemDef> {
        let start = self.span_start();
        let id = self.next_id();
        self.expect(TokenKind::KwSem, "'sem'")?;
        let mut target = vec![self.parse_ident("sem target")?];
        while self.at(TokenKind::Dot) {
            self.advance();
            target.push(self.parse_ident("sem target segment")?);
        }
        self.expect(TokenKind::Eq, "'=' in sem declaration")?;
        let value = self.parse_string_lit()?;
        self.expect(TokenKind::Semi, "';' after sem declaration")?;
        Ok(SemDef {
            id,
            span: self.span_from(start),
            target,
            value,
        })
    }

    pub(crate) fn parse_test(&mut self) -> ParseResult<TestBlock> {
        let start = self.span_start();
        let id = self.next_id();
        self.expect(TokenKind::KwTest, "'test'")?;
        let name = self.parse_ident("test name")?;
        let body = self.parse_code_block()?;
        Ok(TestBlock {
            id,
            span: self.span_from(start),
            name,
            body,
        })
    }

    pub(crate) fn parse_module_code(&mut self) -> ParseResult<ModuleCode> {
        let start = self.span_start();
        let id = self.next_id();
        self.expect(TokenKind::KwWith, "'with'")?;
        let is_entry = match self.cur_kind() {
            TokenKind::KwEntry => true,
            TokenKind::KwExit => false,
            _ => {
                return Err(self.error_here(format!(
                    "expected 'entry' or 'exit', found '{}'",
                    self.describe_cur()
                )))
            }
        };
        self.advance();
        let name = if self.eat(TokenKind::Colon) {
            Some(self.parse_ident("entry name")?)
        } else {
            None
        };
        let body = self.parse_code_block()?;
        Ok(ModuleCode {
            id,
            span: self.span_from(start),
            is_entry,
            name,
            body,
            code_context: CodeContext::Default,
        })
    }
}
