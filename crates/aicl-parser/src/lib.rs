//! AICL parser.
//!
//! Recursive descent with one token of lookahead. Errors are accumulated,
//! never thrown: after recording an error the parser advances one token and
//! keeps going, so a single pass reports as much as possible. A parse is
//! successful iff the error list comes back empty.

use aicl_ast::{
    AccessRight, ConBlock, ConChild, DataDecl, Node, PermissionGrant, Program, SeqBlock, Span,
    TaskCall, WaitStmt,
};
use aicl_lexer::{Lexer, Token, TokenKind};
use indexmap::IndexMap;
use smol_str::SmolStr;
use thiserror::Error;

/// Parser error type.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("expected {expected}, found `{found}` at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of input - expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("expected '}}' at the end of {block} block starting at {open_span:?}")]
    UnclosedBlock { block: &'static str, open_span: Span },

    #[error("unknown access right `{tag}` at position {span:?} - expected READ, WRITE or ADD")]
    InvalidAccessRight { tag: String, span: Span },
}

impl ParseError {
    /// The source span the error points at, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnexpectedToken { span, .. } => Some(*span),
            ParseError::UnexpectedEof { .. } => None,
            ParseError::UnclosedBlock { open_span, .. } => Some(*open_span),
            ParseError::InvalidAccessRight { span, .. } => Some(*span),
        }
    }
}

/// Result type for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse AICL source text into a program plus any accumulated errors.
///
/// The program is returned even when errors occurred; callers that need a
/// clean parse must check that the error list is empty.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(source);
    let program = parser.parse_program();
    (program, parser.into_errors())
}

/// One `PERM` clause before rights are unioned into the grant table.
struct PermClause {
    agent: SmolStr,
    variables: Vec<SmolStr>,
    rights: Vec<AccessRight>,
}

/// Parser state.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    /// Create a new parser from source text. Comment tokens are filtered
    /// out up front; illegal tokens stay in the stream and are skipped at
    /// statement boundaries like any other stray token.
    pub fn new(source: &str) -> Self {
        let (tokens, _lex_errors) = Lexer::new(source).tokenize_filtered();
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Parse the entire program.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.is_eof() {
            match self.current_kind() {
                Some(TokenKind::Start) | Some(TokenKind::End) => {
                    self.advance();
                }
                Some(TokenKind::Data) => match self.parse_data() {
                    Ok(decl) => {
                        if program.globals.contains_key(&decl.name) {
                            tracing::warn!(
                                name = %decl.name,
                                "duplicate DATA declaration, last declaration wins"
                            );
                        }
                        program.globals.insert(decl.name.clone(), decl);
                    }
                    Err(e) => self.recover(e),
                },
                Some(TokenKind::Perm) => match self.parse_perm() {
                    Ok(clause) => Self::merge_perm(&mut program, clause),
                    Err(e) => self.recover(e),
                },
                Some(TokenKind::Task) => match self.parse_task() {
                    Ok(task) => program.body.push(Node::Task(task)),
                    Err(e) => self.recover(e),
                },
                Some(TokenKind::RunSeq) => match self.parse_seq_block() {
                    Ok(block) => program.body.push(Node::Seq(block)),
                    Err(e) => self.recover(e),
                },
                Some(TokenKind::RunCon) => match self.parse_con_block() {
                    Ok(block) => program.body.push(Node::Con(block)),
                    Err(e) => self.recover(e),
                },
                _ => {
                    // Stray tokens between statements are tolerated.
                    tracing::debug!(token = ?self.current_kind(), "skipping stray token");
                    self.advance();
                }
            }
        }

        program
    }

    /// Get collected errors.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// Union a `PERM` clause into the grant table: every listed variable
    /// receives every listed right.
    fn merge_perm(program: &mut Program, clause: PermClause) {
        let grant = program
            .permissions
            .entry(clause.agent.clone())
            .or_insert_with(|| PermissionGrant::new(clause.agent.clone()));
        for variable in &clause.variables {
            for &right in &clause.rights {
                grant.grant(variable.clone(), right);
            }
        }
    }

    /// Record an error and advance one token so the parse can continue.
    fn recover(&mut self, error: ParseError) {
        self.errors.push(error);
        self.advance();
    }

    // ========================================================================
    // Token navigation
    // ========================================================================

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<&TokenKind> {
        self.current().map(|t| &t.kind)
    }

    fn current_span(&self) -> Span {
        self.current().map(|t| t.span).unwrap_or_else(Span::dummy)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(token) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.to_string(),
                span: token.span,
            },
            None => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
        }
    }

    /// Consume a token of the exact given kind or fail.
    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<()> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Consume an identifier token and return its lexeme.
    fn expect_identifier(&mut self, expected: &str) -> ParseResult<SmolStr> {
        match self.current_kind() {
            Some(TokenKind::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Consume a literal (string, number or identifier) as text.
    fn expect_literal(&mut self, expected: &str) -> ParseResult<SmolStr> {
        match self.current_kind() {
            Some(TokenKind::String(value))
            | Some(TokenKind::Number(value))
            | Some(TokenKind::Identifier(value)) => {
                let value = value.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// `DATA ident TYPE ident [VALUE literal] ;`
    fn parse_data(&mut self) -> ParseResult<DataDecl> {
        self.advance(); // consume DATA

        let name = self.expect_identifier("a data name after DATA")?;
        self.expect(TokenKind::Type, "the TYPE keyword")?;
        let ty = self.expect_identifier("a type name after TYPE")?;

        let initial = if self.check(&TokenKind::Value) {
            self.advance();
            Some(self.expect_literal("a literal after VALUE")?)
        } else {
            None
        };

        self.expect(TokenKind::Semicolon, "';' after the DATA declaration")?;
        Ok(DataDecl { name, ty, initial })
    }

    /// `PERM AGENT ident DATA ident_list ACCESS ident_list ;`
    fn parse_perm(&mut self) -> ParseResult<PermClause> {
        self.advance(); // consume PERM

        self.expect(TokenKind::Agent, "the AGENT keyword")?;
        let agent = self.expect_identifier("an agent name after AGENT")?;
        self.expect(TokenKind::Data, "the DATA keyword")?;
        let variables = self.parse_identifier_list("a data name")?;
        self.expect(TokenKind::Access, "the ACCESS keyword")?;
        let rights = self.parse_access_list()?;
        self.expect(TokenKind::Semicolon, "';' after the PERM clause")?;

        Ok(PermClause {
            agent,
            variables,
            rights,
        })
    }

    /// `TASK ident AGENT ident PARAMETERS '(' params ')' ;`
    fn parse_task(&mut self) -> ParseResult<TaskCall> {
        self.advance(); // consume TASK

        let name = self.expect_identifier("a task name after TASK")?;
        self.expect(TokenKind::Agent, "the AGENT keyword")?;
        let agent = self.expect_identifier("an agent name after AGENT")?;
        self.expect(TokenKind::Parameters, "the PARAMETERS keyword")?;
        self.expect(TokenKind::LParen, "'(' after PARAMETERS")?;
        let parameters = self.parse_parameters()?;
        self.expect(TokenKind::Semicolon, "';' after the TASK statement")?;

        Ok(TaskCall {
            name,
            agent,
            parameters,
        })
    }

    /// The parameter list body, up to and including the closing `)`.
    fn parse_parameters(&mut self) -> ParseResult<IndexMap<SmolStr, SmolStr>> {
        let mut params = IndexMap::new();

        if self.check(&TokenKind::RParen) {
            self.advance();
            return Ok(params);
        }

        loop {
            let key = self.expect_identifier("a parameter name")?;
            self.expect(TokenKind::Equal, "'=' after the parameter name")?;
            let value = self.expect_literal("a parameter value")?;
            params.insert(key, value);

            match self.current_kind() {
                Some(TokenKind::Comma) => self.advance(),
                Some(TokenKind::RParen) => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("',' or ')' in the parameter list")),
            }
        }

        Ok(params)
    }

    /// `WAIT ident_list ;`
    fn parse_wait(&mut self) -> ParseResult<WaitStmt> {
        self.advance(); // consume WAIT

        let tasks = self.parse_identifier_list("a task name after WAIT")?;
        self.expect(TokenKind::Semicolon, "';' after the WAIT statement")?;
        Ok(WaitStmt { tasks })
    }

    fn parse_identifier_list(&mut self, expected: &str) -> ParseResult<Vec<SmolStr>> {
        let mut identifiers = vec![self.expect_identifier(expected)?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            identifiers.push(self.expect_identifier(expected)?);
        }
        Ok(identifiers)
    }

    fn parse_access_list(&mut self) -> ParseResult<Vec<AccessRight>> {
        let mut rights = Vec::new();
        loop {
            let span = self.current_span();
            let tag = self.expect_identifier("an access right")?;
            match AccessRight::from_tag(&tag) {
                Some(right) => rights.push(right),
                None => {
                    return Err(ParseError::InvalidAccessRight {
                        tag: tag.to_string(),
                        span,
                    })
                }
            }
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(rights)
    }

    // ========================================================================
    // Composition blocks
    // ========================================================================

    /// `RUNSEQ '{' { stmt } '}'`
    fn parse_seq_block(&mut self) -> ParseResult<SeqBlock> {
        let open_span = self.current_span();
        self.advance(); // consume RUNSEQ
        self.expect(TokenKind::LBrace, "'{' after RUNSEQ")?;

        let mut block = SeqBlock::default();
        while !self.check(&TokenKind::RBrace) {
            if self.is_eof() {
                return Err(ParseError::UnclosedBlock {
                    block: "RUNSEQ",
                    open_span,
                });
            }
            if let Some(node) = self.parse_block_stmt() {
                block.children.push(node);
            }
        }

        self.advance(); // consume '}'
        Ok(block)
    }

    /// `RUNCON '{' { stmt } '}'`
    ///
    /// Children are order-independent at execution time; each gets a key
    /// naming it in logs. Tasks use their task name, nested blocks and
    /// waits get a per-block counter.
    fn parse_con_block(&mut self) -> ParseResult<ConBlock> {
        let open_span = self.current_span();
        self.advance(); // consume RUNCON
        self.expect(TokenKind::LBrace, "'{' after RUNCON")?;

        let mut block = ConBlock::default();
        let mut count = 0usize;
        while !self.check(&TokenKind::RBrace) {
            if self.is_eof() {
                return Err(ParseError::UnclosedBlock {
                    block: "RUNCON",
                    open_span,
                });
            }
            let Some(node) = self.parse_block_stmt() else {
                continue;
            };
            let key = match &node {
                Node::Task(task) => task.name.clone(),
                Node::Seq(_) => SmolStr::new(format!("RUNSEQ_{count}")),
                Node::Con(_) => SmolStr::new(format!("RUNCON_{count}")),
                Node::Wait(_) => SmolStr::new(format!("WAIT_{count}")),
            };
            if !matches!(node, Node::Task(_)) {
                count += 1;
            }
            block.children.push(ConChild { key, node });
        }

        self.advance(); // consume '}'
        Ok(block)
    }

    /// Parse one statement inside a block, or skip a token that cannot
    /// start one. Errors inside a statement are recorded here so the
    /// enclosing block keeps scanning for its closing brace.
    fn parse_block_stmt(&mut self) -> Option<Node> {
        let parsed = match self.current_kind() {
            Some(TokenKind::Task) => self.parse_task().map(Node::Task),
            Some(TokenKind::RunSeq) => self.parse_seq_block().map(Node::Seq),
            Some(TokenKind::RunCon) => self.parse_con_block().map(Node::Con),
            Some(TokenKind::Wait) => self.parse_wait().map(Node::Wait),
            _ => {
                tracing::debug!(token = ?self.current_kind(), "skipping stray token in block");
                self.advance();
                return None;
            }
        };

        match parsed {
            Ok(node) => Some(node),
            Err(e) => {
                self.recover(e);
                None
            }
        }
    }
}
