use anyhow::anyhow;
use strum::IntoDiscriminant;

use crate::ast::{
    Ast, Batch, BetweenExpr, BinaryExpr, CaseExpr, CastExpr, ColumnDefinition,
    CreateIndexStatement, CreateTableStatement, CursorStatement, DataType,
    DeclareCursorStatement, DeclareStatement, DeclareVariable, DeleteStatement, DerivedTableExpr,
    DropProcedureStatement, DropTableStatement, ExecuteArgument, ExecuteStatement, ExecuteTarget,
    Expr, FunctionExpr, GrantStatement, GroupingExpr, IfStatement, InExpr, InList, InsertSource,
    InsertStatement, IsNullExpr, JoinItem, JoinOperator, OrderByExpr, OrderBySortDirection,
    Parameter, ParameterList, ParseToken, PrintStatement, ProcedureDefinition,
    RaiserrorStatement, ReturnStatement, SelectElement, SelectElements, SelectStatement,
    SetOptionStatement, SetVarStatement, Statement, StatementsBlock, TableExpression,
    TableJoinList, TableName, TableReferenceExpr, Token, TokenType, TokenTypeVariant,
    TransactionStatement, TruncateStatement, UnaryExpr, Union, UpdateItem, UpdateStatement,
    WhereClause, WhileStatement,
};
use crate::scanner::Scanner;

/// Table hints that may follow a table name without parentheses.
const TABLE_HINTS: [&str; 6] = [
    "holdlock",
    "noholdlock",
    "shared",
    "readpast",
    "nolock",
    "readuncommitted",
];

/// Types spelled with two words, e.g. `double precision`.
const MULTI_WORD_TYPES: [(&str, &[&str]); 6] = [
    ("double", &["precision"]),
    ("unsigned", &["bigint", "int", "smallint", "tinyint"]),
    ("char", &["varying"]),
    ("character", &["varying"]),
    ("nchar", &["varying"]),
    ("long", &["varchar", "nvarchar", "binary"]),
];

pub struct Parser<'a> {
    source_chars: Vec<char>,
    source_tokens: &'a [Token],
    curr: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &str, tokens: &'a [Token]) -> Parser<'a> {
        Self {
            source_chars: source.chars().collect(),
            source_tokens: tokens,
            curr: 0,
        }
    }

    pub fn parse(&mut self) -> anyhow::Result<Ast> {
        self.parse_sql()
    }

    fn peek_prev(&self) -> &Token {
        &self.source_tokens[self.curr - 1]
    }

    fn peek(&self) -> &Token {
        &self.source_tokens[self.curr]
    }

    fn peek_next_i(&self, i: usize) -> &Token {
        if self.curr + i >= self.source_tokens.len() {
            &self.source_tokens[self.source_tokens.len() - 1] // Eof
        } else {
            &self.source_tokens[self.curr + i]
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            // Do not advance if we peek Eof
            self.curr += 1;
        }
        self.peek_prev()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenType::Eof
    }

    fn check_token_type(&self, token_type: TokenTypeVariant) -> bool {
        self.peek().kind.discriminant() == token_type
    }

    fn match_token_type(&mut self, token_type: TokenTypeVariant) -> bool {
        if self.check_token_type(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_token_types(&mut self, token_types: &[TokenTypeVariant]) -> bool {
        for tok in token_types {
            if self.check_token_type(*tok) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check_non_reserved_keyword(&self, value: &str) -> bool {
        let peek = self.peek();
        match &peek.kind {
            TokenType::Identifier(ident) => ident.to_lowercase() == value,
            _ => false,
        }
    }

    fn match_non_reserved_keyword(&mut self, value: &str) -> bool {
        if self.check_non_reserved_keyword(value) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_non_reserved_keyword(&mut self, value: &str) -> anyhow::Result<&Token> {
        if self.check_non_reserved_keyword(value) {
            Ok(self.advance())
        } else {
            let err_msg = format!("Expected `{}`.", value.to_uppercase());
            Err(anyhow!(self.error(self.peek(), &err_msg)))
        }
    }

    fn consume(&mut self, token_type: TokenTypeVariant) -> anyhow::Result<&Token> {
        if self.check_token_type(token_type) {
            Ok(self.advance())
        } else {
            let err_msg = format!("Expected `{}`.", token_type.variant_str());
            Err(anyhow!(self.error(self.peek(), &err_msg)))
        }
    }

    fn consume_one_of(&mut self, token_types: &[TokenTypeVariant]) -> anyhow::Result<&Token> {
        for token_type in token_types {
            if self.check_token_type(*token_type) {
                return Ok(self.advance());
            }
        }
        let err_msg = token_types
            .iter()
            .map(|el| format!("`{}`", el.variant_str()))
            .collect::<Vec<String>>()
            .join(" or ");
        Err(anyhow!(self.error(
            self.peek(),
            &format!("Expected one of: {}.", err_msg)
        )))
    }

    fn check_identifier(&self) -> bool {
        self.check_token_type(TokenTypeVariant::Identifier)
            || self.check_token_type(TokenTypeVariant::QuotedIdentifier)
    }

    fn consume_identifier(&mut self) -> anyhow::Result<&Token> {
        self.consume_one_of(&[
            TokenTypeVariant::Identifier,
            TokenTypeVariant::QuotedIdentifier,
        ])
    }

    /// `GO` is the batch separator: it is not reserved but it can never be an alias or a name.
    fn check_batch_separator(&self) -> bool {
        self.check_non_reserved_keyword("go")
    }

    /// Non-reserved words that start a statement (or separate batches), so they never
    /// continue the previous one as an alias or an option word.
    fn check_statement_word(&self) -> bool {
        ["go", "grant", "revoke", "use"]
            .iter()
            .any(|word| self.check_non_reserved_keyword(word))
    }

    fn error(&self, token: &Token, message: &str) -> String {
        format!(
            "[line {}, col {}] Error {}: {}",
            token.line,
            token.col,
            &format!("at '{}'", token.lexeme),
            message
        )
    }

    /// Verbatim source text from the token at `from` up to the last consumed token.
    fn source_text(&self, from: usize) -> String {
        if self.curr <= from {
            return String::new();
        }
        let start = self.source_tokens[from].start;
        let end = self.peek_prev().end;
        self.source_chars[start..end].iter().collect()
    }

    fn skip_batch_separators(&mut self) {
        while self.match_non_reserved_keyword("go")
            || self.match_token_type(TokenTypeVariant::Semicolon)
        {}
    }

    // sql -> ["GO"]* [batch ("GO" ["GO"]* batch)* ["GO"]*] EOF
    fn parse_sql(&mut self) -> anyhow::Result<Ast> {
        let mut batches = vec![];
        self.skip_batch_separators();
        while !self.is_at_end() {
            batches.push(self.parse_batch()?);
            if self.is_at_end() {
                break;
            }
            self.consume_non_reserved_keyword("go")?;
            self.skip_batch_separators();
        }
        self.consume(TokenTypeVariant::Eof)?;
        Ok(Ast { batches })
    }

    // batch -> procedure_definition | statements
    fn parse_batch(&mut self) -> anyhow::Result<Batch> {
        let batch = if self.check_token_type(TokenTypeVariant::Create)
            && self.peek_next_i(1).kind == TokenType::Procedure
        {
            Batch::Procedure(self.parse_procedure_definition()?)
        } else {
            Batch::Statements(self.parse_statements()?)
        };
        Ok(batch)
    }

    // procedure_definition ->
    // "CREATE" ("PROC" | "PROCEDURE") name [";" "Number"]
    // ["("] [parameter ("," parameter)*] [")"]
    // ["WITH" "RECOMPILE"]
    // "AS" statements
    fn parse_procedure_definition(&mut self) -> anyhow::Result<ProcedureDefinition> {
        self.consume(TokenTypeVariant::Create)?;
        self.consume(TokenTypeVariant::Procedure)?;
        let name = self.parse_object_name()?;
        let number = if self.match_token_type(TokenTypeVariant::Semicolon) {
            Some(self.consume(TokenTypeVariant::Number)?.lexeme.clone())
        } else {
            None
        };

        let parenthesized = self.match_token_type(TokenTypeVariant::LeftParen);
        let parameter_list = if self.check_token_type(TokenTypeVariant::Variable) {
            let mut parameters = vec![];
            loop {
                parameters.push(self.parse_parameter()?);
                if !self.match_token_type(TokenTypeVariant::Comma) {
                    break;
                }
            }
            Some(ParameterList { parameters })
        } else {
            None
        };
        if parenthesized {
            self.consume(TokenTypeVariant::RightParen)?;
        }

        let recompile = if self.check_non_reserved_keyword("with") {
            self.advance();
            self.consume_non_reserved_keyword("recompile")?;
            true
        } else {
            false
        };

        self.consume(TokenTypeVariant::As)?;
        let body = self.parse_statements()?;

        Ok(ProcedureDefinition {
            name,
            number,
            parameter_list,
            recompile,
            body,
        })
    }

    // parameter -> "Variable" ["AS"] data_type ["=" expr] ["OUTPUT" | "OUT"]
    fn parse_parameter(&mut self) -> anyhow::Result<Parameter> {
        let variable = self.consume(TokenTypeVariant::Variable)?.clone();
        self.match_token_type(TokenTypeVariant::As);
        let data_type = self.parse_data_type()?;
        let default = if self.match_token_type(TokenTypeVariant::Equal) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let output =
            self.match_non_reserved_keyword("output") || self.match_non_reserved_keyword("out");
        Ok(Parameter {
            variable,
            data_type,
            default,
            output,
        })
    }

    fn check_multi_word_type(&self, first_word: &str) -> bool {
        let first_word = first_word.to_lowercase();
        MULTI_WORD_TYPES
            .iter()
            .filter(|(first, _)| *first == first_word)
            .flat_map(|(_, seconds)| seconds.iter())
            .any(|second| self.check_non_reserved_keyword(second))
    }

    // data_type -> (object_name | multi_word_type) ["(" "Number" ["," "Number"] ")"]
    pub fn parse_data_type(&mut self) -> anyhow::Result<DataType> {
        let start = self.curr;
        let mut name = self.parse_object_name()?;
        let first_word = match &name {
            ParseToken::Single(first) if self.check_multi_word_type(&first.lexeme) => {
                Some(first.clone())
            }
            _ => None,
        };
        if let Some(first) = first_word {
            let second = self.advance().clone();
            name = ParseToken::Multiple(vec![first, second]);
        }
        let mut arguments = vec![];
        if self.match_token_type(TokenTypeVariant::LeftParen) {
            loop {
                arguments.push(self.consume(TokenTypeVariant::Number)?.lexeme.clone());
                if !self.match_token_type(TokenTypeVariant::Comma) {
                    break;
                }
            }
            self.consume(TokenTypeVariant::RightParen)?;
        }
        Ok(DataType {
            name,
            arguments,
            text: self.source_text(start),
        })
    }

    // statements -> (statement [";"])*
    // The list ends at EOF, at the batch separator `GO`, or at a token that cannot start a statement
    // (e.g. the `END` of an enclosing block or the `ELSE` of an enclosing `IF`).
    fn parse_statements(&mut self) -> anyhow::Result<Vec<Statement>> {
        let mut statements = vec![];
        loop {
            while self.match_token_type(TokenTypeVariant::Semicolon) {}
            if self.is_at_end()
                || self.check_batch_separator()
                || self.check_token_type(TokenTypeVariant::End)
                || self.check_token_type(TokenTypeVariant::Else)
            {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> anyhow::Result<Statement> {
        let peek = self.peek();

        let statement = match &peek.kind {
            TokenType::Select => Statement::Select(self.parse_select()?),
            TokenType::Insert => self.parse_insert_statement()?,
            TokenType::Update => self.parse_update_statement()?,
            TokenType::Delete => self.parse_delete_statement()?,
            TokenType::Create => self.parse_create_statement()?,
            TokenType::Drop => self.parse_drop_statement()?,
            TokenType::Truncate => self.parse_truncate_statement()?,
            TokenType::Begin => {
                let next = &self.peek_next_i(1).kind;
                if matches!(next, TokenType::Identifier(word) if word.eq_ignore_ascii_case("tran") || word.eq_ignore_ascii_case("transaction"))
                {
                    self.parse_transaction_statement()?
                } else {
                    self.parse_statements_block()?
                }
            }
            TokenType::Commit | TokenType::Rollback => self.parse_transaction_statement()?,
            TokenType::If => self.parse_if_statement()?,
            TokenType::While => self.parse_while_statement()?,
            TokenType::Declare => self.parse_declare_statement()?,
            TokenType::Set => self.parse_set_statement()?,
            TokenType::Execute => Statement::Execute(self.parse_execute_statement()?),
            TokenType::Return => self.parse_return_statement()?,
            TokenType::Print => self.parse_print_statement()?,
            TokenType::Raiserror => self.parse_raiserror_statement()?,
            TokenType::Open | TokenType::Fetch | TokenType::Close | TokenType::Deallocate => {
                self.parse_cursor_statement()?
            }
            TokenType::Break => {
                self.advance();
                Statement::Break
            }
            TokenType::Continue => {
                self.advance();
                Statement::Continue
            }
            TokenType::Identifier(non_reserved_keyword) => {
                match non_reserved_keyword.to_lowercase().as_str() {
                    "grant" | "revoke" => self.parse_grant_statement()?,
                    "use" => {
                        self.advance();
                        Statement::Use(self.parse_object_name()?)
                    }
                    _ => {
                        return Err(anyhow!(self.error(
                            peek,
                            &format!(
                                "Unexpected non reserved keyword: `{}`.",
                                non_reserved_keyword
                            ),
                        )));
                    }
                }
            }
            _ => {
                return Err(anyhow!(self.error(peek, "Expected statement.")));
            }
        };
        Ok(statement)
    }

    // statements_block -> "BEGIN" statements "END"
    fn parse_statements_block(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Begin)?;
        let statements = self.parse_statements()?;
        self.consume(TokenTypeVariant::End)?;
        Ok(Statement::Block(StatementsBlock { statements }))
    }

    // transaction_statement -> ("BEGIN" | "COMMIT" | "ROLLBACK") [("TRAN" | "TRANSACTION" | "WORK")] [name]
    fn parse_transaction_statement(&mut self) -> anyhow::Result<Statement> {
        let kind = self
            .consume_one_of(&[
                TokenTypeVariant::Begin,
                TokenTypeVariant::Commit,
                TokenTypeVariant::Rollback,
            ])?
            .kind
            .clone();
        let _ = self.match_non_reserved_keyword("tran")
            || self.match_non_reserved_keyword("transaction")
            || self.match_non_reserved_keyword("work");
        let name = if self.check_identifier() && !self.check_statement_word() {
            Some(ParseToken::Single(self.advance().clone()))
        } else {
            None
        };
        let transaction = TransactionStatement { name };
        Ok(match kind {
            TokenType::Begin => Statement::BeginTransaction(transaction),
            TokenType::Commit => Statement::CommitTransaction(transaction),
            TokenType::Rollback => Statement::RollbackTransaction(transaction),
            _ => unreachable!(),
        })
    }

    // if_statement -> "IF" expr statement ["ELSE" statement]
    fn parse_if_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::If)?;
        let condition = self.parse_expr()?;
        while self.match_token_type(TokenTypeVariant::Semicolon) {}
        let then = self.parse_statement()?;
        while self.check_token_type(TokenTypeVariant::Semicolon)
            && self.peek_next_i(1).kind == TokenType::Else
        {
            self.advance();
        }
        let r#else = if self.match_token_type(TokenTypeVariant::Else) {
            while self.match_token_type(TokenTypeVariant::Semicolon) {}
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            condition,
            then: Box::new(then),
            r#else,
        }))
    }

    // while_statement -> "WHILE" expr statement
    fn parse_while_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::While)?;
        let condition = self.parse_expr()?;
        while self.match_token_type(TokenTypeVariant::Semicolon) {}
        let body = self.parse_statement()?;
        Ok(Statement::While(WhileStatement {
            condition,
            body: Box::new(body),
        }))
    }

    // declare_statement ->
    // "DECLARE" "Variable" ["AS"] data_type ("," "Variable" ["AS"] data_type)*
    // | "DECLARE" name "CURSOR" "FOR" select ["FOR" ("READ" "ONLY" | "UPDATE" ["OF" column ("," column)*])]
    fn parse_declare_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Declare)?;

        if self.check_identifier() {
            let name = ParseToken::Single(self.advance().clone());
            self.consume_non_reserved_keyword("cursor")?;
            self.consume(TokenTypeVariant::For)?;
            let query = self.parse_select()?;
            let for_update = if self.match_token_type(TokenTypeVariant::For) {
                if self.match_token_type(TokenTypeVariant::Update) {
                    let mut columns = vec![];
                    if self.match_non_reserved_keyword("of") {
                        loop {
                            columns.push(self.parse_object_name()?);
                            if !self.match_token_type(TokenTypeVariant::Comma) {
                                break;
                            }
                        }
                    }
                    Some(columns)
                } else {
                    self.consume_non_reserved_keyword("read")?;
                    self.consume_non_reserved_keyword("only")?;
                    None
                }
            } else {
                None
            };
            return Ok(Statement::DeclareCursor(DeclareCursorStatement {
                name,
                query,
                for_update,
            }));
        }

        let mut variables = vec![];
        loop {
            let variable = self.consume(TokenTypeVariant::Variable)?.clone();
            self.match_token_type(TokenTypeVariant::As);
            let data_type = self.parse_data_type()?;
            variables.push(DeclareVariable {
                variable,
                data_type,
            });
            if !self.match_token_type(TokenTypeVariant::Comma) {
                break;
            }
        }
        Ok(Statement::Declare(DeclareStatement { variables }))
    }

    // cursor_statement ->
    // "OPEN" name
    // | "FETCH" name ["INTO" "Variable" ("," "Variable")*]
    // | "CLOSE" name
    // | "DEALLOCATE" ["CURSOR"] name
    fn parse_cursor_statement(&mut self) -> anyhow::Result<Statement> {
        let kind = self.advance().kind.clone();
        let statement = match kind {
            TokenType::Open => CursorStatement::Open(self.parse_object_name()?),
            TokenType::Close => CursorStatement::Close(self.parse_object_name()?),
            TokenType::Deallocate => {
                self.match_non_reserved_keyword("cursor");
                CursorStatement::Deallocate(self.parse_object_name()?)
            }
            TokenType::Fetch => {
                let name = self.parse_object_name()?;
                let mut into = vec![];
                if self.match_token_type(TokenTypeVariant::Into) {
                    loop {
                        into.push(self.consume(TokenTypeVariant::Variable)?.clone());
                        if !self.match_token_type(TokenTypeVariant::Comma) {
                            break;
                        }
                    }
                }
                CursorStatement::Fetch { name, into }
            }
            _ => unreachable!(),
        };
        Ok(Statement::Cursor(statement))
    }

    // set_statement -> "SET" "Variable" "=" expr | "SET" option_word+
    fn parse_set_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Set)?;
        if self.check_token_type(TokenTypeVariant::Variable) {
            let variable = self.advance().clone();
            self.consume(TokenTypeVariant::Equal)?;
            let expr = self.parse_expr()?;
            return Ok(Statement::SetVar(SetVarStatement { variable, expr }));
        }

        let mut option = vec![self.consume_identifier()?.clone()];
        while (self.check_identifier() && !self.check_statement_word())
            || self.check_token_type(TokenTypeVariant::On)
            || self.check_token_type(TokenTypeVariant::Number)
            || self.check_token_type(TokenTypeVariant::String)
        {
            option.push(self.advance().clone());
        }
        Ok(Statement::SetOption(SetOptionStatement { option }))
    }

    fn check_execute_argument_start(&self) -> bool {
        self.check_token_type(TokenTypeVariant::Variable)
            || self.check_token_type(TokenTypeVariant::Number)
            || self.check_token_type(TokenTypeVariant::String)
            || self.check_token_type(TokenTypeVariant::Null)
            || self.check_token_type(TokenTypeVariant::Default)
            || self.check_token_type(TokenTypeVariant::Minus)
    }

    // execute_statement ->
    // "EXEC" ["Variable" "="] object_name [argument ("," argument)*]
    // | "EXEC" "(" expr ")"
    // where:
    // argument -> ["Variable" "="] expr ["OUTPUT" | "OUT"]
    fn parse_execute_statement(&mut self) -> anyhow::Result<ExecuteStatement> {
        self.consume(TokenTypeVariant::Execute)?;

        if self.match_token_type(TokenTypeVariant::LeftParen) {
            let expr = self.parse_expr()?;
            self.consume(TokenTypeVariant::RightParen)?;
            return Ok(ExecuteStatement {
                return_variable: None,
                target: ExecuteTarget::Dynamic(expr),
            });
        }

        let return_variable = if self.check_token_type(TokenTypeVariant::Variable)
            && self.peek_next_i(1).kind == TokenType::Equal
        {
            let var = self.advance().clone();
            self.advance();
            Some(var)
        } else {
            None
        };

        let name = self.parse_object_name()?;
        let mut arguments = vec![];
        if self.check_execute_argument_start() {
            loop {
                let arg_name = if self.check_token_type(TokenTypeVariant::Variable)
                    && self.peek_next_i(1).kind == TokenType::Equal
                {
                    let var = self.advance().clone();
                    self.advance();
                    Some(var)
                } else {
                    None
                };
                let expr = if self.match_token_type(TokenTypeVariant::Default) {
                    Expr::Default
                } else {
                    self.parse_expr()?
                };
                let output = self.match_non_reserved_keyword("output")
                    || self.match_non_reserved_keyword("out");
                arguments.push(ExecuteArgument {
                    name: arg_name,
                    expr,
                    output,
                });
                if !self.match_token_type(TokenTypeVariant::Comma) {
                    break;
                }
            }
        }

        Ok(ExecuteStatement {
            return_variable,
            target: ExecuteTarget::Procedure { name, arguments },
        })
    }

    // return_statement -> "RETURN" [expr]
    fn parse_return_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Return)?;
        let expr = if self.check_token_type(TokenTypeVariant::Variable)
            || self.check_token_type(TokenTypeVariant::Number)
            || self.check_token_type(TokenTypeVariant::Minus)
            || self.check_token_type(TokenTypeVariant::LeftParen)
        {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Statement::Return(ReturnStatement { expr }))
    }

    // print_statement -> "PRINT" expr ("," expr)*
    fn parse_print_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Print)?;
        let mut exprs = vec![self.parse_expr()?];
        while self.match_token_type(TokenTypeVariant::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(Statement::Print(PrintStatement { exprs }))
    }

    // raiserror_statement -> "RAISERROR" expr [expr] ("," expr)*
    fn parse_raiserror_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Raiserror)?;
        let mut exprs = vec![self.parse_expr()?];
        if self.check_token_type(TokenTypeVariant::String)
            || self.check_token_type(TokenTypeVariant::Variable)
        {
            exprs.push(self.parse_expr()?);
        }
        while self.match_token_type(TokenTypeVariant::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(Statement::Raiserror(RaiserrorStatement { exprs }))
    }

    // create_statement -> create_table_statement | create_index_statement
    fn parse_create_statement(&mut self) -> anyhow::Result<Statement> {
        if self.peek_next_i(1).kind == TokenType::Table {
            self.parse_create_table_statement()
        } else {
            self.parse_create_index_statement()
        }
    }

    // create_table_statement -> "CREATE" "TABLE" table_name "(" table_element ("," table_element)* ")" ["LOCK" lock_scheme]
    // where:
    // table_element -> column_definition | table_constraint
    // column_definition -> column_name data_type [column_constraint]*
    fn parse_create_table_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Create)?;
        self.consume(TokenTypeVariant::Table)?;
        let table = self.parse_table_name()?;

        self.consume(TokenTypeVariant::LeftParen)?;
        let mut columns = vec![];
        loop {
            let is_table_constraint = ["constraint", "primary", "unique", "foreign", "check"]
                .iter()
                .any(|kw| self.check_non_reserved_keyword(kw));
            if is_table_constraint {
                self.skip_table_element()?;
            } else {
                let name = ParseToken::Single(self.consume_identifier()?.clone());
                let data_type = self.parse_data_type()?;
                self.skip_table_element()?;
                columns.push(ColumnDefinition { name, data_type });
            }
            if !self.match_token_type(TokenTypeVariant::Comma) {
                break;
            }
        }
        self.consume(TokenTypeVariant::RightParen)?;

        if self.match_non_reserved_keyword("lock") {
            self.consume_identifier()?;
        }

        Ok(Statement::CreateTable(CreateTableStatement { table, columns }))
    }

    /// Skips column constraints and table constraints, which are not part of the syntax tree.
    fn skip_table_element(&mut self) -> anyhow::Result<()> {
        let mut depth = 0;
        loop {
            match self.peek().kind {
                TokenType::Eof => {
                    return Err(anyhow!(self.error(self.peek(), "Expected `)`.")));
                }
                TokenType::Comma | TokenType::RightParen if depth == 0 => break,
                TokenType::LeftParen => depth += 1,
                TokenType::RightParen => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    // create_index_statement ->
    // "CREATE" ["UNIQUE"] ["CLUSTERED" | "NONCLUSTERED"] "INDEX" name "ON" table_name "(" column ("," column)* ")"
    fn parse_create_index_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Create)?;
        let unique = self.match_non_reserved_keyword("unique");
        let _ = self.match_non_reserved_keyword("clustered")
            || self.match_non_reserved_keyword("nonclustered");
        self.consume_non_reserved_keyword("index")?;
        let name = self.parse_object_name()?;
        self.consume(TokenTypeVariant::On)?;
        let table = self.parse_table_name()?;
        self.consume(TokenTypeVariant::LeftParen)?;
        let mut columns = vec![];
        loop {
            columns.push(ParseToken::Single(self.consume_identifier()?.clone()));
            self.match_token_types(&[TokenTypeVariant::Asc, TokenTypeVariant::Desc]);
            if !self.match_token_type(TokenTypeVariant::Comma) {
                break;
            }
        }
        self.consume(TokenTypeVariant::RightParen)?;
        Ok(Statement::CreateIndex(CreateIndexStatement {
            name,
            unique,
            table,
            columns,
        }))
    }

    // drop_statement ->
    // "DROP" "TABLE" table_name
    // | "DROP" ("PROC" | "PROCEDURE") object_name ("," object_name)*
    fn parse_drop_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Drop)?;
        if self.match_token_type(TokenTypeVariant::Procedure) {
            let mut names = vec![self.parse_object_name()?];
            while self.match_token_type(TokenTypeVariant::Comma) {
                names.push(self.parse_object_name()?);
            }
            return Ok(Statement::DropProcedure(DropProcedureStatement { names }));
        }
        self.consume(TokenTypeVariant::Table)?;
        let table = self.parse_table_name()?;
        Ok(Statement::DropTable(DropTableStatement { table }))
    }

    // grant_statement ->
    // ("GRANT" | "REVOKE") permission ("," permission)* ["ON" object_name] ("TO" | "FROM") name ("," name)*
    // where:
    // permission -> ("ALL" | "EXECUTE" | "SELECT" | "INSERT" | "UPDATE" | "DELETE" | "Identifier")+
    fn parse_grant_statement(&mut self) -> anyhow::Result<Statement> {
        let revoke = self.advance().lexeme.eq_ignore_ascii_case("revoke");

        let mut permissions = vec![];
        while !self.check_token_type(TokenTypeVariant::On)
            && !self.check_token_type(TokenTypeVariant::From)
            && !self.check_non_reserved_keyword("to")
        {
            if self.is_at_end() {
                return Err(anyhow!(self.error(self.peek(), "Expected `TO`.")));
            }
            let tok = self.advance().clone();
            if tok.kind != TokenType::Comma {
                permissions.push(tok);
            }
        }
        if permissions.is_empty() {
            return Err(anyhow!(self.error(self.peek(), "Expected permission.")));
        }

        let object = if self.match_token_type(TokenTypeVariant::On) {
            Some(self.parse_object_name()?)
        } else {
            None
        };

        if !self.match_token_type(TokenTypeVariant::From) {
            self.consume_non_reserved_keyword("to")?;
        }
        let mut grantees = vec![self.parse_object_name()?];
        while self.match_token_type(TokenTypeVariant::Comma) {
            grantees.push(self.parse_object_name()?);
        }

        Ok(Statement::Grant(GrantStatement {
            revoke,
            permissions,
            object,
            grantees,
        }))
    }

    // truncate_statement -> "TRUNCATE" "TABLE" table_name
    fn parse_truncate_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Truncate)?;
        self.consume(TokenTypeVariant::Table)?;
        let table = self.parse_table_name()?;
        Ok(Statement::Truncate(TruncateStatement { table }))
    }

    // insert_statement -> "INSERT" ["INTO"] table_name ["(" column_name ("," column_name)* ")"] input
    // where:
    // input -> "VALUES" "(" expr ("," expr)* ")" ("," "(" expr ("," expr)* ")")* | select | execute_statement
    fn parse_insert_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Insert)?;
        self.match_token_type(TokenTypeVariant::Into);
        let table = self.parse_table_name()?;

        let columns = if self.check_token_type(TokenTypeVariant::LeftParen)
            && self.peek_next_i(1).kind != TokenType::Select
        {
            self.advance();
            let mut columns = vec![];
            loop {
                let column_name = self.consume_identifier()?;
                columns.push(ParseToken::Single(column_name.clone()));
                if !self.match_token_type(TokenTypeVariant::Comma) {
                    break;
                }
            }
            self.consume(TokenTypeVariant::RightParen)?;
            Some(columns)
        } else {
            None
        };

        let source = if self.match_token_type(TokenTypeVariant::Values) {
            let mut rows = vec![];
            loop {
                self.consume(TokenTypeVariant::LeftParen)?;
                let mut values = vec![];
                loop {
                    let expr = if self.match_token_type(TokenTypeVariant::Default) {
                        Expr::Default
                    } else {
                        self.parse_expr()?
                    };
                    values.push(expr);
                    if !self.match_token_type(TokenTypeVariant::Comma) {
                        break;
                    }
                }
                self.consume(TokenTypeVariant::RightParen)?;
                rows.push(values);

                if !self.match_token_type(TokenTypeVariant::Comma) {
                    break;
                }
            }
            InsertSource::Values(rows)
        } else if self.check_token_type(TokenTypeVariant::Execute) {
            InsertSource::Execute(self.parse_execute_statement()?)
        } else if self.match_token_type(TokenTypeVariant::LeftParen) {
            let select = self.parse_select()?;
            self.consume(TokenTypeVariant::RightParen)?;
            InsertSource::Select(Box::new(select))
        } else if self.check_token_type(TokenTypeVariant::Select) {
            InsertSource::Select(Box::new(self.parse_select()?))
        } else {
            return Err(anyhow!(self.error(
                self.peek(),
                "Expected one of: `VALUES`, `SELECT` or `EXECUTE`."
            )));
        };

        Ok(Statement::Insert(InsertStatement {
            table,
            columns,
            source,
        }))
    }

    // update_statement -> "UPDATE" table_name "SET" update_item ("," update_item)* ["FROM" table_join_list] ["WHERE" where_clause]
    // where:
    // update_item -> (column_path | "Variable") "=" expr
    fn parse_update_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Update)?;
        let table = self.parse_table_name()?;
        self.consume(TokenTypeVariant::Set)?;
        let mut update_items = vec![];
        loop {
            let column = if self.check_token_type(TokenTypeVariant::Variable) {
                ParseToken::Single(self.advance().clone())
            } else {
                self.parse_object_name()?
            };
            self.consume(TokenTypeVariant::Equal)?;
            let expr = self.parse_expr()?;
            update_items.push(UpdateItem { column, expr });

            if !self.match_token_type(TokenTypeVariant::Comma) {
                break;
            }
        }

        let from = if self.match_token_type(TokenTypeVariant::From) {
            Some(self.parse_table_join_list()?)
        } else {
            None
        };
        let r#where = self.parse_where_clause()?;

        Ok(Statement::Update(UpdateStatement {
            table,
            update_items,
            from,
            r#where,
        }))
    }

    // delete_statement -> "DELETE" ["FROM"] table_name ["FROM" table_join_list] ["WHERE" where_clause]
    fn parse_delete_statement(&mut self) -> anyhow::Result<Statement> {
        self.consume(TokenTypeVariant::Delete)?;
        self.match_token_type(TokenTypeVariant::From);
        let table = self.parse_table_name()?;
        let from = if self.match_token_type(TokenTypeVariant::From) {
            Some(self.parse_table_join_list()?)
        } else {
            None
        };
        let r#where = self.parse_where_clause()?;
        Ok(Statement::Delete(DeleteStatement {
            table,
            from,
            r#where,
        }))
    }

    // where_clause -> "WHERE" expr
    fn parse_where_clause(&mut self) -> anyhow::Result<Option<WhereClause>> {
        if !self.match_token_type(TokenTypeVariant::Where) {
            return Ok(None);
        }
        let start = self.curr;
        let expr = self.parse_expr()?;
        Ok(Some(WhereClause {
            expr: Box::new(expr),
            text: self.source_text(start),
        }))
    }

    // select ->
    // "SELECT"
    // [("ALL" | "DISTINCT")]
    // ["TOP" "Number"]
    // select_elements
    // ["INTO" table_name]
    // ["FROM" table_join_list]
    // ["WHERE" where_clause]
    // ["GROUP" "BY" expr ("," expr)*]
    // ["HAVING" expr]
    // ["UNION" ["ALL"] select]
    // ["ORDER" "BY" order_by_expr ("," order_by_expr)*]
    pub fn parse_select(&mut self) -> anyhow::Result<SelectStatement> {
        self.consume(TokenTypeVariant::Select)?;

        let distinct = self.match_token_type(TokenTypeVariant::Distinct);
        if !distinct {
            self.match_token_type(TokenTypeVariant::All);
        }
        let top = if self.match_non_reserved_keyword("top") {
            Some(Box::new(self.parse_primary_expr()?))
        } else {
            None
        };

        let select_elements = self.parse_select_elements()?;

        let into = if self.match_token_type(TokenTypeVariant::Into) {
            Some(self.parse_table_name()?)
        } else {
            None
        };

        let from = if self.match_token_type(TokenTypeVariant::From) {
            Some(self.parse_table_join_list()?)
        } else {
            None
        };

        let r#where = self.parse_where_clause()?;

        let group_by = if self.match_token_type(TokenTypeVariant::Group) {
            self.consume(TokenTypeVariant::By)?;
            let mut items = vec![self.parse_expr()?];
            while self.match_token_type(TokenTypeVariant::Comma) {
                items.push(self.parse_expr()?);
            }
            Some(items)
        } else {
            None
        };

        let having = if self.match_token_type(TokenTypeVariant::Having) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };

        let union = if self.match_token_type(TokenTypeVariant::Union) {
            let all = self.match_token_type(TokenTypeVariant::All);
            let select = self.parse_select()?;
            Some(Box::new(Union { all, select }))
        } else {
            None
        };

        let order_by = if self.match_token_type(TokenTypeVariant::Order) {
            self.consume(TokenTypeVariant::By)?;
            Some(self.parse_order_by_expr()?)
        } else {
            None
        };

        Ok(SelectStatement {
            distinct,
            top,
            select_elements,
            into,
            from,
            r#where,
            group_by,
            having,
            union,
            order_by,
        })
    }

    // select_elements -> select_element ("," select_element)*
    fn parse_select_elements(&mut self) -> anyhow::Result<SelectElements> {
        let start = self.curr;
        let mut elements = vec![];
        loop {
            elements.push(self.parse_select_element()?);
            if !self.match_token_type(TokenTypeVariant::Comma) {
                break;
            }
        }
        Ok(SelectElements {
            elements,
            text: self.source_text(start),
        })
    }

    // select_element -> expr [as_alias]
    fn parse_select_element(&mut self) -> anyhow::Result<SelectElement> {
        let expr = self.parse_expr()?;
        let alias = if self.match_token_type(TokenTypeVariant::As) {
            Some(ParseToken::Single(
                self.consume_one_of(&[
                    TokenTypeVariant::Identifier,
                    TokenTypeVariant::QuotedIdentifier,
                    TokenTypeVariant::String,
                ])?
                .clone(),
            ))
        } else if (self.check_identifier() && !self.check_statement_word())
            || self.check_token_type(TokenTypeVariant::String)
        {
            Some(ParseToken::Single(self.advance().clone()))
        } else {
            None
        };
        Ok(SelectElement { expr, alias })
    }

    // order_by_expr -> expr [("ASC" | "DESC")]
    fn parse_order_by_expr(&mut self) -> anyhow::Result<Vec<OrderByExpr>> {
        let mut order_by_exprs = vec![];
        loop {
            let expr = self.parse_expr()?;
            let sort_direction = if self.match_token_type(TokenTypeVariant::Asc) {
                Some(OrderBySortDirection::Asc)
            } else if self.match_token_type(TokenTypeVariant::Desc) {
                Some(OrderBySortDirection::Desc)
            } else {
                None
            };
            order_by_exprs.push(OrderByExpr {
                expr,
                sort_direction,
            });
            if !self.match_token_type(TokenTypeVariant::Comma) {
                break;
            }
        }
        Ok(order_by_exprs)
    }

    // table_join_list -> table_expression (join_op table_expression ["ON" expr])*
    // where:
    // join_op -> "," | ["INNER"] "JOIN" | ("LEFT" | "RIGHT" | "FULL") ["OUTER"] "JOIN" | "CROSS" "JOIN"
    fn parse_table_join_list(&mut self) -> anyhow::Result<TableJoinList> {
        let mut items = vec![JoinItem {
            operator: None,
            table: self.parse_table_expression()?,
            on: None,
        }];

        loop {
            let operator = match self.peek().kind {
                TokenType::Comma => JoinOperator::Comma,
                TokenType::Join | TokenType::Inner => JoinOperator::Inner,
                TokenType::Left => JoinOperator::Left,
                TokenType::Right => JoinOperator::Right,
                TokenType::Full => JoinOperator::Full,
                TokenType::Cross => JoinOperator::Cross,
                _ => break,
            };
            let op_token = self.advance().kind.clone();
            match op_token {
                TokenType::Comma => {}
                TokenType::Join => {}
                TokenType::Inner | TokenType::Cross => {
                    self.consume(TokenTypeVariant::Join)?;
                }
                _ => {
                    self.match_token_type(TokenTypeVariant::Outer);
                    self.consume(TokenTypeVariant::Join)?;
                }
            }

            let table = self.parse_table_expression()?;
            let on = if operator != JoinOperator::Comma
                && operator != JoinOperator::Cross
                && self.match_token_type(TokenTypeVariant::On)
            {
                Some(self.parse_expr()?)
            } else {
                None
            };
            if on.is_none() && !matches!(operator, JoinOperator::Comma | JoinOperator::Cross) {
                return Err(anyhow!(self.error(self.peek(), "Expected `ON`.")));
            }
            items.push(JoinItem {
                operator: Some(operator),
                table,
                on,
            });
        }

        Ok(TableJoinList { items })
    }

    // table_expression -> table_name [as_alias] [table_hints] | "(" select ")" [as_alias]
    fn parse_table_expression(&mut self) -> anyhow::Result<TableExpression> {
        if self.match_token_type(TokenTypeVariant::LeftParen) {
            let query = self.parse_select()?;
            self.consume(TokenTypeVariant::RightParen)?;
            let alias = self.parse_as_alias()?;
            return Ok(TableExpression::Derived(DerivedTableExpr {
                query: Box::new(query),
                alias,
            }));
        }

        let name = self.parse_table_name()?;
        let alias = self.parse_as_alias()?;
        let hints = self.parse_table_hints()?;
        Ok(TableExpression::Table(TableReferenceExpr { name, alias, hints }))
    }

    // table_hints -> ("HOLDLOCK" | "NOHOLDLOCK" | ...)* ["WITH"] ["(" hint ("," hint)* ")"]
    // where:
    // hint -> ("INDEX" name | "Identifier" | "Number")+
    fn parse_table_hints(&mut self) -> anyhow::Result<Vec<Token>> {
        let mut hints = vec![];
        loop {
            if TABLE_HINTS.iter().any(|hint| self.check_non_reserved_keyword(hint)) {
                hints.push(self.advance().clone());
                continue;
            }
            let with_parens = self.check_non_reserved_keyword("with")
                && self.peek_next_i(1).kind == TokenType::LeftParen;
            if with_parens {
                self.advance();
            }
            if self.check_token_type(TokenTypeVariant::LeftParen)
                && (with_parens
                    || matches!(self.peek_next_i(1).kind, TokenType::Identifier(_)))
            {
                self.advance();
                loop {
                    if self.match_token_type(TokenTypeVariant::RightParen) {
                        break;
                    }
                    if self.is_at_end() {
                        return Err(anyhow!(self.error(self.peek(), "Expected `)`.")));
                    }
                    let tok = self.advance().clone();
                    if tok.kind != TokenType::Comma {
                        hints.push(tok);
                    }
                }
                continue;
            }
            break;
        }
        Ok(hints)
    }

    // as_alias -> ["AS"] ("Identifier" | "QuotedIdentifier")
    fn parse_as_alias(&mut self) -> anyhow::Result<Option<ParseToken>> {
        if self.match_token_type(TokenTypeVariant::As) {
            return Ok(Some(ParseToken::Single(self.consume_identifier()?.clone())));
        }
        let is_keyword_like = self.check_statement_word()
            || self.check_non_reserved_keyword("with")
            || TABLE_HINTS.iter().any(|hint| self.check_non_reserved_keyword(hint));
        if self.check_identifier() && !is_keyword_like {
            return Ok(Some(ParseToken::Single(self.advance().clone())));
        }
        Ok(None)
    }

    // table_name -> ["#"] object_name
    fn parse_table_name(&mut self) -> anyhow::Result<TableName> {
        let temp_marker = if self.match_token_type(TokenTypeVariant::Hash) {
            Some(self.peek_prev().clone())
        } else {
            None
        };
        let identifier = self.parse_object_name()?;
        Ok(TableName {
            temp_marker,
            identifier,
        })
    }

    // object_name -> identifier ("." [identifier])*
    // An empty part stands for the default owner: `db..table`.
    fn parse_object_name(&mut self) -> anyhow::Result<ParseToken> {
        let first = self.consume_identifier()?.clone();
        if !self.check_token_type(TokenTypeVariant::Dot) {
            return Ok(ParseToken::Single(first));
        }

        let mut parts = vec![first];
        while self.match_token_type(TokenTypeVariant::Dot) {
            parts.push(self.peek_prev().clone());
            if self.check_token_type(TokenTypeVariant::Dot) {
                continue;
            }
            parts.push(self.consume_identifier()?.clone());
        }
        Ok(ParseToken::Multiple(parts))
    }

    pub fn parse_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_or_expr()
    }

    /// Util function to parse a standard binary rule expression of kind
    ///
    /// `parse_rule -> parse_rule | next_parsing_rule ("T1" | "T2" | ... next_parsing_rule)*`
    fn parse_standard_binary_expr(
        &mut self,
        token_types_to_match: &[TokenTypeVariant],
        next_parsing_rule_fn: impl Fn(&mut Self) -> anyhow::Result<Expr>,
    ) -> anyhow::Result<Expr> {
        let mut output = next_parsing_rule_fn(self)?;

        while self.match_token_types(token_types_to_match) {
            let operator = self.peek_prev().clone();
            let right = next_parsing_rule_fn(self)?;
            output = Expr::Binary(BinaryExpr {
                left: Box::new(output),
                operator: ParseToken::Single(operator),
                right: Box::new(right),
            });
        }

        Ok(output)
    }

    // or_expr -> and_expr ("OR" and_expr)*
    fn parse_or_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(&[TokenTypeVariant::Or], Self::parse_and_expr)
    }

    // and_expr -> not_expr ("AND" not_expr)*
    fn parse_and_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(&[TokenTypeVariant::And], Self::parse_not_expr)
    }

    // not_expr -> "NOT" not_expr | comparison_expr
    fn parse_not_expr(&mut self) -> anyhow::Result<Expr> {
        if self.match_token_type(TokenTypeVariant::Not) {
            let operator = self.peek_prev().clone();
            return Ok(Expr::Unary(UnaryExpr {
                operator: ParseToken::Single(operator),
                right: Box::new(self.parse_not_expr()?),
            }));
        }
        self.parse_comparison_expr()
    }

    // comparison_expr ->
    // add_expr
    // | add_expr (("=" | ">" | "<" | ">=" | "<=" | "!=" | "<>" | "!<" | "!>" | "*=" | "=*") add_expr)*
    // | add_expr "IS" ["NOT"] "NULL"
    // | add_expr ["NOT"] "IN" "(" (select | expr ("," expr)*) ")"
    // | add_expr ["NOT"] "BETWEEN" add_expr "AND" add_expr
    // | add_expr ["NOT"] "LIKE" add_expr
    fn parse_comparison_expr(&mut self) -> anyhow::Result<Expr> {
        let mut output = self.parse_add_expr()?;

        loop {
            let curr_token = self.peek().clone();
            match curr_token.kind {
                TokenType::Equal
                | TokenType::Greater
                | TokenType::Less
                | TokenType::GreaterEqual
                | TokenType::LessEqual
                | TokenType::BangEqual
                | TokenType::NotEqual
                | TokenType::NotLess
                | TokenType::NotGreater
                | TokenType::StarEqual
                | TokenType::EqualStar
                | TokenType::Like => {
                    self.advance();
                    let right = self.parse_add_expr()?;
                    output = Expr::Binary(BinaryExpr {
                        left: Box::new(output),
                        operator: ParseToken::Single(curr_token),
                        right: Box::new(right),
                    })
                }
                TokenType::Is => {
                    self.advance();
                    let negated = self.match_token_type(TokenTypeVariant::Not);
                    self.consume(TokenTypeVariant::Null)?;
                    output = Expr::IsNull(IsNullExpr {
                        expr: Box::new(output),
                        negated,
                    })
                }
                TokenType::In => {
                    self.advance();
                    output = self.parse_in_expr(output, false)?;
                }
                TokenType::Between => {
                    self.advance();
                    output = self.parse_between_expr(output, false)?;
                }
                TokenType::Not => {
                    let mut parse_tokens = vec![curr_token];
                    self.advance();
                    let op = self
                        .consume_one_of(&[
                            TokenTypeVariant::In,
                            TokenTypeVariant::Between,
                            TokenTypeVariant::Like,
                        ])?
                        .clone();
                    match op.kind {
                        TokenType::In => output = self.parse_in_expr(output, true)?,
                        TokenType::Between => output = self.parse_between_expr(output, true)?,
                        _ => {
                            parse_tokens.push(op);
                            let right = self.parse_add_expr()?;
                            output = Expr::Binary(BinaryExpr {
                                left: Box::new(output),
                                operator: ParseToken::Multiple(parse_tokens),
                                right: Box::new(right),
                            })
                        }
                    }
                }
                _ => {
                    break;
                }
            }
        }
        Ok(output)
    }

    fn parse_in_expr(&mut self, expr: Expr, negated: bool) -> anyhow::Result<Expr> {
        self.consume(TokenTypeVariant::LeftParen)?;
        let list = if self.check_token_type(TokenTypeVariant::Select) {
            InList::Subquery(Box::new(self.parse_select()?))
        } else {
            let mut exprs = vec![self.parse_expr()?];
            while self.match_token_type(TokenTypeVariant::Comma) {
                exprs.push(self.parse_expr()?);
            }
            InList::Exprs(exprs)
        };
        self.consume(TokenTypeVariant::RightParen)?;
        Ok(Expr::In(InExpr {
            expr: Box::new(expr),
            negated,
            list,
        }))
    }

    fn parse_between_expr(&mut self, expr: Expr, negated: bool) -> anyhow::Result<Expr> {
        let low = self.parse_add_expr()?;
        self.consume(TokenTypeVariant::And)?;
        let high = self.parse_add_expr()?;
        Ok(Expr::Between(BetweenExpr {
            expr: Box::new(expr),
            negated,
            low: Box::new(low),
            high: Box::new(high),
        }))
    }

    // add_expr -> mul_expr (("+" | "-" | "||" | "&" | "|" | "^") mul_expr)*
    fn parse_add_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(
            &[
                TokenTypeVariant::Plus,
                TokenTypeVariant::Minus,
                TokenTypeVariant::ConcatOperator,
                TokenTypeVariant::BitwiseAnd,
                TokenTypeVariant::BitwiseOr,
                TokenTypeVariant::BitwiseXor,
            ],
            Self::parse_mul_expr,
        )
    }

    // mul_expr -> unary_expr (("*" | "/" | "%") unary_expr)*
    fn parse_mul_expr(&mut self) -> anyhow::Result<Expr> {
        self.parse_standard_binary_expr(
            &[
                TokenTypeVariant::Star,
                TokenTypeVariant::Slash,
                TokenTypeVariant::Percent,
            ],
            Self::parse_unary_expr,
        )
    }

    // unary_expr -> ("-" | "+" | "~") unary_expr | primary_expr
    fn parse_unary_expr(&mut self) -> anyhow::Result<Expr> {
        if self.match_token_types(&[
            TokenTypeVariant::Minus,
            TokenTypeVariant::Plus,
            TokenTypeVariant::BitwiseNot,
        ]) {
            let operator = self.peek_prev().clone();
            let right = self.parse_unary_expr()?;
            return Ok(Expr::Unary(UnaryExpr {
                operator: ParseToken::Single(operator),
                right: Box::new(right),
            }));
        }
        self.parse_primary_expr()
    }

    // case_expr -> "CASE" [expr] ("WHEN" expr "THEN" expr)+ ["ELSE" expr] "END"
    fn parse_case_expr(&mut self) -> anyhow::Result<Expr> {
        self.consume(TokenTypeVariant::Case)?;

        let case = if self.check_token_type(TokenTypeVariant::When) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };

        let mut when_thens = vec![];
        loop {
            self.consume(TokenTypeVariant::When)?;
            let when_expr = self.parse_expr()?;
            self.consume(TokenTypeVariant::Then)?;
            let then_expr = self.parse_expr()?;
            when_thens.push((when_expr, then_expr));

            if !self.check_token_type(TokenTypeVariant::When) {
                break;
            }
        }

        let r#else = if self.match_token_type(TokenTypeVariant::Else) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.consume(TokenTypeVariant::End)?;

        Ok(Expr::Case(CaseExpr {
            case,
            when_thens,
            r#else,
        }))
    }

    // function_expr -> name "(" [["DISTINCT"] expr ("," expr)*] ")" | "CAST" "(" expr "AS" data_type ")"
    fn parse_function_expr(&mut self, name: ParseToken) -> anyhow::Result<Expr> {
        self.consume(TokenTypeVariant::LeftParen)?;

        if name.identifier().eq_ignore_ascii_case("cast") {
            let expr = self.parse_expr()?;
            self.consume(TokenTypeVariant::As)?;
            let data_type = self.parse_data_type()?;
            self.consume(TokenTypeVariant::RightParen)?;
            return Ok(Expr::Cast(CastExpr {
                expr: Box::new(expr),
                data_type,
            }));
        }

        let distinct = self.match_token_type(TokenTypeVariant::Distinct);
        let mut arguments = vec![];
        if !self.check_token_type(TokenTypeVariant::RightParen) {
            loop {
                arguments.push(self.parse_expr()?);
                if !self.match_token_type(TokenTypeVariant::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenTypeVariant::RightParen)?;
        Ok(Expr::Function(FunctionExpr {
            name,
            distinct,
            arguments,
        }))
    }

    // column_expr -> object_name ["." "*"] | object_name function_expr
    fn parse_column_expr(&mut self) -> anyhow::Result<Expr> {
        let mut parts = vec![self.consume_identifier()?.clone()];
        while self.check_token_type(TokenTypeVariant::Dot) {
            let next = &self.peek_next_i(1).kind;
            if *next == TokenType::Star {
                self.advance();
                self.advance();
                return Ok(Expr::QualifiedStar(ParseToken::Multiple(parts)));
            }
            if !matches!(
                next,
                TokenType::Identifier(_) | TokenType::QuotedIdentifier(_) | TokenType::Dot
            ) {
                break;
            }
            parts.push(self.advance().clone());
            if !self.check_token_type(TokenTypeVariant::Dot) {
                parts.push(self.consume_identifier()?.clone());
            }
        }

        let name = if parts.len() == 1 {
            ParseToken::Single(parts.remove(0))
        } else {
            ParseToken::Multiple(parts)
        };

        if self.check_token_type(TokenTypeVariant::LeftParen) {
            return self.parse_function_expr(name);
        }
        Ok(Expr::Column(name))
    }

    // primary_expr ->
    // "Number" | "String" | "NULL" | "Variable" | "*"
    // | column_expr
    // | ("LEFT" | "RIGHT") function_expr
    // | "EXISTS" "(" select ")"
    // | case_expr
    // | "(" select ")"
    // | "(" expr ")"
    fn parse_primary_expr(&mut self) -> anyhow::Result<Expr> {
        let peek_token = self.peek().clone();
        let primary_expr = match peek_token.kind {
            TokenType::Number(num) => {
                self.advance();
                Expr::Number(num)
            }
            TokenType::String(string) => {
                self.advance();
                Expr::String(string)
            }
            TokenType::Null => {
                self.advance();
                Expr::Null
            }
            TokenType::Variable(var) => {
                self.advance();
                Expr::Variable(var)
            }
            TokenType::Star => {
                self.advance();
                Expr::Star
            }
            TokenType::Identifier(_) | TokenType::QuotedIdentifier(_) => {
                self.parse_column_expr()?
            }
            // Functions whose name is a reserved keyword
            TokenType::Left | TokenType::Right
                if self.peek_next_i(1).kind == TokenType::LeftParen =>
            {
                let name = ParseToken::Single(self.advance().clone());
                self.parse_function_expr(name)?
            }
            TokenType::Exists => {
                self.advance();
                self.consume(TokenTypeVariant::LeftParen)?;
                let query = self.parse_select()?;
                self.consume(TokenTypeVariant::RightParen)?;
                Expr::Exists(Box::new(query))
            }
            TokenType::Case => self.parse_case_expr()?,
            TokenType::LeftParen => {
                self.advance();
                if self.check_token_type(TokenTypeVariant::Select) {
                    let query = self.parse_select()?;
                    self.consume(TokenTypeVariant::RightParen)?;
                    Expr::Subquery(Box::new(query))
                } else {
                    let expr = self.parse_expr()?;
                    self.consume(TokenTypeVariant::RightParen)?;
                    Expr::Grouping(GroupingExpr {
                        expr: Box::new(expr),
                    })
                }
            }
            _ => {
                return Err(anyhow!(self.error(&peek_token, "Expected Expression.")));
            }
        };

        Ok(primary_expr)
    }
}

pub fn parse_sql(sql: &str) -> anyhow::Result<Ast> {
    log::debug!(
        "Parsing {}",
        sql.chars().take(50).collect::<String>()
    );

    let mut scanner = Scanner::new(sql);

    scanner.scan()?;

    log::debug!("Tokens:");
    scanner
        .tokens()
        .iter()
        .for_each(|tok| log::debug!("{:?}", tok));

    let mut parser = Parser::new(sql, scanner.tokens());
    let ast = parser.parse()?;
    log::debug!("Parsed {} batches.", ast.batches.len());
    log::debug!("AST: {:?}", ast);
    Ok(ast)
}
