use serde::{Deserialize, Serialize};
use strum_macros::EnumDiscriminants;

/// Root of a parsed script: the batches separated by `GO`, in source order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ast {
    pub batches: Vec<Batch>,
}

/// A `CREATE PROCEDURE` must be alone in its batch, so a batch is either a procedure
/// definition or a list of plain statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Batch {
    Procedure(ProcedureDefinition),
    Statements(Vec<Statement>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureDefinition {
    pub name: ParseToken,
    pub number: Option<String>,
    pub parameter_list: Option<ParameterList>,
    pub recompile: bool,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterList {
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub variable: Token,
    pub data_type: DataType,
    pub default: Option<Expr>,
    pub output: bool,
}

/// A declared data type, e.g. `int`, `varchar(20)` or `numeric(10, 2)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataType {
    pub name: ParseToken,
    pub arguments: Vec<String>,
    /// Verbatim source text of the type.
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateTable(CreateTableStatement),
    CreateIndex(CreateIndexStatement),
    DropTable(DropTableStatement),
    DropProcedure(DropProcedureStatement),
    Truncate(TruncateStatement),
    Block(StatementsBlock),
    If(IfStatement),
    While(WhileStatement),
    Declare(DeclareStatement),
    DeclareCursor(DeclareCursorStatement),
    Cursor(CursorStatement),
    SetVar(SetVarStatement),
    SetOption(SetOptionStatement),
    Execute(ExecuteStatement),
    Return(ReturnStatement),
    Print(PrintStatement),
    Raiserror(RaiserrorStatement),
    BeginTransaction(TransactionStatement),
    CommitTransaction(TransactionStatement),
    RollbackTransaction(TransactionStatement),
    Grant(GrantStatement),
    Use(ParseToken),
    Break,
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementsBlock {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStatement {
    pub condition: Expr,
    pub then: Box<Statement>,
    pub r#else: Option<Box<Statement>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhileStatement {
    pub condition: Expr,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclareStatement {
    pub variables: Vec<DeclareVariable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclareVariable {
    pub variable: Token,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclareCursorStatement {
    pub name: ParseToken,
    pub query: SelectStatement,
    pub for_update: Option<Vec<ParseToken>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CursorStatement {
    Open(ParseToken),
    Fetch {
        name: ParseToken,
        into: Vec<Token>,
    },
    Close(ParseToken),
    Deallocate(ParseToken),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetVarStatement {
    pub variable: Token,
    pub expr: Expr,
}

/// Session options such as `SET NOCOUNT ON` or `SET ROWCOUNT 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOptionStatement {
    pub option: Vec<Token>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteStatement {
    pub return_variable: Option<Token>,
    pub target: ExecuteTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecuteTarget {
    Procedure {
        name: ParseToken,
        arguments: Vec<ExecuteArgument>,
    },
    Dynamic(Expr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteArgument {
    pub name: Option<Token>,
    pub expr: Expr,
    pub output: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStatement {
    pub expr: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintStatement {
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaiserrorStatement {
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatement {
    pub name: Option<ParseToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectStatement {
    pub distinct: bool,
    pub top: Option<Box<Expr>>,
    pub select_elements: SelectElements,
    pub into: Option<TableName>,
    pub from: Option<TableJoinList>,
    pub r#where: Option<WhereClause>,
    pub group_by: Option<Vec<Expr>>,
    pub having: Option<Box<Expr>>,
    pub union: Option<Box<Union>>,
    pub order_by: Option<Vec<OrderByExpr>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectElements {
    pub elements: Vec<SelectElement>,
    /// Verbatim source text of the whole select list.
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectElement {
    pub expr: Expr,
    pub alias: Option<ParseToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Union {
    pub all: bool,
    pub select: SelectStatement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub sort_direction: Option<OrderBySortDirection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderBySortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub expr: Box<Expr>,
    /// Verbatim source text of the condition, without the `WHERE` keyword.
    pub text: String,
}

/// Elements of a `FROM` clause, in source order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableJoinList {
    pub items: Vec<JoinItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinItem {
    /// `None` for the first element of the list.
    pub operator: Option<JoinOperator>,
    pub table: TableExpression,
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinOperator {
    Comma,
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TableExpression {
    Table(TableReferenceExpr),
    Derived(DerivedTableExpr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReferenceExpr {
    pub name: TableName,
    pub alias: Option<ParseToken>,
    pub hints: Vec<Token>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedTableExpr {
    pub query: Box<SelectStatement>,
    pub alias: Option<ParseToken>,
}

/// A table name as written in the source. `temp_marker` holds the `#` (or `##` for global) token
/// of temporary tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableName {
    pub temp_marker: Option<Token>,
    pub identifier: ParseToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: TableName,
    pub columns: Option<Vec<ParseToken>>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Select(Box<SelectStatement>),
    Execute(ExecuteStatement),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItem {
    pub column: ParseToken,
    pub expr: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub table: TableName,
    pub update_items: Vec<UpdateItem>,
    pub from: Option<TableJoinList>,
    pub r#where: Option<WhereClause>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub table: TableName,
    pub from: Option<TableJoinList>,
    pub r#where: Option<WhereClause>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTableStatement {
    pub table: TableName,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: ParseToken,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIndexStatement {
    pub name: ParseToken,
    pub unique: bool,
    pub table: TableName,
    pub columns: Vec<ParseToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropTableStatement {
    pub table: TableName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropProcedureStatement {
    pub names: Vec<ParseToken>,
}

/// `GRANT` or `REVOKE` of permissions, usually found after a procedure in deploy scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantStatement {
    pub revoke: bool,
    pub permissions: Vec<Token>,
    pub object: Option<ParseToken>,
    pub grantees: Vec<ParseToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncateStatement {
    pub table: TableName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Grouping(GroupingExpr),
    Column(ParseToken),
    /// `alias.*`
    QualifiedStar(ParseToken),
    Variable(String),
    String(String),
    Number(String),
    Null,
    Default,
    Star,
    In(InExpr),
    Between(BetweenExpr),
    IsNull(IsNullExpr),
    Exists(Box<SelectStatement>),
    Subquery(Box<SelectStatement>),
    Case(CaseExpr),
    Cast(CastExpr),
    Function(FunctionExpr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: ParseToken,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub operator: ParseToken,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingExpr {
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InExpr {
    pub expr: Box<Expr>,
    pub negated: bool,
    pub list: InList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InList {
    Exprs(Vec<Expr>),
    Subquery(Box<SelectStatement>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetweenExpr {
    pub expr: Box<Expr>,
    pub negated: bool,
    pub low: Box<Expr>,
    pub high: Box<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsNullExpr {
    pub expr: Box<Expr>,
    pub negated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseExpr {
    pub case: Option<Box<Expr>>,
    pub when_thens: Vec<(Expr, Expr)>,
    pub r#else: Option<Box<Expr>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastExpr {
    pub expr: Box<Expr>,
    pub data_type: DataType,
}

/// Function call. Functions are not resolved, so every call shares this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionExpr {
    pub name: ParseToken,
    pub distinct: bool,
    pub arguments: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParseToken {
    Single(Token),
    Multiple(Vec<Token>),
}

impl ParseToken {
    /// Identifier value with bracket quoting removed. Dots of a qualified name are kept as
    /// written, so `db..Orders` stays `db..Orders`.
    pub fn identifier(&self) -> String {
        let token_identifier = |tok: &Token| match &tok.kind {
            TokenType::Identifier(ident) => ident.to_owned(),
            TokenType::QuotedIdentifier(qident) => qident.to_owned(),
            _ => tok.lexeme.to_owned(),
        };
        match self {
            ParseToken::Single(token) => token_identifier(token),
            ParseToken::Multiple(vec) => vec
                .iter()
                .map(token_identifier)
                .collect::<Vec<String>>()
                .join(""),
        }
    }
}

#[derive(PartialEq, Clone, Debug, EnumDiscriminants, Serialize, Deserialize)]
#[strum_discriminants(name(TokenTypeVariant))]
pub enum TokenType {
    LeftParen,
    RightParen,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Minus,
    Plus,
    Star,
    Slash,
    Percent,
    BitwiseNot,
    BitwiseOr,
    BitwiseAnd,
    BitwiseXor,
    ConcatOperator,
    Equal,
    NotEqual,
    BangEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    NotLess,
    NotGreater,
    StarEqual,
    EqualStar,
    Hash,
    QuotedIdentifier(String),
    Identifier(String),
    Variable(String),
    String(String),
    Number(String),
    Eof,

    // Reserved Keywords
    All,
    And,
    As,
    Asc,
    Begin,
    Between,
    Break,
    By,
    Case,
    Close,
    Commit,
    Continue,
    Create,
    Cross,
    Deallocate,
    Declare,
    Default,
    Delete,
    Desc,
    Distinct,
    Drop,
    Else,
    End,
    Execute,
    Exists,
    Fetch,
    For,
    From,
    Full,
    Group,
    Having,
    If,
    In,
    Inner,
    Insert,
    Into,
    Is,
    Join,
    Left,
    Like,
    Not,
    Null,
    On,
    Open,
    Or,
    Order,
    Outer,
    Print,
    Procedure,
    Raiserror,
    Return,
    Right,
    Rollback,
    Select,
    Set,
    Table,
    Then,
    Truncate,
    Union,
    Update,
    Values,
    When,
    Where,
    While,
}

impl TokenTypeVariant {
    pub(crate) fn variant_str(&self) -> &str {
        match self {
            TokenTypeVariant::LeftParen => "(",
            TokenTypeVariant::RightParen => ")",
            TokenTypeVariant::Comma => ",",
            TokenTypeVariant::Dot => ".",
            TokenTypeVariant::Colon => ":",
            TokenTypeVariant::Semicolon => ";",
            TokenTypeVariant::Minus => "-",
            TokenTypeVariant::Plus => "+",
            TokenTypeVariant::Star => "*",
            TokenTypeVariant::Slash => "/",
            TokenTypeVariant::Percent => "%",
            TokenTypeVariant::BitwiseNot => "~",
            TokenTypeVariant::BitwiseOr => "|",
            TokenTypeVariant::BitwiseAnd => "&",
            TokenTypeVariant::BitwiseXor => "^",
            TokenTypeVariant::ConcatOperator => "||",
            TokenTypeVariant::Equal => "=",
            TokenTypeVariant::NotEqual => "<>",
            TokenTypeVariant::BangEqual => "!=",
            TokenTypeVariant::Greater => ">",
            TokenTypeVariant::GreaterEqual => ">=",
            TokenTypeVariant::Less => "<",
            TokenTypeVariant::LessEqual => "<=",
            TokenTypeVariant::NotLess => "!<",
            TokenTypeVariant::NotGreater => "!>",
            TokenTypeVariant::StarEqual => "*=",
            TokenTypeVariant::EqualStar => "=*",
            TokenTypeVariant::Hash => "#",
            TokenTypeVariant::QuotedIdentifier => "QuotedIdentifier",
            TokenTypeVariant::Identifier => "Identifier",
            TokenTypeVariant::Variable => "Variable",
            TokenTypeVariant::String => "String",
            TokenTypeVariant::Number => "Number",
            TokenTypeVariant::Eof => "EOF",

            // Reserved Keywords
            TokenTypeVariant::All => "ALL",
            TokenTypeVariant::And => "AND",
            TokenTypeVariant::As => "AS",
            TokenTypeVariant::Asc => "ASC",
            TokenTypeVariant::Begin => "BEGIN",
            TokenTypeVariant::Between => "BETWEEN",
            TokenTypeVariant::Break => "BREAK",
            TokenTypeVariant::By => "BY",
            TokenTypeVariant::Case => "CASE",
            TokenTypeVariant::Close => "CLOSE",
            TokenTypeVariant::Commit => "COMMIT",
            TokenTypeVariant::Continue => "CONTINUE",
            TokenTypeVariant::Create => "CREATE",
            TokenTypeVariant::Cross => "CROSS",
            TokenTypeVariant::Deallocate => "DEALLOCATE",
            TokenTypeVariant::Declare => "DECLARE",
            TokenTypeVariant::Default => "DEFAULT",
            TokenTypeVariant::Delete => "DELETE",
            TokenTypeVariant::Desc => "DESC",
            TokenTypeVariant::Distinct => "DISTINCT",
            TokenTypeVariant::Drop => "DROP",
            TokenTypeVariant::Else => "ELSE",
            TokenTypeVariant::End => "END",
            TokenTypeVariant::Execute => "EXECUTE",
            TokenTypeVariant::Exists => "EXISTS",
            TokenTypeVariant::Fetch => "FETCH",
            TokenTypeVariant::For => "FOR",
            TokenTypeVariant::From => "FROM",
            TokenTypeVariant::Full => "FULL",
            TokenTypeVariant::Group => "GROUP",
            TokenTypeVariant::Having => "HAVING",
            TokenTypeVariant::If => "IF",
            TokenTypeVariant::In => "IN",
            TokenTypeVariant::Inner => "INNER",
            TokenTypeVariant::Insert => "INSERT",
            TokenTypeVariant::Into => "INTO",
            TokenTypeVariant::Is => "IS",
            TokenTypeVariant::Join => "JOIN",
            TokenTypeVariant::Left => "LEFT",
            TokenTypeVariant::Like => "LIKE",
            TokenTypeVariant::Not => "NOT",
            TokenTypeVariant::Null => "NULL",
            TokenTypeVariant::On => "ON",
            TokenTypeVariant::Open => "OPEN",
            TokenTypeVariant::Or => "OR",
            TokenTypeVariant::Order => "ORDER",
            TokenTypeVariant::Outer => "OUTER",
            TokenTypeVariant::Print => "PRINT",
            TokenTypeVariant::Procedure => "PROCEDURE",
            TokenTypeVariant::Raiserror => "RAISERROR",
            TokenTypeVariant::Return => "RETURN",
            TokenTypeVariant::Right => "RIGHT",
            TokenTypeVariant::Rollback => "ROLLBACK",
            TokenTypeVariant::Select => "SELECT",
            TokenTypeVariant::Set => "SET",
            TokenTypeVariant::Table => "TABLE",
            TokenTypeVariant::Then => "THEN",
            TokenTypeVariant::Truncate => "TRUNCATE",
            TokenTypeVariant::Union => "UNION",
            TokenTypeVariant::Update => "UPDATE",
            TokenTypeVariant::Values => "VALUES",
            TokenTypeVariant::When => "WHEN",
            TokenTypeVariant::Where => "WHERE",
            TokenTypeVariant::While => "WHILE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenType,
    pub lexeme: String,
    pub line: u32,
    pub col: u32,
    /// Char offset of the first character of the token in the source.
    pub start: usize,
    /// Char offset one past the last character of the token in the source.
    pub end: usize,
}
