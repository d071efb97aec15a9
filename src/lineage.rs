use std::fmt::Display;

use indexmap::IndexSet;
use serde::{Serialize, Serializer};

use crate::ast::{
    Ast, Batch, CreateTableStatement, DeleteStatement, ExecuteStatement, ExecuteTarget, Expr,
    InList, InsertSource, InsertStatement, ProcedureDefinition, SelectStatement, Statement,
    TableExpression, TableJoinList, TableName, UpdateStatement,
};

/// A DML/DDL operation found in the procedure body, rendered as `"<KIND> <table>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    InsertInto(String),
    Update(String),
    DeleteFrom(String),
    CreateTable(String),
}

impl Operation {
    pub fn table(&self) -> &str {
        match self {
            Operation::InsertInto(table)
            | Operation::Update(table)
            | Operation::DeleteFrom(table)
            | Operation::CreateTable(table) => table,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Operation::InsertInto(_) => "INSERT INTO",
            Operation::Update(_) => "UPDATE",
            Operation::DeleteFrom(_) => "DELETE FROM",
            Operation::CreateTable(_) => "CREATE TABLE",
        };
        write!(f, "{} {}", kind, self.table())
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputParameter {
    pub name: String,
    /// Declared type as written, e.g. `varchar(20)`.
    pub data_type: String,
}

impl Display for InputParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)
    }
}

/// Lineage facts collected from a single script: its procedure and the batches around it.
///
/// Table sets keep insertion order for output but compare as sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineageReport {
    source_tables: IndexSet<String>,
    temp_tables: IndexSet<String>,
    fields: Vec<String>,
    criteria: Vec<String>,
    operations: Vec<Operation>,
    input_parameters: Vec<InputParameter>,
}

impl LineageReport {
    pub fn source_tables(&self) -> &IndexSet<String> {
        &self.source_tables
    }

    pub fn temp_tables(&self) -> &IndexSet<String> {
        &self.temp_tables
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn criteria(&self) -> &[String] {
        &self.criteria
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn input_parameters(&self) -> &[InputParameter] {
        &self.input_parameters
    }
}

fn join_display<T: Display>(items: impl Iterator<Item = T>) -> String {
    items
        .map(|item| item.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

impl Display for LineageReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Source Tables: {{{}}}",
            join_display(self.source_tables.iter())
        )?;
        writeln!(
            f,
            "Temporary Tables: {{{}}}",
            join_display(self.temp_tables.iter())
        )?;
        writeln!(f, "Fields/Columns Used: [{}]", join_display(self.fields.iter()))?;
        writeln!(
            f,
            "Criteria (WHERE conditions): [{}]",
            join_display(self.criteria.iter())
        )?;
        writeln!(f, "Operations: [{}]", join_display(self.operations.iter()))?;
        write!(
            f,
            "Input Parameters: [{}]",
            join_display(self.input_parameters.iter())
        )
    }
}

/// Rendered name of a table reference and whether it is a temporary (`#` or `##`) table.
fn table_reference(table_name: &TableName) -> (String, bool) {
    let identifier = table_name.identifier.identifier();
    match &table_name.temp_marker {
        Some(marker) => (format!("{}{}", marker.lexeme, identifier), true),
        None => (identifier, false),
    }
}

/// The table an `UPDATE`/`DELETE` target stands for: when the target is an alias declared in
/// the statement's own `FROM` list, the aliased table, otherwise the target itself.
fn dml_target<'a>(target: &'a TableName, from: Option<&'a TableJoinList>) -> &'a TableName {
    if target.temp_marker.is_some() {
        return target;
    }
    let target_name = target.identifier.identifier();
    from.into_iter()
        .flat_map(|join_list| join_list.items.iter())
        .find_map(|item| match &item.table {
            TableExpression::Table(table_ref)
                if table_ref
                    .alias
                    .as_ref()
                    .is_some_and(|alias| alias.identifier() == target_name) =>
            {
                Some(&table_ref.name)
            }
            _ => None,
        })
        .unwrap_or(target)
}

/// Walks a syntax tree top-down, recording lineage facts on entry of each node and then
/// descending into its children in source order.
#[derive(Debug, Default)]
struct LineageCollector {
    report: LineageReport,
}

impl LineageCollector {
    /// Classifies the table and returns its rendered name.
    fn add_table(&mut self, table_name: &TableName) -> String {
        let (name, is_temp) = table_reference(table_name);
        if is_temp {
            log::debug!("Found temporary table `{}`.", name);
            self.report.temp_tables.insert(name.clone());
        } else {
            log::debug!("Found source table `{}`.", name);
            self.report.source_tables.insert(name.clone());
        }
        name
    }

    fn add_operation(&mut self, operation: Operation) {
        log::debug!("Found operation `{}`.", operation);
        self.report.operations.push(operation);
    }

    fn add_criteria(&mut self, criteria: &str) {
        self.report.criteria.push(criteria.to_owned());
    }

    /// Adds the tables directly referenced by a join list.
    fn join_list_tables_lin(&mut self, join_list: &TableJoinList) {
        for item in &join_list.items {
            match &item.table {
                TableExpression::Table(table_ref) => {
                    self.add_table(&table_ref.name);
                }
                // Derived tables are not resolved to their base tables here.
                // Their query is visited as a child of the join list.
                TableExpression::Derived(_) => {}
            }
        }
    }

    fn join_list_children_lin(&mut self, join_list: &TableJoinList) {
        for item in &join_list.items {
            if let TableExpression::Derived(derived) = &item.table {
                self.select_lin(&derived.query);
            }
            if let Some(on) = &item.on {
                self.expr_lin(on);
            }
        }
    }

    fn procedure_lin(&mut self, procedure: &ProcedureDefinition) {
        if let Some(parameter_list) = &procedure.parameter_list {
            for parameter in &parameter_list.parameters {
                self.report.input_parameters.push(InputParameter {
                    name: parameter.variable.lexeme.clone(),
                    data_type: parameter.data_type.text.clone(),
                });
                if let Some(default) = &parameter.default {
                    self.expr_lin(default);
                }
            }
        }
        self.statements_lin(&procedure.body);
    }

    fn statements_lin(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.statement_lin(statement);
        }
    }

    fn statement_lin(&mut self, statement: &Statement) {
        match statement {
            Statement::Select(select) => self.select_lin(select),
            Statement::Insert(insert) => self.insert_lin(insert),
            Statement::Update(update) => self.update_lin(update),
            Statement::Delete(delete) => self.delete_lin(delete),
            Statement::CreateTable(create_table) => self.create_table_lin(create_table),
            Statement::Block(block) => self.statements_lin(&block.statements),
            Statement::If(if_statement) => {
                self.expr_lin(&if_statement.condition);
                self.statement_lin(&if_statement.then);
                if let Some(r#else) = &if_statement.r#else {
                    self.statement_lin(r#else);
                }
            }
            Statement::While(while_statement) => {
                self.expr_lin(&while_statement.condition);
                self.statement_lin(&while_statement.body);
            }
            Statement::DeclareCursor(declare_cursor) => self.select_lin(&declare_cursor.query),
            Statement::SetVar(set_var) => self.expr_lin(&set_var.expr),
            Statement::Execute(execute) => self.execute_lin(execute),
            Statement::Return(return_statement) => {
                if let Some(expr) = &return_statement.expr {
                    self.expr_lin(expr);
                }
            }
            Statement::Print(print) => self.exprs_lin(&print.exprs),
            Statement::Raiserror(raiserror) => self.exprs_lin(&raiserror.exprs),
            Statement::Cursor(_)
            | Statement::CreateIndex(_)
            | Statement::DropTable(_)
            | Statement::DropProcedure(_)
            | Statement::Grant(_)
            | Statement::Use(_)
            | Statement::Truncate(_)
            | Statement::Declare(_)
            | Statement::SetOption(_)
            | Statement::BeginTransaction(_)
            | Statement::CommitTransaction(_)
            | Statement::RollbackTransaction(_)
            | Statement::Break
            | Statement::Continue => {}
        }
    }

    fn select_lin(&mut self, select: &SelectStatement) {
        self.report.fields.push(select.select_elements.text.clone());
        if let Some(into) = &select.into {
            self.add_table(into);
        }
        if let Some(from) = &select.from {
            self.join_list_tables_lin(from);
        }
        if let Some(r#where) = &select.r#where {
            self.add_criteria(&r#where.text);
        }

        if let Some(top) = &select.top {
            self.expr_lin(top);
        }
        for element in &select.select_elements.elements {
            self.expr_lin(&element.expr);
        }
        if let Some(from) = &select.from {
            self.join_list_children_lin(from);
        }
        if let Some(r#where) = &select.r#where {
            self.expr_lin(&r#where.expr);
        }
        if let Some(group_by) = &select.group_by {
            self.exprs_lin(group_by);
        }
        if let Some(having) = &select.having {
            self.expr_lin(having);
        }
        if let Some(union) = &select.union {
            self.select_lin(&union.select);
        }
        if let Some(order_by) = &select.order_by {
            for order_by_expr in order_by {
                self.expr_lin(&order_by_expr.expr);
            }
        }
    }

    fn insert_lin(&mut self, insert: &InsertStatement) {
        let name = self.add_table(&insert.table);
        self.add_operation(Operation::InsertInto(name));

        match &insert.source {
            InsertSource::Values(rows) => {
                for row in rows {
                    self.exprs_lin(row);
                }
            }
            InsertSource::Select(select) => self.select_lin(select),
            InsertSource::Execute(execute) => self.execute_lin(execute),
        }
    }

    fn update_lin(&mut self, update: &UpdateStatement) {
        let target = dml_target(&update.table, update.from.as_ref());
        let name = self.add_table(target);
        self.add_operation(Operation::Update(name));
        if let Some(from) = &update.from {
            self.join_list_tables_lin(from);
        }
        if let Some(r#where) = &update.r#where {
            self.add_criteria(&r#where.text);
        }

        for item in &update.update_items {
            self.expr_lin(&item.expr);
        }
        if let Some(from) = &update.from {
            self.join_list_children_lin(from);
        }
        if let Some(r#where) = &update.r#where {
            self.expr_lin(&r#where.expr);
        }
    }

    fn delete_lin(&mut self, delete: &DeleteStatement) {
        let target = dml_target(&delete.table, delete.from.as_ref());
        let name = self.add_table(target);
        self.add_operation(Operation::DeleteFrom(name));
        if let Some(from) = &delete.from {
            self.join_list_tables_lin(from);
        }
        if let Some(r#where) = &delete.r#where {
            self.add_criteria(&r#where.text);
        }

        if let Some(from) = &delete.from {
            self.join_list_children_lin(from);
        }
        if let Some(r#where) = &delete.r#where {
            self.expr_lin(&r#where.expr);
        }
    }

    fn create_table_lin(&mut self, create_table: &CreateTableStatement) {
        let name = self.add_table(&create_table.table);
        self.add_operation(Operation::CreateTable(name));
    }

    fn execute_lin(&mut self, execute: &ExecuteStatement) {
        match &execute.target {
            ExecuteTarget::Procedure { name, arguments } => {
                log::debug!("Skipping call to procedure `{}`.", name.identifier());
                for argument in arguments {
                    self.expr_lin(&argument.expr);
                }
            }
            ExecuteTarget::Dynamic(expr) => self.expr_lin(expr),
        }
    }

    fn exprs_lin(&mut self, exprs: &[Expr]) {
        for expr in exprs {
            self.expr_lin(expr);
        }
    }

    /// Only subqueries inside expressions carry lineage.
    fn expr_lin(&mut self, expr: &Expr) {
        match expr {
            Expr::Binary(binary) => {
                self.expr_lin(&binary.left);
                self.expr_lin(&binary.right);
            }
            Expr::Unary(unary) => self.expr_lin(&unary.right),
            Expr::Grouping(grouping) => self.expr_lin(&grouping.expr),
            Expr::In(in_expr) => {
                self.expr_lin(&in_expr.expr);
                match &in_expr.list {
                    InList::Exprs(exprs) => self.exprs_lin(exprs),
                    InList::Subquery(select) => self.select_lin(select),
                }
            }
            Expr::Between(between) => {
                self.expr_lin(&between.expr);
                self.expr_lin(&between.low);
                self.expr_lin(&between.high);
            }
            Expr::IsNull(is_null) => self.expr_lin(&is_null.expr),
            Expr::Exists(select) | Expr::Subquery(select) => self.select_lin(select),
            Expr::Case(case) => {
                if let Some(case_expr) = &case.case {
                    self.expr_lin(case_expr);
                }
                for (when, then) in &case.when_thens {
                    self.expr_lin(when);
                    self.expr_lin(then);
                }
                if let Some(r#else) = &case.r#else {
                    self.expr_lin(r#else);
                }
            }
            Expr::Cast(cast) => self.expr_lin(&cast.expr),
            Expr::Function(function) => self.exprs_lin(&function.arguments),
            Expr::Column(_)
            | Expr::QualifiedStar(_)
            | Expr::Variable(_)
            | Expr::String(_)
            | Expr::Number(_)
            | Expr::Null
            | Expr::Default
            | Expr::Star => {}
        }
    }
}

/// Collects the lineage of a parsed script. The facts of all its batches are merged into one
/// report, in source order.
pub fn extract_lineage(ast: &Ast) -> LineageReport {
    let mut collector = LineageCollector::default();
    for batch in &ast.batches {
        match batch {
            Batch::Procedure(procedure) => {
                log::debug!(
                    "Extracting lineage of procedure `{}`.",
                    procedure.name.identifier()
                );
                collector.procedure_lin(procedure);
            }
            Batch::Statements(statements) => collector.statements_lin(statements),
        }
    }
    collector.report
}

/// Collects the lineage of each tree independently.
pub fn extract_lineages(asts: &[&Ast]) -> Vec<LineageReport> {
    asts.iter().map(|ast| extract_lineage(ast)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_sql;

    fn lineage_of(sql: &str) -> LineageReport {
        extract_lineage(&parse_sql(sql).unwrap())
    }

    fn set(items: &[&str]) -> IndexSet<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_procedure_with_temp_table() {
        let report = lineage_of("CREATE PROCEDURE p (@id int) AS SELECT name FROM #Temp WHERE id = @id");
        assert_eq!(report.fields(), ["name"]);
        assert_eq!(report.criteria(), ["id = @id"]);
        assert_eq!(report.temp_tables(), &set(&["#Temp"]));
        assert!(report.source_tables().is_empty());
        assert!(report.operations().is_empty());
        assert_eq!(
            report.input_parameters(),
            [InputParameter {
                name: "@id".to_owned(),
                data_type: "int".to_owned()
            }]
        );
    }

    #[test]
    fn test_operations_keep_order_and_duplicates() {
        let report = lineage_of(
            "
            create proc load_orders @from datetime, @to datetime, @region varchar(20) as
            begin
                create table #stage (id int not null, amount numeric(10, 2) null)
                insert into #stage select id, amount from Orders where created between @from and @to
                update Orders set flag = 1 where region = @region
                insert into #stage values (0, 0)
                delete from #stage where amount = 0
            end
            ",
        );
        let operations = report
            .operations()
            .iter()
            .map(|op| op.to_string())
            .collect::<Vec<String>>();
        assert_eq!(
            operations,
            [
                "CREATE TABLE #stage",
                "INSERT INTO #stage",
                "UPDATE Orders",
                "INSERT INTO #stage",
                "DELETE FROM #stage"
            ]
        );
        assert_eq!(report.input_parameters().len(), 3);
        assert_eq!(report.input_parameters()[2].to_string(), "@region varchar(20)");
        assert_eq!(
            report.criteria(),
            ["created between @from and @to", "region = @region", "amount = 0"]
        );
    }

    #[test]
    fn test_derived_table_is_not_resolved_but_visited() {
        let report = lineage_of("select a from (select b from Src where b > 1) d, Other o");
        assert_eq!(report.fields(), ["a", "b"]);
        assert_eq!(report.source_tables(), &set(&["Src", "Other"]));
        // The outer join list only contributes the direct reference.
        assert_eq!(report.source_tables().get_index(0).unwrap(), "Other");
        assert_eq!(report.criteria(), ["b > 1"]);
    }

    #[test]
    fn test_same_name_in_both_sets() {
        let report = lineage_of("select * from Orders select * from #Orders");
        assert_eq!(report.source_tables(), &set(&["Orders"]));
        assert_eq!(report.temp_tables(), &set(&["#Orders"]));
        assert_eq!(report.fields(), ["*", "*"]);
    }

    #[test]
    fn test_duplicated_fields_are_kept() {
        let report = lineage_of("select id from t; select id from t");
        assert_eq!(report.fields(), ["id", "id"]);
        assert_eq!(report.source_tables(), &set(&["t"]));
    }

    #[test]
    fn test_select_into() {
        let report = lineage_of("select id, name into #customers from db..Customers where active = 1");
        assert!(report.operations().is_empty());
        assert_eq!(report.temp_tables(), &set(&["#customers"]));
        assert_eq!(report.source_tables(), &set(&["db..Customers"]));
        assert_eq!(report.fields(), ["id, name"]);
    }

    #[test]
    fn test_update_from_join_list() {
        let report = lineage_of(
            "update o set o.total = s.total from Orders o, #stage s where o.id = s.id",
        );
        assert_eq!(report.operations()[0], Operation::Update("Orders".to_owned()));
        assert_eq!(report.source_tables(), &set(&["Orders"]));
        assert_eq!(report.temp_tables(), &set(&["#stage"]));
        assert_eq!(report.criteria(), ["o.id = s.id"]);
    }

    #[test]
    fn test_delete_target_alias_of_temp_table() {
        let report = lineage_of("delete s from #stage s, Orders o where s.id = o.id");
        assert_eq!(report.operations(), [Operation::DeleteFrom("#stage".to_owned())]);
        assert_eq!(report.source_tables(), &set(&["Orders"]));
        assert_eq!(report.temp_tables(), &set(&["#stage"]));
    }

    #[test]
    fn test_target_without_matching_alias_is_kept() {
        let report = lineage_of("update Orders set flag = 1 from Orders o, Regions r where o.rid = r.id");
        assert_eq!(report.operations(), [Operation::Update("Orders".to_owned())]);
        assert_eq!(report.source_tables(), &set(&["Orders", "Regions"]));
    }

    #[test]
    fn test_batches_are_merged() {
        let report = lineage_of(
            "create table #t (id int)\ngo\ncreate proc p @x int as insert into Orders select id from #t where id = @x\ngo\n",
        );
        let operations = report
            .operations()
            .iter()
            .map(|op| op.to_string())
            .collect::<Vec<String>>();
        assert_eq!(operations, ["CREATE TABLE #t", "INSERT INTO Orders"]);
        assert_eq!(report.temp_tables(), &set(&["#t"]));
        assert_eq!(report.source_tables(), &set(&["Orders"]));
        assert_eq!(report.fields(), ["id"]);
        assert_eq!(report.criteria(), ["id = @x"]);
        assert_eq!(report.input_parameters()[0].to_string(), "@x int");
    }

    #[test]
    fn test_global_temp_table() {
        let report = lineage_of("insert into ##shared select id from #local");
        assert_eq!(report.temp_tables(), &set(&["##shared", "#local"]));
        assert_eq!(report.operations()[0].to_string(), "INSERT INTO ##shared");
        assert!(report.source_tables().is_empty());
    }

    #[test]
    fn test_subquery_in_criteria() {
        let report = lineage_of("delete from Orders where id in (select id from #dead)");
        assert_eq!(report.criteria(), ["id in (select id from #dead)"]);
        assert_eq!(report.fields(), ["id"]);
        assert_eq!(report.temp_tables(), &set(&["#dead"]));
    }

    #[test]
    fn test_lineage_is_deterministic() {
        let ast = parse_sql(
            "create procedure p @x int as if @x > 0 select a from T1 else select b from #T2",
        )
        .unwrap();
        let reports = extract_lineages(&[&ast, &ast]);
        assert_eq!(reports[0], reports[1]);
        assert_eq!(reports[0].fields(), ["a", "b"]);
    }

    #[test]
    fn test_display() {
        let report = lineage_of("create proc p @id int as update Orders set x=1 where id=@id");
        assert_eq!(
            report.to_string(),
            "Source Tables: {Orders}\n\
             Temporary Tables: {}\n\
             Fields/Columns Used: []\n\
             Criteria (WHERE conditions): [id=@id]\n\
             Operations: [UPDATE Orders]\n\
             Input Parameters: [@id int]"
        );
    }
}
