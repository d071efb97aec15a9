use sproc_lineage::{
    ast::{Batch, Statement},
    parser::parse_sql,
    test_utils::{PARSING_TESTS_FILE, TestParsingData},
};

fn test_sql(sql: &str) {
    let ast = parse_sql(sql);
    if let Err(err) = &ast {
        println!("{}", err)
    }
    assert!(ast.is_ok());
}

#[test]
fn test_should_parse() {
    let parsing_test_file =
        std::fs::read_to_string(PARSING_TESTS_FILE).expect("Cannot open parsing test cases");
    let test_parsing_data: TestParsingData =
        toml::from_str(&parsing_test_file).expect("Cannot parse test cases defined in toml");

    for test in test_parsing_data.tests {
        let sql = &test.sql;
        println!("Testing parsing for SQL: {}", sql);
        test_sql(sql);
        test_sql(&sql.to_uppercase());
        test_sql(&sql.to_lowercase());
    }
}

#[test]
fn test_should_not_parse() {
    let sqls = [
        // Missing select list
        "select from Orders",
        // Missing insert source
        "insert into Orders",
        // Missing set clause
        "update Orders where id = 1",
        // Join without condition
        "create proc p as select a from t inner join u",
        // Temp marker without a name
        "select * from # where 1 = 1",
        // Unterminated string
        "select 'unterminated from Orders",
        // Unterminated block
        "create proc p as begin select 1",
        // Stray block end
        "select a from t end",
        // Junk between batches
        "create table #t (id int) go create proc p as select 1 end go",
        // Batch not separated by GO
        "create proc p as select 1 go select 2 create proc q as select 3",
        // Drop of an unsupported object
        "drop view v",
        // Parameters must precede AS
        "create proc p as @id int select 1",
        // Operation without table
        "delete from where id = 1",
    ];
    for sql in sqls {
        println!("Testing parsing error for SQL: {}", sql);
        assert!(parse_sql(sql).is_err())
    }
}

#[test]
fn test_root_kind() {
    let ast = parse_sql("create procedure p @id int as select 1").unwrap();
    let Batch::Procedure(procedure) = &ast.batches[0] else {
        panic!("Expected a procedure definition");
    };
    assert_eq!(procedure.name.identifier(), "p");
    assert_eq!(procedure.parameter_list.as_ref().unwrap().parameters.len(), 1);
    assert_eq!(procedure.body.len(), 1);

    let ast = parse_sql("select 1 from t; delete from t").unwrap();
    let Batch::Statements(statements) = &ast.batches[0] else {
        panic!("Expected a batch of statements");
    };
    assert!(matches!(statements[0], Statement::Select(_)));
    assert!(matches!(statements[1], Statement::Delete(_)));
}

#[test]
fn test_verbatim_clause_text() {
    let ast = parse_sql(
        "select  o.id,\n        sum(o.amount)   as total\nfrom Orders o\nwhere o.region = 'EU'\n  and o.amount > 0",
    )
    .unwrap();
    let Batch::Statements(statements) = &ast.batches[0] else {
        panic!("Expected a batch of statements");
    };
    let Statement::Select(select) = &statements[0] else {
        panic!("Expected a select statement");
    };
    assert_eq!(
        select.select_elements.text,
        "o.id,\n        sum(o.amount)   as total"
    );
    assert_eq!(
        select.r#where.as_ref().unwrap().text,
        "o.region = 'EU'\n  and o.amount > 0"
    );
}

#[test]
fn test_temp_table_marker() {
    let ast = parse_sql("create table #stage (id int)").unwrap();
    let Batch::Statements(statements) = &ast.batches[0] else {
        panic!("Expected a batch of statements");
    };
    let Statement::CreateTable(create_table) = &statements[0] else {
        panic!("Expected a create table statement");
    };
    assert!(create_table.table.temp_marker.is_some());
    assert_eq!(create_table.table.identifier.identifier(), "stage");
    assert_eq!(create_table.columns[0].data_type.text, "int");
}

#[test]
fn test_every_batch_is_parsed() {
    let ast = parse_sql(
        "create table #t (id int)\ngo\ncreate proc p @x int as insert into Orders select id from #t where id = @x\ngo\n",
    )
    .unwrap();
    assert_eq!(ast.batches.len(), 2);
    assert!(matches!(&ast.batches[0], Batch::Statements(statements) if statements.len() == 1));
    let Batch::Procedure(procedure) = &ast.batches[1] else {
        panic!("Expected a procedure definition");
    };
    assert_eq!(procedure.name.identifier(), "p");
    assert!(matches!(procedure.body[0], Statement::Insert(_)));

    // Repeated and trailing separators do not produce empty batches
    let ast = parse_sql("go\nselect 1\ngo\ngo\nselect 2\ngo").unwrap();
    assert_eq!(ast.batches.len(), 2);
}

#[test]
fn test_deploy_script_statements() {
    let ast = parse_sql(
        "use sales
        go
        if object_id('dbo.p') is not null drop procedure dbo.p
        go
        create proc dbo.p as select 1
        go
        grant execute on dbo.p to public, reporting
        go",
    )
    .unwrap();
    assert_eq!(ast.batches.len(), 4);
    let Batch::Statements(statements) = &ast.batches[0] else {
        panic!("Expected a batch of statements");
    };
    assert!(matches!(statements[0], Statement::Use(_)));
    let Batch::Statements(statements) = &ast.batches[1] else {
        panic!("Expected a batch of statements");
    };
    let Statement::If(if_statement) = &statements[0] else {
        panic!("Expected an if statement");
    };
    let Statement::DropProcedure(drop_procedure) = if_statement.then.as_ref() else {
        panic!("Expected a drop procedure statement");
    };
    assert_eq!(drop_procedure.names[0].identifier(), "dbo.p");
    let Batch::Statements(statements) = &ast.batches[3] else {
        panic!("Expected a batch of statements");
    };
    let Statement::Grant(grant) = &statements[0] else {
        panic!("Expected a grant statement");
    };
    assert!(!grant.revoke);
    assert_eq!(grant.object.as_ref().unwrap().identifier(), "dbo.p");
    assert_eq!(grant.grantees.len(), 2);
}

#[test]
fn test_multi_word_data_types() {
    let ast = parse_sql(
        "create proc p @rate double precision, @code char varying(10) as
        create table ##rates (id unsigned int, rate double precision)",
    )
    .unwrap();
    let Batch::Procedure(procedure) = &ast.batches[0] else {
        panic!("Expected a procedure definition");
    };
    let parameters = &procedure.parameter_list.as_ref().unwrap().parameters;
    assert_eq!(parameters[0].data_type.text, "double precision");
    assert_eq!(parameters[1].data_type.text, "char varying(10)");
    assert_eq!(parameters[1].data_type.arguments, ["10"]);
    let Statement::CreateTable(create_table) = &procedure.body[0] else {
        panic!("Expected a create table statement");
    };
    assert_eq!(create_table.table.temp_marker.as_ref().unwrap().lexeme, "##");
    assert_eq!(create_table.columns[0].data_type.text, "unsigned int");
}
