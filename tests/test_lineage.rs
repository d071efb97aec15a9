use sproc_lineage::{
    lineage::{extract_lineage, extract_lineages},
    parser::parse_sql,
    test_utils::{LINEAGE_TESTS_FILE, TestLineageData},
};

#[test]
fn test_lineage() {
    let lineage_data_file =
        std::fs::read_to_string(LINEAGE_TESTS_FILE).expect("Cannot open lineage test cases");
    let test_lineage_data: TestLineageData =
        toml::from_str(&lineage_data_file).expect("Cannot parse test cases defined in toml");

    for test in test_lineage_data.tests {
        println!("Testing lineage for SQL: {}", &test.sql);
        let ast = parse_sql(&test.sql)
            .unwrap_or_else(|err| panic!("Could not parse sql due to: {:?}", &err));
        let lineage = extract_lineage(&ast);
        test.assert_matches(&lineage);
    }
}

#[test]
fn test_independent_lineages() {
    let first = parse_sql("create proc a @x int as insert into T1 select * from #S1").unwrap();
    let second = parse_sql("create proc b as delete from T2").unwrap();

    let lineages = extract_lineages(&[&first, &second, &first]);
    assert_eq!(lineages.len(), 3);
    assert_eq!(lineages[0], lineages[2]);
    assert_ne!(lineages[0], lineages[1]);
    assert_eq!(lineages[1].operations()[0].to_string(), "DELETE FROM T2");
    assert!(lineages[1].input_parameters().is_empty());
    assert!(lineages[1].temp_tables().is_empty());
}

#[test]
fn test_json_output() {
    let ast = parse_sql("create proc p @id int as select name from #Temp where id = @id").unwrap();
    let lineage = extract_lineage(&ast);
    let json = serde_json::to_value(&lineage).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "source_tables": [],
            "temp_tables": ["#Temp"],
            "fields": ["name"],
            "criteria": ["id = @id"],
            "operations": [],
            "input_parameters": [{"name": "@id", "data_type": "int"}],
        })
    );
}
