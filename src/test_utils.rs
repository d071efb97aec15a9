use std::collections::HashSet;

use serde::Deserialize;

use crate::lineage::LineageReport;

pub const PARSING_TESTS_FILE: &str = "tests/parsing_tests.toml";
pub const LINEAGE_TESTS_FILE: &str = "tests/lineage_tests.toml";

#[derive(Deserialize, Debug, Clone)]
pub struct TestParsing {
    pub sql: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestParsingData {
    pub tests: Vec<TestParsing>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestInputParameter {
    pub name: String,
    pub data_type: String,
}

/// Expected lineage of a test case. Table sets are compared ignoring order.
#[derive(Deserialize, Debug, Clone)]
pub struct TestLineage {
    pub sql: String,
    #[serde(default)]
    pub source_tables: Vec<String>,
    #[serde(default)]
    pub temp_tables: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub criteria: Vec<String>,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub input_parameters: Vec<TestInputParameter>,
}

impl TestLineage {
    pub fn assert_matches(&self, report: &LineageReport) {
        assert_eq!(
            report.source_tables().iter().collect::<HashSet<_>>(),
            self.source_tables.iter().collect::<HashSet<_>>(),
            "source tables"
        );
        assert_eq!(
            report.temp_tables().iter().collect::<HashSet<_>>(),
            self.temp_tables.iter().collect::<HashSet<_>>(),
            "temp tables"
        );
        assert_eq!(report.fields(), self.fields, "fields");
        assert_eq!(report.criteria(), self.criteria, "criteria");
        assert_eq!(
            report
                .operations()
                .iter()
                .map(|op| op.to_string())
                .collect::<Vec<String>>(),
            self.operations,
            "operations"
        );
        assert_eq!(
            report
                .input_parameters()
                .iter()
                .map(|param| (param.name.as_str(), param.data_type.as_str()))
                .collect::<Vec<_>>(),
            self.input_parameters
                .iter()
                .map(|param| (param.name.as_str(), param.data_type.as_str()))
                .collect::<Vec<_>>(),
            "input parameters"
        );
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestLineageData {
    pub tests: Vec<TestLineage>,
}
