//! End-to-end behaviour of the query pipeline

use serde_json::json;

use super::ast::{self, walk, NodeType};
use super::*;
use crate::columns::{CellValue, ColumnMapper, FormatKind};

fn compile_ast(input: &str) -> Query {
    parse_query(input).unwrap_or_else(|e| panic!("failed to parse {:?}: {}", input, e))
}

fn validate(input: &str) -> ValidationResult {
    let registry = Interpreter::default().registry().clone();
    validate_query(&compile_ast(input), &registry)
}

#[test]
fn test_empty_query_gets_defaults_only() {
    let query = interpret(&compile_ast("")).unwrap();
    assert_eq!(
        serde_json::to_value(&query).unwrap(),
        json!({"view": "summary", "period": "current-year", "size": "normal"})
    );
}

#[test]
fn test_where_conjunction_fills_filter() {
    let query = interpret(&compile_ast(r#"WHERE year = 2024 AND month = 12 AND project = "X""#)).unwrap();
    assert_eq!(
        serde_json::to_value(&query).unwrap()["where"],
        json!({"year": 2024, "month": 12, "project": "X"})
    );
}

#[test]
fn test_between_fills_date_range() {
    let query = interpret(&compile_ast(r#"WHERE date BETWEEN "2024-01-01" AND "2024-12-31""#)).unwrap();
    assert_eq!(
        serde_json::to_value(&query).unwrap()["where"]["dateRange"],
        json!({"start": "2024-01-01", "end": "2024-12-31"})
    );
}

#[test]
fn test_interpretation_does_not_touch_the_ast() {
    let ast = compile_ast(r#"WHERE year = 2024 AND project IN ("A") SHOW SUM(hours) GROUP BY project"#);
    let snapshot = ast.clone();
    let interpreter = Interpreter::default();

    let first = interpreter.interpret(&ast).unwrap();
    let second = interpreter.interpret(&ast).unwrap();

    assert_eq!(first, second);
    assert_eq!(ast, snapshot);
}

#[test]
fn test_unknown_where_field_warns() {
    let result = Interpreter::default()
        .interpret_with_diagnostics(&compile_ast("WHERE foo = 1"))
        .unwrap();
    let filter = serde_json::to_value(result.query.filter()).unwrap();
    assert!(filter.get("foo").is_none());
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn test_having_without_group_by_is_invalid() {
    let result = validate("HAVING x > 1");
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.contains("GROUP BY")));
}

#[test]
fn test_chart_with_summary_view_is_invalid() {
    let result = validate("CHART trend VIEW summary");
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn test_show_maps_known_fields_in_order() {
    let ast = compile_ast("SHOW hours, invalid_field, invoiced");
    let Some(Clause::Show(show)) = ast.find_clause(ClauseType::Show) else {
        panic!("missing SHOW");
    };

    let columns = ColumnMapper::default().map_fields(show);
    let keys: Vec<&str> = columns.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["hours", "invoiced"]);
    assert_eq!(columns[0].format(&CellValue::from(7.5)), "7.5h");
}

#[test]
fn test_percentage_formatting_heuristic() {
    let ast = compile_ast("SHOW budgetProgress");
    let Some(Clause::Show(show)) = ast.find_clause(ClauseType::Show) else {
        panic!("missing SHOW");
    };
    let column = &ColumnMapper::default().map_fields(show)[0];
    assert_eq!(column.formatter.kind(), FormatKind::Percentage);
    assert_eq!(column.format(&0.75.into()), "75%");
    assert_eq!(column.format(&75.0.into()), "75%");
    assert_eq!(column.format(&1.0.into()), "1%");
}

#[test]
fn test_unterminated_string_reports_opening_quote() {
    match parse_query("WHERE project = \"abc") {
        Err(QueryError::Lex(e)) => {
            assert_eq!(e.position(), Position::new(1, 17));
            assert!(e.message.contains("Unterminated string"));
        }
        other => panic!("expected lex error, got {:?}", other),
    }
}

#[test]
fn test_unterminated_string_on_later_line() {
    let err = parse_query("SHOW hours\nWHERE project = 'abc\n").unwrap_err();
    assert_eq!(err.position(), Some(Position::new(2, 17)));
}

#[test]
fn test_walk_visits_clauses_in_source_order() {
    let ast = compile_ast("VIEW table SHOW hours WHERE year = 2024");
    let mut clauses = Vec::new();
    walk(&ast, |node| {
        if let ast::Node::Clause(clause) = node {
            clauses.push(clause.clause_type());
        }
    });
    assert_eq!(clauses, vec![ClauseType::View, ClauseType::Show, ClauseType::Where]);
}

#[test]
fn test_find_by_type_locates_date_ranges() {
    let ast = compile_ast(r#"WHERE date BETWEEN "2024-01-01" AND "2024-06-30" AND year = 2024"#);
    assert_eq!(ast::find_by_type(&ast, NodeType::DateRange).len(), 1);
    assert_eq!(ast::find_by_type(&ast, NodeType::Literal).len(), 3);
}

#[test]
fn test_comments_and_newlines_are_ignored() {
    let ast = compile_ast(
        "// yearly report\nWHERE year = 2024 // this year\n  AND month = 1\n\nVIEW full // everything",
    );
    assert_eq!(ast.clauses.len(), 2);
}

#[test]
fn test_long_and_chain_parses_and_drops() {
    let mut source = String::from("WHERE year = 2024");
    for _ in 0..100_000 {
        source.push_str(" AND month = 1");
    }

    let ast = compile_ast(&source);
    assert_eq!(ast.clauses.len(), 1);
    drop(ast);
}
