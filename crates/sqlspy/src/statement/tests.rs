use super::*;

#[test]
fn substitutes_bound_and_missing_placeholders() {
    let mut stmt = StatementInfo::new("SELECT * FROM t WHERE a=? AND b=?");
    stmt.set_parameter_value(1, 5);

    assert_eq!(stmt.sql_with_values(), "SELECT * FROM t WHERE a=5 AND b=null");
    assert_eq!(stmt.sql(), "SELECT * FROM t WHERE a=? AND b=?");
}

#[test]
fn reconstruction_is_idempotent() {
    let mut stmt = statement_info("UPDATE users SET name = ? WHERE id = ?");
    stmt.set_parameter_value(1, "alice");
    stmt.set_parameter_value(2, 42);

    let first = stmt.sql_with_values();
    let second = stmt.sql_with_values();
    assert_eq!(first, second);
    assert_eq!(first, "UPDATE users SET name = 'alice' WHERE id = 42");
}

#[test]
fn rebinding_keeps_last_value() {
    let mut stmt = statement_info("SELECT ?");
    stmt.set_parameter_value(1, "first");
    stmt.set_parameter_value(1, "second");

    assert_eq!(stmt.sql_with_values(), "SELECT 'second'");
    assert_eq!(stmt.parameters().len(), 1);
}

#[test]
fn fully_bound_statement_has_no_placeholders_left() {
    let sql = "INSERT INTO t (a, b, c, d) VALUES (?, ?, ?, ?)";
    let mut stmt = statement_info(sql);
    for position in 1..=stmt.placeholder_count() {
        stmt.set_parameter_value(position, position as i64);
    }

    let rendered = stmt.sql_with_values();
    assert!(!rendered.contains('?'));
    assert_eq!(rendered, "INSERT INTO t (a, b, c, d) VALUES (1, 2, 3, 4)");
}

#[test]
fn every_unbound_placeholder_renders_null() {
    // More placeholders than bindings, and a gap in the middle.
    let mut stmt = statement_info("VALUES (?, ?, ?, ?)");
    stmt.set_parameter_value(1, 1);
    stmt.set_parameter_value(3, 3);

    assert_eq!(stmt.sql_with_values(), "VALUES (1, null, 3, null)");
}

#[test]
fn extra_bindings_are_ignored() {
    let mut stmt = statement_info("SELECT ?");
    stmt.set_parameter_value(1, 1);
    stmt.set_parameter_value(7, 7);

    assert_eq!(stmt.sql_with_values(), "SELECT 1");
}

#[test]
fn position_zero_is_ignored() {
    let mut stmt = statement_info("SELECT ?");
    stmt.set_parameter_value(0, 99);

    assert!(stmt.parameters().is_empty());
    assert_eq!(stmt.sql_with_values(), "SELECT null");
}

#[test]
fn explicit_null_binding_renders_null() {
    let mut stmt = statement_info("UPDATE t SET x = ?");
    stmt.set_parameter_value(1, None::<String>);

    assert_eq!(stmt.parameter_value(0), Some(&BoundValue::Null));
    assert_eq!(stmt.sql_with_values(), "UPDATE t SET x = null");
}

#[test]
fn question_mark_inside_literal_consumes_a_binding() {
    let mut stmt = statement_info("SELECT * FROM t WHERE note = 'why?' AND id = ?");
    stmt.set_parameter_value(1, 10);

    assert_eq!(
        stmt.sql_with_values(),
        "SELECT * FROM t WHERE note = 'why10' AND id = null"
    );
}

#[test]
fn quote_aware_reconstruction_skips_literals() {
    let mut stmt =
        statement_info(r#"SELECT "a?b" FROM t WHERE note = 'it''s ?' AND id = ? AND k = ?"#);
    stmt.set_parameter_value(1, 10);

    assert_eq!(
        stmt.sql_with_values_quote_aware(),
        r#"SELECT "a?b" FROM t WHERE note = 'it''s ?' AND id = 10 AND k = null"#
    );
}

#[test]
fn quote_aware_handles_unterminated_literal() {
    let mut stmt = statement_info("SELECT ? WHERE x = 'open ?");
    stmt.set_parameter_value(1, 1);

    assert_eq!(
        stmt.sql_with_values_quote_aware(),
        "SELECT 1 WHERE x = 'open ?"
    );
}

#[test]
fn preserves_multibyte_characters() {
    let mut stmt = statement_info("SELECT '日本' || ? AS 名前");
    stmt.set_parameter_value(1, "語");

    assert_eq!(stmt.sql_with_values(), "SELECT '日本' || '語' AS 名前");
    assert_eq!(
        stmt.sql_with_values_quote_aware(),
        "SELECT '日本' || '語' AS 名前"
    );
}

#[test]
fn sql_without_placeholders_is_unchanged() {
    let stmt = statement_info("SELECT 1");
    assert_eq!(stmt.sql_with_values(), "SELECT 1");
    assert_eq!(stmt.placeholder_count(), 0);
}

#[test]
fn plain_statement_is_returned_verbatim() {
    let stmt = StatementInfo::plain("SELECT '?' FROM dual WHERE a = ?");
    assert_eq!(stmt.kind(), StatementKind::Plain);
    assert_eq!(stmt.sql_with_values(), "SELECT '?' FROM dual WHERE a = ?");
}

#[test]
fn callable_keeps_named_bindings_out_of_reconstruction() {
    let mut stmt = StatementInfo::callable("{call transfer(?, ?)}");
    stmt.set_parameter_value(1, 100);
    stmt.set_named_parameter_value("target", "acct-2");

    assert_eq!(
        stmt.named_parameter_value("target"),
        Some(&BoundValue::Text("acct-2".to_string()))
    );
    assert_eq!(stmt.named_parameter_value("missing"), None);
    assert_eq!(stmt.sql_with_values(), "{call transfer(100, null)}");
}

#[test]
fn clear_parameters_resets_bindings() {
    let mut stmt = statement_info("INSERT INTO t VALUES (?)");
    stmt.set_parameter_value(1, 1);
    stmt.clear_parameters();

    assert!(stmt.parameters().is_empty());
    assert_eq!(stmt.sql_with_values(), "INSERT INTO t VALUES (null)");
}

#[test]
fn parameter_store_iterates_in_slot_order() {
    let mut store = ParameterStore::new();
    store.set(3, "c");
    store.set(1, "a");
    store.set_named("z", 1);
    store.set_named("b", 2);

    let slots: Vec<usize> = store.positional().map(|(slot, _)| slot).collect();
    assert_eq!(slots, vec![0, 2]);
    let names: Vec<&str> = store.named().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["b", "z"]);
    assert_eq!(store.len(), 4);
}

#[test]
fn free_function_matches_method() {
    let mut store = ParameterStore::new();
    store.set(1, true);
    assert_eq!(sql_with_values("SELECT ?, ?", &store), "SELECT true, null");
}

#[test]
fn to_json_includes_reconstructed_sql() {
    let mut stmt = statement_info("SELECT * FROM t WHERE id = ?");
    stmt.set_parameter_value(1, 7);

    let json = stmt.to_json().unwrap();
    assert_eq!(json["sql"], "SELECT * FROM t WHERE id = ?");
    assert_eq!(json["kind"], "prepared");
    assert_eq!(json["sql_with_values"], "SELECT * FROM t WHERE id = 7");
    assert_eq!(json["parameters"]["positional"]["0"]["value"], 7);
}

#[test]
fn statement_type_detection() {
    assert_eq!(
        StatementType::from_sql("SELECT * FROM users"),
        StatementType::Select
    );
    assert_eq!(
        StatementType::from_sql("  /* hint */ select 1"),
        StatementType::Select
    );
    assert_eq!(
        StatementType::from_sql("-- comment\nINSERT INTO t VALUES (?)"),
        StatementType::Insert
    );
    assert_eq!(
        StatementType::from_sql("UPDATE users SET name = ?"),
        StatementType::Update
    );
    assert_eq!(
        StatementType::from_sql("DELETE FROM users WHERE id = ?"),
        StatementType::Delete
    );
    assert_eq!(
        StatementType::from_sql("{call refresh()}"),
        StatementType::Other
    );
}

#[test]
fn statement_type_looks_past_ctes() {
    assert_eq!(
        StatementType::from_sql("WITH cte AS (SELECT ')' ) INSERT INTO t SELECT * FROM cte"),
        StatementType::Insert
    );
    assert_eq!(
        StatementType::from_sql("WITH a AS (SELECT 1), b AS (SELECT 2) SELECT * FROM a, b"),
        StatementType::Select
    );
    assert_eq!(
        StatementType::from_sql("WITH d AS (SELECT 1) DELETE FROM t"),
        StatementType::Delete
    );
}
