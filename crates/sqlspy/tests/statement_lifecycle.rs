//! Drives a dispatcher the way a driver wrapper would, end to end.

use serde_json::json;
use sqlspy::{
    BoundValue, ColumnRef, DbError, Dispatcher, DispatcherConfig, EventListener, ListenerError,
    ListenerResult, ListenerResults, LoggingListener, ResultSetInfo, SpyError, SpyStats,
    StatementInfo, StatsListener,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Captures one audit record per update, pairing the before-value with the row count.
#[derive(Default)]
struct AuditListener {
    records: Mutex<Vec<String>>,
}

impl EventListener for AuditListener {
    fn name(&self) -> &str {
        "audit"
    }

    fn on_before_execute_update_with_value(
        &self,
        statement: &StatementInfo,
    ) -> ListenerResult<serde_json::Value> {
        Ok(json!({ "sql": statement.sql_with_values() }))
    }

    fn on_after_execute_update_with_values(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
        row_count: i64,
        error: Option<&DbError>,
        values: &ListenerResults<serde_json::Value>,
    ) -> ListenerResult<()> {
        let before = values
            .get_by_name(self.name())
            .ok_or_else(|| ListenerError::failed("no audit value captured"))?;
        let outcome = match error {
            Some(error) => format!("failed: {error}"),
            None => format!("{row_count} row(s)"),
        };
        self.records
            .lock()
            .unwrap()
            .push(format!("{} -> {outcome}", before["sql"].as_str().unwrap_or("")));
        Ok(())
    }
}

/// Refuses any statement touching the `secrets` table.
struct Guard;

impl EventListener for Guard {
    fn on_before_execute_update_with_value(
        &self,
        statement: &StatementInfo,
    ) -> ListenerResult<serde_json::Value> {
        if statement.sql().contains("secrets") {
            return Err(ListenerError::rejected("secrets are read-only"));
        }
        Ok(serde_json::Value::Null)
    }
}

struct Harness {
    dispatcher: Dispatcher,
    stats: Arc<StatsListener>,
    audit: Arc<AuditListener>,
}

fn harness() -> Harness {
    let stats = Arc::new(StatsListener::new());
    let audit = Arc::new(AuditListener::default());
    let dispatcher = Dispatcher::new()
        .with_config(
            DispatcherConfig::new().with_slow_statement_threshold(Duration::from_millis(100)),
        )
        .add(LoggingListener::new().with_rows())
        .add(Guard)
        .add_arc(audit.clone())
        .add_arc(stats.clone());
    Harness {
        dispatcher,
        stats,
        audit,
    }
}

/// Mirrors a wrapped `executeUpdate`: before-value, driver call, after-values.
fn execute_update(
    dispatcher: &Dispatcher,
    stmt: &StatementInfo,
    driver: impl FnOnce() -> Result<i64, DbError>,
) -> Result<i64, SpyError> {
    let values = dispatcher.on_before_execute_update_with_value(stmt)?;
    let elapsed = Duration::from_millis(3);
    let (rows, error) = match driver() {
        Ok(rows) => (rows, None),
        Err(error) => (-1, Some(error)),
    };
    dispatcher.on_after_execute_update_with_values(stmt, elapsed, rows, error.as_ref(), &values)?;
    Ok(rows)
}

#[test]
fn update_flow_records_audit_trail() {
    let h = harness();
    let dispatcher = &h.dispatcher;
    dispatcher
        .on_after_get_connection(Duration::from_millis(1), None)
        .unwrap();

    let mut stmt = StatementInfo::new("UPDATE accounts SET balance = ? WHERE id = ?");
    dispatcher.on_after_prepared_statement_set(&mut stmt, 1, 250.5, None);
    dispatcher.on_after_prepared_statement_set(&mut stmt, 2, 7, None);

    let rows = execute_update(dispatcher, &stmt, || Ok(1)).unwrap();
    assert_eq!(rows, 1);

    let failed = execute_update(dispatcher, &stmt, || {
        Err(DbError::new("deadlock detected").with_sql_state("40P01"))
    })
    .unwrap();
    assert_eq!(failed, -1);

    dispatcher.on_before_commit().unwrap();
    dispatcher
        .on_after_commit(Duration::from_millis(1), None)
        .unwrap();

    assert_eq!(
        *h.audit.records.lock().unwrap(),
        vec![
            "UPDATE accounts SET balance = 250.5 WHERE id = 7 -> 1 row(s)",
            "UPDATE accounts SET balance = 250.5 WHERE id = 7 -> failed: deadlock detected",
        ]
    );

    let stats = h.stats.stats();
    assert_eq!(stats.connections_opened, 1);
    assert_eq!(stats.update_count, 2);
    assert_eq!(stats.failed_statements, 1);
    assert_eq!(stats.rows_affected, 1);
    assert_eq!(stats.commits, 1);
}

#[test]
fn rejected_update_never_reaches_later_listeners() {
    let h = harness();
    let dispatcher = &h.dispatcher;
    let mut stmt = StatementInfo::new("DELETE FROM secrets WHERE id = ?");
    dispatcher.on_after_prepared_statement_set(&mut stmt, 1, 1, None);

    let mut driver_called = false;
    let err = execute_update(dispatcher, &stmt, || {
        driver_called = true;
        Ok(1)
    })
    .unwrap_err();

    assert!(!driver_called);
    match &err {
        SpyError::Listener(failure) => {
            assert_eq!(failure.listener.index(), 1);
            assert!(failure.source.is_rejected());
        }
        other => panic!("Expected Listener, got {other:?}"),
    }
    assert!(h.audit.records.lock().unwrap().is_empty());
    assert_eq!(h.stats.stats(), SpyStats::default());
}

#[test]
fn slow_audited_update_is_reported() {
    let h = harness();
    let dispatcher = &h.dispatcher;
    let stmt = StatementInfo::new("UPDATE accounts SET frozen = true");

    let values = dispatcher
        .on_before_execute_update_with_value(&stmt)
        .unwrap();
    dispatcher
        .on_after_execute_update_with_values(&stmt, Duration::from_secs(5), 3, None, &values)
        .unwrap();

    let stats = h.stats.stats();
    assert_eq!(stats.statements_executed, 1);
    assert_eq!(stats.slow_statements, 1);
    assert_eq!(h.audit.records.lock().unwrap().len(), 1);
}

#[test]
fn batch_then_query_with_result_set() {
    let h = harness();
    let dispatcher = &h.dispatcher;

    let mut insert = StatementInfo::new("INSERT INTO users (name, active) VALUES (?, ?)");
    for (name, active) in [("ann", true), ("bob", false)] {
        dispatcher.on_after_prepared_statement_set(&mut insert, 1, name, None);
        dispatcher.on_after_prepared_statement_set(&mut insert, 2, active, None);
        dispatcher.on_before_add_batch(&insert).unwrap();
        dispatcher
            .on_after_add_batch(&insert, Duration::from_micros(10), None)
            .unwrap();
    }
    assert_eq!(
        insert.sql_with_values(),
        "INSERT INTO users (name, active) VALUES ('bob', false)"
    );
    dispatcher.on_before_execute_batch(&insert).unwrap();
    dispatcher
        .on_after_execute_batch(&insert, Duration::from_millis(150), &[1, 1], None)
        .unwrap();

    let mut query = StatementInfo::new("SELECT id, name FROM users WHERE active = ?");
    dispatcher.on_after_prepared_statement_set(&mut query, 1, true, None);
    dispatcher.on_before_execute_query(&query).unwrap();
    dispatcher
        .on_after_execute_query(&query, Duration::from_millis(2), None)
        .unwrap();

    let mut rs = ResultSetInfo::new(&query);
    assert_eq!(
        rs.sql_with_values(),
        "SELECT id, name FROM users WHERE active = true"
    );

    let rows: [(i64, &str); 1] = [(1, "ann")];
    for (id, name) in rows {
        dispatcher.on_before_result_set_next(&rs).unwrap();
        dispatcher
            .on_after_result_set_next(&mut rs, Duration::from_micros(3), true, None)
            .unwrap();
        dispatcher
            .on_after_result_set_get(&mut rs, ColumnRef::Label("id"), id, None)
            .unwrap();
        dispatcher
            .on_after_result_set_get(&mut rs, ColumnRef::Label("name"), name, None)
            .unwrap();
    }
    assert_eq!(rs.row_string(), "id = 1, name = 'ann'");
    assert_eq!(rs.row_values()[1].1, BoundValue::from("ann"));

    dispatcher.on_before_result_set_next(&rs).unwrap();
    dispatcher
        .on_after_result_set_next(&mut rs, Duration::from_micros(3), false, None)
        .unwrap();
    dispatcher.on_after_result_set_close(&rs, None).unwrap();
    dispatcher.on_after_statement_close(&query, None).unwrap();
    dispatcher.on_after_connection_close(None).unwrap();

    assert_eq!(rs.current_row(), 0);

    let stats = h.stats.stats();
    assert_eq!(stats.batch_elements, 2);
    assert_eq!(stats.batches_executed, 1);
    assert_eq!(stats.insert_count, 1);
    assert_eq!(stats.select_count, 1);
    assert_eq!(stats.rows_affected, 2);
    assert_eq!(stats.rows_fetched, 1);
    assert_eq!(stats.slow_statements, 1);
    assert_eq!(stats.max_duration, Duration::from_millis(150));
}

#[test]
fn statement_snapshot_serializes_bindings() {
    let mut stmt = StatementInfo::callable("{call transfer(?, ?)}");
    stmt.set_parameter_value(1, 10);
    stmt.set_parameter_value(2, Option::<i64>::None);
    stmt.set_named_parameter_value("note", "rent");

    let json = stmt.to_json().unwrap();
    assert_eq!(json["sql_with_values"], "{call transfer(10, null)}");
    assert_eq!(json["kind"], "callable");
}
