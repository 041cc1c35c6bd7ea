//! PostgreSQL 集成测试
//!
//! 通过环境变量 RAT_QUICKTABLE_PG_HOST / _PORT / _DB / _USER / _PASSWORD
//! 指定测试服务器；未设置或无法连接时跳过

use chrono::Utc;
use rat_quicktable::serializer::{render_header, render_table};
use rat_quicktable::types::{postgres_config, DataValue, SimplifiedType};
use rat_quicktable::{
    Column, QuickTableError, RowEditTracker, SchemaCatalog, Serializer, Session, TableMutator,
};

async fn pg_session() -> Option<Session> {
    let host = match std::env::var("RAT_QUICKTABLE_PG_HOST") {
        Ok(host) => host,
        Err(_) => {
            println!("⚠️ 未设置 RAT_QUICKTABLE_PG_HOST，跳过PostgreSQL测试");
            return None;
        }
    };
    let port = std::env::var("RAT_QUICKTABLE_PG_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5432);
    let database = std::env::var("RAT_QUICKTABLE_PG_DB").unwrap_or_else(|_| "testdb".to_string());
    let username =
        std::env::var("RAT_QUICKTABLE_PG_USER").unwrap_or_else(|_| "postgres".to_string());
    let password = std::env::var("RAT_QUICKTABLE_PG_PASSWORD").unwrap_or_default();

    let config = postgres_config(host, port, database, username, password)
        .expect("PostgreSQL测试配置无效");
    match Session::open(config).await {
        Ok(session) => Some(session),
        Err(e) => {
            println!("⚠️ PostgreSQL服务器未运行或连接超时，跳过测试: {}", e);
            None
        }
    }
}

fn text(value: &str) -> DataValue {
    DataValue::Text(value.to_string())
}

#[tokio::test]
async fn test_postgresql_mixed_key_round_trip() {
    let Some(session) = pg_session().await else {
        return;
    };
    let table = "qt_test_edition";
    let mutator = TableMutator::new(&session);
    let catalog = SchemaCatalog::new(&session);
    let serializer = Serializer::new(&session);

    mutator.drop_table(table).await.unwrap();
    mutator
        .create_table(
            table,
            &[
                Column::identity("id").primary_key(),
                Column::text("isbn").primary_key(),
                Column::text("title"),
                Column::int("year"),
            ],
        )
        .await
        .unwrap();

    let columns = catalog.get_columns(table).await.unwrap();
    let flags: Vec<_> = columns
        .iter()
        .map(|c| (c.name.as_str(), c.is_primary_key, c.is_identity, c.simplified_type))
        .collect();
    assert_eq!(
        flags,
        vec![
            ("id", true, true, SimplifiedType::Int),
            ("isbn", true, false, SimplifiedType::Text),
            ("title", false, false, SimplifiedType::Text),
            ("year", false, false, SimplifiedType::Int),
        ]
    );
    assert_eq!(columns[3].full_type, "bigint");

    mutator
        .insert_row(table, &[DataValue::Null, text("978-0441"), text("Dune"), text("1965")])
        .await
        .unwrap();
    mutator
        .insert_row(table, &[DataValue::Null, text("978-0141"), text("O'Brien"), DataValue::Null])
        .await
        .unwrap();

    let exported = serializer.export_table(table).await.unwrap();
    assert_eq!(exported.data[0][3], DataValue::Int(1965));

    mutator.drop_table(table).await.unwrap();
    serializer.import_table(&exported).await.unwrap();
    assert_eq!(serializer.export_table(table).await.unwrap(), exported);

    // 导入后自增列从 max + 1 继续
    mutator
        .insert_row(table, &[DataValue::Null, text("978-0007"), text("Emma"), DataValue::Null])
        .await
        .unwrap();
    let result = session
        .execute_query(&format!("SELECT id FROM \"{}\" WHERE isbn = '978-0007'", table))
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec![DataValue::Int(3)]]);

    mutator.drop_table(table).await.unwrap();
    session.close().await;
}

#[tokio::test]
async fn test_postgresql_primary_key_edit_and_type_change() {
    let Some(session) = pg_session().await else {
        return;
    };
    let table = "qt_test_book";
    let mutator = TableMutator::new(&session);
    let catalog = SchemaCatalog::new(&session);

    mutator.drop_table(table).await.unwrap();
    mutator
        .create_table(
            table,
            &[
                Column::text("isbn").primary_key(),
                Column::text("title"),
                Column::text("year"),
            ],
        )
        .await
        .unwrap();
    mutator
        .insert_row(table, &[text("111"), text("Dune"), text("1965")])
        .await
        .unwrap();

    let schema = catalog.table(table).await.unwrap();
    let mut tracker = RowEditTracker::new();
    let mut row = vec![text("111"), text("Dune"), text("1965")];
    tracker.begin_edit(0, &row, &schema).unwrap();
    row[0] = text("222");
    mutator
        .apply_cell_edit(table, &mut tracker, 0, &row, 0)
        .await
        .unwrap();
    assert_eq!(catalog.table_data(table).await.unwrap(), vec![row.clone()]);

    mutator
        .change_column_type(table, "year", "integer")
        .await
        .unwrap();
    let columns = catalog.get_columns(table).await.unwrap();
    assert_eq!(columns[2].simplified_type, SimplifiedType::Int);
    assert_eq!(
        catalog.table_data(table).await.unwrap()[0][2],
        DataValue::Int(1965)
    );

    let err = mutator
        .change_column_type(table, "year", "integer; DROP TABLE x")
        .await
        .unwrap_err();
    assert!(matches!(err, QuickTableError::ValidationError { .. }));

    mutator.drop_table(table).await.unwrap();
    session.close().await;
}

#[tokio::test]
async fn test_postgresql_bounded_text_is_not_truncated() {
    let Some(session) = pg_session().await else {
        return;
    };
    let table = "qt_test_code";
    let mutator = TableMutator::new(&session);
    let catalog = SchemaCatalog::new(&session);

    mutator.drop_table(table).await.unwrap();
    mutator
        .create_table(
            table,
            &[
                Column::text("code").with_full_type("varchar(5)").primary_key(),
                Column::text("label"),
            ],
        )
        .await
        .unwrap();
    mutator
        .insert_row(table, &[text("abcde"), text("kept")])
        .await
        .unwrap();

    // 超长的值由列自身报错，不会被截断后写入
    let err = mutator
        .insert_row(table, &[text("abcdefgh"), DataValue::Null])
        .await
        .unwrap_err();
    assert!(matches!(err, QuickTableError::EngineError { .. }));

    // 超长的主键不能匹配到截断后相同的行
    assert_eq!(mutator.delete_row(table, &[text("abcdefgh")]).await.unwrap(), 0);
    assert_eq!(
        mutator
            .update_cell(table, "label", &text("changed"), &[text("abcdefgh")])
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        catalog.table_data(table).await.unwrap(),
        vec![vec![text("abcde"), text("kept")]]
    );

    mutator.drop_table(table).await.unwrap();
    session.close().await;
}

#[tokio::test]
async fn test_postgresql_query_decodes_common_types() {
    let Some(session) = pg_session().await else {
        return;
    };

    let result = session
        .execute_query(
            "SELECT 1.5::numeric AS n, DATE '2024-01-02' AS d, \
             TIMESTAMP '2024-01-02 03:04:05' AS ts, \
             'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11'::uuid AS u, \
             '{\"a\": 1}'::jsonb AS j, 0.1::real AS r, 'x'::text AS t",
        )
        .await
        .unwrap();
    assert_eq!(result.headers, vec!["n", "d", "ts", "u", "j", "r", "t"]);
    assert_eq!(
        result.rows,
        vec![vec![
            text("1.5"),
            text("2024-01-02"),
            text("2024-01-02 03:04:05"),
            text("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11"),
            text("{\"a\":1}"),
            DataValue::Float(0.1),
            text("x"),
        ]]
    );

    let table = "qt_test_measure";
    let mutator = TableMutator::new(&session);
    mutator.drop_table(table).await.unwrap();
    session
        .execute_non_query(
            "CREATE TABLE qt_test_measure (id integer PRIMARY KEY, weight real, taken date)",
        )
        .await
        .unwrap();
    mutator
        .insert_row(table, &[DataValue::Int(1), text("0.1"), text("2024-01-02")])
        .await
        .unwrap();
    assert_eq!(
        SchemaCatalog::new(&session).table_data(table).await.unwrap(),
        vec![vec![DataValue::Int(1), DataValue::Float(0.1), text("2024-01-02")]]
    );

    mutator.drop_table(table).await.unwrap();
    session.close().await;
}

#[tokio::test]
async fn test_postgresql_generated_identity_key_change() {
    let Some(session) = pg_session().await else {
        return;
    };
    let table = "qt_test_ticket";
    let mutator = TableMutator::new(&session);
    let catalog = SchemaCatalog::new(&session);

    mutator.drop_table(table).await.unwrap();
    session
        .execute_non_query(
            "CREATE TABLE qt_test_ticket (id integer GENERATED ALWAYS AS IDENTITY, \
             code text, subject text, PRIMARY KEY (id, code))",
        )
        .await
        .unwrap();
    assert!(catalog.get_columns(table).await.unwrap()[0].is_identity);

    mutator
        .insert_row(table, &[DataValue::Null, text("a"), text("printer")])
        .await
        .unwrap();
    mutator
        .change_primary_key(
            table,
            &[DataValue::Int(1), text("a")],
            &[DataValue::Int(1), text("b"), text("printer")],
        )
        .await
        .unwrap();
    assert_eq!(
        catalog.table_data(table).await.unwrap(),
        vec![vec![DataValue::Int(1), text("b"), text("printer")]]
    );

    mutator
        .insert_row(table, &[DataValue::Null, text("c"), text("network")])
        .await
        .unwrap();
    let result = session
        .execute_query("SELECT id FROM qt_test_ticket WHERE code = 'c'")
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec![DataValue::Int(2)]]);

    mutator.drop_table(table).await.unwrap();
    session.close().await;
}

#[tokio::test]
async fn test_postgresql_dump_replays_as_one_statement() {
    let Some(session) = pg_session().await else {
        return;
    };
    let table = "qt_test_shelf";
    let mutator = TableMutator::new(&session);
    let catalog = SchemaCatalog::new(&session);
    let serializer = Serializer::new(&session);

    mutator.drop_table(table).await.unwrap();
    mutator
        .create_table(
            table,
            &[
                Column::identity("id").primary_key(),
                Column::text("label"),
                Column::int("rank"),
            ],
        )
        .await
        .unwrap();
    mutator
        .insert_row(table, &[DataValue::Null, text("O'Brien"), DataValue::Int(2)])
        .await
        .unwrap();
    mutator
        .insert_row(table, &[DataValue::Null, text("a;b"), DataValue::Null])
        .await
        .unwrap();

    let schema = catalog.table(table).await.unwrap();
    let rows = catalog.table_data(table).await.unwrap();
    let script = format!(
        "{}{}",
        render_header(Utc::now()),
        render_table(&session.query_builder(), &schema, &rows).unwrap()
    );
    let before = serializer.export_table(table).await.unwrap();

    mutator.drop_table(table).await.unwrap();
    session.execute_non_query(&script).await.unwrap();
    assert_eq!(serializer.export_table(table).await.unwrap(), before);

    mutator.drop_table(table).await.unwrap();
    session.close().await;
}
