//! End-to-end extraction against an in-memory SQLite database.

use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use wex::output::DelimitedWriter;
use wex::prelude::*;
use wex::settings::{OutputFormat, OutputSettings};

fn schema() -> Schema {
    Schema::from_rows([
        ("main", "people", "id", "integer"),
        ("main", "people", "name", "text"),
        ("main", "people", "born", "integer"),
    ])
}

async fn warehouse() -> Warehouse {
    let wh = Warehouse::connect("sqlite::memory:", 1)
        .await
        .expect("connect to in-memory sqlite");
    wh.execute("create table people (id integer, name text, born integer)")
        .await
        .unwrap();
    wh.execute(
        "insert into people values (1, 'Ada', 2020), (2, 'Grace, B.', 2021), (3, null, 2021)",
    )
    .await
    .unwrap();
    wh
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wex-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[tokio::test]
async fn test_extract_streams_rows_into_sink() {
    let wh = warehouse().await;
    let schema = schema();
    let mut b = QueryBuilder::new(&schema);
    b.set_database("main").add_table("people");
    b.add_all_known_columns_except("people", &["born"]);
    let query = b.build_queries().remove(0);
    assert_eq!(query.sql, "select a.id, a.name from main.people a;");

    let mut sink = DelimitedWriter::new(Vec::new(), ',', "NULL", true);
    let rows = wh.extract(&query, &mut sink).await.unwrap();
    assert_eq!(rows, 3);

    let text = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(text, "id,name\n1,Ada\n2,\"Grace, B.\"\n3,NULL\n");
}

#[tokio::test]
async fn test_runner_writes_one_file_per_slice() {
    let wh = warehouse().await;
    let schema = schema();
    let mut b = QueryBuilder::new(&schema);
    b.set_database("main")
        .set_dataset_name("crew")
        .add_table("people")
        .add_column("people", "name")
        .set_year_slice(YearSlice::fixed("born", 2020, 2021));
    let queries = b.build_queries();
    assert_eq!(queries.len(), 2);

    let dir = scratch_dir("slices");
    let output = OutputSettings {
        directory: dir.clone(),
        format: OutputFormat::Jsonl,
        ..OutputSettings::default()
    };
    let report = Runner::new(wh, output, 2).run(queries).await.unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.total_rows(), 3);
    assert_eq!(report.outcomes[0].label, "crew/people[2020]");

    let first = fs::read_to_string(dir.join("crew_people_2020.jsonl")).unwrap();
    assert_eq!(first, "{\"name\":\"Ada\"}\n");
    let second = fs::read_to_string(dir.join("crew_people_2021.jsonl")).unwrap();
    assert_eq!(second, "{\"name\":\"Grace, B.\"}\n{\"name\":null}\n");

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_failed_statement_does_not_stop_the_run() {
    let wh = warehouse().await;
    let schema = schema();
    let mut b = QueryBuilder::new(&schema);

    b.set_database("main").add_table("missing").add_column("missing", "id");
    let mut queries = b.build_queries();
    b.set_database("main").add_table("people").add_column("people", "id");
    queries.extend(b.build_queries());

    let dir = scratch_dir("failure");
    let output = OutputSettings {
        directory: dir.clone(),
        ..OutputSettings::default()
    };
    let report = Runner::new(wh, output, 1).run(queries).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.succeeded(), 1);
    assert!(report.outcomes[0].error.is_some());
    assert_eq!(report.outcomes[1].rows, 3);

    let text = fs::read_to_string(dir.join("people.csv")).unwrap();
    assert_eq!(text, "id\n1\n2\n3\n");

    report.save(dir.join("report.json")).unwrap();
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("report.json")).unwrap()).unwrap();
    assert_eq!(saved["outcomes"].as_array().unwrap().len(), 2);

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_views_sharing_a_table_get_separate_files() {
    let wh = warehouse().await;
    let schema = schema();
    let mut b = QueryBuilder::new(&schema);

    let mut queries = Vec::new();
    for year in ["2020", "2021"] {
        b.set_database("main")
            .set_dataset_name("crew")
            .add_table("people")
            .add_column("people", "id");
        b.start_or_group()
            .add_where("people", "born", [year], Operator::Eq, ValueKind::Numeric)
            .end_or_group();
        queries.extend(b.build_queries());
    }

    let dir = scratch_dir("shared-stem");
    let output = OutputSettings {
        directory: dir.clone(),
        ..OutputSettings::default()
    };
    let report = Runner::new(wh, output, 2).run(queries).await.unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.outcomes[0].path, dir.join("crew_people.csv"));
    assert_eq!(report.outcomes[1].path, dir.join("crew_people_2.csv"));
    assert_eq!(fs::read_to_string(dir.join("crew_people.csv")).unwrap(), "id\n1\n");
    assert_eq!(
        fs::read_to_string(dir.join("crew_people_2.csv")).unwrap(),
        "id\n2\n3\n"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_blob_cells_are_hex_encoded() {
    let wh = warehouse().await;
    wh.execute("create table files (id integer, payload blob)")
        .await
        .unwrap();
    wh.execute("insert into files values (1, x'00ff'), (2, null)")
        .await
        .unwrap();

    let schema = Schema::from_rows([
        ("main", "files", "id", "integer"),
        ("main", "files", "payload", "blob"),
    ]);
    let mut b = QueryBuilder::new(&schema);
    b.set_database("main").add_table("files");
    b.add_all_known_columns("files");
    let query = b.build_queries().remove(0);

    let mut sink = DelimitedWriter::new(Vec::new(), ',', "NULL", false);
    assert_eq!(wh.extract(&query, &mut sink).await.unwrap(), 2);
    let text = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(text, "1,00ff\n2,NULL\n");
}
