use coil_lookup::spreadsheet::encode;
use coil_lookup::CellValue;
use coil_lookup::Config;
use coil_lookup::Dataset;
use coil_lookup::ErrorKind;
use coil_lookup::LoadStatus;
use coil_lookup::LoaderSession;
use coil_lookup::Row;
use coil_lookup::SourceKind;
use httpmock::prelude::*;
use std::path::Path;

fn workbook(coils: &[&str]) -> Vec<u8> {
    let rows = coils
        .iter()
        .enumerate()
        .map(|(index, coil)| {
            Row::from([
                ("MILL COIL NO", CellValue::from(*coil)),
                ("GRADE", CellValue::from("S355")),
                ("WEIGHT (T)", CellValue::Number(20.0 + index as f64)),
            ])
        })
        .collect();
    encode(&Dataset::new(rows, "coil-data.xlsx", SourceKind::Remote), "Coil Data").unwrap()
}

fn config(url: String, cache: &Path) -> Config {
    Config {
        remote_url: url,
        cache_path: Some(cache.to_path_buf()),
        timeout_secs: 5,
        ..Config::default()
    }
}

#[test]
fn remote_load_is_cached_for_next_run() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/main/coil-data.xlsx")
            .query_param_exists("t");
        then.status(200)
            .header("content-type", "application/octet-stream")
            .body(workbook(&["C100", "C101", "C200"]));
    });
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache.duckdb");

    {
        let mut session = LoaderSession::from_config(config(server.url("/main/coil-data.xlsx"), &cache)).unwrap();
        assert_eq!(session.startup().to_string(), "Loaded File (from remote): coil-data.xlsx");
        let row = session.lookup(" c101 ").unwrap();
        assert_eq!(row.get("WEIGHT (T)"), Some(&CellValue::Number(21.0)));
        assert_eq!(session.suggest("c1", None), vec!["C100", "C101"]);
    }

    let mut session = LoaderSession::from_config(config(server.url("/main/coil-data.xlsx"), &cache)).unwrap();
    let status = session.startup().clone();
    assert_eq!(status, LoadStatus::Loaded {
        label: "coil-data.xlsx".to_owned(),
        kind: SourceKind::Cache,
        rows: 3,
    });
    assert!(session.lookup("C200").is_some());
    mock.assert_calls(1);
}

#[test]
fn failed_remote_leaves_cache_alone() {
    let server = MockServer::start();
    let mut ok = server.mock(|when, then| {
        when.method(GET)
            .path("/coil-data.xlsx");
        then.status(200)
            .body(workbook(&["C100"]));
    });
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache.duckdb");

    let mut session = LoaderSession::from_config(config(server.url("/coil-data.xlsx"), &cache)).unwrap();
    session.startup();
    ok.assert();
    ok.delete();

    server.mock(|when, then| {
        when.method(GET)
            .path("/coil-data.xlsx");
        then.status(500);
    });
    let error = session.load_remote().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Network);
    assert!(!session.status().export_enabled());
    assert!(session.lookup("C100").is_none());
    drop(session);

    let mut session = LoaderSession::from_config(config(server.url("/coil-data.xlsx"), &cache)).unwrap();
    assert_eq!(session.startup().to_string(), "Loaded from cache: coil-data.xlsx");
    assert!(session.lookup("c100").is_some());
}

#[test]
fn reset_then_start_refetches() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/coil-data.xlsx");
        then.status(200)
            .body(workbook(&["C100"]));
    });
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("state").join("cache.duckdb");

    let mut session = LoaderSession::from_config(config(server.url("/coil-data.xlsx"), &cache)).unwrap();
    session.startup();
    session.reset().unwrap();
    assert_eq!(session.status(), &LoadStatus::Idle);
    drop(session);

    let mut session = LoaderSession::from_config(config(server.url("/coil-data.xlsx"), &cache)).unwrap();
    assert!(matches!(session.startup(), LoadStatus::Loaded { kind: SourceKind::Remote, .. }));
    mock.assert_calls(2);
}

#[test]
fn local_file_then_export() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/coil-data.xlsx");
        then.status(404);
    });
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache.duckdb");
    let upload = dir.path().join("march coils.xlsx");
    std::fs::write(&upload, workbook(&["M1", "M2"])).unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let mut session = LoaderSession::from_config(config(server.url("/coil-data.xlsx"), &cache)).unwrap();
    assert!(matches!(session.startup(), LoadStatus::Failed { kind: ErrorKind::Network, source: SourceKind::Remote, .. }));
    assert_eq!(session.export(&out).unwrap_err().kind(), ErrorKind::Encode);

    session.load_local(&upload).unwrap();
    assert_eq!(session.status().to_string(), "Loaded File (from local upload): march coils.xlsx");
    assert!(session.lookup("m2").is_some());

    let path = session.export(&out).unwrap();
    assert_eq!(path, out.join("march coils.xlsx"));
    assert_eq!(std::fs::read(&path).unwrap()[..2], *b"PK");
}
