#![allow(dead_code)]

use std::io::{Cursor, Write};

use serde_json::{json, Value};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use sli_load_core::contract::{HttpMethod, HttpResponse, MockHttpTransport};
use sli_load_core::session::SessionContext;

pub const PROJECT: &str = "p1";
pub const DATASET: &str = "dataset.sales";
pub const USERNAME: &str = "loader@example.com";
pub const SECRET: &str = "s3cret";

pub fn ok_json(body: Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        set_cookies: vec![],
        body: serde_json::to_vec(&body).unwrap(),
    }
}

pub fn ok_bytes(body: Vec<u8>) -> HttpResponse {
    HttpResponse {
        status: 200,
        set_cookies: vec![],
        body,
    }
}

pub fn with_cookies(cookies: &[&str]) -> HttpResponse {
    HttpResponse {
        status: 200,
        set_cookies: cookies.iter().map(|c| c.to_string()).collect(),
        body: b"{}".to_vec(),
    }
}

/// Answer every request with `method` on `path` with `response`.
pub fn expect_path(
    http: &mut MockHttpTransport,
    method: HttpMethod,
    path: &str,
    response: HttpResponse,
) {
    let path = path.to_string();
    http.expect_send()
        .withf(move |req| req.method == method && req.path == path)
        .returning(move |_| Ok(response.clone()));
}

/// Successful login: auth cookie on the login call, security token on the token call.
pub fn expect_login(http: &mut MockHttpTransport) {
    expect_path(
        http,
        HttpMethod::Post,
        "/gdc/account/login",
        with_cookies(&["GDCAuthSST=sst-1; path=/gdc/account; HttpOnly"]),
    );
    expect_path(
        http,
        HttpMethod::Get,
        "/gdc/account/token",
        with_cookies(&["GDCAuthTT=tt-1; path=/gdc; HttpOnly"]),
    );
}

/// Identifier lookup plus object fetch for one column's `populates` entry.
pub fn expect_object(http: &mut MockHttpTransport, identifier: &str, object_id: u32, title: &str) {
    let uri = format!("/gdc/md/{PROJECT}/obj/{object_id}");
    let id = identifier.to_string();
    let lookup = ok_json(json!({
        "identifiers": [{ "identifier": identifier, "uri": uri }]
    }));
    http.expect_send()
        .withf(move |req| {
            req.method == HttpMethod::Post
                && req.path == format!("/gdc/md/{PROJECT}/identifiers")
                && req.body == Some(json!({ "identifierToUri": [id] }))
        })
        .returning(move |_| Ok(lookup.clone()));
    expect_path(
        http,
        HttpMethod::Get,
        &uri,
        ok_json(json!({
            "attribute": {
                "meta": {
                    "title": title,
                    "uri": uri,
                    "category": "attribute",
                    "identifier": identifier,
                    "author": "/gdc/account/profile/1"
                },
                "content": {}
            }
        })),
    );
}

pub fn template_path() -> String {
    format!("/gdc/md/{PROJECT}/ldm/singleloadinterface/{DATASET}/template")
}

pub fn upload_info(columns: &[(&str, &str)]) -> Value {
    let parts: Vec<Value> = columns
        .iter()
        .enumerate()
        .map(|(i, (name, populates))| {
            json!({
                "columnName": name,
                "populates": [populates],
                "mode": "FULL",
                "referenceKey": i == 0
            })
        })
        .collect();
    json!({
        "dataSetSLIManifest": {
            "parts": parts,
            "file": format!("{DATASET}.csv"),
            "dataSet": DATASET,
            "csvParams": { "quoteChar": "\"", "separatorChar": "," }
        }
    })
}

/// Zip bytes of an SLI template. `None` leaves the entry out.
pub fn template_zip(upload_info: Option<&Value>, column_line: Option<&str>) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    if let Some(info) = upload_info {
        writer.start_file("upload_info.json", options).unwrap();
        writer
            .write_all(serde_json::to_string_pretty(info).unwrap().as_bytes())
            .unwrap();
    }
    if let Some(line) = column_line {
        writer.start_file(format!("{DATASET}.csv"), options).unwrap();
        writer.write_all(line.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// The two-column sales template with resolvable columns.
pub fn expect_sales_template(http: &mut MockHttpTransport) {
    let info = upload_info(&[("name", "label.sales.name"), ("amount", "fact.sales.amount")]);
    expect_path(
        http,
        HttpMethod::Get,
        &template_path(),
        ok_bytes(template_zip(Some(&info), Some("name,amount\n"))),
    );
    expect_object(http, "label.sales.name", 11, "Name");
    expect_object(http, "fact.sales.amount", 12, "Amount");
}

pub async fn logged_in(http: MockHttpTransport) -> SessionContext<MockHttpTransport> {
    let mut ctx = SessionContext::new(http);
    ctx.login(USERNAME, SECRET).await.unwrap();
    ctx.set_project(PROJECT);
    ctx
}

pub fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect()
}
