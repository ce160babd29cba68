use serde_json::json;
use tempfile::TempDir;

use scrapewatch::api::models::{JobResults, ScrapeResult};
use scrapewatch::export::{ExportError, csv_filename, write_csv};

fn results_payload() -> JobResults {
    serde_json::from_value(json!({
        "job": {"_id": "65f1c0de9a1b", "status": "completed", "results_count": 2},
        "results": [
            {
                "title": "Dev",
                "company": "Acme, Inc.",
                "location": "",
                "contact_info": {"email": "a@b.com"},
                "url": "http://x",
                "description": "Has \"quotes\""
            },
            {
                "url": "https://example.com/jobs/2",
                "data": {"title": "Ops", "company": "Globex"},
                "contact_info": {"phone": ["+1 555 0100"]}
            }
        ]
    }))
    .unwrap()
}

#[test]
fn writes_named_csv_file() {
    let dir = TempDir::new().unwrap();
    let payload = results_payload();

    let path = write_csv("65f1c0de9a1b", &payload.results, dir.path()).unwrap();
    assert_eq!(path, dir.path().join("scraping_results_65f1c0de9a1b.csv"));

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Title,Company,Location,Email,Phone,URL,Description");
    assert_eq!(
        lines[1],
        r#""Dev","Acme, Inc.","","a@b.com","","http://x","Has ""quotes""""#
    );
    assert_eq!(
        lines[2],
        r#""Ops","Globex","","","+1 555 0100","https://example.com/jobs/2","""#
    );
}

#[test]
fn empty_result_set_creates_no_file() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("exports");
    let empty: Vec<ScrapeResult> = Vec::new();

    let err = write_csv("job-empty", &empty, &target).unwrap_err();
    assert!(matches!(err, ExportError::NothingToExport));
    assert_eq!(err.to_string(), "No results to export");
    assert!(!target.join(csv_filename("job-empty")).exists());
    assert!(!target.exists());
}
