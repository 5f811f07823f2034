use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use coauthor_graph::{
    find_input_files, read_publications, GraphBuilder, GraphError, OTHER_COUNTRY, UNKNOWN_COUNTRY,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use tempfile::TempDir;

const HEADER: &str = "Authors,Title,Year,Authors with affiliations,Source title\n";

fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut content = String::from(HEADER);
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

fn run(patterns: &[String], output: &Path) -> Value {
    let mut publications = Vec::new();
    for path in find_input_files(patterns).unwrap() {
        publications.extend(read_publications(&path, b',').unwrap());
    }
    let (graph, _) = GraphBuilder::new().build(&publications).unwrap();
    graph.save(output).unwrap();
    serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap()
}

fn names(doc: &Value) -> Vec<&str> {
    doc["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect()
}

#[test]
fn scopus_export_to_graph() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(
        dir.path(),
        "data_scopus.csv",
        &[
            r#""Smith J., Doe A.",Paper one,2020,"Smith J., Dept X, USA; Doe A., Dept Y, India",J1"#,
            r#""Lee K.",Paper two,2021,"Lee K., UnknownPlace",J2"#,
            r#""Nobody N.",Paper three,2021,,J3"#,
        ],
    );
    let output = dir.path().join("out").join("graph.json");

    let doc = run(&[input.to_string_lossy().into_owned()], &output);

    assert_eq!(names(&doc), vec!["smith j.", "doe a.", "lee k."]);
    assert_eq!(doc["nodes"][0]["country"], "USA");
    assert_eq!(doc["nodes"][0]["affiliation"], "Smith J., Dept X, USA");
    assert_eq!(doc["nodes"][1]["country"], "India");
    // "Lee K., UnknownPlace" has a comma, so the country is the trailing text
    assert_eq!(doc["nodes"][2]["country"], "UnknownPlace");

    let links = doc["links"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["source"], "smith j.");
    assert_eq!(links[0]["target"], "doe a.");
}

#[test]
fn affiliation_without_comma_is_unknown_country() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(dir.path(), "a.csv", &[r#"Lee K.,T,2021,UnknownPlace,J"#]);
    let output = dir.path().join("graph.json");

    let doc = run(&[input.to_string_lossy().into_owned()], &output);
    assert_eq!(doc["nodes"][0]["country"], UNKNOWN_COUNTRY);
}

#[test]
fn every_country_is_top_ten_or_other() {
    let dir = TempDir::new().unwrap();
    let countries = [
        "USA", "India", "China", "Japan", "France", "Spain", "Italy", "Chile", "Peru", "Kenya",
        "Ghana", "Nepal",
    ];
    let rows: Vec<String> = countries
        .iter()
        .enumerate()
        .map(|(i, country)| {
            // USA and India appear twice so the ranking is not all ties
            let repeat = if i < 2 { 2 } else { 1 };
            let authors: Vec<String> = (0..repeat).map(|r| format!("A{i}-{r}")).collect();
            let affiliations: Vec<String> = authors
                .iter()
                .map(|a| format!("{a}, Lab, {country}"))
                .collect();
            format!(
                "\"{}\",T,2020,\"{}\",J",
                authors.join(", "),
                affiliations.join("; ")
            )
        })
        .collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let input = write_csv(dir.path(), "countries.csv", &rows);
    let output = dir.path().join("graph.json");

    let doc = run(&[input.to_string_lossy().into_owned()], &output);

    let reported: Vec<&str> = doc["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["country"].as_str().unwrap())
        .collect();
    assert_eq!(reported.len(), 14);
    assert!(reported
        .iter()
        .all(|c| countries[..10].contains(c) || *c == OTHER_COUNTRY));
    // the last two single-occurrence countries fall outside the first ten seen
    assert_eq!(&reported[12..], &[OTHER_COUNTRY, OTHER_COUNTRY]);
}

#[test]
fn repeated_collaboration_keeps_every_link() {
    let dir = TempDir::new().unwrap();
    let row = r#""Smith J., Doe A.",T,2020,"Smith J., X, USA; Doe A., Y, USA",J"#;
    let input = write_csv(dir.path(), "a.csv", &[row, row, row]);
    let output = dir.path().join("graph.json");

    let doc = run(&[input.to_string_lossy().into_owned()], &output);
    assert_eq!(doc["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(doc["links"].as_array().unwrap().len(), 3);
}

#[test]
fn output_is_byte_identical_across_runs() {
    let dir = TempDir::new().unwrap();
    let input = write_csv(
        dir.path(),
        "a.csv",
        &[
            r#""A. B., C. D., E. F.",T,2020,"A. B., X, USA; C. D., Y, Japan; E. F., Z, Chile",J"#,
            r#""C. D., G. H.",T,2021,"C. D., Y2, Japan; G. H., W, Brazil",J"#,
        ],
    );
    let patterns = vec![input.to_string_lossy().into_owned()];
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");

    run(&patterns, &first);
    run(&patterns, &second);

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn glob_expands_in_sorted_order_and_reads_gzip() {
    let dir = TempDir::new().unwrap();
    write_csv(
        dir.path(),
        "export_2.csv",
        &[r#""Smith J.",T,2021,"Smith J., New Lab, Canada",J"#],
    );

    let gz_path = dir.path().join("export_1.csv.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&gz_path).unwrap(), Compression::default());
    encoder.write_all(HEADER.as_bytes()).unwrap();
    encoder
        .write_all(b"\"Smith J., Doe A.\",T,2020,\"Smith J., Old Lab, USA; Doe A., Y, India\",J\n")
        .unwrap();
    encoder.finish().unwrap();

    let pattern = format!("{}/export_*", dir.path().display());
    let files = find_input_files(&[pattern.clone()]).unwrap();
    assert_eq!(files, vec![gz_path, dir.path().join("export_2.csv")]);

    let output = dir.path().join("graph.json");
    let doc = run(&[pattern], &output);

    assert_eq!(names(&doc), vec!["smith j.", "doe a."]);
    // export_2 is read last, so its affiliation wins
    assert_eq!(doc["nodes"][0]["affiliation"], "Smith J., New Lab, Canada");
}

#[test]
fn empty_files_are_skipped_and_no_match_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("empty.csv"), "").unwrap();

    let pattern = format!("{}/*.csv", dir.path().display());
    let err = find_input_files(&[pattern]).unwrap_err();
    assert!(matches!(err, GraphError::NoInputFiles(_)));
}
