//! Integration tests for pmjson-medline
//!
//! Each test builds a small input directory of MEDLINE XML (plain and
//! gzipped) and runs the full pipeline against it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use flate2::Compression;
use flate2::write::GzEncoder;
use pmjson_core::ProgressContext;
use pmjson_medline::{Config, Summary, run_until};
use serde_json::Value;
use tempfile::TempDir;

const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2025//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_250101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">1001</PMID>
      <DateCompleted><Year>2020</Year><Month>03</Month><Day>15</Day></DateCompleted>
      <Article PubModel="Print">
        <Journal><Title>Journal of Testing</Title></Journal>
        <ArticleTitle>Streaming parsers &amp; you</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">First part.</AbstractText>
          <AbstractText Label="RESULTS">Second part.</AbstractText>
        </Abstract>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y"><LastName>Smith</LastName><ForeName>Jane</ForeName></Author>
          <Author ValidYN="Y"><CollectiveName>Test Consortium</CollectiveName></Author>
        </AuthorList>
        <KeywordList Owner="NOTNLM"><Keyword MajorTopicYN="N">xml  parsing</Keyword></KeywordList>
      </Article>
      <MeshHeadingList>
        <MeshHeading><DescriptorName UI="D000001" MajorTopicYN="N">Calcimycin</DescriptorName></MeshHeading>
      </MeshHeadingList>
      <KeywordList Owner="NOTNLM"><Keyword MajorTopicYN="N">bulk index</Keyword></KeywordList>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <Article PubModel="Print">
        <Journal><Title>Journal Without Ids</Title></Journal>
        <ArticleTitle>Dropped</ArticleTitle>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>
"#;

const GZ_XML: &str = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>2002</PMID>
      <Article>
        <Journal><Title>Compressed Journal</Title></Journal>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>
"#;

fn write_gz(path: &Path, content: &str) {
    let file = fs::File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

/// `input/` with medsample1.xml and medsample2.xml.gz under a fresh tempdir
fn sample_input() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let input = dir.path().join("input");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("medsample1.xml"), SAMPLE_XML).unwrap();
    write_gz(&input.join("medsample2.xml.gz"), GZ_XML);
    (dir, input)
}

fn run_into(input: &Path, output: &Path, workers: usize) -> Summary {
    let config = Config {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        workers: Some(workers),
        ..Default::default()
    };
    let stop = AtomicBool::new(false);
    run_until(&config, &ProgressContext::with_tty(false), &stop).expect("Pipeline should succeed")
}

fn read_lines(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("{}: {e}", path.display()))
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn converts_plain_and_gzip_inputs() {
    let (dir, input) = sample_input();
    let output = dir.path().join("output");

    let summary = run_into(&input, &output, 2);

    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.completed_files, 2);
    assert_eq!(summary.failed_files, 0);
    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.records_skipped, 1);
    assert_eq!(summary.progress_events, 2);

    let first = read_lines(&output.join("medsample1.json"));
    assert_eq!(first.len(), 2);
    assert_eq!(
        first[0],
        serde_json::json!({"index": {"_index": "pubmed", "_id": "1001"}})
    );

    let doc = &first[1];
    assert_eq!(doc.as_object().unwrap().len(), 8);
    assert_eq!(doc["PMID"], "1001");
    assert_eq!(doc["PublishedDate"], "2020-03-15");
    assert_eq!(doc["Title"], "Streaming parsers & you");
    assert_eq!(doc["Abstract"], "First part. Second part.");
    assert_eq!(doc["Journal"], "Journal of Testing");
    assert_eq!(
        doc["Authors"],
        serde_json::json!(["Jane Smith", "Test Consortium"])
    );
    assert_eq!(doc["MeSH"], serde_json::json!(["D000001"]));
    assert_eq!(
        doc["Keywords"],
        serde_json::json!(["xml parsing", "bulk index"])
    );

    let second = read_lines(&output.join("medsample2.json"));
    assert_eq!(second.len(), 2);
    assert_eq!(second[0]["index"]["_id"], "2002");
    assert_eq!(second[1]["Title"], "No Title");
    assert_eq!(second[1]["PublishedDate"], Value::Null);
    assert_eq!(second[1]["Abstract"], "");
    assert_eq!(second[1]["Authors"], serde_json::json!([]));
}

#[test]
fn pool_size_does_not_change_output() {
    let (dir, input) = sample_input();
    fs::write(input.join("medsample3.xml"), SAMPLE_XML).unwrap();

    let single = dir.path().join("single");
    let many = dir.path().join("many");
    run_into(&input, &single, 1);
    run_into(&input, &many, 4);

    for name in ["medsample1.json", "medsample2.json", "medsample3.json"] {
        assert_eq!(
            fs::read(single.join(name)).unwrap(),
            fs::read(many.join(name)).unwrap(),
            "{name} differs between pool sizes"
        );
    }
}

#[test]
fn rerun_replaces_previous_output() {
    let (dir, input) = sample_input();
    let output = dir.path().join("output");
    fs::create_dir(&output).unwrap();
    fs::write(output.join("medsample1.json"), "left over from an old run\n").unwrap();
    fs::write(output.join("medsample2.json.tmp"), "interrupted\n").unwrap();

    run_into(&input, &output, 2);
    let first = fs::read(output.join("medsample1.json")).unwrap();
    run_into(&input, &output, 2);
    let second = fs::read(output.join("medsample1.json")).unwrap();

    assert_eq!(first, second);
    assert!(!String::from_utf8(first).unwrap().contains("left over"));
    assert!(!output.join("medsample2.json.tmp").exists());
}

#[test]
fn malformed_file_does_not_stop_others() {
    let (dir, input) = sample_input();
    fs::write(
        input.join("broken.xml"),
        "<PubmedArticleSet><PubmedArticle><MedlineCitation><PMID>9</PMID>",
    )
    .unwrap();
    let output = dir.path().join("output");

    let summary = run_into(&input, &output, 2);

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.completed_files, 2);
    assert_eq!(summary.failed_files, 1);
    assert_eq!(summary.progress_events, 3);
    assert!(!output.join("broken.json").exists());
    assert!(output.join("medsample1.json").exists());
    assert!(output.join("medsample2.json").exists());
}

#[test]
fn truncated_gzip_fails_only_its_own_file() {
    let (dir, input) = sample_input();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(SAMPLE_XML.as_bytes()).unwrap();
    let bytes = encoder.finish().unwrap();
    fs::write(input.join("cut.xml.gz"), &bytes[..bytes.len() / 2]).unwrap();
    let output = dir.path().join("output");
    fs::create_dir(&output).unwrap();
    fs::write(output.join("cut.json"), "from an earlier run\n").unwrap();

    let summary = run_into(&input, &output, 2);

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.completed_files, 2);
    assert_eq!(summary.failed_files, 1);
    assert!(!output.join("cut.json").exists());
    assert!(!output.join("cut.json.tmp").exists());
    assert_eq!(read_lines(&output.join("medsample1.json")).len(), 2);
    assert_eq!(read_lines(&output.join("medsample2.json")).len(), 2);
}

#[test]
fn foreign_tmp_files_in_output_survive() {
    let (dir, input) = sample_input();
    let output = dir.path().join("output");
    fs::create_dir(&output).unwrap();
    fs::write(output.join("user_notes.tmp"), "mine").unwrap();

    run_into(&input, &output, 1);

    assert_eq!(fs::read_to_string(output.join("user_notes.tmp")).unwrap(), "mine");
}

#[test]
fn ignores_other_extensions_and_subdirectories() {
    let (dir, input) = sample_input();
    fs::write(input.join("README.txt"), "not xml").unwrap();
    fs::create_dir(input.join("nested")).unwrap();
    fs::write(input.join("nested/deep.xml"), SAMPLE_XML).unwrap();
    let output = dir.path().join("output");

    let summary = run_into(&input, &output, 1);

    assert_eq!(summary.total_files, 2);
    let mut produced: Vec<String> = fs::read_dir(&output)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    produced.sort();
    assert_eq!(produced, ["medsample1.json", "medsample2.json"]);
}

#[test]
fn empty_citation_file_yields_empty_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("empty.xml"), "<PubmedArticleSet></PubmedArticleSet>").unwrap();
    let output = dir.path().join("output");

    let summary = run_into(&input, &output, 1);

    assert_eq!(summary.completed_files, 1);
    assert_eq!(summary.records_written, 0);
    assert_eq!(fs::read_to_string(output.join("empty.json")).unwrap(), "");
}
