//! Integration tests for the ticketpdf CLI
//!
//! Runs the binary against a template built through the library and checks
//! output files and messages.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{tempdir, TempDir};
use ticket_pdf::text::{Font, StandardFont};
use ticket_pdf::{Dictionary, Document, Object, Stream, WriterConfig};

const CONTENT: &[u8] = b"q 150 0 0 100 10 10 cm /Plan Do Q\n\
BT /F1 10 Tf 1 0 0 1 220 200 Tm (Datum:) Tj ET\n\
BT /F1 10 Tf 1 0 0 1 220 170 Tm (Platz) Tj ET\n";

const BOOKING: &str = r##"{
    "veranstaltung": {"name": "Nathan der Weise", "raumBreite": 60, "raumHoehe": 30,
                      "sitzBreite": 10, "sitzHoehe": 10, "preis": 1800},
    "vorstellungen": [{"id": 1, "datum": "2025-02-01", "uhrzeit": "20:00:00"}],
    "plaetze": [
        {"block": "P", "reihe": "1", "nummer": 1, "x": 10, "y": 10},
        {"block": "P", "reihe": "1", "nummer": 2, "x": 20, "y": 10}
    ],
    "vorgang": {"nummer": 99, "name": "Recha", "zahlungsart": "Bar", "preis": 3600},
    "platzStatus": [
        {"block": "P", "reihe": "1", "platz": 1, "vorstellung": 1, "status": "reserviert", "vorgang": 99},
        {"block": "P", "reihe": "1", "platz": 2, "vorstellung": 1, "status": "reserviert", "vorgang": 99}
    ]
}"##;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ticketpdf"))
}

fn run(args: &[&str]) -> Output {
    cli().args(args).output().expect("binary runs")
}

fn write_template(dir: &Path) -> PathBuf {
    let mut document = Document::new();
    let pages = document.new_object_id();

    let mut image = Dictionary::new();
    image.set("Type", Object::name("XObject"));
    image.set("Subtype", Object::name("Image"));
    image.set("Width", 1);
    image.set("Height", 1);
    image.set("ColorSpace", Object::name("DeviceGray"));
    image.set("BitsPerComponent", 8);
    let image_id = document.add_object(Stream::with_dictionary(image, vec![0]));

    let mut xobjects = Dictionary::new();
    xobjects.set("Plan", image_id);
    let mut fonts = Dictionary::new();
    fonts.set("F1", Font::standard(StandardFont::Helvetica).to_dictionary());
    let mut resources = Dictionary::new();
    resources.set("XObject", xobjects);
    resources.set("Font", fonts);

    let content = document.add_object(Stream::new(CONTENT.to_vec()));
    let mut page = Dictionary::new();
    page.set("Type", Object::name("Page"));
    page.set("Parent", pages);
    page.set("Contents", content);
    page.set("Resources", resources);
    page.set(
        "MediaBox",
        Object::Array(vec![0.into(), 0.into(), 400.into(), 300.into()]),
    );
    let page_id = document.add_object(page);

    let mut tree = Dictionary::new();
    tree.set("Type", Object::name("Pages"));
    tree.set("Kids", Object::Array(vec![page_id.into()]));
    tree.set("Count", 1);
    document.set_object(pages, tree);

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::name("Catalog"));
    catalog.set("Pages", pages);
    let catalog_id = document.add_object(catalog);
    document.trailer_mut().set("Root", catalog_id);

    let path = dir.join("template.pdf");
    fs::write(&path, document.save(&WriterConfig::compatible()).unwrap()).unwrap();
    path
}

fn setup() -> (TempDir, PathBuf) {
    let dir = tempdir().expect("Failed to create temp directory");
    let template = write_template(dir.path());
    (dir, template)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["detect", "fonts", "inspect", "render", "delete"] {
        assert!(text.contains(command), "help lists {command}");
    }
}

#[test]
fn test_cli_detect_prints_configuration() {
    let (_dir, template) = setup();
    let output = run(&["detect", template.to_str().unwrap()]);
    assert!(output.status.success(), "{output:?}");

    let config: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(config["sitzplanConfig"]["xobjectName"], "Plan");
    assert_eq!(config["datumConfig"]["font"], "F1");
    assert_eq!(config["datumConfig"]["alignment"], "left");
    assert!(config.get("qrCodeConfig").is_none());
}

#[test]
fn test_cli_detect_to_file() {
    let (dir, template) = setup();
    let config = dir.path().join("config.json");
    let output = run(&[
        "detect",
        template.to_str().unwrap(),
        "-o",
        config.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Configuration written"));
    assert!(fs::read_to_string(config).unwrap().contains("platzConfig"));
}

#[test]
fn test_cli_fonts() {
    let (_dir, template) = setup();
    let output = run(&["fonts", template.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    let names: Vec<&str> = text.lines().collect();
    assert_eq!(names.first(), Some(&"F1"));
    assert!(names.contains(&"ZapfDingbats"));
}

#[test]
fn test_cli_inspect() {
    let (_dir, template) = setup();
    let output = run(&["inspect", template.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Crop box: 0 0 400 300"));
    assert!(text.contains("image #2"));
    assert!(text.contains("\"Datum:\""));
}

#[test]
fn test_cli_render_and_publish() {
    let (dir, template) = setup();
    let booking = dir.path().join("booking.json");
    fs::write(&booking, BOOKING).unwrap();
    let out = dir.path().join("tickets.pdf");
    let store = dir.path().join("store");

    let output = run(&[
        "render",
        template.to_str().unwrap(),
        "--booking",
        booking.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--compatible",
        "--store-dir",
        store.to_str().unwrap(),
        "--base-url",
        "https://example.org/tickets",
    ]);
    assert!(output.status.success(), "{output:?}");
    let text = stdout(&output);
    assert!(text.contains("2 ticket(s) written"));
    assert!(text.contains("Published at https://example.org/tickets/"));

    let pdf = fs::read(&out).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    let stored: Vec<_> = fs::read_dir(&store).unwrap().collect();
    assert_eq!(stored.len(), 1);

    let url = text
        .lines()
        .find_map(|l| l.strip_prefix("✓ Published at "))
        .unwrap()
        .to_string();
    let updated: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&booking).unwrap()).unwrap();
    assert_eq!(updated["vorgang"]["ticket_url"], url.as_str());
    assert_eq!(updated["vorgang"]["nummer"], 99);

    let output = run(&[
        "delete",
        &url,
        "--store-dir",
        store.to_str().unwrap(),
        "--base-url",
        "https://example.org/tickets",
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Deleted"));
    assert_eq!(fs::read_dir(&store).unwrap().count(), 0);
}

#[test]
fn test_cli_missing_template_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.pdf");
    let output = run(&["detect", missing.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}

#[test]
fn test_cli_rejects_foreign_url() {
    let dir = tempdir().unwrap();
    let output = run(&[
        "delete",
        "https://elsewhere.org/a.pdf",
        "--store-dir",
        dir.path().to_str().unwrap(),
        "--base-url",
        "https://example.org/tickets",
    ]);
    assert!(!output.status.success());
}
