//! Rendering a booking into ticket pages

mod common;

use chrono::{TimeZone, Utc};
use common::{booking, ticket_template, CheckerQr};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use ticket_pdf::ticket::{Status, TicketRun, DEFAULT_PIECE_INFO_KEY};
use ticket_pdf::{
    detect_configuration, page_tree, render_ticket_set, Document, ErrorKind, Object, PdfError,
    RenderOptions, SeatIcons, TicketConfig,
};

fn options() -> RenderOptions {
    RenderOptions {
        modified: Some(Utc.with_ymd_and_hms(2024, 11, 1, 12, 0, 0).unwrap()),
        ..RenderOptions::default()
    }
}

fn render(config: &TicketConfig) -> ticket_pdf::Result<Vec<u8>> {
    let booking = booking();
    let icons = SeatIcons::builtin(&booking.veranstaltung.extra)?;
    render_ticket_set(
        &ticket_template(),
        config,
        &booking,
        &CheckerQr,
        &icons,
        &options(),
    )
}

fn text(dict: &ticket_pdf::Dictionary, key: &str) -> String {
    let bytes = dict.get(key).and_then(Object::as_string_bytes).unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[test]
fn test_one_page_per_ticket() {
    let config = detect_configuration(&ticket_template()).unwrap();
    let pdf = render(&config).unwrap();

    let mut document = Document::load(&pdf).unwrap();
    let pages = page_tree::flatten(&mut document).unwrap();
    assert_eq!(pages.len(), 3);

    let mut seats = HashSet::new();
    for page in &pages {
        let info = page
            .piece_info(&document, DEFAULT_PIECE_INFO_KEY)
            .unwrap()
            .expect("ticket pages are tagged");
        assert_eq!(info.get_integer("VorgangsNummer"), Some(4711));
        assert_eq!(text(info, "Datum"), "15.11.2024");
        assert_eq!(text(info, "Uhrzeit"), "19:30");
        seats.insert((
            text(info, "Block"),
            text(info, "Reihe"),
            info.get_integer("Platz").unwrap(),
        ));
    }
    let expected: HashSet<_> = [("A", "1", 2), ("A", "1", 3), ("A", "2", 1)]
        .into_iter()
        .map(|(b, r, p)| (b.to_string(), r.to_string(), p))
        .collect();
    assert_eq!(seats, expected);
}

#[test]
fn test_page_content() {
    let config = detect_configuration(&ticket_template()).unwrap();
    let pdf = render(&config).unwrap();

    let mut document = Document::load(&pdf).unwrap();
    let pages = page_tree::flatten(&mut document).unwrap();
    let content = String::from_utf8_lossy(&pages[0].content_data(&document).unwrap()).into_owned();

    assert!(!content.contains("/Plan Do"));
    assert!(!content.contains("/QR Do"));
    assert!(content.contains("(Datum:) Tj"));
    assert!(content.contains("/SeatFree Do"));
    assert!(content.contains("/SeatSubject Do"));
    assert!(content.contains("/SeatRelated Do"));
    assert!(content.contains("(15.11.2024) Tj"));
    assert!(content.contains("(bezahlt) Tj"));
    assert!(content.contains("BI"));
    assert!(content.starts_with("q\n"));

    let saves = content.lines().filter(|l| *l == "q").count();
    let restores = content.lines().filter(|l| *l == "Q").count();
    assert_eq!(saves, restores);

    let resources = pages[0].resources(&document).unwrap();
    let xobjects = resources.get_dict("XObject").unwrap();
    assert!(!xobjects.contains_key("Plan"));
    assert!(!xobjects.contains_key("QR"));
    assert!(xobjects.contains_key("SeatSubject"));
}

#[test]
fn test_shared_streams_stored_once() {
    let config = detect_configuration(&ticket_template()).unwrap();
    let pdf = render(&config).unwrap();

    let mut document = Document::load(&pdf).unwrap();
    let pages = page_tree::flatten(&mut document).unwrap();
    let first = pages[0].content_ids(&document).unwrap();
    let second = pages[1].content_ids(&document).unwrap();
    // template wrapper, template, closing, prefix, variant, suffix, overlay
    assert_eq!(first.len(), 7);
    assert_eq!(first[..4], second[..4]);
    assert_ne!(first[4], second[4]);
    assert_eq!(first[5], second[5]);
}

#[test]
fn test_empty_configuration_keeps_template() {
    let pdf = render(&TicketConfig::default()).unwrap();
    let mut document = Document::load(&pdf).unwrap();
    let pages = page_tree::flatten(&mut document).unwrap();
    assert_eq!(pages.len(), 3);
    let content = String::from_utf8_lossy(&pages[0].content_data(&document).unwrap()).into_owned();
    assert!(content.contains("/Plan Do"));
    assert!(!content.contains("BI"));
}

#[test]
fn test_missing_seat_aborts() {
    let config = detect_configuration(&ticket_template()).unwrap();
    let mut booking = booking();
    booking.platz_status[0].platz = 99;
    let icons = SeatIcons::builtin(&booking.veranstaltung.extra).unwrap();
    let error = render_ticket_set(
        &ticket_template(),
        &config,
        &booking,
        &CheckerQr,
        &icons,
        &options(),
    )
    .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Consistency);
}

#[test]
fn test_booking_without_tickets() {
    let config = TicketConfig::default();
    let mut booking = booking();
    booking.vorgang.nummer = 1;
    let options = options();
    let result = TicketRun::load(&ticket_template(), &config, &booking, &options);
    assert!(matches!(result, Err(PdfError::Consistency(_))));
}

#[test]
fn test_stages_expose_pages() {
    let config = detect_configuration(&ticket_template()).unwrap();
    let booking = booking();
    assert_eq!(booking.platz_status[2].status, Status::Anwesend);
    let icons = SeatIcons::builtin(&booking.veranstaltung.extra).unwrap();
    let options = options();
    let run = TicketRun::load(&ticket_template(), &config, &booking, &options)
        .and_then(|run| run.strip_placeholders())
        .and_then(|run| run.build_shared_prefix(&icons))
        .and_then(|run| run.build_shared_suffix())
        .and_then(|run| run.render_pages(&CheckerQr))
        .unwrap();
    assert_eq!(run.pages().len(), 3);
    assert_eq!(page_tree::page_count(run.document()).unwrap(), 3);
    assert!(run.finish().unwrap().starts_with(b"%PDF-"));
}
