//! Detect a template's placeholders and render a booking into tickets.
//!
//! Usage: cargo run --example render_tickets --features qr -- template.pdf booking.json out.pdf

use std::env;
use std::fs;
use ticket_pdf::ticket::{QrCodeCrateProvider, SeatIcons};
use ticket_pdf::{detect_configuration, render_ticket_set, BookingData, RenderOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let [_, template, booking, output] = args.as_slice() else {
        eprintln!("usage: render_tickets <template.pdf> <booking.json> <out.pdf>");
        std::process::exit(2);
    };

    let template = fs::read(template)?;
    let config = detect_configuration(&template)?;
    println!("Detected configuration:\n{}", config.to_json()?);

    let booking = BookingData::from_json(&fs::read_to_string(booking)?)?;
    let icons = SeatIcons::builtin(&booking.veranstaltung.extra)?;
    let pdf = render_ticket_set(
        &template,
        &config,
        &booking,
        &QrCodeCrateProvider,
        &icons,
        &RenderOptions::default(),
    )?;
    fs::write(output, pdf)?;
    println!("✓ {} ticket(s) written to {output}", booking.tickets().len());
    Ok(())
}
