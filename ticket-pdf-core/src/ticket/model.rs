//! Booking entities
//!
//! Records handed over by the dataset layer. Field names follow the stored
//! JSON of that layer, which is why they are German.

use super::config::{Position, RgbColor};
use crate::error::{PdfError, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

fn default_currency() -> String {
    "€".to_string()
}

fn default_free_color() -> String {
    "#b4b4b4".to_string()
}

fn default_related_color() -> String {
    "#9cc3e6".to_string()
}

fn default_subject_color() -> String {
    "#1f5fa8".to_string()
}

/// Event switches stored next to the event record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VeranstaltungsEinstellungen {
    #[serde(default)]
    pub show_seat_numbers: bool,
    #[serde(default)]
    pub connect_entrance_arrows: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_free_color")]
    pub free_seat_color: String,
    /// Other seats of the same booking
    #[serde(default = "default_related_color")]
    pub related_seat_color: String,
    /// The seat a page is printed for
    #[serde(default = "default_subject_color")]
    pub subject_seat_color: String,
}

impl Default for VeranstaltungsEinstellungen {
    fn default() -> Self {
        Self {
            show_seat_numbers: false,
            connect_entrance_arrows: false,
            currency: default_currency(),
            free_seat_color: default_free_color(),
            related_seat_color: default_related_color(),
            subject_seat_color: default_subject_color(),
        }
    }
}

impl VeranstaltungsEinstellungen {
    fn color(hex: &str) -> Result<RgbColor> {
        RgbColor::from_hex(hex)
            .ok_or_else(|| PdfError::Consistency(format!("invalid seat color {hex:?}")))
    }

    pub fn free_color(&self) -> Result<RgbColor> {
        Self::color(&self.free_seat_color)
    }

    pub fn related_color(&self) -> Result<RgbColor> {
        Self::color(&self.related_seat_color)
    }

    pub fn subject_color(&self) -> Result<RgbColor> {
        Self::color(&self.subject_seat_color)
    }
}

/// An event; room coordinates grow right and down from the top-left corner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Veranstaltung {
    pub name: String,
    pub raum_breite: f64,
    pub raum_hoehe: f64,
    pub sitz_breite: f64,
    pub sitz_hoehe: f64,
    /// Ticket price in cents
    pub preis: u32,
    #[serde(default)]
    pub extra: VeranstaltungsEinstellungen,
}

/// One performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vorstellung {
    pub id: u32,
    pub datum: NaiveDate,
    pub uhrzeit: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platz {
    pub block: String,
    pub reihe: String,
    pub nummer: u32,
    /// Top-left corner in room coordinates
    pub x: f64,
    pub y: f64,
    /// Degrees, clockwise on the plan
    #[serde(default)]
    pub rotation: f64,
    /// Entrance closest to the seat
    #[serde(default)]
    pub eingang: Option<u32>,
}

/// A rectangular block of seats, one row per step in y
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatzGruppe {
    pub block: String,
    pub x: f64,
    pub y: f64,
    pub reihe_von: u32,
    pub reihe_bis: u32,
    pub platz_von: u32,
    pub platz_bis: u32,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub eingang: Option<u32>,
}

impl PlatzGruppe {
    /// Seats of the group, laid out with the event's seat pitch
    pub fn expand(&self, veranstaltung: &Veranstaltung) -> Vec<Platz> {
        let mut seats = Vec::new();
        for reihe in self.reihe_von..=self.reihe_bis {
            for nummer in self.platz_von..=self.platz_bis {
                seats.push(Platz {
                    block: self.block.clone(),
                    reihe: reihe.to_string(),
                    nummer,
                    x: self.x + f64::from(nummer - self.platz_von) * veranstaltung.sitz_breite,
                    y: self.y + f64::from(reihe - self.reihe_von) * veranstaltung.sitz_hoehe,
                    rotation: self.rotation,
                    eingang: self.eingang,
                });
            }
        }
        seats
    }
}

/// A colored zone of the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bereich {
    pub x: f64,
    pub y: f64,
    pub breite: f64,
    pub hoehe: f64,
    pub farbe: String,
    #[serde(default)]
    pub beschriftung: Option<String>,
}

/// An entrance arrow: one cubic Bézier from `punkte[0]` to `punkte[3]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eingang {
    pub id: u32,
    pub punkte: [Position; 4],
    #[serde(default)]
    pub text: Option<String>,
    /// Entrance walked through before this one
    #[serde(default)]
    pub eingang: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zahlungsart {
    Bar,
    Ueberweisung,
    Paypal,
    Freikarte,
    Ehrenkarte,
    Pressekarte,
}

impl Zahlungsart {
    /// Tickets given away without payment
    pub fn is_free(&self) -> bool {
        matches!(
            self,
            Zahlungsart::Freikarte | Zahlungsart::Ehrenkarte | Zahlungsart::Pressekarte
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Zahlungsart::Bar => "Bar",
            Zahlungsart::Ueberweisung => "Überweisung",
            Zahlungsart::Paypal => "PayPal",
            Zahlungsart::Freikarte => "Freikarte",
            Zahlungsart::Ehrenkarte => "Ehrenkarte",
            Zahlungsart::Pressekarte => "Pressekarte",
        }
    }
}

/// A booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vorgang {
    pub nummer: u32,
    pub name: String,
    pub zahlungsart: Zahlungsart,
    #[serde(default)]
    pub versandart: String,
    /// Total in cents
    pub preis: u32,
    #[serde(default)]
    pub bezahlt: bool,
    #[serde(default)]
    pub ticket_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Frei,
    Reserviert,
    Gebucht,
    Gesperrt,
    Anwesend,
}

/// One seat for one performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatzStatus {
    pub block: String,
    pub reihe: String,
    pub platz: u32,
    pub vorstellung: u32,
    pub status: Status,
    #[serde(default)]
    pub vorgang: Option<u32>,
}

impl PlatzStatus {
    /// Status as reported: a present guest counts as booked once paid and
    /// as reserved otherwise. The stored status is left alone.
    pub fn reported_status(&self, vorgang: &Vorgang) -> Status {
        match self.status {
            Status::Anwesend if vorgang.bezahlt || vorgang.zahlungsart.is_free() => Status::Gebucht,
            Status::Anwesend => Status::Reserviert,
            other => other,
        }
    }

    pub fn is_seat(&self, seat: &Platz) -> bool {
        self.block == seat.block && self.reihe == seat.reihe && self.platz == seat.nummer
    }
}

/// Everything a ticket run reads from the dataset layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingData {
    pub veranstaltung: Veranstaltung,
    pub vorstellungen: Vec<Vorstellung>,
    #[serde(default)]
    pub plaetze: Vec<Platz>,
    #[serde(default)]
    pub platz_gruppen: Vec<PlatzGruppe>,
    #[serde(default)]
    pub bereiche: Vec<Bereich>,
    #[serde(default)]
    pub eingaenge: Vec<Eingang>,
    pub vorgang: Vorgang,
    /// Statuses of the event; those of `vorgang` become tickets
    pub platz_status: Vec<PlatzStatus>,
}

impl BookingData {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Single seats followed by expanded groups
    pub fn all_seats(&self) -> Vec<Platz> {
        let mut seats = self.plaetze.clone();
        for group in &self.platz_gruppen {
            seats.extend(group.expand(&self.veranstaltung));
        }
        seats
    }

    /// Statuses booked under `vorgang`, in input order
    pub fn tickets(&self) -> Vec<&PlatzStatus> {
        self.platz_status
            .iter()
            .filter(|s| s.vorgang == Some(self.vorgang.nummer))
            .collect()
    }

    pub fn vorstellung(&self, id: u32) -> Result<&Vorstellung> {
        self.vorstellungen
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| PdfError::Consistency(format!("performance {id} does not exist")))
    }

    pub fn eingang(&self, id: u32) -> Result<&Eingang> {
        self.eingaenge
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| PdfError::Consistency(format!("entrance {id} does not exist")))
    }
}

/// Find the seat a status refers to
pub fn find_seat<'s>(seats: &'s [Platz], status: &PlatzStatus) -> Result<&'s Platz> {
    seats.iter().find(|seat| status.is_seat(seat)).ok_or_else(|| {
        PdfError::Consistency(format!(
            "seat {}/{}/{} does not exist",
            status.block, status.reihe, status.platz
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event() -> Veranstaltung {
        Veranstaltung {
            name: "Der Besuch der alten Dame".into(),
            raum_breite: 200.0,
            raum_hoehe: 100.0,
            sitz_breite: 10.0,
            sitz_hoehe: 12.0,
            preis: 1250,
            extra: VeranstaltungsEinstellungen::default(),
        }
    }

    #[test]
    fn test_group_expansion() {
        let group = PlatzGruppe {
            block: "A".into(),
            x: 20.0,
            y: 30.0,
            reihe_von: 1,
            reihe_bis: 2,
            platz_von: 5,
            platz_bis: 7,
            rotation: 0.0,
            eingang: Some(3),
        };
        let seats = group.expand(&event());
        assert_eq!(seats.len(), 6);
        let last = &seats[5];
        assert_eq!((last.reihe.as_str(), last.nummer), ("2", 7));
        assert_eq!((last.x, last.y), (40.0, 42.0));
        assert_eq!(last.eingang, Some(3));
    }

    #[test]
    fn test_present_is_reported_by_payment() {
        let mut vorgang = Vorgang {
            nummer: 1,
            name: "Erika Mustermann".into(),
            zahlungsart: Zahlungsart::Bar,
            versandart: String::new(),
            preis: 2500,
            bezahlt: false,
            ticket_url: None,
        };
        let status = PlatzStatus {
            block: "A".into(),
            reihe: "1".into(),
            platz: 1,
            vorstellung: 1,
            status: Status::Anwesend,
            vorgang: Some(1),
        };
        assert_eq!(status.reported_status(&vorgang), Status::Reserviert);
        vorgang.bezahlt = true;
        assert_eq!(status.reported_status(&vorgang), Status::Gebucht);
        assert_eq!(status.status, Status::Anwesend);
    }

    #[test]
    fn test_booking_json() {
        let json = r##"{
            "veranstaltung": {
                "name": "Faust", "raumBreite": 100, "raumHoehe": 50,
                "sitzBreite": 5, "sitzHoehe": 5, "preis": 900,
                "extra": {"showSeatNumbers": true, "subjectSeatColor": "#ff0000"}
            },
            "vorstellungen": [{"id": 1, "datum": "2024-03-01", "uhrzeit": "19:30:00"}],
            "plaetze": [{"block": "A", "reihe": "1", "nummer": 1, "x": 0, "y": 0}],
            "vorgang": {"nummer": 42, "name": "M", "zahlungsart": "Freikarte", "preis": 0},
            "platzStatus": [
                {"block": "A", "reihe": "1", "platz": 1, "vorstellung": 1, "status": "gebucht", "vorgang": 42},
                {"block": "A", "reihe": "1", "platz": 2, "vorstellung": 1, "status": "frei"}
            ]
        }"##;
        let booking = BookingData::from_json(json).unwrap();
        assert!(booking.veranstaltung.extra.show_seat_numbers);
        assert_eq!(booking.veranstaltung.extra.currency, "€");
        assert_eq!(
            booking.veranstaltung.extra.subject_color().unwrap(),
            RgbColor::new(1.0, 0.0, 0.0)
        );
        assert_eq!(booking.tickets().len(), 1);
        assert!(booking.vorgang.zahlungsart.is_free());
        assert!(booking.vorstellung(2).is_err());

        let seats = booking.all_seats();
        assert!(find_seat(&seats, booking.tickets()[0]).is_ok());
        assert!(find_seat(&seats, &booking.platz_status[1]).is_err());
    }
}
