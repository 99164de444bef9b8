//! iCalendar (RFC 5545) rendering for appointment confirmations.
//!
//! Output uses CRLF line endings, folds content lines longer than 75 octets
//! (never inside a UTF-8 sequence) and escapes TEXT values.

use chrono::{DateTime, Utc};

use crate::models::{Appointment, AppointmentStatus};

const PRODID: &str = "-//Sewa Clinic//Appointments//EN";
const MAX_LINE_OCTETS: usize = 75;

pub const CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Escape a TEXT property value
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Fold one content line into chunks of at most 75 octets, continuation
/// lines starting with a single space. Appends the trailing CRLF.
pub fn fold_line(line: &str, out: &mut String) {
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if used + len > budget {
            out.push_str("\r\n ");
            // the leading space counts toward the next line's 75 octets
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(c);
        used += len;
    }
    out.push_str("\r\n");
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Render a single-event calendar for `appointment`
pub fn render_ics(appointment: &Appointment, clinic_name: &str) -> String {
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}@clinic", appointment.id),
        format!("DTSTAMP:{}", timestamp(appointment.created_at)),
        format!("DTSTART:{}", timestamp(appointment.starts_at)),
        format!("DTEND:{}", timestamp(appointment.ends_at)),
        format!("SUMMARY:{}", escape_text(&format!("Appointment at {clinic_name}"))),
        format!("LOCATION:{}", escape_text(clinic_name)),
    ];

    let mut description = format!("Patient: {}", appointment.patient_name);
    if let Some(reason) = &appointment.reason {
        description.push_str("\nReason: ");
        description.push_str(reason);
    }
    lines.push(format!("DESCRIPTION:{}", escape_text(&description)));

    let status = match appointment.status {
        AppointmentStatus::Booked => "CONFIRMED",
        AppointmentStatus::Cancelled => "CANCELLED",
    };
    lines.push(format!("STATUS:{status}"));
    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        fold_line(line, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn appointment(reason: Option<&str>) -> Appointment {
        let start = Utc.with_ymd_and_hms(2025, 2, 3, 4, 15, 0).unwrap();
        Appointment {
            id: Uuid::nil(),
            clinic_id: Uuid::nil(),
            doctor_id: Uuid::nil(),
            patient_name: "Sunita Rai".to_string(),
            patient_phone: "9841000000".to_string(),
            patient_email: None,
            starts_at: start,
            ends_at: start + Duration::minutes(15),
            reason: reason.map(str::to_string),
            status: AppointmentStatus::Booked,
            created_at: start - Duration::days(1),
            cancelled_at: None,
        }
    }

    fn unfold(ics: &str) -> String {
        ics.replace("\r\n ", "")
    }

    #[test]
    fn renders_required_properties_in_utc() {
        let ics = render_ics(&appointment(None), "Sewa Clinic");
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert!(ics.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
        assert!(ics.contains("UID:00000000-0000-0000-0000-000000000000@clinic\r\n"));
        assert!(ics.contains("DTSTART:20250203T041500Z\r\n"));
        assert!(ics.contains("DTEND:20250203T043000Z\r\n"));
        assert!(ics.contains("STATUS:CONFIRMED\r\n"));
        // no bare LF anywhere
        assert_eq!(ics.matches('\n').count(), ics.matches("\r\n").count());
    }

    #[test]
    fn text_values_are_escaped() {
        assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
        let ics = render_ics(&appointment(Some("Fever, cough; 3 days")), "Sewa Clinic");
        assert!(unfold(&ics).contains("Reason: Fever\\, cough\\; 3 days"));
    }

    #[test]
    fn long_lines_fold_at_75_octets_without_splitting_characters() {
        let reason = "ज्वरो र टाउको दुखाइ ".repeat(8);
        let ics = render_ics(&appointment(Some(&reason)), "सेवा क्लिनिक, काठमाडौं");
        for line in ics.split("\r\n") {
            assert!(line.len() <= 75, "line too long: {} octets", line.len());
        }
        let unfolded = unfold(&ics);
        assert!(unfolded.contains(&escape_text(&format!("Patient: Sunita Rai\nReason: {reason}"))));
    }
}
