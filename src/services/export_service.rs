use std::fmt;

use crate::models::booking::BookingView;
use crate::services::stats_service::ReportStats;

pub const BOOKING_HEADERS: [&str; 10] = [
    "Booking ID",
    "Tour",
    "Booking Date",
    "People",
    "Total Price",
    "Status",
    "Contact Email",
    "Contact Phone",
    "Special Requests",
    "Created At",
];

#[derive(Debug)]
pub enum ExportError {
    CsvError(csv::Error),
    EncodingError(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::CsvError(err) => write!(f, "CSV error: {}", err),
            ExportError::EncodingError(err) => write!(f, "Encoding error: {}", err),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::CsvError(err)
    }
}

/// Turns a table of strings into CSV text.
pub fn to_csv(rows: &[Vec<String>]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::EncodingError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::EncodingError(e.to_string()))
}

pub fn booking_rows(bookings: &[BookingView]) -> Vec<Vec<String>> {
    let mut rows = vec![BOOKING_HEADERS.iter().map(|h| h.to_string()).collect()];
    rows.extend(bookings.iter().map(|b| {
        vec![
            b.id.clone(),
            b.tour_title.clone().unwrap_or_default(),
            b.booking_date.to_string(),
            b.number_of_people.to_string(),
            format!("{:.2}", b.total_price),
            b.status.as_str().to_string(),
            b.contact_email.clone().unwrap_or_default(),
            b.contact_phone.clone().unwrap_or_default(),
            b.special_requests.clone().unwrap_or_default(),
            b.created_at.to_rfc3339(),
        ]
    }));
    rows
}

/// Summary block followed by one row per booking.
pub fn report_csv(report: &ReportStats, bookings: &[BookingView]) -> Result<String, ExportError> {
    let mut rows: Vec<Vec<String>> = vec![
        vec!["Report".to_string(), "Value".to_string()],
        vec!["Total Bookings".to_string(), report.total_bookings.to_string()],
        vec!["Total Revenue".to_string(), format!("{:.2}", report.total_revenue)],
        vec![
            "Average Booking Value".to_string(),
            format!("{:.2}", report.average_booking_value),
        ],
        vec!["Bookings Trend".to_string(), report.bookings_trend.clone()],
        vec!["Revenue Trend".to_string(), report.revenue_trend.clone()],
        Vec::new(),
    ];
    rows.extend(booking_rows(bookings));
    to_csv(&rows)
}

pub fn export_file_name(prefix: &str, date: chrono::NaiveDate) -> String {
    format!("{}-{}.csv", prefix, date.format("%Y-%m-%d"))
}
