use crate::domain::models::booking::BookingDetails;

pub const BOOKINGS_CSV_HEADER: &str =
    "id,customer_name,customer_email,technician_name,service,date,time,address,amount,status,rating,review,created_at";

/// Quotes a field when it contains a delimiter, quote or line break.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn bookings_to_csv(bookings: &[BookingDetails]) -> String {
    let mut csv_output = String::from(BOOKINGS_CSV_HEADER);
    csv_output.push('\n');

    for details in bookings {
        let b = &details.booking;
        let fields = [
            b.id.clone(),
            details.customer_name.clone().unwrap_or_default(),
            details.customer_email.clone().unwrap_or_default(),
            details.technician_name.clone().unwrap_or_default(),
            b.service_name.clone(),
            b.date.format("%Y-%m-%d").to_string(),
            b.time.clone(),
            b.address.clone(),
            format!("{:.2}", b.amount),
            b.status.to_string(),
            b.rating.map(|r| r.to_string()).unwrap_or_default(),
            b.review.clone().unwrap_or_default(),
            b.created_at.to_rfc3339(),
        ];
        let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
        csv_output.push_str(&line.join(","));
        csv_output.push('\n');
    }

    csv_output
}
