use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Current UTC time.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// RFC 3339 rendering for wire payloads; falls back to an empty string
/// rather than failing a send over a formatting error.
pub fn format_rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_default()
}
