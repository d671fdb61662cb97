use time::{format_description::FormatItem, macros::format_description, Date, PrimitiveDateTime};

const RECEIPT_DATETIME: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const RECEIPT_DATETIME_FRACTION: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const RECEIPT_DATETIME_SPACE: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const CALENDAR_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parses the receipt timestamps the model hands back. Bare dates mean midnight.
pub fn parse_receipt_datetime(raw: &str) -> Option<PrimitiveDateTime> {
    let raw = raw.trim();
    [RECEIPT_DATETIME, RECEIPT_DATETIME_FRACTION, RECEIPT_DATETIME_SPACE]
        .iter()
        .find_map(|f| PrimitiveDateTime::parse(raw, f).ok())
        .or_else(|| parse_calendar_date(raw).map(Date::midnight))
}

pub fn parse_calendar_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), CALENDAR_DATE).ok()
}

pub fn format_receipt_datetime(dt: &PrimitiveDateTime) -> String {
    dt.format(RECEIPT_DATETIME)
        .unwrap_or_else(|_| dt.to_string())
}

/// `YYYY-MM-DDTHH:MM:SS` on the wire.
pub mod receipt_datetime {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::PrimitiveDateTime;

    pub fn serialize<S: Serializer>(dt: &PrimitiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_receipt_datetime(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PrimitiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_receipt_datetime(&raw).ok_or_else(|| {
            D::Error::custom(format!(
                "invalid receipt_date `{raw}`, expected YYYY-MM-DDTHH:MM:SS"
            ))
        })
    }
}

/// Optional `YYYY-MM-DD` query parameter; empty strings count as absent.
pub mod optional_date {
    use serde::{de::Error, Deserialize, Deserializer};
    use time::Date;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_calendar_date(s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date `{s}`, expected YYYY-MM-DD"))),
        }
    }
}
