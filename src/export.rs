//! Flat sheet export of stored listings.

use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::types::StoredListing;

/// Column names, in the order every exported row follows.
pub const SHEET_HEADERS: [&str; 20] = [
    "Hash",
    "Source",
    "Title",
    "URL",
    "Price",
    "Price Currency",
    "Rent",
    "Rent Currency",
    "Units",
    "Building Type",
    "Location",
    "Annual Revenue",
    "ROI",
    "Payback Years",
    "Feasibility",
    "Price Source",
    "Rent Source",
    "Unit Source",
    "Flags",
    "Captured At",
];

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// `"{label} ({id})"`
pub fn source_cell(label: &str, id: &str) -> String {
    format!("{label} ({id})")
}

/// One stored listing as sheet cells aligned with [`SHEET_HEADERS`].
pub fn to_row(stored: &StoredListing) -> Vec<String> {
    let l = &stored.listing;
    vec![
        l.hash.clone(),
        source_cell(&l.source_label, &l.source_id),
        cell(l.title.as_deref()),
        l.url.clone(),
        cell(l.price_value),
        cell(l.price_currency),
        cell(l.rent_per_unit),
        cell(l.rent_currency),
        cell(l.unit_count),
        l.building_type.to_string(),
        cell(l.location),
        cell(l.annual_revenue),
        cell(l.roi_ratio),
        cell(l.payback_years),
        l.feasibility.to_string(),
        cell(l.price_source_text.as_deref()),
        cell(l.rent_source_text.as_deref()),
        cell(l.unit_source_text.as_deref()),
        l.flags.join(","),
        stored.updated_at.to_rfc3339(),
    ]
}

/// Header row followed by one row per listing.
pub fn write_csv<W: Write>(writer: W, listings: &[StoredListing]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(SHEET_HEADERS)?;
    for stored in listings {
        out.write_record(to_row(stored))?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_csv_file(path: &Path, listings: &[StoredListing]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    write_csv(std::io::BufWriter::new(file), listings)?;
    info!("Exported {} listings to {}", listings.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::{ListingNormalizer, Normalizer};
    use crate::types::RawListing;
    use chrono::{TimeZone, Utc};

    fn stored() -> StoredListing {
        let listing = ListingNormalizer::default().normalize(&RawListing {
            source_id: "meqasa_gh".into(),
            source_label: "Meqasa (Ghana)".into(),
            url: "https://meqasa.example/7".into(),
            html_snippet: "Accra office, rent from ₦1m per tenant".into(),
            title: Some("Office block, Accra".into()),
            price_text: Some("$137,000".into()),
            ..Default::default()
        });
        StoredListing {
            listing,
            run_id: "run-9".into(),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_row_lines_up_with_headers() {
        let row = to_row(&stored());
        let col = |name: &str| {
            let idx = SHEET_HEADERS.iter().position(|h| *h == name).unwrap();
            row[idx].clone()
        };

        assert_eq!(row.len(), SHEET_HEADERS.len());
        assert_eq!(col("Source"), "Meqasa (Ghana) (meqasa_gh)");
        assert_eq!(col("Title"), "Office block, Accra");
        assert_eq!(col("Price Currency"), "USD");
        assert_eq!(col("Rent Currency"), "NGN");
        assert_eq!(col("Units"), "100");
        assert_eq!(col("Location"), "Accra");
        assert_eq!(col("Building Type"), "multipurpose");
        assert_eq!(
            col("Flags"),
            "rent_estimated_from_baseline,unit_count_assumed_baseline"
        );
        assert_eq!(col("Captured At"), "2024-05-02T08:00:00+00:00");
    }

    #[test]
    fn test_csv_starts_with_header_row() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[stored()]).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), SHEET_HEADERS.join(","));
        assert!(lines.next().unwrap().contains("\"Office block, Accra\""));
    }
}
