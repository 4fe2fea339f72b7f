//! Record normalizer.
//!
//! Renders each record kind into a fixed `Label: value` template. Absent
//! optional attributes drop their line (or their segment of a combined
//! line) so the text never carries placeholder tokens.

use crate::record::{
    Apartment, Bank, Document, GeneralInfo, Insurance, Place, Record, SourceKind,
    TelecomProvider, UsefulApp, WhatsAppGroup,
};

/// Normalize a record into its searchable document.
pub fn normalize(record: &Record) -> Document {
    let text = match record {
        Record::Apartment(r) => apartment(r),
        Record::Place(r) => place(r),
        Record::WhatsAppGroup(r) => whatsapp_group(r),
        Record::Insurance(r) => insurance(r),
        Record::GeneralInfo(r) => general_info(r),
        Record::Bank(r) => bank(r),
        Record::TelecomProvider(r) => telecom_provider(r),
        Record::UsefulApp(r) => useful_app(r),
    };

    Document {
        text,
        source_kind: SourceKind::Record(record.kind()),
        record_id: record.id(),
    }
}

/// Normalize a batch of records, preserving order.
pub fn normalize_all(records: &[Record]) -> Vec<Document> {
    records.iter().map(normalize).collect()
}

/// Line-oriented text builder that skips empty values.
#[derive(Default)]
struct Lines(Vec<String>);

impl Lines {
    fn line(mut self, label: &str, value: &str) -> Self {
        let value = value.trim();
        if !value.is_empty() {
            self.0.push(format!("{}: {}", label, value));
        }
        self
    }

    fn opt(self, label: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.line(label, v),
            None => self,
        }
    }

    /// A line made of comma-separated segments; omitted when every segment is absent.
    fn segments(mut self, label: &str, segments: Vec<Option<String>>) -> Self {
        let present: Vec<String> = segments.into_iter().flatten().collect();
        if !present.is_empty() {
            self.0.push(format!("{}: {}", label, present.join(", ")));
        }
        self
    }

    fn finish(self) -> String {
        self.0.join("\n")
    }
}

/// `450.0` renders as `450`, `28.5` as `28.5`.
fn number(value: f64) -> String {
    format!("{}", value)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn apartment(r: &Apartment) -> String {
    // The first segment has no label of its own; "Details: 1 rooms, 28m², Rent: €450".
    let details = vec![
        r.rooms.map(|v| format!("{} rooms", number(v))),
        r.size.map(|v| format!("{}m²", number(v))),
        r.price.map(|v| format!("Rent: €{}", number(v))),
    ];

    Lines::default()
        .opt("Apartment", r.title.as_deref())
        .opt("Location", r.address.as_deref())
        .segments("Details", details)
        .opt("Available from", r.available_from.as_deref())
        .opt("Description", r.details_link.as_deref())
        .finish()
}

fn place(r: &Place) -> String {
    let pricing = vec![
        r.price_range
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(|v| format!("Price Range: {}", v.trim())),
        r.rating.map(|v| format!("Rating: {}", number(v))),
    ];

    let mut lines = Lines::default()
        .opt("Place", r.name.as_deref())
        .opt("Type", r.category.as_deref())
        .opt("Location", r.address.as_deref());

    // Both segments already carry their labels.
    let present: Vec<String> = pricing.into_iter().flatten().collect();
    if !present.is_empty() {
        lines.0.push(present.join(", "));
    }

    lines.opt("Description", r.description.as_deref()).finish()
}

fn whatsapp_group(r: &WhatsAppGroup) -> String {
    Lines::default()
        .opt("WhatsApp Group", r.name.as_deref())
        .opt("Category", r.category.as_deref())
        .opt("Description", r.description.as_deref())
        .opt("Invite Link", r.invite_link.as_deref())
        .finish()
}

fn insurance(r: &Insurance) -> String {
    Lines::default()
        .opt("Insurance", r.company_name.as_deref())
        .opt("Category", r.category.as_deref())
        .opt("Description", r.description.as_deref())
        .opt("Website", r.company_url.as_deref())
        .finish()
}

fn general_info(r: &GeneralInfo) -> String {
    Lines::default()
        .opt("General Info", r.title.as_deref())
        .opt("Category", r.category.as_deref())
        .opt("Description", r.description.as_deref())
        .finish()
}

fn bank(r: &Bank) -> String {
    Lines::default()
        .opt("Bank", r.name.as_deref())
        .opt("Description", r.description.as_deref())
        .opt("Website", r.website_url.as_deref())
        .line(
            "Free Student Plan Available",
            yes_no(r.free_student_plan_available),
        )
        .finish()
}

fn telecom_provider(r: &TelecomProvider) -> String {
    Lines::default()
        .opt("Telecom Provider", r.name.as_deref())
        .opt("Description", r.description.as_deref())
        .opt("Website", r.website_url.as_deref())
        .finish()
}

fn useful_app(r: &UsefulApp) -> String {
    Lines::default()
        .opt("Useful App", r.name.as_deref())
        .opt("Category", r.category.as_deref())
        .opt("Description", r.description.as_deref())
        .opt("App Store URL", r.app_store_url.as_deref())
        .opt("Play Store URL", r.play_store_url.as_deref())
        .finish()
}
