//! Domain models for the kiosk content tables

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Joins fields in [`ContentRecord::search_key`]
pub const SEARCH_KEY_SEPARATOR: &str = "\u{1f}";

/// The kinds of record the kiosk can browse, one table each
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Person,
    Publication,
    Image,
    StaffRecord,
}

impl ContentType {
    /// Every content type, in the fixed order used for fingerprints and fan-out
    pub const ALL: [Self; 4] = [Self::Person, Self::Publication, Self::Image, Self::StaffRecord];

    /// Backing table name
    pub const fn table(self) -> &'static str {
        match self {
            Self::Person => "people",
            Self::Publication => "publications",
            Self::Image => "images",
            Self::StaffRecord => "staff",
        }
    }

    /// FTS5 index shadowing the backing table
    pub const fn fts_table(self) -> &'static str {
        match self {
            Self::Person => "people_fts",
            Self::Publication => "publications_fts",
            Self::Image => "images_fts",
            Self::StaffRecord => "staff_fts",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Publication => "publication",
            Self::Image => "image",
            Self::StaffRecord => "staff_record",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown content type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown content type: {0}")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "person" | "people" | "alumni" => Ok(Self::Person),
            "publication" | "publications" => Ok(Self::Publication),
            "image" | "images" | "photo" => Ok(Self::Image),
            "staff_record" | "staff" | "faculty" => Ok(Self::StaffRecord),
            _ => Err(UnknownContentType(s.to_string())),
        }
    }
}

/// An alumni / class roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersonRecord {
    pub id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub class_role: Option<String>,
    pub grad_year: Option<i32>,
    pub grad_date: Option<String>,
    pub photo_file: Option<String>,
}

impl PersonRecord {
    /// "First Middle Last"
    pub fn display_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(middle) => format!("{} {middle} {}", self.first_name, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

/// A journal issue, law review, yearbook or similar document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublicationRecord {
    pub id: String,
    pub title: String,
    pub authors: Option<String>,
    pub publication_type: Option<String>,
    pub year: Option<i32>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub description: Option<String>,
    pub document_path: Option<String>,
    pub thumbnail_path: Option<String>,
}

/// An archival photograph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub id: String,
    pub title: String,
    pub collection: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub image_path: Option<String>,
    pub thumbnail_path: Option<String>,
}

/// A faculty or staff member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StaffRecord {
    pub id: String,
    pub name: String,
    pub position: Option<String>,
    pub department: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub bio: Option<String>,
    pub photo_path: Option<String>,
}

/// A record from any content table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentRecord {
    Person(PersonRecord),
    Publication(PublicationRecord),
    Image(ImageRecord),
    StaffRecord(StaffRecord),
}

impl ContentRecord {
    pub fn id(&self) -> &str {
        match self {
            Self::Person(r) => &r.id,
            Self::Publication(r) => &r.id,
            Self::Image(r) => &r.id,
            Self::StaffRecord(r) => &r.id,
        }
    }

    pub const fn content_type(&self) -> ContentType {
        match self {
            Self::Person(_) => ContentType::Person,
            Self::Publication(_) => ContentType::Publication,
            Self::Image(_) => ContentType::Image,
            Self::StaffRecord(_) => ContentType::StaffRecord,
        }
    }

    /// The year that year-range and decade filters apply to
    ///
    /// Graduation year for people, start year for staff.
    pub const fn year(&self) -> Option<i32> {
        match self {
            Self::Person(r) => r.grad_year,
            Self::Publication(r) => r.year,
            Self::Image(r) => r.year,
            Self::StaffRecord(r) => r.start_year,
        }
    }

    /// The record's headline: display name for people and staff, title otherwise
    pub fn title(&self) -> String {
        match self {
            Self::Person(r) => r.display_name(),
            Self::Publication(r) => r.title.clone(),
            Self::Image(r) => r.title.clone(),
            Self::StaffRecord(r) => r.name.clone(),
        }
    }

    /// Lowercased key for alphabetical ordering (people sort by surname)
    pub fn sort_name(&self) -> String {
        match self {
            Self::Person(r) => {
                let mut key = format!("{}, {}", r.last_name, r.first_name);
                if let Some(middle) = &r.middle_name {
                    key.push(' ');
                    key.push_str(middle);
                }
                key.to_lowercase()
            }
            Self::Publication(r) => r.title.to_lowercase(),
            Self::Image(r) => r.title.to_lowercase(),
            Self::StaffRecord(r) => r.name.to_lowercase(),
        }
    }

    /// Case-folded searchable fields, separated by a control character no
    /// sanitized needle can contain
    pub fn search_key(&self) -> String {
        self.searchable_fields()
            .iter()
            .map(|field| field.to_lowercase())
            .collect::<Vec<_>>()
            .join(SEARCH_KEY_SEPARATOR)
    }

    /// Text columns covered by the full-text index and the substring fallback
    pub fn searchable_fields(&self) -> Vec<&str> {
        fn push<'a>(fields: &mut Vec<&'a str>, value: Option<&'a String>) {
            if let Some(v) = value {
                fields.push(v.as_str());
            }
        }

        let mut fields = Vec::with_capacity(4);
        match self {
            Self::Person(r) => {
                fields.push(r.first_name.as_str());
                push(&mut fields, r.middle_name.as_ref());
                fields.push(r.last_name.as_str());
                push(&mut fields, r.class_role.as_ref());
            }
            Self::Publication(r) => {
                fields.push(r.title.as_str());
                push(&mut fields, r.authors.as_ref());
                push(&mut fields, r.description.as_ref());
            }
            Self::Image(r) => {
                fields.push(r.title.as_str());
                push(&mut fields, r.collection.as_ref());
                push(&mut fields, r.description.as_ref());
            }
            Self::StaffRecord(r) => {
                fields.push(r.name.as_str());
                push(&mut fields, r.position.as_ref());
                push(&mut fields, r.department.as_ref());
                push(&mut fields, r.bio.as_ref());
            }
        }
        fields
    }
}

/// A record as returned by the repository, with the index rank when one applies
///
/// `rank` is the full-text relevance with higher meaning better; it is `None`
/// for unranked scans.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRow {
    pub record: ContentRecord,
    pub rank: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(middle: Option<&str>) -> PersonRecord {
        PersonRecord {
            id: "p-1".to_string(),
            first_name: "Maria".to_string(),
            middle_name: middle.map(str::to_string),
            last_name: "Castilla".to_string(),
            class_role: Some("Valedictorian".to_string()),
            grad_year: Some(1987),
            grad_date: None,
            photo_file: Some("/photos/1987/castilla.jpg".to_string()),
        }
    }

    #[test]
    fn test_content_type_parses_aliases() {
        assert_eq!("Faculty".parse::<ContentType>(), Ok(ContentType::StaffRecord));
        assert_eq!("people".parse::<ContentType>(), Ok(ContentType::Person));
        assert!("video".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_display_name_skips_blank_middle_name() {
        assert_eq!(person(Some("  ")).display_name(), "Maria Castilla");
        assert_eq!(person(Some("Elena")).display_name(), "Maria Elena Castilla");
    }

    #[test]
    fn test_person_sorts_by_surname() {
        let record = ContentRecord::Person(person(None));
        assert_eq!(record.sort_name(), "castilla, maria");
        assert_eq!(record.year(), Some(1987));
        assert_eq!(
            record.searchable_fields(),
            vec!["Maria", "Castilla", "Valedictorian"]
        );
    }

    #[test]
    fn test_keys_fold_non_ascii_case() {
        let mut record = person(None);
        record.last_name = "ÁVILA".to_string();
        let record = ContentRecord::Person(record);

        assert_eq!(record.sort_name(), "ávila, maria");
        assert_eq!(
            record.search_key(),
            "maria\u{1f}ávila\u{1f}valedictorian"
        );
    }

    #[test]
    fn test_record_serializes_with_type_tag() {
        let record = ContentRecord::Person(person(None));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "person");
        assert_eq!(json["last_name"], "Castilla");
    }
}
