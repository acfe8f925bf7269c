//! Patient models.

use serde::{Deserialize, Serialize};

/// Record status shared by patients, services and packages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

/// Administrative sex as recorded at registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "X")]
    Unspecified,
}

/// A clinic patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Store-assigned document ID
    #[serde(skip)]
    pub id: String,
    /// Given names
    pub first_names: String,
    /// Family names
    pub last_names: String,
    /// Date of birth (YYYY-MM-DD)
    pub birth_date: String,
    pub sex: Sex,
    /// Main phone number
    pub phone: String,
    /// Emergency/secondary contact phone
    #[serde(default)]
    pub contact_phone: Option<String>,
    pub email: String,
    /// Postal address
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
    /// Registration timestamp
    pub registered_at: String,
    /// Set once the initial clinical history has been captured
    #[serde(default)]
    pub has_history: bool,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(first_names: String, last_names: String, birth_date: String, sex: Sex) -> Self {
        Self {
            id: String::new(),
            first_names,
            last_names,
            birth_date,
            sex,
            phone: String::new(),
            contact_phone: None,
            email: String::new(),
            address: None,
            status: RecordStatus::Active,
            registered_at: chrono::Utc::now().to_rfc3339(),
            has_history: false,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_names)
            .trim()
            .to_string()
    }

    /// Age in whole years on `today`, or `None` if the birth date does not parse.
    pub fn age_on(&self, today: chrono::NaiveDate) -> Option<u32> {
        use chrono::Datelike;

        let birth = chrono::NaiveDate::parse_from_str(&self.birth_date, "%Y-%m-%d").ok()?;
        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }
}
