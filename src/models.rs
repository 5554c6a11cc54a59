use serde::{Deserialize, Serialize};

/// Column names of the tracker CSV, in the order they are written.
pub const COLUMNS: [&str; 12] = [
    "Date_Applied",
    "Company",
    "Position_Title",
    "Location",
    "Contact_Name",
    "Contact_Email",
    "Source",
    "Status",
    "Response_Date",
    "Next_Action",
    "Priority",
    "Notes",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "Date_Applied")]
    pub date_applied: String, // YYYY-MM-DD
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Position_Title")]
    pub position_title: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Contact_Name")]
    pub contact_name: String,
    #[serde(rename = "Contact_Email")]
    pub contact_email: String,
    #[serde(rename = "Source")]
    pub source: String, // "LinkedIn", "Email", ...
    #[serde(rename = "Status")]
    pub status: String, // "Applied_LinkedIn", "Interview_Invitation", "⚠ PHISHING", ...
    #[serde(rename = "Response_Date")]
    pub response_date: String, // empty until a response arrives
    #[serde(rename = "Next_Action")]
    pub next_action: String,
    #[serde(rename = "Priority")]
    pub priority: String, // "HIGH", "MEDIUM", "LOW"
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl Application {
    /// Field values in `COLUMNS` order.
    pub fn fields(&self) -> [&str; 12] {
        [
            &self.date_applied,
            &self.company,
            &self.position_title,
            &self.location,
            &self.contact_name,
            &self.contact_email,
            &self.source,
            &self.status,
            &self.response_date,
            &self.next_action,
            &self.priority,
            &self.notes,
        ]
    }

    /// Mutable slot for the column at `COLUMNS[idx]`.
    pub fn field_mut(&mut self, idx: usize) -> Option<&mut String> {
        let slot = match idx {
            0 => &mut self.date_applied,
            1 => &mut self.company,
            2 => &mut self.position_title,
            3 => &mut self.location,
            4 => &mut self.contact_name,
            5 => &mut self.contact_email,
            6 => &mut self.source,
            7 => &mut self.status,
            8 => &mut self.response_date,
            9 => &mut self.next_action,
            10 => &mut self.priority,
            11 => &mut self.notes,
            _ => return None,
        };
        Some(slot)
    }

    pub fn has_response(&self) -> bool {
        !self.response_date.is_empty()
    }
}

impl From<Candidate> for Application {
    fn from(c: Candidate) -> Self {
        Self {
            date_applied: c.date_applied,
            company: c.company,
            position_title: c.position_title,
            source: c.source,
            status: c.status,
            response_date: c.response_date,
            notes: c.notes,
            ..Default::default()
        }
    }
}

/// Partial update: only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationUpdate {
    pub date_applied: Option<String>,
    pub company: Option<String>,
    pub position_title: Option<String>,
    pub location: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub response_date: Option<String>,
    pub next_action: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
}

impl ApplicationUpdate {
    /// Provided values in `COLUMNS` order.
    pub fn fields(&self) -> [Option<&str>; 12] {
        [
            self.date_applied.as_deref(),
            self.company.as_deref(),
            self.position_title.as_deref(),
            self.location.as_deref(),
            self.contact_name.as_deref(),
            self.contact_email.as_deref(),
            self.source.as_deref(),
            self.status.as_deref(),
            self.response_date.as_deref(),
            self.next_action.as_deref(),
            self.priority.as_deref(),
            self.notes.as_deref(),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status: Option<String>,   // substring, case-insensitive
    pub priority: Option<String>, // exact
    pub source: Option<String>,   // substring, case-insensitive
    pub company: Option<String>,  // substring, case-insensitive
}

/// A record proposed by the mailbox scan, not yet merged into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub date_applied: String,
    pub company: String,
    pub position_title: String,
    pub status: String,
    pub source: String, // always "Email"
    pub response_date: String,
    pub notes: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub examined: usize,
    pub candidates: Vec<Candidate>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyCount {
    pub company: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub response_rate: f64,
    pub active_count: usize,
    pub phishing_count: usize,
    pub top_companies: Vec<CompanyCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    pub labels: Vec<String>, // YYYY-MM, ascending
    pub applications: Vec<usize>,
    pub responses: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStats {
    pub source: String,
    pub applications: usize,
    pub responses: usize,
    pub response_rate: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}
