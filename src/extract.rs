//! Turns a single email into a candidate application, or declines it.

use chrono::{DateTime, Local, NaiveDate};
use mailparse::{MailHeaderMap, ParsedMail, parse_mail};
use regex::Regex;
use scraper::Html;

use crate::error::ExtractError;
use crate::models::Candidate;

/// Only the start of a body is inspected.
pub const BODY_LIMIT: usize = 2000;

const SUBJECT_IN_NOTES: usize = 100;

pub const UNKNOWN_COMPANY: &str = "UNKNOWN";
pub const UNKNOWN_POSITION: &str = "UNKNOWN POSITION";

const JOB_KEYWORDS: &[&str] = &[
    "application",
    "position",
    "job",
    "interview",
    "resume",
    "career",
    "opportunity",
    "assessment",
    "thank you for applying",
    "received your application",
];

const NOISE_PATTERNS: &[&str] = &[
    "newsletter",
    "digest",
    "job alert",
    "job match",
    "recommended for you",
    "similar jobs",
    "career tips",
    "brightalk.com",
    "godaddy.com",
    "indeed.com/career",
    "monster.com/notifications",
];

/// Sender domains that say nothing about the employer.
const GENERIC_DOMAINS: &[&str] = &["linkedin", "indeed", "workday", "greenhouse", "gmail"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    ApplicationSent,
    ApplicationAcknowledged,
    AssessmentRequired,
    InterviewInvitation,
    Rejected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::ApplicationSent => "Application_Sent",
            Status::ApplicationAcknowledged => "Application_Acknowledged",
            Status::AssessmentRequired => "Assessment_Required",
            Status::InterviewInvitation => "Interview_Invitation",
            Status::Rejected => "Rejected",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Application_Sent" => Some(Status::ApplicationSent),
            "Application_Acknowledged" => Some(Status::ApplicationAcknowledged),
            "Assessment_Required" => Some(Status::AssessmentRequired),
            "Interview_Invitation" => Some(Status::InterviewInvitation),
            "Rejected" => Some(Status::Rejected),
            _ => None,
        }
    }

    /// How far along the hiring process this status is.
    pub fn stage(self) -> u8 {
        match self {
            Status::ApplicationSent => 1,
            Status::ApplicationAcknowledged => 2,
            Status::AssessmentRequired => 3,
            Status::InterviewInvitation => 4,
            Status::Rejected => 5,
        }
    }

    /// First keyword group that appears wins.
    fn classify(text_lower: &str) -> Self {
        if contains_any(text_lower, &["interview", "phone screen"]) {
            Status::InterviewInvitation
        } else if contains_any(text_lower, &["unfortunately", "not selected"]) {
            Status::Rejected
        } else if contains_any(text_lower, &["assessment", "test"]) {
            Status::AssessmentRequired
        } else if contains_any(text_lower, &["thank you for applying", "received your application"]) {
            Status::ApplicationAcknowledged
        } else {
            Status::ApplicationSent
        }
    }
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// The parts of a message the extractor looks at.
#[derive(Debug, Clone, Default)]
pub struct MessageText {
    pub subject: String,
    pub from: String,
    pub date: String,
    pub body: String,
}

impl MessageText {
    pub fn new(subject: &str, from: &str, date: &str, body: &str) -> Self {
        Self {
            subject: subject.to_string(),
            from: from.to_string(),
            date: date.to_string(),
            body: body.chars().take(BODY_LIMIT).collect(),
        }
    }

    /// Parse a raw RFC 822 message.
    pub fn from_raw(raw: &[u8]) -> Result<Self, ExtractError> {
        let parsed = parse_mail(raw)?;
        let header = |name: &str| parsed.headers.get_first_value(name).unwrap_or_default();
        let body = body_text(&parsed)?;
        Ok(Self::new(&header("Subject"), &header("From"), &header("Date"), &body))
    }

    /// Subject and body as one searchable text.
    fn text(&self) -> String {
        format!("{}\n{}", self.subject, self.body)
    }
}

/// Prefer the first text/plain part; fall back to the text of an HTML part.
fn body_text(parsed: &ParsedMail) -> Result<String, ExtractError> {
    if parsed.subparts.is_empty() {
        let body = parsed.get_body()?;
        if parsed.ctype.mimetype.eq_ignore_ascii_case("text/html") {
            return Ok(html_to_text(&body));
        }
        return Ok(body);
    }

    if let Some(part) = find_part(parsed, "text/plain") {
        return Ok(part.get_body()?);
    }
    if let Some(part) = find_part(parsed, "text/html") {
        return Ok(html_to_text(&part.get_body()?));
    }
    Ok(String::new())
}

fn find_part<'a>(parsed: &'a ParsedMail<'a>, mimetype: &str) -> Option<&'a ParsedMail<'a>> {
    if parsed.subparts.is_empty() {
        return parsed
            .ctype
            .mimetype
            .eq_ignore_ascii_case(mimetype)
            .then_some(parsed);
    }
    parsed.subparts.iter().find_map(|p| find_part(p, mimetype))
}

fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document.root_element().text().collect::<Vec<_>>().join(" ")
}

/// One way of pulling a field out of a message.
pub trait FieldMatcher {
    fn find(&self, msg: &MessageText, text: &str) -> Option<String>;
}

/// First capture group of a regex over subject + body.
pub struct CapturePattern {
    re: Regex,
    min_chars: usize,
    reject_unknown: bool,
}

impl CapturePattern {
    pub fn new(pattern: &str, min_chars: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            re: Regex::new(pattern)?,
            min_chars,
            reject_unknown: false,
        })
    }

    /// Treat a literal "unknown" capture as no match.
    pub fn rejecting_unknown(mut self) -> Self {
        self.reject_unknown = true;
        self
    }
}

impl FieldMatcher for CapturePattern {
    fn find(&self, _msg: &MessageText, text: &str) -> Option<String> {
        let value = self.re.captures(text)?.get(1)?.as_str().trim();
        if value.chars().count() < self.min_chars
            || (self.reject_unknown && value.eq_ignore_ascii_case("unknown"))
        {
            return None;
        }
        Some(value.to_string())
    }
}

/// Company from the sender's mail domain, e.g. `jobs@acme.com` -> "Acme".
pub struct SenderDomain {
    re: Regex,
}

impl SenderDomain {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            re: Regex::new(r"@([^>.\s]+)")?,
        })
    }
}

impl FieldMatcher for SenderDomain {
    fn find(&self, msg: &MessageText, _text: &str) -> Option<String> {
        let domain = self.re.captures(&msg.from)?.get(1)?.as_str();
        if GENERIC_DOMAINS.contains(&domain.to_lowercase().as_str()) {
            return None;
        }
        Some(title_case(domain))
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Ordered matcher cascades for company and position.
pub struct Extractor {
    company: Vec<Box<dyn FieldMatcher>>,
    position: Vec<Box<dyn FieldMatcher>>,
}

impl Extractor {
    pub fn new() -> Result<Self, regex::Error> {
        let company: Vec<Box<dyn FieldMatcher>> = vec![
            Box::new(
                CapturePattern::new(r"(?i)application (?:was sent to|to) ([^-,\n.!]+)", 3)?
                    .rejecting_unknown(),
            ),
            Box::new(
                CapturePattern::new(r"(?i)from ([A-Z][a-zA-Z\s&]+) (?:<|$)", 3)?
                    .rejecting_unknown(),
            ),
            Box::new(
                CapturePattern::new(r"(?i)thank you for applying to ([^,\n.!]+)", 3)?
                    .rejecting_unknown(),
            ),
            Box::new(SenderDomain::new()?),
        ];

        let position: Vec<Box<dyn FieldMatcher>> = vec![
            Box::new(CapturePattern::new(
                r"(?i)application (?:received for|for) (?:the )?([^,\n.!]+?) (?:role|position)",
                4,
            )?),
            Box::new(CapturePattern::new(r"(?i)(?:position|role):\s*([^\n,]+)", 4)?),
        ];

        Ok(Self { company, position })
    }

    pub fn extract_raw(&self, raw: &[u8]) -> Result<Option<Candidate>, ExtractError> {
        let msg = MessageText::from_raw(raw)?;
        Ok(self.extract(&msg))
    }

    /// `None` means the message is not a usable application update.
    pub fn extract(&self, msg: &MessageText) -> Option<Candidate> {
        if !is_job_related(msg) || is_noise(msg) {
            return None;
        }

        let text = msg.text();
        let company = first_match(&self.company, msg, &text)
            .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
        let position = first_match(&self.position, msg, &text)
            .unwrap_or_else(|| UNKNOWN_POSITION.to_string());
        let status = Status::classify(&text.to_lowercase());
        let date = message_date(&msg.date)
            .unwrap_or_else(|| Local::now().date_naive())
            .format("%Y-%m-%d")
            .to_string();

        if company == UNKNOWN_COMPANY || position == UNKNOWN_POSITION {
            return None;
        }

        let response_date = if status == Status::ApplicationSent {
            String::new()
        } else {
            date.clone()
        };
        let subject: String = msg.subject.chars().take(SUBJECT_IN_NOTES).collect();

        Some(Candidate {
            date_applied: date,
            company,
            position_title: position,
            status: status.as_str().to_string(),
            source: "Email".to_string(),
            response_date,
            notes: format!("Detected from email: {}", subject),
        })
    }
}

fn first_match(matchers: &[Box<dyn FieldMatcher>], msg: &MessageText, text: &str) -> Option<String> {
    matchers.iter().find_map(|m| m.find(msg, text))
}

pub fn is_job_related(msg: &MessageText) -> bool {
    let text = format!("{}{}", msg.subject, msg.body).to_lowercase();
    contains_any(&text, JOB_KEYWORDS)
}

pub fn is_noise(msg: &MessageText) -> bool {
    let text = format!("{}{}", msg.from, msg.subject).to_lowercase();
    contains_any(&text, NOISE_PATTERNS)
}

/// Calendar date of a Date header, in the sender's own offset.
pub fn message_date(header: &str) -> Option<NaiveDate> {
    let header = header.trim();
    if header.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(header) {
        return Some(dt.date_naive());
    }
    let ts = mailparse::dateparse(header).ok()?;
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}
