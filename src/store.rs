use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::extract::Status;
use crate::models::{
    Application, ApplicationFilter, ApplicationUpdate, COLUMNS, Candidate, CompanyCount,
    MergeSummary, SourceStats, Stats, StatusCount, Timeline,
};

pub type Result<T> = std::result::Result<T, StoreError>;

const TOP_COMPANIES: usize = 10;
const MERGE_COMPANY_SIMILARITY: f64 = 0.85;

/// CSV-backed application store. Records are addressed by row position.
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".backup");
        PathBuf::from(name)
    }

    /// All records, or an empty list if the file is missing or unreadable.
    pub fn load(&self) -> Vec<Application> {
        match self.try_load() {
            Ok(records) => records,
            Err(e) => {
                error!("Error reading {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Like `load`, but a read failure is reported instead of hidden.
    /// Mutations go through here so a bad read never becomes an empty write.
    pub fn try_load(&self) -> Result<Vec<Application>> {
        if !self.path.exists() {
            warn!("{} not found, starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| StoreError::csv(&self.path, e))?;

        // Column index in the file for each known field, if present.
        let headers = rdr
            .headers()
            .map_err(|e| StoreError::csv(&self.path, e))?
            .clone();
        let positions: Vec<Option<usize>> = COLUMNS
            .iter()
            .map(|col| {
                headers
                    .iter()
                    .position(|h| h.trim_start_matches('\u{feff}').trim() == *col)
            })
            .collect();

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row.map_err(|e| StoreError::csv(&self.path, e))?;
            let mut app = Application::default();
            for (field, pos) in positions.iter().enumerate() {
                let value = pos.and_then(|p| row.get(p)).unwrap_or("");
                if let Some(slot) = app.field_mut(field) {
                    *slot = value.to_string();
                }
            }
            records.push(app);
        }

        info!("Loaded {} applications from {}", records.len(), self.path.display());
        Ok(records)
    }

    /// Back up the current file (best effort), then replace it atomically.
    pub fn save(&self, records: &[Application]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        if self.path.exists() {
            let backup = self.backup_path();
            if let Err(e) = fs::copy(&self.path, &backup) {
                warn!("Could not write backup {}: {}", backup.display(), e);
            }
        }

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file_mut());
            wtr.write_record(COLUMNS)
                .map_err(|e| StoreError::csv(&self.path, e))?;
            for record in records {
                wtr.write_record(record.fields())
                    .map_err(|e| StoreError::csv(&self.path, e))?;
            }
            wtr.flush().map_err(|e| StoreError::io(&self.path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        info!("Wrote {} applications to {}", records.len(), self.path.display());
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<Application> {
        self.load().into_iter().nth(index)
    }

    /// Append a record and return its position.
    pub fn insert(&self, mut app: Application) -> Result<usize> {
        require_name("company", &app.company)?;
        require_name("position", &app.position_title)?;
        if app.date_applied.trim().is_empty() {
            app.date_applied = today();
        }

        let mut records = self.try_load()?;
        records.push(app);
        self.save(&records)?;
        Ok(records.len() - 1)
    }

    pub fn update(&self, index: usize, update: &ApplicationUpdate) -> Result<()> {
        let mut records = self.try_load()?;
        let len = records.len();
        let record = records
            .get_mut(index)
            .ok_or(StoreError::NotFound { index, len })?;

        if let Some(company) = &update.company {
            require_name("company", company)?;
        }
        if let Some(position) = &update.position_title {
            require_name("position", position)?;
        }

        for (field, value) in update.fields().into_iter().enumerate() {
            if let (Some(value), Some(slot)) = (value, record.field_mut(field)) {
                *slot = value.to_string();
            }
        }

        self.save(&records)
    }

    /// Remove a record; later records move up one position.
    pub fn delete(&self, index: usize) -> Result<Application> {
        let mut records = self.try_load()?;
        if index >= records.len() {
            return Err(StoreError::NotFound {
                index,
                len: records.len(),
            });
        }
        let removed = records.remove(index);
        self.save(&records)?;
        Ok(removed)
    }

    pub fn stats(&self) -> Stats {
        let records = self.load();
        let total = records.len();
        let responded = records.iter().filter(|r| r.has_response()).count();

        let active_count = records
            .iter()
            .filter(|r| r.status.contains("Applied") && !r.has_response())
            .count();
        let phishing_count = records
            .iter()
            .filter(|r| r.status.contains("PHISHING"))
            .count();

        let top_companies = count_by(&records, |r| r.company.as_str())
            .into_iter()
            .take(TOP_COMPANIES)
            .map(|(company, count)| CompanyCount {
                company: company.to_string(),
                count,
            })
            .collect();

        Stats {
            total,
            response_rate: percent(responded, total),
            active_count,
            phishing_count,
            top_companies,
        }
    }

    /// Newest first by Date_Applied.
    pub fn recent(&self, limit: usize) -> Vec<Application> {
        let mut records = self.load();
        records.sort_by(|a, b| b.date_applied.cmp(&a.date_applied));
        records.truncate(limit);
        records
    }

    pub fn filter(&self, filter: &ApplicationFilter) -> Vec<Application> {
        self.load()
            .into_iter()
            .filter(|r| matches(r, filter))
            .collect()
    }

    pub fn phishing(&self) -> Vec<Application> {
        self.filter(&ApplicationFilter {
            status: Some("PHISHING".to_string()),
            ..Default::default()
        })
    }

    /// Applications and responses per month for the last `months` months
    /// that have applications.
    pub fn timeline(&self, months: usize) -> Timeline {
        let records = self.load();

        let mut applied: BTreeMap<String, usize> = BTreeMap::new();
        let mut responded: HashMap<String, usize> = HashMap::new();
        for r in &records {
            if let Some(month) = month_of(&r.date_applied) {
                *applied.entry(month).or_default() += 1;
            }
            if let Some(month) = month_of(&r.response_date) {
                *responded.entry(month).or_default() += 1;
            }
        }

        let skip = applied.len().saturating_sub(months);
        let mut timeline = Timeline::default();
        for (month, count) in applied.into_iter().skip(skip) {
            timeline
                .responses
                .push(responded.get(&month).copied().unwrap_or(0));
            timeline.applications.push(count);
            timeline.labels.push(month);
        }
        timeline
    }

    pub fn status_breakdown(&self) -> Vec<StatusCount> {
        let records = self.load();
        let total = records.len();

        count_by(&records, |r| r.status.as_str())
            .into_iter()
            .map(|(status, count)| StatusCount {
                status: status.to_string(),
                count,
                percentage: percent(count, total),
            })
            .collect()
    }

    pub fn source_breakdown(&self) -> Vec<SourceStats> {
        let records = self.load();

        count_by(&records, |r| r.source.as_str())
            .into_iter()
            .map(|(source, applications)| {
                let responses = records
                    .iter()
                    .filter(|r| r.source == source && r.has_response())
                    .count();
                SourceStats {
                    source: source.to_string(),
                    applications,
                    responses,
                    response_rate: percent(responses, applications),
                }
            })
            .collect()
    }

    /// Fold scanned candidates into the store.
    ///
    /// A candidate matches an existing record with the same position and the
    /// same (or nearly the same) company. A match only ever moves the record
    /// forward: a later-stage status replaces an earlier one, and a response
    /// date fills an empty one. Anything unmatched is appended.
    pub fn merge_candidates(&self, candidates: &[Candidate]) -> Result<MergeSummary> {
        let mut records = self.try_load()?;
        let mut summary = MergeSummary::default();

        for candidate in candidates {
            match records.iter().position(|r| is_same_application(r, candidate)) {
                Some(i) => {
                    if apply_candidate(&mut records[i], candidate) {
                        summary.updated += 1;
                    } else {
                        summary.unchanged += 1;
                    }
                }
                None => {
                    records.push(Application::from(candidate.clone()));
                    summary.added += 1;
                }
            }
        }

        if summary.added + summary.updated > 0 {
            self.save(&records)?;
        }
        info!(
            "Merged candidates: {} added, {} updated, {} unchanged",
            summary.added, summary.updated, summary.unchanged
        );
        Ok(summary)
    }
}

fn require_name(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Invalid(format!("{what} must not be empty")));
    }
    Ok(())
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// `part / total` as a percentage rounded to one decimal, ties to even;
/// 0.0 when empty.
fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 100.0 * 10.0).round_ties_even() / 10.0
}

/// Status, source and company match as case-insensitive substrings,
/// priority exactly. Unset criteria match everything.
pub fn matches(record: &Application, filter: &ApplicationFilter) -> bool {
    contains_ci(&record.status, filter.status.as_deref())
        && filter
            .priority
            .as_deref()
            .is_none_or(|p| record.priority == p)
        && contains_ci(&record.source, filter.source.as_deref())
        && contains_ci(&record.company, filter.company.as_deref())
}

fn contains_ci(value: &str, needle: Option<&str>) -> bool {
    needle.is_none_or(|n| value.to_lowercase().contains(&n.to_lowercase()))
}

/// Occurrences of each non-empty key, most frequent first.
/// Ties keep first-seen order.
fn count_by<'a>(
    records: &'a [Application],
    key: impl Fn(&'a Application) -> &'a str,
) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for r in records {
        let k = key(r);
        if k.is_empty() {
            continue;
        }
        match index.get(k) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(k, counts.len());
                counts.push((k, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// `YYYY-MM` for an ISO date (a trailing time part is ignored).
fn month_of(date: &str) -> Option<String> {
    let date = date.trim();
    let day = date.get(..10).unwrap_or(date);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m").to_string())
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_same_application(record: &Application, candidate: &Candidate) -> bool {
    if normalize(&record.position_title) != normalize(&candidate.position_title) {
        return false;
    }
    let a = normalize(&record.company);
    let b = normalize(&candidate.company);
    a == b || strsim::normalized_levenshtein(&a, &b) >= MERGE_COMPANY_SIMILARITY
}

/// Returns true if the record changed.
fn apply_candidate(record: &mut Application, candidate: &Candidate) -> bool {
    let mut changed = false;

    // Hand-entered statuses count as "applied"; flagged phishing is final.
    let current = if record.status.is_empty() {
        0
    } else {
        Status::from_label(&record.status).map_or(Status::ApplicationSent.stage(), Status::stage)
    };
    if let Some(incoming) = Status::from_label(&candidate.status) {
        if incoming.stage() > current && !record.status.contains("PHISHING") {
            record.status = candidate.status.clone();
            changed = true;
        }
    }

    if !record.has_response() && !candidate.response_date.is_empty() {
        record.response_date = candidate.response_date.clone();
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(company: &str, position: &str) -> Application {
        Application {
            date_applied: "2024-01-01".to_string(),
            company: company.to_string(),
            position_title: position.to_string(),
            ..Default::default()
        }
    }

    fn store_with(records: &[Application]) -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("tracker.csv"));
        store.save(records).unwrap();
        (dir, store)
    }

    fn candidate(company: &str, position: &str, status: &str, response: &str) -> Candidate {
        Candidate {
            date_applied: "2024-03-01".to_string(),
            company: company.to_string(),
            position_title: position.to_string(),
            status: status.to_string(),
            source: "Email".to_string(),
            response_date: response.to_string(),
            notes: "Detected from email: test".to_string(),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("nope.csv"));
        assert!(store.load().is_empty());
        assert!(store.get(0).is_none());
    }

    #[test]
    fn test_load_fills_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        fs::write(&path, "Company,Position_Title,Status\nAcme,Engineer,Applied_LinkedIn\nBeta,Analyst\n").unwrap();

        let records = Store::open(&path).load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company, "Acme");
        assert_eq!(records[0].status, "Applied_LinkedIn");
        assert_eq!(records[0].notes, "");
        assert_eq!(records[1].position_title, "Analyst");
        assert_eq!(records[1].status, "");
    }

    #[test]
    fn test_insert_round_trips_all_fields() {
        let (_dir, store) = store_with(&[]);
        let full = Application {
            date_applied: "2024-02-03".to_string(),
            company: "Acme, Inc.".to_string(),
            position_title: "Staff \"Platform\" Engineer".to_string(),
            location: "Remote".to_string(),
            contact_name: "Pat Doe".to_string(),
            contact_email: "pat@acme.test".to_string(),
            source: "LinkedIn".to_string(),
            status: "Applied_LinkedIn".to_string(),
            response_date: "".to_string(),
            next_action: "Wait for response".to_string(),
            priority: "HIGH".to_string(),
            notes: "line one\nline two".to_string(),
        };
        assert_eq!(store.insert(full.clone()).unwrap(), 0);
        assert_eq!(store.load(), vec![full]);
    }

    #[test]
    fn test_insert_backfills_date() {
        let (_dir, store) = store_with(&[]);
        let mut new = app("Acme", "Engineer");
        new.date_applied.clear();
        store.insert(new).unwrap();
        assert_eq!(store.get(0).unwrap().date_applied, today());
    }

    #[test]
    fn test_insert_rejects_blank_company() {
        let (_dir, store) = store_with(&[]);
        let err = store.insert(app("  ", "Engineer")).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_writes_header_and_backup() {
        let (_dir, store) = store_with(&[app("Acme", "Engineer")]);
        store.insert(app("Beta", "Analyst")).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with(&COLUMNS.join(",")));

        let backup = Store::open(store.backup_path()).load();
        assert_eq!(backup.len(), 1);
        assert_eq!(backup[0].company, "Acme");
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let (_dir, store) = store_with(&[app("Acme", "Engineer")]);
        let update = ApplicationUpdate {
            status: Some("Rejected".to_string()),
            response_date: Some("2024-01-20".to_string()),
            ..Default::default()
        };
        store.update(0, &update).unwrap();

        let record = store.get(0).unwrap();
        assert_eq!(record.status, "Rejected");
        assert_eq!(record.response_date, "2024-01-20");
        assert_eq!(record.company, "Acme");
        assert_eq!(record.date_applied, "2024-01-01");
    }

    #[test]
    fn test_update_out_of_bounds() {
        let (_dir, store) = store_with(&[app("Acme", "Engineer")]);
        let err = store.update(1, &ApplicationUpdate::default()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { index: 1, len: 1 }));
    }

    #[test]
    fn test_update_out_of_bounds_wins_over_blank_name() {
        let (_dir, store) = store_with(&[app("Acme", "Engineer")]);
        let update = ApplicationUpdate {
            company: Some(String::new()),
            ..Default::default()
        };
        let err = store.update(5, &update).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { index: 5, len: 1 }));
        assert!(matches!(store.update(0, &update), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn test_unreadable_file_degrades_reads_and_blocks_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.csv");
        let mut bytes = b"Date_Applied,Company,Position_Title\n2024-01-01,".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        bytes.extend_from_slice(b",Engineer\n");
        fs::write(&path, &bytes).unwrap();

        let store = Store::open(&path);
        assert!(store.load().is_empty());
        assert!(store.insert(app("Acme", "Engineer")).is_err());
        assert!(store.delete(0).is_err());
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_delete_compacts_positions() {
        let (_dir, store) = store_with(&[app("A", "One"), app("B", "Two"), app("C", "Three")]);
        let removed = store.delete(1).unwrap();
        assert_eq!(removed.company, "B");
        assert_eq!(store.get(1).unwrap().company, "C");
        assert_eq!(store.load().len(), 2);
        assert!(matches!(store.delete(2), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_stats_scenario() {
        let mut first = app("A", "One");
        first.status = "Applied_X".to_string();
        let mut second = app("A", "Two");
        second.status = "Rejected".to_string();
        second.response_date = "2024-01-05".to_string();
        let (_dir, store) = store_with(&[first, second]);

        let stats = store.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.response_rate, 50.0);
        assert_eq!(stats.active_count, 1);
        assert_eq!(stats.phishing_count, 0);
        assert_eq!(
            stats.top_companies,
            vec![CompanyCount {
                company: "A".to_string(),
                count: 2
            }]
        );
    }

    #[test]
    fn test_stats_empty_and_rounding() {
        let (_dir, store) = store_with(&[]);
        assert_eq!(store.stats().response_rate, 0.0);

        let mut records = vec![app("A", "1"), app("B", "2"), app("C", "3")];
        records[0].response_date = "2024-01-02".to_string();
        records[1].status = "⚠ PHISHING".to_string();
        let (_dir, store) = store_with(&records);
        let stats = store.stats();
        assert_eq!(stats.response_rate, 33.3);
        assert_eq!(stats.phishing_count, 1);
    }

    #[test]
    fn test_percentages_round_ties_to_even() {
        let mut records: Vec<Application> = (0..16).map(|i| app("A", &i.to_string())).collect();
        records[0].response_date = "2024-01-02".to_string();
        let (_dir, store) = store_with(&records);
        assert_eq!(store.stats().response_rate, 6.2);
        assert_eq!(percent(5, 16), 31.2);
        assert_eq!(percent(3, 16), 18.8);
    }

    #[test]
    fn test_top_companies_ties_keep_first_seen() {
        let records = vec![
            app("Zeta", "1"),
            app("Acme", "2"),
            app("Acme", "3"),
            app("Beta", "4"),
        ];
        let (_dir, store) = store_with(&records);
        let names: Vec<_> = store
            .stats()
            .top_companies
            .into_iter()
            .map(|c| c.company)
            .collect();
        assert_eq!(names, vec!["Acme", "Zeta", "Beta"]);
    }

    #[test]
    fn test_recent_sorts_descending() {
        let mut records = vec![app("A", "1"), app("B", "2"), app("C", "3")];
        records[0].date_applied = "2024-01-10".to_string();
        records[1].date_applied = "2024-03-01".to_string();
        records[2].date_applied = "2024-02-15".to_string();
        let (_dir, store) = store_with(&records);

        let recent: Vec<_> = store.recent(2).into_iter().map(|r| r.company).collect();
        assert_eq!(recent, vec!["B", "C"]);
    }

    #[test]
    fn test_filter_company_substring_case_insensitive() {
        let records = vec![
            app("Acme Corp", "1"),
            app("ACME", "2"),
            app("Subacme", "3"),
            app("Globex", "4"),
        ];
        let (_dir, store) = store_with(&records);
        let filter = ApplicationFilter {
            company: Some("acme".to_string()),
            ..Default::default()
        };
        let found: Vec<_> = store.filter(&filter).into_iter().map(|r| r.company).collect();
        assert_eq!(found, vec!["Acme Corp", "ACME", "Subacme"]);
    }

    #[test]
    fn test_filter_criteria_are_anded() {
        let mut records = vec![app("Acme", "1"), app("Acme", "2"), app("Beta", "3")];
        records[0].priority = "HIGH".to_string();
        records[0].source = "LinkedIn".to_string();
        records[1].priority = "high".to_string();
        records[1].source = "LinkedIn".to_string();
        records[2].priority = "HIGH".to_string();
        records[2].source = "Referral".to_string();
        let (_dir, store) = store_with(&records);

        let filter = ApplicationFilter {
            priority: Some("HIGH".to_string()),
            source: Some("linked".to_string()),
            ..Default::default()
        };
        let found = store.filter(&filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].position_title, "1");
        assert_eq!(store.filter(&ApplicationFilter::default()).len(), 3);
    }

    #[test]
    fn test_phishing_lists_flagged_records() {
        let mut records = vec![app("Legit", "1"), app("Scam", "2")];
        records[1].status = "⚠ PHISHING".to_string();
        let (_dir, store) = store_with(&records);
        let found = store.phishing();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].company, "Scam");
    }

    #[test]
    fn test_timeline_last_months_aligned() {
        let dates = [
            ("2024-01-05", ""),
            ("2024-02-10", "2024-03-01"),
            ("2024-02-11", ""),
            ("2024-03-20", "2024-03-25"),
            ("2024-04-02", ""),
            ("not a date", ""),
        ];
        let records: Vec<_> = dates
            .iter()
            .map(|(applied, response)| Application {
                date_applied: applied.to_string(),
                response_date: response.to_string(),
                ..app("A", "B")
            })
            .collect();
        let (_dir, store) = store_with(&records);

        let timeline = store.timeline(3);
        assert_eq!(timeline.labels, vec!["2024-02", "2024-03", "2024-04"]);
        assert_eq!(timeline.applications, vec![2, 1, 1]);
        assert_eq!(timeline.responses, vec![0, 2, 0]);

        let all = store.timeline(12);
        assert_eq!(all.labels.len(), 4);
        assert_eq!(all.applications.len(), all.labels.len());
        assert_eq!(all.responses.len(), all.labels.len());
    }

    #[test]
    fn test_status_breakdown() {
        let mut records = vec![app("A", "1"), app("B", "2"), app("C", "3"), app("D", "4")];
        records[0].status = "Applied_LinkedIn".to_string();
        records[1].status = "Rejected".to_string();
        records[2].status = "Rejected".to_string();
        let (_dir, store) = store_with(&records);

        let breakdown = store.status_breakdown();
        assert_eq!(
            breakdown,
            vec![
                StatusCount {
                    status: "Rejected".to_string(),
                    count: 2,
                    percentage: 50.0
                },
                StatusCount {
                    status: "Applied_LinkedIn".to_string(),
                    count: 1,
                    percentage: 25.0
                },
            ]
        );
    }

    #[test]
    fn test_source_breakdown() {
        let mut records = vec![app("A", "1"), app("B", "2"), app("C", "3")];
        records[0].source = "Referral".to_string();
        records[0].response_date = "2024-01-09".to_string();
        records[1].source = "LinkedIn".to_string();
        records[2].source = "LinkedIn".to_string();
        records[2].response_date = "2024-01-12".to_string();
        let (_dir, store) = store_with(&records);

        let breakdown = store.source_breakdown();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].source, "LinkedIn");
        assert_eq!(breakdown[0].applications, 2);
        assert_eq!(breakdown[0].responses, 1);
        assert_eq!(breakdown[0].response_rate, 50.0);
        assert_eq!(breakdown[1].source, "Referral");
        assert_eq!(breakdown[1].response_rate, 100.0);
    }

    #[test]
    fn test_merge_adds_unmatched_and_advances_matched() {
        let mut existing = app("Acme Corp", "Data Analyst");
        existing.status = "Applied_LinkedIn".to_string();
        let (_dir, store) = store_with(&[existing]);

        let summary = store
            .merge_candidates(&[
                candidate("ACME Corp.", "data analyst", "Interview_Invitation", "2024-03-01"),
                candidate("Globex", "Engineer", "Application_Sent", ""),
            ])
            .unwrap();
        assert_eq!(
            summary,
            MergeSummary {
                added: 1,
                updated: 1,
                unchanged: 0
            }
        );

        let records = store.load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, "Interview_Invitation");
        assert_eq!(records[0].response_date, "2024-03-01");
        assert_eq!(records[1].company, "Globex");
        assert_eq!(records[1].source, "Email");
    }

    #[test]
    fn test_merge_never_moves_status_backwards() {
        let mut existing = app("Acme", "Engineer");
        existing.status = "Rejected".to_string();
        existing.response_date = "2024-02-01".to_string();
        let (_dir, store) = store_with(&[existing]);

        let summary = store
            .merge_candidates(&[candidate("Acme", "Engineer", "Application_Acknowledged", "2024-01-15")])
            .unwrap();
        assert_eq!(summary.unchanged, 1);
        let record = store.get(0).unwrap();
        assert_eq!(record.status, "Rejected");
        assert_eq!(record.response_date, "2024-02-01");
    }
}
