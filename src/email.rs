use anyhow::Context;
use chrono::{Days, Local, NaiveDate};
use std::fs;
use std::net::{TcpStream, ToSocketAddrs};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use tracing::{debug, error, info};

use crate::error::ScanError;
use crate::extract::Extractor;
use crate::models::ScanReport;

pub type Result<T> = std::result::Result<T, ScanError>;

pub struct EmailConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout: std::time::Duration,
}

impl EmailConfig {
    pub fn gmail(username: &str, app_password: &str) -> Self {
        Self {
            server: "imap.gmail.com".to_string(),
            port: 993,
            username: username.to_string(),
            password: app_password.trim().to_string(),
            timeout: std::time::Duration::from_secs(30),
        }
    }

    pub fn read_password_file(password_file: &Path) -> anyhow::Result<String> {
        let password = fs::read_to_string(password_file)
            .with_context(|| format!("Failed to read password file: {:?}", password_file))?;
        Ok(password.trim().to_string())
    }
}

/// The mailbox operations a scan needs.
pub trait Mailbox {
    fn select(&mut self, mailbox: &str) -> Result<()>;
    /// Message ids received on or after `since`.
    fn search_since(&mut self, since: NaiveDate) -> Result<Vec<u32>>;
    /// Full RFC 822 message, if the server returned one.
    fn fetch(&mut self, id: u32) -> Result<Option<Vec<u8>>>;
    fn logout(&mut self) -> Result<()>;
}

pub trait Connect {
    type Mailbox: Mailbox;
    fn connect(&self) -> Result<Self::Mailbox>;
}

pub struct ImapConnector {
    config: EmailConfig,
}

impl ImapConnector {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

impl Connect for ImapConnector {
    type Mailbox = ImapMailbox;

    fn connect(&self) -> Result<ImapMailbox> {
        let cfg = &self.config;
        let connect_err = |reason: String| ScanError::Connect {
            server: cfg.server.clone(),
            port: cfg.port,
            reason,
        };

        let tls = native_tls::TlsConnector::builder().build()?;

        let addr = (cfg.server.as_str(), cfg.port)
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err("no address found".to_string()))?;
        let tcp = TcpStream::connect_timeout(&addr, cfg.timeout)
            .map_err(|e| connect_err(e.to_string()))?;
        tcp.set_read_timeout(Some(cfg.timeout))?;
        tcp.set_write_timeout(Some(cfg.timeout))?;
        let tls_stream = tls
            .connect(&cfg.server, tcp)
            .map_err(|e| connect_err(e.to_string()))?;

        let client = imap::Client::new(tls_stream);
        let session = client
            .login(&cfg.username, &cfg.password)
            .map_err(|(e, _)| ScanError::Login(e))?;

        info!("Connected to {} as {}", cfg.server, cfg.username);
        Ok(ImapMailbox {
            session,
            selected: false,
        })
    }
}

pub struct ImapMailbox {
    session: imap::Session<native_tls::TlsStream<TcpStream>>,
    selected: bool,
}

impl Mailbox for ImapMailbox {
    fn select(&mut self, mailbox: &str) -> Result<()> {
        self.session.select(mailbox)?;
        self.selected = true;
        Ok(())
    }

    fn search_since(&mut self, since: NaiveDate) -> Result<Vec<u32>> {
        let query = format!("SINCE {}", since.format("%d-%b-%Y"));
        let mut ids: Vec<u32> = self.session.search(query)?.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch(&mut self, id: u32) -> Result<Option<Vec<u8>>> {
        let messages = self.session.fetch(id.to_string(), "RFC822")?;
        Ok(messages.iter().find_map(|m| m.body()).map(<[u8]>::to_vec))
    }

    fn logout(&mut self) -> Result<()> {
        if self.selected {
            if let Err(e) = self.session.close() {
                debug!("Close failed: {}", e);
            }
            self.selected = false;
        }
        self.session.logout()?;
        Ok(())
    }
}

/// Logs out when dropped, whatever happened during the scan.
struct Session<M: Mailbox> {
    mailbox: M,
}

impl<M: Mailbox> Deref for Session<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.mailbox
    }
}

impl<M: Mailbox> DerefMut for Session<M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut self.mailbox
    }
}

impl<M: Mailbox> Drop for Session<M> {
    fn drop(&mut self) {
        match self.mailbox.logout() {
            Ok(()) => debug!("Disconnected from mailbox"),
            Err(e) => debug!("Logout failed: {}", e),
        }
    }
}

pub struct MailboxScanner<C: Connect> {
    connector: C,
    extractor: Extractor,
    mailbox: String,
    max_messages: usize,
}

impl<C: Connect> MailboxScanner<C> {
    pub fn new(connector: C, extractor: Extractor, mailbox: &str, max_messages: usize) -> Self {
        Self {
            connector,
            extractor,
            mailbox: mailbox.to_string(),
            max_messages,
        }
    }

    /// Scan the last `days` days of mail. A window reaching past the
    /// earliest representable date starts there.
    pub fn scan(&self, days: u32) -> ScanReport {
        let since = Local::now()
            .date_naive()
            .checked_sub_days(Days::new(days.into()))
            .unwrap_or(NaiveDate::MIN);
        self.scan_since(since)
    }

    pub fn scan_since(&self, since: NaiveDate) -> ScanReport {
        let mut report = ScanReport::default();

        let mut session = match self.connector.connect() {
            Ok(mailbox) => Session { mailbox },
            Err(e) => {
                error!("Mailbox connection failed: {}", e);
                report.errors.push(e.to_string());
                return report;
            }
        };

        if let Err(e) = self.scan_session(&mut session, since, &mut report) {
            error!("Error scanning emails: {}", e);
            report.errors.push(e.to_string());
        }

        info!(
            "Scanned {} emails: {} applications, {} errors",
            report.examined,
            report.candidates.len(),
            report.errors.len()
        );
        report
    }

    fn scan_session(
        &self,
        mailbox: &mut C::Mailbox,
        since: NaiveDate,
        report: &mut ScanReport,
    ) -> Result<()> {
        mailbox.select(&self.mailbox)?;

        let mut ids = mailbox.search_since(since)?;
        if ids.is_empty() {
            info!("No emails found since {}", since);
            return Ok(());
        }
        info!("Found {} emails to scan", ids.len());

        // Newest first, capped.
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.truncate(self.max_messages);

        for id in ids {
            report.examined += 1;

            let raw = match mailbox.fetch(id) {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    report.errors.push(format!("Email {}: no message returned", id));
                    continue;
                }
                Err(e) => {
                    report.errors.push(format!("Error fetching email {}: {}", id, e));
                    continue;
                }
            };

            match self.extractor.extract_raw(&raw) {
                Ok(Some(candidate)) => report.candidates.push(candidate),
                Ok(None) => debug!("Email {}: not an application update", id),
                Err(e) => report.errors.push(format!("Error parsing email {}: {}", id, e)),
            }
        }

        Ok(())
    }
}
