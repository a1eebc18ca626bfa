//! Shared portal flow: login, statement discovery, download and parsing.
//!
//! The two supported portals differ only in login field selectors,
//! navigation targets and the transaction-line grammar, so all of that is
//! carried as per-variant configuration data in [`PortalProfile`] and one
//! [`PortalProvider`] drives the flow for both.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::error::TollError;
use crate::parse::{self, LineGrammar};
use crate::session::BrowserSession;
use crate::traits::TollProvider;
use crate::types::{ProviderContext, ProviderId, StatementMetadata, TollTransaction};

const LOGIN_SETTLE: Duration = Duration::from_secs(3);
const PAGE_SETTLE: Duration = Duration::from_secs(2);
const DOWNLOAD_POLL: Duration = Duration::from_millis(500);

/// Site-specific configuration for one toll portal.
#[derive(Debug, Clone)]
pub struct PortalProfile {
    pub id: ProviderId,
    pub name: &'static str,
    pub login_url: &'static str,
    pub statements_url: &'static str,
    pub username_selector: &'static str,
    pub password_selector: &'static str,
    pub submit_selector: &'static str,
    /// Prefix for the provider+date-scoped download file name.
    pub file_prefix: &'static str,
    pub grammar: LineGrammar,
}

pub struct PortalProvider {
    profile: PortalProfile,
    credentials: Credentials,
    headless: bool,
    timeout: Duration,
    session: Option<BrowserSession>,
}

impl PortalProvider {
    pub fn new(
        profile: PortalProfile,
        credentials: Credentials,
        headless: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            profile,
            credentials,
            headless,
            timeout,
            session: None,
        }
    }

    fn session(&self) -> Result<&BrowserSession, TollError> {
        self.session
            .as_ref()
            .ok_or_else(|| TollError::BrowserInit("browser session not open".into()))
    }

    async fn login(&self) -> Result<(), TollError> {
        let page = self.session()?.page()?.clone();
        info!("logging into {}", self.profile.name);

        page.goto(self.profile.login_url)
            .await
            .map_err(|e| TollError::Navigation(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| TollError::Navigation(e.to_string()))?;

        page.find_element(self.profile.username_selector)
            .await
            .map_err(|e| TollError::ElementNotFound(format!("username field: {}", e)))?
            .type_str(&self.credentials.username)
            .await
            .map_err(|e| TollError::Login(format!("username entry: {}", e)))?;

        page.find_element(self.profile.password_selector)
            .await
            .map_err(|e| TollError::ElementNotFound(format!("password field: {}", e)))?
            .type_str(&self.credentials.password)
            .await
            .map_err(|e| TollError::Login(format!("password entry: {}", e)))?;

        page.find_element(self.profile.submit_selector)
            .await
            .map_err(|e| TollError::ElementNotFound(format!("login button: {}", e)))?
            .click()
            .await
            .map_err(|e| TollError::Login(format!("login submit: {}", e)))?;

        tokio::time::sleep(LOGIN_SETTLE).await;
        info!("logged into {}", self.profile.name);
        Ok(())
    }

    async fn open_statements_page(&self) -> Result<(), TollError> {
        let page = self.session()?.page()?.clone();
        info!("navigating to {} statements", self.profile.name);

        page.goto(self.profile.statements_url)
            .await
            .map_err(|e| TollError::Navigation(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| TollError::Navigation(e.to_string()))?;
        tokio::time::sleep(PAGE_SETTLE).await;
        Ok(())
    }

    /// Text of the newest statement row's date cell, empty only when the
    /// portal genuinely lists no statements. A failed evaluate is a session
    /// problem and propagates as an error rather than reading as an empty
    /// statement list.
    async fn first_statement_date_text(&self) -> Result<String, TollError> {
        let page = self.session()?.page()?.clone();

        let text: String = page
            .evaluate(
                r#"
                (function() {
                    var row = document.querySelector('table tbody tr');
                    if (!row) return '';
                    var cell = row.querySelector('td');
                    return cell ? cell.textContent.trim() : '';
                })()
                "#,
            )
            .await
            .map_err(|e| TollError::Navigation(format!("statement list query: {}", e)))?
            .into_value()
            .map_err(|e| TollError::Navigation(format!("statement list query: {}", e)))?;

        Ok(text)
    }

    /// Click the newest row's Download/PDF trigger, falling back to the row
    /// itself when the portal makes the whole row clickable.
    async fn click_download_trigger(&self) -> Result<(), TollError> {
        let page = self.session()?.page()?.clone();

        let clicked: bool = page
            .evaluate(
                r#"
                (function() {
                    var row = document.querySelector('table tbody tr');
                    if (!row) return false;
                    var candidates = row.querySelectorAll('a, button');
                    for (var i = 0; i < candidates.length; i++) {
                        var text = candidates[i].textContent;
                        if (text.indexOf('Download') >= 0 || text.indexOf('PDF') >= 0) {
                            candidates[i].click();
                            return true;
                        }
                    }
                    row.click();
                    return true;
                })()
                "#,
            )
            .await
            .map_err(|e| TollError::Navigation(format!("download trigger: {}", e)))?
            .into_value()
            .map_err(|e| TollError::Navigation(format!("download trigger: {}", e)))?;

        if !clicked {
            return Err(TollError::ElementNotFound(
                "statement download trigger".into(),
            ));
        }
        debug!("download trigger clicked");
        Ok(())
    }

    /// Wait for a new, fully written file to land in the download directory.
    async fn wait_for_download(
        &self,
        dir: &Path,
        existing: &HashSet<PathBuf>,
    ) -> Result<PathBuf, TollError> {
        let start = std::time::Instant::now();

        loop {
            if let Some(path) = find_new_file(dir, existing) {
                info!("statement file detected: {:?}", path);
                return Ok(path);
            }

            if start.elapsed() > self.timeout {
                return Err(TollError::Timeout(format!(
                    "statement download did not finish within {:?}",
                    self.timeout
                )));
            }

            tokio::time::sleep(DOWNLOAD_POLL).await;
        }
    }
}

fn list_files(dir: &Path) -> HashSet<PathBuf> {
    std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect()
}

fn find_new_file(dir: &Path, existing: &HashSet<PathBuf>) -> Option<PathBuf> {
    list_files(dir)
        .into_iter()
        .filter(|path| !existing.contains(path))
        .find(|path| {
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            !name.ends_with(".crdownload") && !name.ends_with(".tmp")
        })
}

/// Extracted text of a downloaded statement. PDF statements go through
/// pdf-extract; anything else is read as plain text so fixtures can exercise
/// the parse path.
fn statement_text(path: &Path) -> Result<String, TollError> {
    let is_pdf = path
        .extension()
        .map(|ext| ext.to_ascii_lowercase() == "pdf")
        .unwrap_or(false);

    if is_pdf {
        pdf_extract::extract_text(path).map_err(|e| TollError::Extract(e.to_string()))
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[async_trait]
impl TollProvider for PortalProvider {
    fn id(&self) -> ProviderId {
        self.profile.id
    }

    fn name(&self) -> &'static str {
        self.profile.name
    }

    async fn acquire_latest_statement(
        &mut self,
        ctx: &ProviderContext,
    ) -> Result<Option<StatementMetadata>, TollError> {
        info!("checking {} for the latest statement", self.profile.name);

        let session = BrowserSession::launch(&ctx.download_dir, self.headless).await?;
        self.session = Some(session);

        self.login().await?;
        self.open_statements_page().await?;

        let date_text = self.first_statement_date_text().await?;
        if date_text.is_empty() {
            warn!("no statements found for {}", self.profile.name);
            return Ok(None);
        }

        let statement_date = match parse::normalize_date(&date_text) {
            Some(date) => date,
            None => {
                warn!(
                    "unable to determine statement date for {}: {:?}",
                    self.profile.name, date_text
                );
                return Ok(None);
            }
        };

        let existing = list_files(&ctx.download_dir);
        self.click_download_trigger().await?;
        let downloaded = self.wait_for_download(&ctx.download_dir, &existing).await?;

        // Provider+date-scoped name; re-acquiring the same statement
        // overwrites last run's file.
        let target = ctx
            .download_dir
            .join(format!("{}-{}.pdf", self.profile.file_prefix, statement_date));
        if target != downloaded {
            let _ = std::fs::remove_file(&target);
            std::fs::rename(&downloaded, &target)?;
        }
        info!("downloaded {} statement to {:?}", self.profile.name, target);

        Ok(Some(StatementMetadata {
            provider: self.profile.id,
            statement_date,
            period_start: None,
            period_end: None,
            file_path: target,
            downloaded_at: Utc::now(),
        }))
    }

    async fn parse_statement(
        &self,
        metadata: &StatementMetadata,
    ) -> Result<Vec<TollTransaction>, TollError> {
        info!(
            "parsing {} statement {:?}",
            self.profile.name, metadata.file_path
        );

        let text = statement_text(&metadata.file_path)?;
        let transactions = parse::parse_statement_text(
            &self.profile.grammar,
            metadata.provider,
            metadata.statement_date,
            &text,
        );

        info!(
            "parsed {} transactions from {} statement",
            transactions.len(),
            self.profile.name
        );
        Ok(transactions)
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_parse_statement_from_text_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("ezpassny-2024-03-01.txt");
        std::fs::write(
            &file_path,
            "Statement History\n03/01/2024  03/02/2024  ABC123  TAG9  EZPASS TOLL PLAZA  $4.50\nTotal  $4.50\n",
        )
        .unwrap();

        let provider = providers::ez_pass_ny::provider(
            Credentials::new("user", "pass"),
            true,
            Duration::from_secs(5),
        );

        let metadata = StatementMetadata {
            provider: ProviderId::EzPassNy,
            statement_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            period_start: None,
            period_end: None,
            file_path,
            downloaded_at: Utc::now(),
        };

        let transactions = provider.parse_statement(&metadata).await.unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].plate.as_deref(), Some("ABC123"));
        assert_eq!(
            transactions[0].posted_date,
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
        assert_eq!(transactions[0].amount_cents, 450);
    }

    #[test]
    fn test_find_new_file_skips_partials_and_existing() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.pdf");
        std::fs::write(&old, b"x").unwrap();
        let existing = list_files(dir.path());

        std::fs::write(dir.path().join("incoming.crdownload"), b"x").unwrap();
        assert_eq!(find_new_file(dir.path(), &existing), None);

        let fresh = dir.path().join("statement.pdf");
        std::fs::write(&fresh, b"x").unwrap();
        assert_eq!(find_new_file(dir.path(), &existing), Some(fresh));
    }
}
