//! DriveEzMD (Maryland) portal profile.

use std::time::Duration;

use crate::config::Credentials;
use crate::parse::LineGrammar;
use crate::providers::portal::{PortalProfile, PortalProvider};
use crate::types::ProviderId;

const LOGIN_URL: &str = "https://www.driveezmd.com/Home/Account/Login";
const STATEMENTS_URL: &str = "https://www.driveezmd.com/Statements";

pub fn profile() -> PortalProfile {
    PortalProfile {
        id: ProviderId::DriveEzMd,
        name: "DriveEzMD",
        login_url: LOGIN_URL,
        statements_url: STATEMENTS_URL,
        username_selector: "input[name='UserName']",
        password_selector: "input[name='Password']",
        submit_selector: "button[type='submit']",
        file_prefix: "driveezmd",
        // DriveEzMD statements carry no posted-date column.
        grammar: LineGrammar::transaction_date_only(),
    }
}

pub fn provider(credentials: Credentials, headless: bool, timeout: Duration) -> PortalProvider {
    PortalProvider::new(profile(), credentials, headless, timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_matches_statement_line() {
        let profile = profile();
        let parsed = profile
            .grammar
            .parse_line("02/01/2024  ABC123  TAG9  FORT MCHENRY TUNNEL  $3.00")
            .unwrap();

        assert_eq!(parsed.posted_date, None);
        assert_eq!(parsed.plate.as_deref(), Some("ABC123"));
        assert_eq!(parsed.amount_cents, 300);
    }

    #[test]
    fn test_grammar_never_emits_posted_date() {
        let profile = profile();
        // A second date token reads as the plate column failing to match,
        // not as a posted date.
        let parsed =
            profile.grammar.parse_line("02/01/2024  02/03/2024  ABC123  TAG9  TUNNEL  $3.00");
        assert!(parsed.is_none() || parsed.unwrap().posted_date.is_none());
    }
}
