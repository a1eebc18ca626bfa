//! E-ZPass New York portal profile.

use std::time::Duration;

use crate::config::Credentials;
use crate::parse::LineGrammar;
use crate::providers::portal::{PortalProfile, PortalProvider};
use crate::types::ProviderId;

const LOGIN_URL: &str = "https://www.e-zpassny.com/ezpass/sign-in";
const STATEMENTS_URL: &str = "https://www.e-zpassny.com/vector/secure/account/statement";

pub fn profile() -> PortalProfile {
    PortalProfile {
        id: ProviderId::EzPassNy,
        name: "E-ZPass NY",
        login_url: LOGIN_URL,
        statements_url: STATEMENTS_URL,
        username_selector: "input[name='username']",
        password_selector: "input[name='password']",
        submit_selector: "button[type='submit']",
        file_prefix: "ezpassny",
        // E-ZPass NY statements may carry a posted-date column after the
        // transaction date.
        grammar: LineGrammar::with_posted_date(),
    }
}

pub fn provider(credentials: Credentials, headless: bool, timeout: Duration) -> PortalProvider {
    PortalProvider::new(profile(), credentials, headless, timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_grammar_with_posted_date() {
        let profile = profile();
        let parsed = profile
            .grammar
            .parse_line("03/01/2024  03/03/2024  ABC123  TAG9  VERRAZZANO BRIDGE  $6.94")
            .unwrap();

        assert_eq!(
            parsed.posted_date,
            NaiveDate::from_ymd_opt(2024, 3, 3)
        );
        assert_eq!(parsed.transponder.as_deref(), Some("TAG9"));
        assert_eq!(parsed.amount_cents, 694);
    }

    #[test]
    fn test_grammar_posted_date_is_optional() {
        let profile = profile();
        let parsed = profile
            .grammar
            .parse_line("03/01/2024  ABC123  TAG9  EZPASS TOLL PLAZA  $4.50")
            .unwrap();

        assert_eq!(parsed.posted_date, None);
        assert_eq!(parsed.plate.as_deref(), Some("ABC123"));
        assert_eq!(parsed.amount_cents, 450);
    }
}
