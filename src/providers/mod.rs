//! Toll portal adapters.

pub mod drive_ez_md;
pub mod ez_pass_ny;
pub mod portal;

pub use portal::{PortalProfile, PortalProvider};

use crate::config::AppConfig;
use crate::traits::TollProvider;

/// All registered providers in their fixed processing order.
///
/// Providers are constructed fresh for every run; nothing carries over
/// between runs.
pub fn default_providers(config: &AppConfig) -> Vec<Box<dyn TollProvider>> {
    vec![
        Box::new(drive_ez_md::provider(
            config.drive_ez_md.clone(),
            config.headless,
            config.timeout,
        )),
        Box::new(ez_pass_ny::provider(
            config.ez_pass_ny.clone(),
            config.headless,
            config.timeout,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderId;

    #[test]
    fn test_fixed_provider_order() {
        let providers = default_providers(&AppConfig::default());
        let ids: Vec<ProviderId> = providers.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![ProviderId::DriveEzMd, ProviderId::EzPassNy]);
    }
}
