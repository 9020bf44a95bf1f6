//! Splitting the catalog into feed subscriptions.

use std::collections::HashSet;

use crate::domain::catalog::{BookPolicy, Catalog, SportsbookPolicy};
use crate::domain::id::{canonical_key, SportsbookId};
use crate::infrastructure::config::market::FilterConfig;
use crate::infrastructure::config::stream::MAX_LEAGUES_PER_GROUP;
use crate::port::outbound::feed::Subscription;

/// One feed connection's worth of leagues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGroup {
    pub index: usize,
    pub subscription: Subscription,
}

/// Chunk the active leagues of every selected sport into groups of at most
/// `max_leagues` (capped at [`MAX_LEAGUES_PER_GROUP`]).
///
/// Groups never mix sports. Indices follow sport then league order, so the
/// same catalog always yields the same plan.
#[must_use]
pub fn plan_groups(
    catalog: &Catalog,
    filters: &FilterConfig,
    policy: &SportsbookPolicy,
    max_leagues: usize,
) -> Vec<SessionGroup> {
    let chunk = max_leagues.clamp(1, MAX_LEAGUES_PER_GROUP);
    let sports: HashSet<String> = filters.sports.iter().map(|s| s.trim().to_lowercase()).collect();
    let leagues: HashSet<String> = filters.leagues.iter().map(|l| l.trim().to_lowercase()).collect();
    let sportsbooks = subscribed_books(catalog, policy);
    let markets: Vec<String> = filters.markets.iter().map(|m| canonical_key(m)).collect();

    let mut groups = Vec::new();
    for (sport, sport_leagues) in catalog.active_leagues_by_sport() {
        if !sports.is_empty() && !sports.contains(sport.as_str()) {
            continue;
        }
        let selected: Vec<_> = sport_leagues
            .into_iter()
            .filter(|l| leagues.is_empty() || leagues.contains(l.as_str()))
            .collect();
        for part in selected.chunks(chunk) {
            groups.push(SessionGroup {
                index: groups.len(),
                subscription: Subscription {
                    sport: sport.clone(),
                    leagues: part.to_vec(),
                    sportsbooks: sportsbooks.clone(),
                    markets: markets.clone(),
                    main_lines_only: filters.main_lines_only,
                },
            });
        }
    }
    groups
}

/// Books to request from the provider. Empty asks for all of them, and the
/// normalizer applies the policy.
fn subscribed_books(catalog: &Catalog, policy: &SportsbookPolicy) -> Vec<SportsbookId> {
    let active = catalog.active_sportsbooks();
    if active.is_empty() {
        return match policy.default_policy() {
            BookPolicy::Excluded => policy.explicitly_included(),
            BookPolicy::Included => Vec::new(),
        };
    }
    active.into_iter().filter(|b| policy.allows(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CatalogEntry, Category};
    use crate::domain::id::LeagueId;

    fn catalog(leagues: usize) -> Catalog {
        let mut entries = vec![
            CatalogEntry::new(Category::Sport, "soccer", "Soccer"),
            CatalogEntry::new(Category::Sport, "tennis", "Tennis").inactive(),
            CatalogEntry::league("tennis", "atp", "ATP"),
            CatalogEntry::new(Category::Sportsbook, "pinnacle", "Pinnacle"),
            CatalogEntry::new(Category::Sportsbook, "betfair_exchange_lay", "Betfair Exchange Lay"),
        ];
        for i in 0..leagues {
            entries.push(CatalogEntry::league("soccer", format!("league_{i:02}"), "L"));
        }
        Catalog::from_entries(entries).unwrap()
    }

    #[test]
    fn leagues_are_chunked_by_ten() {
        let policy = SportsbookPolicy::new(BookPolicy::Included);
        let groups = plan_groups(&catalog(23), &FilterConfig::default(), &policy, 10);
        let sizes: Vec<_> = groups.iter().map(|g| g.subscription.leagues.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        assert_eq!(groups[2].index, 2);
        assert!(groups.iter().all(|g| g.subscription.sport.as_str() == "soccer"));
    }

    #[test]
    fn group_size_never_exceeds_cap() {
        let policy = SportsbookPolicy::new(BookPolicy::Included);
        let groups = plan_groups(&catalog(12), &FilterConfig::default(), &policy, 50);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn filters_and_policy_shape_the_subscription() {
        let policy = SportsbookPolicy::new(BookPolicy::Included)
            .with("betfair_exchange_lay", BookPolicy::Excluded);
        let filters = FilterConfig {
            leagues: vec!["League_01".into()],
            markets: vec!["Moneyline".into()],
            ..FilterConfig::default()
        };
        let groups = plan_groups(&catalog(3), &filters, &policy, 10);
        assert_eq!(groups.len(), 1);
        let sub = &groups[0].subscription;
        assert_eq!(sub.leagues, vec![LeagueId::from("league_01")]);
        assert_eq!(sub.sportsbooks, vec![SportsbookId::from("pinnacle")]);
        assert_eq!(sub.markets, vec!["moneyline".to_string()]);
        assert!(sub.main_lines_only);
    }
}
