//! Connected-app usage, aggregated from OAuth tokens.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::OAuthToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedAppUsage {
    pub app_name: String,
    pub user_count: usize,
    pub total_use_count: u64,
    pub last_used: Option<DateTime<Utc>>,
}

/// One entry per app, most used first.
pub fn summarize_connected_apps(tokens: &[OAuthToken]) -> Vec<ConnectedAppUsage> {
    let mut by_app: BTreeMap<&str, (HashSet<&str>, u64, Option<DateTime<Utc>>)> = BTreeMap::new();

    for token in tokens {
        let entry = by_app.entry(token.app_name.as_str()).or_default();
        entry.0.insert(token.user_id.as_str());
        entry.1 += token.use_count;
        entry.2 = entry.2.max(token.last_used_date);
    }

    let mut apps: Vec<ConnectedAppUsage> = by_app
        .into_iter()
        .map(|(name, (users, uses, last_used))| ConnectedAppUsage {
            app_name: name.to_string(),
            user_count: users.len(),
            total_use_count: uses,
            last_used,
        })
        .collect();

    apps.sort_by(|a, b| b.total_use_count.cmp(&a.total_use_count));
    apps
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token(app: &str, user: &str, uses: u64, day: Option<u32>) -> OAuthToken {
        OAuthToken {
            id: format!("{}-{}", app, user),
            app_name: app.to_string(),
            last_used_date: day.map(|d| Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap()),
            use_count: uses,
            user_id: user.to_string(),
        }
    }

    #[test]
    fn test_summarize_groups_by_app() {
        let tokens = vec![
            token("Slack", "u1", 10, Some(1)),
            token("Slack", "u2", 5, Some(3)),
            token("Slack", "u2", 1, None),
            token("DocuSign", "u1", 100, None),
        ];

        let apps = summarize_connected_apps(&tokens);
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].app_name, "DocuSign");
        assert_eq!(apps[0].last_used, None);
        assert_eq!(apps[1].app_name, "Slack");
        assert_eq!(apps[1].user_count, 2);
        assert_eq!(apps[1].total_use_count, 16);
        assert_eq!(apps[1].last_used, Some(Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap()));
    }
}
