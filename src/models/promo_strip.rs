//! Promo strip model
//!
//! Promo strips are the announcement banners shown across the top of the
//! public site. A strip is "active" when it is enabled and the current time
//! falls inside its window; NULL bounds leave that side open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A site-wide announcement banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoStrip {
    /// Unique identifier
    pub id: i64,
    /// Banner text
    pub text: String,
    /// Click-through URL (optional)
    pub link_url: Option<String>,
    /// CSS background color
    pub background_color: String,
    /// CSS text color
    pub text_color: String,
    /// Start of the display window (optional, open when NULL)
    pub starts_at: Option<DateTime<Utc>>,
    /// End of the display window (optional, open when NULL)
    pub expires_at: Option<DateTime<Utc>>,
    /// Manual on/off switch
    pub enabled: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl PromoStrip {
    /// Whether the strip should be shown at `now`.
    ///
    /// Active means: enabled, `starts_at <= now` (or no start), and
    /// `now < expires_at` (or no expiry).
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(starts) = self.starts_at {
            if now < starts {
                return false;
            }
        }
        if let Some(expires) = self.expires_at {
            if now >= expires {
                return false;
            }
        }
        true
    }

    /// Whether the strip should be shown right now
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }
}

/// Input for creating a promo strip
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePromoStripInput {
    /// Banner text
    pub text: String,
    /// Click-through URL (optional)
    pub link_url: Option<String>,
    /// Background color (optional, defaults to site dark)
    pub background_color: Option<String>,
    /// Text color (optional, defaults to white)
    pub text_color: Option<String>,
    /// Window start (optional)
    pub starts_at: Option<DateTime<Utc>>,
    /// Window end (optional)
    pub expires_at: Option<DateTime<Utc>>,
    /// Enabled flag (optional, defaults to true)
    pub enabled: Option<bool>,
}

/// Input for updating a promo strip
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePromoStripInput {
    /// New text (optional)
    pub text: Option<String>,
    /// New URL (optional)
    pub link_url: Option<String>,
    /// New background color (optional)
    pub background_color: Option<String>,
    /// New text color (optional)
    pub text_color: Option<String>,
    /// New window start (optional)
    pub starts_at: Option<DateTime<Utc>>,
    /// New window end (optional)
    pub expires_at: Option<DateTime<Utc>>,
    /// New enabled flag (optional)
    pub enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn strip(
        enabled: bool,
        starts_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    ) -> PromoStrip {
        let now = Utc::now();
        PromoStrip {
            id: 1,
            text: "Summer sale".to_string(),
            link_url: None,
            background_color: "#1a1a2e".to_string(),
            text_color: "#ffffff".to_string(),
            starts_at,
            expires_at,
            enabled,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_disabled_strip_is_never_active() {
        let s = strip(false, None, None);
        assert!(!s.is_active());
    }

    #[test]
    fn test_open_ended_strip_is_active() {
        let s = strip(true, None, None);
        assert!(s.is_active());
    }

    #[test]
    fn test_window_bounds() {
        let now = Utc::now();

        let upcoming = strip(true, Some(now + Duration::hours(1)), None);
        assert!(!upcoming.is_active_at(now));

        let expired = strip(true, None, Some(now - Duration::hours(1)));
        assert!(!expired.is_active_at(now));

        let inside = strip(
            true,
            Some(now - Duration::hours(1)),
            Some(now + Duration::hours(1)),
        );
        assert!(inside.is_active_at(now));
    }

    #[test]
    fn test_expiry_bound_is_exclusive() {
        let now = Utc::now();
        let s = strip(true, None, Some(now));
        assert!(!s.is_active_at(now));

        let starting = strip(true, Some(now), None);
        assert!(starting.is_active_at(now));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn strip_with_window(starts: Option<i64>, expires: Option<i64>, enabled: bool) -> PromoStrip {
        PromoStrip {
            id: 1,
            text: "Banner".to_string(),
            link_url: None,
            background_color: "#1a1a2e".to_string(),
            text_color: "#ffffff".to_string(),
            starts_at: starts.map(|m| epoch() + Duration::minutes(m)),
            expires_at: expires.map(|m| epoch() + Duration::minutes(m)),
            enabled,
            created_at: epoch(),
            updated_at: epoch(),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn disabled_strip_is_never_active(
            starts in proptest::option::of(-1000i64..1000),
            expires in proptest::option::of(-1000i64..1000),
            at in -2000i64..2000,
        ) {
            let strip = strip_with_window(starts, expires, false);
            prop_assert!(!strip.is_active_at(epoch() + Duration::minutes(at)));
        }

        #[test]
        fn active_exactly_inside_the_window(
            starts in proptest::option::of(-1000i64..1000),
            expires in proptest::option::of(-1000i64..1000),
            at in -2000i64..2000,
        ) {
            let strip = strip_with_window(starts, expires, true);
            let expected = starts.map_or(true, |s| at >= s)
                && expires.map_or(true, |e| at < e);
            prop_assert_eq!(strip.is_active_at(epoch() + Duration::minutes(at)), expected);
        }
    }
}
