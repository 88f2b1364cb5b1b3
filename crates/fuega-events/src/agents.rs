//! Static display-name table for the agent fleet.
//!
//! Slugs match the backend's agent registry. Unknown slugs degrade
//! gracefully via [`humanize`].

/// Slug-to-display-name pairs for every known agent.
pub const AGENT_LABELS: &[(&str, &str)] = &[
    ("ceo", "CEO"),
    ("content_writer", "Content Writer"),
    ("editor", "Editor"),
    ("seo_analyst", "SEO Analyst"),
    ("social_media_manager", "Social Media Manager"),
    ("analytics_agent", "Analytics"),
    ("ads_manager", "Ads Manager"),
    ("email_marketing_agent", "Email Marketing"),
    ("sales_agent", "Sales"),
    ("cfo_agent", "CFO"),
    ("fulfillment_agent", "Fulfillment"),
    ("legal_bot", "Legal"),
    ("prospector", "Prospector"),
    ("local_outreach", "Local Outreach"),
    ("smb_researcher", "SMB Researcher"),
];

/// Look up the display name for an agent slug.
#[must_use]
pub fn agent_label(slug: &str) -> Option<&'static str> {
    AGENT_LABELS
        .iter()
        .find(|(s, _)| *s == slug)
        .map(|(_, label)| *label)
}

/// Display name for a slug, falling back to separator-normalized text for
/// agents added to the backend after this table was written.
#[must_use]
pub fn agent_display_name(slug: &str) -> String {
    agent_label(slug).map_or_else(|| humanize(slug), str::to_owned)
}

/// Replace name separators (`.`, `_`, `-`) with spaces.
#[must_use]
pub fn humanize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' | '_' | '-' => ' ',
            other => other,
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
