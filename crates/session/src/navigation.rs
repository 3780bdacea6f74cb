//! Navigation contract shared by every portal.
//!
//! Three query parameters cross portal boundaries: `plan` (a subscription
//! code waiting to be contracted), `billing` (`monthly|annual`) and
//! `returnUrl` (a URL-encoded deep link back into the app).

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use staybook_auth::Portal;

pub const QUERY_PLAN: &str = "plan";
pub const QUERY_BILLING: &str = "billing";
pub const QUERY_RETURN_URL: &str = "returnUrl";

/// Plan selection: where users without a workspace are sent.
pub const PLANS_PATH: &str = "/plans";
pub const DEFAULT_CONTRACT_PATH: &str = "/plans/contract";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Annual,
}

impl BillingCycle {
    pub fn as_str(self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Annual => "annual",
        }
    }

    /// Unrecognised values fall back to monthly billing.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "annual" | "yearly" => BillingCycle::Annual,
            "monthly" => BillingCycle::Monthly,
            other => {
                tracing::debug!(billing = other, "unknown billing cycle, using monthly");
                BillingCycle::Monthly
            }
        }
    }
}

/// The navigation-relevant query parameters of the current location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NavigationQuery {
    pub plan: Option<String>,
    pub billing: Option<BillingCycle>,
    /// Still percent-encoded as it travels; decoded when navigated to.
    pub return_url: Option<String>,
}

impl NavigationQuery {
    /// Parse a query string (with or without the leading `?`).
    ///
    /// Blank values count as absent. A `returnUrl` that does not decode to a
    /// local route is dropped so it can never send the user off-site.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut parsed = Self::default();

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = form_decode(raw_value);
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match form_decode(raw_key).as_str() {
                QUERY_PLAN => parsed.plan = Some(value.to_string()),
                QUERY_BILLING => parsed.billing = Some(BillingCycle::parse_lenient(value)),
                QUERY_RETURN_URL => {
                    // Kept encoded: decoding happens exactly once, on navigation.
                    let raw = raw_value.trim().replace('+', "%20");
                    if is_local_route(&decode_return_url(&raw)) {
                        parsed.return_url = Some(raw);
                    } else {
                        tracing::warn!(return_url = value, "dropping non-local returnUrl");
                    }
                }
                _ => {}
            }
        }

        parsed
    }

    /// Parse the query part of a `path?query` location.
    pub fn from_location(location: &str) -> Self {
        location
            .split_once('?')
            .map(|(_, query)| Self::parse(query))
            .unwrap_or_default()
    }

    pub fn with_plan(mut self, plan: impl Into<String>, billing: BillingCycle) -> Self {
        self.plan = Some(plan.into());
        self.billing = Some(billing);
        self
    }

    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.plan.is_none() && self.billing.is_none() && self.return_url.is_none()
    }
}

/// `application/x-www-form-urlencoded` value decoding (`+` is a space).
fn form_decode(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " ")).decode_utf8_lossy().into_owned()
}

/// `decodeURIComponent` semantics; invalid UTF-8 is replaced rather than
/// rejected so decoding is total.
pub fn decode_return_url(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// A path inside this application: one leading slash, no scheme, no
/// protocol-relative `//host` and no backslash tricks.
pub fn is_local_route(url: &str) -> bool {
    url.starts_with('/')
        && !url.starts_with("//")
        && !url.contains('\\')
        && !url.chars().any(char::is_control)
}

/// Plan-contracting flow with `plan` and `billing` carried through.
pub fn contract_path(base: &str, plan: &str, billing: BillingCycle) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(QUERY_PLAN, plan)
        .append_pair(QUERY_BILLING, billing.as_str())
        .finish();
    format!("{base}?{query}")
}

/// Login route for a portal, remembering where the visitor was headed.
pub fn login_redirect(portal: Portal, attempted: &str) -> String {
    if attempted.is_empty() || attempted == portal.login_path() {
        return portal.login_path().to_string();
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(QUERY_RETURN_URL, attempted)
        .finish();
    format!("{}?{query}", portal.login_path())
}
