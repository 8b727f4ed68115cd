//! Agent referrals and shareable referral codes.

use crate::domain::{TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Links a referred customer to the agent who brought them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: String,
    pub agent_id: UserId,
    pub customer_id: UserId,
    pub signup_date: TimeMs,
    pub is_manual_assignment: bool,
    /// Set once the customer is enrolled in a plan.
    pub is_active: bool,
}

/// Opaque `ref` query parameter carried in referral links.
pub struct ReferralCode;

impl ReferralCode {
    /// Encode an agent id into a URL-safe code.
    pub fn encode(agent_id: &UserId) -> String {
        hex::encode(agent_id.as_str().as_bytes())
    }

    /// Decode a code back into the agent id, or None when it is malformed.
    pub fn decode(code: &str) -> Option<UserId> {
        let bytes = hex::decode(code.trim()).ok()?;
        let id = String::from_utf8(bytes).ok()?;
        if id.trim().is_empty() {
            return None;
        }
        Some(UserId::new(id))
    }

    /// `{base_url}/register?ref={code}`.
    pub fn link(base_url: &str, agent_id: &UserId) -> String {
        format!(
            "{}/register?ref={}",
            base_url.trim_end_matches('/'),
            Self::encode(agent_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_decodes_to_agent() {
        let agent = UserId::from("A1234");
        let code = ReferralCode::encode(&agent);
        assert_eq!(code, "4131323334");
        assert_eq!(ReferralCode::decode(&code), Some(agent));
    }

    #[test]
    fn malformed_codes_are_rejected() {
        assert_eq!(ReferralCode::decode("zz"), None);
        assert_eq!(ReferralCode::decode("abc"), None);
        assert_eq!(ReferralCode::decode(""), None);
        // 0xff is not valid UTF-8.
        assert_eq!(ReferralCode::decode("ff"), None);
    }

    #[test]
    fn link_strips_trailing_slash() {
        let link = ReferralCode::link("https://desk.example.com/", &UserId::from("A1"));
        assert_eq!(link, "https://desk.example.com/register?ref=4131");
    }
}
