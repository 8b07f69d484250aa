use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub display_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LogoutRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access: String,
    #[serde(default)]
    pub refresh: String,
}

impl TokenPair {
    pub fn is_complete(&self) -> bool {
        !self.access.is_empty() && !self.refresh.is_empty()
    }
}

/// Body returned by both `/auth/login/` and `/auth/register/`.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
pub struct InviteResponse {
    pub invite_code: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptInviteRequest<'a> {
    pub invite_code: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_with_partial_tokens() {
        let resp: AuthResponse = serde_json::from_str(r#"{"tokens": {"access": "a"}}"#).unwrap();
        assert_eq!(resp.tokens.access, "a");
        assert!(!resp.tokens.is_complete());
    }

    #[test]
    fn test_auth_response_without_tokens_is_rejected() {
        assert!(serde_json::from_str::<AuthResponse>(r#"{"user": {}}"#).is_err());
    }
}
