//! Maps token and profile data onto claims.

use crate::types::{TokenResponse, UserProfile};
use ras_identity_core::{Claim, ClaimType, ClaimsIdentity};

/// Build the identity for a completed exchange.
///
/// Claims are added in a fixed order and only for non-empty sources:
/// name identifier, display name, email, given name, surname. Mapping never
/// fails; without a profile the identity carries at most the email claim.
pub fn map_identity(
    authentication_type: &str,
    token: &TokenResponse,
    profile: Option<&UserProfile>,
) -> ClaimsIdentity {
    let mut identity = ClaimsIdentity::new(authentication_type);

    let user_id = profile.and_then(|p| p.id.as_deref()).and_then(non_empty);
    let given_name = profile.and_then(UserProfile::given_name).and_then(non_empty);
    let surname = profile.and_then(UserProfile::family_name).and_then(non_empty);
    let email = token.principal.as_deref().and_then(non_empty);

    let mut add = |claim_type: ClaimType, value: &str| {
        identity.add_claim(Claim::new(claim_type, value, authentication_type));
    };

    if let Some(user_id) = user_id {
        add(ClaimType::NameIdentifier, user_id);
    }
    if given_name.is_some() || surname.is_some() {
        let display_name = format!("{} {}", given_name.unwrap_or(""), surname.unwrap_or(""));
        add(ClaimType::Name, display_name.trim());
    }
    if let Some(email) = email {
        add(ClaimType::Email, email);
    }
    if let Some(given_name) = given_name {
        add(ClaimType::GivenName, given_name);
    }
    if let Some(surname) = surname {
        add(ClaimType::Surname, surname);
    }

    identity
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProfileName;

    fn token(principal: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "tok1".to_string(),
            token_type: None,
            expires_in: Some(3600),
            refresh_token: None,
            principal: principal.map(String::from),
            additional: Default::default(),
        }
    }

    fn profile(id: Option<&str>, given: Option<&str>, family: Option<&str>) -> UserProfile {
        UserProfile {
            id: id.map(String::from),
            name: Some(ProfileName {
                given_name: given.map(String::from),
                family_name: family.map(String::from),
            }),
            ..Default::default()
        }
    }

    fn claim_pairs(identity: &ClaimsIdentity) -> Vec<(ClaimType, &str)> {
        identity
            .claims()
            .iter()
            .map(|c| (c.claim_type, c.value.as_str()))
            .collect()
    }

    #[test]
    fn test_full_mapping_in_order() {
        let identity = map_identity(
            "GoTo",
            &token(Some("a@b.com")),
            Some(&profile(Some("u1"), Some("Ana"), Some("Lee"))),
        );

        assert_eq!(identity.authentication_type(), "GoTo");
        assert_eq!(
            claim_pairs(&identity),
            vec![
                (ClaimType::NameIdentifier, "u1"),
                (ClaimType::Name, "Ana Lee"),
                (ClaimType::Email, "a@b.com"),
                (ClaimType::GivenName, "Ana"),
                (ClaimType::Surname, "Lee"),
            ]
        );
        assert!(identity.claims().iter().all(|c| c.issuer == "GoTo"));
    }

    #[test]
    fn test_display_name_with_single_part() {
        let identity = map_identity("GoTo", &token(None), Some(&profile(None, Some("Ana"), Some(""))));
        assert_eq!(
            claim_pairs(&identity),
            vec![(ClaimType::Name, "Ana"), (ClaimType::GivenName, "Ana")]
        );

        let identity = map_identity("GoTo", &token(None), Some(&profile(None, None, Some("Lee"))));
        assert_eq!(
            claim_pairs(&identity),
            vec![(ClaimType::Name, "Lee"), (ClaimType::Surname, "Lee")]
        );
    }

    #[test]
    fn test_empty_sources_produce_no_claims() {
        let identity = map_identity(
            "GoTo",
            &token(Some("")),
            Some(&profile(Some(""), Some(""), Some(""))),
        );
        assert!(identity.is_empty());

        let identity = map_identity("GoTo", &token(None), Some(&UserProfile::default()));
        assert!(identity.is_empty());
    }

    #[test]
    fn test_without_profile_only_email_is_mapped() {
        let identity = map_identity("GoTo", &token(Some("a@b.com")), None);
        assert_eq!(claim_pairs(&identity), vec![(ClaimType::Email, "a@b.com")]);
    }
}
