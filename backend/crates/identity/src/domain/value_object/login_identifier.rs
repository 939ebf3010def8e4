use super::{Email, Username};

/// What a user typed into the "email or username" field
///
/// Usernames never contain `@`, so the two forms are disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(Email),
    Username(Username),
}

impl LoginIdentifier {
    /// `None` when the input is neither a valid email nor a valid username
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.contains('@') {
            Email::new(raw).ok().map(Self::Email)
        } else {
            Username::new(raw).ok().map(Self::Username)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert!(matches!(
            LoginIdentifier::parse("U1@X.com"),
            Some(LoginIdentifier::Email(e)) if e.as_str() == "u1@x.com"
        ));
        assert!(matches!(
            LoginIdentifier::parse("User1"),
            Some(LoginIdentifier::Username(u)) if u.canonical() == "user1"
        ));
        assert_eq!(LoginIdentifier::parse("a@"), None);
        assert_eq!(LoginIdentifier::parse("!!"), None);
    }
}
