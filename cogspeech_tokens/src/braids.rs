use aliri_braid::braid;
use std::fmt;

macro_rules! limited_reveal {
    ($ty:ty: $hidden:literal, $default:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    limited_reveal(&self.0, &mut *f, $default)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    limited_reveal(&self.0, &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }
    };
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// A speech service subscription key
///
/// Exchanged with the issuing endpoint for short-lived access tokens.
#[braid(serde, debug = "owned", display = "owned")]
pub struct SubscriptionKey;

limited_reveal!(SubscriptionKeyRef: "SUBSCRIPTION KEY", 5);

/// A bearer access token issued by the speech service
#[braid(serde, debug = "owned", display = "owned")]
pub struct AccessToken;

limited_reveal!(AccessTokenRef: "ACCESS TOKEN", 15);

/// A service region, such as `westus`
#[braid(serde)]
pub struct Region;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_hidden_by_default() {
        let key = SubscriptionKey::from_static("0123456789abcdef");
        assert_eq!(format!("{key}"), "***SUBSCRIPTION KEY***");
        assert_eq!(format!("{key:?}"), "***SUBSCRIPTION KEY***");

        let token = AccessToken::from_static("eyJhbGciOiJIUzI1NiJ9.payload.sig");
        assert_eq!(format!("{token}"), "***ACCESS TOKEN***");
    }

    #[test]
    fn alternate_debug_reveals_a_prefix() {
        let key = SubscriptionKey::from_static("0123456789abcdef");
        assert_eq!(format!("{key:#?}"), "\"0123…\"");
        assert_eq!(format!("{key:#8?}"), "\"0123456…\"");
    }

    #[test]
    fn alternate_display_reveals_everything() {
        let token = AccessToken::from_static("tok1");
        assert_eq!(format!("{token:#}"), "tok1");
        assert_eq!(token.as_str(), "tok1");
    }

    #[test]
    fn regions_are_plain_strings() {
        let region = Region::from_static("westus");
        assert_eq!(region.to_string(), "westus");
        assert_eq!(format!("{region:?}"), "\"westus\"");
    }
}
