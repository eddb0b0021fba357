//! Share links
//!
//! ```text
//! <base>/secret/<id>[#encryption_key=<public component, base64url>]
//! ```
//!
//! The public component rides in the fragment, which browsers never send to
//! the server. The bare form leaves it out for the "send link and password
//! separately" workflow.

use burnlink_core::{BurnlinkError, BurnlinkResult, SecretId};
use burnlink_crypto::PublicComponent;
use url::Url;

/// Fragment parameter carrying the public component
pub const KEY_PARAM: &str = "encryption_key";

const SECRET_SEGMENT: &str = "secret";

/// How to reach, and possibly unlock, a stored secret.
#[derive(Debug, Clone)]
pub struct ShareLocator {
    pub id: SecretId,
    /// `None` when the link was shared bare
    pub public_component: Option<PublicComponent>,
}

#[derive(Debug, Clone)]
pub struct ShareLinkCodec {
    base: Url,
}

impl ShareLinkCodec {
    /// `base_url` is the site origin, optionally with a path prefix.
    pub fn new(base_url: &str) -> BurnlinkResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| BurnlinkError::Config(format!("share.base_url {base_url:?}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(BurnlinkError::Config(format!(
                "share.base_url must be an http(s) URL (got {base_url:?})"
            )));
        }
        Ok(Self { base })
    }

    /// Link with the public component in the fragment.
    pub fn encode_full(&self, id: &SecretId, public: &PublicComponent) -> Url {
        let mut url = self.encode_bare(id);
        url.set_fragment(Some(&format!("{KEY_PARAM}={}", public.to_encoded())));
        url
    }

    /// Link without any key material.
    pub fn encode_bare(&self, id: &SecretId) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        // `new` rejected cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(SECRET_SEGMENT).push(id.as_str());
        }
        url
    }

    /// Parse a share link from any origin.
    ///
    /// A missing fragment, or one without a non-empty `encryption_key`, yields
    /// `public_component = None`. A key that is present but undecodable is an error.
    pub fn decode(link: &str) -> BurnlinkResult<ShareLocator> {
        let url = Url::parse(link.trim())
            .map_err(|e| BurnlinkError::Locator(format!("{link:?}: {e}")))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let id = match segments.as_slice() {
            [.., marker, id] if *marker == SECRET_SEGMENT => SecretId::parse(id)?,
            _ => {
                return Err(BurnlinkError::Locator(format!(
                    "expected a path ending in /{SECRET_SEGMENT}/<id>: {}",
                    url.path()
                )))
            }
        };

        let public_component = match url.fragment().and_then(fragment_key) {
            Some(encoded) => Some(PublicComponent::from_encoded(encoded)?),
            None => None,
        };

        Ok(ShareLocator {
            id,
            public_component,
        })
    }
}

fn fragment_key(fragment: &str) -> Option<&str> {
    fragment
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == KEY_PARAM)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> ShareLinkCodec {
        ShareLinkCodec::new("https://secrets.example.com").unwrap()
    }

    fn id() -> SecretId {
        SecretId::parse("0d4f5b3e-7c1a-4b8e-9f2d-6a5c4b3a2910").unwrap()
    }

    fn public() -> PublicComponent {
        PublicComponent::from_bytes([0x5Au8; 32])
    }

    #[test]
    fn test_full_link_shape() {
        let url = codec().encode_full(&id(), &public());
        assert_eq!(
            url.as_str(),
            format!(
                "https://secrets.example.com/secret/{}#encryption_key={}",
                id(),
                public().to_encoded()
            )
        );
    }

    #[test]
    fn test_bare_link_shape() {
        let url = codec().encode_bare(&id());
        assert_eq!(url.as_str(), format!("https://secrets.example.com/secret/{}", id()));
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_decode_full() {
        let link = codec().encode_full(&id(), &public());
        let locator = ShareLinkCodec::decode(link.as_str()).unwrap();

        assert_eq!(locator.id, id());
        assert_eq!(
            locator.public_component.unwrap().as_bytes(),
            public().as_bytes()
        );
    }

    #[test]
    fn test_decode_bare() {
        let link = codec().encode_bare(&id());
        let locator = ShareLinkCodec::decode(link.as_str()).unwrap();

        assert_eq!(locator.id, id());
        assert!(locator.public_component.is_none());
    }

    #[test]
    fn test_base_with_path_prefix() {
        let codec = ShareLinkCodec::new("https://example.com/burn/").unwrap();
        let url = codec.encode_full(&id(), &public());
        assert!(url.as_str().starts_with("https://example.com/burn/secret/"));

        let locator = ShareLinkCodec::decode(url.as_str()).unwrap();
        assert_eq!(locator.id, id());
    }

    #[test]
    fn test_decode_tolerates_empty_or_foreign_fragment() {
        for suffix in ["#", "#encryption_key=", "#other=1"] {
            let link = format!("https://example.com/secret/{}{suffix}", id());
            let locator = ShareLinkCodec::decode(&link).unwrap();
            assert!(locator.public_component.is_none(), "{suffix}");
        }
    }

    #[test]
    fn test_decode_rejects_bad_key() {
        let link = format!("https://example.com/secret/{}#encryption_key=tooshort", id());
        assert!(matches!(
            ShareLinkCodec::decode(&link),
            Err(BurnlinkError::Locator(_))
        ));
    }

    #[test]
    fn test_decode_rejects_other_paths() {
        for link in [
            "https://example.com/",
            "https://example.com/secrets/abc",
            "https://example.com/secret/",
            "not a url",
        ] {
            assert!(ShareLinkCodec::decode(link).is_err(), "{link}");
        }
    }

    #[test]
    fn test_base_must_be_http() {
        assert!(ShareLinkCodec::new("mailto:someone@example.com").is_err());
        assert!(ShareLinkCodec::new("ftp://example.com").is_err());
        assert!(ShareLinkCodec::new("http://127.0.0.1:8080").is_ok());
    }

    #[test]
    fn test_base_query_dropped() {
        let codec = ShareLinkCodec::new("https://example.com/?utm=x#frag").unwrap();
        let url = codec.encode_bare(&id());
        assert_eq!(url.as_str(), format!("https://example.com/secret/{}", id()));
    }
}
