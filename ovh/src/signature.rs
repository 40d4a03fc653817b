//! OVH request signature.
//!
//! `$1$` followed by the hex SHA-1 of
//! `secret+consumer_key+METHOD+full_url+body+timestamp`.

use sha1::{Digest, Sha1};

/// Compute the `X-Ovh-Signature` header value.
#[must_use]
pub fn sign(
    application_secret: &str,
    consumer_key: &str,
    method: &str,
    url: &str,
    body: &str,
    timestamp: i64,
) -> String {
    let mut hasher = Sha1::new();
    hasher.update(
        format!("{application_secret}+{consumer_key}+{method}+{url}+{body}+{timestamp}").as_bytes(),
    );
    format!("$1${}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_signature() {
        let signature = sign(
            "secret",
            "consumer",
            "GET",
            "https://eu.api.ovh.com/1.0/dedicated/server/datacenter/availabilities?datacenters=bhs&planCode=24ska01",
            "",
            1_735_689_630,
        );
        assert_eq!(signature, "$1$2c8bc221f45bb982e8d8c70c7e4efdbb62654b87");
    }

    #[test]
    fn test_post_signature_includes_body() {
        let signature = sign(
            "secret",
            "consumer",
            "POST",
            "https://eu.api.ovh.com/1.0/order/cart/abc/checkout",
            "{}",
            1_735_689_630,
        );
        assert_eq!(signature, "$1$706c08fd8c26878677e4665a37dc9b89f0a17705");
    }
}
