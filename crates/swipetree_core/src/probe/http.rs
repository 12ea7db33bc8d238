//! HTTP-backed existence probe.

use super::{artifact_name, cache_token, ExistenceProbe};
use crate::model::identifier::Identifier;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;

/// Probes `<base_url><id>.<ext>?v=<token>` with a GET request.
pub struct HttpExistenceProbe {
    client: Client,
    base_url: String,
    extension: String,
}

impl HttpExistenceProbe {
    pub fn new(base_url: impl Into<String>, extension: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, extension)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client,
            base_url,
            extension: extension.into(),
        }
    }

    /// Full probe URL including a fresh cache token.
    pub fn probe_url(&self, id: &Identifier) -> String {
        format!(
            "{}{}?{}",
            self.base_url,
            artifact_name(id, &self.extension),
            cache_token()
        )
    }
}

#[async_trait]
impl ExistenceProbe for HttpExistenceProbe {
    async fn probe(&self, id: &Identifier) -> bool {
        let url = self.probe_url(id);
        match self.client.get(&url).send().await {
            Ok(response) => {
                let exists = response.status().is_success();
                debug!(
                    "event=probe module=probe status=ok backend=http id={} http_status={} exists={}",
                    id,
                    response.status().as_u16(),
                    exists
                );
                exists
            }
            Err(err) => {
                debug!(
                    "event=probe module=probe status=error backend=http id={} error={}",
                    id, err
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HttpExistenceProbe;
    use crate::model::identifier::parse;

    #[test]
    fn probe_url_joins_base_name_and_token() {
        let probe = HttpExistenceProbe::new("https://example.org/images", "jpg");
        let url = probe.probe_url(&parse("141000").unwrap());
        assert!(url.starts_with("https://example.org/images/141000.jpg?v="));
    }

    #[test]
    fn suffixed_ids_keep_extension_and_token_in_query() {
        let lookup = HttpExistenceProbe::new("https://example.org/img", "jpg");
        let url = lookup.probe_url(&parse("140000.1.2").unwrap());
        assert!(url.starts_with("https://example.org/img/140000.1.2.jpg?v="));
        assert!(!url.contains('#'));
        assert!(parse("140000.1.x#frag").is_err());
    }
}
