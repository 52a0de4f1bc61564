//! Cloud catalog API implementation

use reqwest::Url;
use semver::Version;
use tracing::warn;

use crate::piece::types::PieceMetadata;
use crate::sync::catalog::{CatalogEntry, PieceCatalog};
use crate::sync::error::CatalogError;

/// Catalog implementation backed by the cloud pieces API
pub struct CloudCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl CloudCatalog {
    /// Creates a new CloudCatalog with a custom base URL
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent("piece-registry")
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Encode piece name for URL (handles scoped packages)
    fn encode_piece_name(name: &str) -> String {
        if name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            name.replace('/', "%2F")
        } else {
            name.to_string()
        }
    }

    /// Build an endpoint URL, form-encoding the query parameter (`+` becomes `%2B`)
    fn endpoint(
        &self,
        path: &str,
        query: Option<(&str, &Version)>,
    ) -> Result<Url, CatalogError> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url =
            Url::parse(&raw).map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, &value.to_string());
        }
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        subject: &str,
    ) -> Result<T, CatalogError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(subject.to_string()));
        }

        if !status.is_success() {
            warn!("piece catalog returned status {}: {}", status, url);
            return Err(CatalogError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        response.json().await.map_err(|e| {
            warn!("Failed to parse piece catalog response: {}", e);
            CatalogError::InvalidResponse(e.to_string())
        })
    }
}

#[async_trait::async_trait]
impl PieceCatalog for CloudCatalog {
    async fn list_official(
        &self,
        release: Option<Version>,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let url = self.endpoint(
            "/v1/pieces",
            release.as_ref().map(|release| ("release", release)),
        )?;
        self.get_json(url, "official pieces").await
    }

    async fn fetch_piece(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<PieceMetadata, CatalogError> {
        let path = format!("/v1/pieces/{}", Self::encode_piece_name(name));
        let url = self.endpoint(&path, Some(("version", version)))?;
        let metadata: PieceMetadata = self
            .get_json(url, &format!("{}@{}", name, version))
            .await?;

        if metadata.name != name || &metadata.version != version {
            return Err(CatalogError::InvalidResponse(format!(
                "requested {}@{} but catalog returned {}@{}",
                name, version, metadata.name, metadata.version
            )));
        }
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn list_official_passes_release_and_parses_entries() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/v1/pieces")
            .match_query(Matcher::UrlEncoded("release".into(), "0.45.0".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"name": "@activepieces/piece-http", "version": "0.5.1", "displayName": "HTTP"},
                    {"name": "@activepieces/piece-slack", "version": "0.9.0", "actions": 12}
                ]"#,
            )
            .create_async()
            .await;

        let catalog = CloudCatalog::new(&server.url()).unwrap();
        let result = catalog
            .list_official(Some(Version::new(0, 45, 0)))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            vec![
                CatalogEntry {
                    name: "@activepieces/piece-http".to_string(),
                    version: Version::new(0, 5, 1),
                },
                CatalogEntry {
                    name: "@activepieces/piece-slack".to_string(),
                    version: Version::new(0, 9, 0),
                },
            ]
        );
    }

    #[test]
    fn new_trims_trailing_slash() {
        let catalog = CloudCatalog::new("http://localhost:3000/").unwrap();
        assert_eq!(catalog.base_url, "http://localhost:3000");
    }

    #[tokio::test]
    async fn list_official_returns_invalid_response_on_server_error() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/v1/pieces")
            .with_status(500)
            .create_async()
            .await;

        let catalog = CloudCatalog::new(&server.url()).unwrap();
        let result = catalog.list_official(None).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(CatalogError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn fetch_piece_handles_scoped_name() {
        let mut server = Server::new_async().await;

        // Scoped names use URL encoding: @activepieces/piece-http -> @activepieces%2Fpiece-http
        let mock = server
            .mock("GET", "/v1/pieces/@activepieces%2Fpiece-http")
            .match_query(Matcher::UrlEncoded("version".into(), "0.5.1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "@activepieces/piece-http",
                    "displayName": "HTTP",
                    "version": "0.5.1",
                    "minimumSupportedRelease": "0.30.0",
                    "categories": ["CORE"],
                    "actions": {"send_request": {"displayName": "Send HTTP request"}},
                    "triggers": {}
                }"#,
            )
            .create_async()
            .await;

        let catalog = CloudCatalog::new(&server.url()).unwrap();
        let result = catalog
            .fetch_piece("@activepieces/piece-http", &Version::new(0, 5, 1))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.display_name, "HTTP");
        assert_eq!(
            result.minimum_supported_release,
            Some(Version::new(0, 30, 0))
        );
        assert_eq!(result.actions.len(), 1);
    }

    #[tokio::test]
    async fn fetch_piece_encodes_build_metadata_in_query() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/v1/pieces/http")
            .match_query(Matcher::UrlEncoded(
                "version".into(),
                "1.0.0+build.5".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "http", "displayName": "HTTP", "version": "1.0.0+build.5"}"#)
            .create_async()
            .await;

        let catalog = CloudCatalog::new(&server.url()).unwrap();
        let version = Version::parse("1.0.0+build.5").unwrap();
        let result = catalog.fetch_piece("http", &version).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.version, version);
    }

    #[test]
    fn endpoint_rejects_malformed_base_url() {
        let catalog = CloudCatalog::new("not a url").unwrap();
        let result = catalog.endpoint("/v1/pieces", None);
        assert!(matches!(result, Err(CatalogError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn fetch_piece_returns_not_found_for_unknown_piece() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/v1/pieces/nonexistent")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Not found"}"#)
            .create_async()
            .await;

        let catalog = CloudCatalog::new(&server.url()).unwrap();
        let result = catalog
            .fetch_piece("nonexistent", &Version::new(1, 0, 0))
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn fetch_piece_rejects_mismatched_version() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/v1/pieces/http")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "http", "displayName": "HTTP", "version": "2.0.0"}"#)
            .create_async()
            .await;

        let catalog = CloudCatalog::new(&server.url()).unwrap();
        let result = catalog.fetch_piece("http", &Version::new(1, 0, 0)).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(CatalogError::InvalidResponse(_))));
    }
}
