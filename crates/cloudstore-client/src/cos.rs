//! IBM Cloud Object Storage backend on top of `aws-sdk-s3`

use crate::backend::ObjectBackend;
use crate::iam::IamTokenProvider;
use async_trait::async_trait;
use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::interceptors::BeforeTransmitInterceptorContextMut;
use aws_sdk_s3::config::{
    BehaviorVersion, Builder as S3ConfigBuilder, ConfigBag, Intercept, RequestChecksumCalculation,
    ResponseChecksumValidation, RuntimeComponents,
};
use aws_sdk_s3::error::{BoxError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use cloudstore_core::{Error, Result, StoreConfig};
use std::sync::Arc;
use tracing::debug;

/// Replaces the SigV4 `Authorization` header with the IAM bearer token the
/// operation obtained before sending.
///
/// Runs after signing, so the placeholder credentials never reach the wire.
#[derive(Debug)]
struct BearerAuthInterceptor {
    tokens: Arc<IamTokenProvider>,
    resource_crn: String,
}

impl Intercept for BearerAuthInterceptor {
    fn name(&self) -> &'static str {
        "BearerAuthInterceptor"
    }

    fn modify_before_transmit(
        &self,
        context: &mut BeforeTransmitInterceptorContextMut<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> std::result::Result<(), BoxError> {
        let token = self
            .tokens
            .current_token()
            .ok_or("no IAM bearer token available")?;

        let headers = context.request_mut().headers_mut();
        headers.insert("authorization", format!("Bearer {}", token));
        headers.insert("ibm-service-instance-id", self.resource_crn.clone());

        Ok(())
    }
}

/// Backend for IBM Cloud Object Storage (or any S3 endpoint accepting IAM bearer tokens)
pub struct CosBackend {
    client: Client,
    tokens: Arc<IamTokenProvider>,
}

impl CosBackend {
    /// Build the SDK client. Performs no network I/O; the first IAM token is
    /// requested by the first operation.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let tokens = Arc::new(IamTokenProvider::new(
            config.auth_endpoint.clone(),
            config.api_key.clone(),
        ));

        // SigV4 still runs inside the SDK; these never leave the process.
        let credentials = Credentials::new("iam", "iam", None, None, "cloudstore-iam");

        let s3_config = S3ConfigBuilder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(&config.endpoint)
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .interceptor(BearerAuthInterceptor {
                tokens: tokens.clone(),
                resource_crn: config.resource_crn.clone(),
            })
            .build();

        debug!("Configured COS client for {}", config.endpoint);

        Ok(Self {
            client: Client::from_conf(s3_config),
            tokens,
        })
    }

    pub fn token_provider(&self) -> &IamTokenProvider {
        &self.tokens
    }
}

/// Map an SDK failure onto the store error taxonomy
fn classify<E>(err: SdkError<E, HttpResponse>, bucket: &str, key: Option<&str>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    if let SdkError::ServiceError(ctx) = &err {
        return Error::from_service(
            ctx.raw().status().as_u16(),
            ctx.err().code(),
            ctx.err().message(),
            bucket,
            key,
        );
    }

    let construction = matches!(err, SdkError::ConstructionFailure(_));
    let transient = matches!(
        err,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_)
    );
    let detail = DisplayErrorContext(err).to_string();

    if construction {
        Error::MalformedRequest(detail)
    } else if transient {
        Error::Transient(detail)
    } else {
        Error::Unknown(detail)
    }
}

#[async_trait]
impl ObjectBackend for CosBackend {
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            self.tokens.token().await?;

            let mut req = self.client.list_objects_v2().bucket(bucket);
            if let Some(token) = &continuation_token {
                req = req.continuation_token(token);
            }

            let resp = req.send().await.map_err(|e| classify(e, bucket, None))?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );

            continuation_token = match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => Some(token.to_string()),
                _ => break,
            };
        }

        debug!("Listed {} keys in {}", keys.len(), bucket);
        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.tokens.token().await?;

        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, bucket, Some(key)))?;

        let data = resp.body.collect().await.map_err(|e| {
            Error::Transient(format!("Failed to read body of {}/{}: {}", bucket, key, e))
        })?;

        Ok(data.into_bytes())
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        self.tokens.token().await?;

        let len = data.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| classify(e, bucket, Some(key)))?;

        debug!("Stored object {}/{} ({} bytes)", bucket, key, len);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockito::{Matcher, Server, ServerGuard};

    const BUCKET: &str = "reports";

    async fn mock_token(server: &mut ServerGuard) -> mockito::Mock {
        mock_token_with_lifetime(server, 3600).await
    }

    async fn mock_token_with_lifetime(server: &mut ServerGuard, lifetime: i64) -> mockito::Mock {
        let body = serde_json::json!({
            "access_token": "test-token",
            "token_type": "Bearer",
            "expires_in": lifetime,
            "expiration": Utc::now().timestamp() + lifetime,
        });

        server
            .mock("POST", "/identity/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    fn config_for(server: &ServerGuard) -> StoreConfig {
        StoreConfig::new(BUCKET, "api-key", "crn:v1:bluemix:public:cloud-object-storage:global:a/1::")
            .with_endpoint(server.url())
            .with_auth_endpoint(format!("{}/identity/token", server.url()))
    }

    #[tokio::test]
    async fn test_construction_makes_no_requests() {
        let mut server = Server::new_async().await;
        let mut untouched = Vec::new();
        for method in ["POST", "GET", "HEAD", "PUT"] {
            untouched.push(
                server
                    .mock(method, Matcher::Any)
                    .match_query(Matcher::Any)
                    .expect(0)
                    .create_async()
                    .await,
            );
        }

        let backend = CosBackend::new(&config_for(&server)).unwrap();
        assert!(backend.token_provider().cached_token().is_none());

        for mock in &untouched {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = StoreConfig::new(BUCKET, "", "crn");
        assert!(matches!(CosBackend::new(&config), Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_list_keys_with_bearer_token() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;

        let listing = server
            .mock("GET", Matcher::Regex(r"^/reports/?$".into()))
            .match_query(Matcher::UrlEncoded("list-type".into(), "2".into()))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>reports</Name>
  <Prefix></Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>false</IsTruncated>
  <Contents><Key>b.txt</Key><Size>3</Size></Contents>
  <Contents><Key>a.txt</Key><Size>5</Size></Contents>
</ListBucketResult>"#,
            )
            .create_async()
            .await;

        let backend = CosBackend::new(&config_for(&server)).unwrap();
        let keys = backend.list_keys(BUCKET).await.unwrap();

        assert_eq!(keys, vec!["b.txt", "a.txt"]);
        listing.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_keys_empty_bucket() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/reports/?$".into()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>reports</Name>
  <KeyCount>0</KeyCount>
  <IsTruncated>false</IsTruncated>
</ListBucketResult>"#,
            )
            .create_async()
            .await;

        let backend = CosBackend::new(&config_for(&server)).unwrap();
        assert!(backend.list_keys(BUCKET).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_keys_follows_continuation_token() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;

        let first = server
            .mock("GET", Matcher::Regex(r"^/reports/?$".into()))
            .match_query(Matcher::UrlEncoded("list-type".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>reports</Name>
  <KeyCount>2</KeyCount>
  <MaxKeys>2</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>page-2</NextContinuationToken>
  <Contents><Key>a</Key><Size>1</Size></Contents>
  <Contents><Key>b</Key><Size>1</Size></Contents>
</ListBucketResult>"#,
            )
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", Matcher::Regex(r"^/reports/?$".into()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("list-type".into(), "2".into()),
                Matcher::UrlEncoded("continuation-token".into(), "page-2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>reports</Name>
  <KeyCount>1</KeyCount>
  <MaxKeys>2</MaxKeys>
  <IsTruncated>false</IsTruncated>
  <Contents><Key>c</Key><Size>1</Size></Contents>
</ListBucketResult>"#,
            )
            .expect(1)
            .create_async()
            .await;

        let backend = CosBackend::new(&config_for(&server)).unwrap();
        let keys = backend.list_keys(BUCKET).await.unwrap();

        assert_eq!(keys, vec!["a", "b", "c"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_short_lived_token_is_still_sent() {
        let mut server = Server::new_async().await;
        let _token = mock_token_with_lifetime(&mut server, 45).await;
        let listing = server
            .mock("GET", Matcher::Regex(r"^/reports/?$".into()))
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>reports</Name>
  <KeyCount>1</KeyCount>
  <IsTruncated>false</IsTruncated>
  <Contents><Key>a.txt</Key><Size>1</Size></Contents>
</ListBucketResult>"#,
            )
            .create_async()
            .await;

        let backend = CosBackend::new(&config_for(&server)).unwrap();
        let keys = backend.list_keys(BUCKET).await.unwrap();

        assert_eq!(keys, vec!["a.txt"]);
        assert!(backend.token_provider().cached_token().is_none());
        listing.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_and_put_object() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;

        let put = server
            .mock("PUT", "/reports/x")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer test-token")
            .match_body("hello")
            .with_status(200)
            .with_header("etag", "\"5d41402abc4b2a76b9719d911017c592\"")
            .create_async()
            .await;
        let get = server
            .mock("GET", "/reports/x")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-length", "5")
            .with_body("hello")
            .create_async()
            .await;

        let backend = CosBackend::new(&config_for(&server)).unwrap();
        backend
            .put_object(BUCKET, "x", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        let data = backend.get_object(BUCKET, "x").await.unwrap();

        assert_eq!(&data[..], b"hello");
        put.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _mock = server
            .mock("GET", "/reports/missing.txt")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("content-type", "application/xml")
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message><Key>missing.txt</Key></Error>"#,
            )
            .create_async()
            .await;

        let backend = CosBackend::new(&config_for(&server)).unwrap();
        let err = backend.get_object(BUCKET, "missing.txt").await.unwrap_err();

        assert!(matches!(err, Error::NoSuchKey(ref k) if k == "missing.txt"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_forbidden_is_access_denied() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/reports/?$".into()))
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("content-type", "application/xml")
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>"#,
            )
            .create_async()
            .await;

        let backend = CosBackend::new(&config_for(&server)).unwrap();
        let err = backend.list_keys(BUCKET).await.unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_token_failure_skips_storage_call() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/identity/token")
            .with_status(401)
            .create_async()
            .await;
        let listing = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let backend = CosBackend::new(&config_for(&server)).unwrap();
        let err = backend.list_keys(BUCKET).await.unwrap_err();

        assert!(matches!(err, Error::AccessDenied(_)));
        listing.assert_async().await;
    }
}
