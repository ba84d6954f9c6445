use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::SdkConfig;
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::Vpc;
use aws_sdk_ec2::Client;
use headers::Authorization;
use hyper::client::HttpConnector;
use hyper::Uri;
use hyper_proxy::{Intercept, Proxy, ProxyConnector};
use log::debug;
use log::error;
use url::Url;

use crate::provider::{FetchOutcome, ResourceProvider};
use crate::types::{FieldValue, ProviderError, ResourceSnapshot};

pub const FIELD_VPC_ID: &str = "vpc_id";
pub const FIELD_CIDR_BLOCK: &str = "cidr_block";
pub const FIELD_STATE: &str = "state";
pub const FIELD_IS_DEFAULT: &str = "is_default";
pub const FIELD_TAGS: &str = "tags";

const VPC_ID_PREFIX: &str = "vpc-";
const VPC_NOT_FOUND_CODE: &str = "InvalidVpcID.NotFound";

/// Returns `ProxyConnector<HttpConnector>` if env. variable 'https_proxy' is set
pub fn determine_proxy() -> Option<ProxyConnector<HttpConnector>> {
    let proxy_url: Url = std::env::var("HTTPS_PROXY")
        .or_else(|_v| std::env::var("https_proxy"))
        .ok()?
        .parse()
        .ok()?;
    let mut proxy_uri: Uri = std::env::var("HTTPS_PROXY")
        .or_else(|_v| std::env::var("https_proxy"))
        .ok()?
        .parse()
        .ok()?;
    if proxy_uri.scheme().is_none() {
        error!("Configured proxy did not specify a scheme - falling back to HTTP.");
        proxy_uri = format!("http://{}", std::env::var("HTTPS_PROXY").ok()?)
            .parse()
            .ok()?;
    }
    let mut proxy = Proxy::new(Intercept::All, proxy_uri);

    if let Some(password) = proxy_url.password() {
        proxy.set_authorization(Authorization::basic(proxy_url.username(), password));
    }

    let connector = HttpConnector::new();
    Some(ProxyConnector::from_proxy(connector, proxy).unwrap())
}

/// Will setup the SdkConfig with a proxy if needed.
pub async fn aws_setup() -> SdkConfig {
    let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
    debug!("Using region: {}", region_provider.region().await.unwrap());
    let config = if let Some(proxy) = determine_proxy() {
        debug!("Using proxy");
        let client =
            aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder::new().build(proxy);
        aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await
            .into_builder()
            .http_client(client.clone())
            .build()
    } else {
        debug!("Not using a proxy");
        aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await
    };
    return config;
}

impl From<&Vpc> for ResourceSnapshot {
    fn from(vpc: &Vpc) -> Self {
        let mut fields = BTreeMap::new();
        if let Some(id) = vpc.vpc_id() {
            fields.insert(FIELD_VPC_ID.to_string(), FieldValue::Scalar(id.to_string()));
        }
        if let Some(cidr) = vpc.cidr_block() {
            fields.insert(
                FIELD_CIDR_BLOCK.to_string(),
                FieldValue::Scalar(cidr.to_string()),
            );
        }
        if let Some(state) = vpc.state() {
            fields.insert(
                FIELD_STATE.to_string(),
                FieldValue::Scalar(state.as_str().to_string()),
            );
        }
        if let Some(is_default) = vpc.is_default() {
            fields.insert(
                FIELD_IS_DEFAULT.to_string(),
                FieldValue::Scalar(is_default.to_string()),
            );
        }
        // An untagged VPC still exposes an empty tag mapping, so a tag check
        // against it fails instead of reporting a missing field.
        let tags: BTreeMap<String, FieldValue> = vpc
            .tags()
            .iter()
            .filter_map(|t| match (t.key(), t.value()) {
                (Some(key), Some(value)) => {
                    Some((key.to_string(), FieldValue::Scalar(value.to_string())))
                }
                _ => None,
            })
            .collect();
        fields.insert(FIELD_TAGS.to_string(), FieldValue::Mapping(tags));
        ResourceSnapshot::new(fields)
    }
}

/// Fetches a single VPC via DescribeVpcs.
pub struct VpcProvider<'a> {
    pub client: &'a Client,
}

#[async_trait]
impl<'a> ResourceProvider for VpcProvider<'a> {
    fn valid_id(&self, resource_id: &str) -> bool {
        resource_id.len() > VPC_ID_PREFIX.len() && resource_id.starts_with(VPC_ID_PREFIX)
    }

    async fn fetch(&self, resource_id: &str) -> Result<FetchOutcome, ProviderError> {
        debug!("Retrieving VPC: {}", resource_id);
        match self
            .client
            .describe_vpcs()
            .vpc_ids(resource_id)
            .send()
            .await
        {
            Ok(success) => match success.vpcs.unwrap_or_default().first() {
                Some(vpc) => Ok(FetchOutcome::Found(ResourceSnapshot::from(vpc))),
                None => Ok(FetchOutcome::NotFound),
            },
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.code() == Some(VPC_NOT_FOUND_CODE) {
                    debug!("VPC does not exist: {}", resource_id);
                    Ok(FetchOutcome::NotFound)
                } else {
                    error!("Failed to fetch VPC {}: {}", resource_id, service_err);
                    Err(ProviderError {
                        msg: format!("describe-vpcs failed: {}", service_err),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use aws_sdk_ec2::types::VpcState;

    use super::*;

    fn make_vpc(vpc_id: &str, cidr_block: &str, tags: &HashMap<&str, &str>) -> Vpc {
        let tags = tags
            .iter()
            .map(|(k, v)| {
                aws_sdk_ec2::types::Tag::builder()
                    .key(k.to_string())
                    .value(v.to_string())
                    .build()
            })
            .collect();
        Vpc::builder()
            .vpc_id(vpc_id)
            .cidr_block(cidr_block)
            .state(VpcState::Available)
            .is_default(false)
            .set_tags(Some(tags))
            .build()
    }

    fn test_client() -> Client {
        let config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .build();
        Client::new(&config)
    }

    #[test]
    fn test_valid_id_requires_vpc_prefix() {
        let client = test_client();
        let provider = VpcProvider { client: &client };
        assert!(provider.valid_id("vpc-123"));
        assert!(!provider.valid_id(""));
        assert!(!provider.valid_id("vpc-"));
        assert!(!provider.valid_id("subnet-123"));
    }

    #[test]
    fn test_snapshot_from_vpc() {
        let vpc = make_vpc(
            "vpc-123",
            "192.168.0.0/16",
            &HashMap::from([("Name", "vpc-gabriel-p")]),
        );
        let snapshot = ResourceSnapshot::from(&vpc);
        assert_eq!(
            snapshot.resolve(&FIELD_CIDR_BLOCK.into()),
            Some(&FieldValue::Scalar("192.168.0.0/16".to_string()))
        );
        assert_eq!(
            snapshot.resolve(&FIELD_STATE.into()),
            Some(&FieldValue::Scalar("available".to_string()))
        );
        assert_eq!(
            snapshot.resolve(&"tags.Name".into()),
            Some(&FieldValue::Scalar("vpc-gabriel-p".to_string()))
        );
    }

    #[test]
    fn test_snapshot_from_untagged_vpc_has_empty_tag_mapping() {
        let vpc = make_vpc("vpc-123", "10.0.0.0/16", &HashMap::new());
        let snapshot = ResourceSnapshot::from(&vpc);
        assert_eq!(
            snapshot.resolve(&FIELD_TAGS.into()),
            Some(&FieldValue::Mapping(BTreeMap::new()))
        );
    }
}
