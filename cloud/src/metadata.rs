// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::time::Duration;

use crate::error::CloudError;

/// Link-local address of the EC2 instance metadata service.
/// https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/instancedata-data-retrieval.html
const METADATA_URL_LATEST: &str = "http://169.254.169.254/latest";

const TOKEN_TTL_SECONDS: u32 = 60;

fn metadata_timeout() -> Duration {
    let secs = std::env::var("AWS_METADATA_SERVICE_TIMEOUT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2);
    Duration::from_secs(secs)
}

/// The identity the local EC2 instance needs in order to stand up a regional API client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceIdentity {
    pub instance_id: String,
    pub region: String,
}

/// Fetch the local instance's identity via IMDSv2.
///
/// Errors with `MetadataUnavailable` if the token request fails, which on EKS/Fargate-style
/// pod networking is almost always a metadata hop limit of 1 rather than a genuinely absent
/// metadata service.
pub async fn fetch_instance_identity() -> Result<InstanceIdentity, CloudError> {
    let client = reqwest::Client::builder()
        .timeout(metadata_timeout())
        .build()
        .map_err(|err| CloudError::MetadataUnavailable(err.to_string()))?;

    let token = fetch_token(&client).await?;
    let instance_id = fetch_metadata_field(&client, &token, "instance-id").await?;
    let region = fetch_metadata_field(&client, &token, "placement/region").await?;

    log::debug!("Creating AWS EC2 client - instance ID: {instance_id}, region: {region}");
    Ok(InstanceIdentity { instance_id, region })
}

async fn fetch_token(client: &reqwest::Client) -> Result<String, CloudError> {
    log::debug!("Getting session token for IMDSv2");
    let resp = client
        .put(format!("{METADATA_URL_LATEST}/api/token"))
        .header("X-aws-ec2-metadata-token-ttl-seconds", TOKEN_TTL_SECONDS)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|err| {
            log::warn!("Unable to get EC2 token for use with IMDSv2: {err}");
            log::warn!(
                "This may be due to the hop limit being too low (1) for pods to connect \
                 (see https://aws.amazon.com/about-aws/whats-new/2020/08/amazon-eks-supports-ec2-instance-metadata-service-v2/)"
            );
            log::warn!(
                "Please run the following to fix: aws ec2 modify-instance-metadata-options \
                 --instance-id <instance_id> --http-put-response-hop-limit 2 --http-endpoint enabled"
            );
            CloudError::MetadataUnavailable(err.to_string())
        })?;

    resp.text()
        .await
        .map_err(|err| CloudError::MetadataUnavailable(err.to_string()))
}

async fn fetch_metadata_field(
    client: &reqwest::Client,
    token: &str,
    path: &str,
) -> Result<String, CloudError> {
    let resp = client
        .get(format!("{METADATA_URL_LATEST}/meta-data/{path}"))
        .header("X-aws-ec2-metadata-token", token)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|err| CloudError::MetadataUnavailable(err.to_string()))?;

    resp.text()
        .await
        .map_err(|err| CloudError::MetadataUnavailable(err.to_string()))
}
