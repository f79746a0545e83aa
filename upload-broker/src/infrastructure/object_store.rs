use std::time::Duration;

use anyhow::Context;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use aws_sdk_s3::Client;
use domain_upload::model::entity::CompletedPart;
use domain_upload::model::vo::ETag;
use domain_upload::service::ObjectStoreClient;

use crate::config::ObjectStoreConfig;

pub struct S3ObjectStoreClient {
    client: Client,
}

impl S3ObjectStoreClient {
    /// Explicit credentials when configured, otherwise the ambient AWS chain
    /// (env, profile, instance metadata).
    pub async fn from_config(config: &ObjectStoreConfig) -> anyhow::Result<Self> {
        let mut builder = match (&config.access_key_id, &config.secret_access_key) {
            (Some(id), Some(secret)) => aws_sdk_s3::Config::builder()
                .region(Region::new(config.region.clone()))
                .credentials_provider(Credentials::new(
                    id.clone(),
                    secret.clone(),
                    None,
                    None,
                    "upload-broker-config",
                )),
            _ => {
                let shared = aws_config::from_env()
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

#[async_trait::async_trait]
impl ObjectStoreClient for S3ObjectStoreClient {
    async fn initiate_multipart(&self, bucket: &str, s3_key: &str) -> anyhow::Result<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(s3_key)
            .send()
            .await?;
        output
            .upload_id()
            .map(str::to_string)
            .context("create_multipart_upload returned no upload id")
    }

    async fn presign_put_url(
        &self,
        bucket: &str,
        s3_key: &str,
        expires_in: Duration,
    ) -> anyhow::Result<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(bucket)
            .key(s3_key)
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await?;
        Ok(presigned.uri().to_string())
    }

    async fn presign_part_url(
        &self,
        bucket: &str,
        s3_key: &str,
        upload_id: &str,
        part_number: u32,
        expires_in: Duration,
    ) -> anyhow::Result<String> {
        let presigned = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(s3_key)
            .upload_id(upload_id)
            .part_number(part_number as i32)
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await?;
        Ok(presigned.uri().to_string())
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        s3_key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> anyhow::Result<ETag> {
        let mut mpu = CompletedMultipartUpload::builder();
        for part in parts {
            let mut pb = S3CompletedPart::builder().part_number(part.part_number as i32);
            if let Some(etag) = &part.etag {
                pb = pb.e_tag(etag.as_str());
            }
            mpu = mpu.parts(pb.build());
        }
        let output = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(s3_key)
            .upload_id(upload_id)
            .multipart_upload(mpu.build())
            .send()
            .await?;
        let etag = output.e_tag().context("complete_multipart_upload returned no etag")?;
        Ok(ETag::new(etag))
    }

    async fn abort_multipart(
        &self,
        bucket: &str,
        s3_key: &str,
        upload_id: &str,
    ) -> anyhow::Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(s3_key)
            .upload_id(upload_id)
            .send()
            .await?;
        Ok(())
    }

    async fn get_object_etag(&self, bucket: &str, s3_key: &str) -> anyhow::Result<Option<ETag>> {
        match self.client.head_object().bucket(bucket).key(s3_key).send().await {
            Ok(output) => Ok(output.e_tag().map(ETag::new)),
            Err(err) => {
                if let SdkError::ServiceError(context) = &err {
                    if context.err().is_not_found() {
                        return Ok(None);
                    }
                }
                Err(err.into())
            }
        }
    }
}
