// PipelineProbe backed by the AWS SDK

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kinesis::error::DisplayErrorContext;
use aws_sdk_kinesis::primitives::Blob;
use chrono::{DateTime, Utc};
use secpipe_config::HarnessConfig;

use super::{HarnessError, PipelineProbe, Result};

pub struct AwsProbe {
    kinesis: aws_sdk_kinesis::Client,
    lambda: aws_sdk_lambda::Client,
    logs: aws_sdk_cloudwatchlogs::Client,
    s3: aws_sdk_s3::Client,
    stream_name: String,
    function_name: String,
    log_group: String,
    bucket: String,
}

impl AwsProbe {
    /// Build clients for the configured region and optional named profile
    pub async fn from_config(config: &HarnessConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        tracing::debug!(
            region = %config.region,
            stream = %config.stream_name,
            function = %config.function_name,
            bucket = %config.bucket,
            "AWS clients configured"
        );

        Self {
            kinesis: aws_sdk_kinesis::Client::new(&sdk_config),
            lambda: aws_sdk_lambda::Client::new(&sdk_config),
            logs: aws_sdk_cloudwatchlogs::Client::new(&sdk_config),
            s3: aws_sdk_s3::Client::new(&sdk_config),
            stream_name: config.stream_name.clone(),
            function_name: config.function_name.clone(),
            log_group: config.log_group(),
            bucket: config.bucket.clone(),
        }
    }
}

fn sdk_error<E: std::error::Error>(operation: &'static str, err: E) -> HarnessError {
    HarnessError::cloud(operation, DisplayErrorContext(err))
}

#[async_trait]
impl PipelineProbe for AwsProbe {
    async fn stream_status(&self) -> Result<String> {
        let output = self
            .kinesis
            .describe_stream_summary()
            .stream_name(&self.stream_name)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeStreamSummary", e))?;

        output
            .stream_description_summary()
            .map(|summary| summary.stream_status().as_str().to_string())
            .ok_or_else(|| {
                HarnessError::cloud("DescribeStreamSummary", "response has no stream summary")
            })
    }

    async fn function_state(&self) -> Result<String> {
        let output = self
            .lambda
            .get_function()
            .function_name(&self.function_name)
            .send()
            .await
            .map_err(|e| sdk_error("GetFunction", e))?;

        output
            .configuration()
            .and_then(|configuration| configuration.state())
            .map(|state| state.as_str().to_string())
            .ok_or_else(|| HarnessError::cloud("GetFunction", "response has no function state"))
    }

    async fn bucket_exists(&self) -> Result<()> {
        self.s3
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| sdk_error("HeadBucket", e))?;
        Ok(())
    }

    async fn put_record(&self, data: Vec<u8>, partition_key: &str) -> Result<String> {
        let output = self
            .kinesis
            .put_record()
            .stream_name(&self.stream_name)
            .data(Blob::new(data))
            .partition_key(partition_key)
            .send()
            .await
            .map_err(|e| sdk_error("PutRecord", e))?;

        Ok(output.sequence_number().to_string())
    }

    async fn filter_log_events(&self, marker: &str, since: DateTime<Utc>) -> Result<Vec<String>> {
        let output = self
            .logs
            .filter_log_events()
            .log_group_name(&self.log_group)
            .filter_pattern(format!("\"{}\"", marker))
            .start_time(since.timestamp_millis())
            .send()
            .await
            .map_err(|e| sdk_error("FilterLogEvents", e))?;

        Ok(output
            .events()
            .iter()
            .filter_map(|event| event.message().map(str::to_string))
            .collect())
    }

    async fn list_objects(&self, prefix: &str, max: i32) -> Result<Vec<String>> {
        let output = self
            .s3
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(max)
            .send()
            .await
            .map_err(|e| sdk_error("ListObjectsV2", e))?;

        Ok(output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect())
    }
}
